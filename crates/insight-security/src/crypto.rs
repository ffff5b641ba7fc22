//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::fmt;

use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::IdentityError;

type HmacSha256 = Hmac<Sha256>;

const CREDENTIAL_DOMAIN: &[u8] = b"insight.credential.v1";

/// Opaque symmetric key material (32 bytes) used to key credential hashes.
#[derive(Clone)]
pub struct KeyMaterial(pub [u8; 32]);

impl KeyMaterial {
    /// Generate random key material.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Decode key material from a hex string.
    pub fn from_hex(encoded: &str) -> Result<Self, IdentityError> {
        let decoded = hex::decode(encoded.trim())
            .map_err(|err| IdentityError::InvalidHashKey(err.to_string()))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|raw: Vec<u8>| {
            IdentityError::InvalidHashKey(format!("expected 32 bytes, found {}", raw.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Compute a SHA-256 fingerprint of the key for audit/logging.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial")
            .field(&&self.fingerprint()[..16])
            .finish()
    }
}

/// Hex-encoded keyed hash of a credential secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedSecret(String);

impl HashedSecret {
    /// Accept a pre-computed hash, validating its shape.
    pub fn from_hex(encoded: &str) -> Result<Self, IdentityError> {
        let normalised = encoded.trim().to_lowercase();
        let bytes = hex::decode(&normalised)
            .map_err(|err| IdentityError::InvalidSecretHash(err.to_string()))?;
        if bytes.len() != 32 {
            return Err(IdentityError::InvalidSecretHash(format!(
                "expected 32 bytes, found {}",
                bytes.len()
            )));
        }
        Ok(Self(normalised))
    }

    /// Hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn to_bytes(&self) -> Vec<u8> {
        // Construction guarantees valid hex.
        hex::decode(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashedSecret({}..)", &self.0[..8.min(self.0.len())])
    }
}

/// One-way keyed hash (HMAC-SHA256) for credential secrets.
#[derive(Clone)]
pub struct CredentialHasher {
    key_fingerprint: String,
    mac: HmacSha256,
}

impl CredentialHasher {
    /// Create a hasher keyed with `key`.
    pub fn new(key: &KeyMaterial) -> Result<Self, IdentityError> {
        let mut mac = HmacSha256::new_from_slice(&key.0)
            .map_err(|err| IdentityError::InvalidHashKey(err.to_string()))?;
        mac.update(CREDENTIAL_DOMAIN);
        Ok(Self {
            key_fingerprint: key.fingerprint(),
            mac,
        })
    }

    /// Hasher keyed with fresh random material, valid for the lifetime of the process.
    pub fn ephemeral() -> Result<Self, IdentityError> {
        Self::new(&KeyMaterial::generate())
    }

    /// Fingerprint of the key in use.
    pub fn key_fingerprint(&self) -> &str {
        &self.key_fingerprint
    }

    /// Deterministically hash `secret`.
    pub fn hash(&self, secret: &str) -> HashedSecret {
        let mut mac = self.mac.clone();
        mac.update(secret.as_bytes());
        HashedSecret(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison of `secret` against a stored hash.
    pub fn verify(&self, secret: &str, stored: &HashedSecret) -> bool {
        let mut mac = self.mac.clone();
        mac.update(secret.as_bytes());
        mac.verify_slice(&stored.to_bytes()).is_ok()
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("key_fingerprint", &self.key_fingerprint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_hasher() -> CredentialHasher {
        CredentialHasher::new(&KeyMaterial([7u8; 32])).unwrap()
    }

    #[test]
    fn random_key_has_32_bytes() {
        let key = KeyMaterial::generate();
        assert_eq!(key.0.len(), 32);
        assert_eq!(key.fingerprint().len(), 64);
    }

    #[test]
    fn hashing_is_deterministic_and_not_plaintext() {
        let hasher = fixed_hasher();
        let first = hasher.hash("analyst123");
        assert_eq!(first, hasher.hash("analyst123"));
        assert_ne!(first, hasher.hash("viewer123"));
        assert_ne!(first.as_str(), "analyst123");
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn different_keys_produce_different_hashes() {
        let other = CredentialHasher::new(&KeyMaterial([8u8; 32])).unwrap();
        assert_ne!(fixed_hasher().hash("admin123"), other.hash("admin123"));
    }

    #[test]
    fn verify_accepts_only_matching_secret() {
        let hasher = fixed_hasher();
        let stored = hasher.hash("admin123");
        assert!(hasher.verify("admin123", &stored));
        assert!(!hasher.verify("admin124", &stored));
        assert!(!hasher.verify("", &stored));
    }

    #[test]
    fn hex_round_trip_preserves_hash() {
        let hasher = fixed_hasher();
        let stored = hasher.hash("viewer123");
        let parsed = HashedSecret::from_hex(&stored.as_str().to_uppercase()).unwrap();
        assert_eq!(parsed, stored);
        assert!(HashedSecret::from_hex("abcd").is_err());
        assert!(HashedSecret::from_hex("not-hex").is_err());
    }

    #[test]
    fn key_material_from_hex_validates_length() {
        let key = KeyMaterial::from_hex(&"11".repeat(32)).unwrap();
        assert_eq!(key.0, [0x11; 32]);
        assert!(matches!(
            KeyMaterial::from_hex("1122"),
            Err(IdentityError::InvalidHashKey(_))
        ));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let rendered = format!("{:?}", KeyMaterial([9u8; 32]));
        assert!(!rendered.contains("9, 9"));
    }
}
