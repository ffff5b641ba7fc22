//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::crypto::{CredentialHasher, HashedSecret};
use crate::rbac::{RbacError, Role};

/// Identifier for a principal.
pub type PrincipalId = String;

/// Errors returned while bootstrapping the credential store.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Principal declared twice in the bootstrap source.
    #[error("principal declared more than once: {0}")]
    DuplicatePrincipal(PrincipalId),
    /// Principal identifier was blank.
    #[error("principal identifier cannot be empty")]
    EmptyPrincipal,
    /// Hash key could not be decoded.
    #[error("invalid credential hash key: {0}")]
    InvalidHashKey(String),
    /// Stored secret hash could not be decoded.
    #[error("invalid stored secret hash: {0}")]
    InvalidSecretHash(String),
    /// Principal declared without any secret.
    #[error("principal {0} has no secret configured")]
    MissingSecret(PrincipalId),
    /// Role or permission table problem.
    #[error(transparent)]
    Rbac(#[from] RbacError),
}

/// Secret supplied for a principal at bootstrap.
#[derive(Clone)]
pub enum SeedSecret {
    /// Plaintext, hashed during bootstrap and dropped afterwards.
    Plaintext(String),
    /// Hash computed ahead of time with the same key.
    Hashed(HashedSecret),
}

/// Bootstrap description of one principal.
#[derive(Clone)]
pub struct PrincipalSeed {
    /// Stable identifier (login name).
    pub id: PrincipalId,
    /// Assigned role.
    pub role: Role,
    /// Display name for UI rendering.
    pub display_name: String,
    /// Contact address.
    pub email: Option<String>,
    /// Credential secret.
    pub secret: SeedSecret,
}

impl PrincipalSeed {
    /// Seed with a plaintext secret and no profile details.
    pub fn new(id: impl Into<PrincipalId>, role: Role, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: String::new(),
            email: None,
            secret: SeedSecret::Plaintext(secret.into()),
        }
    }
}

/// Stored representation of a principal. Never holds the plaintext secret.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrincipalEntry {
    /// Stable identifier.
    pub id: PrincipalId,
    /// Display name for UI rendering.
    pub display_name: String,
    /// Contact address.
    pub email: Option<String>,
    /// Assigned role.
    pub role: Role,
    #[serde(skip)]
    pub(crate) secret_hash: HashedSecret,
}

impl PrincipalEntry {
    /// Stored credential hash.
    pub fn secret_hash(&self) -> &HashedSecret {
        &self.secret_hash
    }
}

/// Immutable principal → (role, hashed secret) store, populated once at startup.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    hasher: CredentialHasher,
    principals: HashMap<PrincipalId, PrincipalEntry>,
}

impl CredentialStore {
    /// Hash every seed's secret and freeze the resulting table.
    pub fn bootstrap<I>(hasher: CredentialHasher, seeds: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = PrincipalSeed>,
    {
        let mut principals = HashMap::new();
        for seed in seeds {
            let id = seed.id.trim().to_owned();
            if id.is_empty() {
                return Err(IdentityError::EmptyPrincipal);
            }
            if principals.contains_key(&id) {
                return Err(IdentityError::DuplicatePrincipal(id));
            }
            let secret_hash = match seed.secret {
                SeedSecret::Plaintext(plain) => hasher.hash(&plain),
                SeedSecret::Hashed(hash) => hash,
            };
            debug!(principal = %id, role = %seed.role, "registered principal");
            principals.insert(
                id.clone(),
                PrincipalEntry {
                    id,
                    display_name: seed.display_name,
                    email: seed.email,
                    role: seed.role,
                    secret_hash,
                },
            );
        }
        Ok(Self { hasher, principals })
    }

    /// Store with no principals; every lookup falls back.
    pub fn empty(hasher: CredentialHasher) -> Self {
        Self {
            hasher,
            principals: HashMap::new(),
        }
    }

    /// Lookup a principal.
    pub fn get(&self, principal: &str) -> Option<&PrincipalEntry> {
        self.principals.get(principal)
    }

    /// Hasher used for every stored secret.
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Principal identifiers, sorted.
    pub fn principal_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.principals.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered principals.
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Whether the store has no principals.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyMaterial;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&KeyMaterial([3u8; 32])).unwrap()
    }

    #[test]
    fn bootstrap_hashes_plaintext_secrets() {
        let store = CredentialStore::bootstrap(
            hasher(),
            [
                PrincipalSeed::new("admin", Role::Admin, "admin123"),
                PrincipalSeed::new("viewer_bob", Role::Viewer, "viewer123"),
            ],
        )
        .unwrap();
        let admin = store.get("admin").unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_ne!(admin.secret_hash().as_str(), "admin123");
        assert_eq!(admin.secret_hash(), &store.hasher().hash("admin123"));
        assert_eq!(store.principal_ids(), vec!["admin", "viewer_bob"]);
    }

    #[test]
    fn bootstrap_accepts_prehashed_secret() {
        let precomputed = hasher().hash("analyst123");
        let seed = PrincipalSeed {
            secret: SeedSecret::Hashed(precomputed.clone()),
            ..PrincipalSeed::new("analyst_amy", Role::Analyst, "")
        };
        let store = CredentialStore::bootstrap(hasher(), [seed]).unwrap();
        assert_eq!(store.get("analyst_amy").unwrap().secret_hash(), &precomputed);
    }

    #[test]
    fn duplicate_principals_are_rejected() {
        let err = CredentialStore::bootstrap(
            hasher(),
            [
                PrincipalSeed::new("admin", Role::Admin, "a"),
                PrincipalSeed::new(" admin ", Role::Viewer, "b"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, IdentityError::DuplicatePrincipal(id) if id == "admin"));
    }

    #[test]
    fn blank_principal_is_rejected() {
        let err =
            CredentialStore::bootstrap(hasher(), [PrincipalSeed::new("  ", Role::Viewer, "x")])
                .unwrap_err();
        assert!(matches!(err, IdentityError::EmptyPrincipal));
    }

    #[test]
    fn serialised_entry_omits_secret_hash() {
        let store =
            CredentialStore::bootstrap(hasher(), [PrincipalSeed::new("admin", Role::Admin, "x")])
                .unwrap();
        let json = serde_json::to_value(store.get("admin").unwrap()).unwrap();
        assert!(json.get("secret_hash").is_none());
        assert_eq!(json["role"], "admin");
    }
}
