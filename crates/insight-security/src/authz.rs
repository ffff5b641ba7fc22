//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::collections::BTreeSet;

use insight_common::config::AuthorizationConfig;
use serde::Serialize;
use tracing::{debug, warn};

use crate::crypto::{CredentialHasher, HashedSecret, KeyMaterial};
use crate::identity::{CredentialStore, IdentityError, PrincipalSeed, SeedSecret};
use crate::metrics::SecurityMetrics;
use crate::rbac::{Permission, PermissionCatalog, Role};

/// How a principal's role was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// The principal is present in the credential store.
    Configured,
    /// The principal is unknown; the lowest-privilege role was substituted.
    DefaultFallback,
}

/// Result of resolving a principal. Always carries a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRole {
    /// Effective role.
    pub role: Role,
    /// Whether the role came from configuration or the fallback.
    pub source: RoleSource,
}

impl ResolvedRole {
    /// Role assigned to principals missing from the store.
    pub const FALLBACK: ResolvedRole = ResolvedRole {
        role: Role::Viewer,
        source: RoleSource::DefaultFallback,
    };
}

/// Authorization decisions over an immutable catalog and credential store.
///
/// Every operation is total: unknown principals and failed checks are
/// ordinary return values, never errors. The model is read-only after
/// construction and can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AuthorizationModel {
    catalog: PermissionCatalog,
    store: CredentialStore,
    metrics: Option<SecurityMetrics>,
}

impl AuthorizationModel {
    /// Assemble a model from explicitly constructed parts.
    pub fn new(catalog: PermissionCatalog, store: CredentialStore) -> Self {
        Self {
            catalog,
            store,
            metrics: None,
        }
    }

    /// Build the catalog and credential store from the `[authorization]` configuration.
    ///
    /// Plaintext secrets are hashed here and do not outlive this call.
    pub fn from_config(config: &AuthorizationConfig) -> Result<Self, IdentityError> {
        let hasher = match &config.hash_key {
            Some(encoded) => CredentialHasher::new(&KeyMaterial::from_hex(encoded)?)?,
            None => CredentialHasher::ephemeral()?,
        };

        let catalog = match &config.grants {
            Some(grants) => PermissionCatalog::from_names(grants)?,
            None => PermissionCatalog::standard(),
        };

        let mut seeds = Vec::with_capacity(config.principals.len());
        for (id, entry) in &config.principals {
            let secret = match (&entry.secret, &entry.secret_hash) {
                (Some(plain), _) => SeedSecret::Plaintext(plain.clone()),
                (None, Some(hash)) => SeedSecret::Hashed(HashedSecret::from_hex(hash)?),
                (None, None) => return Err(IdentityError::MissingSecret(id.clone())),
            };
            seeds.push(PrincipalSeed {
                id: id.clone(),
                role: entry.role.parse()?,
                display_name: entry.display_name.clone().unwrap_or_default(),
                email: entry.email.clone(),
                secret,
            });
        }

        let store = CredentialStore::bootstrap(hasher, seeds)?;
        debug!(
            principals = store.len(),
            key = %&store.hasher().key_fingerprint()[..16],
            "authorization model initialised"
        );
        Ok(Self::new(catalog, store))
    }

    /// Attach security metrics counters.
    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Permission catalog in use.
    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// Credential store in use.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Resolve a principal, tagging whether the fallback was applied.
    pub fn resolve(&self, principal: &str) -> ResolvedRole {
        match self.store.get(principal) {
            Some(entry) => ResolvedRole {
                role: entry.role,
                source: RoleSource::Configured,
            },
            None => {
                debug!(principal, "unknown principal resolved to viewer");
                ResolvedRole::FALLBACK
            }
        }
    }

    /// Configured role of `principal`, or viewer when unknown.
    pub fn role_of(&self, principal: &str) -> Role {
        self.resolve(principal).role
    }

    /// Whether `role` holds `permission`.
    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.catalog.allows(role, permission)
    }

    /// Permissions granted to `role`.
    pub fn permissions_of(&self, role: Role) -> &BTreeSet<Permission> {
        self.catalog.permissions_of(role)
    }

    /// Resolve `principal` and check `permission`, counting denials.
    pub fn authorize(&self, principal: &str, permission: Permission) -> bool {
        let role = self.role_of(principal);
        let allowed = self.has_permission(role, permission);
        if !allowed {
            warn!(principal, role = %role, permission = %permission, "permission denied");
            if let Some(metrics) = &self.metrics {
                metrics.inc_rbac_denial();
            }
        }
        allowed
    }

    /// Keyed one-way hash of `secret` under this model's key.
    pub fn hash_credential(&self, secret: &str) -> HashedSecret {
        self.store.hasher().hash(secret)
    }

    /// Compare `supplied` against the stored hash for `principal`.
    pub fn verify_credential(&self, principal: &str, supplied: &str) -> bool {
        if let Some(metrics) = &self.metrics {
            metrics.inc_auth_attempt();
        }
        let verified = match self.store.get(principal) {
            Some(entry) => self.store.hasher().verify(supplied, entry.secret_hash()),
            None => {
                // Hash anyway so unknown principals cost the same as known ones.
                let _ = self.store.hasher().hash(supplied);
                false
            }
        };
        if !verified {
            debug!(principal, "credential verification failed");
            if let Some(metrics) = &self.metrics {
                metrics.inc_auth_failure();
            }
        }
        verified
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use insight_common::AppConfig;

    use super::*;

    fn model() -> AuthorizationModel {
        let config = AppConfig::from_str(
            r#"
[authorization.principals.admin]
role = "admin"
secret = "admin123"

[authorization.principals.analyst_amy]
role = "analyst"
secret = "analyst123"

[authorization.principals.viewer_bob]
role = "viewer"
secret = "viewer123"
"#,
        )
        .unwrap();
        AuthorizationModel::from_config(&config.authorization).unwrap()
    }

    #[test]
    fn configured_principals_resolve_to_their_roles() {
        let model = model();
        assert_eq!(model.role_of("admin"), Role::Admin);
        assert_eq!(model.role_of("analyst_amy"), Role::Analyst);
        assert_eq!(
            model.resolve("viewer_bob"),
            ResolvedRole {
                role: Role::Viewer,
                source: RoleSource::Configured
            }
        );
    }

    #[test]
    fn unknown_principal_falls_back_to_viewer() {
        let model = model();
        assert_eq!(model.role_of("mallory"), Role::Viewer);
        assert_eq!(model.resolve("mallory"), ResolvedRole::FALLBACK);
        assert_eq!(model.resolve(""), ResolvedRole::FALLBACK);
    }

    #[test]
    fn verify_credential_is_boolean() {
        let model = model();
        assert!(model.verify_credential("analyst_amy", "analyst123"));
        assert!(!model.verify_credential("analyst_amy", "viewer123"));
        assert!(!model.verify_credential("mallory", "analyst123"));
    }

    #[test]
    fn hash_credential_matches_stored_hash() {
        let model = model();
        let stored = model.store().get("admin").unwrap().secret_hash().clone();
        assert_eq!(model.hash_credential("admin123"), stored);
        assert_ne!(model.hash_credential("admin123").as_str(), "admin123");
    }

    #[test]
    fn authorize_combines_resolution_and_catalog() {
        let model = model();
        assert!(model.authorize("analyst_amy", Permission::GenerateReports));
        assert!(!model.authorize("viewer_bob", Permission::GenerateReports));
        assert!(!model.authorize("mallory", Permission::ExportData));
        assert!(model.authorize("mallory", Permission::ViewDashboard));
    }

    #[test]
    fn prehashed_secrets_verify_with_shared_key() {
        let key = "42".repeat(32);
        let hasher = CredentialHasher::new(&KeyMaterial::from_hex(&key).unwrap()).unwrap();
        let hash = hasher.hash("s3cret");
        let raw = format!(
            r#"
[authorization]
hash_key = "{key}"

[authorization.principals.analyst_amy]
role = "analyst"
secret_hash = "{hash}"
"#
        );
        let config = AppConfig::from_str(&raw).unwrap();
        let model = AuthorizationModel::from_config(&config.authorization).unwrap();
        assert!(model.verify_credential("analyst_amy", "s3cret"));
    }

    #[test]
    fn unknown_role_in_config_is_rejected() {
        let config = AppConfig::from_str(
            r#"
[authorization.principals.eve]
role = "auditor"
secret = "x"
"#,
        )
        .unwrap();
        assert!(matches!(
            AuthorizationModel::from_config(&config.authorization),
            Err(IdentityError::Rbac(_))
        ));
    }

    #[test]
    fn metrics_count_attempts_failures_and_denials() {
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = SecurityMetrics::new(registry).unwrap();
        let model = model().with_metrics(metrics.clone());
        model.verify_credential("admin", "admin123");
        model.verify_credential("admin", "wrong");
        model.authorize("viewer_bob", Permission::ManageUsers);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.auth_attempts, 2);
        assert_eq!(snapshot.auth_failures, 1);
        assert_eq!(snapshot.rbac_denials, 1);
    }

    #[test]
    fn model_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthorizationModel>();
    }
}
