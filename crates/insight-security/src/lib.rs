//! ---
//! insight_section: "02-access-control"
//! insight_subsection: "module"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Role model, credential hashing, and authorization decisions."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
//! Role-based access model for feedback reports: the permission catalog,
//! the credential store, and the authorization decisions built on them.
#![warn(missing_docs)]

pub mod audit;
pub mod authz;
pub mod crypto;
pub mod identity;
pub mod metrics;
pub mod rbac;

pub use audit::{AuditEntry, AuditEventKind, AuditLog, AuditVerification};
pub use authz::{AuthorizationModel, ResolvedRole, RoleSource};
pub use crypto::{CredentialHasher, HashedSecret, KeyMaterial};
pub use identity::{CredentialStore, IdentityError, PrincipalEntry, PrincipalSeed, SeedSecret};
pub use metrics::{register_counter, SecurityMetrics, SecurityMetricsSnapshot};
pub use rbac::{Permission, PermissionCatalog, RbacError, Role};
