//! ---
//! insight_section: "07-testing"
//! insight_subsection: "integration-tests"
//! insight_type: "source"
//! insight_scope: "code"
//! insight_description: "Integration tests spanning configuration, access control, and audit."
//! insight_version: "v0.1.0"
//! insight_owner: "tbd"
//! ---
use std::fs;
use std::str::FromStr;
use std::sync::Arc;

use insight_common::AppConfig;
use insight_security::{
    AuditEventKind, AuditLog, AuthorizationModel, Permission, Role, RoleSource, SecurityMetrics,
};
use serde_json::json;
use tempfile::tempdir;

const CONFIG: &str = r#"
[authorization]
hash_key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff"

[authorization.principals.admin]
role = "admin"
secret = "admin123"

[authorization.principals.analyst_amy]
role = "analyst"
display_name = "Amy Analyst"
email = "amy@company.invalid"
secret = "analyst123"

[authorization.principals.viewer_bob]
role = "viewer"
secret = "viewer123"
"#;

fn model_with_metrics() -> (AuthorizationModel, SecurityMetrics, Arc<prometheus::Registry>) {
    let config = AppConfig::from_str(CONFIG).unwrap();
    let registry = Arc::new(prometheus::Registry::new());
    let metrics = SecurityMetrics::new(registry.clone()).unwrap();
    let model = AuthorizationModel::from_config(&config.authorization)
        .unwrap()
        .with_metrics(metrics.clone());
    (model, metrics, registry)
}

#[test]
fn end_to_end_access_control_flow() {
    let (model, metrics, registry) = model_with_metrics();

    // Credentials
    assert!(model.verify_credential("analyst_amy", "analyst123"));
    assert!(!model.verify_credential("analyst_amy", "viewer123"));
    assert!(!model.verify_credential("mallory", "analyst123"));

    // Role resolution
    let resolved = model.resolve("analyst_amy");
    assert_eq!(resolved.role, Role::Analyst);
    assert_eq!(resolved.source, RoleSource::Configured);
    let fallback = model.resolve("mallory");
    assert_eq!(fallback.role, Role::Viewer);
    assert_eq!(fallback.source, RoleSource::DefaultFallback);

    // Permission checks
    assert!(model.authorize("admin", Permission::ManageUsers));
    assert!(model.authorize("analyst_amy", Permission::GenerateReports));
    assert!(!model.authorize("viewer_bob", Permission::GenerateReports));
    assert!(!model.authorize("mallory", Permission::ExportData));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.auth_attempts, 3);
    assert_eq!(snapshot.auth_failures, 2);
    assert_eq!(snapshot.rbac_denials, 2);
    assert_eq!(registry.gather().len(), 3);

    // Audit trail
    let dir = tempdir().unwrap();
    let mut log = AuditLog::open(dir.path().join("audit.log")).unwrap();
    log.append("analyst_amy", AuditEventKind::LoginSuccess, json!({ "role": "analyst" }))
        .unwrap();
    log.append(
        "viewer_bob",
        AuditEventKind::PermissionDenied,
        json!({ "permission": "generate_reports" }),
    )
    .unwrap();
    assert!(log.verify().unwrap().is_intact());
}

#[test]
fn admin_holds_every_permission_of_lower_roles() {
    let (model, _, _) = model_with_metrics();
    let admin = model.permissions_of(Role::Admin);
    for role in [Role::Analyst, Role::Viewer] {
        assert!(model.permissions_of(role).is_subset(admin), "{role}");
    }
}

#[test]
fn audit_chain_survives_reopen_and_detects_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("audit.log");

    let mut log = AuditLog::open(&path).unwrap();
    log.append("analyst_amy", AuditEventKind::ReportGenerate, json!({ "records": 3 }))
        .unwrap();
    drop(log);

    let mut reopened = AuditLog::open(&path).unwrap();
    reopened
        .append("analyst_amy", AuditEventKind::DataExport, json!({ "format": "json" }))
        .unwrap();
    let verification = reopened.verify().unwrap();
    assert_eq!(verification.entries, 2);
    assert!(verification.is_intact());

    let tampered = fs::read_to_string(&path)
        .unwrap()
        .replacen("\"records\":3", "\"records\":30", 1);
    fs::write(&path, tampered).unwrap();
    let verification = AuditLog::open(&path).unwrap().verify().unwrap();
    assert_eq!(verification.first_invalid, Some(0));
}

#[test]
fn stored_entries_never_expose_plaintext() {
    let (model, _, _) = model_with_metrics();
    let entry = model.store().get("analyst_amy").unwrap();
    assert_eq!(entry.display_name, "Amy Analyst");
    assert_ne!(entry.secret_hash().as_str(), "analyst123");
    assert_eq!(
        entry.secret_hash(),
        &model.hash_credential("analyst123"),
    );
    let serialized = serde_json::to_string(entry).unwrap();
    assert!(!serialized.contains("analyst123"));
}
