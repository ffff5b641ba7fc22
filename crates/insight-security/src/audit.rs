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
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GENESIS_HASH_LEN: usize = 64;

/// Kind of security-relevant event recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventKind {
    /// Credentials verified.
    #[serde(rename = "login.success")]
    LoginSuccess,
    /// Credentials rejected.
    #[serde(rename = "login.failure")]
    LoginFailure,
    /// A report was generated and handed to the caller.
    #[serde(rename = "report.generate")]
    ReportGenerate,
    /// A request was refused by the access model.
    #[serde(rename = "permission.denied")]
    PermissionDenied,
    /// Report content or data was exported.
    #[serde(rename = "data.export")]
    DataExport,
    /// An operation failed unexpectedly.
    #[serde(rename = "system.error")]
    SystemError,
}

impl AuditEventKind {
    /// Dotted event name as stored on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::LoginSuccess => "login.success",
            AuditEventKind::LoginFailure => "login.failure",
            AuditEventKind::ReportGenerate => "report.generate",
            AuditEventKind::PermissionDenied => "permission.denied",
            AuditEventKind::DataExport => "data.export",
            AuditEventKind::SystemError => "system.error",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry recorded in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// Timestamp when the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Principal responsible for the event.
    pub actor: String,
    /// Event kind.
    pub kind: AuditEventKind,
    /// Additional context serialized as JSON.
    pub details: serde_json::Value,
    /// SHA-256 over the entry contents chained to the previous hash.
    pub hash: String,
    /// Hash of the previous entry (or zero string for the first entry).
    pub previous_hash: String,
}

impl AuditEntry {
    fn compute_hash(
        timestamp: DateTime<Utc>,
        actor: &str,
        kind: AuditEventKind,
        details: &serde_json::Value,
        previous_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_be_bytes(),
        );
        hasher.update(actor.as_bytes());
        hasher.update(kind.as_str().as_bytes());
        hasher.update(details.to_string().as_bytes());
        hasher.update(previous_hash.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Outcome of checking the hash chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditVerification {
    /// Entries inspected.
    pub entries: usize,
    /// Zero-based index of the first entry whose hash does not match.
    pub first_invalid: Option<usize>,
}

impl AuditVerification {
    /// Whether the whole chain is intact.
    pub fn is_intact(&self) -> bool {
        self.first_invalid.is_none()
    }
}

/// Audit log backed by a newline-delimited JSON file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    last_hash: String,
}

impl AuditLog {
    /// Open (or create) an audit log. Existing entries are read to find the head hash.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut log = Self {
            path,
            last_hash: "0".repeat(GENESIS_HASH_LEN),
        };
        if let Some(last) = log.entries()?.pop() {
            log.last_hash = last.hash;
        }
        Ok(log)
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new audit entry to the log.
    pub fn append(
        &mut self,
        actor: &str,
        kind: AuditEventKind,
        details: serde_json::Value,
    ) -> Result<AuditEntry> {
        let timestamp = Utc::now();
        let hash = AuditEntry::compute_hash(timestamp, actor, kind, &details, &self.last_hash);
        let entry = AuditEntry {
            timestamp,
            actor: actor.to_string(),
            kind,
            details,
            hash: hash.clone(),
            previous_hash: self.last_hash.clone(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("unable to create audit directory {}", parent.display())
                })?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("unable to open audit log {}", self.path.display()))?;
        file.write_all(serde_json::to_string(&entry)?.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        self.last_hash = hash;
        Ok(entry)
    }

    /// Read every entry in file order.
    pub fn entries(&self) -> Result<Vec<AuditEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)
            .with_context(|| format!("unable to open audit log {}", self.path.display()))?;
        let mut entries = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line).with_context(|| {
                format!("malformed audit entry on line {}", line_no + 1)
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Recompute the chain and report the first tampered entry, if any.
    pub fn verify(&self) -> Result<AuditVerification> {
        let entries = self.entries()?;
        let mut previous = "0".repeat(GENESIS_HASH_LEN);
        for (index, entry) in entries.iter().enumerate() {
            let expected = AuditEntry::compute_hash(
                entry.timestamp,
                &entry.actor,
                entry.kind,
                &entry.details,
                &previous,
            );
            if expected != entry.hash || entry.previous_hash != previous {
                return Ok(AuditVerification {
                    entries: entries.len(),
                    first_invalid: Some(index),
                });
            }
            previous = entry.hash.clone();
        }
        Ok(AuditVerification {
            entries: entries.len(),
            first_invalid: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};
    use tempfile::tempdir;

    #[test]
    fn audit_log_detects_tampering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let mut log = AuditLog::open(&path).unwrap();
        log.append(
            "analyst_amy",
            AuditEventKind::ReportGenerate,
            serde_json::json!({"records": 3}),
        )
        .unwrap();
        log.append(
            "viewer_bob",
            AuditEventKind::PermissionDenied,
            serde_json::json!({"permission": "generate_reports"}),
        )
        .unwrap();
        assert!(log.verify().unwrap().is_intact());

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        let mut entries: Vec<serde_json::Value> = contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        entries[1]["details"]["permission"] = serde_json::json!("view_dashboard");
        file.set_len(0).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        for value in entries {
            file.write_all(value.to_string().as_bytes()).unwrap();
            file.write_all(b"\n").unwrap();
        }
        let verification = AuditLog::open(&path).unwrap().verify().unwrap();
        assert_eq!(verification.entries, 2);
        assert_eq!(verification.first_invalid, Some(1));
    }

    #[test]
    fn reopened_log_continues_the_chain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/audit.log");
        let first = AuditLog::open(&path)
            .unwrap()
            .append("admin", AuditEventKind::LoginSuccess, serde_json::json!({}))
            .unwrap();
        let mut reopened = AuditLog::open(&path).unwrap();
        let second = reopened
            .append("admin", AuditEventKind::DataExport, serde_json::json!({}))
            .unwrap();
        assert_eq!(second.previous_hash, first.hash);
        let entries = reopened.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, AuditEventKind::DataExport);
        assert!(reopened.verify().unwrap().is_intact());
    }

    #[test]
    fn event_kinds_serialise_as_dotted_names() {
        let json = serde_json::to_string(&AuditEventKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission.denied\"");
    }
}
