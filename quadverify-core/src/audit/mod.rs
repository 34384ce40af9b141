//! Append-only JSONL audit trail, one file per session.
//!
//! Each entry is serialized to a single line and written with one write
//! syscall so concurrent hook processes interleave at line granularity. The
//! writer never raises: IO failure gets one stderr diagnostic and subsequent
//! writes become no-ops for the life of the process.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::engine::decision::Violation;

pub const AUDIT_DIR: &str = ".claude/quadruple-verify-audit";

/// One audit line. Never mutated after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// ISO-8601 UTC.
    pub timestamp: String,
    pub session_id: String,
    /// `preTool`, `postTool`, or `stop`.
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// `approve`, `block`, or `logOnly`.
    pub decision: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuditEntry {
    pub fn new(session_id: &str, event: &str, tool: Option<&str>, decision: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: session_id.to_string(),
            event: event.to_string(),
            tool: tool.map(|t| t.to_string()),
            decision: decision.to_string(),
            violations: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// Process-wide audit sink for one session's JSONL file.
pub struct AuditWriter {
    path: PathBuf,
    failed: AtomicBool,
}

impl AuditWriter {
    /// Audit file under the project-rooted audit directory, honoring an
    /// explicit directory override from configuration.
    pub fn for_session(
        project_root: &Path,
        audit_dir_override: Option<&Path>,
        session_id: &str,
    ) -> Self {
        let dir = match audit_dir_override {
            Some(dir) => dir.to_path_buf(),
            None => project_root.join(AUDIT_DIR),
        };
        Self {
            path: dir.join(format!("{session_id}.jsonl")),
            failed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. Swallows IO errors after a single diagnostic.
    pub fn append(&self, entry: &AuditEntry) {
        if self.failed.load(Ordering::Relaxed) {
            return;
        }
        if let Err(e) = self.try_append(entry) {
            self.failed.store(true, Ordering::Relaxed);
            warn!("audit write to {} failed: {e}", self.path.display());
            eprintln!("{} audit disabled for this invocation: {e}", crate::STDERR_PREFIX);
        }
    }

    fn try_append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One syscall per line keeps lines intact under contention.
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
