use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::budget::BudgetState;
use crate::correction::CorrectionState;

pub const HISTORY_CAP: usize = 50;
pub const EDIT_HISTORY_CAP: usize = 10;
pub const EDIT_SNAPSHOT_CHARS: usize = 500;
pub const RETRY_HISTORY_CAP: usize = 20;

/// One recorded tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorEntry {
    pub tool: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Path whose permissions a chmod/chown entry changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perm_changed_path: Option<String>,
}

/// Per-rule effectiveness counters for the session-scoped adaptive policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleStats {
    pub fixed: u32,
    pub ignored: u32,
    pub total: u32,
}

/// Everything the verifier remembers about one session, shared across the
/// short-lived hook processes through a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    pub history: VecDeque<BehaviorEntry>,
    pub files_read: BTreeSet<String>,
    pub files_written: BTreeSet<String>,
    pub edit_history: HashMap<String, VecDeque<String>>,
    pub retry_history: VecDeque<String>,
    pub effectiveness: HashMap<String, RuleStats>,
    pub correction: HashMap<String, CorrectionState>,
    pub budget: BudgetState,
}

impl SessionState {
    /// Append a history entry, enforcing the deque cap.
    pub fn push_entry(&mut self, entry: BehaviorEntry) {
        self.history.push_back(entry);
        while self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// Record an edit snapshot for a path, enforcing both caps.
    pub fn push_edit_snapshot(&mut self, path: &str, content: &str) {
        let snapshot: String = content.chars().take(EDIT_SNAPSHOT_CHARS).collect();
        let snapshots = self.edit_history.entry(path.to_string()).or_default();
        snapshots.push_back(snapshot);
        while snapshots.len() > EDIT_HISTORY_CAP {
            snapshots.pop_front();
        }
    }

    /// Record a Bash command for brute-force detection, enforcing the cap.
    pub fn push_retry(&mut self, command: &str) {
        self.retry_history.push_back(command.to_string());
        while self.retry_history.len() > RETRY_HISTORY_CAP {
            self.retry_history.pop_front();
        }
    }

    /// Bump effectiveness counters for a rule that fired.
    pub fn record_rule_fired(&mut self, rule_id: &str, fixed: bool) {
        let stats = self.effectiveness.entry(rule_id.to_string()).or_default();
        stats.total += 1;
        if fixed {
            stats.fixed += 1;
        } else {
            stats.ignored += 1;
        }
    }
}

/// File-backed store for [`SessionState`] with read-modify-write semantics.
///
/// Two hook processes for the same session can overlap, so every write goes
/// to a sibling temp file and is renamed over the target; the state file
/// always holds a complete JSON document. Lost updates are tolerated - the
/// worst outcome is a missed behavioral warning.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current state. Missing or corrupt files yield an empty state.
    pub fn load(&self) -> SessionState {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "session state {} is corrupt, starting fresh: {e}",
                        self.path.display()
                    );
                    SessionState::default()
                }
            },
            Err(_) => SessionState::default(),
        }
    }

    /// Persist the state atomically. IO failure degrades to in-memory-only
    /// operation with a warning.
    pub fn save(&self, state: &SessionState) {
        if let Err(e) = self.try_save(state) {
            warn!(
                "could not persist session state {}: {e}",
                self.path.display()
            );
            eprintln!(
                "{} session state not persisted: {e}",
                crate::STDERR_PREFIX
            );
        }
    }

    fn try_save(&self, state: &SessionState) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let temp_path = self.path.with_extension(format!("tmp.{}", std::process::id()));
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
