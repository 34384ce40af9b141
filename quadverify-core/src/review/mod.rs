//! Cycle-3 review prompt composition for the stop hook.
//!
//! The prompt frames a four-dimension self-check as rules for the check
//! itself. The wording is deliberate: the common failure mode is an agent
//! that *describes* fixes instead of making them, so the prompt defines
//! "fixing" as producing output. When the session wrote research-family
//! files, a Cycle-4 scan of those files is appended.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::engine::rules::{self, EvalRequest};
use crate::harness::ToolContext;

const REVIEW_PROMPT: &str = "\
Before finalizing, run a four-dimension self-check on everything you produced \
this turn. The rules of the check itself:

1. COMPLETENESS - every part of the request has produced actual output. If you \
already produced the code, this check passes. If you only described code, \
produce the code now.
2. CORRECTNESS - re-read what you wrote for logic errors, off-by-ones, and \
unhandled edge cases. Fixing means producing the corrected output, not \
describing what you would correct.
3. SECURITY - no injected commands, no secrets in code, no unsafe patterns \
left behind.
4. QUALITY - no placeholders, no TODO stubs, no silently swallowed errors.

A check that ends with a description of work instead of the work itself has \
failed. Produce the missing output before you stop.";

/// Compose the stop-hook prompt: the self-check plus, when applicable, a
/// findings list from scanning recently written research artifacts.
pub fn compose_stop_prompt(
    cycle4_enabled: bool,
    files_written: &BTreeSet<String>,
    project_root: &Path,
) -> String {
    let mut prompt = REVIEW_PROMPT.to_string();

    if cycle4_enabled {
        let findings = scan_research_files(files_written, project_root);
        if !findings.is_empty() {
            prompt.push_str("\n\nResearch artifacts written this session have unsourced claims:\n");
            for finding in &findings {
                prompt.push_str(&format!("- {finding}\n"));
            }
            prompt.push_str("Add sources or qualify the claims before finalizing.");
        }
    }

    prompt
}

/// Run Cycle-4 rules over research files the session wrote, reading current
/// contents from disk. Unreadable files are skipped.
fn scan_research_files(files_written: &BTreeSet<String>, project_root: &Path) -> Vec<String> {
    let mut findings = Vec::new();
    let disabled = BTreeSet::new();

    for path in files_written {
        if !rules::is_research_path(path) {
            continue;
        }
        let on_disk = {
            let candidate = Path::new(path);
            if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                project_root.join(candidate)
            }
        };
        let Ok(content) = std::fs::read_to_string(&on_disk) else {
            debug!("research file {} not readable, skipping scan", on_disk.display());
            continue;
        };

        let extension = on_disk
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_string());
        let violations = rules::evaluate(&EvalRequest {
            content: &content,
            extension: extension.as_deref(),
            context: ToolContext::FileWrite,
            disabled: &disabled,
            critical_only: false,
            cycles: &[4],
        });

        for violation in violations {
            findings.push(format!("{}: [{}] {}", path, violation.rule_id, violation.message));
        }
    }

    findings
}
