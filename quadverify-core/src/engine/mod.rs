//! The verifier engine - orchestrates the three hook flows.
//!
//! Pre-tool: config -> trust gate -> capability gate -> content extraction ->
//! model routing -> rule engine -> budget squeeze -> correction tracking ->
//! decision envelope + audit. Post-tool: behavior tracking, boundary
//! analysis, sensitivity scan, audit. Stop: review-prompt composition plus
//! the optional Cycle-5 second opinion.
//!
//! Every handler upholds the fail-open contract: the only blocking paths are
//! a capability denial and a successful rule evaluation with blocking
//! violations.

pub mod capability;
pub mod decision;
pub mod router;
pub mod rules;

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, warn};

use crate::audit::{AuditEntry, AuditWriter};
use crate::behavior::{self, SessionStore};
use crate::boundary;
use crate::budget::{self, source};
use crate::config::{ConfigResolver, ResolvedConfig, TrustLevel};
use crate::correction;
use crate::harness::{
    extract_content, DecisionEnvelope, HookEvent, StopPayload, ToolContext, ToolEventPayload,
};
use crate::inference::InferenceVerifier;
use crate::project;
use crate::review;
use crate::sensitive;
use capability::CapabilityDecision;
use decision::Violation;
use router::RouteTier;
use rules::EvalRequest;

/// One hook invocation's wiring: resolved config, session identity, and the
/// audit sink.
pub struct Verifier {
    config: ResolvedConfig,
    project_root: PathBuf,
    session_id: String,
    audit: AuditWriter,
    store: SessionStore,
}

impl Verifier {
    /// Build a verifier for an incoming event.
    pub fn for_event(event: &HookEvent) -> Self {
        let cwd = event
            .common()
            .cwd
            .as_deref()
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(&cwd, event.common().session_id.as_deref())
    }

    pub fn new(cwd: &Path, event_session_id: Option<&str>) -> Self {
        let project_root = project::find_project_root(cwd);
        let config = ConfigResolver::new(&project_root).resolve();
        Self::with_config(config, project_root, event_session_id)
    }

    /// Test seam: supply configuration and project root directly.
    pub fn with_config(
        config: ResolvedConfig,
        project_root: PathBuf,
        event_session_id: Option<&str>,
    ) -> Self {
        let session_id = project::resolve_session_id(event_session_id, &project_root);
        let audit = AuditWriter::for_session(
            &project_root,
            config.audit_dir.as_deref(),
            &session_id,
        );
        let store = SessionStore::new(
            config
                .audit_dir
                .clone()
                .unwrap_or_else(|| project_root.join(crate::audit::AUDIT_DIR))
                .join(format!("{session_id}.behavior.json")),
        );
        Self {
            config,
            project_root,
            session_id,
            audit,
            store,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch one event to its hook flow.
    pub async fn handle(&self, event: &HookEvent) -> DecisionEnvelope {
        match event {
            HookEvent::PreTool(payload) => self.handle_pre_tool(payload),
            HookEvent::PostTool(payload) => self.handle_post_tool(payload),
            HookEvent::Stop(payload) => self.handle_stop(payload).await,
        }
    }

    // --- pre-tool ---

    fn handle_pre_tool(&self, payload: &ToolEventPayload) -> DecisionEnvelope {
        let tool = payload.tool_name.as_str();

        if self.config.trust_level == TrustLevel::Minimal {
            self.audit_simple("preTool", Some(tool), "approve", json!({"trustLevel": "minimal"}));
            return DecisionEnvelope::Approve;
        }

        if let CapabilityDecision::Denied { missing } =
            capability::check(tool, &self.config.capabilities)
        {
            let violation = capability_denied_violation(tool, &missing);
            let reason = violation.message.clone();
            let entry = AuditEntry::new(&self.session_id, "preTool", Some(tool), "block")
                .with_violations(vec![violation])
                .with_metadata("capabilityDenied", json!(missing));
            self.audit.append(&entry);
            return DecisionEnvelope::Block { reason };
        }

        if self.config.lean_mode {
            self.audit_simple("preTool", Some(tool), "approve", json!({"leanMode": true}));
            return DecisionEnvelope::Approve;
        }

        let Some(extracted) =
            extract_content(tool, &payload.tool_input, self.config.mcp.max_input_size_bytes)
        else {
            self.audit_simple("preTool", Some(tool), "approve", json!({"content": "none"}));
            return DecisionEnvelope::Approve;
        };

        let tier = router::route(
            self.config.model_routing.enabled,
            extracted.context,
            &extracted.text,
        );

        let extension = extracted
            .file_path
            .as_deref()
            .and_then(|p| Path::new(p).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let research = self.config.cycle4.enabled
            && extracted.context == ToolContext::FileWrite
            && extracted
                .file_path
                .as_deref()
                .is_some_and(rules::is_research_path);
        let cycles: &[u8] = if research { &[4] } else { &[1, 2] };

        let disabled = if tier == RouteTier::Strict {
            Default::default()
        } else {
            self.config.effective_disabled_rules()
        };

        let mut violations = rules::evaluate(&EvalRequest {
            content: &extracted.text,
            extension: extension.as_deref(),
            context: extracted.context,
            disabled: &disabled,
            critical_only: tier == RouteTier::Light,
            cycles,
        });

        if violations.is_empty() {
            self.note_clean_pass(extracted.file_path.as_deref());
            self.audit_simple("preTool", Some(tool), "approve", json!({}));
            return DecisionEnvelope::Approve;
        }

        let blocking = violations
            .iter()
            .any(|v| v.is_blocking(self.config.trust_level));
        if !blocking {
            let entry = AuditEntry::new(&self.session_id, "preTool", Some(tool), "approve")
                .with_violations(violations);
            self.audit.append(&entry);
            return DecisionEnvelope::Approve;
        }

        let reason = self.build_block_reason(&mut violations, extracted.file_path.as_deref());

        let entry = AuditEntry::new(&self.session_id, "preTool", Some(tool), "block")
            .with_violations(violations);
        self.audit.append(&entry);
        DecisionEnvelope::Block { reason }
    }

    /// Assemble the block reason: violation lines, budget condensation,
    /// correction hints, and the escalation block, all persisted back into
    /// session state.
    fn build_block_reason(
        &self,
        violations: &mut Vec<Violation>,
        file_path: Option<&str>,
    ) -> String {
        let mut state = self.store.load();

        budget::condense_if_over_budget(
            violations,
            &state.budget,
            self.config.max_verification_tokens,
        );

        let mut sections = Vec::new();
        let mut lines = vec![format!(
            "Quadruple Verification BLOCKED ({} violation{})",
            violations.len(),
            if violations.len() == 1 { "" } else { "s" }
        )];
        for violation in violations.iter() {
            lines.push(format!(
                "[Cycle {} - {}] {}",
                violation.cycle, violation.rule_id, violation.message
            ));
        }
        sections.push(lines.join("\n"));
        sections.push(correction::format_hints(violations));

        for violation in violations.iter() {
            state.record_rule_fired(&violation.rule_id, false);
        }

        if let Some(path) = file_path {
            let entry = state.correction.entry(path.to_string()).or_default();
            entry.record_block(violations);
            if let Some(escalation) = correction::escalation_message(path, entry) {
                sections.push(escalation);
            }
        }

        let reason = sections.join("\n\n");
        state.budget.record(source::BLOCK_MESSAGE, &reason);
        state.budget.record(source::CORRECTION_HINT, &sections[1]);
        self.store.save(&state);
        reason
    }

    /// A clean evaluation after earlier blocks on the same path means the
    /// correction landed; credit the rules that fired.
    fn note_clean_pass(&self, file_path: Option<&str>) {
        let Some(path) = file_path else { return };
        let mut state = self.store.load();
        let Some(entry) = state.correction.get(path) else { return };
        if entry.attempts == 0 {
            return;
        }
        let fixed_rules: Vec<String> = entry
            .history
            .back()
            .map(|attempt| attempt.violations.clone())
            .unwrap_or_default();
        for rule_id in &fixed_rules {
            state.record_rule_fired(rule_id, true);
        }
        state.correction.remove(path);
        self.store.save(&state);
    }

    // --- post-tool ---

    fn handle_post_tool(&self, payload: &ToolEventPayload) -> DecisionEnvelope {
        let tool = payload.tool_name.as_str();
        let mut state = self.store.load();

        let warnings = behavior::record_and_detect(&mut state, tool, &payload.tool_input);
        for warning in &warnings {
            eprintln!("{} behavior: [{}] {}", crate::STDERR_PREFIX, warning.id, warning.description);
            state.budget.record(source::BEHAVIORAL_WARNING, &warning.description);
        }

        let mut entry = AuditEntry::new(&self.session_id, "postTool", Some(tool), "logOnly");
        if !warnings.is_empty() {
            entry = entry.with_metadata("behaviorWarnings", json!(warnings));
        }

        let context = crate::harness::tool_context(tool);
        if matches!(context, ToolContext::Web | ToolContext::Mcp) {
            if let Some(external) = external_content(payload) {
                let findings = boundary::detect_injection_patterns(&external);
                if !findings.is_empty() {
                    for finding in &findings {
                        eprintln!(
                            "{} injection: [{}] {}",
                            crate::STDERR_PREFIX,
                            finding.id,
                            finding.description
                        );
                    }
                    let excerpt: String = external.chars().take(500).collect();
                    entry = entry
                        .with_metadata("injectionFindings", json!(findings))
                        .with_metadata(
                            "externalContent",
                            json!(boundary::wrap_external_content(&excerpt)),
                        );
                }
            }
        }

        if context == ToolContext::Bash {
            if let Some(command) = payload.tool_input.get("command").and_then(|v| v.as_str()) {
                let findings = sensitive::scan_command(command);
                if !findings.is_empty() {
                    eprintln!(
                        "{} sensitive access: {}",
                        crate::STDERR_PREFIX,
                        findings
                            .iter()
                            .map(|f| f.id.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    let snapshot = sensitive::capture_process_snapshot();
                    entry = entry
                        .with_metadata("sensitiveFindings", json!(findings))
                        .with_metadata("processSnapshot", json!(snapshot));
                }
            }
        }

        self.store.save(&state);
        self.audit.append(&entry);
        DecisionEnvelope::Empty
    }

    // --- stop ---

    async fn handle_stop(&self, payload: &StopPayload) -> DecisionEnvelope {
        let mut state = self.store.load();

        let mut prompt = review::compose_stop_prompt(
            self.config.cycle4.enabled,
            &state.files_written,
            &self.project_root,
        );

        let mut entry = AuditEntry::new(&self.session_id, "stop", None, "logOnly");

        let verifier = InferenceVerifier::from_config(&self.config);
        if verifier.is_enabled() {
            let request = payload.request.as_deref().unwrap_or("");
            let response = payload.response.as_deref().unwrap_or("");
            let outcome = verifier.evaluate(request, response).await;
            debug!("cycle5 outcome: pass={} skipped={}", outcome.pass, outcome.skipped);
            if !outcome.pass {
                prompt.push_str(&format!(
                    "\n\nA second-opinion review flagged this response: {}",
                    outcome.reasoning
                ));
            }
            entry = entry.with_metadata("cycle5", json!(outcome));
        }

        state.budget.record(source::STOP_PROMPT, &prompt);
        self.store.save(&state);
        self.audit.append(&entry);

        DecisionEnvelope::Prompt { prompt }
    }

    fn audit_simple(
        &self,
        event: &str,
        tool: Option<&str>,
        decision: &str,
        metadata: serde_json::Value,
    ) {
        let mut entry = AuditEntry::new(&self.session_id, event, tool, decision);
        if let serde_json::Value::Object(map) = metadata {
            for (key, value) in map {
                entry.metadata.insert(key, value);
            }
        }
        self.audit.append(&entry);
    }
}

/// Synthetic violation recorded when the capability gate denies a tool.
fn capability_denied_violation(tool: &str, missing: &[String]) -> Violation {
    Violation {
        rule_id: "capability-denied".to_string(),
        cycle: 2,
        priority: 200,
        severity: decision::Severity::Critical,
        code: "security.capability-denied".to_string(),
        remediation: "Allow the capability in configuration or use a permitted tool".to_string(),
        message: format!("Capability denied for {tool}: missing {}", missing.join(", ")),
        condensed: false,
    }
}

/// External content carried by a web or MCP tool call: the response when the
/// host forwards it, otherwise the input itself.
fn external_content(payload: &ToolEventPayload) -> Option<String> {
    if let Some(response) = &payload.tool_response {
        if let Some(text) = response.as_str() {
            return Some(text.to_string());
        }
        if let Some(map) = response.as_object() {
            let parts: Vec<&str> = map.values().filter_map(|v| v.as_str()).collect();
            if !parts.is_empty() {
                return Some(parts.join("\n"));
            }
        }
    }
    payload
        .tool_input
        .get("url")
        .or_else(|| payload.tool_input.get("query"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Entry point used by the CLI: parse stdin, dispatch, and reduce every
/// failure to the pass-through envelope for that hook point.
pub async fn run_hook(raw_input: &str) -> DecisionEnvelope {
    let event = match crate::harness::HookHarness::parse_event(raw_input) {
        Ok(event) => event,
        Err(e) => {
            warn!("unparseable hook event, approving: {e}");
            eprintln!("{} unparseable event: {e}", crate::STDERR_PREFIX);
            return DecisionEnvelope::Approve;
        }
    };

    let verifier = Verifier::for_event(&event);
    verifier.handle(&event).await
}
