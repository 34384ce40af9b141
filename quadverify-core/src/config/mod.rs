//! Layered configuration - defaults <- user <- project, deep-merged.
//!
//! Three JSON layers are read in order: the plugin-root default rules file,
//! the user-level file under `$HOME/.claude/`, and the project-level file
//! under `<projectRoot>/.claude/`. A missing or unparseable layer is treated
//! as an empty map with a stderr warning; configuration can never make an
//! invocation fail.

mod merge;

pub use merge::deep_merge;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const USER_CONFIG_FILE: &str = ".claude/quadruple-verify-config.json";
pub const PROJECT_CONFIG_FILE: &str = ".claude/quadruple-verify-config.json";
pub const DEFAULT_RULES_FILE: &str = "config/default-rules.json";

/// Environment variable that overrides the Cycle-5 API key from config.
pub const API_KEY_ENV: &str = "QUADVERIFY_API_KEY";

/// Enforcement strictness dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Pre-tool enforcement is skipped entirely.
    Minimal,
    #[default]
    Standard,
    /// Disabled-rule lists are ignored and info findings block.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityConfig {
    pub enabled: bool,
    pub allowed: BTreeSet<String>,
    pub fail_closed: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed: ["filesystem", "shell", "network", "mcp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fail_closed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelRoutingConfig {
    pub enabled: bool,
}

impl Default for ModelRoutingConfig {
    fn default() -> Self {
        // Off by default: the light tier skips non-critical rules.
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cycle4Config {
    pub enabled: bool,
}

impl Default for Cycle4Config {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cycle5Config {
    pub enabled: bool,
    pub model: String,
    pub api_key: Option<String>,
    pub min_response_tokens: usize,
    pub endpoint: String,
    pub dry_run: bool,
}

impl Default for Cycle5Config {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "google/gemini-2.5-flash".to_string(),
            api_key: None,
            min_response_tokens: 100,
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpConfig {
    pub max_input_size_bytes: usize,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            max_input_size_bytes: 1024 * 1024,
        }
    }
}

/// The fully merged configuration, read-only for the life of one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolvedConfig {
    pub trust_level: TrustLevel,
    pub lean_mode: bool,
    pub disabled_rules: BTreeSet<String>,
    pub capabilities: CapabilityConfig,
    pub model_routing: ModelRoutingConfig,
    pub max_verification_tokens: usize,
    pub cycle4: Cycle4Config,
    pub cycle5: Cycle5Config,
    pub audit_dir: Option<PathBuf>,
    pub mcp: McpConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            trust_level: TrustLevel::default(),
            lean_mode: false,
            disabled_rules: BTreeSet::new(),
            capabilities: CapabilityConfig::default(),
            model_routing: ModelRoutingConfig::default(),
            max_verification_tokens: 500,
            cycle4: Cycle4Config::default(),
            cycle5: Cycle5Config::default(),
            audit_dir: None,
            mcp: McpConfig::default(),
        }
    }
}

impl ResolvedConfig {
    /// Rules disabled for this invocation, honoring the strict-trust override.
    pub fn effective_disabled_rules(&self) -> BTreeSet<String> {
        if self.trust_level == TrustLevel::Strict {
            BTreeSet::new()
        } else {
            self.disabled_rules.clone()
        }
    }

    /// Cycle-5 API key, with the environment override taking precedence.
    pub fn cycle5_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.cycle5.api_key.clone())
    }
}

/// Resolves the three configuration layers into a [`ResolvedConfig`].
pub struct ConfigResolver {
    plugin_root: Option<PathBuf>,
    home: Option<PathBuf>,
    project_root: PathBuf,
}

impl ConfigResolver {
    pub fn new(project_root: &Path) -> Self {
        Self {
            plugin_root: plugin_root(),
            home: std::env::var("HOME").ok().map(PathBuf::from),
            project_root: project_root.to_path_buf(),
        }
    }

    /// Override the layer paths explicitly (used by tests).
    pub fn with_layers(
        plugin_root: Option<PathBuf>,
        home: Option<PathBuf>,
        project_root: PathBuf,
    ) -> Self {
        Self {
            plugin_root,
            home,
            project_root,
        }
    }

    /// Merge all layers. Never fails; bad layers degrade to defaults.
    pub fn resolve(&self) -> ResolvedConfig {
        let mut merged = serde_json::json!({});

        for path in self.layer_paths() {
            if let Some(layer) = load_layer(&path) {
                merged = deep_merge(merged, layer);
            }
        }

        match serde_json::from_value(merged) {
            Ok(config) => config,
            Err(e) => {
                warn!("configuration did not match schema, using defaults: {e}");
                eprintln!("{} config error: {e}", crate::STDERR_PREFIX);
                ResolvedConfig::default()
            }
        }
    }

    fn layer_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(root) = &self.plugin_root {
            paths.push(root.join(DEFAULT_RULES_FILE));
        }
        if let Some(home) = &self.home {
            paths.push(home.join(USER_CONFIG_FILE));
        }
        paths.push(self.project_root.join(PROJECT_CONFIG_FILE));
        paths
    }
}

/// Directory containing the plugin's bundled `config/` tree, resolved from
/// the running executable's location.
fn plugin_root() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    // target/<profile>/quadverify -> repo root during development,
    // <install-dir>/quadverify -> install dir in production.
    let parent = exe.parent()?;
    for candidate in [parent, parent.parent()?, parent.parent()?.parent()?] {
        if candidate.join(DEFAULT_RULES_FILE).is_file() {
            return Some(candidate.to_path_buf());
        }
    }
    None
}

fn load_layer(path: &Path) -> Option<serde_json::Value> {
    if !path.is_file() {
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("could not read config layer {}: {e}", path.display());
            eprintln!(
                "{} skipping unreadable config {}: {e}",
                crate::STDERR_PREFIX,
                path.display()
            );
            return None;
        }
    };
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            warn!("config layer {} is not a JSON object", path.display());
            None
        }
        Err(e) => {
            warn!("could not parse config layer {}: {e}", path.display());
            eprintln!(
                "{} skipping unparseable config {}: {e}",
                crate::STDERR_PREFIX,
                path.display()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.trust_level, TrustLevel::Standard);
        assert!(!config.lean_mode);
        assert_eq!(config.max_verification_tokens, 500);
        assert!(config.capabilities.enabled);
        assert!(config.capabilities.fail_closed);
        assert!(!config.cycle5.enabled);
        assert_eq!(config.mcp.max_input_size_bytes, 1024 * 1024);
    }

    #[test]
    fn test_layer_precedence_project_over_user() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        fs::create_dir_all(home.path().join(".claude")).unwrap();
        fs::write(
            home.path().join(USER_CONFIG_FILE),
            r#"{"leanMode": true, "maxVerificationTokens": 300}"#,
        )
        .unwrap();

        fs::create_dir_all(project.path().join(".claude")).unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            r#"{"leanMode": false}"#,
        )
        .unwrap();

        let resolver = ConfigResolver::with_layers(
            None,
            Some(home.path().to_path_buf()),
            project.path().to_path_buf(),
        );
        let config = resolver.resolve();

        assert!(!config.lean_mode);
        // Untouched by the project layer, so the user layer survives.
        assert_eq!(config.max_verification_tokens, 300);
    }

    #[test]
    fn test_unparseable_layer_is_skipped() {
        let project = TempDir::new().unwrap();
        fs::create_dir_all(project.path().join(".claude")).unwrap();
        fs::write(project.path().join(PROJECT_CONFIG_FILE), "{ not json").unwrap();

        let resolver = ConfigResolver::with_layers(None, None, project.path().to_path_buf());
        let config = resolver.resolve();
        assert_eq!(config.trust_level, TrustLevel::Standard);
    }

    #[test]
    fn test_strict_clears_disabled_rules() {
        let mut config = ResolvedConfig::default();
        config.disabled_rules.insert("no-eval".to_string());

        assert!(config.effective_disabled_rules().contains("no-eval"));
        config.trust_level = TrustLevel::Strict;
        assert!(config.effective_disabled_rules().is_empty());
    }

    #[test]
    fn test_nested_merge_of_cycle5() {
        let project = TempDir::new().unwrap();
        fs::create_dir_all(project.path().join(".claude")).unwrap();
        fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            r#"{"cycle5": {"enabled": true, "model": "test/model"}}"#,
        )
        .unwrap();

        let resolver = ConfigResolver::with_layers(None, None, project.path().to_path_buf());
        let config = resolver.resolve();

        assert!(config.cycle5.enabled);
        assert_eq!(config.cycle5.model, "test/model");
        // Defaults untouched by the partial object.
        assert_eq!(config.cycle5.min_response_tokens, 100);
    }
}
