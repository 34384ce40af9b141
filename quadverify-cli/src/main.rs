//! quadverify - quadruple-verification hook binary for AI coding agents.
//!
//! The host runtime invokes `quadverify eval` at each hook point with one
//! JSON event on stdin. The process always exits 0; any internal failure
//! reduces to the pass-through envelope for that hook point (fail-open).

use std::io::Read;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use quadverify_core::engine;
use quadverify_core::harness::DecisionEnvelope;
use quadverify_core::{audit, config, project, STDERR_PREFIX};

/// Hook events larger than this are rejected up front (still fail-open).
const MAX_STDIN_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, ValueEnum)]
enum AuditFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "quadverify",
    about = "Quadruple-verification policy layer for AI coding agent hooks",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Evaluate a hook event from stdin and emit a decision envelope
    Eval,

    /// Inspect the audit log for a session
    Audit {
        /// Session id; defaults to the most recently written session
        #[clap(long)]
        session: Option<String>,

        /// Show only the last N entries
        #[clap(long)]
        tail: Option<usize>,

        /// Filter by event kind (preTool, postTool, stop)
        #[clap(long)]
        event: Option<String>,

        /// Output format
        #[clap(long, value_enum, default_value = "pretty")]
        format: AuditFormat,
    },

    /// Write a starter user configuration file
    Init {
        /// Overwrite an existing configuration
        #[clap(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Eval => run_eval(),
        Command::Audit {
            session,
            tail,
            event,
            format,
        } => {
            if let Err(e) = run_audit(session, tail, event, format) {
                eprintln!("{STDERR_PREFIX} audit: {e:#}");
                std::process::exit(1);
            }
        }
        Command::Init { force } => {
            if let Err(e) = run_init(force) {
                eprintln!("{STDERR_PREFIX} init: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

/// The hook path. Exit code is always 0; a blocked call is expressed purely
/// through the stdout envelope.
fn run_eval() {
    let mut raw_input = String::new();
    let read_result = std::io::stdin()
        .take(MAX_STDIN_BYTES)
        .read_to_string(&mut raw_input);

    let envelope = match read_result {
        Ok(0) => {
            eprintln!("{STDERR_PREFIX} empty stdin, approving");
            DecisionEnvelope::Approve
        }
        Ok(_) => evaluate_supervised(&raw_input),
        Err(e) => {
            eprintln!("{STDERR_PREFIX} stdin read failed, approving: {e}");
            DecisionEnvelope::Approve
        }
    };

    if let Some(body) = envelope.to_stdout() {
        println!("{body}");
    }
}

/// Run the engine under a panic guard. A verifier bug must never block the
/// host, so a panic degrades to approve.
fn evaluate_supervised(raw_input: &str) -> DecisionEnvelope {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build();
        match runtime {
            Ok(runtime) => runtime.block_on(engine::run_hook(raw_input)),
            Err(e) => {
                eprintln!("{STDERR_PREFIX} runtime init failed, approving: {e}");
                DecisionEnvelope::Approve
            }
        }
    }));

    match result {
        Ok(envelope) => envelope,
        Err(_) => {
            eprintln!("{STDERR_PREFIX} internal panic, approving");
            DecisionEnvelope::Approve
        }
    }
}

fn run_audit(
    session: Option<String>,
    tail: Option<usize>,
    event: Option<String>,
    format: AuditFormat,
) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let project_root = project::find_project_root(&cwd);
    let config = config::ConfigResolver::new(&project_root).resolve();
    let audit_dir = config
        .audit_dir
        .unwrap_or_else(|| project_root.join(audit::AUDIT_DIR));

    let session = match session {
        Some(session) => session,
        None => latest_session(&audit_dir)?,
    };
    let path = audit_dir.join(format!("{session}.jsonl"));
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("no audit log at {}", path.display()))?;

    let mut entries: Vec<serde_json::Value> = content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    if let Some(event) = &event {
        entries.retain(|e| e.get("event").and_then(|v| v.as_str()) == Some(event.as_str()));
    }
    if let Some(tail) = tail {
        let skip = entries.len().saturating_sub(tail);
        entries.drain(..skip);
    }

    for entry in &entries {
        match format {
            AuditFormat::Json => println!("{entry}"),
            AuditFormat::Pretty => {
                let timestamp = entry["timestamp"].as_str().unwrap_or("-");
                let event = entry["event"].as_str().unwrap_or("-");
                let tool = entry["tool"].as_str().unwrap_or("-");
                let decision = entry["decision"].as_str().unwrap_or("-");
                let violations = entry["violations"]
                    .as_array()
                    .map(|v| v.len())
                    .unwrap_or(0);
                println!("{timestamp}  {event:<9} {tool:<12} {decision:<8} violations={violations}");
            }
        }
    }

    Ok(())
}

/// Most recently modified audit log in the directory.
fn latest_session(audit_dir: &PathBuf) -> Result<String> {
    let mut newest: Option<(std::time::SystemTime, String)> = None;
    for entry in std::fs::read_dir(audit_dir)
        .with_context(|| format!("no audit directory at {}", audit_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, stem.to_string()));
        }
    }
    newest
        .map(|(_, session)| session)
        .context("no audit logs found")
}

fn run_init(force: bool) -> Result<()> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    let path = PathBuf::from(home).join(quadverify_core::config::USER_CONFIG_FILE);

    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let starter = serde_json::json!({
        "trustLevel": "standard",
        "leanMode": false,
        "disabledRules": [],
        "maxVerificationTokens": 500,
        "cycle5": {
            "enabled": false,
            "model": "google/gemini-2.5-flash"
        }
    });
    std::fs::write(&path, serde_json::to_string_pretty(&starter)?)?;
    println!("Wrote {}", path.display());
    Ok(())
}
