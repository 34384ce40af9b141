//! System-sensitivity detection - pattern-scan shell commands for access to
//! a fixed catalog of sensitive paths, with an optional process snapshot.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A sensitive-path hit in a shell command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensitiveFinding {
    pub id: String,
    pub description: String,
}

struct CatalogEntry {
    id: &'static str,
    pattern: &'static str,
    description: &'static str,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "etc-passwd",
        pattern: r"/etc/passwd\b",
        description: "system account database",
    },
    CatalogEntry {
        id: "etc-shadow",
        pattern: r"/etc/shadow\b",
        description: "system password hashes",
    },
    CatalogEntry {
        id: "ssh-keys",
        pattern: r"\.ssh/(?:id_[a-z0-9]+|authorized_keys|config|known_hosts)",
        description: "SSH keys and configuration",
    },
    CatalogEntry {
        id: "shell-history",
        pattern: r"\.(?:bash|zsh|sh)_history\b",
        description: "shell history",
    },
    CatalogEntry {
        id: "dotenv",
        pattern: r"(?:^|[\s/])\.env(?:\.\w+)?\b",
        description: "environment file",
    },
    CatalogEntry {
        id: "aws-credentials",
        pattern: r"\.aws/(?:credentials|config)\b",
        description: "AWS credentials",
    },
    CatalogEntry {
        id: "kube-config",
        pattern: r"\.kube/config\b",
        description: "Kubernetes configuration",
    },
    CatalogEntry {
        id: "docker-config",
        pattern: r"\.docker/config\.json\b",
        description: "Docker registry credentials",
    },
    CatalogEntry {
        id: "gnupg",
        pattern: r"\.gnupg\b",
        description: "GPG keyring",
    },
    CatalogEntry {
        id: "npm-token",
        pattern: r"\.npmrc\b|npm_token",
        description: "npm auth token",
    },
    CatalogEntry {
        id: "git-credentials",
        pattern: r"\.git-credentials\b",
        description: "stored git credentials",
    },
    CatalogEntry {
        id: "windows-sam",
        pattern: r"(?i)\\(?:system32\\)?config\\(?:SAM|SECURITY|SYSTEM)\b",
        description: "Windows registry hives",
    },
    CatalogEntry {
        id: "windows-credential-store",
        pattern: r"(?i)\\Microsoft\\Credentials\b|cmdkey\s+/list",
        description: "Windows credential store",
    },
    CatalogEntry {
        id: "dpapi",
        pattern: r"(?i)\\Microsoft\\Protect\b",
        description: "Windows DPAPI master keys",
    },
    CatalogEntry {
        id: "registry-secrets",
        pattern: r"(?i)reg(?:\.exe)?\s+query\s+\S*(?:password|credential|secret)",
        description: "registry secret query",
    },
];

static COMPILED: Lazy<Vec<(&'static CatalogEntry, Regex)>> = Lazy::new(|| {
    CATALOG
        .iter()
        .filter_map(|entry| Regex::new(entry.pattern).ok().map(|re| (entry, re)))
        .collect()
});

/// Scan one shell command against the catalog.
pub fn scan_command(command: &str) -> Vec<SensitiveFinding> {
    COMPILED
        .iter()
        .filter(|(_, re)| re.is_match(command))
        .map(|(entry, _)| SensitiveFinding {
            id: entry.id.to_string(),
            description: entry.description.to_string(),
        })
        .collect()
}

/// Lightweight snapshot of running process names, captured best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub available: bool,
    /// Top process names by count, at most ten entries.
    pub top: Vec<(String, usize)>,
}

impl ProcessSnapshot {
    fn unavailable() -> Self {
        Self {
            available: false,
            top: Vec::new(),
        }
    }
}

/// Capture a process snapshot. Failure yields the sentinel snapshot, never
/// an error.
pub fn capture_process_snapshot() -> ProcessSnapshot {
    let output = match std::process::Command::new("ps").args(["-eo", "comm="]).output() {
        Ok(output) if output.status.success() => output,
        _ => return ProcessSnapshot::unavailable(),
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        let name = line.trim();
        if !name.is_empty() {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    let mut top: Vec<(String, usize)> = counts.into_iter().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(10);

    ProcessSnapshot {
        available: true,
        top,
    }
}
