//! Content boundary analysis for untrusted external content.
//!
//! Anything that entered the agent's context through a network or MCP tool is
//! wrapped in boundary markers, normalized for homoglyph tricks, and scanned
//! against a fixed bank of prompt-injection phrases. Findings warn, never
//! block.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const BOUNDARY_START: &str = "<!-- EXTERNAL_CONTENT_START -->";
pub const BOUNDARY_END: &str = "<!-- EXTERNAL_CONTENT_END -->";

const ESCAPED_START: &str = "<!-- EXTERNAL_CONTENT_START [escaped] -->";
const ESCAPED_END: &str = "<!-- EXTERNAL_CONTENT_END [escaped] -->";

/// Wrap external content in boundary markers. Any marker already present in
/// the content is escaped so it cannot terminate the boundary early.
pub fn wrap_external_content(content: &str) -> String {
    let sanitized = content
        .replace(BOUNDARY_START, ESCAPED_START)
        .replace(BOUNDARY_END, ESCAPED_END);
    format!("{BOUNDARY_START}\n{sanitized}\n{BOUNDARY_END}")
}

/// Fixed table of Cyrillic and Greek characters visually identical to Latin.
const LOOKALIKES: &[(char, char)] = &[
    // Cyrillic lowercase
    ('а', 'a'),
    ('е', 'e'),
    ('о', 'o'),
    ('р', 'p'),
    ('с', 'c'),
    ('х', 'x'),
    ('у', 'y'),
    ('і', 'i'),
    ('ѕ', 's'),
    // Cyrillic uppercase
    ('А', 'A'),
    ('В', 'B'),
    ('Е', 'E'),
    ('К', 'K'),
    ('М', 'M'),
    ('Н', 'H'),
    ('О', 'O'),
    ('Р', 'P'),
    ('С', 'C'),
    ('Т', 'T'),
    ('Х', 'X'),
    // Greek
    ('α', 'a'),
    ('ο', 'o'),
    ('ρ', 'p'),
    ('τ', 't'),
    ('υ', 'u'),
    ('ν', 'v'),
    ('Α', 'A'),
    ('Β', 'B'),
    ('Ε', 'E'),
    ('Ζ', 'Z'),
    ('Η', 'H'),
    ('Ι', 'I'),
    ('Κ', 'K'),
    ('Μ', 'M'),
    ('Ν', 'N'),
    ('Ο', 'O'),
    ('Ρ', 'P'),
    ('Τ', 'T'),
    ('Υ', 'Y'),
    ('Χ', 'X'),
];

/// Fold homoglyphs to their ASCII counterparts: the fullwidth block
/// U+FF01-U+FF5E, the ideographic space, and a fixed lookalike table.
pub fn fold_homoglyphs(content: &str) -> String {
    content
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => {
                char::from_u32(c as u32 - 0xFF01 + 0x21).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            _ => LOOKALIKES
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c),
        })
        .collect()
}

/// A prompt-injection phrase found in external content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionFinding {
    pub id: String,
    pub description: String,
}

struct InjectionPattern {
    id: &'static str,
    pattern: &'static str,
    description: &'static str,
}

const INJECTION_BANK: &[InjectionPattern] = &[
    InjectionPattern {
        id: "ignore-previous",
        pattern: r"(?i)ignore\s+(?:all\s+)?previous\s+instructions",
        description: "asks the agent to ignore prior instructions",
    },
    InjectionPattern {
        id: "disregard-above",
        pattern: r"(?i)disregard\s+(?:the\s+|everything\s+)?above",
        description: "asks the agent to disregard earlier context",
    },
    InjectionPattern {
        id: "system-override",
        pattern: r"(?i)system\s+override\s*:",
        description: "fake system override directive",
    },
    InjectionPattern {
        id: "role-reassignment",
        pattern: r"(?i)you\s+are\s+now\s+an?\s+\w+",
        description: "attempts to reassign the agent's role",
    },
    InjectionPattern {
        id: "forget-everything",
        pattern: r"(?i)forget\s+everything",
        description: "asks the agent to drop its context",
    },
    InjectionPattern {
        id: "new-instructions",
        pattern: r"(?i)new\s+instructions?\s*:",
        description: "injects replacement instructions",
    },
    InjectionPattern {
        id: "act-as",
        pattern: r"(?i)\bact\s+as\s+(?:an?\s+)?\w+",
        description: "role-play coercion",
    },
    InjectionPattern {
        id: "pretend-you-are",
        pattern: r"(?i)pretend\s+(?:that\s+)?you\s+are",
        description: "role-play coercion",
    },
    InjectionPattern {
        id: "override-safety",
        pattern: r"(?i)override\s+safety",
        description: "asks to override safety rules",
    },
    InjectionPattern {
        id: "ignore-all-rules",
        pattern: r"(?i)ignore\s+all\s+rules",
        description: "asks to ignore all rules",
    },
    InjectionPattern {
        id: "bypass-restrictions",
        pattern: r"(?i)bypass\s+(?:all\s+)?restrictions",
        description: "asks to bypass restrictions",
    },
    InjectionPattern {
        id: "jailbreak-keywords",
        pattern: r"(?i)\bDAN\b|do\s+anything\s+now|developer\s+mode|god\s+mode",
        description: "known jailbreak persona keywords",
    },
    InjectionPattern {
        id: "instruction-delimiters",
        pattern: r"\[(?:INST|SYS|SYSTEM)\]",
        description: "model instruction delimiters in content",
    },
];

static COMPILED_BANK: Lazy<Vec<(&'static InjectionPattern, Regex)>> = Lazy::new(|| {
    INJECTION_BANK
        .iter()
        .filter_map(|p| Regex::new(p.pattern).ok().map(|re| (p, re)))
        .collect()
});

/// Detect prompt-injection phrases. Folding runs first so homoglyph-disguised
/// phrases are caught; the fold is recomputed per call, never cached.
pub fn detect_injection_patterns(content: &str) -> Vec<InjectionFinding> {
    let folded = fold_homoglyphs(content);
    COMPILED_BANK
        .iter()
        .filter(|(_, re)| re.is_match(&folded))
        .map(|(p, _)| InjectionFinding {
            id: p.id.to_string(),
            description: p.description.to_string(),
        })
        .collect()
}
