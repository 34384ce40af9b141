//! Lexical context analysis - classify match offsets as code vs comment/string.
//!
//! Context-aware rules only count a pattern hit as a violation when the match
//! lands in real code. Rather than parsing, the analyzer strips comments and
//! string literals by replacing them with whitespace of equal byte length, so
//! any byte offset in the original content maps directly onto the stripped
//! form. Two language families are recognized by file extension; everything
//! else bypasses context analysis.

/// A recognized source-language family with its own stripping rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    /// `//`, `/* */`, single/double/backtick strings.
    CLike,
    /// `#` comments, single/double and triple-quoted strings.
    Indentation,
}

impl LanguageFamily {
    /// Map a file extension (without dot) to its family, if supported.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "ts" | "jsx" | "tsx" | "mjs" | "cjs" => Some(LanguageFamily::CLike),
            "py" | "pyi" => Some(LanguageFamily::Indentation),
            _ => None,
        }
    }

    /// Replace comments and string literals with spaces of equal length.
    ///
    /// Newlines inside stripped spans are preserved so line-anchored patterns
    /// still see the original line structure. Byte offsets are invariant:
    /// `strip(s).len() == s.len()` for every input.
    pub fn strip(&self, content: &str) -> String {
        match self {
            LanguageFamily::CLike => strip_c_like(content),
            LanguageFamily::Indentation => strip_indentation(content),
        }
    }
}

/// True when the byte at `offset` falls inside a comment or string literal.
///
/// Defined as: the stripped form has a space where the original had a
/// non-space. Unsupported extensions always report `false`.
pub fn is_in_comment_or_string(content: &str, offset: usize, ext: &str) -> bool {
    let Some(family) = LanguageFamily::from_extension(ext) else {
        return false;
    };
    let stripped = family.strip(content);
    match (content.as_bytes().get(offset), stripped.as_bytes().get(offset)) {
        (Some(&original), Some(&replaced)) => replaced == b' ' && original != b' ',
        _ => false,
    }
}

/// Blank a byte range in the output buffer, preserving newlines.
fn blank(out: &mut [u8], start: usize, end: usize) {
    for byte in &mut out[start..end] {
        if *byte != b'\n' && *byte != b'\r' {
            *byte = b' ';
        }
    }
}

fn strip_c_like(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'`' => i = blank_quoted(bytes, &mut out, i, b'`', true),
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                let start = i;
                i += 2;
                while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                let end = if i + 1 < len { i + 2 } else { len };
                blank(&mut out, start, end);
                i = end;
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'/' => {
                let start = i;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                blank(&mut out, start, i);
            }
            b'"' => i = blank_quoted(bytes, &mut out, i, b'"', false),
            b'\'' => i = blank_quoted(bytes, &mut out, i, b'\'', false),
            _ => i += 1,
        }
    }

    // Spans only ever shrink to whitespace, so this stays valid UTF-8:
    // multi-byte characters are either untouched or fully blanked.
    String::from_utf8(out).unwrap_or_else(|_| " ".repeat(len))
}

/// Blank a quoted span starting at `start` (which holds the delimiter).
/// Returns the index just past the closing delimiter. `multiline` controls
/// whether an unescaped newline terminates the span (plain strings) or is
/// part of it (template literals).
fn blank_quoted(
    bytes: &[u8],
    out: &mut [u8],
    start: usize,
    delim: u8,
    multiline: bool,
) -> usize {
    let len = bytes.len();
    let mut i = start + 1;
    while i < len {
        match bytes[i] {
            b'\\' if i + 1 < len => i += 2,
            b'\n' if !multiline => break,
            b if b == delim => {
                i += 1;
                break;
            }
            _ => i += 1,
        }
    }
    let end = i.min(len);
    blank(out, start, end);
    end
}

fn strip_indentation(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = bytes.to_vec();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'#' => {
                let start = i;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                blank(&mut out, start, i);
            }
            b'"' | b'\'' => {
                let delim = bytes[i];
                if i + 2 < len && bytes[i + 1] == delim && bytes[i + 2] == delim {
                    i = blank_triple_quoted(bytes, &mut out, i, delim);
                } else {
                    i = blank_quoted(bytes, &mut out, i, delim, false);
                }
            }
            _ => i += 1,
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| " ".repeat(len))
}

fn blank_triple_quoted(bytes: &[u8], out: &mut [u8], start: usize, delim: u8) -> usize {
    let len = bytes.len();
    let mut i = start + 3;
    while i < len {
        if bytes[i] == b'\\' && i + 1 < len {
            i += 2;
            continue;
        }
        if i + 2 < len && bytes[i] == delim && bytes[i + 1] == delim && bytes[i + 2] == delim {
            i += 3;
            break;
        }
        if i + 2 >= len {
            i = len;
            break;
        }
        i += 1;
    }
    let end = i.min(len);
    blank(out, start, end);
    end
}
