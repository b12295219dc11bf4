//! Text repair passes for model-emitted JSON.
//!
//! Every pass is a total `&str -> String` function: it never fails, and when
//! it has nothing to fix it returns the input unchanged. Deciding whether the
//! result parses is the extractor's job.
//!
//! The chain order is fixed: single quotes, trailing commas, bare keys,
//! whitespace. Quote conversion runs first so every later pass sees only
//! double-quoted literals. Each pass is tagged structural or heuristic;
//! heuristic passes guess at intent and can alter legitimate content.

use std::sync::LazyLock;

use regex::Regex;

// ═══════════════════════════════════════════════════════════
// Chain
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    Structural,
    Heuristic,
}

/// A named repair pass.
#[derive(Debug, Clone, Copy)]
pub struct RepairPass {
    pub name: &'static str,
    pub stage: RepairStage,
    pub apply: fn(&str) -> String,
}

/// Applied cumulatively, in order, after a strict parse fails.
pub const REPAIR_CHAIN: &[RepairPass] = &[
    RepairPass {
        name: "single_quotes",
        stage: RepairStage::Heuristic,
        apply: normalize_single_quotes,
    },
    RepairPass {
        name: "trailing_commas",
        stage: RepairStage::Structural,
        apply: remove_trailing_commas,
    },
    RepairPass {
        name: "bare_keys",
        stage: RepairStage::Heuristic,
        apply: quote_bare_keys,
    },
    RepairPass {
        name: "collapse_whitespace",
        stage: RepairStage::Heuristic,
        apply: collapse_whitespace,
    },
];

// ═══════════════════════════════════════════════════════════
// Framing
// ═══════════════════════════════════════════════════════════

static FENCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(```|~~~)[A-Za-z0-9_+.\-]*\s*$").expect("valid regex"));

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Trim, then drop a leading and a trailing fence line if present.
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();

    if let Some((first, rest)) = body.split_once('\n') {
        if FENCE_LINE_RE.is_match(first) {
            body = rest;
        }
    } else if FENCE_LINE_RE.is_match(body) {
        return String::new();
    }

    if let Some((rest, last)) = body.rsplit_once('\n') {
        if FENCE_LINE_RE.is_match(last) {
            body = rest;
        }
    }

    body.trim().to_string()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

// ═══════════════════════════════════════════════════════════
// Structural
// ═══════════════════════════════════════════════════════════

/// Drop commas that directly precede `}` or `]` (whitespace allowed between).
pub fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

// ═══════════════════════════════════════════════════════════
// Heuristic
// ═══════════════════════════════════════════════════════════

/// Rewrite `'single quoted'` literals as `"double quoted"` ones.
///
/// Apostrophes inside double-quoted literals are left alone. An apostrophe
/// inside a single-quoted literal still terminates it.
pub fn normalize_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push('"');
                copy_double_quoted(&mut chars, &mut out);
            }
            '\'' => {
                out.push('"');
                let mut escaped = false;
                for inner in chars.by_ref() {
                    if escaped {
                        if inner != '\'' {
                            out.push('\\');
                        }
                        out.push(inner);
                        escaped = false;
                    } else if inner == '\\' {
                        escaped = true;
                    } else if inner == '\'' {
                        break;
                    } else if inner == '"' {
                        out.push_str("\\\"");
                    } else {
                        out.push(inner);
                    }
                }
                out.push('"');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Quote identifier keys: `{crop: 1, next_key : 2}` → `{"crop": 1, "next_key" : 2}`.
///
/// Only identifiers directly after `{` or `,` and followed by `:` are quoted.
pub fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '"' {
            out.push(c);
            i += 1;
            let mut escaped = false;
            while i < chars.len() {
                let inner = chars[i];
                out.push(inner);
                i += 1;
                if escaped {
                    escaped = false;
                } else if inner == '\\' {
                    escaped = true;
                } else if inner == '"' {
                    break;
                }
            }
            last_significant = Some('"');
            continue;
        }

        let at_key_position = matches!(last_significant, Some('{') | Some(','));
        if at_key_position && (c.is_ascii_alphabetic() || c == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let followed_by_colon = chars[i..]
                .iter()
                .find(|ch| !ch.is_whitespace())
                .is_some_and(|&ch| ch == ':');

            if followed_by_colon {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            last_significant = ident.chars().last();
            continue;
        }

        if !c.is_whitespace() {
            last_significant = Some(c);
        }
        out.push(c);
        i += 1;
    }

    out
}

/// Collapse every whitespace run, including raw newlines inside literals, to one space.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(text, " ").into_owned()
}

fn copy_double_quoted(chars: &mut std::str::Chars<'_>, out: &mut String) {
    let mut escaped = false;
    for inner in chars.by_ref() {
        out.push(inner);
        if escaped {
            escaped = false;
        } else if inner == '\\' {
            escaped = true;
        } else if inner == '"' {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Fences ──────────────────────────────────────────

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence_with_surrounding_whitespace() {
        assert_eq!(strip_code_fences("  \n```\n{\"a\":1}\n```  \n"), "{\"a\":1}");
    }

    #[test]
    fn leaves_unfenced_text() {
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn fence_in_middle_of_prose_untouched() {
        let text = "Here you go:\n```json\n{\"a\":1}\n```";
        let stripped = strip_code_fences(text);
        assert!(stripped.starts_with("Here you go:"));
        assert!(!stripped.ends_with("```"));
    }

    // ── Object isolation ────────────────────────────────

    #[test]
    fn isolates_object_from_prose() {
        let text = "Analysis below.\n{\"crop\": \"Wheat\"}\nLet me know!";
        assert_eq!(isolate_object(text), Some("{\"crop\": \"Wheat\"}"));
    }

    #[test]
    fn no_braces_no_object() {
        assert_eq!(isolate_object("no braces here"), None);
        assert_eq!(isolate_object("only { open"), None);
        assert_eq!(isolate_object("} reversed {"), None);
    }

    // ── Trailing commas ─────────────────────────────────

    #[test]
    fn removes_trailing_commas() {
        assert_eq!(remove_trailing_commas("{\"a\":1,}"), "{\"a\":1}");
        assert_eq!(remove_trailing_commas("[1, 2,\n  ]"), "[1, 2\n  ]");
    }

    #[test]
    fn keeps_commas_inside_strings() {
        let text = r#"{"note": "sell, }later"}"#;
        assert_eq!(remove_trailing_commas(text), text);
    }

    // ── Single quotes ───────────────────────────────────

    #[test]
    fn single_quoted_literals_converted() {
        assert_eq!(
            normalize_single_quotes("{'crop': 'Wheat'}"),
            "{\"crop\": \"Wheat\"}"
        );
    }

    #[test]
    fn apostrophes_in_double_quoted_literals_kept() {
        let text = r#"{"note": "farmer's choice"}"#;
        assert_eq!(normalize_single_quotes(text), text);
    }

    #[test]
    fn embedded_double_quote_escaped() {
        assert_eq!(
            normalize_single_quotes(r#"{'note': 'say "hi"'}"#),
            r#"{"note": "say \"hi\""}"#
        );
    }

    // ── Bare keys ───────────────────────────────────────

    #[test]
    fn quotes_bare_keys() {
        assert_eq!(
            quote_bare_keys("{crop: \"Wheat\", quality_score : 82}"),
            "{\"crop\": \"Wheat\", \"quality_score\" : 82}"
        );
    }

    #[test]
    fn literals_in_arrays_not_quoted() {
        let text = "{\"flags\": [true, false, null]}";
        assert_eq!(quote_bare_keys(text), text);
    }

    #[test]
    fn colons_inside_strings_untouched() {
        let text = r#"{"time": "note: 10:30", next: 1}"#;
        assert_eq!(
            quote_bare_keys(text),
            r#"{"time": "note: 10:30", "next": 1}"#
        );
    }

    // ── Whitespace ──────────────────────────────────────

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(collapse_whitespace("{\n  \"a\":\t1\n}"), "{ \"a\": 1 }");
    }

    // ── Chain ───────────────────────────────────────────

    #[test]
    fn chain_order_is_fixed() {
        let names: Vec<&str> = REPAIR_CHAIN.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            ["single_quotes", "trailing_commas", "bare_keys", "collapse_whitespace"]
        );
    }

    #[test]
    fn quotes_converted_before_commas_removed() {
        let repaired = REPAIR_CHAIN
            .iter()
            .fold("{'note': 'sow, }later',}".to_string(), |text, pass| {
                (pass.apply)(&text)
            });
        assert_eq!(repaired, r#"{"note": "sow, }later"}"#);
    }
}
