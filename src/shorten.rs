//! Preview text shortening.
//!
//! Lengths and positions are counted in characters.

use serde::Deserialize;

/// Default lower bound of the cut window.
pub const DEFAULT_MIN_LENGTH: usize = 80;

/// Default upper bound of the cut window.
pub const DEFAULT_MAX_LENGTH: usize = 120;

const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];
const CLAUSE_BREAKS: [&str; 3] = [", ", "; ", " - "];
const ELLIPSIS: &str = "...";

/// Cut window for [`shorten`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShortenOptions {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for ShortenOptions {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// Shorten `text` to a preview of at most about `max` characters.
///
/// Whitespace is collapsed first; text that then fits is returned as is.
/// Otherwise the cut prefers, in order: the end of a sentence inside
/// `min..=max`, the last clause break (`, `, `; `, ` - `) at or after `min`,
/// the last space at or after `min`, and finally a hard cut at `max - 3`.
/// All but the sentence cut end in `...`.
pub fn shorten(text: &str, min: usize, max: usize) -> String {
    let chars: Vec<char> = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();

    if chars.len() <= max {
        return chars.into_iter().collect();
    }

    for ending in SENTENCE_ENDINGS {
        if let Some(pos) = find_from(&chars, ending, min) {
            if pos > 0 && pos <= max {
                return prefix(&chars, pos + 1);
            }
        }
    }

    for clause in CLAUSE_BREAKS {
        if let Some(pos) = rfind_at_most(&chars, clause, max) {
            if pos >= min {
                return prefix(&chars, pos) + ELLIPSIS;
            }
        }
    }

    if let Some(pos) = rfind_at_most(&chars, " ", max) {
        if pos >= min {
            return prefix(&chars, pos) + ELLIPSIS;
        }
    }

    prefix(&chars, max.saturating_sub(ELLIPSIS.len())) + ELLIPSIS
}

/// [`shorten`] with an options struct.
pub fn shorten_with(text: &str, options: ShortenOptions) -> String {
    shorten(text, options.min_length, options.max_length)
}

fn prefix(chars: &[char], end: usize) -> String {
    chars[..end.min(chars.len())]
        .iter()
        .collect::<String>()
        .trim()
        .to_string()
}

fn matches_at(chars: &[char], pattern: &[char], pos: usize) -> bool {
    chars.get(pos..pos + pattern.len()) == Some(pattern)
}

/// First occurrence of `pattern` starting at or after `from`.
fn find_from(chars: &[char], pattern: &str, from: usize) -> Option<usize> {
    let pattern: Vec<char> = pattern.chars().collect();
    (from..chars.len()).find(|&pos| matches_at(chars, &pattern, pos))
}

/// Last occurrence of `pattern` starting at or before `at_most`.
fn rfind_at_most(chars: &[char], pattern: &str, at_most: usize) -> Option<usize> {
    let pattern: Vec<char> = pattern.chars().collect();
    let last = at_most.min(chars.len().saturating_sub(1));
    (0..=last).rev().find(|&pos| matches_at(chars, &pattern, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(text: &str) -> String {
        shorten(text, DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH)
    }

    #[test]
    fn short_text_only_collapses_whitespace() {
        assert_eq!(short("  hello \n\n  world  "), "hello world");
    }

    #[test]
    fn exactly_max_is_kept() {
        let text = "a".repeat(120);
        assert_eq!(short(&text), text);
    }

    #[test]
    fn cuts_after_sentence_in_window() {
        let text = format!("{}. {}", "a".repeat(85), "b".repeat(60));
        assert_eq!(short(&text), format!("{}.", "a".repeat(85)));
    }

    #[test]
    fn sentence_before_min_is_ignored() {
        let text = format!("{}. {}, {}", "a".repeat(10), "b".repeat(85), "c".repeat(60));
        let expected = format!("{}. {}...", "a".repeat(10), "b".repeat(85));
        assert_eq!(short(&text), expected);
    }

    #[test]
    fn sentence_after_max_falls_through() {
        let text = format!("{} {}. tail", "a".repeat(90), "b".repeat(40));
        assert_eq!(short(&text), format!("{}...", "a".repeat(90)));
    }

    #[test]
    fn clause_break_in_window() {
        let text = format!("{}; {}", "a".repeat(95), "b".repeat(60));
        assert_eq!(short(&text), format!("{}...", "a".repeat(95)));
    }

    #[test]
    fn last_space_in_window() {
        let words = "word ".repeat(40);
        let out = short(&words);
        assert!(out.ends_with("..."));
        let body = out.trim_end_matches("...");
        assert!(body.chars().count() >= 80);
        assert!(body.chars().count() <= 120);
        assert!(body.ends_with("word"));
    }

    #[test]
    fn hard_cut_without_breaks() {
        let text = "x".repeat(200);
        let out = short(&text);
        assert_eq!(out, format!("{}...", "x".repeat(117)));
        assert_eq!(out.chars().count(), 120);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "ж".repeat(200);
        let out = short(&text);
        assert_eq!(out.chars().count(), 120);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ShortenOptions = serde_json::from_str(r#"{"maxLength": 50}"#).unwrap();
        assert_eq!(options.min_length, DEFAULT_MIN_LENGTH);
        assert_eq!(options.max_length, 50);
    }
}
