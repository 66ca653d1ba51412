//! Text utilities: line splitting and token estimation.
//!
//! Token counts use a character-based heuristic: ~4 characters per token,
//! which is close enough for BPE tokenizers on English text and source code.

/// Characters assumed per token.
const CHARS_PER_TOKEN: usize = 4;

/// Split on `\n`, `\r\n`, and lone `\r`. A trailing terminator does not
/// start an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(i) = rest.find(['\n', '\r']) {
        lines.push(&rest[..i]);
        let width = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[i + width..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }
    lines
}

/// Estimate the token count for a string. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cut `text` so it fits in `max_tokens`, appending `suffix` when cut.
///
/// The suffix counts against the budget. Text already within budget is
/// returned unchanged.
pub fn truncate_to_tokens(text: &str, max_tokens: usize, suffix: &str) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }

    let budget = (max_tokens * CHARS_PER_TOKEN).saturating_sub(suffix.chars().count());
    let cut = text
        .char_indices()
        .nth(budget)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    let mut out = String::with_capacity(cut + suffix.len());
    out.push_str(&text[..cut]);
    out.push_str(suffix);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_carriage_returns_split_lines() {
        assert_eq!(split_lines("a\rb\rc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("a\r\nb\nc\r"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("test"), 1);
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("héé!"), 1);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_to_tokens("abc", 10, "[cut]"), "abc");
    }

    #[test]
    fn long_text_is_cut_and_marked() {
        let text = "x".repeat(100);
        let out = truncate_to_tokens(&text, 5, "...");
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with("..."));
        assert!(estimate_tokens(&out) <= 5);
    }

    #[test]
    fn cut_lands_on_char_boundary() {
        let text = "é".repeat(50);
        let out = truncate_to_tokens(&text, 2, "");
        assert_eq!(out, "é".repeat(8));
    }
}
