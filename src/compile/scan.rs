//! Placeholder token scanning
//!
//! A placeholder embeds a field reference between matched delimiter
//! pairs: `~~field~~` or `{{field}}`. Both styles normalize to the same
//! internal form; mixing styles within one token is not recognized.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    #[token("~~")]
    Tilde,
    #[token("{{")]
    Open,
    #[token("}}")]
    Close,
    #[regex(r"[^~{}]+")]
    Chunk,
    #[regex(r"[~{}]")]
    Stray,
}

/// The reserved pseudo-field that resolves to the clone's 1-based ordinal.
pub const COUNT_FIELD: &str = "[count]";
/// The reserved pseudo-field that resolves to the whole data object.
pub const VALUE_FIELD: &str = "[value]";

/// Split a value containing exactly one placeholder into
/// `(literal prefix, field, literal suffix)`.
///
/// Returns `None` when the value holds no token, more than one, or a
/// mismatched delimiter pair.
pub fn split_token(value: &str) -> Option<(String, String, String)> {
    let mut delimiters = Vec::new();
    let mut lexer = Marker::lexer(value);
    while let Some(result) = lexer.next() {
        match result {
            Ok(Marker::Tilde) => delimiters.push((Marker::Tilde, lexer.span())),
            Ok(Marker::Open) => delimiters.push((Marker::Open, lexer.span())),
            Ok(Marker::Close) => delimiters.push((Marker::Close, lexer.span())),
            _ => {}
        }
    }
    if delimiters.len() != 2 {
        return None;
    }
    let matched = matches!(
        (delimiters[0].0, delimiters[1].0),
        (Marker::Tilde, Marker::Tilde) | (Marker::Open, Marker::Close)
    );
    if !matched {
        return None;
    }
    let prefix = value[..delimiters[0].1.start].to_string();
    let field = value[delimiters[0].1.end..delimiters[1].1.start]
        .trim()
        .to_string();
    let suffix = value[delimiters[1].1.end..].to_string();
    Some((prefix, field, suffix))
}

/// True when the whole text, after trimming, is exactly one placeholder.
pub fn is_token(text: &str) -> bool {
    match split_token(text.trim()) {
        Some((prefix, field, suffix)) => prefix.is_empty() && suffix.is_empty() && !field.is_empty(),
        None => false,
    }
}

/// Strip every delimiter occurrence and trim — directive values like
/// `data-array=~~tags~~` and bare `data-array=tags` both yield `tags`.
pub fn strip_markers(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut lexer = Marker::lexer(value);
    while let Some(result) = lexer.next() {
        match result {
            Ok(Marker::Tilde) | Ok(Marker::Open) | Ok(Marker::Close) => {}
            _ => out.push_str(lexer.slice()),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_token_tilde() {
        assert_eq!(
            split_token("J~~code.num~~"),
            Some(("J".to_string(), "code.num".to_string(), String::new()))
        );
    }

    #[test]
    fn test_split_token_braces() {
        assert_eq!(
            split_token("pre{{field}}post"),
            Some(("pre".to_string(), "field".to_string(), "post".to_string()))
        );
    }

    #[test]
    fn test_split_token_rejects_mixed_delimiters() {
        assert_eq!(split_token("{{field~~"), None);
        assert_eq!(split_token("~~field}}"), None);
    }

    #[test]
    fn test_split_token_rejects_multiple() {
        assert_eq!(split_token("~~a~~~~b~~"), None);
        assert_eq!(split_token("no token here"), None);
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("~~title~~"));
        assert!(is_token("  {{title}}  "));
        assert!(is_token("~~[count]~~"));
        assert!(!is_token("pre~~title~~"));
        assert!(!is_token("~~~~"));
        assert!(!is_token("plain"));
    }

    #[test]
    fn test_strip_markers() {
        assert_eq!(strip_markers("~~tags~~"), "tags");
        assert_eq!(strip_markers("{{tags}}"), "tags");
        assert_eq!(strip_markers("tags"), "tags");
        assert_eq!(strip_markers(" ~~ spaced ~~ "), "spaced");
    }

    #[test]
    fn test_lone_delimiter_chars_are_text() {
        assert_eq!(split_token("a ~ b { c }"), None);
        assert_eq!(strip_markers("a ~ b"), "a ~ b");
    }
}
