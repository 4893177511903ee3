//! Key/value extraction from configuration text and webcontrol bodies.

use once_cell::sync::Lazy;
use regex::Regex;

/// How a key is separated from its value on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `key value`, as written in the daemon's configuration file.
    Whitespace,
    /// `key = value`, as reported by the webcontrol interface.
    Equals,
}

// File keys run to the first whitespace and may not start a comment.
// Webcontrol keys are restricted to the safe token class.
static WHITESPACE_PAIR: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)^[ \t]*([^#;\s]\S*)[ \t]+([^\r\n]*?)[ \t\r]*$"));
static EQUALS_PAIR: Lazy<Regex> =
    Lazy::new(|| compile(r"(?m)^[ \t]*([A-Za-z0-9_.\-]+)[ \t]*=[ \t]*([^\r\n]*?)[ \t\r]*$"));

#[expect(
    clippy::expect_used,
    reason = "patterns are string literals covered by unit tests"
)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("key/value pattern must compile")
}

impl Separator {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Whitespace => &WHITESPACE_PAIR,
            Self::Equals => &EQUALS_PAIR,
        }
    }

    fn normalise(self, value: &str) -> String {
        match self {
            // The daemon treats a whitespace-separated value as one token.
            Self::Whitespace => value.split_whitespace().collect(),
            Self::Equals => value.trim().to_owned(),
        }
    }
}

/// Extracts every `key <separator> value` pair found at the start of a line.
///
/// Lines without a non-empty value are skipped. Pairs are yielded in input
/// order, so collecting into a map keeps the last occurrence of a key.
pub fn extract_pairs(text: &str, separator: Separator) -> impl Iterator<Item = (String, String)> {
    separator.pattern().captures_iter(text).filter_map(move |captures| {
        let key = captures.get(1)?.as_str();
        let value = separator.normalise(captures.get(2)?.as_str());
        (!value.is_empty()).then(|| (key.to_owned(), value))
    })
}

/// Returns true when `token` is non-empty and only uses alphanumerics,
/// underscore, hyphen or dot.
#[must_use]
pub fn is_safe_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
