//! Typed view over the daemon's raw configuration tokens.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Token the daemon prints for a parameter that has no value.
pub const NULL_MARKER: &str = "(null)";

/// Configuration keyed by parameter name with typed values.
pub type TypedConfigMap = BTreeMap<String, TypedValue>;

/// A configuration value after type inference.
///
/// Serialises untagged so callers see plain JSON scalars, with
/// [`TypedValue::Absent`] rendered as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    /// `on` or `off`.
    Boolean(bool),
    /// Decimal digits with an optional leading sign.
    Integer(i64),
    /// Any other token, unchanged.
    String(String),
    /// The daemon's null marker.
    Absent,
}

impl TypedValue {
    /// Infers the type of a raw token.
    ///
    /// Matching is exact and case-sensitive. Digit runs that overflow `i64`
    /// are kept as strings so that no input is lost.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "on" => Self::Boolean(true),
            "off" => Self::Boolean(false),
            NULL_MARKER => Self::Absent,
            _ => parse_integer(raw).map_or_else(|| Self::String(raw.to_owned()), Self::Integer),
        }
    }

    /// Returns true for [`TypedValue::Absent`].
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns the boolean payload, if any.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

/// Renders the value back into the daemon's native token.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(true) => f.write_str("on"),
            Self::Boolean(false) => f.write_str("off"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::Absent => f.write_str(NULL_MARKER),
        }
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("on", TypedValue::Boolean(true))]
    #[case("off", TypedValue::Boolean(false))]
    #[case("3", TypedValue::Integer(3))]
    #[case("42", TypedValue::Integer(42))]
    #[case("-7", TypedValue::Integer(-7))]
    #[case("+7", TypedValue::Integer(7))]
    #[case("(null)", TypedValue::Absent)]
    #[case("hello", TypedValue::String("hello".to_owned()))]
    #[case("On", TypedValue::String("On".to_owned()))]
    #[case("OFF", TypedValue::String("OFF".to_owned()))]
    #[case("-", TypedValue::String("-".to_owned()))]
    #[case("1.5", TypedValue::String("1.5".to_owned()))]
    #[case("", TypedValue::String(String::new()))]
    fn maps_raw_tokens(#[case] raw: &str, #[case] expected: TypedValue) {
        assert_eq!(TypedValue::from_raw(raw), expected);
    }

    #[test]
    fn overflowing_digits_stay_strings() {
        let raw = "99999999999999999999999";
        assert_eq!(TypedValue::from_raw(raw), TypedValue::String(raw.to_owned()));
    }

    #[rstest]
    #[case("on")]
    #[case("off")]
    #[case("(null)")]
    #[case("6")]
    #[case("/var/lib/motion")]
    fn display_restores_native_token(#[case] raw: &str) {
        assert_eq!(TypedValue::from_raw(raw).to_string(), raw);
    }

    #[test]
    fn serialises_as_plain_json_scalars() {
        let mut map = TypedConfigMap::new();
        map.insert("a".to_owned(), TypedValue::Boolean(true));
        map.insert("b".to_owned(), TypedValue::Integer(5));
        map.insert("c".to_owned(), TypedValue::String("x".to_owned()));
        map.insert("d".to_owned(), TypedValue::Absent);

        let json = serde_json::to_string(&map).expect("serialise");
        assert_eq!(json, r#"{"a":true,"b":5,"c":"x","d":null}"#);
    }
}
