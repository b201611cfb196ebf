use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

fn session_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{1,100}$").expect("valid session regex"))
}

/// Booth session identifier grouping the assets of one visit.
///
/// 1 to 100 characters of ASCII letters, digits, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Validate a caller-supplied session id.
    pub fn parse(raw: &str) -> Option<Self> {
        session_pattern()
            .is_match(raw)
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix shared by every stored asset of this session.
    pub fn asset_prefix(&self) -> String {
        format!("{}-", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid session id: {value}"))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_session_ids() {
        for id in ["abc", "session_1", "A-b_C-9", &"x".repeat(100)] {
            assert!(SessionId::parse(id).is_some(), "{id} should be valid");
        }
    }

    #[test]
    fn test_invalid_session_ids() {
        for id in ["", "has space", "dot.dot", "../etc", "emoji😀", &"x".repeat(101)] {
            assert!(SessionId::parse(id).is_none(), "{id} should be invalid");
        }
    }

    #[test]
    fn test_asset_prefix() {
        let id = SessionId::parse("abc123").unwrap();
        assert_eq!(id.asset_prefix(), "abc123-");
        assert_eq!(id.to_string(), "abc123");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<SessionId, _> = serde_json::from_str("\"s-1\"");
        assert!(ok.is_ok());
        let bad: Result<SessionId, _> = serde_json::from_str("\"s 1\"");
        assert!(bad.is_err());
    }
}
