use serde::{Deserialize, Serialize};

/// Opaque class identifier attached to every stored example.
///
/// Serialized untagged, so a label is a bare JSON number or string.
/// `Integer(0)` and `String("0")` are different labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Integer(u64),
    String(String),
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Integer(i) => write!(f, "{}", i),
            Label::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::String(s)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::String(s.to_string())
    }
}

impl From<u64> for Label {
    fn from(i: u64) -> Self {
        Label::Integer(i)
    }
}
