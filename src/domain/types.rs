//! Core identifier types for domain entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-scoped identifier for a single message.
///
/// The value is opaque and only meaningful to the provider that issued it;
/// a Gmail id cannot be used with an Outlook client and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_display() {
        let id = MessageId::from("18c2f0a1b2c3d4e5");
        assert_eq!(id.to_string(), "18c2f0a1b2c3d4e5");
    }

    #[test]
    fn message_id_equality() {
        let id1 = MessageId::from("AAMkAGI2");
        let id2 = MessageId::from("AAMkAGI2".to_string());
        assert_eq!(id1, id2);
    }

    #[test]
    fn message_id_serializes_as_plain_string() {
        let id = MessageId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
