//! Branded ID newtypes for type safety.
//!
//! Every entity in the Lantern system has a distinct ID type implemented as a
//! newtype wrapper around `String`. This prevents accidentally passing a
//! branch ID where a message ID is expected.
//!
//! All IDs are UUID v7 (time-ordered) generated via [`uuid::Uuid::now_v7`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a chat.
    ChatId
}

branded_id! {
    /// Unique identifier for a branch within a chat.
    BranchId
}

branded_id! {
    /// Unique identifier for a message within a branch.
    MessageId
}

branded_id! {
    /// Unique identifier for a tool call within a turn.
    ToolCallId
}

branded_id! {
    /// Unique identifier for a citation.
    CitationId
}

branded_id! {
    /// Unique identifier for a source record in the experience corpus.
    RecordId
}

branded_id! {
    /// Stable identifier for an agent registered on the bus.
    AgentId
}

branded_id! {
    /// Correlation identifier linking a bus request to its reply.
    CorrelationId
}

branded_id! {
    /// Unique identifier for one user-to-assistant processing cycle.
    TurnId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_new_is_uuid_v7() {
        let id = ChatId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn message_id_new_is_uuid_v7() {
        let id = MessageId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        let a = BranchId::new();
        let b = BranchId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn from_string() {
        let id = RecordId::from_string("rec-42".to_owned());
        assert_eq!(id.as_str(), "rec-42");
    }

    #[test]
    fn from_str_ref() {
        let id = AgentId::from("planner");
        assert_eq!(id.as_str(), "planner");
    }

    #[test]
    fn deref_to_str() {
        let id = ChatId::from("hello");
        let s: &str = &id;
        assert_eq!(s, "hello");
    }

    #[test]
    fn display() {
        let id = CorrelationId::from("corr-1");
        assert_eq!(format!("{id}"), "corr-1");
    }

    #[test]
    fn into_string() {
        let id = BranchId::from("convert");
        let s: String = id.into();
        assert_eq!(s, "convert");
    }

    #[test]
    fn serde_roundtrip() {
        let id = MessageId::from("serde-test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"serde-test\"");
        let back: MessageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn serde_in_struct() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Row {
            id: MessageId,
            branch_id: BranchId,
        }

        let row = Row {
            id: MessageId::from("msg-1"),
            branch_id: BranchId::from("br-1"),
        };
        let json = serde_json::to_string(&row).unwrap();
        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = RecordId::from("same");
        let _ = set.insert(id.clone());
        let _ = set.insert(id.clone());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn default_creates_new() {
        let id1 = TurnId::default();
        let id2 = TurnId::default();
        assert_ne!(id1, id2, "default should create unique IDs");
    }
}
