//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A time window whose start lies after its end.
    #[error("window start {start} is after end {end}")]
    InvertedWindow { start: String, end: String },

    /// A date string that is neither RFC 3339 nor `YYYY-MM-DD`.
    #[error("invalid {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    /// A window whose start falls outside the representable date range.
    #[error("window of {days} days before {end} is out of range")]
    WindowOutOfRange { end: String, days: u32 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            ///
            /// Surrounding whitespace is trimmed before the emptiness check.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                if trimmed.len() == id.len() {
                    Ok(Self(id))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated event identifier.
    ///
    /// Event IDs must be non-empty strings. Uniqueness is enforced by the store.
    EventId, "eventId"
);

define_string_id!(
    /// A validated session identifier.
    ///
    /// Groups the events emitted by one client session.
    SessionId, "sessionId"
);

define_string_id!(
    /// A validated end-user identifier as reported by the client application.
    AppUsername, "appUsername"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_rejects_empty() {
        assert!(EventId::new("").is_err());
        assert!(EventId::new("   ").is_err());
        assert!(EventId::new("evt-1").is_ok());
    }

    #[test]
    fn ids_are_trimmed() {
        let id = SessionId::new("  s1 ").unwrap();
        assert_eq!(id.as_str(), "s1");
    }

    #[test]
    fn empty_error_names_the_field() {
        let err = AppUsername::new("").unwrap_err();
        assert_eq!(err.to_string(), "appUsername cannot be empty");
    }

    #[test]
    fn session_id_serde_roundtrip() {
        let id = SessionId::new("session-abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"session-abc\"");
        let parsed: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_rejects_empty_ids() {
        let result: Result<EventId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn app_username_as_ref() {
        let user = AppUsername::new("maria").unwrap();
        let s: &str = user.as_ref();
        assert_eq!(s, "maria");
    }
}
