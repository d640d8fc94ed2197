//! Opaque identifiers for rooms and participants.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SignalingError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validates a raw identifier: surrounding whitespace is trimmed
            /// and the result must not be empty.
            pub fn parse(raw: &str) -> Result<Self, SignalingError> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(SignalingError::MalformedMessage(format!(
                        "{} must not be empty",
                        $what
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        /// Deserializes through [`Self::parse`], so identifiers read off the
        /// wire are trimmed and never blank.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

string_id!(
    /// Name of a room, unique on the server.
    RoomId,
    "room name"
);
string_id!(
    /// Name of a participant, unique within its room.
    ParticipantId,
    "participant name"
);
