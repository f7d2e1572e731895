use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                // UUID version 7 sorts by creation time, which keeps listings stable.
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                s.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

record_id!(
    /// Identifier of a user (UUID v7).
    UserId
);
record_id!(
    /// Identifier of a category (UUID v7).
    CategoryId
);
record_id!(
    /// Identifier of a recurrence rule (UUID v7).
    RuleId
);
record_id!(
    /// Identifier of a task (UUID v7).
    TaskId
);
record_id!(
    /// Identifier of a calendar event (UUID v7).
    EventId
);
