//! Strongly-typed wrappers for match concepts
//!
//! Newtypes keep template ids, card names, player names and match ids from
//! being mixed up where they would all otherwise be bare Strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Reference to an immutable card template in the catalog (e.g. "ember_imp")
    TemplateId
);

string_newtype!(
    /// Display name of a card
    CardName
);

string_newtype!(
    /// Display name of a player
    PlayerName
);

string_newtype!(
    /// Identity of one match; scopes the replication log
    MatchId
);
