//! Newtype wrappers for manifest identifiers.
//!
//! All newtypes serialize/deserialize as plain strings, matching the on-disk
//! JSON form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
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
    };
}

string_newtype!(
    /// Identifier of a [`crate::Source`], unique within one manifest.
    SourceId
);

string_newtype!(
    /// Identifier of a [`crate::Layer`].
    LayerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_display_and_as_ref() {
        let id = SourceId::new("frankenstein");
        assert_eq!(id.to_string(), "frankenstein");
        assert_eq!(id.as_str(), "frankenstein");
        assert_eq!(AsRef::<str>::as_ref(&id), "frankenstein");
    }

    #[test]
    fn source_id_serde_is_transparent() {
        let id = SourceId::new("src-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"src-1\"");
        let back: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn layer_id_equality() {
        let a = LayerId::new("narrator");
        let b = LayerId::from("narrator");
        let c = LayerId::from("critic".to_owned());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "narrator");
    }

    #[test]
    fn into_inner_returns_owned_string() {
        let id = SourceId::new("x");
        assert_eq!(id.into_inner(), "x");
    }
}
