//! Typed ID wrappers for channels and branches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up a bare local id with a fully
/// qualified channel path. These are just strings underneath — no format
/// requirement is imposed here, canonicalization happens at registration.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(ChannelId, "Fully-qualified, slash-delimited id of a channel.");
typed_id!(BranchId, "Local id of a branch (not a full path).");

impl ChannelId {
    /// Join a branch path prefix and a local channel id into a fully
    /// qualified channel id: `"a/b" + "c"` → `"a/b/c"`.
    pub fn under(prefix: &str, local: &str) -> Self {
        if prefix.is_empty() {
            Self::new(local)
        } else {
            Self::new(format!("{prefix}/{local}"))
        }
    }

    /// Whether this id lives under the given path prefix (inclusive of
    /// the prefix itself, i.e. `prefix == self` counts as under).
    pub fn is_under(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        self.0 == prefix || self.0.starts_with(&format!("{prefix}/"))
    }
}
