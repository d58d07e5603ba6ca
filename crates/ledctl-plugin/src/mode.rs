//! The `ModeName` identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A display mode name, unique across every loaded, enabled plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeName(String);

impl ModeName {
    /// Wrap a mode name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this mode name ends in the `_live` suffix used as the
    /// fallback live-priority signal.
    #[must_use]
    pub fn is_live_suffixed(&self) -> bool {
        self.0.ends_with("_live")
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModeName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ModeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
