//! # Memory Types
//!
//! Coarse tags attached to banks. They only feed diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pool a bank's segments are accounted against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// General purpose memory.
    #[default]
    Main,
    /// Audio data.
    Audio,
    /// Configuration data.
    Config,
    /// Debug-only bookkeeping.
    Debug,
    /// Physics back-end data.
    Physics,
    /// Engine internals.
    System,
    /// Short-lived scratch memory.
    Temp,
    /// Text and strings.
    Text,
    /// Video/texture data.
    Video,
}

impl MemoryType {
    /// Returns the tag's literal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Audio => "audio",
            Self::Config => "config",
            Self::Debug => "debug",
            Self::Physics => "physics",
            Self::System => "system",
            Self::Temp => "temp",
            Self::Text => "text",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
