//! Gemeinsame Identifikationstypen fuer Streamtakt
//!
//! IDs verwenden das Newtype-Pattern um Verwechslungen mit beliebigen
//! Strings zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};

/// Kennung eines Media-Streams beim Telefonie-Anbieter
///
/// Wird beim Aufbau der Warteschlange festgelegt und in jede ausgehende
/// Nachricht als `streamSid` geschrieben.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamSid(pub String);

impl StreamSid {
    /// Erstellt eine StreamSid aus einem beliebigen String
    pub fn neu(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    /// Gibt die Kennung als &str zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StreamSid {
    fn default() -> Self {
        Self(String::new())
    }
}

impl std::fmt::Display for StreamSid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamSid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StreamSid {
    fn from(s: String) -> Self {
        Self(s)
    }
}
