//! JSON-Nachrichten des Media-Stream-Sockets
//!
//! ## Ausgehend
//!
//! Pro gesendetem (oder wiederholtem) Frame genau ein Objekt:
//!
//! ```text
//! { "event": "media", "streamSid": "MZ...", "media": {"payload": "..."}, "mark": null }
//! ```
//!
//! Alle vier Felder sind immer vorhanden; fehlende Objekte werden als `null`
//! geschrieben.
//!
//! ## Eingehend
//!
//! Die Gegenstelle meldet `connected`, `start`, `media`, `mark` und `stop`.
//! Fuer die Zustellung ist nur `mark` relevant (Quittung fuer abgespielte
//! Frames). Unbekannte Events werden als `Unbekannt` gelesen statt verworfen.

use serde::{Deserialize, Serialize};
use streamtakt_core::{StreamSid, StreamtaktError};

use crate::media::{FrameEvent, MediaPayload, MedienFrame};

// ---------------------------------------------------------------------------
// Ausgehend
// ---------------------------------------------------------------------------

/// Ausgehende Nachricht (borgt aus Frame und Stream-Kontext)
#[derive(Debug, Serialize)]
pub struct AusgehendeNachricht<'a> {
    pub event: FrameEvent,
    #[serde(rename = "streamSid")]
    pub stream_sid: &'a str,
    pub media: Option<&'a MediaPayload>,
    pub mark: Option<&'a serde_json::Value>,
}

impl<'a> AusgehendeNachricht<'a> {
    /// Baut die Nachricht fuer einen Frame
    pub fn aus_frame(stream_sid: &'a StreamSid, frame: &'a MedienFrame) -> Self {
        Self {
            event: frame.event,
            stream_sid: stream_sid.as_str(),
            media: frame.media.as_ref(),
            mark: frame.mark.as_ref(),
        }
    }

    /// Serialisiert die Nachricht als JSON-Text
    pub fn zu_json(&self) -> streamtakt_core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Kurzform: Frame direkt in JSON-Text umwandeln
pub fn frame_serialisieren(
    stream_sid: &StreamSid,
    frame: &MedienFrame,
) -> streamtakt_core::Result<String> {
    AusgehendeNachricht::aus_frame(stream_sid, frame).zu_json()
}

// ---------------------------------------------------------------------------
// Eingehend
// ---------------------------------------------------------------------------

/// Marken-Objekt einer eingehenden `mark`-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkeInfo {
    pub name: String,
}

/// Medienformat aus der `start`-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedienFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Inhalt der `start`-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInfo {
    pub stream_sid: StreamSid,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub media_format: Option<MedienFormat>,
}

/// Alle Nachrichten, die von der Gegenstelle eintreffen koennen
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EingehendeNachricht {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    Start {
        start: StartInfo,
    },
    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<StreamSid>,
        media: serde_json::Value,
    },
    Mark {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<StreamSid>,
        mark: MarkeInfo,
    },
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<StreamSid>,
    },
    #[serde(other)]
    Unbekannt,
}

impl EingehendeNachricht {
    /// Parst eine Textnachricht der Gegenstelle
    ///
    /// Kein JSON-Objekt oder fehlende Pflichtfelder ergeben
    /// `UngueltigeNachricht`.
    pub fn parsen(text: &str) -> streamtakt_core::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| StreamtaktError::UngueltigeNachricht(e.to_string()))
    }
}
