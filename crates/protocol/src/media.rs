//! Ausgehende Media-Frames
//!
//! Ein `MedienFrame` ist der Inhalt, den ein Produzent in die
//! Zustell-Warteschlange einreiht: entweder Audio (base64-kodiertes PCM)
//! oder eine Marke, die die Gegenstelle nach dem Abspielen zurueckmeldet.
//!
//! Sequenznummer, Sendezeit und Quittierung verwaltet die Warteschlange
//! selbst; sie sind nicht Teil des Frames.

use serde::{Deserialize, Serialize};

/// Art der Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameEvent {
    /// Audio-Daten
    Media,
    /// Marke (wird nach dem Abspielen von der Gegenstelle zurueckgesendet)
    Mark,
    /// Gegenstelle soll ihren Abspielpuffer verwerfen
    Clear,
}

impl FrameEvent {
    /// Name des Events wie er auf dem Draht steht
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Mark => "mark",
            Self::Clear => "clear",
        }
    }
}

impl std::fmt::Display for FrameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

/// Audio-Nutzdaten (base64-Text, der PCM16-Samples umschliesst)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub payload: String,
}

/// Ein ausgehender Frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedienFrame {
    pub event: FrameEvent,
    /// Audio-Objekt, `None` bei reinen Marken
    pub media: Option<MediaPayload>,
    /// Marken-Objekt, wird unveraendert durchgereicht
    pub mark: Option<serde_json::Value>,
}

impl MedienFrame {
    /// Erstellt einen Audio-Frame aus base64-Nutzdaten
    pub fn medien(payload: impl Into<String>) -> Self {
        Self {
            event: FrameEvent::Media,
            media: Some(MediaPayload {
                payload: payload.into(),
            }),
            mark: None,
        }
    }

    /// Erstellt einen Audio-Frame, der zusaetzlich ein Marken-Objekt traegt
    pub fn medien_mit_marke(payload: impl Into<String>, mark: serde_json::Value) -> Self {
        Self {
            mark: Some(mark),
            ..Self::medien(payload)
        }
    }

    /// Erstellt eine Marke ohne Audio (`{"name": ...}`)
    pub fn marke(name: impl Into<String>) -> Self {
        Self {
            event: FrameEvent::Mark,
            media: None,
            mark: Some(serde_json::json!({ "name": name.into() })),
        }
    }

    /// Erstellt die Aufforderung an die Gegenstelle, ihren Abspielpuffer zu verwerfen
    pub fn clear() -> Self {
        Self {
            event: FrameEvent::Clear,
            media: None,
            mark: None,
        }
    }

    /// True fuer Steuer-Frames, die nicht quittiert werden
    ///
    /// Die Gegenstelle meldet `clear` nie zurueck; solche Frames duerfen
    /// nicht in den Uebertragungspuffer.
    pub fn ist_steuerung(&self) -> bool {
        self.event == FrameEvent::Clear
    }

    /// Base64-Nutzdaten, leer wenn kein Audio-Objekt vorhanden ist
    pub fn payload(&self) -> &str {
        self.media.as_ref().map(|m| m.payload.as_str()).unwrap_or("")
    }

    /// Name der Marke, falls das Marken-Objekt ein `name`-Feld hat
    pub fn marken_name(&self) -> Option<&str> {
        self.mark.as_ref()?.get("name")?.as_str()
    }

    /// Laenge der dekodierten PCM-Daten in Bytes
    ///
    /// Wird aus Textlaenge und Padding berechnet, ohne zu dekodieren.
    pub fn pcm_laenge(&self) -> usize {
        base64_pcm_laenge(self.payload())
    }
}

/// Berechnet die Byte-Laenge eines base64-Textes nach dem Dekodieren
///
/// Funktioniert mit und ohne `=`-Padding. Leerer Text ergibt 0.
pub fn base64_pcm_laenge(text: &str) -> usize {
    let text = text.trim_end();
    let padding = text.bytes().rev().take_while(|&b| b == b'=').count().min(2);
    let zeichen = text.len() - padding;
    zeichen * 3 / 4
}
