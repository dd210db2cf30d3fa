//! Fehlertypen fuer Streamtakt
//!
//! Zentraler Fehler-Enum fuer Transport und Protokoll.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Streamtakt
pub type Result<T> = std::result::Result<T, StreamtaktError>;

/// Alle moeglichen Fehler im Streamtakt-System
#[derive(Debug, Error)]
pub enum StreamtaktError {
    // --- Transport ---
    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    #[error("Senden fehlgeschlagen: {0}")]
    Senden(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Serialisierung fehlgeschlagen: {0}")]
    Serialisierung(#[from] serde_json::Error),
}

impl StreamtaktError {
    /// Gibt true zurueck wenn eine Wiederholung Erfolg haben koennte
    ///
    /// Sendefehler gehoeren dazu: der Puffer-Sweep versucht es erneut.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Getrennt(_) | Self::Senden(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = StreamtaktError::Senden("Socket geschlossen".into());
        assert_eq!(e.to_string(), "Senden fehlgeschlagen: Socket geschlossen");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(StreamtaktError::Senden("test".into()).ist_wiederholbar());
        assert!(StreamtaktError::Getrennt("test".into()).ist_wiederholbar());
        assert!(StreamtaktError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(!StreamtaktError::UngueltigeNachricht("test".into()).ist_wiederholbar());
    }

    #[test]
    fn serde_fehler_konvertierung() {
        let json_fehler = serde_json::from_str::<serde_json::Value>("{kaputt").unwrap_err();
        let e: StreamtaktError = json_fehler.into();
        assert!(e.to_string().starts_with("Serialisierung fehlgeschlagen"));
    }
}
