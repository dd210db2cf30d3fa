//! Fehlertypen fuer die Audio-Verarbeitung

use thiserror::Error;

/// Alle moeglichen Fehler beim Verarbeiten von PCM-Nutzdaten
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Ungueltiges base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PCM16 erwartet eine gerade Byte-Anzahl, erhalten: {0}")]
    UngeradeByteAnzahl(usize),
}

pub type AudioResult<T> = Result<T, AudioError>;
