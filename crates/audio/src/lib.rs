//! streamtakt-audio – Audio-Arithmetik
//!
//! Zwei zustandsarme Bausteine fuer die Zustellung:
//! - Abspieldauer eines PCM-Payloads aus dem Audioformat
//! - Lautstaerke-Anpassung auf PCM16 (dekodieren, skalieren, kodieren)

pub mod error;
pub mod format;
pub mod volume;

// Bequeme Re-Exporte der wichtigsten Typen
pub use error::{AudioError, AudioResult};
pub use format::AudioFormat;
pub use volume::{skalieren, LautstaerkeProzessor};
