//! streamtakt-delivery – Getaktete Zustellung von Media-Frames
//!
//! Sendet Audio-Frames im Takt ihrer Abspieldauer an einen Media-Stream-
//! Socket und wiederholt Frames, deren Quittung ausbleibt.
//!
//! ## Module
//! - [`config`] – Konfiguration einer Warteschlange (ein Stream pro Instanz)
//! - [`transport`] – Abstrakter Transport und mpsc-Implementierung
//! - [`puffer`] – Uebertragungspuffer fuer gesendete, unquittierte Frames
//! - [`warteschlange`] – Rueckstand und Zustell-Schleife (single-flight)

pub mod config;
pub mod puffer;
pub mod transport;
pub mod warteschlange;

pub use config::ZustellConfig;
pub use puffer::{GepufferterFrame, UebertragungsPuffer};
pub use transport::{KanalTransport, MedienTransport};
pub use warteschlange::{SweepBericht, ZustellPhase, ZustellStatistik, ZustellWarteschlange};
