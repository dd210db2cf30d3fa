//! # streamtakt-observability
//!
//! Observability-Crate fuer Streamtakt:
//! - Structured Logging (Text oder JSON) via tracing-subscriber
//! - Protokoll-Task fuer Zustell-Ereignisse

pub mod ereignisse;
pub mod logging;

pub use ereignisse::{ereignisse_protokollieren, EreignisZaehler, Zaehlerstand};
pub use logging::{log_format_gueltig, log_level_gueltig, logging_initialisieren, LogFormat};
