//! Structured Logging Setup via tracing-subscriber
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei:
//! - `ST_LOG_LEVEL`: Filter (trace/debug/info/warn/error oder EnvFilter-Direktiven)
//! - `ST_LOG_FORMAT`: text oder json

use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "ST_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ST_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            anderes => Err(anyhow::anyhow!("Unbekanntes Log-Format: {anderes}")),
        }
    }
}

/// Initialisiert das Logging-System
///
/// `level` und `format` stammen aus der Konfiguration und werden von
/// `ST_LOG_LEVEL` / `ST_LOG_FORMAT` ueberschrieben. Ein unbekanntes Format
/// faellt auf `text` zurueck. Schlaegt fehl, wenn bereits ein globaler
/// Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = log_format_aus_env()
        .unwrap_or_else(|| format.to_string())
        .parse::<LogFormat>()
        .unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow::anyhow!("Logging bereits initialisiert: {e}"))
}

/// Log-Level aus der Umgebung, falls gesetzt
pub fn log_level_aus_env() -> Option<String> {
    std::env::var(ENV_LOG_LEVEL).ok()
}

/// Log-Format aus der Umgebung, falls gesetzt
pub fn log_format_aus_env() -> Option<String> {
    std::env::var(ENV_LOG_FORMAT).ok()
}

/// Prueft ob ein Log-Level-String gueltig ist
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Prueft ob ein Log-Format-String gueltig ist
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}
