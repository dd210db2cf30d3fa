//! Streamtakt Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet die Sitzung.

use anyhow::Result;
use streamtakt_server::{config::StreamtaktConfig, StreamtaktServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("STREAMTAKT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = StreamtaktConfig::laden(&config_pfad)?;

    streamtakt_observability::logging_initialisieren(&config.logging.level, &config.logging.format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        url = %config.verbindung.url,
        datei = %config.quelle.datei,
        "Streamtakt wird initialisiert"
    );

    StreamtaktServer::neu(config).starten().await
}
