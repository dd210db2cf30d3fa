//! Transport-Abstraktion
//!
//! Die Warteschlange kennt nur `senden(text)`. Verbindungsaufbau, Handshake
//! und Reconnect liegen beim Aufrufer.
//!
//! `KanalTransport` legt Nachrichten in eine mpsc-Queue; ein separater
//! Schreib-Task (z.B. WebSocket-Writer) leert sie.

use async_trait::async_trait;
use std::time::Duration;
use streamtakt_core::{Result, StreamtaktError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

/// Abstrakter Transport zur Gegenstelle
#[async_trait]
pub trait MedienTransport: Send + Sync {
    /// Sendet eine serialisierte Nachricht (darf suspendieren)
    async fn senden(&self, nachricht: String) -> Result<()>;
}

/// Transport ueber eine tokio mpsc-Queue
#[derive(Debug, Clone)]
pub struct KanalTransport {
    tx: mpsc::Sender<String>,
    /// Maximale Wartezeit auf einen freien Queue-Platz (None = unbegrenzt)
    zeitlimit: Option<Duration>,
}

impl KanalTransport {
    /// Erstellt einen Transport aus einem vorhandenen Sender
    pub fn neu(tx: mpsc::Sender<String>) -> Self {
        Self { tx, zeitlimit: None }
    }

    /// Erstellt Transport und zugehoerige Empfangsseite
    pub fn kanal(groesse: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self::neu(tx), rx)
    }

    /// Begrenzt, wie lange `senden` auf einen haengenden Schreiber wartet
    ///
    /// Ohne Limit blockiert eine volle Queue die Zustell-Schleife.
    pub fn mit_zeitlimit(mut self, zeitlimit: Duration) -> Self {
        self.zeitlimit = Some(zeitlimit);
        self
    }
}

#[async_trait]
impl MedienTransport for KanalTransport {
    async fn senden(&self, nachricht: String) -> Result<()> {
        let Some(zeitlimit) = self.zeitlimit else {
            return self
                .tx
                .send(nachricht)
                .await
                .map_err(|_| StreamtaktError::Getrennt("Sende-Kanal geschlossen".into()));
        };

        match self.tx.send_timeout(nachricht, zeitlimit).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Closed(_)) => {
                Err(StreamtaktError::Getrennt("Sende-Kanal geschlossen".into()))
            }
            Err(SendTimeoutError::Timeout(_)) => Err(StreamtaktError::Zeitlimit(format!(
                "Sende-Queue nach {zeitlimit:?} weiterhin voll"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kanal_transport_leitet_weiter() {
        let (transport, mut rx) = KanalTransport::kanal(4);
        transport.senden("eins".into()).await.unwrap();
        transport.senden("zwei".into()).await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("eins"));
        assert_eq!(rx.recv().await.as_deref(), Some("zwei"));
    }

    #[tokio::test]
    async fn kanal_transport_geschlossen() {
        let (transport, rx) = KanalTransport::kanal(1);
        drop(rx);

        let fehler = transport.senden("weg".into()).await.unwrap_err();
        assert!(matches!(fehler, StreamtaktError::Getrennt(_)));
        assert!(fehler.ist_wiederholbar());
    }

    #[tokio::test(start_paused = true)]
    async fn volle_queue_laeuft_in_zeitlimit() {
        let (transport, mut rx) = KanalTransport::kanal(1);
        let transport = transport.mit_zeitlimit(Duration::from_millis(250));

        transport.senden("passt".into()).await.unwrap();
        let start = tokio::time::Instant::now();
        let fehler = transport.senden("haengt".into()).await.unwrap_err();

        assert!(matches!(fehler, StreamtaktError::Zeitlimit(_)));
        assert!(fehler.ist_wiederholbar());
        assert!(start.elapsed() >= Duration::from_millis(250));

        // Platz frei -> wieder sendbar
        assert_eq!(rx.recv().await.as_deref(), Some("passt"));
        transport.senden("wieder da".into()).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("wieder da"));
    }

    #[tokio::test]
    async fn zeitlimit_erkennt_geschlossenen_kanal() {
        let (transport, rx) = KanalTransport::kanal(1);
        let transport = transport.mit_zeitlimit(Duration::from_secs(1));
        drop(rx);

        let fehler = transport.senden("weg".into()).await.unwrap_err();
        assert!(matches!(fehler, StreamtaktError::Getrennt(_)));
    }
}
