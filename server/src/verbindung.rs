//! WebSocket-Verbindung zur Gegenstelle
//!
//! Nach dem Aufbau laufen zwei Tasks:
//! - Schreiber: leert die Sende-Queue des [`KanalTransport`] in den Socket
//! - Leser: parst eingehende Textnachrichten und reicht sie per mpsc weiter

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use streamtakt_delivery::KanalTransport;
use streamtakt_protocol::EingehendeNachricht;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};

/// Wie lange der Schreiber beim Schliessen noch ausstehende Nachrichten senden darf
const SCHLIESS_FRIST: Duration = Duration::from_secs(2);

/// Laufende Verbindung mit Schreib- und Lese-Task
pub struct Verbindung {
    /// Sendeseite fuer die Zustell-Warteschlange
    pub transport: KanalTransport,
    /// Geparste Nachrichten der Gegenstelle
    pub eingehend: mpsc::Receiver<EingehendeNachricht>,
    schreiber: JoinHandle<()>,
    leser: JoinHandle<()>,
}

impl Verbindung {
    /// Baut die WebSocket-Verbindung auf
    pub async fn verbinden(url: &str, sende_puffer: usize) -> anyhow::Result<Self> {
        tracing::info!(url, "Verbinde mit Gegenstelle");
        let (stream, antwort) = connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("Verbindung zu '{url}' fehlgeschlagen: {e}"))?;
        tracing::info!(status = %antwort.status(), "WebSocket verbunden");
        Ok(Self::aus_stream(stream, sende_puffer))
    }

    /// Startet Schreib- und Lese-Task auf einem bestehenden WebSocket
    pub fn aus_stream<S>(stream: WebSocketStream<S>, sende_puffer: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut schreib_seite, mut lese_seite) = stream.split();
        let (transport, mut ausgehend) = KanalTransport::kanal(sende_puffer);
        let (eingang_tx, eingehend) = mpsc::channel(64);

        let schreiber = tokio::spawn(async move {
            while let Some(text) = ausgehend.recv().await {
                if let Err(e) = schreib_seite.send(Message::Text(text.into())).await {
                    tracing::warn!(fehler = %e, "Schreiben auf WebSocket fehlgeschlagen");
                    return;
                }
            }
            // Alle Sender weg: sauber schliessen
            if let Err(e) = schreib_seite.close().await {
                tracing::debug!(fehler = %e, "WebSocket-Close fehlgeschlagen");
            }
            tracing::debug!("WebSocket-Schreiber beendet");
        });

        let leser = tokio::spawn(async move {
            while let Some(nachricht) = lese_seite.next().await {
                match nachricht {
                    Ok(Message::Text(text)) => match EingehendeNachricht::parsen(text.as_str()) {
                        Ok(nachricht) => {
                            if eingang_tx.send(nachricht).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(fehler = %e, "Unlesbare Nachricht ignoriert");
                        }
                    },
                    Ok(Message::Close(rahmen)) => {
                        tracing::info!(rahmen = ?rahmen, "Gegenstelle schliesst die Verbindung");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(fehler = %e, "Lesen vom WebSocket fehlgeschlagen");
                        break;
                    }
                }
            }
            tracing::debug!("WebSocket-Leser beendet");
        });

        Self {
            transport,
            eingehend,
            schreiber,
            leser,
        }
    }

    /// Begrenzt, wie lange ein Sendeversuch auf die volle Queue wartet
    ///
    /// Danach meldet der Transport `Zeitlimit` und der Frame bleibt fuer
    /// die Wiederholung gepuffert.
    pub fn mit_sende_zeitlimit(mut self, zeitlimit: Option<Duration>) -> Self {
        if let Some(zeitlimit) = zeitlimit {
            self.transport = self.transport.mit_zeitlimit(zeitlimit);
        }
        self
    }

    /// Schliesst die Verbindung
    ///
    /// Der Schreiber endet erst, wenn auch die Warteschlange ihren
    /// Transport freigegeben hat; vorher `ZustellWarteschlange::beenden`.
    pub async fn schliessen(self) {
        let Self {
            transport,
            eingehend,
            mut schreiber,
            leser,
        } = self;
        drop(transport);
        drop(eingehend);

        if tokio::time::timeout(SCHLIESS_FRIST, &mut schreiber).await.is_err() {
            tracing::warn!("WebSocket-Schreiber haengt, wird abgebrochen");
            schreiber.abort();
        }
        leser.abort();
        tracing::info!("Verbindung geschlossen");
    }
}
