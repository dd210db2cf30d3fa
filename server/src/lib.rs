//! streamtakt-server – Bibliotheks-Root
//!
//! Verbindet Konfiguration, PCM-Quelle, WebSocket und Zustell-Warteschlange
//! zu einer Sitzung. Oeffentlich, damit Integrationstests die Sitzung gegen
//! eine lokale Gegenstelle fahren koennen.

pub mod config;
pub mod quelle;
pub mod verbindung;

use anyhow::Result;
use config::StreamtaktConfig;
use std::sync::Arc;
use std::time::Duration;
use streamtakt_core::StreamSid;
use streamtakt_delivery::{MedienTransport, ZustellStatistik, ZustellWarteschlange};
use streamtakt_observability::Zaehlerstand;
use streamtakt_protocol::EingehendeNachricht;
use tokio::sync::mpsc;
use verbindung::Verbindung;

/// Wie lange auf die `start`-Nachricht gewartet wird, wenn keine StreamSid konfiguriert ist
const START_FRIST: Duration = Duration::from_secs(10);

/// Reaktion auf eine eingehende Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steuerung {
    Weiter,
    /// Die End-Marke wurde quittiert
    Ende,
    /// Die Gegenstelle hat den Stream beendet
    Gestoppt,
}

/// Warum eine Sitzung endete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbschlussGrund {
    /// Alles abgespielt und quittiert
    Ende,
    Gestoppt,
    /// Verbindung verloren
    Getrennt,
    /// End-Marke nicht rechtzeitig quittiert
    Zeitlimit,
}

/// Ergebnis einer Sitzung
#[derive(Debug, Clone)]
pub struct Abschluss {
    pub grund: AbschlussGrund,
    pub statistik: ZustellStatistik,
    /// Aus dem Ereignis-Strom gezaehlt (inkl. verpasster Ereignisse)
    pub ereignisse: Zaehlerstand,
}

/// Wertet eine Nachricht der Gegenstelle fuer die Warteschlange aus
pub fn nachricht_verarbeiten(
    warteschlange: &ZustellWarteschlange,
    nachricht: EingehendeNachricht,
) -> Steuerung {
    match nachricht {
        EingehendeNachricht::Mark { mark, .. } => {
            let anzahl = warteschlange.marke_quittieren(&mark.name);
            tracing::debug!(marke = %mark.name, quittiert = anzahl, "Marke zurueckgemeldet");
            if mark.name == quelle::ENDE_MARKE {
                Steuerung::Ende
            } else {
                Steuerung::Weiter
            }
        }
        EingehendeNachricht::Stop { stream_sid } => {
            tracing::info!(stream_sid = ?stream_sid, "Gegenstelle beendet den Stream");
            Steuerung::Gestoppt
        }
        EingehendeNachricht::Start { start } => {
            tracing::info!(stream_sid = %start.stream_sid, "Stream gestartet");
            Steuerung::Weiter
        }
        EingehendeNachricht::Connected { protocol, version } => {
            tracing::debug!(protocol = ?protocol, version = ?version, "Gegenstelle verbunden");
            Steuerung::Weiter
        }
        EingehendeNachricht::Media { .. } => Steuerung::Weiter,
        EingehendeNachricht::Unbekannt => {
            tracing::trace!("Unbekannte Nachricht ignoriert");
            Steuerung::Weiter
        }
    }
}

/// Wartet auf die `start`-Nachricht und liefert deren StreamSid
pub async fn stream_sid_abwarten(
    eingehend: &mut mpsc::Receiver<EingehendeNachricht>,
) -> Result<StreamSid> {
    let warten = async {
        while let Some(nachricht) = eingehend.recv().await {
            if let EingehendeNachricht::Start { start } = nachricht {
                return Ok(start.stream_sid);
            }
        }
        Err(anyhow::anyhow!("Verbindung vor der start-Nachricht geschlossen"))
    };
    tokio::time::timeout(START_FRIST, warten)
        .await
        .map_err(|_| anyhow::anyhow!("Keine start-Nachricht innerhalb von {START_FRIST:?}"))?
}

/// Eine Abspiel-Sitzung
pub struct StreamtaktServer {
    pub config: StreamtaktConfig,
}

impl StreamtaktServer {
    /// Erstellt einen Server aus der gegebenen Konfiguration
    pub fn neu(config: StreamtaktConfig) -> Self {
        Self { config }
    }

    /// Laedt die PCM-Datei und spielt sie ab, bis sie quittiert ist oder Ctrl-C kommt
    pub async fn starten(self) -> Result<()> {
        let pcm = quelle::pcm_laden(&self.config.quelle.datei).await?;
        let verbindung =
            Verbindung::verbinden(&self.config.verbindung.url, self.config.verbindung.sende_puffer)
                .await?
                .mit_sende_zeitlimit(self.config.sende_zeitlimit());

        tokio::select! {
            abschluss = self.abspielen(verbindung, pcm) => {
                let abschluss = abschluss?;
                tracing::info!(
                    grund = ?abschluss.grund,
                    gesendet = abschluss.statistik.gesendet,
                    wiederholt = abschluss.statistik.wiederholt,
                    fehlgeschlagen = abschluss.statistik.fehlgeschlagen,
                    quittiert = abschluss.ereignisse.quittiert,
                    verworfen = abschluss.ereignisse.verworfen,
                    verpasst = abschluss.ereignisse.verpasst,
                    "Sitzung beendet"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("Shutdown-Signal empfangen, Sitzung wird abgebrochen");
            }
        }
        Ok(())
    }

    /// Spielt `pcm` ueber eine bestehende Verbindung ab
    ///
    /// Reiht alle Frames sofort ein; die Warteschlange taktet sie.
    pub async fn abspielen(&self, mut verbindung: Verbindung, pcm: Vec<u8>) -> Result<Abschluss> {
        let stream_sid = if self.config.stream.stream_sid.is_empty() {
            stream_sid_abwarten(&mut verbindung.eingehend).await?
        } else {
            StreamSid::neu(self.config.stream.stream_sid.as_str())
        };

        let mut zustell_config = self.config.zustell_config();
        zustell_config.stream_sid = stream_sid;
        let format = zustell_config.format;

        let transport: Arc<dyn MedienTransport> = Arc::new(verbindung.transport.clone());
        let warteschlange = ZustellWarteschlange::starten(zustell_config, transport);
        let (zaehler, protokoll) =
            streamtakt_observability::ereignisse_protokollieren(warteschlange.abonnieren());

        let frames = quelle::frames_erzeugen(
            &pcm,
            &format,
            self.config.frame_dauer(),
            self.config.quelle.marke_alle,
        );
        let anzahl = frames.len();
        for frame in frames {
            warteschlange.einreihen(frame);
        }

        let frist = format.dauer(pcm.len())
            + Duration::from_millis(self.config.verbindung.ende_timeout_ms);
        tracing::info!(
            frames = anzahl,
            dauer_ms = format.dauer_ms(pcm.len()),
            "Frames eingereiht"
        );

        let grund = {
            let zeitlimit = tokio::time::sleep(frist);
            tokio::pin!(zeitlimit);

            loop {
                tokio::select! {
                    nachricht = verbindung.eingehend.recv() => {
                        let Some(nachricht) = nachricht else {
                            tracing::warn!("Verbindung zur Gegenstelle verloren");
                            break AbschlussGrund::Getrennt;
                        };
                        match nachricht_verarbeiten(&warteschlange, nachricht) {
                            Steuerung::Weiter => {}
                            Steuerung::Ende => break AbschlussGrund::Ende,
                            Steuerung::Gestoppt => break AbschlussGrund::Gestoppt,
                        }
                    }
                    _ = &mut zeitlimit => {
                        tracing::warn!(frist_ms = frist.as_millis() as u64, "End-Marke nicht quittiert");
                        break AbschlussGrund::Zeitlimit;
                    }
                }
            }
        };

        let statistik = warteschlange.statistik();
        warteschlange.beenden().await;
        // Sender weg -> Protokoll-Task endet von selbst
        let _ = protokoll.await;
        let ereignisse = zaehler.stand();
        verbindung.schliessen().await;

        Ok(Abschluss {
            grund,
            statistik,
            ereignisse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamtakt_delivery::{KanalTransport, ZustellConfig};
    use streamtakt_protocol::wire::{MarkeInfo, StartInfo};

    fn marke(name: &str) -> EingehendeNachricht {
        EingehendeNachricht::Mark {
            stream_sid: None,
            mark: MarkeInfo { name: name.into() },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn marken_steuern_die_sitzung() {
        let (transport, _rx) = KanalTransport::kanal(16);
        let ws = ZustellWarteschlange::starten(ZustellConfig::neu("MZ1"), Arc::new(transport));
        ws.marke("satz-1");
        ws.marke(quelle::ENDE_MARKE);
        ws.leerlauf_abwarten().await;

        assert_eq!(nachricht_verarbeiten(&ws, marke("satz-1")), Steuerung::Weiter);
        assert_eq!(ws.statistik().quittiert, 1);
        assert_eq!(nachricht_verarbeiten(&ws, marke(quelle::ENDE_MARKE)), Steuerung::Ende);
        assert_eq!(ws.statistik().quittiert, 2);

        let stop = EingehendeNachricht::Stop { stream_sid: None };
        assert_eq!(nachricht_verarbeiten(&ws, stop), Steuerung::Gestoppt);
        assert_eq!(nachricht_verarbeiten(&ws, EingehendeNachricht::Unbekannt), Steuerung::Weiter);
    }

    #[tokio::test]
    async fn stream_sid_aus_start_nachricht() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(EingehendeNachricht::Connected { protocol: None, version: None })
            .await
            .unwrap();
        tx.send(EingehendeNachricht::Start {
            start: StartInfo {
                stream_sid: StreamSid::neu("MZstart"),
                call_sid: None,
                tracks: vec![],
                media_format: None,
            },
        })
        .await
        .unwrap();

        let sid = stream_sid_abwarten(&mut rx).await.unwrap();
        assert_eq!(sid.as_str(), "MZstart");
    }

    #[tokio::test]
    async fn stream_sid_ohne_start_nachricht() {
        let (tx, mut rx) = mpsc::channel::<EingehendeNachricht>(1);
        drop(tx);
        assert!(stream_sid_abwarten(&mut rx).await.is_err());
    }
}
