//! Protokoll-Task fuer Zustell-Ereignisse
//!
//! Abonniert den Ereignis-Kanal einer Warteschlange, schreibt jedes Ereignis
//! als Log-Zeile und fuehrt einfache Zaehler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use streamtakt_core::ZustellEreignis;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Momentaufnahme der Zaehler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zaehlerstand {
    pub gesendet: u64,
    pub wiederholt: u64,
    pub fehlgeschlagen: u64,
    pub quittiert: u64,
    pub verworfen: u64,
    pub verpasst: u64,
}

/// Zaehler ueber alle beobachteten Ereignisse
#[derive(Debug, Default)]
pub struct EreignisZaehler {
    gesendet: AtomicU64,
    wiederholt: AtomicU64,
    fehlgeschlagen: AtomicU64,
    quittiert: AtomicU64,
    verworfen: AtomicU64,
    /// Durch Ueberlauf des Kanals verpasste Ereignisse
    verpasst: AtomicU64,
}

impl EreignisZaehler {
    pub fn stand(&self) -> Zaehlerstand {
        Zaehlerstand {
            gesendet: self.gesendet.load(Ordering::Relaxed),
            wiederholt: self.wiederholt.load(Ordering::Relaxed),
            fehlgeschlagen: self.fehlgeschlagen.load(Ordering::Relaxed),
            quittiert: self.quittiert.load(Ordering::Relaxed),
            verworfen: self.verworfen.load(Ordering::Relaxed),
            verpasst: self.verpasst.load(Ordering::Relaxed),
        }
    }

    fn erfassen(&self, ereignis: &ZustellEreignis) {
        let zaehler = match ereignis {
            ZustellEreignis::Gesendet { .. } => &self.gesendet,
            ZustellEreignis::Wiederholt { .. } => &self.wiederholt,
            ZustellEreignis::Fehlgeschlagen { .. } => &self.fehlgeschlagen,
            ZustellEreignis::Quittiert { .. } => &self.quittiert,
            ZustellEreignis::Verworfen { .. } => &self.verworfen,
            ZustellEreignis::Geleert { .. } | ZustellEreignis::Leerlauf => return,
        };
        zaehler.fetch_add(1, Ordering::Relaxed);
    }
}

fn protokollieren(ereignis: &ZustellEreignis) {
    match ereignis {
        ZustellEreignis::Gesendet { sequenz, dauer_ms } => {
            tracing::trace!(sequenz, dauer_ms, "Ereignis: gesendet");
        }
        ZustellEreignis::Wiederholt { sequenz, versuch } => {
            tracing::info!(sequenz, versuch, "Ereignis: wiederholt");
        }
        ZustellEreignis::Fehlgeschlagen { sequenz, grund } => {
            tracing::warn!(sequenz, grund = %grund, "Ereignis: fehlgeschlagen");
        }
        ZustellEreignis::Quittiert { sequenz } => {
            tracing::trace!(sequenz, "Ereignis: quittiert");
        }
        ZustellEreignis::Verworfen { sequenz, versuche } => {
            tracing::warn!(sequenz, versuche, "Ereignis: verworfen");
        }
        ZustellEreignis::Geleert { rueckstand, puffer } => {
            tracing::info!(rueckstand, puffer, "Ereignis: geleert");
        }
        ZustellEreignis::Leerlauf => tracing::debug!("Ereignis: Leerlauf"),
    }
}

/// Startet den Protokoll-Task
///
/// Endet, sobald der Sender (die Warteschlange) verschwindet.
pub fn ereignisse_protokollieren(
    mut rx: broadcast::Receiver<ZustellEreignis>,
) -> (Arc<EreignisZaehler>, JoinHandle<()>) {
    let zaehler = Arc::new(EreignisZaehler::default());
    let task_zaehler = Arc::clone(&zaehler);

    let handle = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ereignis) => {
                    protokollieren(&ereignis);
                    task_zaehler.erfassen(&ereignis);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(verpasst = n, "Ereignis-Protokoll kommt nicht hinterher");
                    task_zaehler.verpasst.fetch_add(n, Ordering::Relaxed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Ereignis-Protokoll beendet");
    });

    (zaehler, handle)
}
