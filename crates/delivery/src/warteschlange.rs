//! Getaktete Zustell-Warteschlange
//!
//! Haelt den Rueckstand eines Streams und einen einzigen Zustell-Task, der
//! Frame fuer Frame sendet und danach genau die Abspieldauer des Frames
//! wartet.
//!
//! ## Ablauf
//!
//! ```text
//! einreihen() ──> Rueckstand (FIFO) ──> Zustell-Task (ein Task pro Instanz)
//!                                         |
//!                                         +-- Puffer voll? -> Sweep
//!                                         +-- Puffer erfassen + Transport::senden
//!                                         +-- sleep(Abspieldauer)
//!                                         '-- Rueckstand leer? -> Leerlauf, parken
//! ```
//!
//! ## Zustaende
//!
//! - `Leerlauf`: kein Rueckstand, Task geparkt
//! - `Ausstehend`: Frame eingereiht, Task geweckt aber noch nicht gestartet
//! - `Zustellung`: Task sendet oder wartet die Abspieldauer ab
//!
//! Nur der Uebergang `Leerlauf -> Ausstehend` weckt den Task. Dadurch gibt
//! es nie zwei parallele Zustellungen.
//!
//! Rueckstand, Puffer und Statistik liegen unter einem `parking_lot::Mutex`,
//! der nie ueber ein `.await` gehalten wird.

use crate::config::ZustellConfig;
use crate::puffer::UebertragungsPuffer;
use crate::transport::MedienTransport;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use streamtakt_audio::LautstaerkeProzessor;
use streamtakt_core::ZustellEreignis;
use streamtakt_protocol::wire::frame_serialisieren;
use streamtakt_protocol::MedienFrame;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

// ---------------------------------------------------------------------------
// Zustand & Statistik
// ---------------------------------------------------------------------------

/// Phase der Zustell-Schleife
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZustellPhase {
    /// Kein Rueckstand, Task wartet auf einen Weckruf
    Leerlauf,
    /// Rueckstand vorhanden, Task wurde geweckt
    Ausstehend,
    /// Ein Frame wird gesendet oder seine Abspieldauer abgewartet
    Zustellung,
}

/// Zaehler der Warteschlange (Snapshot)
#[derive(Debug, Clone, Default)]
pub struct ZustellStatistik {
    /// Eingereihte Frames gesamt
    pub eingereiht: u64,
    /// Erstmalig erfolgreich gesendete Frames
    pub gesendet: u64,
    /// Erfolgreiche Wiederholungen
    pub wiederholt: u64,
    /// Fehlgeschlagene Sendeversuche (erstmalig und Wiederholung)
    pub fehlgeschlagen: u64,
    /// Quittierte Frames
    pub quittiert: u64,
    /// Wegen `max_wiederholungen` verworfene Frames
    pub verworfen: u64,
    /// Durchgefuehrte Sweeps
    pub sweeps: u64,
    /// Aktueller Rueckstand
    pub rueckstand: usize,
    /// Aktuell gepufferte Frames
    pub gepuffert: usize,
}

/// Ergebnis eines Sweeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepBericht {
    /// Erneut an den Transport uebergebene Frames
    pub wiederholt: usize,
    /// Davon fehlgeschlagen
    pub fehlgeschlagen: usize,
    /// Wegen `max_wiederholungen` verworfene Frames
    pub verworfen: usize,
    /// Entfernte quittierte Frames
    pub entfernt: usize,
}

struct Zustand {
    /// Noch nicht gesendete Frames (sequenz, frame)
    rueckstand: VecDeque<(u64, MedienFrame)>,
    puffer: UebertragungsPuffer,
    phase: ZustellPhase,
    naechste_sequenz: u64,
    statistik: ZustellStatistik,
}

impl Zustand {
    /// Haengt einen Frame an; `true` wenn der Zustell-Task geweckt werden muss
    fn anhaengen(&mut self, frame: MedienFrame) -> (u64, bool) {
        let sequenz = self.naechste_sequenz;
        self.naechste_sequenz += 1;
        self.rueckstand.push_back((sequenz, frame));
        self.statistik.eingereiht += 1;

        let wecken = self.phase == ZustellPhase::Leerlauf;
        if wecken {
            self.phase = ZustellPhase::Ausstehend;
        }
        (sequenz, wecken)
    }
}

struct Inner {
    config: ZustellConfig,
    transport: Arc<dyn MedienTransport>,
    zustand: Mutex<Zustand>,
    lautstaerke: Mutex<LautstaerkeProzessor>,
    /// Weckruf fuer den Zustell-Task (Uebergang Leerlauf -> Ausstehend)
    weckruf: Notify,
    ereignisse: broadcast::Sender<ZustellEreignis>,
}

// ---------------------------------------------------------------------------
// ZustellWarteschlange
// ---------------------------------------------------------------------------

/// Getaktete Zustell-Warteschlange fuer genau einen Media-Stream
///
/// Beim Drop werden Zustell- und Pruef-Task abgebrochen.
pub struct ZustellWarteschlange {
    inner: Arc<Inner>,
    zusteller: JoinHandle<()>,
    pruefer: Option<JoinHandle<()>>,
}

impl ZustellWarteschlange {
    /// Erstellt die Warteschlange und startet ihren Zustell-Task
    ///
    /// Muss innerhalb einer tokio-Runtime aufgerufen werden. Mit gesetztem
    /// `pruef_intervall` laeuft zusaetzlich ein periodischer Sweep.
    pub fn starten(config: ZustellConfig, transport: Arc<dyn MedienTransport>) -> Self {
        let puffer = UebertragungsPuffer::neu(
            config.puffer_kapazitaet,
            config.wiederholungs_schwelle,
            config.max_wiederholungen,
        );
        let (ereignisse, _) = broadcast::channel(config.ereignis_kapazitaet.max(1));

        let inner = Arc::new(Inner {
            lautstaerke: Mutex::new(LautstaerkeProzessor::neu(config.start_lautstaerke)),
            zustand: Mutex::new(Zustand {
                rueckstand: VecDeque::new(),
                puffer,
                phase: ZustellPhase::Leerlauf,
                naechste_sequenz: 0,
                statistik: ZustellStatistik::default(),
            }),
            weckruf: Notify::new(),
            ereignisse,
            transport,
            config,
        });

        let zusteller = tokio::spawn(zustell_schleife(Arc::clone(&inner)));

        let pruefer = inner
            .config
            .pruef_intervall
            .filter(|intervall| !intervall.is_zero())
            .map(|intervall| tokio::spawn(pruef_schleife(Arc::clone(&inner), intervall)));

        tracing::info!(
            stream_sid = %inner.config.stream_sid,
            abtastrate = inner.config.format.abtastrate,
            bittiefe = inner.config.format.bittiefe,
            kanaele = inner.config.format.kanaele,
            puffer_kapazitaet = inner.config.puffer_kapazitaet,
            periodischer_sweep = pruefer.is_some(),
            "Zustell-Warteschlange gestartet"
        );

        Self {
            inner,
            zusteller,
            pruefer,
        }
    }

    /// Reiht einen Frame am Ende des Rueckstands ein
    ///
    /// Blockiert nie. Gibt die vergebene Sequenznummer zurueck.
    pub fn einreihen(&self, frame: MedienFrame) -> u64 {
        let (sequenz, wecken) = self.inner.zustand.lock().anhaengen(frame);
        if wecken {
            self.inner.weckruf.notify_one();
        }
        tracing::trace!(sequenz, geweckt = wecken, "Frame eingereiht");
        sequenz
    }

    /// Reiht eine Marke ohne Audio ein (`{"name": name}`)
    pub fn marke(&self, name: impl Into<String>) -> u64 {
        self.einreihen(MedienFrame::marke(name))
    }

    /// Verwirft Rueckstand und Puffer und fordert die Gegenstelle auf,
    /// ihren Abspielpuffer ebenfalls zu verwerfen
    ///
    /// Das `clear` wird als einziger Frame eingereiht und nicht gepuffert.
    /// Ein Frame, dessen Abspieldauer gerade abgewartet wird, ist bereits
    /// gesendet; die Pause laeuft zu Ende, danach folgt das `clear`.
    pub fn leeren(&self) {
        let (rueckstand, puffer, wecken) = {
            let mut z = self.inner.zustand.lock();
            let rueckstand = z.rueckstand.len();
            z.rueckstand.clear();
            let puffer = z.puffer.leeren();
            let (_, wecken) = z.anhaengen(MedienFrame::clear());
            (rueckstand, puffer, wecken)
        };
        if wecken {
            self.inner.weckruf.notify_one();
        }
        tracing::info!(rueckstand, puffer, "Warteschlange geleert");
        self.inner.ereignis(ZustellEreignis::Geleert { rueckstand, puffer });
    }

    /// Setzt die Lautstaerke (begrenzt auf 0.0..=1.0)
    pub fn lautstaerke_setzen(&self, lautstaerke: f32) {
        let mut p = self.inner.lautstaerke.lock();
        p.set_lautstaerke(lautstaerke);
        tracing::debug!(lautstaerke = p.lautstaerke(), "Lautstaerke gesetzt");
    }

    /// Gibt die aktuelle Lautstaerke zurueck
    pub fn lautstaerke(&self) -> f32 {
        self.inner.lautstaerke.lock().lautstaerke()
    }

    /// Quittiert einen gepufferten Frame
    ///
    /// Entfernt wird er erst beim naechsten Sweep. Gibt `false` zurueck wenn
    /// der Frame nicht (mehr) gepuffert oder schon quittiert ist.
    pub fn quittieren(&self, sequenz: u64) -> bool {
        let quittiert = {
            let mut z = self.inner.zustand.lock();
            let quittiert = z.puffer.quittieren(sequenz);
            if quittiert {
                z.statistik.quittiert += 1;
            }
            quittiert
        };
        if quittiert {
            tracing::trace!(sequenz, "Frame quittiert");
            self.inner.ereignis(ZustellEreignis::Quittiert { sequenz });
        }
        quittiert
    }

    /// Quittiert die Marke `name` und alle davor gesendeten Frames
    ///
    /// Die Gegenstelle meldet eine Marke erst zurueck, wenn alles davor
    /// abgespielt ist. Gibt die Anzahl neu quittierter Frames zurueck.
    pub fn marke_quittieren(&self, name: &str) -> usize {
        let quittiert = {
            let mut z = self.inner.zustand.lock();
            let Some(sequenz) = z.puffer.marke_finden(name) else {
                tracing::debug!(marke = name, "Unbekannte Marke quittiert");
                return 0;
            };
            let quittiert = z.puffer.bis_quittieren(sequenz);
            z.statistik.quittiert += quittiert.len() as u64;
            quittiert
        };

        tracing::debug!(marke = name, anzahl = quittiert.len(), "Marke quittiert");
        for sequenz in &quittiert {
            self.inner
                .ereignis(ZustellEreignis::Quittiert { sequenz: *sequenz });
        }
        quittiert.len()
    }

    /// Fuehrt sofort einen Wiederholungs-Sweep durch
    pub async fn puffer_pruefen(&self) -> SweepBericht {
        self.inner.puffer_pruefen().await
    }

    /// Abonniert die Zustell-Ereignisse
    pub fn abonnieren(&self) -> broadcast::Receiver<ZustellEreignis> {
        self.inner.ereignisse.subscribe()
    }

    /// Wartet bis der Rueckstand abgearbeitet ist und die Schleife ruht
    pub async fn leerlauf_abwarten(&self) {
        let mut rx = self.abonnieren();
        loop {
            if self.phase() == ZustellPhase::Leerlauf {
                return;
            }
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Aktuelle Phase der Zustell-Schleife
    pub fn phase(&self) -> ZustellPhase {
        self.inner.zustand.lock().phase
    }

    /// Anzahl noch nicht gesendeter Frames
    pub fn ausstehend(&self) -> usize {
        self.inner.zustand.lock().rueckstand.len()
    }

    /// Anzahl gepufferter (gesendeter, noch nicht entfernter) Frames
    pub fn gepuffert(&self) -> usize {
        self.inner.zustand.lock().puffer.len()
    }

    /// Snapshot der Statistik
    pub fn statistik(&self) -> ZustellStatistik {
        let z = self.inner.zustand.lock();
        ZustellStatistik {
            rueckstand: z.rueckstand.len(),
            gepuffert: z.puffer.len(),
            ..z.statistik.clone()
        }
    }

    /// Konfiguration dieser Instanz
    pub fn config(&self) -> &ZustellConfig {
        &self.inner.config
    }

    /// Bricht die Tasks ab und wartet auf deren Ende
    ///
    /// Nicht gesendete Frames gehen verloren.
    pub async fn beenden(mut self) {
        self.zusteller.abort();
        let _ = (&mut self.zusteller).await;
        if let Some(pruefer) = self.pruefer.as_mut() {
            pruefer.abort();
            let _ = pruefer.await;
        }
        tracing::info!(stream_sid = %self.inner.config.stream_sid, "Zustell-Warteschlange beendet");
    }
}

impl Drop for ZustellWarteschlange {
    fn drop(&mut self) {
        self.zusteller.abort();
        if let Some(pruefer) = &self.pruefer {
            pruefer.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Zustellung
// ---------------------------------------------------------------------------

impl Inner {
    fn ereignis(&self, ereignis: ZustellEreignis) {
        // Fehler nur wenn niemand abonniert hat
        let _ = self.ereignisse.send(ereignis);
    }

    /// Serialisiert einen Frame und uebergibt ihn dem Transport
    async fn senden(&self, frame: &MedienFrame) -> streamtakt_core::Result<()> {
        let nachricht = frame_serialisieren(&self.config.stream_sid, frame)?;
        self.transport.senden(nachricht).await
    }

    /// Erstmalige Zustellung eines Frames
    async fn zustellen(&self, sequenz: u64, mut frame: MedienFrame, dauer: Duration) {
        let voll = self.zustand.lock().puffer.ist_voll();
        if voll {
            tracing::debug!(sequenz, "Puffer voll, Sweep vor dem Senden");
            self.puffer_pruefen().await;
        }

        if self.config.lautstaerke_anwenden {
            self.lautstaerke_anwenden(sequenz, &mut frame);
        }

        // Vor dem Senden erfassen: eine schnelle Quittung findet den Frame so schon vor
        if !frame.ist_steuerung() {
            self.zustand
                .lock()
                .puffer
                .erfassen(sequenz, frame.clone(), Instant::now());
        }

        let ergebnis = self.senden(&frame).await;
        let dauer_ms = dauer.as_nanos() as f64 / 1_000_000.0;

        match ergebnis {
            Ok(()) => {
                self.zustand.lock().statistik.gesendet += 1;
                tracing::trace!(sequenz, art = %frame.event, dauer_ms, "Frame gesendet");
                self.ereignis(ZustellEreignis::Gesendet { sequenz, dauer_ms });
            }
            Err(e) => {
                self.zustand.lock().statistik.fehlgeschlagen += 1;
                tracing::warn!(sequenz, fehler = %e, "Senden fehlgeschlagen, Frame bleibt gepuffert");
                self.ereignis(ZustellEreignis::Fehlgeschlagen {
                    sequenz,
                    grund: e.to_string(),
                });
            }
        }
    }

    /// Wendet die aktuelle Lautstaerke auf die Nutzdaten an
    fn lautstaerke_anwenden(&self, sequenz: u64, frame: &mut MedienFrame) {
        let Some(media) = frame.media.as_mut() else {
            return;
        };
        if media.payload.is_empty() {
            return;
        }
        let ergebnis = self.lautstaerke.lock().payload_anpassen(&media.payload);
        match ergebnis {
            Ok(angepasst) => media.payload = angepasst,
            Err(e) => {
                tracing::warn!(sequenz, fehler = %e, "Lautstaerke nicht anwendbar, sende unveraendert");
            }
        }
    }

    /// Wiederholungs-Sweep: veraltete Frames erneut senden, quittierte entfernen
    async fn puffer_pruefen(&self) -> SweepBericht {
        let auswahl = {
            let mut z = self.zustand.lock();
            z.statistik.sweeps += 1;
            let auswahl = z.puffer.veraltete_markieren(Instant::now());
            z.statistik.verworfen += auswahl.verworfen.len() as u64;
            auswahl
        };

        let mut bericht = SweepBericht {
            verworfen: auswahl.verworfen.len(),
            ..SweepBericht::default()
        };

        for (sequenz, versuche) in auswahl.verworfen {
            tracing::warn!(sequenz, versuche, "Frame nach maximalen Wiederholungen verworfen");
            self.ereignis(ZustellEreignis::Verworfen { sequenz, versuche });
        }

        for w in auswahl.wiederholen {
            bericht.wiederholt += 1;
            match self.senden(&w.frame).await {
                Ok(()) => {
                    tracing::debug!(sequenz = w.sequenz, versuch = w.versuch, "Frame wiederholt");
                    self.ereignis(ZustellEreignis::Wiederholt {
                        sequenz: w.sequenz,
                        versuch: w.versuch,
                    });
                }
                Err(e) => {
                    bericht.fehlgeschlagen += 1;
                    tracing::warn!(sequenz = w.sequenz, versuch = w.versuch, fehler = %e, "Wiederholung fehlgeschlagen");
                    self.ereignis(ZustellEreignis::Fehlgeschlagen {
                        sequenz: w.sequenz,
                        grund: e.to_string(),
                    });
                }
            }
        }

        {
            let mut z = self.zustand.lock();
            z.statistik.wiederholt += (bericht.wiederholt - bericht.fehlgeschlagen) as u64;
            z.statistik.fehlgeschlagen += bericht.fehlgeschlagen as u64;
            bericht.entfernt = z.puffer.quittierte_entfernen();
        }

        if bericht != SweepBericht::default() {
            tracing::debug!(
                wiederholt = bericht.wiederholt,
                verworfen = bericht.verworfen,
                entfernt = bericht.entfernt,
                "Sweep abgeschlossen"
            );
        }
        bericht
    }
}

/// Zustell-Task: laeuft fuer die Lebensdauer der Warteschlange
async fn zustell_schleife(inner: Arc<Inner>) {
    loop {
        inner.weckruf.notified().await;

        loop {
            let naechster = {
                let mut z = inner.zustand.lock();
                let naechster = z.rueckstand.pop_front();
                z.phase = if naechster.is_some() {
                    ZustellPhase::Zustellung
                } else {
                    ZustellPhase::Leerlauf
                };
                naechster
            };

            let Some((sequenz, frame)) = naechster else {
                tracing::debug!("Rueckstand leer, Zustellung ruht");
                inner.ereignis(ZustellEreignis::Leerlauf);
                break;
            };

            let dauer = inner.config.format.dauer(frame.pcm_laenge());
            inner.zustellen(sequenz, frame, dauer).await;

            if !dauer.is_zero() {
                tokio::time::sleep(dauer).await;
            }
        }
    }
}

/// Periodischer Sweep, unabhaengig vom Fuellstand des Puffers
async fn pruef_schleife(inner: Arc<Inner>, intervall: Duration) {
    let mut takt = tokio::time::interval(intervall);
    takt.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Erster Tick kommt sofort
    takt.tick().await;

    loop {
        takt.tick().await;
        inner.puffer_pruefen().await;
    }
}
