//! Uebertragungspuffer fuer gesendete, noch nicht quittierte Frames
//!
//! Ein Frame wird beim ersten Senden aufgenommen und bleibt, bis er quittiert
//! und von einem Sweep entfernt wird. Der Sweep markiert alle Frames, deren
//! Sendezeit laenger als die Schwelle zurueckliegt, zur erneuten Uebertragung
//! und setzt ihre Sendezeit auf den Sweep-Zeitpunkt.
//!
//! Der Puffer selbst sendet nichts und ist nicht thread-safe; die
//! Warteschlange haelt ihn unter ihrem Mutex und sendet ausserhalb davon.
//!
//! Die Kapazitaet ist kein hartes Limit: sie bestimmt nur, wann vor dem
//! Senden ein Sweep laeuft. Unquittierte Frames werden nie stillschweigend
//! entfernt, ausser `max_wiederholungen` ist gesetzt.

use std::collections::VecDeque;
use std::time::Duration;
use streamtakt_protocol::MedienFrame;
use tokio::time::Instant;

/// Ein gesendeter Frame im Puffer
#[derive(Debug, Clone)]
pub struct GepufferterFrame {
    /// Sequenznummer aus der Warteschlange
    pub sequenz: u64,
    pub frame: MedienFrame,
    /// Zeitpunkt der letzten Uebergabe an den Transport
    pub sende_zeit: Instant,
    /// Von der Gegenstelle bestaetigt
    pub quittiert: bool,
    /// Anzahl erneuter Uebertragungen
    pub wiederholungen: u32,
}

/// Ein Frame, den ein Sweep erneut senden will
#[derive(Debug, Clone)]
pub struct Wiederholung {
    pub sequenz: u64,
    pub frame: MedienFrame,
    /// Laufende Nummer der Wiederholung (1 = erste)
    pub versuch: u32,
}

/// Ergebnis der Markierungsphase eines Sweeps
#[derive(Debug, Default)]
pub struct SweepAuswahl {
    /// Erneut zu sendende Frames, in Puffer-Reihenfolge
    pub wiederholen: Vec<Wiederholung>,
    /// Wegen `max_wiederholungen` entfernte Frames (sequenz, versuche)
    pub verworfen: Vec<(u64, u32)>,
}

/// Uebertragungspuffer
#[derive(Debug)]
pub struct UebertragungsPuffer {
    kapazitaet: usize,
    schwelle: Duration,
    max_wiederholungen: Option<u32>,
    /// Gepufferte Frames in Sende-Reihenfolge
    eintraege: VecDeque<GepufferterFrame>,
}

impl UebertragungsPuffer {
    /// Erstellt einen leeren Puffer
    pub fn neu(kapazitaet: usize, schwelle: Duration, max_wiederholungen: Option<u32>) -> Self {
        Self {
            kapazitaet,
            schwelle,
            max_wiederholungen,
            eintraege: VecDeque::with_capacity(kapazitaet),
        }
    }

    /// Anzahl gepufferter Frames (quittierte eingeschlossen)
    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// True wenn die Kapazitaet erreicht ist (Sweep vor dem naechsten Senden)
    pub fn ist_voll(&self) -> bool {
        self.eintraege.len() >= self.kapazitaet
    }

    /// Gibt den Eintrag zu einer Sequenznummer zurueck
    pub fn eintrag(&self, sequenz: u64) -> Option<&GepufferterFrame> {
        self.eintraege.iter().find(|e| e.sequenz == sequenz)
    }

    /// Iteriert ueber alle Eintraege in Sende-Reihenfolge
    pub fn iter(&self) -> impl Iterator<Item = &GepufferterFrame> {
        self.eintraege.iter()
    }

    /// Nimmt einen gesendeten Frame auf
    ///
    /// Ist die Sequenznummer bereits vorhanden, handelt es sich um eine
    /// Wiederholung: nur die Sendezeit wird aktualisiert. Gibt `true` zurueck
    /// wenn der Frame neu aufgenommen wurde.
    pub fn erfassen(&mut self, sequenz: u64, frame: MedienFrame, jetzt: Instant) -> bool {
        if let Some(eintrag) = self.eintraege.iter_mut().find(|e| e.sequenz == sequenz) {
            eintrag.sende_zeit = jetzt;
            return false;
        }
        self.eintraege.push_back(GepufferterFrame {
            sequenz,
            frame,
            sende_zeit: jetzt,
            quittiert: false,
            wiederholungen: 0,
        });
        true
    }

    /// Setzt das Quittungs-Flag eines Frames
    ///
    /// Gibt `true` zurueck wenn der Frame gepuffert und noch unquittiert war.
    pub fn quittieren(&mut self, sequenz: u64) -> bool {
        match self.eintraege.iter_mut().find(|e| e.sequenz == sequenz) {
            Some(eintrag) if !eintrag.quittiert => {
                eintrag.quittiert = true;
                true
            }
            _ => false,
        }
    }

    /// Quittiert alle unquittierten Frames bis einschliesslich `sequenz`
    ///
    /// Gibt die Sequenznummern der neu quittierten Frames zurueck.
    pub fn bis_quittieren(&mut self, sequenz: u64) -> Vec<u64> {
        self.eintraege
            .iter_mut()
            .filter(|e| e.sequenz <= sequenz && !e.quittiert)
            .map(|e| {
                e.quittiert = true;
                e.sequenz
            })
            .collect()
    }

    /// Sucht die aelteste unquittierte Marke mit diesem Namen
    pub fn marke_finden(&self, name: &str) -> Option<u64> {
        self.eintraege
            .iter()
            .find(|e| !e.quittiert && e.frame.marken_name() == Some(name))
            .map(|e| e.sequenz)
    }

    /// Markierungsphase eines Sweeps
    ///
    /// Jeder unquittierte Frame mit `jetzt - sende_zeit > schwelle` bekommt
    /// die Sendezeit `jetzt` und landet in `wiederholen`. Hat er bereits
    /// `max_wiederholungen` erreicht, wird er stattdessen entfernt.
    pub fn veraltete_markieren(&mut self, jetzt: Instant) -> SweepAuswahl {
        let mut auswahl = SweepAuswahl::default();
        let schwelle = self.schwelle;
        let max = self.max_wiederholungen;

        self.eintraege.retain_mut(|e| {
            if e.quittiert || jetzt.saturating_duration_since(e.sende_zeit) <= schwelle {
                return true;
            }
            if max.is_some_and(|max| e.wiederholungen >= max) {
                auswahl.verworfen.push((e.sequenz, e.wiederholungen));
                return false;
            }
            e.wiederholungen += 1;
            e.sende_zeit = jetzt;
            auswahl.wiederholen.push(Wiederholung {
                sequenz: e.sequenz,
                frame: e.frame.clone(),
                versuch: e.wiederholungen,
            });
            true
        });

        auswahl
    }

    /// Entfernt alle quittierten Frames, gibt deren Anzahl zurueck
    pub fn quittierte_entfernen(&mut self) -> usize {
        let vorher = self.eintraege.len();
        self.eintraege.retain(|e| !e.quittiert);
        vorher - self.eintraege.len()
    }

    /// Verwirft den gesamten Puffer, gibt die Anzahl entfernter Frames zurueck
    pub fn leeren(&mut self) -> usize {
        let anzahl = self.eintraege.len();
        self.eintraege.clear();
        anzahl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
