//! Zustell-Ereignisse
//!
//! Beobachter koennen die Zustellung eines Streams ueber diese Ereignisse
//! verfolgen. Der Versand erfolgt im Delivery-Crate via tokio broadcast;
//! ein verpasstes Ereignis beeinflusst die Zustellung nicht.

use serde::{Deserialize, Serialize};

/// Alle Ereignisse die waehrend der Zustellung eines Streams auftreten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ZustellEreignis {
    /// Ein Frame wurde zum ersten Mal an den Transport uebergeben
    Gesendet { sequenz: u64, dauer_ms: f64 },
    /// Ein veralteter Frame wurde erneut gesendet
    Wiederholt { sequenz: u64, versuch: u32 },
    /// Der Transport hat das Senden abgelehnt (Frame bleibt gepuffert)
    Fehlgeschlagen { sequenz: u64, grund: String },
    /// Ein Frame wurde von der Gegenstelle bestaetigt
    Quittiert { sequenz: u64 },
    /// Ein Frame wurde nach zu vielen Wiederholungen verworfen
    Verworfen { sequenz: u64, versuche: u32 },
    /// Rueckstand und Puffer wurden geleert
    Geleert { rueckstand: usize, puffer: usize },
    /// Die Schleife hat keinen Rueckstand mehr und ruht
    Leerlauf,
}

impl ZustellEreignis {
    /// Gibt die betroffene Sequenznummer zurueck (falls vorhanden)
    pub fn sequenz(&self) -> Option<u64> {
        match self {
            Self::Gesendet { sequenz, .. }
            | Self::Wiederholt { sequenz, .. }
            | Self::Fehlgeschlagen { sequenz, .. }
            | Self::Quittiert { sequenz }
            | Self::Verworfen { sequenz, .. } => Some(*sequenz),
            Self::Geleert { .. } | Self::Leerlauf => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ereignis_ist_serde_kompatibel() {
        let event = ZustellEreignis::Wiederholt {
            sequenz: 7,
            versuch: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: ZustellEreignis = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }

    #[test]
    fn ereignis_sequenz() {
        assert_eq!(ZustellEreignis::Quittiert { sequenz: 3 }.sequenz(), Some(3));
        assert_eq!(ZustellEreignis::Leerlauf.sequenz(), None);
    }
}
