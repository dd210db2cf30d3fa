//! Konfiguration einer Zustell-Warteschlange
//!
//! Alle Werte sind fuer die Lebensdauer einer Instanz fest. Nur die
//! Lautstaerke kann spaeter ueber die Warteschlange geaendert werden.

use std::time::Duration;
use streamtakt_audio::AudioFormat;
use streamtakt_core::StreamSid;

/// Standard-Schwelle, ab der ein unquittierter Frame als verloren gilt
pub const STANDARD_WIEDERHOLUNGS_SCHWELLE: Duration = Duration::from_secs(2);

/// Standard-Kapazitaet des Uebertragungspuffers (Sweep-Ausloeser)
pub const STANDARD_PUFFER_KAPAZITAET: usize = 5;

/// Konfiguration fuer eine `ZustellWarteschlange`
#[derive(Debug, Clone)]
pub struct ZustellConfig {
    /// Stream-Kennung, wird in jede Nachricht geschrieben
    pub stream_sid: StreamSid,
    /// Format der PCM-Nutzdaten (bestimmt die Abspieldauer)
    pub format: AudioFormat,
    /// Ab dieser Anzahl gepufferter Frames laeuft vor jedem Senden ein Sweep
    pub puffer_kapazitaet: usize,
    /// Alter, ab dem ein unquittierter Frame erneut gesendet wird
    pub wiederholungs_schwelle: Duration,
    /// Start-Lautstaerke (wird auf 0.0..=1.0 begrenzt)
    pub start_lautstaerke: f32,
    /// Lautstaerke vor dem ersten Senden auf die Nutzdaten anwenden
    pub lautstaerke_anwenden: bool,
    /// Zusaetzlicher periodischer Sweep (None = nur bei vollem Puffer)
    pub pruef_intervall: Option<Duration>,
    /// Frames nach so vielen Wiederholungen verwerfen (None = unbegrenzt)
    pub max_wiederholungen: Option<u32>,
    /// Kapazitaet des Ereignis-Kanals
    pub ereignis_kapazitaet: usize,
}

impl ZustellConfig {
    /// Erstellt eine Konfiguration mit Standard-Werten fuer einen Stream
    pub fn neu(stream_sid: impl Into<StreamSid>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
            ..Self::default()
        }
    }

    /// Setzt das Audioformat
    pub fn mit_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for ZustellConfig {
    fn default() -> Self {
        Self {
            stream_sid: StreamSid::default(),
            format: AudioFormat::default(),
            puffer_kapazitaet: STANDARD_PUFFER_KAPAZITAET,
            wiederholungs_schwelle: STANDARD_WIEDERHOLUNGS_SCHWELLE,
            start_lautstaerke: 1.0,
            lautstaerke_anwenden: false,
            pruef_intervall: None,
            max_wiederholungen: None,
            ereignis_kapazitaet: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_werte() {
        let cfg = ZustellConfig::neu("MZ1");
        assert_eq!(cfg.stream_sid.as_str(), "MZ1");
        assert_eq!(cfg.format, AudioFormat::default());
        assert_eq!(cfg.puffer_kapazitaet, 5);
        assert_eq!(cfg.wiederholungs_schwelle, Duration::from_secs(2));
        assert_eq!(cfg.start_lautstaerke, 1.0);
        assert!(!cfg.lautstaerke_anwenden);
        assert!(cfg.pruef_intervall.is_none());
        assert!(cfg.max_wiederholungen.is_none());
    }

    #[test]
    fn mit_format_ueberschreibt() {
        let cfg = ZustellConfig::neu("MZ1").mit_format(AudioFormat::neu(8000, 16, 1));
        assert_eq!(cfg.format.abtastrate, 8000);
        assert_eq!(cfg.format.kanaele, 1);
    }
}
