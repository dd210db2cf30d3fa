//! Audioformat und Abspieldauer
//!
//! Die Dauer eines Payloads ergibt sich rein aus der Byte-Anzahl:
//!
//! ```text
//! samples  = bytes / (bittiefe / 8 * kanaele)
//! dauer_ms = samples / abtastrate * 1000
//! ```
//!
//! Angefangene Sample-Frames (Rest der Division) zaehlen nicht mit.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Format der PCM-Daten eines Streams (fest fuer die Lebensdauer einer Instanz)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    /// Abtastrate in Hz
    pub abtastrate: u32,
    /// Bits pro Sample
    pub bittiefe: u16,
    /// Anzahl Kanaele
    pub kanaele: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            abtastrate: 44_100,
            bittiefe: 16,
            kanaele: 2,
        }
    }
}

impl AudioFormat {
    /// Erstellt ein Format mit den gegebenen Parametern
    pub fn neu(abtastrate: u32, bittiefe: u16, kanaele: u16) -> Self {
        Self {
            abtastrate,
            bittiefe,
            kanaele,
        }
    }

    /// Bytes pro Sample eines Kanals
    pub fn bytes_pro_sample(&self) -> usize {
        (self.bittiefe / 8) as usize
    }

    /// Bytes pro Sample-Frame (alle Kanaele)
    pub fn bytes_pro_frame(&self) -> usize {
        self.bytes_pro_sample() * self.kanaele as usize
    }

    /// Bytes pro Sekunde Audio
    pub fn bytes_pro_sekunde(&self) -> usize {
        self.bytes_pro_frame() * self.abtastrate as usize
    }

    /// Anzahl vollstaendiger Samples (pro Kanal) in `bytes`
    ///
    /// Degenerierte Formate (0 Kanaele, Bittiefe unter 8) ergeben 0.
    pub fn samples(&self, bytes: usize) -> u64 {
        match self.bytes_pro_frame() {
            0 => 0,
            pro_frame => (bytes / pro_frame) as u64,
        }
    }

    /// Abspieldauer in Millisekunden
    pub fn dauer_ms(&self, bytes: usize) -> f64 {
        if self.abtastrate == 0 {
            return 0.0;
        }
        self.samples(bytes) as f64 * 1000.0 / self.abtastrate as f64
    }

    /// Abspieldauer als `Duration`
    ///
    /// Ganzzahlig in Nanosekunden gerechnet, damit die Pacing-Pause keine
    /// Rundungsfehler aus der Gleitkomma-Division mitnimmt.
    pub fn dauer(&self, bytes: usize) -> Duration {
        if self.abtastrate == 0 {
            return Duration::ZERO;
        }
        let nanos = self.samples(bytes) as u128 * 1_000_000_000 / self.abtastrate as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Byte-Anzahl fuer eine gewuenschte Frame-Dauer (auf ganze Sample-Frames gerundet)
    ///
    /// Saettigt bei `usize::MAX` statt ueberzulaufen.
    pub fn bytes_fuer_dauer(&self, dauer: Duration) -> usize {
        let samples = dauer.as_nanos().saturating_mul(self.abtastrate as u128) / 1_000_000_000;
        samples
            .saturating_mul(self.bytes_pro_frame() as u128)
            .try_into()
            .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_format() {
        let f = AudioFormat::default();
        assert_eq!(f.abtastrate, 44_100);
        assert_eq!(f.bittiefe, 16);
        assert_eq!(f.kanaele, 2);
        assert_eq!(f.bytes_pro_frame(), 4);
    }

    #[test]
    fn dauer_100ms_stereo_44k() {
        let f = AudioFormat::default();
        // 17640 / (2*2) = 4410 Samples -> 4410 / 44100 * 1000 = 100 ms
        assert_eq!(f.samples(17_640), 4410);
        assert_eq!(f.dauer_ms(17_640), 100.0);
        assert_eq!(f.dauer(17_640), Duration::from_millis(100));
    }

    #[test]
    fn dauer_null_bytes() {
        let f = AudioFormat::default();
        assert_eq!(f.dauer_ms(0), 0.0);
        assert_eq!(f.dauer(0), Duration::ZERO);
    }

    #[test]
    fn dauer_50ms_exakt() {
        let f = AudioFormat::default();
        assert_eq!(f.dauer(8_820), Duration::from_millis(50));
    }

    #[test]
    fn bytes_fuer_dauer_saettigt() {
        let f = AudioFormat::default();
        assert_eq!(f.bytes_fuer_dauer(Duration::from_millis(100)), 17_640);
        assert_eq!(f.bytes_fuer_dauer(Duration::MAX), usize::MAX);
    }

    #[test]
    fn angefangene_frames_zaehlen_nicht() {
        let f = AudioFormat::default();
        // 3 Bytes reichen nicht fuer einen Stereo-PCM16-Frame
        assert_eq!(f.samples(3), 0);
        assert_eq!(f.samples(7), 1);
    }

    #[test]
    fn degeneriertes_format() {
        assert_eq!(AudioFormat::neu(0, 16, 2).dauer_ms(1000), 0.0);
        assert_eq!(AudioFormat::neu(8000, 16, 0).dauer(1000), Duration::ZERO);
        assert_eq!(AudioFormat::neu(8000, 4, 1).samples(1000), 0);
    }

    #[test]
    fn mono_8k() {
        let f = AudioFormat::neu(8000, 16, 1);
        assert_eq!(f.bytes_pro_sekunde(), 16_000);
        assert_eq!(f.dauer(320), Duration::from_millis(20));
        assert_eq!(f.bytes_fuer_dauer(Duration::from_millis(20)), 320);
    }

    #[test]
    fn format_aus_teilweisem_json() {
        let f: AudioFormat = serde_json::from_str(r#"{"abtastrate": 8000}"#).unwrap();
        assert_eq!(f.abtastrate, 8000);
        assert_eq!(f.bittiefe, 16);
    }
}
