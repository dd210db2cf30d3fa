//! Lautstaerke-Anpassung auf PCM16
//!
//! Die drei Schritte sind einzeln aufrufbar:
//! `dekodieren` (base64 -> i16 little-endian), `anpassen` (skalieren und
//! auf den i16-Bereich begrenzen), `kodieren` (Umkehrung von `dekodieren`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AudioError, AudioResult};

/// Lautstaerke-Prozessor fuer einen Stream
#[derive(Debug, Clone)]
pub struct LautstaerkeProzessor {
    /// Aktuelle Lautstaerke (0.0..=1.0)
    lautstaerke: f32,
}

impl LautstaerkeProzessor {
    /// Erstellt einen Prozessor mit Start-Lautstaerke (wird begrenzt)
    pub fn neu(lautstaerke: f32) -> Self {
        let mut p = Self { lautstaerke: 1.0 };
        p.set_lautstaerke(lautstaerke);
        p
    }

    /// Setzt die Lautstaerke, begrenzt auf 0.0..=1.0
    ///
    /// NaN wird als 0.0 behandelt.
    pub fn set_lautstaerke(&mut self, lautstaerke: f32) {
        self.lautstaerke = if lautstaerke.is_nan() {
            0.0
        } else {
            lautstaerke.clamp(0.0, 1.0)
        };
    }

    /// Gibt die aktuelle Lautstaerke zurueck
    pub fn lautstaerke(&self) -> f32 {
        self.lautstaerke
    }

    /// Dekodiert base64-Nutzdaten in PCM16-Samples (little-endian)
    pub fn dekodieren(&self, payload: &str) -> AudioResult<Vec<i16>> {
        let bytes = STANDARD.decode(payload.trim())?;
        if bytes.len() % 2 != 0 {
            return Err(AudioError::UngeradeByteAnzahl(bytes.len()));
        }
        Ok(bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect())
    }

    /// Skaliert alle Samples mit der aktuellen Lautstaerke
    pub fn anpassen(&self, samples: &[i16]) -> Vec<i16> {
        skalieren(samples, self.lautstaerke)
    }

    /// Kodiert PCM16-Samples als base64 (little-endian)
    pub fn kodieren(&self, samples: &[i16]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        STANDARD.encode(bytes)
    }

    /// Dekodieren, anpassen und wieder kodieren in einem Schritt
    pub fn payload_anpassen(&self, payload: &str) -> AudioResult<String> {
        let samples = self.dekodieren(payload)?;
        Ok(self.kodieren(&self.anpassen(&samples)))
    }
}

impl Default for LautstaerkeProzessor {
    fn default() -> Self {
        Self::neu(1.0)
    }
}

/// Multipliziert jedes Sample mit `faktor` und begrenzt auf den i16-Bereich
///
/// Begrenzt wird vor dem Abschneiden der Nachkommastellen, ein Ueberlauf
/// kann daher nicht auftreten.
pub fn skalieren(samples: &[i16], faktor: f32) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s as f32 * faktor).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lautstaerke_default_eins() {
        let p = LautstaerkeProzessor::default();
        assert!((p.lautstaerke() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn lautstaerke_clamp_min() {
        let mut p = LautstaerkeProzessor::default();
        p.set_lautstaerke(-0.3);
        assert_eq!(p.lautstaerke(), 0.0);
    }

    #[test]
    fn lautstaerke_clamp_max() {
        let mut p = LautstaerkeProzessor::default();
        p.set_lautstaerke(1.7);
        assert_eq!(p.lautstaerke(), 1.0);
    }

    #[test]
    fn lautstaerke_nan_wird_stumm() {
        let p = LautstaerkeProzessor::neu(f32::NAN);
        assert_eq!(p.lautstaerke(), 0.0);
    }

    #[test]
    fn anpassen_bei_eins_unveraendert() {
        let p = LautstaerkeProzessor::default();
        let samples = vec![0, 1, -1, 12_345, -12_345, i16::MAX, i16::MIN];
        assert_eq!(p.anpassen(&samples), samples);
    }

    #[test]
    fn anpassen_halbiert() {
        let p = LautstaerkeProzessor::neu(0.5);
        assert_eq!(p.anpassen(&[1000, -1000, 3]), vec![500, -500, 1]);
    }

    #[test]
    fn skalieren_begrenzt_statt_ueberlauf() {
        assert_eq!(skalieren(&[30_000], 1.5), vec![32_767]);
        assert_eq!(skalieren(&[-30_000], 1.5), vec![-32_768]);
    }

    #[test]
    fn kodieren_dekodieren_little_endian() {
        let p = LautstaerkeProzessor::default();
        // 0x0102 little-endian = [0x02, 0x01]
        let payload = p.kodieren(&[0x0102]);
        assert_eq!(payload, STANDARD.encode([0x02u8, 0x01]));
        assert_eq!(p.dekodieren(&payload).unwrap(), vec![0x0102]);
    }

    #[test]
    fn dekodieren_ungerade_bytes() {
        let p = LautstaerkeProzessor::default();
        let payload = STANDARD.encode([1u8, 2, 3]);
        assert!(matches!(
            p.dekodieren(&payload),
            Err(AudioError::UngeradeByteAnzahl(3))
        ));
    }

    #[test]
    fn dekodieren_kein_base64() {
        let p = LautstaerkeProzessor::default();
        assert!(matches!(p.dekodieren("%%%"), Err(AudioError::Base64(_))));
    }

    #[test]
    fn payload_anpassen_stumm() {
        let p = LautstaerkeProzessor::neu(0.0);
        let laut = p.kodieren(&[1000, -2000, 3000]);
        let leise = p.payload_anpassen(&laut).unwrap();
        assert_eq!(p.dekodieren(&leise).unwrap(), vec![0, 0, 0]);
    }
}
