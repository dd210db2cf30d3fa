//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte; ohne Datei laeuft der Server mit diesen.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use streamtakt_audio::AudioFormat;
use streamtakt_delivery::config::{STANDARD_PUFFER_KAPAZITAET, STANDARD_WIEDERHOLUNGS_SCHWELLE};
use streamtakt_delivery::ZustellConfig;

/// Vollstaendige Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamtaktConfig {
    /// Stream-Einstellungen
    pub stream: StreamEinstellungen,
    /// Audioformat und Lautstaerke
    pub audio: AudioEinstellungen,
    /// Takt, Puffer und Wiederholung
    pub zustellung: ZustellEinstellungen,
    /// WebSocket-Verbindung zur Gegenstelle
    pub verbindung: VerbindungsEinstellungen,
    /// Audio-Quelle
    pub quelle: QuellenEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Stream-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamEinstellungen {
    /// Kennung, die in jede ausgehende Nachricht geschrieben wird.
    /// Leer = aus der `start`-Nachricht der Gegenstelle uebernehmen
    pub stream_sid: String,
}

/// Audio-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    pub abtastrate: u32,
    pub bittiefe: u16,
    pub kanaele: u16,
    /// Start-Lautstaerke (0.0 - 1.0)
    pub lautstaerke: f32,
    /// Lautstaerke auf die Nutzdaten anwenden (sonst unveraendert senden)
    pub lautstaerke_anwenden: bool,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        let format = AudioFormat::default();
        Self {
            abtastrate: format.abtastrate,
            bittiefe: format.bittiefe,
            kanaele: format.kanaele,
            lautstaerke: 1.0,
            lautstaerke_anwenden: false,
        }
    }
}

/// Zustell-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZustellEinstellungen {
    /// Fuellstand, ab dem vor dem Senden ein Sweep laeuft
    pub puffer_kapazitaet: usize,
    /// Alter in ms, ab dem ein unquittierter Frame wiederholt wird
    pub wiederholungs_schwelle_ms: u64,
    /// Periodischer Sweep in ms (nicht gesetzt = nur bei vollem Puffer)
    pub pruef_intervall_ms: Option<u64>,
    /// Obergrenze fuer Wiederholungen (nicht gesetzt = unbegrenzt)
    pub max_wiederholungen: Option<u32>,
}

impl Default for ZustellEinstellungen {
    fn default() -> Self {
        Self {
            puffer_kapazitaet: STANDARD_PUFFER_KAPAZITAET,
            wiederholungs_schwelle_ms: STANDARD_WIEDERHOLUNGS_SCHWELLE.as_millis() as u64,
            pruef_intervall_ms: None,
            max_wiederholungen: None,
        }
    }
}

/// Verbindungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbindungsEinstellungen {
    /// WebSocket-URL der Gegenstelle (ws:// oder wss://)
    pub url: String,
    /// Groesse der Sende-Queue zwischen Warteschlange und Socket
    pub sende_puffer: usize,
    /// Wie lange nach dem letzten Frame auf die End-Marke gewartet wird (ms)
    pub ende_timeout_ms: u64,
    /// Wie lange ein Frame auf Platz in der vollen Sende-Queue warten darf (ms)
    pub sende_zeitlimit_ms: Option<u64>,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765/media".into(),
            sende_puffer: 64,
            ende_timeout_ms: 10_000,
            sende_zeitlimit_ms: Some(5_000),
        }
    }
}

/// Quellen-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuellenEinstellungen {
    /// Pfad zur rohen PCM-Datei (little-endian, Format aus `[audio]`)
    pub datei: String,
    /// Dauer eines Frames in ms
    pub frame_ms: u64,
    /// Nach jeweils so vielen Frames eine Marke einreihen (0 = nur End-Marke)
    pub marke_alle: usize,
}

impl Default for QuellenEinstellungen {
    fn default() -> Self {
        Self {
            datei: "audio.pcm".into(),
            frame_ms: 20,
            marke_alle: 50,
        }
    }
}

/// Obergrenze fuer `quelle.frame_ms` (eine Minute pro Frame)
pub const MAX_FRAME_MS: u64 = 60_000;

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl StreamtaktConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.audio.abtastrate == 0 {
            anyhow::bail!("audio.abtastrate darf nicht 0 sein");
        }
        if self.audio.bittiefe != 16 && self.audio.lautstaerke_anwenden {
            anyhow::bail!("audio.lautstaerke_anwenden setzt 16-Bit-PCM voraus");
        }
        if self.format().bytes_pro_frame() == 0 {
            anyhow::bail!("audio.bittiefe/kanaele ergeben keine ganzen Bytes pro Sample");
        }
        if self.quelle.frame_ms == 0 || self.quelle.frame_ms > MAX_FRAME_MS {
            anyhow::bail!(
                "quelle.frame_ms muss zwischen 1 und {MAX_FRAME_MS} liegen (ist {})",
                self.quelle.frame_ms
            );
        }
        if !streamtakt_observability::log_level_gueltig(&self.logging.level) {
            anyhow::bail!(
                "logging.level '{}' unbekannt (trace/debug/info/warn/error)",
                self.logging.level
            );
        }
        if !streamtakt_observability::log_format_gueltig(&self.logging.format) {
            anyhow::bail!("logging.format '{}' unbekannt (text/json)", self.logging.format);
        }
        Ok(())
    }

    /// Audioformat aus `[audio]`
    pub fn format(&self) -> AudioFormat {
        AudioFormat::neu(self.audio.abtastrate, self.audio.bittiefe, self.audio.kanaele)
    }

    /// Sende-Zeitlimit aus `[verbindung]`
    pub fn sende_zeitlimit(&self) -> Option<Duration> {
        self.verbindung.sende_zeitlimit_ms.map(Duration::from_millis)
    }

    /// Frame-Dauer aus `[quelle]`
    pub fn frame_dauer(&self) -> Duration {
        Duration::from_millis(self.quelle.frame_ms)
    }

    /// Uebersetzt die Datei-Konfiguration in die der Warteschlange
    pub fn zustell_config(&self) -> ZustellConfig {
        ZustellConfig {
            puffer_kapazitaet: self.zustellung.puffer_kapazitaet,
            wiederholungs_schwelle: Duration::from_millis(self.zustellung.wiederholungs_schwelle_ms),
            start_lautstaerke: self.audio.lautstaerke,
            lautstaerke_anwenden: self.audio.lautstaerke_anwenden,
            pruef_intervall: self.zustellung.pruef_intervall_ms.map(Duration::from_millis),
            max_wiederholungen: self.zustellung.max_wiederholungen,
            ..ZustellConfig::neu(self.stream.stream_sid.as_str()).mit_format(self.format())
        }
    }
}
