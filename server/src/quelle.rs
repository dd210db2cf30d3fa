//! PCM-Quelle: zerlegt rohes Audio in Media-Frames
//!
//! Jeder Frame deckt `frame_dauer` ab (auf ganze Sample-Frames gerundet),
//! der letzte ist ggf. kuerzer. Nach jeweils `marke_alle` Frames folgt eine
//! Marke `satz-<n>`, am Ende immer die Marke [`ENDE_MARKE`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::time::Duration;
use streamtakt_audio::AudioFormat;
use streamtakt_protocol::MedienFrame;

/// Name der abschliessenden Marke
pub const ENDE_MARKE: &str = "ende";

/// Zerlegt PCM-Daten in base64-kodierte Audio-Frames und Marken
pub fn frames_erzeugen(
    pcm: &[u8],
    format: &AudioFormat,
    frame_dauer: Duration,
    marke_alle: usize,
) -> Vec<MedienFrame> {
    // Mindestens ein Sample-Frame, sonst endlose Schleife bei kurzer Dauer
    let groesse = format
        .bytes_fuer_dauer(frame_dauer)
        .max(format.bytes_pro_frame())
        .max(1);

    let mut frames = Vec::with_capacity(pcm.len() / groesse + 2);
    for (index, stueck) in pcm.chunks(groesse).enumerate() {
        frames.push(MedienFrame::medien(STANDARD.encode(stueck)));
        if marke_alle > 0 && (index + 1) % marke_alle == 0 {
            frames.push(MedienFrame::marke(format!("satz-{}", (index + 1) / marke_alle)));
        }
    }
    frames.push(MedienFrame::marke(ENDE_MARKE));
    frames
}

/// Liest eine rohe PCM-Datei
pub async fn pcm_laden(pfad: &str) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(pfad)
        .await
        .map_err(|e| anyhow::anyhow!("PCM-Datei '{pfad}' nicht lesbar: {e}"))
}
