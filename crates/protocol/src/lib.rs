//! streamtakt-protocol – Frame-Modell und Wire-Nachrichten
//!
//! Dieses Crate definiert den ausgehenden Media-Frame sowie die JSON-
//! Nachrichten, die ueber den Media-Stream-Socket ausgetauscht werden.

pub mod media;
pub mod wire;

pub use media::{FrameEvent, MediaPayload, MedienFrame};
pub use wire::{AusgehendeNachricht, EingehendeNachricht};
