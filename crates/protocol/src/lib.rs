//! plausch-protocol – Ereignis-Kontrakt und Wire-Format
//!
//! Definiert die beiden Haelften des Relay-Protokolls:
//! - [`event`]: Tagged Enums `ClientEvent`/`ServerEvent` samt Wire-DTOs
//! - [`wire`]: Length-Prefix-JSON-Framing als tokio-util Codec

pub mod event;
pub mod wire;

// Bequeme Re-Exporte
pub use event::{ClientEvent, ServerEvent};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
