//! plausch-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Plausch-Crates gemeinsam genutzt werden: ID-Newtypes und die
//! geschlossenen Art-Enums des Chat-Relays.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PlauschError, Result};
pub use types::{
    AnrufModus, AnrufZustand, CallId, ConnectionId, NachrichtenArt, OnlineStatus, SignalArt,
};
