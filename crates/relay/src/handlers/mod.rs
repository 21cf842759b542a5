//! Handler-Module des Relays
//!
//! Jeder Handler ist eine freie Funktion: Anfrage + Ausloeser-ID +
//! Zustand rein, optionale Direktantwort raus.

pub mod call_handler;
pub mod chat_handler;
pub mod join_handler;
pub mod webrtc_handler;
