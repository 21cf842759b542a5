//! plausch-relay – Session-, Presence- und Anruf-Relay
//!
//! Dieses Crate implementiert den Kern des Plausch-Servers: Verbindungs-
//! Registry, begrenztes Nachrichten-Log, Presence-Fan-out, Anruf-
//! Koordination und die zustandslose WebRTC-Signalisierungs-Weiterleitung.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task, frische ConnectionId)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- JoinHandler    (Beitritt, Validierung)
//!     +-- ChatHandler    (Nachrichten, Tipp-Indikatoren)
//!     +-- CallHandler    (Initiieren, Antworten, Beenden)
//!     +-- WebrtcHandler  (Offer/Answer/ICE durchreichen)
//!
//! ConnectionRegistry – Wer ist bekannt, wer ist online; Bereinigung
//! MessageLog         – Begrenztes FIFO der letzten 100 Nachrichten
//! AnrufKoordinator   – Live-Tabelle + Zustandsmaschine pro Anruf
//! PresenceMelder     – Beitritt/Austritt/Tippen verkuenden
//! EventBroadcaster   – Unicast / Broadcast / Broadcast-ausser-Absender
//! ```
//!
//! Der Trennungs-Pfad laeuft ueber Registry-Listener: `offline_markieren`
//! stoesst Anruf-Ende und Austritts-Meldung an, die spaetere Bereinigung
//! den Roster-Refresh. Die Registry kennt dabei weder Koordinator noch
//! Melder.

pub mod broadcast;
pub mod calls;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod history;
pub mod presence;
pub mod registry;
pub mod server_state;
pub mod tcp;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use calls::AnrufKoordinator;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{RelayError, RelayResult};
pub use history::MessageLog;
pub use presence::PresenceMelder;
pub use registry::ConnectionRegistry;
pub use server_state::{RelayConfig, RelayState};
pub use tcp::RelayServer;
