//! Ereignis-Dispatcher – Routet ClientEvents an die richtigen Handler
//!
//! Der Dispatcher empfaengt ClientEvents von einer ClientConnection,
//! klassifiziert sie und reicht sie an Registry, Nachrichten-Log oder
//! Anruf-Koordinator weiter. Jedes Ereignis wird vollstaendig behandelt
//! (Mutation + resultierende Broadcasts) bevor das naechste derselben
//! Verbindung dran ist.
//!
//! Der Rueckgabewert ist die optionale Direktantwort an den Ausloeser
//! (praktisch immer eine Fehlermeldung); aller Fan-out laeuft ueber den
//! EventBroadcaster.

use plausch_core::types::ConnectionId;
use plausch_protocol::event::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::{call_handler, chat_handler, join_handler, webrtc_handler};
use crate::server_state::RelayState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-Adresse (fuer Logging)
    pub peer_addr: SocketAddr,
    /// Beim Socket-Accept vergebene Verbindungs-ID
    pub connection_id: ConnectionId,
}

/// Zentraler Ereignis-Dispatcher
pub struct MessageDispatcher {
    state: Arc<RelayState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Verarbeitet ein eingehendes ClientEvent
    ///
    /// Gibt `Some` zurueck wenn eine Direktantwort an den Ausloeser
    /// gesendet werden soll.
    pub fn dispatch(&self, ereignis: ClientEvent, ctx: &DispatcherContext) -> Option<ServerEvent> {
        let id = ctx.connection_id;

        match ereignis {
            // -------------------------------------------------------------------
            // Praesenz
            // -------------------------------------------------------------------
            ClientEvent::Join(req) => join_handler::handle_join(req, id, &self.state),

            ClientEvent::TypingStart => chat_handler::handle_typing(id, true, &self.state),

            ClientEvent::TypingStop => chat_handler::handle_typing(id, false, &self.state),

            // -------------------------------------------------------------------
            // Chat
            // -------------------------------------------------------------------
            ClientEvent::SendMessage(req) => {
                chat_handler::handle_send_message(req, id, &self.state)
            }

            // -------------------------------------------------------------------
            // Anrufe
            // -------------------------------------------------------------------
            ClientEvent::InitiateCall(req) => {
                call_handler::handle_initiate_call(req, id, &self.state)
            }

            ClientEvent::RespondToCall(req) => {
                call_handler::handle_respond_to_call(req, id, &self.state)
            }

            ClientEvent::EndCall(req) => call_handler::handle_end_call(req, id, &self.state),

            ClientEvent::RelaySignal(req) => {
                webrtc_handler::handle_relay_signal(req, id, &self.state)
            }

            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            ClientEvent::Ping(ping) => {
                let server_ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
                Some(ServerEvent::pong(ping.timestamp_ms, server_ts))
            }

            ClientEvent::Pong(_) => {
                // Pong-Antworten vom Client werden nur geloggt (RTT-Messung)
                tracing::trace!(peer = %ctx.peer_addr, "Pong empfangen");
                None
            }
        }
    }

    /// Bereinigt alle Ressourcen einer Verbindung beim Trennen
    ///
    /// Die Offline-Markierung stoesst ueber die Registry-Listener den
    /// Anruf-Koordinator und den Presence-Melder an; hier selbst wird
    /// nichts versendet.
    pub fn client_cleanup(&self, id: &ConnectionId) {
        self.state.registry.offline_markieren(id);
        self.state.broadcaster.verbindung_entfernen(id);

        tracing::debug!(connection_id = %id, "Verbindungs-Ressourcen bereinigt");
    }
}
