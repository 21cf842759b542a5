//! Chat-Handler – Nachrichten senden und Tipp-Indikatoren durchreichen
//!
//! Eine validierte Nachricht landet im Log und geht danach an ALLE
//! angehaengten Verbindungen, den Absender eingeschlossen – der Client
//! rendert seine eigene Nachricht erst wenn sie vom Server zurueckkommt.

use plausch_core::types::ConnectionId;
use plausch_protocol::event::{SendMessageRequest, ServerEvent};
use std::sync::Arc;

use crate::server_state::RelayState;

/// Fehlermeldung fuer Ereignisse von unbekannten Verbindungen
const UNBEKANNTE_VERBINDUNG: &str = "Unbekannte Verbindung – bitte dem Chat erneut beitreten";

/// Verarbeitet eine Chat-Nachricht
pub fn handle_send_message(
    request: SendMessageRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    match state
        .log
        .anhaengen(connection_id, request.kind, request.body, request.media)
    {
        Ok(nachricht) => {
            tracing::debug!(
                connection_id = %connection_id,
                message_id = nachricht.id,
                kind = ?nachricht.kind,
                "Nachricht verteilt"
            );
            state
                .broadcaster
                .an_alle_senden(ServerEvent::MessagePosted(nachricht));
            None
        }
        Err(e) => {
            tracing::warn!(
                connection_id = %connection_id,
                fehler = %e,
                "Nachricht abgelehnt"
            );
            Some(ServerEvent::fehler(UNBEKANNTE_VERBINDUNG))
        }
    }
}

/// Verarbeitet einen Tipp-Indikator (Start oder Stop)
pub fn handle_typing(
    connection_id: ConnectionId,
    is_typing: bool,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    match state.registry.verbindung(&connection_id) {
        Some(verbindung) => {
            state.melder.tippen_melden(&verbindung, is_typing);
            None
        }
        None => Some(ServerEvent::fehler(UNBEKANNTE_VERBINDUNG)),
    }
}
