//! Anruf-Handler – Initiieren, Antworten, Beenden
//!
//! Ablehnungen gehen nur an den Ausloeser. Antworten oder Beenden mit
//! veraltetem Token sind stille No-ops: solche Ereignisse rennen
//! legitim gegen eine Trennung und sind nicht benutzer-relevant.

use plausch_core::types::ConnectionId;
use plausch_protocol::event::{
    CallEndRequest, CallInitiateRequest, CallRespondRequest, ServerEvent,
};
use std::sync::Arc;

use crate::server_state::RelayState;

/// Verarbeitet eine Anruf-Initiierung
pub fn handle_initiate_call(
    request: CallInitiateRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    match state
        .koordinator
        .initiieren(connection_id, request.target_id, request.mode)
    {
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                ziel = %request.target_id,
                fehler = %e,
                "Anruf-Initiierung abgelehnt"
            );
            Some(ServerEvent::fehler(e.to_string()))
        }
    }
}

/// Verarbeitet eine Anruf-Antwort (Annahme oder Ablehnung)
pub fn handle_respond_to_call(
    request: CallRespondRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    if !state.koordinator.antworten(request.call_id, request.accepted) {
        tracing::trace!(
            connection_id = %connection_id,
            call_id = %request.call_id,
            "Antwort auf veraltetes Anruf-Token ignoriert"
        );
    }
    None
}

/// Verarbeitet ein Anruf-Ende
pub fn handle_end_call(
    request: CallEndRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    if !state.koordinator.beenden(request.call_id, connection_id) {
        tracing::trace!(
            connection_id = %connection_id,
            call_id = %request.call_id,
            "Beenden mit veraltetem Anruf-Token ignoriert"
        );
    }
    None
}
