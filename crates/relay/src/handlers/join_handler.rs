//! Join-Handler – Beitritt zum Chat
//!
//! Registriert die Verbindung und laesst den Presence-Melder den
//! Neuzugang verkuenden (Roster + Verlauf an den Neuzugang, user_joined
//! an alle anderen).

use plausch_core::types::ConnectionId;
use plausch_protocol::event::{JoinRequest, ServerEvent};
use std::sync::Arc;

use crate::server_state::RelayState;

/// Verarbeitet einen Beitritt
pub fn handle_join(
    request: JoinRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    match state
        .registry
        .registrieren(connection_id, &request.username, request.avatar)
    {
        Ok(verbindung) => {
            state.melder.beitritt_melden(&verbindung);
            None
        }
        Err(e) => {
            tracing::warn!(
                connection_id = %connection_id,
                fehler = %e,
                "Beitritt abgelehnt"
            );
            Some(ServerEvent::fehler(e.to_string()))
        }
    }
}
