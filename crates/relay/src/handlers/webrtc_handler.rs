//! WebRTC-Handler – Zustandslose Signalisierungs-Weiterleitung
//!
//! Offer, Answer und ICE-Kandidaten teilen sich eine Operation: Payload
//! samt Absender-ID an die angegebene Ziel-Verbindung durchreichen.
//! Es wird NICHT geprueft ob das Anruf-Token live ist oder Absender und
//! Ziel tatsaechlich die beiden Anruf-Teilnehmer sind – das Relay
//! vertraut dem Aufrufer. Ein Unicast an eine inzwischen getrennte
//! Verbindung verpufft still im Broadcaster.

use plausch_core::types::ConnectionId;
use plausch_protocol::event::{ServerEvent, SignalNotice, SignalRelayRequest};
use std::sync::Arc;

use crate::server_state::RelayState;

/// Leitet ein Signalisierungs-Payload an die Ziel-Verbindung weiter
pub fn handle_relay_signal(
    request: SignalRelayRequest,
    connection_id: ConnectionId,
    state: &Arc<RelayState>,
) -> Option<ServerEvent> {
    tracing::trace!(
        connection_id = %connection_id,
        ziel = %request.destination_id,
        kind = ?request.kind,
        call_id = %request.call_id,
        "Signal weitergeleitet"
    );

    state.broadcaster.an_verbindung_senden(
        &request.destination_id,
        ServerEvent::SignalRelayed(SignalNotice {
            kind: request.kind,
            call_id: request.call_id,
            sender_id: connection_id,
            payload: request.payload,
        }),
    );
    None
}
