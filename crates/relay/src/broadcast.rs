//! Event-Broadcaster – Das Verteil-Gewebe des Relays
//!
//! Der EventBroadcaster verwaltet die Send-Queues aller angehaengten
//! Verbindungen und stellt die drei Zustellprimitive bereit, auf denen
//! alle anderen Komponenten aufbauen.
//!
//! ## Zustellprimitive
//! - An eine Verbindung: `an_verbindung_senden` (Unicast)
//! - An alle: `an_alle_senden`
//! - An alle ausser den Ausloeser: `an_alle_ausser_senden`
//!
//! Alle Zustellungen sind Feuern-und-Vergessen: keine Bestaetigung, keine
//! Zustellgarantie. "Angehaengt" wird zum Zustellzeitpunkt ausgewertet –
//! es gibt keinen transaktionalen Schnappschuss ueber den Fan-out hinweg.
//! Ein Unicast an eine inzwischen getrennte Verbindung wird still
//! verworfen; das ist ein inhaerentes Rennen, kein Fehler.

use dashmap::DashMap;
use plausch_core::types::ConnectionId;
use plausch_protocol::event::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Verbindung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer angehaengten Verbindung
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    pub tx: mpsc::Sender<ServerEvent>,
}

impl ClientSender {
    /// Reiht ein Ereignis nicht-blockierend in die Queue der Verbindung ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, ereignis: ServerEvent) -> bool {
        match self.tx.try_send(ereignis) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    "Send-Queue voll – Ereignis verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Send-Queue geschlossen (Verbindung getrennt)"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle angehaengten Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

struct EventBroadcasterInner {
    /// Send-Queues, indiziert nach ConnectionId
    verbindungen: DashMap<ConnectionId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(EventBroadcasterInner {
                verbindungen: DashMap::new(),
            }),
        }
    }

    /// Haengt eine neue Verbindung an und gibt ihre Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    /// Das Anhaengen passiert beim Socket-Accept, nicht erst beim Join –
    /// auch eine noch nicht beigetretene Verbindung muss Fehlermeldungen
    /// empfangen koennen.
    pub fn verbindung_registrieren(&self, connection_id: ConnectionId) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let sender = ClientSender { connection_id, tx };
        self.inner.verbindungen.insert(connection_id, sender);
        tracing::debug!(connection_id = %connection_id, "Verbindung im Broadcaster angehaengt");
        rx
    }

    /// Entfernt eine Verbindung aus dem Broadcaster
    pub fn verbindung_entfernen(&self, connection_id: &ConnectionId) {
        self.inner.verbindungen.remove(connection_id);
        tracing::debug!(connection_id = %connection_id, "Verbindung aus Broadcaster entfernt");
    }

    /// Sendet ein Ereignis an eine einzelne Verbindung (Unicast)
    ///
    /// Gibt `true` zurueck wenn die Verbindung angehaengt war und das
    /// Ereignis eingereiht wurde.
    pub fn an_verbindung_senden(&self, connection_id: &ConnectionId, ereignis: ServerEvent) -> bool {
        match self.inner.verbindungen.get(connection_id) {
            Some(sender) => sender.senden(ereignis),
            None => {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Unicast an nicht angehaengte Verbindung verworfen"
                );
                false
            }
        }
    }

    /// Sendet ein Ereignis an alle angehaengten Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Einreihungen zurueck.
    pub fn an_alle_senden(&self, ereignis: ServerEvent) -> usize {
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|entry| {
            if entry.value().senden(ereignis.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Sendet ein Ereignis an alle angehaengten Verbindungen ausser einer
    ///
    /// Nuetzlich um Join/Leave/Typing-Ereignisse zu verteilen ohne den
    /// Ausloeser selbst zu informieren.
    pub fn an_alle_ausser_senden(
        &self,
        ausgeschlossen: &ConnectionId,
        ereignis: ServerEvent,
    ) -> usize {
        let mut gesendet = 0;
        self.inner.verbindungen.iter().for_each(|entry| {
            if entry.key() == ausgeschlossen {
                return;
            }
            if entry.value().senden(ereignis.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }

    /// Gibt die Anzahl der angehaengten Verbindungen zurueck
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Prueft ob eine Verbindung angehaengt ist
    pub fn ist_angehaengt(&self, connection_id: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(connection_id)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
