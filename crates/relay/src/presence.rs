//! Presence-Melder – Reagiert auf Registry-Mutationen mit Fan-out
//!
//! Reine Reaktionsschicht ohne eigenen Zustand: uebersetzt Beitritt,
//! Austritt, Bereinigung und Tipp-Indikatoren in Ereignisse und schiebt
//! sie durch den EventBroadcaster. Tipp-Indikatoren werden unveraendert
//! durchgereicht – der Server puffert und entprellt nicht, das macht
//! (wenn ueberhaupt) der sendende Client.

use chrono::Utc;
use plausch_protocol::event::{
    BenutzerInfo, HistoryBootstrap, RosterUpdate, ServerEvent, TypingNotice, UserJoinedNotice,
    UserLeftNotice,
};

use crate::broadcast::EventBroadcaster;
use crate::history::MessageLog;
use crate::registry::{ConnectionRegistry, Verbindung};

/// Konvertiert einen Registry-Record in den Wire-Roster-Eintrag
pub fn benutzer_info_aus_verbindung(v: &Verbindung) -> BenutzerInfo {
    BenutzerInfo {
        connection_id: v.id,
        username: v.username.clone(),
        avatar: v.avatar.clone(),
        status: v.status,
        joined_at: v.joined_at,
        last_seen_at: v.last_seen_at,
    }
}

/// Vorformatierter Anzeige-Zeitstempel (HH:MM)
fn uhrzeit_jetzt() -> String {
    Utc::now().format("%H:%M").to_string()
}

/// Meldet Praesenz-Aenderungen an alle relevanten Verbindungen
#[derive(Clone)]
pub struct PresenceMelder {
    registry: ConnectionRegistry,
    log: MessageLog,
    broadcaster: EventBroadcaster,
}

impl PresenceMelder {
    /// Erstellt einen neuen PresenceMelder
    pub fn neu(
        registry: ConnectionRegistry,
        log: MessageLog,
        broadcaster: EventBroadcaster,
    ) -> Self {
        Self {
            registry,
            log,
            broadcaster,
        }
    }

    /// Meldet den Beitritt einer frisch registrierten Verbindung
    ///
    /// Reihenfolge wie im Beitrittspfad ueblich: erst erfahren die
    /// anderen vom Neuzugang, dann bekommt der Neuzugang Roster und
    /// Verlauf zum Aufbau seiner Sicht, zuletzt geht der aktualisierte
    /// Roster an alle.
    pub fn beitritt_melden(&self, verbindung: &Verbindung) {
        self.broadcaster.an_alle_ausser_senden(
            &verbindung.id,
            ServerEvent::UserJoined(UserJoinedNotice {
                username: verbindung.username.clone(),
                avatar: verbindung.avatar.clone(),
                message: format!("{} ist dem Chat beigetreten!", verbindung.username),
                timestamp: uhrzeit_jetzt(),
            }),
        );

        self.broadcaster.an_verbindung_senden(
            &verbindung.id,
            ServerEvent::RosterUpdated(self.roster()),
        );
        self.broadcaster.an_verbindung_senden(
            &verbindung.id,
            ServerEvent::HistoryBootstrap(HistoryBootstrap {
                messages: self.log.verlauf(),
            }),
        );

        self.broadcaster
            .an_alle_senden(ServerEvent::RosterUpdated(self.roster()));

        tracing::debug!(
            connection_id = %verbindung.id,
            username = %verbindung.username,
            "Beitritt gemeldet"
        );
    }

    /// Meldet den Austritt einer offline markierten Verbindung
    ///
    /// Der Roster geht bewusst NICHT sofort raus: die Verbindung bleibt
    /// bis zur Bereinigung als offline im Roster sichtbar, der
    /// aktualisierte Roster folgt erst mit `bereinigung_melden`.
    pub fn austritt_melden(&self, verbindung: &Verbindung) {
        self.broadcaster.an_alle_ausser_senden(
            &verbindung.id,
            ServerEvent::UserLeft(UserLeftNotice {
                username: verbindung.username.clone(),
                message: format!("{} hat den Chat verlassen", verbindung.username),
                timestamp: uhrzeit_jetzt(),
            }),
        );

        tracing::debug!(
            connection_id = %verbindung.id,
            username = %verbindung.username,
            "Austritt gemeldet"
        );
    }

    /// Meldet die physische Entfernung einer Verbindung (Roster-Refresh)
    pub fn bereinigung_melden(&self) {
        self.broadcaster
            .an_alle_senden(ServerEvent::RosterUpdated(self.roster()));
    }

    /// Reicht einen Tipp-Indikator an alle anderen durch
    pub fn tippen_melden(&self, verbindung: &Verbindung, is_typing: bool) {
        self.broadcaster.an_alle_ausser_senden(
            &verbindung.id,
            ServerEvent::TypingChanged(TypingNotice {
                connection_id: verbindung.id,
                username: verbindung.username.clone(),
                is_typing,
            }),
        );
    }

    /// Baut den aktuellen Roster in Einfuege-Reihenfolge
    fn roster(&self) -> RosterUpdate {
        RosterUpdate {
            users: self
                .registry
                .schnappschuss()
                .iter()
                .map(benutzer_info_aus_verbindung)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
