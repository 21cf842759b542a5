//! Relay-Protokoll (TCP)
//!
//! Definiert alle Ereignisse die ueber die persistente Verbindung
//! zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Feuern-und-Vergessen: Ereignisse tragen keine Request-IDs, der
//!   Server antwortet mit eigenen Ereignissen (oder gar nicht)
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enums fuer typsichere Ereignisarten

use chrono::{DateTime, Utc};
use plausch_core::types::{
    AnrufModus, CallId, ConnectionId, NachrichtenArt, OnlineStatus, SignalArt,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire-DTOs
// ---------------------------------------------------------------------------

/// Medien-Verweis einer Nachricht
///
/// Zeigt auf eine Datei im Blob-Store. Das Relay transportiert nur den
/// Verweis, nie die Medien-Bytes selbst.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedienInfo {
    pub url: String,
    pub original_name: String,
    pub size_bytes: u64,
}

/// Eine Chat-Nachricht wie sie im Log liegt und ueber die Leitung geht
///
/// Username und Avatar sind denormalisiert: auch wenn der Absender sich
/// laengst getrennt hat, bleibt die Nachricht vollstaendig darstellbar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatNachricht {
    /// Monoton steigende ID, eindeutig fuer die Prozesslaufzeit
    pub id: u64,
    /// Absender (schwache Referenz – kann bereits getrennt sein)
    pub sender_id: ConnectionId,
    pub username: String,
    pub avatar: Option<String>,
    pub kind: NachrichtenArt,
    /// Text-Inhalt, darf bei Medien-Arten leer sein
    pub body: String,
    /// Vorhanden genau dann wenn `kind` keine Text-Nachricht ist
    pub media: Option<MedienInfo>,
    /// Vorformatierter Anzeige-Zeitstempel (HH:MM)
    pub timestamp: String,
    pub sent_at: DateTime<Utc>,
}

/// Roster-Eintrag einer bekannten Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenutzerInfo {
    pub connection_id: ConnectionId,
    pub username: String,
    pub avatar: Option<String>,
    pub status: OnlineStatus,
    pub joined_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Client -> Server Anfragen
// ---------------------------------------------------------------------------

/// Beitritt zum Chat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Benutzername (1-20 Zeichen, Buchstaben/Ziffern/Unterstrich/Leerzeichen)
    pub username: String,
    /// Avatar-Verweis (URL oder Data-URI, fuer das Relay opak)
    pub avatar: Option<String>,
}

/// Nachricht senden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub kind: NachrichtenArt,
    pub body: Option<String>,
    pub media: Option<MedienInfo>,
}

/// Anruf initiieren
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInitiateRequest {
    pub target_id: ConnectionId,
    pub mode: AnrufModus,
}

/// Auf einen eingehenden Anruf antworten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRespondRequest {
    pub call_id: CallId,
    pub accepted: bool,
}

/// Anruf beenden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndRequest {
    pub call_id: CallId,
}

/// WebRTC-Signalisierung weiterleiten
///
/// Offer, Answer und ICE-Kandidaten teilen sich diese eine Operation;
/// `payload` ist fuer das Relay opak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRelayRequest {
    pub kind: SignalArt,
    pub call_id: CallId,
    pub destination_id: ConnectionId,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Server -> Client Benachrichtigungen
// ---------------------------------------------------------------------------

/// Vollstaendiger Roster nach Beitritt, Austritt oder Bereinigung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterUpdate {
    pub users: Vec<BenutzerInfo>,
}

/// Nachrichten-Verlauf fuer neu beigetretene Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBootstrap {
    pub messages: Vec<ChatNachricht>,
}

/// Ein Benutzer ist beigetreten (geht an alle anderen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserJoinedNotice {
    pub username: String,
    pub avatar: Option<String>,
    pub message: String,
    /// Vorformatierter Anzeige-Zeitstempel (HH:MM)
    pub timestamp: String,
}

/// Ein Benutzer hat den Chat verlassen (geht an alle anderen)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLeftNotice {
    pub username: String,
    pub message: String,
    pub timestamp: String,
}

/// Tipp-Indikator eines anderen Benutzers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingNotice {
    pub connection_id: ConnectionId,
    pub username: String,
    pub is_typing: bool,
}

/// Eingehender Anruf (geht nur an das Ziel)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingCallNotice {
    pub call_id: CallId,
    pub caller_id: ConnectionId,
    pub caller_name: String,
    pub caller_avatar: Option<String>,
    pub mode: AnrufModus,
}

/// Bestaetigung an den Anrufer dass der Anruf klingelt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInitiatedNotice {
    pub call_id: CallId,
    pub target_id: ConnectionId,
}

/// Anruf-Zustandswechsel (angenommen/abgelehnt)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatusNotice {
    pub call_id: CallId,
}

/// Anruf beendet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEndedNotice {
    pub call_id: CallId,
    /// Grund, z.B. "peer-disconnected"; fehlt bei regulaerem Auflegen
    pub reason: Option<String>,
}

/// Weitergeleitetes WebRTC-Signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalNotice {
    pub kind: SignalArt,
    pub call_id: CallId,
    pub sender_id: ConnectionId,
    pub payload: serde_json::Value,
}

/// Fehlermeldung an den Ausloeser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingNachricht {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongNachricht {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enums: ClientEvent / ServerEvent
// ---------------------------------------------------------------------------

/// Alle moeglichen Client-Ereignisse (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    // Praesenz
    Join(JoinRequest),
    TypingStart,
    TypingStop,

    // Chat
    SendMessage(SendMessageRequest),

    // Anrufe
    InitiateCall(CallInitiateRequest),
    RespondToCall(CallRespondRequest),
    EndCall(CallEndRequest),
    RelaySignal(SignalRelayRequest),

    // Keepalive
    Ping(PingNachricht),
    Pong(PongNachricht),
}

/// Alle moeglichen Server-Ereignisse (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    // Praesenz
    RosterUpdated(RosterUpdate),
    HistoryBootstrap(HistoryBootstrap),
    UserJoined(UserJoinedNotice),
    UserLeft(UserLeftNotice),
    TypingChanged(TypingNotice),

    // Chat
    MessagePosted(ChatNachricht),

    // Anrufe
    IncomingCall(IncomingCallNotice),
    CallInitiated(CallInitiatedNotice),
    CallAccepted(CallStatusNotice),
    CallDeclined(CallStatusNotice),
    CallEnded(CallEndedNotice),
    SignalRelayed(SignalNotice),

    // Fehler
    ErrorNotice(ErrorNotice),

    // Keepalive
    Ping(PingNachricht),
    Pong(PongNachricht),
}

impl ServerEvent {
    /// Erstellt eine Fehlermeldung
    pub fn fehler(message: impl Into<String>) -> Self {
        Self::ErrorNotice(ErrorNotice {
            message: message.into(),
        })
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(timestamp_ms: u64) -> Self {
        Self::Ping(PingNachricht { timestamp_ms })
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::Pong(PongNachricht {
            echo_timestamp_ms,
            server_timestamp_ms,
        })
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl ClientEvent {
    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_serialisierung() {
        let ev = ClientEvent::Join(JoinRequest {
            username: "testuser".to_string(),
            avatar: Some("data:image/png;base64,AAAA".to_string()),
        });
        let json = ev.to_json().unwrap();
        assert!(json.contains("\"type\":\"join\""));
        let decoded = ClientEvent::from_json(&json).unwrap();
        if let ClientEvent::Join(j) = decoded {
            assert_eq!(j.username, "testuser");
        } else {
            panic!("Erwartet Join-Ereignis");
        }
    }

    #[test]
    fn send_message_mit_medien() {
        let ev = ClientEvent::SendMessage(SendMessageRequest {
            kind: NachrichtenArt::Bild,
            body: None,
            media: Some(MedienInfo {
                url: "/uploads/images/abc.png".to_string(),
                original_name: "urlaub.png".to_string(),
                size_bytes: 12345,
            }),
        });
        let json = ev.to_json().unwrap();
        assert!(json.contains("\"kind\":\"image\""));
        let decoded = ClientEvent::from_json(&json).unwrap();
        if let ClientEvent::SendMessage(m) = decoded {
            assert_eq!(m.media.unwrap().size_bytes, 12345);
        } else {
            panic!("Erwartet SendMessage-Ereignis");
        }
    }

    #[test]
    fn typing_start_ohne_payload() {
        let json = ClientEvent::TypingStart.to_json().unwrap();
        assert_eq!(json, "{\"type\":\"typing_start\"}");
        let decoded = ClientEvent::from_json(&json).unwrap();
        assert!(matches!(decoded, ClientEvent::TypingStart));
    }

    #[test]
    fn relay_signal_opaker_payload() {
        let ev = ClientEvent::RelaySignal(SignalRelayRequest {
            kind: SignalArt::Offer,
            call_id: CallId::new(),
            destination_id: ConnectionId::new(),
            payload: serde_json::json!({"sdp": "v=0...", "type": "offer"}),
        });
        let json = ev.to_json().unwrap();
        let decoded = ClientEvent::from_json(&json).unwrap();
        if let ClientEvent::RelaySignal(s) = decoded {
            assert_eq!(s.kind, SignalArt::Offer);
            assert_eq!(s.payload["sdp"], "v=0...");
        } else {
            panic!("Erwartet RelaySignal-Ereignis");
        }
    }

    #[test]
    fn call_ended_mit_grund() {
        let ev = ServerEvent::CallEnded(CallEndedNotice {
            call_id: CallId::new(),
            reason: Some("peer-disconnected".to_string()),
        });
        let json = ev.to_json().unwrap();
        assert!(json.contains("\"type\":\"call_ended\""));
        assert!(json.contains("peer-disconnected"));
        let decoded = ServerEvent::from_json(&json).unwrap();
        assert!(matches!(decoded, ServerEvent::CallEnded(_)));
    }

    #[test]
    fn error_notice_konstruktor() {
        let ev = ServerEvent::fehler("Unbekannte Verbindung");
        if let ServerEvent::ErrorNotice(e) = &ev {
            assert_eq!(e.message, "Unbekannte Verbindung");
        } else {
            panic!("Erwartet ErrorNotice");
        }
        let json = ev.to_json().unwrap();
        assert!(json.contains("\"type\":\"error_notice\""));
    }

    #[test]
    fn ping_pong_serialisierung() {
        let ping = ServerEvent::ping(1234567890);
        let json = ping.to_json().unwrap();
        let decoded = ServerEvent::from_json(&json).unwrap();
        if let ServerEvent::Ping(p) = decoded {
            assert_eq!(p.timestamp_ms, 1234567890);
        } else {
            panic!("Erwartet Ping-Ereignis");
        }
    }

    #[test]
    fn chat_nachricht_round_trip() {
        let nachricht = ChatNachricht {
            id: 7,
            sender_id: ConnectionId::new(),
            username: "anna".to_string(),
            avatar: None,
            kind: NachrichtenArt::Text,
            body: "Hallo zusammen".to_string(),
            media: None,
            timestamp: "14:05".to_string(),
            sent_at: Utc::now(),
        };
        let ev = ServerEvent::MessagePosted(nachricht);
        let json = ev.to_json().unwrap();
        let decoded = ServerEvent::from_json(&json).unwrap();
        if let ServerEvent::MessagePosted(n) = decoded {
            assert_eq!(n.id, 7);
            assert_eq!(n.body, "Hallo zusammen");
            assert_eq!(n.timestamp, "14:05");
        } else {
            panic!("Erwartet MessagePosted-Ereignis");
        }
    }

    #[test]
    fn roster_update_round_trip() {
        let ev = ServerEvent::RosterUpdated(RosterUpdate {
            users: vec![BenutzerInfo {
                connection_id: ConnectionId::new(),
                username: "bernd".to_string(),
                avatar: None,
                status: OnlineStatus::Offline,
                joined_at: Utc::now(),
                last_seen_at: Utc::now(),
            }],
        });
        let json = ev.to_json().unwrap();
        assert!(json.contains("\"status\":\"offline\""));
        let decoded = ServerEvent::from_json(&json).unwrap();
        if let ServerEvent::RosterUpdated(r) = decoded {
            assert_eq!(r.users.len(), 1);
        } else {
            panic!("Erwartet RosterUpdated-Ereignis");
        }
    }
}
