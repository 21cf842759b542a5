//! Gemeinsame Identifikations- und Domaenentypen fuer Plausch
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Die Art-Enums
//! sind geschlossen: jede Konsumstelle matcht erschoepfend, eine
//! unbehandelte Art kann keinen Client erreichen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird beim Socket-Accept vergeben und innerhalb einer Prozesslaufzeit
/// nie wiederverwendet. Jeder Socket bekommt eine frische ID – eine
/// Reconnect-Verbindung ist eine neue Verbindung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Eindeutiges Anruf-Token
///
/// Identifiziert eine Anruf-Verhandlung von `ringing` bis `ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub Uuid);

impl CallId {
    /// Erstellt eine neue zufaellige CallId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call:{}", self.0)
    }
}

/// Online-Status einer Verbindung
///
/// Eine getrennte Verbindung wird zunaechst nur auf `Offline` gesetzt und
/// erst nach Ablauf der Bereinigungsfrist aus der Registry entfernt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Offline,
}

/// Art einer Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenArt {
    Text,
    #[serde(rename = "image")]
    Bild,
    Video,
    #[serde(rename = "voice")]
    Sprache,
}

impl NachrichtenArt {
    /// Gibt true zurueck wenn die Nachricht einen Medien-Verweis traegt
    pub fn ist_medien(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Modus eines Anrufs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnrufModus {
    Voice,
    Video,
}

/// Zustand eines Anrufs
///
/// `Abgelehnt` und `Beendet` sind terminal: der Anruf-Eintrag wird beim
/// Eintritt sofort aus der Live-Tabelle entfernt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnrufZustand {
    #[serde(rename = "ringing")]
    Klingelt,
    #[serde(rename = "accepted")]
    Angenommen,
    #[serde(rename = "declined")]
    Abgelehnt,
    #[serde(rename = "ended")]
    Beendet,
}

impl AnrufZustand {
    /// Gibt true zurueck wenn der Zustand terminal ist
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Abgelehnt | Self::Beendet)
    }
}

/// Art eines WebRTC-Signalisierungs-Payloads
///
/// Alle drei Arten laufen ueber dieselbe Relay-Operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalArt {
    Offer,
    Answer,
    #[serde(rename = "ice")]
    IceKandidat,
}
