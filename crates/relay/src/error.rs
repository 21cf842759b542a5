//! Fehlertypen fuer das Relay
//!
//! Die Taxonomie folgt den drei Faellen die tatsaechlich beim Ausloeser
//! landen. Veraltete Anruf-Token (respond/end/relay nach Eviction) sind
//! KEIN Fehler: sie sind erwartbare Rennen zwischen Trennung und
//! unterwegs befindlicher Signalisierung und werden still ignoriert.

use plausch_core::types::ConnectionId;
use thiserror::Error;

/// Fehlertyp fuer das Relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Benutzername verletzt Laengen- oder Zeichenregel
    #[error("Ungueltiger Benutzername: {0}")]
    Validierung(String),

    /// Ereignis von einer Verbindung die der Registry nicht bekannt ist
    #[error("Unbekannte Verbindung: {0}")]
    NichtRegistriert(ConnectionId),

    /// Operation abgelehnt (z.B. Anrufziel nicht online)
    #[error("Abgelehnt: {0}")]
    Abgelehnt(String),

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

/// Result-Typ fuer das Relay
pub type RelayResult<T> = Result<T, RelayError>;
