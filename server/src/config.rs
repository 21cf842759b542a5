//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use plausch_core::PlauschError;
use plausch_relay::RelayConfig;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Einstellungen (Log, Bereinigung, Keepalive)
    pub relay: RelayEinstellungen,
    /// Blob-Store-Einstellungen (Medien-Uploads)
    pub blob: BlobEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Clients
    pub max_clients: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Plausch Server".into(),
            max_clients: 256,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer die TCP-Verbindung (Relay-Protokoll)
    pub bind_adresse: String,
    /// Port fuer die TCP-Verbindung
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 3000,
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Kapazitaet des Nachrichten-Logs
    pub nachrichten_kapazitaet: usize,
    /// Frist zwischen Trennung und Entfernung aus der Registry (Sekunden)
    pub bereinigungs_frist_sek: u64,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            nachrichten_kapazitaet: 100,
            bereinigungs_frist_sek: 60,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: 1024 * 1024,
        }
    }
}

/// Blob-Store-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobEinstellungen {
    /// Wurzelverzeichnis fuer Medien-Uploads
    pub upload_verzeichnis: String,
}

impl Default for BlobEinstellungen {
    fn default() -> Self {
        Self {
            upload_verzeichnis: "data/uploads".into(),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level (trace, debug, info, warn, error)
    pub level: String,
    /// Ausgabeformat: "text" oder "json"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei
    ///
    /// Fehlt die Datei, gelten die Standardwerte. Eine vorhandene aber
    /// ungueltige Datei ist ein harter Fehler.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: ServerConfig = toml::from_str(&inhalt).map_err(|e| {
                    PlauschError::Konfiguration(format!("{}: {}", pfad, e))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(pfad = %pfad, "Keine Konfigurationsdatei – Standardwerte");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Gibt die TCP-Bind-Adresse als "host:port" zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Baut die RelayConfig aus den Einstellungen
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            server_name: self.server.name.clone(),
            max_clients: self.server.max_clients,
            nachrichten_kapazitaet: self.relay.nachrichten_kapazitaet,
            bereinigungs_frist: Duration::from_secs(self.relay.bereinigungs_frist_sek),
            keepalive_sek: self.relay.keepalive_sek,
            verbindungs_timeout_sek: self.relay.verbindungs_timeout_sek,
            max_frame_groesse: self.relay.max_frame_groesse,
        }
    }
}
