//! Gemeinsamer Server-Zustand fuer das Relay
//!
//! Haelt alle geteilten Komponenten als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen, und verdrahtet beim
//! Aufbau die Registry-Listener: Anruf-Koordinator und Presence-Melder
//! haengen am Trennungs-Pfad der Registry, ohne dass die Registry von
//! ihnen weiss.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::broadcast::EventBroadcaster;
use crate::calls::AnrufKoordinator;
use crate::history::{MessageLog, STANDARD_KAPAZITAET};
use crate::presence::PresenceMelder;
use crate::registry::{ConnectionRegistry, RegistryEvent};

/// Konfiguration fuer das Relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitig angehaengte Verbindungen
    pub max_clients: u32,
    /// Kapazitaet des Nachrichten-Logs
    pub nachrichten_kapazitaet: usize,
    /// Frist zwischen Trennung und physischer Entfernung aus der Registry
    pub bereinigungs_frist: Duration,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Frame-Groesse in Bytes
    pub max_frame_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server_name: "Plausch Server".to_string(),
            max_clients: 256,
            nachrichten_kapazitaet: STANDARD_KAPAZITAET,
            bereinigungs_frist: Duration::from_secs(60),
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: plausch_protocol::wire::DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
///
/// Alle Komponenten sind billig klonbare Handles auf denselben inneren
/// Zustand.
pub struct RelayState {
    /// Relay-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Verbindungs-Registry (wer ist bekannt, wer ist online)
    pub registry: ConnectionRegistry,
    /// Verteil-Gewebe (Unicast + Broadcasts)
    pub broadcaster: EventBroadcaster,
    /// Begrenztes Nachrichten-Log
    pub log: MessageLog,
    /// Anruf-Koordinator (Live-Tabelle + Zustandsmaschine)
    pub koordinator: AnrufKoordinator,
    /// Presence-Melder (Beitritt/Austritt/Tippen)
    pub melder: PresenceMelder,
    /// Startzeitpunkt des Servers (fuer Uptime-Berechnung)
    pub start_time: Instant,
}

impl RelayState {
    /// Erstellt einen neuen RelayState und verdrahtet die Listener
    pub fn neu(config: RelayConfig, shutdown_rx: watch::Receiver<bool>) -> Arc<Self> {
        let registry = ConnectionRegistry::neu(config.bereinigungs_frist, shutdown_rx);
        let broadcaster = EventBroadcaster::neu();
        let log = MessageLog::neu(registry.clone(), config.nachrichten_kapazitaet);
        let koordinator = AnrufKoordinator::neu(registry.clone(), broadcaster.clone());
        let melder = PresenceMelder::neu(registry.clone(), log.clone(), broadcaster.clone());

        // Trennungs-Pfad: erst laufende Anrufe beenden, dann den Austritt
        // melden. Der Roster-Refresh folgt nach der Bereinigung.
        {
            let koordinator = koordinator.clone();
            let melder = melder.clone();
            registry.listener_registrieren(move |ereignis| match ereignis {
                RegistryEvent::OfflineMarkiert { verbindung } => {
                    koordinator.verbindung_getrennt(&verbindung.id);
                    melder.austritt_melden(verbindung);
                }
                RegistryEvent::Bereinigt { .. } => {
                    melder.bereinigung_melden();
                }
            });
        }

        Arc::new(Self {
            config: Arc::new(config),
            registry,
            broadcaster,
            log,
            koordinator,
            melder,
            start_time: Instant::now(),
        })
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
