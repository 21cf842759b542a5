//! plausch-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und verdrahtet beim Start alle
//! Subsysteme: Relay-Zustand samt Registry-Listenern, TCP-Listener und
//! die Upload-Verzeichnisse des Blob-Stores.

pub mod config;

use anyhow::Result;
use std::path::Path;
use tokio::sync::watch;

use config::ServerConfig;
use plausch_blob::BlobArt;
use plausch_relay::{RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Upload-Verzeichnisse des Blob-Stores anlegen
    /// 2. Relay-Zustand aufbauen (Registry-Listener verdrahten)
    /// 3. TCP-Listener starten (Relay-Protokoll)
    /// 4. Auf Ctrl-C / SIGTERM warten, dann Shutdown signalisieren
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            "Server startet"
        );

        // Upload-Verzeichnisse anlegen (Wurzel + ein Ordner pro Medien-Art)
        let wurzel = Path::new(&self.config.blob.upload_verzeichnis);
        for art in [BlobArt::Profil, BlobArt::Bild, BlobArt::Video, BlobArt::Sprache] {
            let verzeichnis = wurzel.join(art.unterordner());
            tokio::fs::create_dir_all(&verzeichnis).await?;
        }
        tracing::info!(
            verzeichnis = %wurzel.display(),
            "Upload-Verzeichnisse bereit"
        );

        // Shutdown-Kanal: ein Signal fuer Listener, Verbindungs-Tasks
        // und die Bereinigungs-Tasks der Registry
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Relay-Zustand aufbauen und verdrahten
        let state = RelayState::neu(self.config.relay_config(), shutdown_rx.clone());

        // TCP-Listener starten
        let bind_addr = self.config.tcp_bind_adresse().parse()?;
        let relay_server = RelayServer::neu(state, bind_addr);
        let listener_task = tokio::spawn(relay_server.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;

        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        let _ = shutdown_tx.send(true);
        let _ = listener_task.await;

        Ok(())
    }
}
