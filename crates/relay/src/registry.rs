//! Verbindungs-Registry – Wer ist bekannt, wer ist online
//!
//! Die Registry ist die alleinige Eigentuemerin aller Verbindungs-Records.
//! Andere Komponenten lesen Records nur ueber die ID. Eine getrennte
//! Verbindung wird zunaechst auf offline gesetzt und erst nach Ablauf der
//! Bereinigungsfrist physisch entfernt; der Bereinigungs-Task gehoert dem
//! jeweiligen Eintrag und wird nur durch den Prozess-Shutdown abgebrochen.
//! Ein Reconnect bricht ihn NICHT ab – jeder Socket bekommt eine frische
//! ConnectionId.
//!
//! ## Listener statt Abhaengigkeitszyklus
//! Der Trennungs-Pfad muss den Anruf-Koordinator und den Presence-Melder
//! anstossen, ohne dass die Registry von ihnen abhaengt. Dafuer werden
//! beim Verdrahten Listener registriert, die bei `OfflineMarkiert` und
//! `Bereinigt` synchron aufgerufen werden.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use plausch_core::types::{ConnectionId, OnlineStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{RelayError, RelayResult};

// ---------------------------------------------------------------------------
// Benutzername-Regeln
// ---------------------------------------------------------------------------

/// Minimale Benutzername-Laenge in Zeichen
pub const USERNAME_MIN_ZEICHEN: usize = 2;

/// Maximale Benutzername-Laenge in Zeichen
pub const USERNAME_MAX_ZEICHEN: usize = 20;

/// Prueft einen Benutzernamen gegen Laengen- und Zeichenregel
///
/// Erlaubt sind Buchstaben, Ziffern, Unterstrich und Leerzeichen. Die
/// Pruefung passiert hier in der Registry – dem Aufrufer wird nie
/// vertraut, auch wenn die Boundary bereits validiert hat.
pub fn benutzername_pruefen(username: &str) -> RelayResult<()> {
    let zeichen = username.chars().count();
    if zeichen < USERNAME_MIN_ZEICHEN {
        return Err(RelayError::Validierung(format!(
            "zu kurz ({} Zeichen, Minimum: {})",
            zeichen, USERNAME_MIN_ZEICHEN
        )));
    }
    if zeichen > USERNAME_MAX_ZEICHEN {
        return Err(RelayError::Validierung(format!(
            "zu lang ({} Zeichen, Maximum: {})",
            zeichen, USERNAME_MAX_ZEICHEN
        )));
    }
    if let Some(unerlaubt) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == ' '))
    {
        return Err(RelayError::Validierung(format!(
            "unerlaubtes Zeichen '{}'",
            unerlaubt
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Record einer bekannten Verbindung
#[derive(Debug, Clone)]
pub struct Verbindung {
    pub id: ConnectionId,
    pub username: String,
    pub avatar: Option<String>,
    pub status: OnlineStatus,
    pub joined_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Registry-Ereignisse
// ---------------------------------------------------------------------------

/// Ereignisse die die Registry an ihre Listener meldet
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// Verbindung wurde erstmals auf offline gesetzt (Trennung)
    OfflineMarkiert { verbindung: Verbindung },
    /// Verbindung wurde nach Ablauf der Frist physisch entfernt
    Bereinigt { connection_id: ConnectionId },
}

type RegistryListener = Box<dyn Fn(&RegistryEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Verwaltet alle bekannten Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone des Handles teilt den inneren
/// Zustand. Die Einfuege-Reihenfolge wird separat gefuehrt, damit
/// `schnappschuss()` sie garantieren kann (jede Anzeige-Sortierung ist
/// Sache der Clients).
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Alle bekannten Verbindungen, indiziert nach ConnectionId
    verbindungen: DashMap<ConnectionId, Verbindung>,
    /// Einfuege-Reihenfolge fuer den Schnappschuss
    reihenfolge: Mutex<Vec<ConnectionId>>,
    /// Registrierte Ereignis-Listener
    listener: Mutex<Vec<RegistryListener>>,
    /// Frist zwischen Offline-Markierung und physischer Entfernung
    bereinigungs_frist: Duration,
    /// Shutdown-Signal – einziger Abbruchweg fuer Bereinigungs-Tasks
    shutdown_rx: watch::Receiver<bool>,
}

impl ConnectionRegistry {
    /// Erstellt eine neue ConnectionRegistry
    pub fn neu(bereinigungs_frist: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                verbindungen: DashMap::new(),
                reihenfolge: Mutex::new(Vec::new()),
                listener: Mutex::new(Vec::new()),
                bereinigungs_frist,
                shutdown_rx,
            }),
        }
    }

    /// Registriert einen Ereignis-Listener
    ///
    /// Listener werden synchron aus dem jeweils mutierenden Pfad
    /// aufgerufen und duerfen nicht blockieren.
    pub fn listener_registrieren(&self, f: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        self.inner.listener.lock().push(Box::new(f));
    }

    /// Registriert eine Verbindung als online
    ///
    /// Der Benutzername wird hier erneut geprueft; bei Verstoss wird
    /// nichts mutiert. Ein erneuter Join derselben Verbindung
    /// aktualisiert den bestehenden Record in-place.
    pub fn registrieren(
        &self,
        id: ConnectionId,
        username: &str,
        avatar: Option<String>,
    ) -> RelayResult<Verbindung> {
        benutzername_pruefen(username)?;

        let jetzt = Utc::now();
        let verbindung = match self.inner.verbindungen.get_mut(&id) {
            Some(mut bestehend) => {
                bestehend.username = username.to_string();
                bestehend.avatar = avatar;
                bestehend.status = OnlineStatus::Online;
                bestehend.last_seen_at = jetzt;
                bestehend.clone()
            }
            None => {
                let neu = Verbindung {
                    id,
                    username: username.to_string(),
                    avatar,
                    status: OnlineStatus::Online,
                    joined_at: jetzt,
                    last_seen_at: jetzt,
                };
                self.inner.verbindungen.insert(id, neu.clone());
                self.inner.reihenfolge.lock().push(id);
                neu
            }
        };

        tracing::info!(
            connection_id = %id,
            username = %verbindung.username,
            "Verbindung registriert"
        );
        Ok(verbindung)
    }

    /// Markiert eine Verbindung als offline
    ///
    /// Stempelt `last_seen_at`, meldet `OfflineMarkiert` und plant die
    /// Bereinigung. Idempotent: nur der erste Aufruf hat Wirkung und nur
    /// er gibt `true` zurueck.
    pub fn offline_markieren(&self, id: &ConnectionId) -> bool {
        let verbindung = {
            let mut eintrag = match self.inner.verbindungen.get_mut(id) {
                Some(e) => e,
                None => return false,
            };
            if eintrag.status == OnlineStatus::Offline {
                return false;
            }
            eintrag.status = OnlineStatus::Offline;
            eintrag.last_seen_at = Utc::now();
            eintrag.clone()
        };

        tracing::info!(
            connection_id = %id,
            username = %verbindung.username,
            "Verbindung offline markiert"
        );

        self.ereignis_melden(&RegistryEvent::OfflineMarkiert {
            verbindung: verbindung.clone(),
        });
        self.bereinigung_planen(*id);
        true
    }

    /// Entfernt eine Verbindung physisch aus der Registry
    ///
    /// Nach Ablauf der Frist bedingungslos – Identifier sind pro Socket,
    /// ein Reconnect unter derselben ID kann nicht vorkommen.
    pub fn bereinigen(&self, id: &ConnectionId) {
        if self.inner.verbindungen.remove(id).is_none() {
            return;
        }
        self.inner.reihenfolge.lock().retain(|eintrag| eintrag != id);

        tracing::debug!(connection_id = %id, "Verbindung bereinigt");
        self.ereignis_melden(&RegistryEvent::Bereinigt { connection_id: *id });
    }

    /// Gibt alle bekannten Verbindungen in Einfuege-Reihenfolge zurueck
    pub fn schnappschuss(&self) -> Vec<Verbindung> {
        let reihenfolge = self.inner.reihenfolge.lock();
        reihenfolge
            .iter()
            .filter_map(|id| self.inner.verbindungen.get(id).map(|e| e.clone()))
            .collect()
    }

    /// Gibt den Record einer Verbindung zurueck (beliebiger Status)
    pub fn verbindung(&self, id: &ConnectionId) -> Option<Verbindung> {
        self.inner.verbindungen.get(id).map(|e| e.clone())
    }

    /// Prueft ob eine Verbindung bekannt ist (beliebiger Status)
    pub fn ist_bekannt(&self, id: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(id)
    }

    /// Prueft ob eine Verbindung bekannt und online ist
    pub fn ist_online(&self, id: &ConnectionId) -> bool {
        self.inner
            .verbindungen
            .get(id)
            .map(|e| e.status == OnlineStatus::Online)
            .unwrap_or(false)
    }

    /// Gibt die Anzahl der bekannten Verbindungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Plant die Bereinigung nach Ablauf der Frist
    ///
    /// Der Task gehoert logisch dem Registry-Eintrag; abgebrochen wird er
    /// ausschliesslich durch das Shutdown-Signal.
    fn bereinigung_planen(&self, id: ConnectionId) {
        let registry = self.clone();
        let frist = self.inner.bereinigungs_frist;
        let mut shutdown_rx = self.inner.shutdown_rx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(frist) => {
                    registry.bereinigen(&id);
                }
                _ = shutdown_rx.wait_for(|stop| *stop) => {
                    tracing::trace!(connection_id = %id, "Bereinigung durch Shutdown abgebrochen");
                }
            }
        });
    }

    fn ereignis_melden(&self, ereignis: &RegistryEvent) {
        let listener = self.inner.listener.lock();
        for l in listener.iter() {
            l(ereignis);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_registry(frist: Duration) -> ConnectionRegistry {
        let (tx, rx) = watch::channel(false);
        // Sender am Leben halten – ein fallen gelassener Sender wuerde
        // wait_for sofort beenden und die Bereinigung abbrechen.
        std::mem::forget(tx);
        ConnectionRegistry::neu(frist, rx)
    }

    #[tokio::test]
    async fn registrieren_und_schnappschuss() {
        let registry = test_registry(Duration::from_secs(60));
        let id = ConnectionId::new();

        let v = registry.registrieren(id, "anna", None).unwrap();
        assert_eq!(v.username, "anna");
        assert_eq!(v.status, OnlineStatus::Online);
        assert!(registry.ist_online(&id));

        let schnappschuss = registry.schnappschuss();
        assert_eq!(schnappschuss.len(), 1);
        assert_eq!(schnappschuss[0].id, id);
    }

    #[tokio::test]
    async fn schnappschuss_haelt_einfuege_reihenfolge() {
        let registry = test_registry(Duration::from_secs(60));
        let ids: Vec<ConnectionId> = (0..4).map(|_| ConnectionId::new()).collect();

        for (i, id) in ids.iter().enumerate() {
            registry
                .registrieren(*id, &format!("user{}", i), None)
                .unwrap();
        }

        let schnappschuss = registry.schnappschuss();
        let gesehen: Vec<ConnectionId> = schnappschuss.iter().map(|v| v.id).collect();
        assert_eq!(gesehen, ids);
    }

    #[tokio::test]
    async fn benutzername_grenzen() {
        let registry = test_registry(Duration::from_secs(60));

        // Untere Grenze
        assert!(registry
            .registrieren(ConnectionId::new(), "ab", None)
            .is_ok());
        assert!(matches!(
            registry.registrieren(ConnectionId::new(), "a", None),
            Err(RelayError::Validierung(_))
        ));

        // Obere Grenze: 20 Zeichen ok, 21 nicht
        let zwanzig = "a".repeat(20);
        let einundzwanzig = "a".repeat(21);
        assert!(registry
            .registrieren(ConnectionId::new(), &zwanzig, None)
            .is_ok());
        assert!(matches!(
            registry.registrieren(ConnectionId::new(), &einundzwanzig, None),
            Err(RelayError::Validierung(_))
        ));

        // Zeichensatz
        assert!(matches!(
            registry.registrieren(ConnectionId::new(), "name!!", None),
            Err(RelayError::Validierung(_))
        ));
        assert!(registry
            .registrieren(ConnectionId::new(), "max_mustermann 99", None)
            .is_ok());
    }

    #[tokio::test]
    async fn validierung_mutiert_nichts() {
        let registry = test_registry(Duration::from_secs(60));
        let id = ConnectionId::new();

        let _ = registry.registrieren(id, "x", None);
        assert!(!registry.ist_bekannt(&id));
        assert_eq!(registry.anzahl(), 0);
    }

    #[tokio::test]
    async fn offline_markieren_ist_idempotent() {
        let registry = test_registry(Duration::from_secs(60));
        let id = ConnectionId::new();
        registry.registrieren(id, "berta", None).unwrap();

        let gemeldet = Arc::new(AtomicUsize::new(0));
        let zaehler = Arc::clone(&gemeldet);
        registry.listener_registrieren(move |ev| {
            if matches!(ev, RegistryEvent::OfflineMarkiert { .. }) {
                zaehler.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(registry.offline_markieren(&id));
        assert!(!registry.offline_markieren(&id), "zweiter Aufruf ist No-op");
        assert_eq!(gemeldet.load(Ordering::SeqCst), 1);

        // Record bleibt bekannt, nur der Status kippt
        assert!(registry.ist_bekannt(&id));
        assert!(!registry.ist_online(&id));
    }

    #[tokio::test]
    async fn offline_markieren_unbekannter_verbindung() {
        let registry = test_registry(Duration::from_secs(60));
        assert!(!registry.offline_markieren(&ConnectionId::new()));
    }

    #[tokio::test]
    async fn bereinigung_nach_frist() {
        let registry = test_registry(Duration::from_millis(50));
        let id = ConnectionId::new();
        registry.registrieren(id, "fluechtig", None).unwrap();

        registry.offline_markieren(&id);
        assert!(registry.ist_bekannt(&id), "vor Ablauf der Frist noch da");

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!registry.ist_bekannt(&id), "nach Ablauf der Frist entfernt");
        assert!(registry.schnappschuss().is_empty());
    }

    #[tokio::test]
    async fn bereinigt_ereignis_wird_gemeldet() {
        let registry = test_registry(Duration::from_millis(50));
        let id = ConnectionId::new();
        registry.registrieren(id, "kurz da", None).unwrap();

        let gemeldet = Arc::new(AtomicUsize::new(0));
        let zaehler = Arc::clone(&gemeldet);
        registry.listener_registrieren(move |ev| {
            if matches!(ev, RegistryEvent::Bereinigt { .. }) {
                zaehler.fetch_add(1, Ordering::SeqCst);
            }
        });

        registry.offline_markieren(&id);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gemeldet.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn erneuter_join_aktualisiert_in_place() {
        let registry = test_registry(Duration::from_secs(60));
        let id = ConnectionId::new();

        registry.registrieren(id, "vorher", None).unwrap();
        let v = registry
            .registrieren(id, "nachher", Some("/avatar.png".into()))
            .unwrap();

        assert_eq!(v.username, "nachher");
        assert_eq!(v.avatar.as_deref(), Some("/avatar.png"));
        assert_eq!(registry.anzahl(), 1);
        assert_eq!(registry.schnappschuss().len(), 1);
    }
}
