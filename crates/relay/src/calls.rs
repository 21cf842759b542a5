//! Anruf-Koordinator – Zustandsmaschine pro Anruf
//!
//! Verwaltet die Live-Tabelle aller laufenden Anruf-Verhandlungen.
//!
//! ## Zustandsmaschine
//! ```text
//! ringing -> accepted -> ended
//!    |
//!    +----> declined
//!
//! beliebiger Zustand -> ended bei Trennung eines Teilnehmers
//! ```
//!
//! `declined` und `ended` sind terminal: der Eintrag verschwindet sofort
//! aus der Tabelle. Antworten/Beenden mit unbekanntem Token sind stille
//! No-ops – solche Aufrufe rennen legitim gegen eine Trennung.
//!
//! Pro ungeordnetem Teilnehmer-Paar ist hoechstens ein Live-Anruf
//! zugelassen; ein zweiter Initiierungsversuch wird abgelehnt.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use plausch_core::types::{AnrufModus, AnrufZustand, CallId, ConnectionId};
use plausch_protocol::event::{
    CallEndedNotice, CallInitiatedNotice, CallStatusNotice, IncomingCallNotice, ServerEvent,
};
use std::sync::Arc;

use crate::broadcast::EventBroadcaster;
use crate::error::{RelayError, RelayResult};
use crate::registry::ConnectionRegistry;

/// Grund-Feld fuer Anrufe die durch Trennung eines Teilnehmers enden
pub const GRUND_PEER_GETRENNT: &str = "peer-disconnected";

// ---------------------------------------------------------------------------
// Anruf
// ---------------------------------------------------------------------------

/// Record einer laufenden Anruf-Verhandlung
#[derive(Debug, Clone)]
pub struct Anruf {
    pub id: CallId,
    pub anrufer_id: ConnectionId,
    pub ziel_id: ConnectionId,
    pub modus: AnrufModus,
    pub zustand: AnrufZustand,
    pub gestartet_um: DateTime<Utc>,
}

impl Anruf {
    /// Prueft ob die Verbindung an diesem Anruf beteiligt ist
    pub fn ist_beteiligt(&self, id: &ConnectionId) -> bool {
        self.anrufer_id == *id || self.ziel_id == *id
    }

    /// Gibt die jeweils andere Seite zurueck
    ///
    /// Fuer einen Unbeteiligten faellt die Wahl auf den Anrufer.
    pub fn gegenseite(&self, id: &ConnectionId) -> ConnectionId {
        if self.anrufer_id == *id {
            self.ziel_id
        } else {
            self.anrufer_id
        }
    }
}

// ---------------------------------------------------------------------------
// AnrufKoordinator
// ---------------------------------------------------------------------------

/// Verwaltet alle laufenden Anrufe
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
/// Der Koordinator besitzt die Zustellung seiner eigenen Ereignisse:
/// der Trennungs-Pfad der Registry stoesst ihn ueber einen Listener an
/// und muss selbst nichts versenden.
#[derive(Clone)]
pub struct AnrufKoordinator {
    inner: Arc<AnrufKoordinatorInner>,
}

struct AnrufKoordinatorInner {
    /// Live-Tabelle, indiziert nach CallId
    anrufe: DashMap<CallId, Anruf>,
    registry: ConnectionRegistry,
    broadcaster: EventBroadcaster,
}

impl AnrufKoordinator {
    /// Erstellt einen neuen AnrufKoordinator
    pub fn neu(registry: ConnectionRegistry, broadcaster: EventBroadcaster) -> Self {
        Self {
            inner: Arc::new(AnrufKoordinatorInner {
                anrufe: DashMap::new(),
                registry,
                broadcaster,
            }),
        }
    }

    /// Initiiert einen Anruf
    ///
    /// Abgelehnt wenn das Ziel nicht online ist oder zwischen beiden
    /// bereits ein Live-Anruf laeuft. Bei Erfolg klingelt es beim Ziel
    /// (`incoming_call`) und der Anrufer bekommt das Token
    /// (`call_initiated`).
    pub fn initiieren(
        &self,
        anrufer_id: ConnectionId,
        ziel_id: ConnectionId,
        modus: AnrufModus,
    ) -> RelayResult<Anruf> {
        let anrufer = self
            .inner
            .registry
            .verbindung(&anrufer_id)
            .ok_or(RelayError::NichtRegistriert(anrufer_id))?;

        if !self.inner.registry.ist_online(&ziel_id) {
            return Err(RelayError::Abgelehnt(
                "Anrufziel ist nicht online".to_string(),
            ));
        }

        if self.hat_live_anruf_zwischen(&anrufer_id, &ziel_id) {
            return Err(RelayError::Abgelehnt(
                "Zwischen beiden laeuft bereits ein Anruf".to_string(),
            ));
        }

        let anruf = Anruf {
            id: CallId::new(),
            anrufer_id,
            ziel_id,
            modus,
            zustand: AnrufZustand::Klingelt,
            gestartet_um: Utc::now(),
        };
        self.inner.anrufe.insert(anruf.id, anruf.clone());

        tracing::info!(
            call_id = %anruf.id,
            anrufer = %anrufer_id,
            ziel = %ziel_id,
            modus = ?modus,
            "Anruf initiiert"
        );

        self.inner.broadcaster.an_verbindung_senden(
            &ziel_id,
            ServerEvent::IncomingCall(IncomingCallNotice {
                call_id: anruf.id,
                caller_id: anrufer_id,
                caller_name: anrufer.username,
                caller_avatar: anrufer.avatar,
                mode: modus,
            }),
        );
        self.inner.broadcaster.an_verbindung_senden(
            &anrufer_id,
            ServerEvent::CallInitiated(CallInitiatedNotice {
                call_id: anruf.id,
                target_id: ziel_id,
            }),
        );

        Ok(anruf)
    }

    /// Beantwortet einen klingelnden Anruf
    ///
    /// Stiller No-op wenn das Token keinen klingelnden Live-Anruf
    /// aufloest. Annahme benachrichtigt beide Seiten, Ablehnung nur den
    /// Anrufer und entfernt den Eintrag sofort.
    pub fn antworten(&self, call_id: CallId, angenommen: bool) -> bool {
        if angenommen {
            let anruf = {
                let mut eintrag = match self.inner.anrufe.get_mut(&call_id) {
                    Some(e) => e,
                    None => return false,
                };
                if eintrag.zustand != AnrufZustand::Klingelt {
                    return false;
                }
                eintrag.zustand = AnrufZustand::Angenommen;
                eintrag.clone()
            };

            tracing::info!(call_id = %call_id, "Anruf angenommen");
            let notice = ServerEvent::CallAccepted(CallStatusNotice { call_id });
            self.inner
                .broadcaster
                .an_verbindung_senden(&anruf.anrufer_id, notice.clone());
            self.inner
                .broadcaster
                .an_verbindung_senden(&anruf.ziel_id, notice);
            true
        } else {
            let anruf = match self.inner.anrufe.remove(&call_id) {
                Some((_, a)) => a,
                None => return false,
            };

            tracing::info!(call_id = %call_id, "Anruf abgelehnt");
            self.inner.broadcaster.an_verbindung_senden(
                &anruf.anrufer_id,
                ServerEvent::CallDeclined(CallStatusNotice { call_id }),
            );
            true
        }
    }

    /// Beendet einen Anruf
    ///
    /// Stiller No-op bei unbekanntem Token. Die Seite die NICHT beendet
    /// hat bekommt genau ein `call_ended`.
    pub fn beenden(&self, call_id: CallId, beender_id: ConnectionId) -> bool {
        let anruf = match self.inner.anrufe.remove(&call_id) {
            Some((_, a)) => a,
            None => return false,
        };

        let empfaenger = anruf.gegenseite(&beender_id);
        tracing::info!(call_id = %call_id, beender = %beender_id, "Anruf beendet");

        self.inner.broadcaster.an_verbindung_senden(
            &empfaenger,
            ServerEvent::CallEnded(CallEndedNotice {
                call_id,
                reason: None,
            }),
        );
        true
    }

    /// Trennungs-Hook: beendet alle Live-Anrufe der Verbindung
    ///
    /// Wird vom Registry-Listener aufgerufen. Die verbliebene Seite
    /// bekommt genau ein `call_ended` mit Grund `peer-disconnected`.
    pub fn verbindung_getrennt(&self, id: &ConnectionId) {
        let betroffen: Vec<CallId> = self
            .inner
            .anrufe
            .iter()
            .filter(|eintrag| eintrag.value().ist_beteiligt(id))
            .map(|eintrag| *eintrag.key())
            .collect();

        for call_id in betroffen {
            let anruf = match self.inner.anrufe.remove(&call_id) {
                Some((_, a)) => a,
                None => continue,
            };

            let verbliebene = anruf.gegenseite(id);
            tracing::info!(
                call_id = %call_id,
                getrennt = %id,
                verbliebene = %verbliebene,
                "Anruf durch Trennung beendet"
            );

            self.inner.broadcaster.an_verbindung_senden(
                &verbliebene,
                ServerEvent::CallEnded(CallEndedNotice {
                    call_id,
                    reason: Some(GRUND_PEER_GETRENNT.to_string()),
                }),
            );
        }
    }

    /// Gibt den Record eines Live-Anrufs zurueck
    pub fn anruf(&self, call_id: &CallId) -> Option<Anruf> {
        self.inner.anrufe.get(call_id).map(|e| e.clone())
    }

    /// Prueft ob das Token einen Live-Anruf aufloest
    pub fn ist_live(&self, call_id: &CallId) -> bool {
        self.inner.anrufe.contains_key(call_id)
    }

    /// Gibt die Anzahl der Live-Anrufe zurueck
    pub fn live_anzahl(&self) -> usize {
        self.inner.anrufe.len()
    }

    /// Prueft ob zwischen den beiden (ungeordnet) ein Live-Anruf laeuft
    pub fn hat_live_anruf_zwischen(&self, a: &ConnectionId, b: &ConnectionId) -> bool {
        self.inner
            .anrufe
            .iter()
            .any(|eintrag| eintrag.value().ist_beteiligt(a) && eintrag.value().ist_beteiligt(b))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::{mpsc, watch};

    struct TestUmgebung {
        registry: ConnectionRegistry,
        broadcaster: EventBroadcaster,
        koordinator: AnrufKoordinator,
    }

    fn umgebung() -> TestUmgebung {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        let registry = ConnectionRegistry::neu(Duration::from_secs(60), rx);
        let broadcaster = EventBroadcaster::neu();
        let koordinator = AnrufKoordinator::neu(registry.clone(), broadcaster.clone());
        TestUmgebung {
            registry,
            broadcaster,
            koordinator,
        }
    }

    fn teilnehmer(u: &TestUmgebung, name: &str) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let id = ConnectionId::new();
        let rx = u.broadcaster.verbindung_registrieren(id);
        u.registry.registrieren(id, name, None).unwrap();
        (id, rx)
    }

    fn leeren(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut ereignisse = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            ereignisse.push(ev);
        }
        ereignisse
    }

    #[tokio::test]
    async fn initiieren_klingelt_beim_ziel() {
        let u = umgebung();
        let (anrufer, mut rx_a) = teilnehmer(&u, "anrufer");
        let (ziel, mut rx_z) = teilnehmer(&u, "ziel");

        let anruf = u
            .koordinator
            .initiieren(anrufer, ziel, AnrufModus::Video)
            .unwrap();
        assert_eq!(anruf.zustand, AnrufZustand::Klingelt);
        assert!(u.koordinator.ist_live(&anruf.id));

        let beim_ziel = leeren(&mut rx_z);
        assert_eq!(beim_ziel.len(), 1);
        if let ServerEvent::IncomingCall(n) = &beim_ziel[0] {
            assert_eq!(n.caller_name, "anrufer");
            assert_eq!(n.mode, AnrufModus::Video);
        } else {
            panic!("Erwartet IncomingCall");
        }

        let beim_anrufer = leeren(&mut rx_a);
        assert_eq!(beim_anrufer.len(), 1);
        assert!(matches!(beim_anrufer[0], ServerEvent::CallInitiated(_)));
    }

    #[tokio::test]
    async fn initiieren_gegen_offline_ziel_abgelehnt() {
        let u = umgebung();
        let (anrufer, _rx_a) = teilnehmer(&u, "anrufer");
        let (ziel, mut rx_z) = teilnehmer(&u, "ziel");
        u.registry.offline_markieren(&ziel);

        let result = u.koordinator.initiieren(anrufer, ziel, AnrufModus::Voice);
        assert!(matches!(result, Err(RelayError::Abgelehnt(_))));
        assert_eq!(u.koordinator.live_anzahl(), 0, "kein Eintrag angelegt");
        assert!(
            leeren(&mut rx_z).is_empty(),
            "kein incoming_call beim Offline-Ziel"
        );
    }

    #[tokio::test]
    async fn initiieren_gegen_unbekanntes_ziel_abgelehnt() {
        let u = umgebung();
        let (anrufer, _rx_a) = teilnehmer(&u, "anrufer");

        let result = u
            .koordinator
            .initiieren(anrufer, ConnectionId::new(), AnrufModus::Voice);
        assert!(matches!(result, Err(RelayError::Abgelehnt(_))));
        assert_eq!(u.koordinator.live_anzahl(), 0);
    }

    #[tokio::test]
    async fn zweiter_anruf_zwischen_demselben_paar_abgelehnt() {
        let u = umgebung();
        let (a, _rx_a) = teilnehmer(&u, "alice");
        let (b, _rx_b) = teilnehmer(&u, "bob");

        u.koordinator.initiieren(a, b, AnrufModus::Voice).unwrap();

        // Gleiche Richtung und Gegenrichtung: beide abgelehnt
        assert!(matches!(
            u.koordinator.initiieren(a, b, AnrufModus::Video),
            Err(RelayError::Abgelehnt(_))
        ));
        assert!(matches!(
            u.koordinator.initiieren(b, a, AnrufModus::Voice),
            Err(RelayError::Abgelehnt(_))
        ));
        assert_eq!(u.koordinator.live_anzahl(), 1);
    }

    #[tokio::test]
    async fn annahme_benachrichtigt_beide() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Video).unwrap();
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        assert!(u.koordinator.antworten(anruf.id, true));

        let bei_a = leeren(&mut rx_a);
        let bei_b = leeren(&mut rx_b);
        assert!(matches!(bei_a.as_slice(), [ServerEvent::CallAccepted(_)]));
        assert!(matches!(bei_b.as_slice(), [ServerEvent::CallAccepted(_)]));

        let gespeichert = u.koordinator.anruf(&anruf.id).unwrap();
        assert_eq!(gespeichert.zustand, AnrufZustand::Angenommen);
    }

    #[tokio::test]
    async fn ablehnung_benachrichtigt_nur_anrufer_und_entfernt() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Voice).unwrap();
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        assert!(u.koordinator.antworten(anruf.id, false));

        let bei_a = leeren(&mut rx_a);
        assert!(matches!(bei_a.as_slice(), [ServerEvent::CallDeclined(_)]));
        assert!(leeren(&mut rx_b).is_empty(), "Ziel bekommt nichts");
        assert!(!u.koordinator.ist_live(&anruf.id));
    }

    #[tokio::test]
    async fn antwort_auf_veraltetes_token_ist_stiller_no_op() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Voice).unwrap();
        u.koordinator.antworten(anruf.id, false);
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        // Token ist bereits entfernt – beide Antwortarten sind No-ops
        assert!(!u.koordinator.antworten(anruf.id, true));
        assert!(!u.koordinator.antworten(anruf.id, false));
        assert!(leeren(&mut rx_a).is_empty());
        assert!(leeren(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn beenden_benachrichtigt_die_gegenseite() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Video).unwrap();
        u.koordinator.antworten(anruf.id, true);
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        // Das Ziel legt auf – der Anrufer bekommt genau ein call_ended
        assert!(u.koordinator.beenden(anruf.id, b));

        let bei_a = leeren(&mut rx_a);
        assert_eq!(bei_a.len(), 1);
        if let ServerEvent::CallEnded(n) = &bei_a[0] {
            assert!(n.reason.is_none());
        } else {
            panic!("Erwartet CallEnded");
        }
        assert!(leeren(&mut rx_b).is_empty(), "Beender bekommt nichts");
        assert!(!u.koordinator.ist_live(&anruf.id));

        // Doppeltes Beenden ist stiller No-op
        assert!(!u.koordinator.beenden(anruf.id, a));
        assert!(leeren(&mut rx_a).is_empty());
        assert!(leeren(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn trennung_beendet_angenommenen_anruf() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Video).unwrap();
        u.koordinator.antworten(anruf.id, true);
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        u.koordinator.verbindung_getrennt(&b);

        let bei_a = leeren(&mut rx_a);
        assert_eq!(bei_a.len(), 1, "genau ein call_ended");
        if let ServerEvent::CallEnded(n) = &bei_a[0] {
            assert_eq!(n.reason.as_deref(), Some(GRUND_PEER_GETRENNT));
        } else {
            panic!("Erwartet CallEnded");
        }
        assert!(!u.koordinator.ist_live(&anruf.id), "Token aus der Tabelle");

        // Zweite Trennung derselben Verbindung: nichts mehr zu tun
        u.koordinator.verbindung_getrennt(&b);
        assert!(leeren(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn trennung_beendet_auch_klingelnde_anrufe() {
        let u = umgebung();
        let (a, mut rx_a) = teilnehmer(&u, "alice");
        let (b, mut rx_b) = teilnehmer(&u, "bob");

        let anruf = u.koordinator.initiieren(a, b, AnrufModus::Voice).unwrap();
        leeren(&mut rx_a);
        leeren(&mut rx_b);

        // Der Anrufer trennt waehrend es noch klingelt
        u.koordinator.verbindung_getrennt(&a);

        let bei_b = leeren(&mut rx_b);
        assert_eq!(bei_b.len(), 1);
        assert!(matches!(bei_b[0], ServerEvent::CallEnded(_)));
        assert!(!u.koordinator.ist_live(&anruf.id));
    }
}
