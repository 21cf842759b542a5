//! Nachrichten-Log – Begrenzte, geordnete Aufzeichnung aller Chat-Ereignisse
//!
//! Ein strikt begrenztes FIFO: Anfuegen am Ende, bei Ueberlauf faellt die
//! aelteste Nachricht heraus. Kein Cache, keine Recency-Semantik, keine
//! Mutation vergangener Eintraege. Der gesamte Vertrag ist
//! Append-only + Eviction.

use parking_lot::Mutex;
use plausch_core::types::{ConnectionId, NachrichtenArt};
use plausch_protocol::event::{ChatNachricht, MedienInfo};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{RelayError, RelayResult};
use crate::registry::ConnectionRegistry;

/// Standard-Kapazitaet des Logs
pub const STANDARD_KAPAZITAET: usize = 100;

/// Begrenztes, geordnetes Nachrichten-Log
///
/// Thread-safe via Arc + Mutex; ID-Vergabe und Eviction passieren in
/// derselben kurzen kritischen Sektion, damit die IDs im Verlauf strikt
/// steigend bleiben.
#[derive(Clone)]
pub struct MessageLog {
    inner: Arc<MessageLogInner>,
}

struct MessageLogInner {
    registry: ConnectionRegistry,
    zustand: Mutex<LogZustand>,
    kapazitaet: usize,
}

struct LogZustand {
    nachrichten: VecDeque<ChatNachricht>,
    naechste_id: u64,
}

impl MessageLog {
    /// Erstellt ein neues MessageLog
    pub fn neu(registry: ConnectionRegistry, kapazitaet: usize) -> Self {
        Self {
            inner: Arc::new(MessageLogInner {
                registry,
                zustand: Mutex::new(LogZustand {
                    nachrichten: VecDeque::with_capacity(kapazitaet),
                    naechste_id: 1,
                }),
                kapazitaet,
            }),
        }
    }

    /// Haengt eine Nachricht an und gibt den gespeicherten Record zurueck
    ///
    /// Schlaegt mit `NichtRegistriert` fehl wenn der Absender der Registry
    /// nicht bekannt ist (beliebiger Status). Username und Avatar werden
    /// denormalisiert: die Nachricht bleibt auch nach Trennung des
    /// Absenders vollstaendig.
    pub fn anhaengen(
        &self,
        sender_id: ConnectionId,
        kind: NachrichtenArt,
        body: Option<String>,
        media: Option<MedienInfo>,
    ) -> RelayResult<ChatNachricht> {
        let verbindung = self
            .inner
            .registry
            .verbindung(&sender_id)
            .ok_or(RelayError::NichtRegistriert(sender_id))?;

        let jetzt = chrono::Utc::now();
        // Text-Nachrichten tragen nie einen Medien-Verweis
        let media = if kind.ist_medien() { media } else { None };

        let mut zustand = self.inner.zustand.lock();
        let nachricht = ChatNachricht {
            id: zustand.naechste_id,
            sender_id,
            username: verbindung.username,
            avatar: verbindung.avatar,
            kind,
            body: body.unwrap_or_default(),
            media,
            timestamp: jetzt.format("%H:%M").to_string(),
            sent_at: jetzt,
        };
        zustand.naechste_id += 1;
        zustand.nachrichten.push_back(nachricht.clone());

        // Aelteste zuerst verdraengen
        while zustand.nachrichten.len() > self.inner.kapazitaet {
            zustand.nachrichten.pop_front();
        }
        drop(zustand);

        tracing::debug!(
            message_id = nachricht.id,
            sender_id = %sender_id,
            kind = ?kind,
            "Nachricht angehaengt"
        );
        Ok(nachricht)
    }

    /// Gibt das aktuelle Log in Einfuege-Reihenfolge zurueck, aelteste zuerst
    pub fn verlauf(&self) -> Vec<ChatNachricht> {
        self.inner.zustand.lock().nachrichten.iter().cloned().collect()
    }

    /// Gibt die Anzahl der gehaltenen Nachrichten zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.zustand.lock().nachrichten.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::watch;

    fn test_umgebung() -> (ConnectionRegistry, MessageLog, ConnectionId) {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        let registry = ConnectionRegistry::neu(Duration::from_secs(60), rx);
        let log = MessageLog::neu(registry.clone(), STANDARD_KAPAZITAET);
        let id = ConnectionId::new();
        registry.registrieren(id, "sender", None).unwrap();
        (registry, log, id)
    }

    #[tokio::test]
    async fn anhaengen_und_verlauf() {
        let (_registry, log, id) = test_umgebung();

        let n = log
            .anhaengen(id, NachrichtenArt::Text, Some("Hallo".into()), None)
            .unwrap();
        assert_eq!(n.id, 1);
        assert_eq!(n.body, "Hallo");
        assert_eq!(n.username, "sender");

        let verlauf = log.verlauf();
        assert_eq!(verlauf.len(), 1);
        assert_eq!(verlauf[0].id, 1);
    }

    #[tokio::test]
    async fn unbekannter_absender_wird_abgelehnt() {
        let (_registry, log, _id) = test_umgebung();

        let result = log.anhaengen(
            ConnectionId::new(),
            NachrichtenArt::Text,
            Some("verloren".into()),
            None,
        );
        assert!(matches!(result, Err(RelayError::NichtRegistriert(_))));
        assert_eq!(log.anzahl(), 0, "kein Broadcast, kein Eintrag");
    }

    #[tokio::test]
    async fn offline_markierter_absender_bleibt_bekannt() {
        let (registry, log, id) = test_umgebung();
        registry.offline_markieren(&id);

        // "Bekannt" heisst beliebiger Status – offline reicht
        let result = log.anhaengen(id, NachrichtenArt::Text, Some("noch da".into()), None);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn begrenzung_auf_kapazitaet() {
        let (_registry, log, id) = test_umgebung();

        for i in 0..150 {
            log.anhaengen(id, NachrichtenArt::Text, Some(format!("n{}", i)), None)
                .unwrap();
        }

        let verlauf = log.verlauf();
        assert_eq!(verlauf.len(), STANDARD_KAPAZITAET);

        // Genau die letzten 100, aelteste zuerst, IDs strikt steigend
        assert_eq!(verlauf[0].id, 51);
        assert_eq!(verlauf[99].id, 150);
        for fenster in verlauf.windows(2) {
            assert!(fenster[0].id < fenster[1].id);
        }
        assert_eq!(verlauf[0].body, "n50");
        assert_eq!(verlauf[99].body, "n149");
    }

    #[tokio::test]
    async fn text_nachricht_verliert_medien_verweis() {
        let (_registry, log, id) = test_umgebung();

        let n = log
            .anhaengen(
                id,
                NachrichtenArt::Text,
                Some("nur text".into()),
                Some(MedienInfo {
                    url: "/uploads/x".into(),
                    original_name: "x".into(),
                    size_bytes: 1,
                }),
            )
            .unwrap();
        assert!(n.media.is_none());
    }

    #[tokio::test]
    async fn medien_nachricht_mit_leerem_body() {
        let (_registry, log, id) = test_umgebung();

        let n = log
            .anhaengen(
                id,
                NachrichtenArt::Sprache,
                None,
                Some(MedienInfo {
                    url: "/uploads/voice/a.ogg".into(),
                    original_name: "aufnahme.ogg".into(),
                    size_bytes: 2048,
                }),
            )
            .unwrap();
        assert_eq!(n.body, "");
        assert_eq!(n.media.as_ref().unwrap().size_bytes, 2048);
    }
}
