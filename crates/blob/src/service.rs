//! BlobDienst – Ablage typisierter Medien mit Typ- und Groessenpruefung
//!
//! Der Dienst ist der "Blob-Store"-Kollaborateur des Relays: er bekommt
//! typisierte Bytes samt deklariertem MIME-Typ und gibt das
//! URL/Name/Groesse-Tupel zurueck das in Medien-Nachrichten eingebettet
//! wird. Abgelehnte Uploads hinterlassen keinen Teilzustand.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{BlobError, BlobResult};
use crate::storage::StorageBackend;
use crate::types::{BlobArt, BlobRef, BlobUpload};

/// URL-Wurzel unter der abgelegte Blobs abrufbar sind
const URL_WURZEL: &str = "/uploads";

/// BlobDienst verwaltet die Ablage von Medien-Uploads
pub struct BlobDienst<S: StorageBackend> {
    storage: Arc<S>,
}

impl<S: StorageBackend> BlobDienst<S> {
    /// Erstellt einen neuen BlobDienst
    pub fn neu(storage: Arc<S>) -> Arc<Self> {
        Arc::new(Self { storage })
    }

    /// Legt einen Blob ab und gibt den Verweis zurueck
    ///
    /// Prueft deklarierten MIME-Typ gegen das Praefix der Art und die
    /// Groesse gegen die Obergrenze der Art. Der Dateiname auf der
    /// Platte ist frisch generiert; der Original-Name wandert nur in den
    /// Verweis.
    pub async fn ablegen(&self, upload: BlobUpload) -> BlobResult<BlobRef> {
        if upload.original_name.trim().is_empty() {
            return Err(BlobError::UngueltigeEingabe(
                "Dateiname darf nicht leer sein".into(),
            ));
        }

        // MIME-Praefix pruefen
        let praefix = upload.art.mime_praefix();
        if !upload.declared_mime.starts_with(praefix) {
            return Err(BlobError::FalscherTyp {
                erwartet: praefix.to_string(),
                erhalten: upload.declared_mime,
            });
        }

        // Groesse pruefen
        let size = upload.daten.len() as u64;
        let max = upload.art.max_groesse();
        if size > max {
            return Err(BlobError::ZuGross { size, max });
        }

        // SHA-256 berechnen
        let mut hasher = Sha256::new();
        hasher.update(&upload.daten);
        let checksum = format!("{:x}", hasher.finalize());

        // Ablage-Pfad aufbauen: <unterordner>/<uuid>.<ext>
        let datei_name = frischer_dateiname(&upload.original_name);
        let storage_path = ablage_pfad(upload.art, &datei_name);

        self.storage.store(&storage_path, &upload.daten).await?;

        tracing::info!(
            art = ?upload.art,
            original_name = %upload.original_name,
            size = size,
            "Blob abgelegt"
        );

        Ok(BlobRef {
            url: format!("{}/{}", URL_WURZEL, storage_path),
            original_name: upload.original_name,
            size_bytes: size,
            checksum,
        })
    }

    /// Laedt einen zuvor abgelegten Blob anhand seiner URL
    pub async fn laden(&self, url: &str) -> BlobResult<Vec<u8>> {
        let storage_path = url
            .strip_prefix(URL_WURZEL)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                BlobError::UngueltigeEingabe(format!("keine Blob-URL: {}", url))
            })?;
        self.storage.retrieve(storage_path).await
    }

    /// Entfernt einen zuvor abgelegten Blob anhand seiner URL
    pub async fn entfernen(&self, url: &str) -> BlobResult<()> {
        let storage_path = url
            .strip_prefix(URL_WURZEL)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                BlobError::UngueltigeEingabe(format!("keine Blob-URL: {}", url))
            })?;
        self.storage.delete(storage_path).await
    }
}

/// Generiert einen frischen Dateinamen, haelt die Original-Endung
fn frischer_dateiname(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original_name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Baut den Ablage-Pfad relativ zum Upload-Wurzelverzeichnis
fn ablage_pfad(art: BlobArt, datei_name: &str) -> String {
    let ordner = art.unterordner();
    if ordner.is_empty() {
        datei_name.to_string()
    } else {
        format!("{}/{}", ordner, datei_name)
    }
}
