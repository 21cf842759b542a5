//! Storage-Backend fuer Blob-Ablage
//!
//! Das `StorageBackend`-Trait abstrahiert den konkreten Speicher
//! (Disk, S3, etc.).

use std::path::PathBuf;

use crate::error::BlobResult;

/// Abstraktes Speicher-Backend fuer Blobs
#[allow(async_fn_in_trait)]
pub trait StorageBackend: Send + Sync {
    /// Bytes unter dem angegebenen Pfad speichern
    async fn store(&self, path: &str, data: &[u8]) -> BlobResult<()>;

    /// Bytes laden
    async fn retrieve(&self, path: &str) -> BlobResult<Vec<u8>>;

    /// Blob loeschen
    async fn delete(&self, path: &str) -> BlobResult<()>;
}

/// Disk-basiertes Storage-Backend
///
/// Speichert Blobs unter `base_dir/<path>`.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    base_dir: PathBuf,
}

impl DiskStorage {
    /// Neues DiskStorage mit dem angegebenen Basisverzeichnis erstellen
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Vollstaendigen Dateipfad aus relativem Pfad berechnen
    fn full_path(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl StorageBackend for DiskStorage {
    async fn store(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        let full = self.full_path(path);

        // Elternverzeichnis anlegen falls noetig
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full, data).await?;
        tracing::debug!(path = %full.display(), bytes = data.len(), "Blob gespeichert");
        Ok(())
    }

    async fn retrieve(&self, path: &str) -> BlobResult<Vec<u8>> {
        let full = self.full_path(path);
        let data = tokio::fs::read(&full).await?;
        tracing::debug!(path = %full.display(), bytes = data.len(), "Blob gelesen");
        Ok(data)
    }

    async fn delete(&self, path: &str) -> BlobResult<()> {
        let full = self.full_path(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                tracing::debug!(path = %full.display(), "Blob geloescht");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Bereits geloescht – kein Fehler
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
