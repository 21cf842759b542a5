//! plausch-blob – Blob-Store fuer Medien-Uploads
//!
//! Dieses Crate implementiert:
//! - BlobDienst: typisierte Ablage mit MIME- und Groessenpruefung
//! - StorageBackend-Trait + DiskStorage-Implementierung
//!
//! Die Obergrenzen pro Art: Profilbilder 5 MB, Bilder und
//! Sprachnachrichten 10 MB, Videos 50 MB. Das Relay selbst transportiert
//! nie Medien-Bytes, nur die hier vergebenen Verweise.

pub mod error;
pub mod service;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use error::{BlobError, BlobResult};
pub use service::BlobDienst;
pub use storage::{DiskStorage, StorageBackend};
pub use types::{BlobArt, BlobRef, BlobUpload};
