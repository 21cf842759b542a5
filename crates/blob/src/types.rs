//! Oeffentliche Typen fuer den Blob-Store

use serde::{Deserialize, Serialize};

/// Art eines Blobs
///
/// Bestimmt MIME-Praefix, Groessen-Obergrenze und Ablage-Unterordner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobArt {
    #[serde(rename = "profile")]
    Profil,
    #[serde(rename = "image")]
    Bild,
    Video,
    #[serde(rename = "voice")]
    Sprache,
}

impl BlobArt {
    /// Erforderliches MIME-Praefix des deklarierten Typs
    pub fn mime_praefix(&self) -> &'static str {
        match self {
            Self::Profil | Self::Bild => "image/",
            Self::Video => "video/",
            Self::Sprache => "audio/",
        }
    }

    /// Groessen-Obergrenze in Bytes
    pub fn max_groesse(&self) -> u64 {
        match self {
            Self::Profil => 5 * 1024 * 1024,
            Self::Bild | Self::Sprache => 10 * 1024 * 1024,
            Self::Video => 50 * 1024 * 1024,
        }
    }

    /// Ablage-Unterordner relativ zum Upload-Wurzelverzeichnis
    ///
    /// Profilbilder liegen direkt in der Wurzel.
    pub fn unterordner(&self) -> &'static str {
        match self {
            Self::Profil => "",
            Self::Bild => "images",
            Self::Video => "videos",
            Self::Sprache => "voice",
        }
    }
}

/// Daten zum Ablegen eines Blobs
#[derive(Debug)]
pub struct BlobUpload {
    pub art: BlobArt,
    pub original_name: String,
    /// Vom Client deklarierter MIME-Typ
    pub declared_mime: String,
    pub daten: Vec<u8>,
}

/// Verweis auf einen abgelegten Blob
///
/// Genau das Tupel das das Relay in Medien-Nachrichten einbettet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    /// Abruf-URL relativ zur Server-Wurzel
    pub url: String,
    pub original_name: String,
    pub size_bytes: u64,
    /// SHA-256 der abgelegten Bytes (hex)
    pub checksum: String,
}
