//! Fehlertypen fuer das Blob-Crate

use thiserror::Error;

/// Blob-Fehlertypen
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Falscher Dateityp: erwartet {erwartet}*, erhalten {erhalten}")]
    FalscherTyp { erwartet: String, erhalten: String },

    #[error("Datei zu gross: {size} Bytes (Maximum: {max} Bytes)")]
    ZuGross { size: u64, max: u64 },

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type BlobResult<T> = Result<T, BlobError>;
