//! Tests des Blob-Crates
