use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to decode text layer: {0}")]
    Decode(String),
}

/// Trait for PDF text extraction backends.
///
/// Implementors only decode the plain-text layer; the front-matter and
/// heading heuristics live in [`crate::document`].
pub trait PdfBackend: Send + Sync {
    /// Extract the full text content of a PDF file.
    fn extract_text(&self, path: &Path) -> Result<String, ExtractionError>;
}
