//! Error types for the PDF generator.
//!
//! Every error raised by a [`Document`](crate::Document) operation is fatal: the
//! document is poisoned and cannot produce output afterwards.

/// Result type alias for PDF generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid unit, page format, orientation or display mode
    #[error("Configuration error: {0}")]
    Config(String),

    /// Font could not be registered or selected
    #[error("Font error: {0}")]
    Font(String),

    /// Image could not be loaded or decoded
    #[error("Image error: {0}")]
    Image(#[from] crate::writer::ImageError),

    /// HTML content could not be laid out
    #[error("HTML error: {0}")]
    Html(String),

    /// Operation is not valid in the current document state
    #[error("Invalid document state: {0}")]
    State(String),

    /// A previous fatal error left the document unusable
    #[error("Document is unusable after a previous error: {0}")]
    Poisoned(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be deserialized
    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds a configuration error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Builds a font error from any displayable message.
    pub fn font(msg: impl Into<String>) -> Self {
        Error::Font(msg.into())
    }
}
