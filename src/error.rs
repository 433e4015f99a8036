//! Error types for the doc2chat library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocChatError`]: **Fatal** at the edges of the library: a local path
//!   cannot be read, a URL cannot be downloaded, the configuration is
//!   invalid. Returned as `Err(DocChatError)`.
//!
//! * [`ExtractError`]: **Non-fatal**: one document could not be turned into
//!   text. It never escapes the pipeline; the file processor folds it into
//!   [`crate::document::ExtractionStatus::Failed`] so the reason is shown to
//!   the user and the conversation carries on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2chat library.
#[derive(Debug, Error)]
pub enum DocChatError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Upload path does not exist.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed midway.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client for the inference backend could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single document produced no text.
///
/// The `Display` output is what ends up in front of the user, so every
/// variant reads as a plain sentence fragment.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Plain-text upload is not valid UTF-8.
    #[error("invalid UTF-8 sequence at byte {valid_up_to}")]
    InvalidUtf8 { valid_up_to: usize },

    /// Image bytes could not be decoded as PNG/JPEG.
    #[error("cannot decode image: {0}")]
    ImageDecode(String),

    /// The OCR engine could not be run or exited with an error.
    #[error("OCR engine failed: {0}")]
    Ocr(String),

    /// PDFium could not be bound or could not parse the document.
    #[error("cannot read PDF: {0}")]
    Pdf(String),

    /// The Word container or its XML body is unreadable.
    #[error("cannot read Word document: {0}")]
    Word(String),

    /// A scratch file for a file-backed engine could not be written.
    #[error("scratch file error: {0}")]
    ScratchFile(#[from] std::io::Error),
}
