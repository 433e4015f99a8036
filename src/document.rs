//! Upload and extraction data types.

use crate::prompts;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Document type inferred from the upload's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentKind {
    Image,
    Pdf,
    Word,
    Text,
    Unknown,
}

impl DocumentKind {
    /// All kinds that have an extractor.
    pub const SUPPORTED: [DocumentKind; 4] = [
        DocumentKind::Image,
        DocumentKind::Pdf,
        DocumentKind::Word,
        DocumentKind::Text,
    ];

    /// Classify a file name by extension, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" => DocumentKind::Image,
            "pdf" => DocumentKind::Pdf,
            "docx" | "doc" => DocumentKind::Word,
            "txt" => DocumentKind::Text,
            _ => DocumentKind::Unknown,
        }
    }

    /// Human label used in listings and context headers.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Image => "Image",
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "Word Document",
            DocumentKind::Text => "Text File",
            DocumentKind::Unknown => "Unknown",
        }
    }

    /// Short name of the engine family, used in "unavailable" notices.
    pub fn engine_name(self) -> &'static str {
        match self {
            DocumentKind::Image => "OCR",
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "DOCX",
            DocumentKind::Text => "TXT",
            DocumentKind::Unknown => "File",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A file as received from the user. Immutable once constructed.
#[derive(Clone, Serialize)]
pub struct UploadedDocument {
    pub name: String,
    pub kind: DocumentKind,
    /// MIME type guessed from the name; `application/octet-stream` if unknown.
    pub content_type: String,
    pub size_bytes: usize,
    #[serde(skip)]
    pub raw_bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, raw_bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = DocumentKind::from_name(&name);
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            kind,
            content_type,
            size_bytes: raw_bytes.len(),
            raw_bytes,
            name,
        }
    }

    /// Size formatted the way listings show it, e.g. `"12.5 KB"`.
    pub fn size_label(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Outcome class of one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExtractionStatus {
    /// Text was found.
    Ok,
    /// The document was readable but holds no text. Not an error.
    Empty,
    /// No extractor exists (or is installed) for this kind.
    Unsupported,
    /// The extractor failed; the reason is human-readable.
    Failed(String),
}

/// Raw extractor output before it is tied to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub status: ExtractionStatus,
}

impl Extraction {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: ExtractionStatus::Ok,
        }
    }

    pub fn empty() -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Empty,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            status: ExtractionStatus::Failed(reason.into()),
        }
    }
}

/// A processed upload: the extracted text plus everything needed to show it.
///
/// Created once per distinct upload and shared by reference (`Arc`) between
/// the session's document list and the conversation turns it is attached to.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub source: Arc<UploadedDocument>,
    /// Extracted text; empty unless `status` is [`ExtractionStatus::Ok`].
    pub text: String,
    pub status: ExtractionStatus,
    /// Placeholder shown instead of `text` for non-`Ok` outcomes.
    pub notice: Option<String>,
    pub processed_at: DateTime<Local>,
}

impl ExtractionResult {
    /// Wrap an extractor outcome, deriving the placeholder from the status.
    pub fn from_extraction(source: Arc<UploadedDocument>, extraction: Extraction) -> Self {
        let kind = source.kind;
        let notice = match &extraction.status {
            ExtractionStatus::Ok => None,
            ExtractionStatus::Empty => Some(prompts::empty_placeholder(kind).to_string()),
            ExtractionStatus::Unsupported => {
                Some(prompts::unsupported_message(&source.content_type))
            }
            ExtractionStatus::Failed(reason) => Some(prompts::failure_message(kind, reason)),
        };
        Self {
            source,
            text: extraction.text,
            status: extraction.status,
            notice,
            processed_at: Local::now(),
        }
    }

    /// An `Unsupported` result carrying a specific notice.
    pub fn unsupported(source: Arc<UploadedDocument>, notice: String) -> Self {
        Self {
            source,
            text: String::new(),
            status: ExtractionStatus::Unsupported,
            notice: Some(notice),
            processed_at: Local::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.source.kind
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }

    /// The text the user (and the model) sees: extracted text or placeholder.
    pub fn display_text(&self) -> &str {
        match self.status {
            ExtractionStatus::Ok => &self.text,
            _ => self.notice.as_deref().unwrap_or(""),
        }
    }

    /// First `limit` characters of [`Self::display_text`], `...` if cut.
    pub fn preview(&self, limit: usize) -> String {
        let text = self.display_text();
        match text.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}{}", &text[..cut], prompts::ELLIPSIS),
            None => text.to_string(),
        }
    }

    /// Processing time as `HH:MM:SS`.
    pub fn timestamp_label(&self) -> String {
        self.processed_at.format("%H:%M:%S").to_string()
    }
}
