//! Text extractors and the capability registry that hands them out.
//!
//! Each extractor turns raw bytes of one [`DocumentKind`] into text. The
//! registry is resolved once at startup: it probes for the external engines
//! (Tesseract, PDFium) and records, per kind, either a ready extractor or the
//! reason it is unavailable. The file processor only ever queries it.

mod ocr;
mod pdf;
mod text;
mod word;

pub use self::ocr::{ImageExtractor, TesseractEngine};
pub use self::pdf::{join_page_texts, PdfExtractor, PdfiumLibrary};
pub use self::text::PlainTextExtractor;
pub use self::word::{extract_docx_xml, WordExtractor};

use crate::config::ChatConfig;
use crate::document::{DocumentKind, Extraction};
use crate::error::ExtractError;
use crate::pipeline::sanitize::sanitize_text;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Converts the raw bytes of one document kind to text.
///
/// Implementations are synchronous and may block (subprocesses, FFI); the
/// file processor runs them on the blocking pool.
pub trait TextExtractor: Send + Sync {
    /// The kind this extractor handles.
    fn kind(&self) -> DocumentKind;

    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Engine-specific extraction. Called only with non-empty input.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;

    /// Extract and classify the outcome.
    ///
    /// Empty input is `Empty` without touching the engine; text that is
    /// blank after sanitisation is `Empty`; errors become `Failed`.
    fn extract(&self, bytes: &[u8]) -> Extraction {
        if bytes.is_empty() {
            return Extraction::empty();
        }
        match self.extract_text(bytes) {
            Ok(raw) => {
                let text = sanitize_text(&raw);
                if text.is_empty() {
                    Extraction::empty()
                } else {
                    Extraction::ok(text)
                }
            }
            Err(e) => Extraction::failed(e.to_string()),
        }
    }
}

/// What the registry knows about one kind.
pub enum Capability<'a> {
    Available(&'a Arc<dyn TextExtractor>),
    /// The engine was probed at startup and is missing.
    Unavailable(&'a str),
    /// Nothing registered at all (always the case for `Unknown`).
    Missing,
}

/// Startup-resolved map from document kind to extractor.
#[derive(Default)]
pub struct ExtractorRegistry {
    available: HashMap<DocumentKind, Arc<dyn TextExtractor>>,
    unavailable: HashMap<DocumentKind, String>,
}

impl ExtractorRegistry {
    /// An empty registry; every kind is `Missing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe the external engines named in `config` and register what works.
    ///
    /// Plain text and Word need no external engine and are always present.
    pub fn detect(config: &ChatConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainTextExtractor));
        registry.register(Arc::new(WordExtractor));

        let engine = TesseractEngine::new(&config.tesseract_command, &config.ocr_language)
            .with_scratch_dir(config.scratch_dir.clone());
        let ocr = match engine.probe() {
            Ok(version) => {
                info!("OCR engine ready: {}", version);
                let ocr = Arc::new(engine);
                registry.register(Arc::new(ImageExtractor::new(Arc::clone(&ocr))));
                Some(ocr)
            }
            Err(reason) => {
                warn!("OCR unavailable: {}", reason);
                registry.mark_unavailable(DocumentKind::Image, reason);
                None
            }
        };

        let library = PdfiumLibrary::new(config.pdfium_library_path.clone());
        match library.probe() {
            Ok(()) => {
                info!("PDF engine ready");
                let fallback = if config.pdf_ocr_fallback { ocr } else { None };
                let extractor = PdfExtractor::new(library, fallback)
                    .with_scratch_dir(config.scratch_dir.clone());
                registry.register(Arc::new(extractor));
            }
            Err(reason) => {
                warn!("PDF engine unavailable: {}", reason);
                registry.mark_unavailable(DocumentKind::Pdf, reason);
            }
        }

        registry
    }

    /// Register (or replace) the extractor for its kind.
    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) -> &mut Self {
        let kind = extractor.kind();
        self.unavailable.remove(&kind);
        self.available.insert(kind, extractor);
        self
    }

    /// Record that `kind` cannot be handled, and why.
    pub fn mark_unavailable(&mut self, kind: DocumentKind, reason: impl Into<String>) -> &mut Self {
        self.available.remove(&kind);
        self.unavailable.insert(kind, reason.into());
        self
    }

    pub fn get(&self, kind: DocumentKind) -> Capability<'_> {
        if let Some(extractor) = self.available.get(&kind) {
            Capability::Available(extractor)
        } else if let Some(reason) = self.unavailable.get(&kind) {
            Capability::Unavailable(reason)
        } else {
            Capability::Missing
        }
    }

    pub fn is_available(&self, kind: DocumentKind) -> bool {
        self.available.contains_key(&kind)
    }
}

/// A named scratch file in `dir`, or in the system temp dir. It is removed
/// when the handle drops.
fn scratch_file(prefix: &str, suffix: &str, dir: Option<&Path>) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(suffix);
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut available: Vec<_> = self
            .available
            .iter()
            .map(|(kind, e)| (*kind, e.name().to_string()))
            .collect();
        available.sort_by_key(|(kind, _)| kind.label());
        f.debug_struct("ExtractorRegistry")
            .field("available", &available)
            .field("unavailable", &self.unavailable)
            .finish()
    }
}
