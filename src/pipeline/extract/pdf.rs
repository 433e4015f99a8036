//! PDF text layer extraction via pdfium.
//!
//! Only the embedded text layer is read. Scanned pages have no text layer;
//! they are rasterised and OCR'd only when an OCR engine was handed in as a
//! fallback, otherwise they contribute nothing. A page that fails to render
//! or recognise fails the whole document.

use super::{scratch_file, TesseractEngine, TextExtractor};
use crate::document::DocumentKind;
use crate::error::ExtractError;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest edge, in pixels, of a page rasterised for OCR.
const OCR_RENDER_PIXELS: i32 = 2000;

/// Where to find the pdfium shared library.
///
/// Binding happens per extraction, inside the blocking task, so the library
/// handle never crosses threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLibrary {
    path: Option<PathBuf>,
}

impl PdfiumLibrary {
    /// `path` may name the library file itself or the directory holding it.
    /// With no path, `PDFIUM_LIB_PATH` and then the system loader are tried.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn bind(&self) -> Result<Pdfium, String> {
        let explicit = self
            .path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let file = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                Pdfium::bind_to_library(&file)
                    .map_err(|e| format!("cannot load {}: {e}", file.display()))?
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| format!("pdfium library not found: {e}"))?,
        };

        Ok(Pdfium::new(bindings))
    }

    /// Bind once to check the library loads.
    pub fn probe(&self) -> Result<(), String> {
        self.bind().map(|_| ())
    }
}

/// PDF uploads: per-page text, optionally OCR for pages without any.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    library: PdfiumLibrary,
    ocr_fallback: Option<Arc<TesseractEngine>>,
    scratch_dir: Option<PathBuf>,
}

impl PdfExtractor {
    pub fn new(library: PdfiumLibrary, ocr_fallback: Option<Arc<TesseractEngine>>) -> Self {
        Self {
            library,
            ocr_fallback,
            scratch_dir: None,
        }
    }

    /// Write the scratch copy of each PDF to `dir` instead of the system
    /// temp dir.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    fn ocr_page(
        &self,
        engine: &TesseractEngine,
        page: &PdfPage,
        number: usize,
    ) -> Result<String, ExtractError> {
        let config = PdfRenderConfig::new()
            .set_target_width(OCR_RENDER_PIXELS)
            .set_maximum_height(OCR_RENDER_PIXELS);

        let bitmap = match page.render_with_config(&config) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                let reason = format!("page {number}: cannot rasterise for OCR: {e}");
                return Err(ExtractError::Pdf(reason));
            }
        };

        let text = match engine.recognize_image(&bitmap.as_image()) {
            Ok(text) => text,
            Err(e) => {
                warn!("Page {}: {}", number, e);
                return Err(e);
            }
        };
        debug!("Page {}: OCR produced {} chars", number, text.len());
        Ok(text)
    }
}

impl TextExtractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn name(&self) -> &str {
        "pdfium"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut scratch = scratch_file("doc2chat-pdf-", ".pdf", self.scratch_dir.as_deref())?;
        scratch.write_all(bytes)?;
        scratch.flush()?;

        let pdfium = self.library.bind().map_err(ExtractError::Pdf)?;
        let document = pdfium
            .load_pdf_from_file(scratch.path(), None)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let number = idx + 1;
            let text = page
                .text()
                .map(|t| t.all())
                .map_err(|e| ExtractError::Pdf(format!("page {number}: {e}")))?;

            if text.trim().is_empty() {
                if let Some(engine) = &self.ocr_fallback {
                    debug!("Page {} has no text layer, running OCR", number);
                    texts.push(self.ocr_page(engine, &page, number)?);
                    continue;
                }
                debug!("Page {} has no text layer", number);
            }
            texts.push(text);
        }

        Ok(join_page_texts(&texts))
    }
}

/// Join per-page text with newlines, dropping pages that are blank.
pub fn join_page_texts<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Extraction, ExtractionStatus};

    const MISSING_LIBRARY: &str = "/nonexistent/doc2chat-test/libpdfium.so";

    fn missing_library() -> PdfiumLibrary {
        PdfiumLibrary::new(Some(PathBuf::from(MISSING_LIBRARY)))
    }

    fn extractor() -> PdfExtractor {
        PdfExtractor::new(missing_library(), None)
    }

    #[test]
    fn join_skips_blank_pages() {
        let pages = ["Page one", "  \n", "Page three\n"];
        assert_eq!(join_page_texts(&pages), "Page one\nPage three");
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_page_texts::<&str>(&[]), "");
        assert_eq!(join_page_texts(&["", " "]), "");
    }

    #[test]
    fn empty_bytes_never_bind() {
        assert_eq!(extractor().extract(&[]), Extraction::empty());
    }

    #[test]
    fn missing_library_is_a_failure() {
        let out = extractor().extract(b"%PDF-1.4 truncated");
        match out.status {
            ExtractionStatus::Failed(reason) => {
                assert!(reason.starts_with("cannot read PDF"), "got: {reason}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn scratch_pdf_is_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor().with_scratch_dir(Some(dir.path().to_path_buf()));

        let out = extractor.extract(b"%PDF-1.4 truncated");
        assert!(matches!(out.status, ExtractionStatus::Failed(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn probe_names_missing_library() {
        let err = missing_library().probe().unwrap_err();
        assert!(err.contains("libpdfium.so"), "got: {err}");
    }
}
