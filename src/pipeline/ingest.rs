//! File processor: route an upload to its extractor and record the result.
//!
//! Uploads are deduplicated by name within a session. The first upload of a
//! name is extracted; any later one, even with different bytes, re-attaches
//! the stored result.

use crate::document::{
    DocumentKind, Extraction, ExtractionResult, ExtractionStatus, UploadedDocument,
};
use crate::pipeline::extract::{Capability, ExtractorRegistry};
use crate::prompts;
use crate::session::DocumentStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What ingesting one upload produced.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub result: Arc<ExtractionResult>,
    /// True when the name had been ingested before and nothing was extracted.
    pub duplicate: bool,
    /// True when this call added the result to the active documents.
    pub attached: bool,
}

/// Dispatches uploads to the extractors in a [`ExtractorRegistry`].
#[derive(Debug, Clone)]
pub struct FileProcessor {
    registry: Arc<ExtractorRegistry>,
}

impl FileProcessor {
    pub fn new(registry: Arc<ExtractorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Ingest one upload into `store`.
    pub async fn ingest(&self, store: &mut DocumentStore, doc: UploadedDocument) -> IngestOutcome {
        if let Some(existing) = store.cached(&doc.name) {
            let existing = Arc::clone(existing);
            debug!("'{}' already ingested, reusing stored result", doc.name);
            let attached = store.attach(Arc::clone(&existing));
            return IngestOutcome {
                result: existing,
                duplicate: true,
                attached,
            };
        }

        let result = Arc::new(self.process(doc).await);
        store.insert(Arc::clone(&result));
        IngestOutcome {
            result,
            duplicate: false,
            attached: true,
        }
    }

    /// Extract one upload without touching any session state.
    pub async fn process(&self, doc: UploadedDocument) -> ExtractionResult {
        let doc = Arc::new(doc);
        let kind = doc.kind;

        if kind == DocumentKind::Unknown {
            info!("'{}': unsupported type {}", doc.name, doc.content_type);
            let notice = prompts::unsupported_message(&doc.content_type);
            return ExtractionResult::unsupported(doc, notice);
        }

        let extractor = match self.registry.get(kind) {
            Capability::Available(extractor) => Arc::clone(extractor),
            Capability::Unavailable(reason) => {
                warn!("'{}': {} extractor unavailable", doc.name, kind);
                let notice = prompts::unavailable_message(kind, reason);
                return ExtractionResult::unsupported(doc, notice);
            }
            Capability::Missing => {
                info!("'{}': no {} extractor registered", doc.name, kind);
                let notice = prompts::unsupported_message(&doc.content_type);
                return ExtractionResult::unsupported(doc, notice);
            }
        };

        debug!(
            "'{}': extracting {} bytes with {}",
            doc.name,
            doc.size_bytes,
            extractor.name()
        );

        let source = Arc::clone(&doc);
        let extraction = tokio::task::spawn_blocking(move || extractor.extract(&source.raw_bytes))
            .await
            .unwrap_or_else(|e| Extraction::failed(format!("extraction task panicked: {e}")));

        let result = ExtractionResult::from_extraction(doc, extraction);
        match &result.status {
            ExtractionStatus::Ok => info!(
                "'{}' ({}): extracted {} chars",
                result.name(),
                kind,
                result.text.chars().count()
            ),
            ExtractionStatus::Empty => info!("'{}' ({}): no text found", result.name(), kind),
            ExtractionStatus::Failed(reason) => {
                warn!(
                    "'{}' ({}): extraction failed: {}",
                    result.name(),
                    kind,
                    reason
                )
            }
            ExtractionStatus::Unsupported => {}
        }
        result
    }
}
