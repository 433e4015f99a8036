//! # doc2chat
//!
//! Chat with a local language model about your own documents.
//!
//! Uploads (images, PDFs, Word documents, plain text) are turned into text
//! locally, attached to a chat session, and folded into each message sent to
//! an Ollama-compatible model server. When the server is down the session
//! keeps working with canned replies, so nothing here depends on a model
//! being installed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input     read a local file or download a URL
//!  ├─ 2. Ingest    dedupe by name, pick the extractor for the file type
//!  ├─ 3. Extract   Tesseract OCR / pdfium / DOCX XML / UTF-8 (spawn_blocking)
//!  ├─ 4. Sanitize  normalise line endings, strip invisible characters
//!  │
//! message
//!  ├─ 5. Assemble  prompt + up to 800 chars of every active document
//!  └─ 6. Infer     /api/generate, or a canned reply if unavailable
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2chat::{load_upload, ChatConfig, ChatService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChatConfig::builder().model("llama3.2").build()?;
//!     let service = ChatService::new(config)?;
//!
//!     let doc = load_upload("report.pdf", 120).await?;
//!     let uploaded = service.upload(service.new_session(), doc).await;
//!
//!     let answer = service.send(uploaded.session, "Summarise the report").await;
//!     println!("{}", answer.reply);
//!     Ok(())
//! }
//! ```
//!
//! ## External engines
//!
//! | Document | Engine | When missing |
//! |----------|--------|--------------|
//! | PNG / JPEG | `tesseract` binary on `PATH` | "OCR processing unavailable: …" |
//! | PDF | pdfium shared library (`PDFIUM_LIB_PATH` or system) | "PDF processing unavailable: …" |
//! | DOCX | built in | n/a |
//! | TXT | built in | n/a |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2chat` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2chat = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chat;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chat::{ChatResponse, ChatService, FallbackReason, ReplySource, UploadResponse};
pub use config::{ChatConfig, ChatConfigBuilder, MAX_CONTEXT_CHARS};
pub use document::{
    DocumentKind, Extraction, ExtractionResult, ExtractionStatus, UploadedDocument,
};
pub use error::{DocChatError, ExtractError};
pub use pipeline::assemble::assemble_context;
pub use pipeline::extract::{ExtractorRegistry, TextExtractor};
pub use pipeline::ingest::{FileProcessor, IngestOutcome};
pub use pipeline::input::load_upload;
pub use pipeline::llm::{InferenceBackend, InferenceReply, OllamaClient};
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::{ArchivedChat, Conversation, ConversationTurn, DocumentStore, Role, Session};
