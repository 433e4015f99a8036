//! Pipeline stages from upload to model reply.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ingest ──▶ extract ──▶ sanitize        (on upload)
//! (path/URL) (dedupe)  (per kind)  (cleanup)
//!
//! assemble ──▶ llm                                  (on message)
//! (context)    (Ollama, or Unavailable)
//! ```
//!
//! 1. [`input`]      read a local file or download a URL into memory
//! 2. [`ingest`]     dedupe by name, route to the registered extractor on
//!    the blocking pool
//! 3. [`extract`]    one extractor per document kind, plus the capability
//!    registry resolved at startup
//! 4. [`preprocess`] grayscale, denoise and binarise images before OCR
//! 5. [`sanitize`]   deterministic cleanup of extracted text
//! 6. [`assemble`]   merge document text into the prompt, cut per document
//! 7. [`llm`]        the only stage that talks to the model server

pub mod assemble;
pub mod extract;
pub mod ingest;
pub mod input;
pub mod llm;
pub mod preprocess;
pub mod sanitize;
