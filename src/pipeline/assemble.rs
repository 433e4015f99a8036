//! Context assembly: fold attached documents into the user's prompt.
//!
//! ```text
//! <prompt>
//!
//! Reference from uploaded documents:
//!
//! --- notes.txt (Text File) ---
//! <first 800 chars of notes.txt>...
//! --- scan.png (Image) ---
//! <scan.png text>
//! ```
//!
//! Each document is cut independently, by character count, so one long
//! file cannot crowd the others out of the prompt.

use crate::document::ExtractionResult;
use crate::prompts::{document_header, CONTEXT_HEADER, ELLIPSIS};
use std::sync::Arc;

/// Build the string sent to the model.
///
/// With no documents the prompt is returned unchanged.
pub fn assemble_context(
    prompt: &str,
    documents: &[Arc<ExtractionResult>],
    max_chars: usize,
) -> String {
    if documents.is_empty() {
        return prompt.to_string();
    }

    let mut out = String::with_capacity(prompt.len() + documents.len() * (max_chars + 64));
    out.push_str(prompt);
    out.push_str(CONTEXT_HEADER);
    for doc in documents {
        out.push_str(&document_header(doc.name(), doc.kind().label()));
        out.push_str(&truncate_chars(doc.display_text(), max_chars));
    }
    out
}

/// First `max_chars` characters of `text`, with `...` appended if anything
/// was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
