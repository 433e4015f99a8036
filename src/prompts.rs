//! Every user-visible fixed string: context headers, placeholders and the
//! canned fallback replies.
//!
//! Keeping them in one place means the wording a user sees, and the exact
//! layout the model receives, can be changed without touching pipeline
//! logic. Tests import these constants directly.

use crate::document::DocumentKind;

/// Separator placed between the user's prompt and the first document block.
pub const CONTEXT_HEADER: &str = "\n\nReference from uploaded documents:\n";

/// Marker appended to a document block cut at the context limit.
pub const ELLIPSIS: &str = "...";

/// Per-document header inside the assembled prompt.
pub fn document_header(name: &str, label: &str) -> String {
    format!("\n--- {name} ({label}) ---\n")
}

/// Placeholder shown when an extractor ran but found no text.
pub fn empty_placeholder(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Image => "No text found in the image.",
        DocumentKind::Pdf => "No extractable text found in PDF.",
        DocumentKind::Word => "No text found in DOCX file.",
        DocumentKind::Text => "No text found in TXT file.",
        DocumentKind::Unknown => "No text found.",
    }
}

/// Placeholder shown when an extractor failed.
pub fn failure_message(kind: DocumentKind, reason: &str) -> String {
    let prefix = match kind {
        DocumentKind::Image => "OCR Error",
        DocumentKind::Pdf => "PDF Processing Error",
        DocumentKind::Word => "DOCX Processing Error",
        DocumentKind::Text => "TXT Processing Error",
        DocumentKind::Unknown => "Processing Error",
    };
    format!("{prefix}: {reason}")
}

/// Placeholder for an upload whose extension maps to no known kind.
pub fn unsupported_message(content_type: &str) -> String {
    format!("Unsupported file type: {content_type}")
}

/// Placeholder for a known kind whose engine was not found at startup.
pub fn unavailable_message(kind: DocumentKind, reason: &str) -> String {
    format!("{} processing unavailable: {reason}", kind.engine_name())
}

/// User turn recorded in the conversation after an upload.
pub fn upload_turn(label: &str, name: &str, body: &str) -> String {
    format!("Extracted text from {label} {name}:\n\n{body}")
}

/// Replies used when no documents are attached and the model is unavailable.
pub const GREETING_FALLBACKS: [&str; 5] = [
    "Hello! How can I assist today?",
    "I'm here to help you with whatever you need!",
    "Let's get started 🚀",
    "What would you like to explore today?",
    "Ready to help! What's on your mind?",
];

/// Replies used when documents are attached and the model is unavailable.
pub fn document_fallbacks(doc_count: usize, prompt: &str) -> [String; 3] {
    [
        format!(
            "I've analyzed your {doc_count} uploaded document(s). Regarding '{prompt}', I can help you work with the content."
        ),
        format!(
            "Based on your documents, I can assist you with '{prompt}'. The files contain relevant information we can discuss."
        ),
        format!(
            "I see you've uploaded {doc_count} document(s). Let me help you analyze them in relation to: '{prompt}'"
        ),
    ]
}

/// Pick the canned reply for a message.
///
/// `turn` is the number of user turns so far; the choice rotates through the
/// set deterministically so identical sessions yield identical transcripts.
pub fn fallback_reply(prompt: &str, doc_count: usize, turn: usize) -> String {
    if doc_count == 0 {
        GREETING_FALLBACKS[turn % GREETING_FALLBACKS.len()].to_string()
    } else {
        let mut set = document_fallbacks(doc_count, prompt);
        let idx = turn % set.len();
        std::mem::take(&mut set[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_rotation_wraps() {
        assert_eq!(fallback_reply("hi", 0, 0), GREETING_FALLBACKS[0]);
        assert_eq!(fallback_reply("hi", 0, 6), GREETING_FALLBACKS[1]);
    }

    #[test]
    fn document_fallback_mentions_prompt() {
        let reply = fallback_reply("summarise", 2, 0);
        assert!(reply.contains("2 uploaded document(s)"));
        assert!(reply.contains("'summarise'"));
        assert!(document_fallbacks(2, "summarise").contains(&reply));
    }

    #[test]
    fn header_layout() {
        assert_eq!(
            document_header("a.txt", "Text File"),
            "\n--- a.txt (Text File) ---\n"
        );
    }

    #[test]
    fn failure_prefix_per_kind() {
        assert_eq!(
            failure_message(DocumentKind::Text, "bad bytes"),
            "TXT Processing Error: bad bytes"
        );
        assert!(failure_message(DocumentKind::Image, "x").starts_with("OCR Error"));
    }
}
