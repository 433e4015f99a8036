//! Plain `.txt` uploads, decoded as strict UTF-8.

use super::TextExtractor;
use crate::document::DocumentKind;
use crate::error::ExtractError;

/// UTF-8 plain text. Invalid input fails instead of being lossily decoded.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Text
    }

    fn name(&self) -> &str {
        "utf-8"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ExtractError::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Extraction, ExtractionStatus};

    #[test]
    fn decodes_utf8() {
        assert_eq!(
            PlainTextExtractor.extract(b"hello world"),
            Extraction::ok("hello world")
        );
    }

    #[test]
    fn empty_bytes_are_empty() {
        assert_eq!(PlainTextExtractor.extract(b""), Extraction::empty());
    }

    #[test]
    fn invalid_utf8_fails_with_offset() {
        let out = PlainTextExtractor.extract(b"abc\xff\xfe");
        assert_eq!(
            out.status,
            ExtractionStatus::Failed("invalid UTF-8 sequence at byte 3".into())
        );
        assert!(out.text.is_empty());
    }

    #[test]
    fn keeps_non_ascii() {
        let out = PlainTextExtractor.extract("naïve café ✓".as_bytes());
        assert_eq!(out, Extraction::ok("naïve café ✓"));
    }
}
