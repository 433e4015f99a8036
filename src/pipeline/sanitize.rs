//! Sanitisation: deterministic cleanup of extracted text.
//!
//! OCR output, PDF text layers and Word runs all carry their own noise:
//! Windows line endings from the producing tool, zero-width joiners and
//! soft hyphens from typesetting, trailing blanks on every OCR line, and long
//! runs of empty lines where a page had whitespace. None of it helps the
//! model, and all of it eats into the per-document context budget.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Strip invisible Unicode (zero-width, BOM, soft hyphen, NUL)
//! 3. Trim trailing whitespace per line
//! 4. Collapse 3+ consecutive blank lines down to 2
//! 5. Trim the whole text

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all sanitisation rules to raw extractor output.
pub fn sanitize_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{0}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}
