//! Image OCR through the Tesseract command-line engine.
//!
//! The engine reads its input from a file, so the pre-processed bitmap is
//! written to a scratch PNG owned by a [`tempfile::NamedTempFile`]; the file
//! is removed when the handle drops, whether recognition succeeded or not.

use super::{scratch_file, TextExtractor};
use crate::document::DocumentKind;
use crate::error::ExtractError;
use crate::pipeline::preprocess::prepare_for_ocr;
use image::{DynamicImage, GrayImage, ImageFormat};
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::debug;

/// A Tesseract binary plus the recognition settings passed to it.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
    language: String,
    scratch_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            scratch_dir: None,
        }
    }

    /// Write scratch images to `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Check the binary runs; returns its version line.
    pub fn probe(&self) -> Result<String, String> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| format!("cannot run '{}': {e}", self.command))?;

        if !output.status.success() {
            return Err(format!("'{} --version' exited with {}", self.command, output.status));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or("tesseract")
            .trim()
            .to_string())
    }

    /// Recognise text in an already pre-processed bitmap.
    pub fn recognize(&self, bitmap: &GrayImage) -> Result<String, ExtractError> {
        let scratch = scratch_file("doc2chat-ocr-", ".png", self.scratch_dir.as_deref())?;

        bitmap
            .save_with_format(scratch.path(), ImageFormat::Png)
            .map_err(|e| ExtractError::Ocr(format!("cannot write scratch image: {e}")))?;

        // --oem 3: default LSTM engine; --psm 6: assume one uniform block of text.
        let output = Command::new(&self.command)
            .arg(scratch.path())
            .arg("stdout")
            .args(["-l", &self.language, "--oem", "3", "--psm", "6"])
            .output()
            .map_err(|e| ExtractError::Ocr(format!("cannot run '{}': {e}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr(format!("{} ({})", stderr.trim(), output.status)));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR recognised {} chars", text.len());
        Ok(text)
    }

    /// Pre-process a decoded image and recognise it.
    pub fn recognize_image(&self, img: &DynamicImage) -> Result<String, ExtractError> {
        self.recognize(&prepare_for_ocr(img))
    }
}

/// PNG/JPEG uploads: decode, pre-process, OCR.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    engine: Arc<TesseractEngine>,
}

impl ImageExtractor {
    pub fn new(engine: Arc<TesseractEngine>) -> Self {
        Self { engine }
    }
}

impl TextExtractor for ImageExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Image
    }

    fn name(&self) -> &str {
        "tesseract"
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let img =
            image::load_from_memory(bytes).map_err(|e| ExtractError::ImageDecode(e.to_string()))?;
        debug!("Decoded image {}x{} px", img.width(), img.height());
        self.engine.recognize_image(&img)
    }
}
