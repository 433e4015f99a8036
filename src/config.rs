//! Configuration for a doc2chat service.
//!
//! Everything the service needs at startup lives in [`ChatConfig`], built via
//! [`ChatConfigBuilder`]. Setters clamp obviously out-of-range values;
//! [`ChatConfigBuilder::build`] rejects the rest.

use crate::error::DocChatError;
use crate::progress::IngestProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Characters of each document's text included in the model prompt.
pub const MAX_CONTEXT_CHARS: usize = 800;

/// Base URL of a local Ollama daemon.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model requested from the inference backend.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Configuration for a [`crate::ChatService`].
///
/// # Example
/// ```rust
/// use doc2chat::ChatConfig;
///
/// let config = ChatConfig::builder()
///     .model("mistral")
///     .max_context_chars(1200)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "mistral");
/// ```
#[derive(Clone)]
pub struct ChatConfig {
    /// Base URL of the Ollama-compatible backend. Default: `http://localhost:11434`.
    pub base_url: String,

    /// Model name sent with every generate request. Default: `llama3.2`.
    pub model: String,

    /// Timeout of the `/api/tags` liveness probe, in milliseconds. Default: 1000.
    ///
    /// Kept short: the probe runs before every message and a dead backend
    /// should cost the user about a second, not the full generation timeout.
    pub probe_timeout_ms: u64,

    /// Timeout of one `/api/generate` call, in seconds. Default: 30.
    pub generate_timeout_secs: u64,

    /// Per-document character budget in the assembled prompt. Default: 800.
    pub max_context_chars: usize,

    /// When false, messages are answered from the canned fallback set without
    /// contacting the backend. Default: true.
    pub inference_enabled: bool,

    /// Tesseract executable, looked up on `PATH` unless absolute. Default: `tesseract`.
    pub tesseract_command: String,

    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub ocr_language: String,

    /// OCR PDF pages that have no text layer. Default: false.
    ///
    /// Needs both engines. Rasterising and recognising a page takes seconds,
    /// so scanned PDFs are left as empty unless this is switched on.
    pub pdf_ocr_fallback: bool,

    /// pdfium shared library, or the directory holding it. Default: none
    /// (`PDFIUM_LIB_PATH`, then the system loader).
    pub pdfium_library_path: Option<PathBuf>,

    /// Directory for the scratch files handed to Tesseract and pdfium.
    /// Default: none (the system temp dir).
    pub scratch_dir: Option<PathBuf>,

    /// Download timeout for URL uploads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives ingestion events. Default: none.
    pub progress_callback: Option<Arc<dyn IngestProgressCallback>>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            probe_timeout_ms: 1000,
            generate_timeout_secs: 30,
            max_context_chars: MAX_CONTEXT_CHARS,
            inference_enabled: true,
            tesseract_command: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
            pdf_ocr_fallback: false,
            pdfium_library_path: None,
            scratch_dir: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("probe_timeout_ms", &self.probe_timeout_ms)
            .field("generate_timeout_secs", &self.generate_timeout_secs)
            .field("max_context_chars", &self.max_context_chars)
            .field("inference_enabled", &self.inference_enabled)
            .field("tesseract_command", &self.tesseract_command)
            .field("ocr_language", &self.ocr_language)
            .field("pdf_ocr_fallback", &self.pdf_ocr_fallback)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("scratch_dir", &self.scratch_dir)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn IngestProgressCallback>"),
            )
            .finish()
    }
}

impl ChatConfig {
    /// Create a new builder for `ChatConfig`.
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

/// Builder for [`ChatConfig`].
#[derive(Debug)]
pub struct ChatConfigBuilder {
    config: ChatConfig,
}

impl ChatConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn probe_timeout_ms(mut self, ms: u64) -> Self {
        self.config.probe_timeout_ms = ms.clamp(50, 60_000);
        self
    }

    pub fn generate_timeout_secs(mut self, secs: u64) -> Self {
        self.config.generate_timeout_secs = secs.clamp(1, 3600);
        self
    }

    pub fn max_context_chars(mut self, n: usize) -> Self {
        self.config.max_context_chars = n;
        self
    }

    pub fn inference_enabled(mut self, v: bool) -> Self {
        self.config.inference_enabled = v;
        self
    }

    pub fn tesseract_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_command = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn pdf_ocr_fallback(mut self, v: bool) -> Self {
        self.config.pdf_ocr_fallback = v;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn IngestProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ChatConfig, DocChatError> {
        let c = &self.config;

        let url = reqwest::Url::parse(&c.base_url).map_err(|e| {
            DocChatError::InvalidConfig(format!("base URL '{}' is not a URL: {}", c.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DocChatError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.model.trim().is_empty() {
            return Err(DocChatError::InvalidConfig("model name is empty".into()));
        }
        if c.max_context_chars == 0 {
            return Err(DocChatError::InvalidConfig("max context chars must be ≥ 1".into()));
        }
        if c.tesseract_command.trim().is_empty() {
            return Err(DocChatError::InvalidConfig("tesseract command is empty".into()));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(DocChatError::InvalidConfig("OCR language is empty".into()));
        }
        if let Some(dir) = &c.scratch_dir {
            if !dir.is_dir() {
                return Err(DocChatError::InvalidConfig(format!(
                    "scratch dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }

        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_ollama() {
        let config = ChatConfig::builder().build().unwrap();
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.probe_timeout(), Duration::from_secs(1));
        assert_eq!(config.generate_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_context_chars, 800);
        assert!(config.inference_enabled);
        assert!(!config.pdf_ocr_fallback);
        assert!(config.pdfium_library_path.is_none());
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn scratch_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChatConfig::builder()
            .scratch_dir(dir.path())
            .build()
            .unwrap();
        assert_eq!(config.scratch_dir.as_deref(), Some(dir.path()));

        let missing = dir.path().join("missing");
        assert!(ChatConfig::builder().scratch_dir(missing).build().is_err());
    }

    #[test]
    fn trailing_slash_is_dropped() {
        let config = ChatConfig::builder()
            .base_url("http://127.0.0.1:9999/")
            .build()
            .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            ChatConfig::builder().base_url("not a url").build(),
            Err(DocChatError::InvalidConfig(_))
        ));
        assert!(matches!(
            ChatConfig::builder().base_url("ftp://example.com").build(),
            Err(DocChatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_empty_fields() {
        assert!(ChatConfig::builder().model(" ").build().is_err());
        assert!(ChatConfig::builder().max_context_chars(0).build().is_err());
        assert!(ChatConfig::builder().tesseract_command("").build().is_err());
        assert!(ChatConfig::builder().ocr_language("").build().is_err());
    }

    #[test]
    fn timeouts_are_clamped() {
        let config = ChatConfig::builder()
            .probe_timeout_ms(0)
            .generate_timeout_secs(0)
            .download_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(config.probe_timeout_ms, 50);
        assert_eq!(config.generate_timeout_secs, 1);
        assert_eq!(config.download_timeout_secs, 1);
    }

    #[test]
    fn debug_hides_callback() {
        let config = ChatConfig::builder()
            .progress_callback(Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        assert!(format!("{config:?}").contains("<dyn IngestProgressCallback>"));
    }
}
