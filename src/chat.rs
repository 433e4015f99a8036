//! The chat service: ingest uploads into a session and answer messages.
//!
//! Every handler takes the [`Session`] by value and hands it back inside its
//! response, so callers hold exactly one copy of the state and nothing is
//! shared between users.
//!
//! ```rust,no_run
//! use doc2chat::{ChatConfig, ChatService, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ChatService::new(ChatConfig::default())?;
//!     let session = service.new_session();
//!
//!     let doc = UploadedDocument::new("notes.txt", b"The launch is on Friday.".to_vec());
//!     let uploaded = service.upload(session, doc).await;
//!
//!     let answer = service.send(uploaded.session, "When is the launch?").await;
//!     println!("{}", answer.reply);
//!     Ok(())
//! }
//! ```

use crate::config::ChatConfig;
use crate::document::UploadedDocument;
use crate::error::DocChatError;
use crate::pipeline::assemble::assemble_context;
use crate::pipeline::extract::ExtractorRegistry;
use crate::pipeline::ingest::{FileProcessor, IngestOutcome};
use crate::pipeline::llm::{InferenceBackend, InferenceReply, OllamaClient};
use crate::progress::{IngestProgressCallback, NoopProgressCallback};
use crate::prompts;
use crate::session::{ConversationTurn, Session};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Why a canned reply was used instead of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Inference is switched off for the session.
    Disabled,
    /// The liveness probe failed.
    BackendDown,
    /// The probe passed but generation did not.
    GenerationFailed(String),
}

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Model,
    Fallback(FallbackReason),
}

impl ReplySource {
    pub fn is_model(&self) -> bool {
        matches!(self, ReplySource::Model)
    }
}

/// Result of [`ChatService::send`].
#[derive(Debug)]
pub struct ChatResponse {
    pub session: Session,
    pub reply: String,
    pub source: ReplySource,
    /// Time spent waiting on the backend, probe included.
    pub duration_ms: u64,
}

/// Result of [`ChatService::upload`] / [`ChatService::upload_all`].
#[derive(Debug)]
pub struct UploadResponse {
    pub session: Session,
    /// One entry per upload, in upload order.
    pub outcomes: Vec<IngestOutcome>,
}

/// Ties extraction, context assembly and inference together.
pub struct ChatService {
    config: ChatConfig,
    processor: FileProcessor,
    backend: Arc<dyn InferenceBackend>,
}

impl ChatService {
    /// Probe the local engines and build an Ollama client from `config`.
    pub fn new(config: ChatConfig) -> Result<Self, DocChatError> {
        let registry = ExtractorRegistry::detect(&config);
        let backend = OllamaClient::new(
            config.base_url.clone(),
            config.probe_timeout(),
            config.generate_timeout(),
        )?;
        Ok(Self::with_parts(config, registry, Arc::new(backend)))
    }

    /// Assemble a service from explicit parts.
    pub fn with_parts(
        config: ChatConfig,
        registry: ExtractorRegistry,
        backend: Arc<dyn InferenceBackend>,
    ) -> Self {
        debug!("Extractors: {:?}", registry);
        Self {
            config,
            processor: FileProcessor::new(Arc::new(registry)),
            backend,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        self.processor.registry()
    }

    /// Start a session with inference set from the configuration.
    pub fn new_session(&self) -> Session {
        Session::new(self.config.inference_enabled)
    }

    pub async fn backend_available(&self) -> bool {
        self.backend.is_available().await
    }

    /// Ingest one upload.
    pub async fn upload(&self, session: Session, doc: UploadedDocument) -> UploadResponse {
        self.upload_all(session, vec![doc]).await
    }

    /// Ingest uploads one after another, in order.
    ///
    /// Each upload that becomes active adds a user turn carrying the
    /// extracted text (or its placeholder) to the conversation.
    pub async fn upload_all(
        &self,
        mut session: Session,
        docs: Vec<UploadedDocument>,
    ) -> UploadResponse {
        let noop = NoopProgressCallback;
        let progress: &dyn IngestProgressCallback = match &self.config.progress_callback {
            Some(cb) => cb.as_ref(),
            None => &noop,
        };

        let total = docs.len();
        progress.on_ingest_start(total);

        let mut outcomes = Vec::with_capacity(total);
        let mut extracted = 0;
        for (idx, doc) in docs.into_iter().enumerate() {
            let index = idx + 1;
            let name = doc.name.clone();
            let cached = session.documents.cached(&name).is_some();
            if cached {
                progress.on_file_duplicate(index, total, &name);
            } else {
                progress.on_file_start(index, total, &name);
            }

            let outcome = self.processor.ingest(&mut session.documents, doc).await;

            if !outcome.duplicate {
                let chars = outcome.result.text.chars().count();
                progress.on_file_complete(index, total, &name, chars);
                if outcome.result.is_ok() {
                    extracted += 1;
                }
            }

            if outcome.attached {
                let result = &outcome.result;
                let text = prompts::upload_turn(
                    result.kind().label(),
                    result.name(),
                    result.display_text(),
                );
                session
                    .conversation
                    .push(ConversationTurn::user(text, vec![Arc::clone(result)]));
            }

            outcomes.push(outcome);
        }

        progress.on_ingest_complete(total, extracted);
        info!(
            "Session {}: {} upload(s), {} extracted, {} active document(s)",
            session.id,
            total,
            extracted,
            session.documents.len()
        );

        UploadResponse { session, outcomes }
    }

    /// Answer a message against the session's active documents.
    ///
    /// Never fails: when the backend is off, down or misbehaving the reply
    /// comes from the canned set, chosen by how many user turns the
    /// conversation already has.
    pub async fn send(&self, mut session: Session, prompt: &str) -> ChatResponse {
        let start = Instant::now();
        let documents = session.documents.active().to_vec();
        let turn = session.conversation.user_turns();
        session
            .conversation
            .push(ConversationTurn::user(prompt, documents.clone()));

        let source = if !session.inference_enabled {
            ReplySource::Fallback(FallbackReason::Disabled)
        } else if !self.backend.is_available().await {
            ReplySource::Fallback(FallbackReason::BackendDown)
        } else {
            let assembled = assemble_context(prompt, &documents, self.config.max_context_chars);
            debug!(
                "Prompt of {} chars with {} document(s)",
                assembled.chars().count(),
                documents.len()
            );
            match self.backend.generate(&assembled, &self.config.model).await {
                InferenceReply::Text(text) => {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    session
                        .conversation
                        .push(ConversationTurn::assistant(text.clone()));
                    info!("Session {}: model reply in {}ms", session.id, duration_ms);
                    return ChatResponse {
                        session,
                        reply: text,
                        source: ReplySource::Model,
                        duration_ms,
                    };
                }
                InferenceReply::Unavailable(reason) => {
                    ReplySource::Fallback(FallbackReason::GenerationFailed(reason))
                }
            }
        };

        let reply = prompts::fallback_reply(prompt, documents.len(), turn);
        session
            .conversation
            .push(ConversationTurn::assistant(reply.clone()));
        info!("Session {}: fallback reply ({:?})", session.id, source);

        ChatResponse {
            session,
            reply,
            source,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("config", &self.config)
            .field("registry", self.registry())
            .finish()
    }
}
