//! Per-user chat state: the live conversation, the documents attached to it
//! and the archive of earlier chats.
//!
//! A [`Session`] is created by [`crate::ChatService::new_session`] and moved
//! through each handler call, which hands it back inside its response. It
//! lives only in process memory.

use crate::document::ExtractionResult;
use crate::prompts::ELLIPSIS;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Characters of the first user message kept as an archived chat's title.
pub const TITLE_CHARS: usize = 30;

/// How many archived chats [`Session::recent_chats`] returns.
pub const RECENT_CHATS: usize = 10;

/// A fresh 8-character identifier.
pub fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// Extractions this turn refers to, in ingestion order.
    pub attachments: Vec<Arc<ExtractionResult>>,
    pub at: DateTime<Local>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>, attachments: Vec<Arc<ExtractionResult>>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            attachments,
            at: Local::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            attachments: Vec::new(),
            at: Local::now(),
        }
    }
}

/// Append-only list of turns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn user_turns(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }

    /// Archive title: the first user message cut to [`TITLE_CHARS`] plus `...`.
    pub fn title(&self) -> String {
        let first = self
            .turns
            .iter()
            .find(|t| t.role == Role::User)
            .or_else(|| self.turns.first())
            .map(|t| t.text.as_str())
            .unwrap_or("");
        let head: String = first.chars().take(TITLE_CHARS).collect();
        format!("{head}{ELLIPSIS}")
    }

    fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }
}

/// Extraction results known to a session.
///
/// `active` is what the next message is answered against; the cache
/// remembers every name ever ingested so a repeated upload is never
/// extracted twice.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    active: Vec<Arc<ExtractionResult>>,
    cache: HashMap<String, Arc<ExtractionResult>>,
}

impl DocumentStore {
    /// Previously ingested result for `name`, active or not.
    pub fn cached(&self, name: &str) -> Option<&Arc<ExtractionResult>> {
        self.cache.get(name)
    }

    /// Remember a freshly extracted result and make it active.
    pub fn insert(&mut self, result: Arc<ExtractionResult>) {
        self.cache
            .insert(result.name().to_string(), Arc::clone(&result));
        self.attach(result);
    }

    /// Make a result active unless a document of that name already is.
    /// Returns whether it was added.
    pub fn attach(&mut self, result: Arc<ExtractionResult>) -> bool {
        if self.is_active(result.name()) {
            return false;
        }
        self.active.push(result);
        true
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|r| r.name() == name)
    }

    /// Active results in ingestion order.
    pub fn active(&self) -> &[Arc<ExtractionResult>] {
        &self.active
    }

    pub fn find(&self, name: &str) -> Option<&Arc<ExtractionResult>> {
        self.active.iter().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Detach everything; the cache is kept.
    pub fn clear_active(&mut self) {
        self.active.clear();
    }

    /// Forget everything, cache included.
    pub fn clear_all(&mut self) {
        self.active.clear();
        self.cache.clear();
    }
}

/// A finished conversation kept for later restore.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedChat {
    pub id: String,
    pub title: String,
    /// Archive time as `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
    pub turns: Vec<ConversationTurn>,
}

/// All state belonging to one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Local>,
    pub conversation: Conversation,
    pub documents: DocumentStore,
    pub inference_enabled: bool,
    archive: Vec<ArchivedChat>,
}

impl Session {
    pub fn new(inference_enabled: bool) -> Self {
        let session = Self {
            id: short_id(),
            started_at: Local::now(),
            conversation: Conversation::default(),
            documents: DocumentStore::default(),
            inference_enabled,
            archive: Vec::new(),
        };
        info!("Session {} started", session.id);
        session
    }

    /// Archive the current conversation (if any) and start an empty one.
    ///
    /// Active documents are detached; the ingest cache survives, so
    /// re-uploading a file re-attaches its stored result. Returns the id of
    /// the archived chat.
    pub fn new_chat(&mut self) -> Option<String> {
        let archived = self.archive_current();
        self.documents.clear_active();
        archived
    }

    /// Replace the live conversation with an archived one.
    ///
    /// The current conversation is archived first so nothing is lost.
    /// Returns false if no archived chat has that id.
    pub fn restore_chat(&mut self, id: &str) -> bool {
        let Some(pos) = self.archive.iter().position(|c| c.id == id) else {
            return false;
        };
        let chat = self.archive.remove(pos);
        self.archive_current();
        self.documents.clear_active();

        let mut conversation = Conversation::default();
        for turn in chat.turns {
            conversation.push(turn);
        }
        self.conversation = conversation;
        info!("Session {}: restored chat {}", self.id, chat.id);
        true
    }

    /// Archived chats, newest first, at most [`RECENT_CHATS`].
    pub fn recent_chats(&self) -> impl Iterator<Item = &ArchivedChat> {
        self.archive.iter().rev().take(RECENT_CHATS)
    }

    pub fn archived_len(&self) -> usize {
        self.archive.len()
    }

    /// Drop the archive, the live conversation and every document.
    pub fn clear_history(&mut self) {
        self.archive.clear();
        self.conversation = Conversation::default();
        self.documents.clear_all();
        info!("Session {}: history cleared", self.id);
    }

    fn archive_current(&mut self) -> Option<String> {
        if self.conversation.is_empty() {
            return None;
        }
        let conversation = std::mem::take(&mut self.conversation);
        let chat = ArchivedChat {
            id: short_id(),
            title: conversation.title(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            turns: conversation.into_turns(),
        };
        debug!(
            "Session {}: archived chat {} ({})",
            self.id, chat.id, chat.title
        );
        let id = chat.id.clone();
        self.archive.push(chat);
        Some(id)
    }
}
