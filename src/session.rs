use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::SessionSettings;
use crate::docs::Document;
use crate::qa::{AnswerResult, AskOptions};

/// One answered question in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub score: f64,
    pub asked_at: i64,
}

/// Per-user state: the loaded document, settings, and Q&A history.
#[derive(Debug, Default)]
pub struct Session {
    pub document: Option<Document>,
    pub settings: SessionSettings,
    history: Vec<HistoryEntry>,
}

impl Session {
    /// Make `doc` the current document. Returns `false` when the same content
    /// is already loaded; otherwise the history is cleared.
    pub fn load_document(&mut self, doc: Document) -> bool {
        if self.document.as_ref().is_some_and(|d| d.id == doc.id) {
            return false;
        }
        self.document = Some(doc);
        self.history.clear();
        true
    }

    pub fn record(&mut self, question: &str, result: &AnswerResult) {
        self.history.push(HistoryEntry {
            question: question.to_string(),
            answer: result.answer.clone(),
            score: result.score,
            asked_at: chrono::Utc::now().timestamp(),
        });
    }

    /// Up to `limit` entries, newest first, each with its 1-based number.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.history
            .iter()
            .enumerate()
            .rev()
            .take(limit)
            .map(|(i, entry)| (i + 1, entry))
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) -> usize {
        let cleared = self.history.len();
        self.history.clear();
        cleared
    }

    /// Options for the next question. Recursive mode needs refinement on and
    /// a generative model available.
    pub fn ask_options(&self, generative_enabled: bool) -> AskOptions {
        let refine = self.settings.refine && generative_enabled;
        AskOptions {
            max_answer_length: self.settings.max_answer_length,
            refine,
            recursive: refine && self.settings.recursive,
        }
    }
}

/// Sessions keyed by user ID. Each session has its own lock, so a user's
/// questions run one at a time while other users proceed.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<u64, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: u64) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return session.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id)
            .or_insert_with(|| {
                debug!(user_id, "new session");
                Arc::new(Mutex::new(Session::default()))
            })
            .clone()
    }

    /// End a user's session, discarding its document and history.
    pub async fn end(&self, user_id: u64) -> bool {
        self.sessions.write().await.remove(&user_id).is_some()
    }
}
