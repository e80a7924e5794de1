use crate::bot::transport::Transport;
use crate::domain::quest::QuestSession;
use crate::domain::quiz::QuizSession;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ephemeral per-conversation state, keyed by chat id. Created on first
/// event of a flow, cleared on completion/restart/exit. Does not survive a
/// process restart; the quest resumes from the durable progress row.
#[derive(Debug, Clone)]
pub enum Session {
    Quest(QuestSession),
    Quiz(QuizSession),
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub transport: Arc<dyn Transport>,
    pub sessions: Arc<RwLock<HashMap<i64, Session>>>,
}

impl AppState {
    pub fn new(pool: PgPool, transport: Arc<dyn Transport>) -> Self {
        AppState {
            pool,
            transport,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn session(&self, chat_id: i64) -> Option<Session> {
        self.sessions.read().await.get(&chat_id).cloned()
    }

    pub async fn set_session(&self, chat_id: i64, session: Session) {
        self.sessions.write().await.insert(chat_id, session);
    }

    pub async fn clear_session(&self, chat_id: i64) {
        self.sessions.write().await.remove(&chat_id);
    }
}

pub type SharedState = Arc<AppState>;
