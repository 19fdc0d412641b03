//! Session protocol: a `ContextAssemblySession` holds conversational state
//! across `start`/`followUp`/`drillDown`/`summarize`/`close`, enforcing a
//! concurrency cap, a per-session pack cap, a TTL, and serialized mutation
//! per session via a fair lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::{QueryError, Result};
use crate::query::{Query, QueryEngine, QueryResult};

pub const MAX_CONCURRENT_SESSIONS: usize = 50;
pub const PACK_CAP: usize = 200;
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum TurnType {
    Start,
    FollowUp,
    DrillDown,
    Summarize,
}

#[derive(Debug, Clone)]
pub struct SessionTurn {
    pub turn_type: TurnType,
    pub question: Option<String>,
    pub response: Option<String>,
    pub pack_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// One conversational thread: an initial query plus every follow-up,
/// drill-down, and summary turn taken against it.
pub struct ContextAssemblySession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub turns: Vec<SessionTurn>,
    pub explored_entities: Vec<String>,
    pub pack_count: usize,
    last_query: Query,
}

impl ContextAssemblySession {
    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    fn expired(&self) -> bool {
        Utc::now().signed_duration_since(self.last_activity).to_std().unwrap_or_default() > SESSION_TTL
    }

    fn record_turn(&mut self, turn_type: TurnType, question: Option<String>, response: Option<String>, pack_ids: Vec<String>) {
        self.pack_count += pack_ids.len();
        self.turns.push(SessionTurn { turn_type, question, response, pack_ids, created_at: Utc::now() });
        self.touch();
    }
}

/// Owns every live session, enforcing the concurrency cap and routing
/// follow-up/drill-down turns through per-session fair locks.
#[derive(Clone)]
pub struct SessionManager {
    engine: QueryEngine,
    sessions: Arc<Mutex<HashMap<String, Arc<Mutex<ContextAssemblySession>>>>>,
}

impl SessionManager {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine, sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    async fn evict_expired(&self, sessions: &mut HashMap<String, Arc<Mutex<ContextAssemblySession>>>) {
        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.lock().await.expired() {
                expired.push(id.clone());
            }
        }
        for id in expired {
            sessions.remove(&id);
        }
    }

    /// Starts a new session by running `query` and seeding the turn log with
    /// its result.
    pub async fn start(&self, query: Query) -> Result<(String, QueryResult)> {
        let mut sessions = self.sessions.lock().await;
        self.evict_expired(&mut sessions).await;

        if sessions.len() >= MAX_CONCURRENT_SESSIONS {
            return Err(QueryError::SessionLimitExceeded(format!(
                "{MAX_CONCURRENT_SESSIONS} concurrent sessions already open"
            )));
        }

        let result = self.engine.query(&query).await?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let pack_ids: Vec<String> = result.packs.iter().map(|p| p.pack_id.clone()).collect();

        let mut session = ContextAssemblySession {
            id: id.clone(),
            created_at: now,
            last_activity: now,
            turns: Vec::new(),
            explored_entities: Vec::new(),
            pack_count: 0,
            last_query: query,
        };
        session.record_turn(TurnType::Start, None, None, pack_ids);

        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, "session started");
        Ok((id, result))
    }

    async fn locked_session(&self, id: &str) -> Result<Arc<Mutex<ContextAssemblySession>>> {
        let sessions = self.sessions.lock().await;
        sessions.get(id).cloned().ok_or_else(|| QueryError::SessionNotFound(id.to_string()))
    }

    /// Runs a new query scoped by the session's current focus, appending a
    /// `FollowUp` turn.
    pub async fn follow_up(&self, id: &str, question: &str) -> Result<QueryResult> {
        if question.trim().is_empty() {
            return Err(QueryError::SessionInvalidQuestion("question must not be empty".to_string()));
        }
        let session_lock = self.locked_session(id).await?;
        let mut session = session_lock.lock().await;
        if session.expired() {
            return Err(QueryError::SessionNotFound(id.to_string()));
        }
        if session.pack_count >= PACK_CAP {
            return Err(QueryError::SessionPackCapExceeded(format!("{id} has reached the {PACK_CAP}-pack cap")));
        }

        let mut query = session.last_query.clone();
        query.intent = question.to_string();
        let result = self.engine.query(&query).await?;
        let pack_ids: Vec<String> = result.packs.iter().map(|p| p.pack_id.clone()).collect();
        session.record_turn(TurnType::FollowUp, Some(question.to_string()), result.synthesis.as_ref().map(|s| s.answer.clone()), pack_ids);
        session.last_query = query;
        Ok(result)
    }

    /// Adds `entity` to the explored set and re-queries focused on it,
    /// appending a `DrillDown` turn.
    pub async fn drill_down(&self, id: &str, entity: &str) -> Result<QueryResult> {
        let session_lock = self.locked_session(id).await?;
        let mut session = session_lock.lock().await;
        if session.expired() {
            return Err(QueryError::SessionNotFound(id.to_string()));
        }
        if session.pack_count >= PACK_CAP {
            return Err(QueryError::SessionPackCapExceeded(format!("{id} has reached the {PACK_CAP}-pack cap")));
        }

        session.explored_entities.push(entity.to_string());
        let mut query = session.last_query.clone();
        query.intent = entity.to_string();
        let result = self.engine.query(&query).await?;
        let pack_ids: Vec<String> = result.packs.iter().map(|p| p.pack_id.clone()).collect();
        session.record_turn(TurnType::DrillDown, Some(entity.to_string()), None, pack_ids);
        session.last_query = query;
        Ok(result)
    }

    /// Joins every turn's question/response into one transcript string;
    /// doesn't call back into the query engine.
    pub async fn summarize(&self, id: &str) -> Result<String> {
        let session_lock = self.locked_session(id).await?;
        let mut session = session_lock.lock().await;
        let mut lines = Vec::new();
        for turn in &session.turns {
            if let Some(question) = &turn.question {
                lines.push(format!("Q: {question}"));
            }
            if let Some(response) = &turn.response {
                lines.push(format!("A: {response}"));
            }
        }
        let summary = lines.join("\n");
        session.record_turn(TurnType::Summarize, None, Some(summary.clone()), vec![]);
        Ok(summary)
    }

    pub async fn close(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(id).ok_or_else(|| QueryError::SessionNotFound(id.to_string()))?;
        Ok(())
    }
}
