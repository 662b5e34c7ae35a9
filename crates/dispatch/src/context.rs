//! Per-conversation context store.
//!
//! Keyed by conversation id, created lazily on first reference. Each
//! conversation keeps the last resolved entity and a bounded turn
//! history (oldest evicted first). Idle conversations are dropped
//! after a timeout, and the store itself holds at most
//! `max_conversations` entries with the oldest-touched evicted first.

use blotter_core::handler::{ResolvedEntity, TurnContext};
use blotter_core::message::{ConversationId, Role, Turn};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

/// One conversation's carried state.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub last_entity: Option<ResolvedEntity>,
    pub recent_turns: VecDeque<Turn>,
    last_touched: DateTime<Utc>,
}

impl ConversationContext {
    fn new() -> Self {
        Self {
            last_entity: None,
            recent_turns: VecDeque::new(),
            last_touched: Utc::now(),
        }
    }
}

pub struct ContextStore {
    max_turns: usize,
    max_conversations: usize,
    idle_timeout: Duration,
    inner: RwLock<HashMap<ConversationId, ConversationContext>>,
}

impl ContextStore {
    pub fn new(config: &blotter_config::ContextConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            max_conversations: config.max_conversations,
            idle_timeout: Duration::minutes(config.idle_timeout_minutes as i64),
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Read-only snapshot for a handler call: the carried entity plus
    /// the user-side turn history, oldest first. Creates the
    /// conversation on first reference.
    pub async fn snapshot(&self, id: &ConversationId) -> TurnContext {
        let mut map = self.inner.write().await;
        self.evict(&mut map, id);
        let ctx = map.entry(id.clone()).or_insert_with(ConversationContext::new);
        ctx.last_touched = Utc::now();

        TurnContext {
            conversation_id: id.to_string(),
            last_entity: ctx.last_entity.clone(),
            history: ctx
                .recent_turns
                .iter()
                .filter(|turn| turn.role == Role::User)
                .map(|turn| turn.content.clone())
                .collect(),
        }
    }

    /// Append a turn, evicting the oldest once `max_turns` is reached.
    pub async fn record_turn(&self, id: &ConversationId, turn: Turn) {
        let mut map = self.inner.write().await;
        self.evict(&mut map, id);
        let ctx = map.entry(id.clone()).or_insert_with(ConversationContext::new);
        ctx.last_touched = Utc::now();
        ctx.recent_turns.push_back(turn);
        while ctx.recent_turns.len() > self.max_turns {
            ctx.recent_turns.pop_front();
        }
    }

    /// Overwrite the carried entity — last write wins, no merging.
    pub async fn set_entity(&self, id: &ConversationId, entity: ResolvedEntity) {
        let mut map = self.inner.write().await;
        let ctx = map.entry(id.clone()).or_insert_with(ConversationContext::new);
        ctx.last_touched = Utc::now();
        debug!(conversation = %id, entity = %entity.name, "Carrying entity forward");
        ctx.last_entity = Some(entity);
    }

    pub async fn entity(&self, id: &ConversationId) -> Option<ResolvedEntity> {
        self.inner.read().await.get(id).and_then(|c| c.last_entity.clone())
    }

    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drop idle conversations, then make room for `incoming` if the
    /// store is full, evicting the oldest-touched entry.
    fn evict(
        &self,
        map: &mut HashMap<ConversationId, ConversationContext>,
        incoming: &ConversationId,
    ) {
        let cutoff = Utc::now() - self.idle_timeout;
        map.retain(|id, ctx| id == incoming || ctx.last_touched >= cutoff);

        while map.len() >= self.max_conversations && !map.contains_key(incoming) {
            let oldest = map
                .iter()
                .min_by_key(|(_, ctx)| ctx.last_touched)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!(conversation = %id, "Evicting oldest conversation");
                    map.remove(&id);
                }
                None => break,
            }
        }
    }
}
