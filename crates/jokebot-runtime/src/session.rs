//! Per-conversation flow state and joke caches.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use jokebot_core::is_expired_unix_ms;
use jokebot_source::Joke;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Opaque identifier of one chat conversation.
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What kind of follow-up message a conversation is waiting for.
pub enum PendingAction {
    AwaitingKeyword,
    AwaitingCustomJoke,
}

impl PendingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingKeyword => "awaiting_keyword",
            Self::AwaitingCustomJoke => "awaiting_custom_joke",
        }
    }
}

/// Default lifetime of cached batches and search hits.
pub const DEFAULT_CACHE_TTL_MS: u64 = 60 * 60 * 1_000;
/// Search hits remembered per conversation; older "Save Joke" buttons go stale.
pub const MAX_FOUND_HITS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    action: PendingAction,
    started_unix_ms: u64,
}

#[derive(Debug)]
struct CachedBatch {
    jokes: Vec<Joke>,
    stored_unix_ms: u64,
}

#[derive(Debug, Default)]
struct FoundHits {
    hits: VecDeque<(u64, Joke)>,
    touched_unix_ms: u64,
}

#[derive(Debug)]
/// In-memory session state, keyed by conversation.
///
/// Entries are created on first touch and removed when a flow ends or their
/// TTL runs out. Nothing here survives a restart.
pub struct SessionStore {
    pending_ttl_ms: u64,
    cache_ttl_ms: u64,
    last_hit_id: u64,
    pending: HashMap<ConversationId, PendingEntry>,
    batches: HashMap<ConversationId, CachedBatch>,
    found: HashMap<ConversationId, FoundHits>,
}

impl SessionStore {
    /// `pending_ttl_ms == 0` keeps pending flows until they are consumed.
    pub fn new(pending_ttl_ms: u64) -> Self {
        Self {
            pending_ttl_ms,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            last_hit_id: 0,
            pending: HashMap::new(),
            batches: HashMap::new(),
            found: HashMap::new(),
        }
    }

    /// Lifetime of cached batches and search hits, counted from the last write.
    pub fn with_cache_ttl_ms(mut self, cache_ttl_ms: u64) -> Self {
        self.cache_ttl_ms = cache_ttl_ms;
        self
    }

    /// Marks the conversation as mid-flow; replaces any earlier flow.
    pub fn begin(&mut self, conversation: ConversationId, action: PendingAction, now_unix_ms: u64) {
        self.pending.insert(
            conversation,
            PendingEntry {
                action,
                started_unix_ms: now_unix_ms,
            },
        );
    }

    pub fn end(&mut self, conversation: ConversationId) -> Option<PendingAction> {
        self.pending.remove(&conversation).map(|entry| entry.action)
    }

    /// Current pending action; expired entries are dropped and read as idle.
    pub fn pending(
        &mut self,
        conversation: ConversationId,
        now_unix_ms: u64,
    ) -> Option<PendingAction> {
        let entry = *self.pending.get(&conversation)?;
        if is_expired_unix_ms(entry.started_unix_ms, self.pending_ttl_ms, now_unix_ms) {
            self.pending.remove(&conversation);
            return None;
        }
        Some(entry.action)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Conversations holding a cached batch or search hit.
    pub fn cached_conversation_count(&self) -> usize {
        let mut conversations = self.batches.keys().collect::<Vec<_>>();
        conversations.extend(self.found.keys());
        conversations.sort();
        conversations.dedup();
        conversations.len()
    }

    /// Drops expired pending flows and caches across all conversations.
    pub fn prune_expired(&mut self, now_unix_ms: u64) {
        let pending_ttl_ms = self.pending_ttl_ms;
        let cache_ttl_ms = self.cache_ttl_ms;
        self.pending.retain(|_, entry| {
            !is_expired_unix_ms(entry.started_unix_ms, pending_ttl_ms, now_unix_ms)
        });
        self.batches.retain(|_, batch| {
            !is_expired_unix_ms(batch.stored_unix_ms, cache_ttl_ms, now_unix_ms)
        });
        self.found.retain(|_, found| {
            !is_expired_unix_ms(found.touched_unix_ms, cache_ttl_ms, now_unix_ms)
        });
    }

    /// Replaces the cached batch for numbered selections.
    pub fn store_batch(
        &mut self,
        conversation: ConversationId,
        jokes: Vec<Joke>,
        now_unix_ms: u64,
    ) {
        self.batches.insert(
            conversation,
            CachedBatch {
                jokes,
                stored_unix_ms: now_unix_ms,
            },
        );
    }

    pub fn batch_joke(&self, conversation: ConversationId, index: usize) -> Option<&Joke> {
        self.batches.get(&conversation)?.jokes.get(index)
    }

    /// Remembers a search hit and returns the id its "Save Joke" button carries.
    ///
    /// Ids follow the wall clock and never repeat within a process, so a button
    /// from before a restart cannot resolve to a newer hit.
    pub fn store_found(
        &mut self,
        conversation: ConversationId,
        joke: Joke,
        now_unix_ms: u64,
    ) -> u64 {
        let hit_id = now_unix_ms.max(self.last_hit_id.saturating_add(1));
        self.last_hit_id = hit_id;
        let found = self.found.entry(conversation).or_default();
        found.hits.push_back((hit_id, joke));
        while found.hits.len() > MAX_FOUND_HITS {
            found.hits.pop_front();
        }
        found.touched_unix_ms = now_unix_ms;
        hit_id
    }

    pub fn found_joke(&self, conversation: ConversationId, hit_id: u64) -> Option<&Joke> {
        self.found
            .get(&conversation)?
            .hits
            .iter()
            .find(|(id, _)| *id == hit_id)
            .map(|(_, joke)| joke)
    }
}

#[cfg(test)]
mod tests {
    use jokebot_source::Joke;

    use super::{ConversationId, PendingAction, SessionStore, MAX_FOUND_HITS};

    const CHAT: ConversationId = ConversationId(100);

    #[test]
    fn unit_begin_overwrites_previous_flow() {
        let mut sessions = SessionStore::new(0);
        sessions.begin(CHAT, PendingAction::AwaitingKeyword, 1);
        sessions.begin(CHAT, PendingAction::AwaitingCustomJoke, 2);
        assert_eq!(
            sessions.pending(CHAT, 3),
            Some(PendingAction::AwaitingCustomJoke)
        );
        assert_eq!(sessions.pending_count(), 1);
    }

    #[test]
    fn unit_end_is_noop_when_idle() {
        let mut sessions = SessionStore::new(0);
        assert_eq!(sessions.end(CHAT), None);
        sessions.begin(CHAT, PendingAction::AwaitingKeyword, 1);
        assert_eq!(sessions.end(CHAT), Some(PendingAction::AwaitingKeyword));
        assert_eq!(sessions.pending(CHAT, 1), None);
        assert_eq!(sessions.pending_count(), 0);
    }

    #[test]
    fn functional_pending_flows_are_isolated_per_conversation() {
        let mut sessions = SessionStore::new(0);
        let other = ConversationId(200);
        sessions.begin(CHAT, PendingAction::AwaitingKeyword, 1);
        assert_eq!(sessions.pending(other, 1), None);
        sessions.end(other);
        assert_eq!(
            sessions.pending(CHAT, 1),
            Some(PendingAction::AwaitingKeyword)
        );
    }

    #[test]
    fn regression_expired_pending_flow_reads_as_idle() {
        let mut sessions = SessionStore::new(1_000);
        sessions.begin(CHAT, PendingAction::AwaitingKeyword, 5_000);
        assert_eq!(
            sessions.pending(CHAT, 5_999),
            Some(PendingAction::AwaitingKeyword)
        );
        assert_eq!(sessions.pending(CHAT, 6_000), None);
        assert_eq!(sessions.pending_count(), 0);
    }

    #[test]
    fn unit_batch_cache_is_overwritten_and_index_checked() {
        let mut sessions = SessionStore::new(0);
        sessions.store_batch(CHAT, vec![Joke::new("a", "b"), Joke::new("c", "d")], 1);
        assert_eq!(sessions.batch_joke(CHAT, 1), Some(&Joke::new("c", "d")));
        sessions.store_batch(CHAT, vec![Joke::new("e", "f")], 2);
        assert_eq!(sessions.batch_joke(CHAT, 0), Some(&Joke::new("e", "f")));
        assert_eq!(sessions.batch_joke(CHAT, 1), None);
        assert_eq!(sessions.batch_joke(ConversationId(1), 0), None);
    }

    #[test]
    fn unit_found_hits_resolve_by_their_own_id() {
        let mut sessions = SessionStore::new(0);
        let first = sessions.store_found(CHAT, Joke::new("a", "b"), 10);
        let second = sessions.store_found(CHAT, Joke::new("c", "d"), 10);
        assert_ne!(first, second);
        assert_eq!(sessions.found_joke(CHAT, first), Some(&Joke::new("a", "b")));
        assert_eq!(sessions.found_joke(CHAT, second), Some(&Joke::new("c", "d")));
        assert_eq!(sessions.found_joke(ConversationId(1), first), None);
    }

    #[test]
    fn regression_found_hits_keep_only_recent_entries() {
        let mut sessions = SessionStore::new(0);
        let oldest = sessions.store_found(CHAT, Joke::new("old", "hit"), 1);
        for now in 2..=MAX_FOUND_HITS as u64 + 1 {
            sessions.store_found(CHAT, Joke::new("new", "hit"), now);
        }
        assert_eq!(sessions.found_joke(CHAT, oldest), None);
    }

    #[test]
    fn regression_prune_expired_evicts_idle_conversations() {
        let mut sessions = SessionStore::new(1_000).with_cache_ttl_ms(5_000);
        let other = ConversationId(200);
        sessions.begin(CHAT, PendingAction::AwaitingKeyword, 0);
        sessions.store_batch(CHAT, vec![Joke::new("a", "b")], 0);
        let hit = sessions.store_found(CHAT, Joke::new("c", "d"), 0);
        sessions.store_batch(other, vec![Joke::new("e", "f")], 4_000);

        sessions.prune_expired(1_500);
        assert_eq!(sessions.pending_count(), 0);
        assert_eq!(sessions.cached_conversation_count(), 2);

        sessions.prune_expired(5_000);
        assert_eq!(sessions.batch_joke(CHAT, 0), None);
        assert_eq!(sessions.found_joke(CHAT, hit), None);
        assert_eq!(sessions.batch_joke(other, 0), Some(&Joke::new("e", "f")));
        assert_eq!(sessions.cached_conversation_count(), 1);
    }
}
