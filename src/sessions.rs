//! Bounded per-session storage.

use std::collections::{HashMap, VecDeque};

/// Sessions kept before the oldest is evicted.
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Values keyed by session id, holding at most `capacity` sessions.
///
/// When full, opening a new session evicts the one opened longest ago.
#[derive(Debug, Clone)]
pub struct SessionMap<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V> Default for SessionMap<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl<V> SessionMap<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert or replace a session's value. Replacing keeps its age.
    pub fn insert(&mut self, session_id: &str, value: V) {
        self.make_room(session_id);
        self.entries.insert(session_id.to_string(), value);
    }

    /// The session's value, created with `V::default()` when missing.
    pub fn get_or_default(&mut self, session_id: &str) -> &mut V
    where
        V: Default,
    {
        self.make_room(session_id);
        self.entries.entry(session_id.to_string()).or_default()
    }

    pub fn get(&self, session_id: &str) -> Option<&V> {
        self.entries.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict the oldest sessions so `session_id` fits, registering it when new.
    fn make_room(&mut self, session_id: &str) {
        if self.entries.contains_key(session_id) {
            return;
        }
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.order.push_back(session_id.to_string());
    }
}
