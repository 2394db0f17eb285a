//! In-process cache used when no Redis URL is configured

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::{EphemeralCache, Result};

enum Slot {
    Value(String),
    List(VecDeque<String>),
}

struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            slot: Slot::Value(value),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_live(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(Entry {
                slot: Slot::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn push_capped(&self, key: &str, value: String, cap: usize) -> Result<()> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::List(VecDeque::new()),
            expires_at: None,
        });
        if !matches!(entry.slot, Slot::List(_)) {
            entry.slot = Slot::List(VecDeque::new());
            entry.expires_at = None;
        }
        if let Slot::List(list) = &mut entry.slot {
            list.push_front(value);
            list.truncate(cap);
        }
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<String>> {
        match self.entries.lock().get(key) {
            Some(Entry {
                slot: Slot::List(list),
                ..
            }) => Ok(list.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }
}
