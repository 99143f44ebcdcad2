// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded album cache used to react at most once per album burst.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use tidyread_core::types::ChatId;

/// Remembers recently seen `(chat_id, grouped_id)` pairs.
///
/// Entries expire after `window`; when full, the least recently used entry
/// is evicted.
pub struct AlbumCache {
    entries: Mutex<LruCache<(ChatId, i64), Instant>>,
    window: Duration,
}

impl AlbumCache {
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            window,
        }
    }

    /// Claim the album for this burst.
    ///
    /// Returns `true` when the album was not seen within the window and is
    /// now recorded; `false` when another message of it was seen recently.
    pub fn claim(&self, chat_id: ChatId, grouped_id: i64) -> bool {
        self.claim_at(chat_id, grouped_id, Instant::now())
    }

    pub(crate) fn claim_at(&self, chat_id: ChatId, grouped_id: i64, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(seen) = entries.get(&(chat_id, grouped_id))
            && now.saturating_duration_since(*seen) < self.window
        {
            return false;
        }
        entries.put((chat_id, grouped_id), now);
        true
    }

    /// Forget a claim so the next message of the album may try again.
    pub fn release(&self, chat_id: ChatId, grouped_id: i64) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop(&(chat_id, grouped_id));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
