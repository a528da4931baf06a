//! Per-user pagination cursors.
//!
//! Cursors live in a sharded concurrent map, so updates for one user lock only
//! that user's shard for the duration of a single read-modify-write.
//! Concurrent updates for the same user race with last-write-wins.

use dashmap::DashMap;
use tracing::debug;

use crate::types::{PageView, UserId};

/// A user's position within the ordered key list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub page_index: usize,
    pub page_size: usize,
}

impl PaginationCursor {
    fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size,
        }
    }

    fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Pull the index back onto the last page if the key set shrank.
    fn clamp(&mut self, total: usize) {
        let last = self.page_count(total) - 1;
        if self.page_index > last {
            self.page_index = last;
        }
    }

    fn view(&self, keys: &[String]) -> PageView {
        let total = keys.len();
        let start = (self.page_index * self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        PageView {
            items: keys[start..end].to_vec(),
            page_index: self.page_index,
            page_count: self.page_count(total),
            has_prev: self.page_index > 0,
            has_next: end < total,
        }
    }
}

/// Store of pagination cursors keyed by user, created on first use.
#[derive(Debug)]
pub struct PaginationSession {
    page_size: usize,
    cursors: DashMap<UserId, PaginationCursor>,
}

impl PaginationSession {
    /// Create a store with a fixed page size (raised to 1 if zero).
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            cursors: DashMap::new(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get or create the cursor for `user`.
    pub fn cursor(&self, user: &UserId) -> PaginationCursor {
        *self
            .cursors
            .entry(user.clone())
            .or_insert_with(|| PaginationCursor::new(self.page_size))
    }

    /// The user's current page over `keys`.
    ///
    /// A cursor past the last page is clamped and the clamped index stored.
    pub fn page_for(&self, user: &UserId, keys: &[String]) -> PageView {
        let mut cursor = self
            .cursors
            .entry(user.clone())
            .or_insert_with(|| PaginationCursor::new(self.page_size));
        cursor.clamp(keys.len());
        cursor.view(keys)
    }

    /// Move forward one page if another page exists. Returns whether it moved.
    pub fn advance(&self, user: &UserId, total: usize) -> bool {
        let mut cursor = self
            .cursors
            .entry(user.clone())
            .or_insert_with(|| PaginationCursor::new(self.page_size));
        cursor.clamp(total);
        let moved = (cursor.page_index + 1) * cursor.page_size < total;
        if moved {
            cursor.page_index += 1;
        }
        debug!(user = %user, page = cursor.page_index, moved, "advance");
        moved
    }

    /// Move back one page unless already on the first. Returns whether it moved.
    ///
    /// A cursor left past the end by a shrunken key set is clamped to the last
    /// page first, so the move is always relative to a page the user can see.
    pub fn retreat(&self, user: &UserId, total: usize) -> bool {
        let mut cursor = self
            .cursors
            .entry(user.clone())
            .or_insert_with(|| PaginationCursor::new(self.page_size));
        cursor.clamp(total);
        let moved = cursor.page_index > 0;
        if moved {
            cursor.page_index -= 1;
        }
        debug!(user = %user, page = cursor.page_index, moved, "retreat");
        moved
    }

    /// Return to the first page.
    pub fn reset(&self, user: &UserId) {
        self.cursors
            .entry(user.clone())
            .or_insert_with(|| PaginationCursor::new(self.page_size))
            .page_index = 0;
    }

    /// Drop a user's cursor. Returns whether one existed.
    pub fn forget(&self, user: &UserId) -> bool {
        self.cursors.remove(user).is_some()
    }

    /// Number of users with a cursor.
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
