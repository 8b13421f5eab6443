//! Lookup from book to its reading log.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use booklog_core::{BookId, ReadingLog};
use tracing::warn;

/// Reading logs keyed by book. At most one log per book: the first one seen
/// wins and later ones are counted as duplicates.
#[derive(Debug, Clone, Default)]
pub struct LogIndex {
    by_book: HashMap<BookId, ReadingLog>,
    duplicates: usize,
}

impl LogIndex {
    pub fn from_logs(logs: impl IntoIterator<Item = ReadingLog>) -> Self {
        let mut index = Self::default();
        for log in logs {
            match index.by_book.entry(log.book.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(log);
                }
                Entry::Occupied(kept) => {
                    warn!(
                        book = %log.book,
                        kept = %kept.get().id,
                        dropped = %log.id,
                        "duplicate reading log for book"
                    );
                    index.duplicates += 1;
                }
            }
        }
        index
    }

    pub fn get(&self, book: &BookId) -> Option<&ReadingLog> {
        self.by_book.get(book)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_book.len()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
