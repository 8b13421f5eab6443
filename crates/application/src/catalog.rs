//! Catalog browsing: the fetched book set, the live search query, and the
//! book currently open in the editor.

use booklog_core::{Book, BookId};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    books: Vec<Book>,
    query: String,
    cursor: usize,
    selection: Option<BookId>,
    loaded: bool,
}

/// Case-insensitive substring match over title, joined authors and joined
/// genres. The empty query matches everything.
pub fn matches_query(book: &Book, query: &str) -> bool {
    let query = query.to_lowercase();
    book.title.to_lowercase().contains(&query)
        || book.authors_line().to_lowercase().contains(&query)
        || book.genres_line().to_lowercase().contains(&query)
}

impl CatalogView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(mut self, books: Vec<Book>) -> Self {
        self.books = books;
        self.loaded = true;
        self.normalize_cursor();
        self
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Applies a catalog fetch. A failed fetch is only logged; the current list
    /// stays as it was.
    pub fn apply_books(&mut self, result: anyhow::Result<Vec<Book>>) -> bool {
        match result {
            Ok(books) => {
                let focused = self.cursor_book().map(|b| b.id.clone());
                debug!(count = books.len(), "catalog loaded");
                self.books = books;
                self.loaded = true;
                if let Some(id) = focused
                    && let Some(idx) = self.books.iter().position(|b| b.id == id)
                {
                    self.cursor = idx;
                }
                self.normalize_cursor();
                true
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to fetch books");
                false
            }
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.normalize_cursor();
    }

    pub fn push_query_char(&mut self, ch: char) {
        self.query.push(ch);
        self.normalize_cursor();
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
        self.normalize_cursor();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.normalize_cursor();
    }

    pub fn visible_indices(&self) -> Vec<usize> {
        self.books
            .iter()
            .enumerate()
            .filter(|(_, book)| matches_query(book, &self.query))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn visible_books(&self) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|book| matches_query(book, &self.query))
            .collect()
    }

    /// Position of the cursor within the visible subsequence.
    pub fn cursor_position(&self) -> Option<usize> {
        self.visible_indices()
            .iter()
            .position(|idx| *idx == self.cursor)
    }

    pub fn cursor_book(&self) -> Option<&Book> {
        let visible = self.visible_indices();
        if visible.contains(&self.cursor) {
            self.books.get(self.cursor)
        } else {
            visible.first().and_then(|idx| self.books.get(*idx))
        }
    }

    pub fn select_next(&mut self) {
        let visible = self.visible_indices();
        let Some(pos) = visible.iter().position(|idx| *idx == self.cursor) else {
            if let Some(first) = visible.first() {
                self.cursor = *first;
            }
            return;
        };
        if pos + 1 < visible.len() {
            self.cursor = visible[pos + 1];
        }
    }

    pub fn select_prev(&mut self) {
        let visible = self.visible_indices();
        let Some(pos) = visible.iter().position(|idx| *idx == self.cursor) else {
            if let Some(first) = visible.first() {
                self.cursor = *first;
            }
            return;
        };
        if pos > 0 {
            self.cursor = visible[pos - 1];
        }
    }

    /// Marks the book under the cursor as the selection and hands it out.
    pub fn activate_cursor(&mut self) -> Option<Book> {
        let book = self.cursor_book()?.clone();
        self.selection = Some(book.id.clone());
        Some(book)
    }

    pub fn selection(&self) -> Option<&BookId> {
        self.selection.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn normalize_cursor(&mut self) {
        let visible = self.visible_indices();
        match visible.first() {
            None => self.cursor = 0,
            Some(first) => {
                if !visible.contains(&self.cursor) {
                    self.cursor = *first;
                }
            }
        }
    }
}
