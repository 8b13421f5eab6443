//! Application orchestration layer for Booklog.

use booklog_core::{Book, LogId, LogPayload, ReadingLog, Settings};
use tracing::info;

mod catalog;
mod editor;
mod index;

pub use catalog::{CatalogView, matches_query};
pub use editor::{
    EditorError, EditorExit, EditorStatus, FormError, FormField, LogEditor, LogForm, LogMode,
    MAX_PAGE_INPUT,
};
pub use index::LogIndex;

/// The remote book/log service as the application sees it.
pub trait LogBackend {
    fn list_books(&self) -> anyhow::Result<Vec<Book>>;
    fn list_logs(&self) -> anyhow::Result<Vec<ReadingLog>>;
    /// Any accepted write counts as done; response bodies carry nothing
    /// the editor needs.
    fn create_log(&self, payload: &LogPayload) -> anyhow::Result<()>;
    fn update_log(&self, id: &LogId, payload: &LogPayload) -> anyhow::Result<()>;
    fn delete_log(&self, id: &LogId) -> anyhow::Result<()>;
}

/// A write produced by the editor, ready to run against a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRequest {
    Create(LogPayload),
    Update { id: LogId, payload: LogPayload },
    Delete { id: LogId },
}

impl LogRequest {
    pub fn execute<B: LogBackend + ?Sized>(&self, backend: &B) -> anyhow::Result<()> {
        match self {
            LogRequest::Create(payload) => backend.create_log(payload),
            LogRequest::Update { id, payload } => backend.update_log(id, payload),
            LogRequest::Delete { id } => backend.delete_log(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub catalog: CatalogView,
    pub editor: Option<LogEditor>,
    next_ticket: u64,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            catalog: CatalogView::new(),
            editor: None,
            next_ticket: 0,
        }
    }

    /// Opens the editor on the book under the cursor. Nothing under the
    /// cursor leaves everything as it was.
    pub fn open_editor(&mut self) -> Option<&mut LogEditor> {
        let book = self.catalog.activate_cursor()?;
        self.next_ticket += 1;
        self.editor = LogEditor::open(Some(book), self.next_ticket);
        self.editor.as_mut()
    }

    /// The open editor, if `ticket` still names it.
    pub fn editor_for(&mut self, ticket: u64) -> Option<&mut LogEditor> {
        self.editor.as_mut().filter(|editor| editor.ticket() == ticket)
    }

    /// Drops the editor and the selection; returns whether the catalog
    /// should be re-fetched.
    pub fn close_editor(&mut self, exit: EditorExit) -> bool {
        if let Some(editor) = self.editor.take() {
            info!(book = %editor.book().id, refresh = exit.refresh, "log editor closed");
        }
        self.catalog.clear_selection();
        exit.refresh
    }
}
