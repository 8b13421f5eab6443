//! Reading-log editor: reconciles the selected book with its stored log,
//! holds the form while it is edited, and turns save/delete into requests.

use booklog_core::{
    Book, BookId, LogId, LogPayload, Progress, Rating, ReadingLog, ReadingStatus,
};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::{LogBackend, LogIndex, LogRequest};

/// Upper bound for the page field when the book has no page count.
pub const MAX_PAGE_INPUT: u32 = 99_999;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_INPUT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Rating,
    Status,
    CurrentPage,
    DateStarted,
    DateFinished,
    Notes,
}

impl FormField {
    pub const ALL: [FormField; 6] = [
        FormField::Rating,
        FormField::Status,
        FormField::CurrentPage,
        FormField::DateStarted,
        FormField::DateFinished,
        FormField::Notes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Rating => "Rating",
            FormField::Status => "Status",
            FormField::CurrentPage => "Current Page",
            FormField::DateStarted => "Date Started",
            FormField::DateFinished => "Date Finished",
            FormField::Notes => "Notes",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1).min(Self::ALL.len() - 1)]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[idx.saturating_sub(1)]
    }
}

/// Editable field values. Dates are kept as typed text until save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogForm {
    pub status: ReadingStatus,
    pub date_started: String,
    pub date_finished: String,
    pub current_page: u32,
    pub notes: String,
    pub rating: Rating,
}

impl Default for LogForm {
    fn default() -> Self {
        Self {
            status: ReadingStatus::WantToRead,
            date_started: String::new(),
            date_finished: String::new(),
            current_page: 0,
            notes: String::new(),
            rating: Rating::default(),
        }
    }
}

impl LogForm {
    pub fn from_log(log: &ReadingLog) -> Self {
        Self {
            status: log.status,
            date_started: format_date(log.date_started),
            date_finished: format_date(log.date_finished),
            current_page: log.current_page,
            notes: log.notes.clone(),
            rating: log.rating,
        }
    }

    pub fn to_payload(&self, book: &BookId) -> Result<LogPayload, FormError> {
        Ok(LogPayload {
            book: book.clone(),
            status: self.status,
            date_started: parse_date("Date Started", &self.date_started)?,
            date_finished: parse_date("Date Finished", &self.date_finished)?,
            current_page: self.current_page,
            notes: self.notes.clone(),
            rating: self.rating,
        })
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_date(field: &'static str, text: &str) -> Result<Option<NaiveDate>, FormError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| FormError::InvalidDate {
            field,
            value: text.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("{field} must be a date like 2024-01-31, got {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("a request for this log is still in flight")]
    Busy,
    #[error("this book has no saved log to delete")]
    NothingToDelete,
    #[error(transparent)]
    Form(#[from] FormError),
}

/// Whether saving creates a new log or updates a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    New,
    Existing { id: LogId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStatus {
    /// Waiting for the log listing that seeds the form.
    Loading,
    Idle,
    /// A save or delete is in flight.
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Save,
    Delete,
}

impl PendingOp {
    fn failure_message(self) -> &'static str {
        match self {
            PendingOp::Save => "Failed to save log",
            PendingOp::Delete => "Failed to delete log",
        }
    }
}

/// How the editor closed; `refresh` asks the caller to re-fetch the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorExit {
    pub refresh: bool,
}

#[derive(Debug, Clone)]
pub struct LogEditor {
    book: Book,
    ticket: u64,
    mode: LogMode,
    form: LogForm,
    status: EditorStatus,
    pending: Option<PendingOp>,
    error: Option<String>,
}

impl LogEditor {
    /// Opens an editor for `book`, waiting for its log listing. Without a book
    /// there is nothing to edit.
    pub fn open(book: Option<Book>, ticket: u64) -> Option<Self> {
        let book = book?;
        debug!(book = %book.id, ticket, "opening log editor");
        Some(Self {
            book,
            ticket,
            mode: LogMode::New,
            form: LogForm::default(),
            status: EditorStatus::Loading,
            pending: None,
            error: None,
        })
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn mode(&self) -> &LogMode {
        &self.mode
    }

    pub fn existing_id(&self) -> Option<&LogId> {
        match &self.mode {
            LogMode::New => None,
            LogMode::Existing { id } => Some(id),
        }
    }

    pub fn form(&self) -> &LogForm {
        &self.form
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn can_submit(&self) -> bool {
        self.status == EditorStatus::Idle
    }

    pub fn can_delete(&self) -> bool {
        self.can_submit() && matches!(self.mode, LogMode::Existing { .. })
    }

    pub fn save_label(&self) -> &'static str {
        match self.mode {
            LogMode::New => "Log This Book",
            LogMode::Existing { .. } => "Update Log",
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current_page: self.form.current_page,
            page_count: self.book.page_count,
        }
    }

    /// Seeds the form from the log listing. A failed listing falls back to
    /// a blank form, the same as a book with no log.
    pub fn hydrate(&mut self, logs: anyhow::Result<Vec<ReadingLog>>) {
        if self.status != EditorStatus::Loading {
            debug!(ticket = self.ticket, "ignoring late log listing");
            return;
        }
        match logs {
            Ok(logs) => self.hydrate_from_index(&LogIndex::from_logs(logs)),
            Err(err) => {
                debug!(error = %format!("{err:#}"), "failed to fetch logs; starting blank");
                self.reset();
            }
        }
        self.status = EditorStatus::Idle;
    }

    fn hydrate_from_index(&mut self, index: &LogIndex) {
        debug!(logs = index.len(), duplicates = index.duplicates(), "log listing indexed");
        match index.get(&self.book.id) {
            Some(log) => {
                debug!(book = %self.book.id, log = %log.id, "editing existing log");
                self.mode = LogMode::Existing { id: log.id.clone() };
                self.form = LogForm::from_log(log);
            }
            None => self.reset(),
        }
    }

    pub fn reset(&mut self) {
        self.mode = LogMode::New;
        self.form = LogForm::default();
    }

    pub fn begin_save(&mut self) -> Result<LogRequest, EditorError> {
        if !self.can_submit() {
            return Err(EditorError::Busy);
        }
        let payload = match self.form.to_payload(&self.book.id) {
            Ok(payload) => payload,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };
        let request = match &self.mode {
            LogMode::New => LogRequest::Create(payload),
            LogMode::Existing { id } => LogRequest::Update {
                id: id.clone(),
                payload,
            },
        };
        self.start(PendingOp::Save);
        Ok(request)
    }

    pub fn begin_delete(&mut self) -> Result<LogRequest, EditorError> {
        if !self.can_submit() {
            return Err(EditorError::Busy);
        }
        let LogMode::Existing { id } = &self.mode else {
            return Err(EditorError::NothingToDelete);
        };
        let request = LogRequest::Delete { id: id.clone() };
        self.start(PendingOp::Delete);
        Ok(request)
    }

    fn start(&mut self, op: PendingOp) {
        self.status = EditorStatus::Saving;
        self.pending = Some(op);
        self.error = None;
    }

    /// Resolves the in-flight request. Success closes the editor with a
    /// refresh; failure returns to idle with a message for the user.
    pub fn finish(&mut self, result: anyhow::Result<()>) -> Option<EditorExit> {
        if self.status != EditorStatus::Saving {
            debug!(ticket = self.ticket, "no request in flight; ignoring result");
            return None;
        }
        let op = self.pending.take().unwrap_or(PendingOp::Save);
        match result {
            Ok(()) => Some(EditorExit { refresh: true }),
            Err(err) => {
                warn!(book = %self.book.id, error = %format!("{err:#}"), "{}", op.failure_message());
                self.status = EditorStatus::Idle;
                self.error = Some(op.failure_message().to_string());
                None
            }
        }
    }

    pub fn cancel(&self) -> EditorExit {
        EditorExit { refresh: false }
    }

    pub fn set_status(&mut self, status: ReadingStatus) {
        self.form.status = status;
    }

    pub fn set_current_page(&mut self, page: u32) {
        self.form.current_page = page;
    }

    pub fn set_rating(&mut self, rating: Rating) {
        self.form.rating = rating;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.form.notes = notes.into();
    }

    pub fn set_date_started(&mut self, date: impl Into<String>) {
        self.form.date_started = date.into();
    }

    pub fn set_date_finished(&mut self, date: impl Into<String>) {
        self.form.date_finished = date.into();
    }

    pub fn page_limit(&self) -> u32 {
        self.book.known_page_count().unwrap_or(MAX_PAGE_INPUT)
    }

    pub fn step_current_page(&mut self, delta: i64) {
        let next = i64::from(self.form.current_page) + delta;
        self.form.current_page = next.clamp(0, i64::from(self.page_limit())) as u32;
    }

    /// Arrow-key adjustment for the focused field.
    pub fn adjust(&mut self, field: FormField, delta: i32) {
        match field {
            FormField::Rating => {
                for _ in 0..delta.unsigned_abs() {
                    self.form.rating = if delta > 0 {
                        self.form.rating.step_up()
                    } else {
                        self.form.rating.step_down()
                    };
                }
            }
            FormField::Status => {
                self.form.status = if delta >= 0 {
                    self.form.status.next()
                } else {
                    self.form.status.prev()
                };
            }
            FormField::CurrentPage => self.step_current_page(i64::from(delta)),
            FormField::DateStarted | FormField::DateFinished | FormField::Notes => {}
        }
    }

    pub fn type_char(&mut self, field: FormField, ch: char) {
        match field {
            FormField::Rating => {
                if let Some(stars) = ch.to_digit(10)
                    && let Some(rating) = Rating::from_stars(stars as f32)
                {
                    self.form.rating = rating;
                }
            }
            FormField::Status => {}
            FormField::CurrentPage => {
                if let Some(digit) = ch.to_digit(10) {
                    let typed = u64::from(self.form.current_page) * 10 + u64::from(digit);
                    self.form.current_page = typed.min(u64::from(MAX_PAGE_INPUT)) as u32;
                }
            }
            FormField::DateStarted => push_date_char(&mut self.form.date_started, ch),
            FormField::DateFinished => push_date_char(&mut self.form.date_finished, ch),
            FormField::Notes => {
                if ch == '\n' || !ch.is_control() {
                    self.form.notes.push(ch);
                }
            }
        }
    }

    pub fn backspace(&mut self, field: FormField) {
        match field {
            FormField::Rating | FormField::Status => {}
            FormField::CurrentPage => self.form.current_page /= 10,
            FormField::DateStarted => {
                self.form.date_started.pop();
            }
            FormField::DateFinished => {
                self.form.date_finished.pop();
            }
            FormField::Notes => {
                self.form.notes.pop();
            }
        }
    }

    pub fn clear_field(&mut self, field: FormField) {
        match field {
            FormField::Rating => self.form.rating = Rating::default(),
            FormField::Status => self.form.status = ReadingStatus::default(),
            FormField::CurrentPage => self.form.current_page = 0,
            FormField::DateStarted => self.form.date_started.clear(),
            FormField::DateFinished => self.form.date_finished.clear(),
            FormField::Notes => self.form.notes.clear(),
        }
    }

    pub fn load<B: LogBackend + ?Sized>(&mut self, backend: &B) {
        self.hydrate(backend.list_logs());
    }

    pub fn save<B: LogBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<Option<EditorExit>, EditorError> {
        let request = self.begin_save()?;
        let result = request.execute(backend);
        Ok(self.finish(result))
    }

    pub fn delete<B: LogBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<Option<EditorExit>, EditorError> {
        let request = self.begin_delete()?;
        let result = request.execute(backend);
        Ok(self.finish(result))
    }
}

fn push_date_char(target: &mut String, ch: char) {
    if (ch.is_ascii_digit() || ch == '-') && target.chars().count() < DATE_INPUT_LEN {
        target.push(ch);
    }
}
