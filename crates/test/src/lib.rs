//! Test helpers and fixtures.

use std::sync::{Arc, Mutex, PoisonError};

use booklog_application::LogBackend;
use booklog_core::{Book, BookId, LogId, LogPayload, Rating, ReadingLog, ReadingStatus};

mod stub_server;

pub use stub_server::{RecordedRequest, StubResponse, StubServer};

pub fn make_book(id: &str, title: &str, page_count: Option<u32>) -> Book {
    Book {
        id: BookId::from(id),
        title: title.to_string(),
        authors: Vec::new(),
        publisher: None,
        publish_date: None,
        page_count,
        genres: Vec::new(),
        cover_url: None,
        description: None,
        isbn_10: None,
        isbn_13: None,
        rating_count: 0,
        avg_rating: 0.0,
    }
}

pub fn make_tagged_book(id: &str, title: &str, authors: &[&str], genres: &[&str]) -> Book {
    Book {
        authors: authors.iter().map(|a| a.to_string()).collect(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..make_book(id, title, None)
    }
}

pub fn make_log(id: &str, book: &str, status: ReadingStatus) -> ReadingLog {
    ReadingLog {
        id: LogId::from(id),
        book: BookId::from(book),
        status,
        date_started: None,
        date_finished: None,
        current_page: 0,
        notes: String::new(),
        rating: Rating::default(),
        progress: None,
    }
}

/// What a service that stores the payload verbatim would hand back.
pub fn log_from_payload(id: LogId, payload: &LogPayload) -> ReadingLog {
    ReadingLog {
        id,
        book: payload.book.clone(),
        status: payload.status,
        date_started: payload.date_started,
        date_finished: payload.date_finished,
        current_page: payload.current_page,
        notes: payload.notes.clone(),
        rating: payload.rating,
        progress: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListBooks,
    ListLogs,
    Create(LogPayload),
    Update { id: LogId, payload: LogPayload },
    Delete(LogId),
}

#[derive(Debug, Default)]
struct FakeState {
    books: Vec<Book>,
    logs: Vec<ReadingLog>,
    calls: Vec<Call>,
    next_id: u64,
    fail_books: bool,
    fail_logs: bool,
    fail_writes: bool,
}

/// In-memory backend that records every call. Clones share state, so a test
/// can keep a handle while the code under test owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(self, books: Vec<Book>) -> Self {
        self.with_state(|state| state.books = books);
        self
    }

    pub fn with_logs(self, logs: Vec<ReadingLog>) -> Self {
        self.with_state(|state| state.logs = logs);
        self
    }

    pub fn fail_books(&self, fail: bool) {
        self.with_state(|state| state.fail_books = fail);
    }

    pub fn fail_logs(&self, fail: bool) {
        self.with_state(|state| state.fail_logs = fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.with_state(|state| state.fail_writes = fail);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|state| state.calls.clone())
    }

    pub fn logs(&self) -> Vec<ReadingLog> {
        self.with_state(|state| state.logs.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl LogBackend for FakeBackend {
    fn list_books(&self) -> anyhow::Result<Vec<Book>> {
        self.with_state(|state| {
            state.calls.push(Call::ListBooks);
            if state.fail_books {
                anyhow::bail!("GET /api/v1/books/ returned 503 Service Unavailable");
            }
            Ok(state.books.clone())
        })
    }

    fn list_logs(&self) -> anyhow::Result<Vec<ReadingLog>> {
        self.with_state(|state| {
            state.calls.push(Call::ListLogs);
            if state.fail_logs {
                anyhow::bail!("GET /logs/ returned 401 Unauthorized");
            }
            Ok(state.logs.clone())
        })
    }

    fn create_log(&self, payload: &LogPayload) -> anyhow::Result<()> {
        self.with_state(|state| {
            state.calls.push(Call::Create(payload.clone()));
            if state.fail_writes {
                anyhow::bail!("POST /logs/ returned 400 Bad Request");
            }
            state.next_id += 1;
            let log = log_from_payload(LogId(format!("log-{}", state.next_id)), payload);
            state.logs.push(log);
            Ok(())
        })
    }

    fn update_log(&self, id: &LogId, payload: &LogPayload) -> anyhow::Result<()> {
        self.with_state(|state| {
            state.calls.push(Call::Update {
                id: id.clone(),
                payload: payload.clone(),
            });
            if state.fail_writes {
                anyhow::bail!("PATCH /logs/{id}/ returned 400 Bad Request");
            }
            let log = log_from_payload(id.clone(), payload);
            match state.logs.iter_mut().find(|l| &l.id == id) {
                Some(slot) => *slot = log,
                None => anyhow::bail!("PATCH /logs/{id}/ returned 404 Not Found"),
            }
            Ok(())
        })
    }

    fn delete_log(&self, id: &LogId) -> anyhow::Result<()> {
        self.with_state(|state| {
            state.calls.push(Call::Delete(id.clone()));
            if state.fail_writes {
                anyhow::bail!("DELETE /logs/{id}/ returned 500 Internal Server Error");
            }
            let before = state.logs.len();
            state.logs.retain(|l| &l.id != id);
            if state.logs.len() == before {
                anyhow::bail!("DELETE /logs/{id}/ returned 404 Not Found");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_backend_persists_payloads() -> anyhow::Result<()> {
        let backend = FakeBackend::new();
        let payload = LogPayload {
            book: BookId::from("1"),
            status: ReadingStatus::Reading,
            date_started: None,
            date_finished: None,
            current_page: 12,
            notes: "n".to_string(),
            rating: Rating::default(),
        };
        backend.create_log(&payload)?;
        let created = log_from_payload(LogId::from("log-1"), &payload);
        assert_eq!(backend.list_logs()?, vec![created.clone()]);

        backend.delete_log(&created.id)?;
        assert!(backend.logs().is_empty());
        assert!(backend.delete_log(&created.id).is_err());
        assert_eq!(
            backend.calls(),
            vec![
                Call::Create(payload),
                Call::ListLogs,
                Call::Delete(created.id.clone()),
                Call::Delete(created.id),
            ]
        );
        Ok(())
    }

    #[test]
    fn clones_share_state() {
        let backend = FakeBackend::new();
        let handle = backend.clone();
        backend.fail_books(true);
        assert!(handle.list_books().is_err());
        assert_eq!(backend.calls(), vec![Call::ListBooks]);
    }
}
