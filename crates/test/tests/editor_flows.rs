use booklog_application::{
    AppContext, CatalogView, EditorError, EditorStatus, LogBackend, LogEditor, LogForm, LogIndex,
    LogMode, LogRequest, matches_query,
};
use booklog_core::{BookId, LogId, Rating, ReadingStatus, Settings};
use booklog_test::{Call, FakeBackend, make_book, make_log, make_tagged_book};
use chrono::NaiveDate;

fn library() -> Vec<booklog_core::Book> {
    vec![
        make_tagged_book("1", "Dune", &["Frank Herbert"], &["Science Fiction"]),
        make_tagged_book("2", "Emma", &["Jane Austen"], &["Romance", "Classic"]),
        make_tagged_book("3", "The Hobbit", &["J. R. R. Tolkien"], &["Fantasy"]),
        make_tagged_book("4", "Untitled draft", &[], &[]),
        make_tagged_book("5", "Children of Dune", &["Frank Herbert"], &["Science Fiction"]),
    ]
}

fn open_editor(backend: &FakeBackend, book: booklog_core::Book) -> anyhow::Result<LogEditor> {
    let mut editor =
        LogEditor::open(Some(book), 1).ok_or_else(|| anyhow::anyhow!("editor did not open"))?;
    editor.load(backend);
    Ok(editor)
}

#[test]
fn visible_books_match_a_brute_force_filter() {
    let books = library();
    let mut view = CatalogView::new().with_books(books.clone());

    for query in ["", "dune", "DUNE", "herbert", "classic", "o", " ", "zzz", "j. r. r."] {
        view.set_query(query);
        let expected: Vec<&BookId> = books
            .iter()
            .filter(|book| {
                let needle = query.to_lowercase();
                query.is_empty()
                    || book.title.to_lowercase().contains(&needle)
                    || book.authors.join(", ").to_lowercase().contains(&needle)
                    || book.genres.join(", ").to_lowercase().contains(&needle)
            })
            .map(|book| &book.id)
            .collect();
        let visible: Vec<&BookId> = view.visible_books().into_iter().map(|book| &book.id).collect();
        assert_eq!(visible, expected, "query {query:?}");
        assert!(view.visible_books().into_iter().all(|book| matches_query(book, query)));
    }
}

#[test]
fn missing_log_opens_with_defaults() -> anyhow::Result<()> {
    let backend = FakeBackend::new().with_logs(vec![make_log("9", "2", ReadingStatus::Completed)]);
    let editor = open_editor(&backend, make_book("1", "Dune", Some(400)))?;

    assert_eq!(editor.status(), EditorStatus::Idle);
    assert_eq!(editor.mode(), &LogMode::New);
    assert_eq!(editor.form(), &LogForm::default());
    assert_eq!(editor.form().status, ReadingStatus::WantToRead);
    assert_eq!(editor.save_label(), "Log This Book");
    assert!(!editor.can_delete());
    Ok(())
}

#[test]
fn existing_log_hydrates_every_field() -> anyhow::Result<()> {
    let mut stored = make_log("7", "1", ReadingStatus::Reading);
    stored.current_page = 120;
    stored.notes = "Great worldbuilding".to_string();
    stored.date_started = NaiveDate::from_ymd_opt(2024, 1, 5);
    stored.rating = Rating::from_half_steps(7).unwrap_or_default();
    let backend = FakeBackend::new().with_logs(vec![stored.clone()]);

    let editor = open_editor(&backend, make_book("1", "Dune", Some(400)))?;
    assert_eq!(editor.existing_id(), Some(&LogId::from("7")));
    assert_eq!(editor.form(), &LogForm::from_log(&stored));
    assert_eq!(editor.form().date_started, "2024-01-05");
    assert_eq!(editor.form().date_finished, "");
    assert_eq!(editor.save_label(), "Update Log");
    assert_eq!(editor.progress().percent(), Some(30));
    Ok(())
}

#[test]
fn saved_log_reads_back_unchanged() -> anyhow::Result<()> {
    let backend = FakeBackend::new();
    let dune = make_book("1", "Dune", Some(400));

    let mut editor = open_editor(&backend, dune.clone())?;
    editor.set_status(ReadingStatus::Completed);
    editor.set_current_page(400);
    editor.set_date_started("2024-01-05");
    editor.set_date_finished("2024-02-10");
    editor.set_notes("Reread the appendices");
    if let Some(rating) = Rating::from_stars(4.5) {
        editor.set_rating(rating);
    }
    let saved_form = editor.form().clone();
    assert!(editor.save(&backend)?.is_some_and(|exit| exit.refresh));

    let reopened = open_editor(&backend, dune)?;
    assert_eq!(reopened.form(), &saved_form);
    assert_eq!(reopened.existing_id(), Some(&LogId::from("log-1")));
    assert_eq!(reopened.progress().percent(), Some(100));
    Ok(())
}

#[test]
fn second_save_updates_instead_of_creating() -> anyhow::Result<()> {
    let backend = FakeBackend::new();
    let dune = make_book("1", "Dune", Some(400));

    let mut first = open_editor(&backend, dune.clone())?;
    first.save(&backend)?;
    let mut second = open_editor(&backend, dune)?;
    second.set_current_page(50);
    second.save(&backend)?;

    assert_eq!(backend.logs().len(), 1);
    assert_eq!(backend.logs()[0].current_page, 50);
    assert!(
        backend
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Update { id, .. } if id == &LogId::from("log-1")))
    );
    Ok(())
}

#[test]
fn duplicate_logs_resolve_to_the_first_listed() -> anyhow::Result<()> {
    let mut first = make_log("a", "1", ReadingStatus::Reading);
    first.current_page = 10;
    let mut second = make_log("b", "1", ReadingStatus::Completed);
    second.current_page = 300;
    let index = LogIndex::from_logs(vec![first.clone(), second.clone()]);
    assert_eq!(index.get(&BookId::from("1")).map(|log| &log.id), Some(&first.id));
    assert_eq!(index.duplicates(), 1);

    let backend = FakeBackend::new().with_logs(vec![first, second]);
    let editor = open_editor(&backend, make_book("1", "Dune", Some(400)))?;
    assert_eq!(editor.existing_id(), Some(&LogId::from("a")));
    assert_eq!(editor.form().current_page, 10);
    Ok(())
}

#[test]
fn failed_listing_starts_blank() -> anyhow::Result<()> {
    let backend = FakeBackend::new().with_logs(vec![make_log("7", "1", ReadingStatus::Completed)]);
    backend.fail_logs(true);
    let editor = open_editor(&backend, make_book("1", "Dune", Some(400)))?;
    assert_eq!(editor.mode(), &LogMode::New);
    assert_eq!(editor.form(), &LogForm::default());
    assert!(editor.can_submit());
    Ok(())
}

#[test]
fn failed_delete_keeps_the_log_and_reports() -> anyhow::Result<()> {
    let backend = FakeBackend::new().with_logs(vec![make_log("7", "1", ReadingStatus::Reading)]);
    let mut editor = open_editor(&backend, make_book("1", "Dune", None))?;
    backend.fail_writes(true);

    assert_eq!(editor.delete(&backend)?, None);
    assert_eq!(editor.error(), Some("Failed to delete log"));
    assert_eq!(backend.logs().len(), 1);
    Ok(())
}

#[test]
fn writes_are_refused_while_in_flight() -> anyhow::Result<()> {
    let backend = FakeBackend::new().with_logs(vec![make_log("7", "1", ReadingStatus::Reading)]);
    let mut editor = open_editor(&backend, make_book("1", "Dune", None))?;

    let request = editor.begin_save()?;
    assert!(matches!(request, LogRequest::Update { .. }));
    assert_eq!(editor.begin_save(), Err(EditorError::Busy));
    assert_eq!(editor.begin_delete(), Err(EditorError::Busy));
    Ok(())
}

#[test]
fn app_context_flow_refreshes_after_save() -> anyhow::Result<()> {
    let backend = FakeBackend::new().with_books(library());
    let mut ctx = AppContext::new(Settings::default());
    assert!(ctx.catalog.apply_books(backend.list_books()));

    ctx.catalog.set_query("emma");
    let editor = ctx
        .open_editor()
        .ok_or_else(|| anyhow::anyhow!("no book under cursor"))?;
    editor.load(&backend);
    editor.set_status(ReadingStatus::Reading);
    let exit = editor
        .save(&backend)?
        .ok_or_else(|| anyhow::anyhow!("save did not close the editor"))?;

    assert!(ctx.close_editor(exit));
    assert!(ctx.editor.is_none());
    assert_eq!(ctx.catalog.selection(), None);
    assert_eq!(backend.logs()[0].book, BookId::from("2"));

    backend.fail_books(true);
    assert!(!ctx.catalog.apply_books(backend.list_books()));
    assert_eq!(ctx.catalog.books().len(), 5);
    Ok(())
}
