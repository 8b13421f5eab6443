//! ratatui-based UI.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Context as _;
use booklog_application::{
    AppContext, EditorError, EditorStatus, FormField, LogBackend, LogEditor, LogMode,
};
use booklog_core::{Book, Settings};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

mod worker;

pub use worker::{Job, JobResult, Worker};

const ACCENT: Color = Color::Yellow;
const PROGRESS_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
    /// Connection settings changed; the caller rebuilds the backend.
    Reconnect,
}

#[derive(Debug, Clone)]
pub struct UiOutcome {
    pub ctx: AppContext,
    pub exit: UiExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Library,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionField {
    BaseUrl,
    Token,
}

#[derive(Debug, Default)]
struct ConnectionPanel {
    open: bool,
    field: Option<ConnectionField>,
    base_url: String,
    token: String,
    error: Option<String>,
}

impl ConnectionPanel {
    fn open_with(&mut self, settings: &Settings) {
        self.open = true;
        self.field = Some(ConnectionField::BaseUrl);
        self.base_url = settings.api_base_url.clone();
        self.token = settings.access_token.clone().unwrap_or_default();
        self.error = None;
    }

    fn input_mut(&mut self) -> &mut String {
        match self.field {
            Some(ConnectionField::Token) => &mut self.token,
            _ => &mut self.base_url,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            Some(ConnectionField::BaseUrl) => Some(ConnectionField::Token),
            _ => Some(ConnectionField::BaseUrl),
        };
    }

    fn to_settings(&self) -> Settings {
        let mut settings = Settings {
            api_base_url: self.base_url.clone(),
            access_token: Some(self.token.clone()),
        };
        settings.normalize();
        settings
    }
}

pub struct Ui {
    ctx: AppContext,
    worker: Worker,
    focus: Focus,
    editor_field: FormField,
    connection: ConnectionPanel,
    books_loading: bool,
    books_failed: bool,
}

impl Ui {
    /// Starts the request worker and asks it for the catalog straight away.
    pub fn new(mut ctx: AppContext, backend: Box<dyn LogBackend + Send>) -> anyhow::Result<Self> {
        ctx.settings.normalize();
        let mut ui = Self {
            ctx,
            worker: Worker::spawn(backend)?,
            focus: Focus::Library,
            editor_field: FormField::Rating,
            connection: ConnectionPanel::default(),
            books_loading: false,
            books_failed: false,
        };
        ui.request_books()?;
        Ok(ui)
    }

    pub fn run(&mut self) -> anyhow::Result<UiOutcome> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(outcome)), Ok(())) => Ok(outcome),
            (Ok(_), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiOutcome> {
        let tick_rate = Duration::from_millis(100);
        let mut needs_redraw = true;

        loop {
            if self.drain_results()? {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if let Some(exit) = self.handle_key(key)? {
                        return Ok(UiOutcome {
                            ctx: self.ctx.clone(),
                            exit,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn request_books(&mut self) -> anyhow::Result<()> {
        self.books_loading = true;
        self.worker.submit(Job::FetchBooks)
    }

    /// Applies every finished request; true when anything changed.
    fn drain_results(&mut self) -> anyhow::Result<bool> {
        let mut changed = false;
        while let Some(result) = self.worker.try_recv() {
            self.apply_result(result)?;
            changed = true;
        }
        Ok(changed)
    }

    fn apply_result(&mut self, result: JobResult) -> anyhow::Result<()> {
        match result {
            JobResult::Books(books) => {
                self.books_loading = false;
                self.books_failed = !self.ctx.catalog.apply_books(books);
            }
            JobResult::Logs { ticket, result } => match self.ctx.editor_for(ticket) {
                Some(editor) => editor.hydrate(result),
                None => debug!(ticket, "dropping log listing for closed editor"),
            },
            JobResult::Written { ticket, result } => {
                let Some(editor) = self.ctx.editor_for(ticket) else {
                    debug!(ticket, "dropping write result for closed editor");
                    return Ok(());
                };
                if let Some(exit) = editor.finish(result)
                    && self.ctx.close_editor(exit)
                {
                    self.request_books()?;
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if self.connection.open {
            self.handle_connection_key(key)
        } else if self.ctx.editor.is_some() {
            self.handle_editor_key(key)
        } else if self.focus == Focus::Search {
            self.handle_search_key(key)
        } else {
            self.handle_main_key(key)
        }
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('u') = key.code {
                self.ctx.catalog.clear_query();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Some(UiExit::Quit)),
            KeyCode::Char('/') => self.focus = Focus::Search,
            KeyCode::Char('s') => self.connection.open_with(&self.ctx.settings),
            KeyCode::Down => self.ctx.catalog.select_next(),
            KeyCode::Up => self.ctx.catalog.select_prev(),
            KeyCode::Enter => self.open_editor()?,
            _ => {}
        }
        Ok(None)
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('u') = key.code {
                self.ctx.catalog.clear_query();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.focus = Focus::Library,
            KeyCode::Backspace => self.ctx.catalog.pop_query_char(),
            KeyCode::Down => self.ctx.catalog.select_next(),
            KeyCode::Up => self.ctx.catalog.select_prev(),
            KeyCode::Char(ch) => self.ctx.catalog.push_query_char(ch),
            _ => {}
        }
        Ok(None)
    }

    fn open_editor(&mut self) -> anyhow::Result<()> {
        let Some(editor) = self.ctx.open_editor() else {
            return Ok(());
        };
        let ticket = editor.ticket();
        info!(book = %editor.book().id, ticket, "log editor opened");
        self.editor_field = FormField::Rating;
        self.worker.submit(Job::FetchLogs { ticket })
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        let field = self.editor_field;
        let Some(editor) = self.ctx.editor.as_mut() else {
            return Ok(None);
        };

        // The error notification blocks the form until dismissed.
        if editor.error().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                editor.dismiss_error();
            }
            return Ok(None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('s') => {
                    let result = editor.begin_save();
                    self.submit_write(result)?;
                }
                KeyCode::Char('d') => {
                    let result = editor.begin_delete();
                    self.submit_write(result)?;
                }
                KeyCode::Char('u') if editor.can_submit() => editor.clear_field(field),
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => {
                if editor.status() == EditorStatus::Saving {
                    debug!("cancel ignored while a write is in flight");
                    return Ok(None);
                }
                let exit = editor.cancel();
                if self.ctx.close_editor(exit) {
                    self.request_books()?;
                }
            }
            KeyCode::Up | KeyCode::BackTab => self.editor_field = field.prev(),
            KeyCode::Down | KeyCode::Tab => self.editor_field = field.next(),
            _ if !editor.can_submit() => {}
            KeyCode::Left => editor.adjust(field, -1),
            KeyCode::Right => editor.adjust(field, 1),
            KeyCode::Backspace => editor.backspace(field),
            KeyCode::Enter if field == FormField::Notes => editor.type_char(field, '\n'),
            KeyCode::Enter => self.editor_field = field.next(),
            KeyCode::Char(' ') if field == FormField::Status => editor.adjust(field, 1),
            KeyCode::Char(ch) => editor.type_char(field, ch),
            _ => {}
        }
        Ok(None)
    }

    fn submit_write(
        &mut self,
        result: Result<booklog_application::LogRequest, EditorError>,
    ) -> anyhow::Result<()> {
        let Some(ticket) = self.ctx.editor.as_ref().map(LogEditor::ticket) else {
            return Ok(());
        };
        match result {
            Ok(request) => self.worker.submit(Job::Write { ticket, request }),
            Err(err) => {
                debug!(ticket, error = %err, "write not submitted");
                Ok(())
            }
        }
    }

    fn handle_connection_key(&mut self, key: KeyEvent) -> anyhow::Result<Option<UiExit>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char('u') = key.code {
                self.connection.input_mut().clear();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc => self.connection.open = false,
            KeyCode::Up | KeyCode::Down | KeyCode::Tab | KeyCode::BackTab => {
                self.connection.toggle_field();
            }
            KeyCode::Backspace => {
                self.connection.input_mut().pop();
            }
            KeyCode::Char(ch) => self.connection.input_mut().push(ch),
            KeyCode::Enter => {
                let settings = self.connection.to_settings();
                if !(settings.api_base_url.starts_with("http://")
                    || settings.api_base_url.starts_with("https://"))
                {
                    self.connection.error =
                        Some("API base URL must start with http:// or https://".to_string());
                    return Ok(None);
                }
                self.connection.open = false;
                if settings == self.ctx.settings {
                    return Ok(None);
                }
                info!(base_url = %settings.api_base_url, "connection settings changed");
                self.ctx.settings = settings;
                return Ok(Some(UiExit::Reconnect));
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(area);

        let header = Paragraph::new(Text::from(self.header_lines()))
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(layout[1]);
        self.draw_library(frame, body[0]);
        frame.render_widget(self.draw_details(), body[1]);

        let footer = Paragraph::new(Text::from(self.footer_lines()))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);

        if let Some(editor) = &self.ctx.editor {
            draw_editor(editor, self.editor_field, area, frame);
            if let Some(message) = editor.error() {
                draw_error_popup(message, area, frame);
            }
        }

        if self.connection.open {
            self.draw_connection_panel(area, frame);
        }
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let title = Line::from(vec![
            Span::styled("Booklog", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" · "),
            Span::styled(
                self.ctx.settings.api_base_url.clone(),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        let searching = self.focus == Focus::Search && self.ctx.editor.is_none();
        let query = self.ctx.catalog.query();
        let mut search = vec![Span::styled(
            "Search: ",
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if query.is_empty() && !searching {
            search.push(Span::styled(
                "press / to filter by title, author or genre",
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            search.push(Span::raw(query.to_string()));
        }
        if searching {
            search.push(Span::styled("▏", Style::default().fg(ACCENT)));
        }

        vec![title, Line::from(search)]
    }

    fn footer_lines(&self) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let hints: &[(&str, &str)] = if self.connection.open {
            &[("Esc", "cancel"), ("↑/↓", "field"), ("Enter", "apply"), ("Ctrl+u", "clear")]
        } else if self.ctx.editor.is_some() {
            &[
                ("↑/↓", "field"),
                ("←/→", "adjust"),
                ("Ctrl+s", "save"),
                ("Ctrl+d", "delete"),
                ("Esc", "cancel"),
            ]
        } else if self.focus == Focus::Search {
            &[("Enter/Esc", "done"), ("Backspace", "delete"), ("Ctrl+u", "clear")]
        } else {
            &[
                ("Esc", "quit"),
                ("↑/↓", "move"),
                ("Enter", "log"),
                ("/", "search"),
                ("s", "connection"),
            ]
        };

        let mut spans = Vec::new();
        for (idx, (key, action)) in hints.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(key.to_string(), bold));
            spans.push(Span::raw(format!(" {action}")));
        }
        vec![Line::from(spans)]
    }

    fn draw_library(&self, frame: &mut ratatui::Frame, area: Rect) {
        let catalog = &self.ctx.catalog;
        let visible = catalog.visible_books();
        let mut title = if catalog.query().is_empty() {
            format!("Books ({})", catalog.books().len())
        } else {
            format!(
                "Books — {}/{} matches",
                visible.len(),
                catalog.books().len()
            )
        };
        if self.books_loading {
            title.push_str(" · loading…");
        } else if self.books_failed {
            title.push_str(" · refresh failed");
        }
        let block = Block::default().borders(Borders::ALL).title(title);

        if visible.is_empty() {
            let message = if !catalog.is_loaded() && self.books_loading {
                "Loading books…"
            } else {
                "No books found."
            };
            let paragraph = Paragraph::new(Text::from(vec![Line::raw(message)]))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let max_width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = visible
            .iter()
            .map(|book| {
                let rating = match book.average_rating() {
                    Some(rating) => format!("{} {:.1}", rating.glyphs(), book.avg_rating),
                    None => "Not yet rated".to_string(),
                };
                let subtitle = format!("{} · {rating}", book.display_authors());
                ListItem::new(Text::from(vec![
                    Line::raw(truncate_to_width(&book.title, max_width)),
                    Line::styled(
                        truncate_to_width(&subtitle, max_width),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(catalog.cursor_position());
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_details(&self) -> Paragraph<'static> {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(book) = self.ctx.catalog.cursor_book() else {
            return Paragraph::new(Line::raw("No selection.")).block(block);
        };
        Paragraph::new(Text::from(book_detail_lines(book)))
            .block(block)
            .wrap(Wrap { trim: true })
    }

    fn draw_connection_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            "Connection",
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let panel = &self.connection;
        let row = |field: ConnectionField, label: &str, value: String| {
            let selected = panel.field == Some(field);
            let marker = if selected { "> " } else { "  " };
            let value_style = if selected {
                Style::default().fg(ACCENT)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(value, value_style),
            ])
        };

        let mut lines = vec![
            row(ConnectionField::BaseUrl, "API base URL", panel.base_url.clone()),
            row(ConnectionField::Token, "Access token", mask_token(&panel.token)),
            Line::raw(""),
            Line::styled(
                "Applying reconnects and reloads the catalog.",
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(err) = &panel.error {
            lines.push(Line::styled(
                err.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ));
        }

        frame.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);
    }
}

fn book_detail_lines(book: &Book) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let field = |label: &str, value: String| {
        Line::from(vec![Span::styled(format!("{label}: "), bold), Span::raw(value)])
    };
    let or_dash = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("-")
            .to_string()
    };

    let mut lines = vec![
        Line::styled(book.title.clone(), bold),
        Line::raw(format!("by {}", book.display_authors())),
        Line::raw(""),
    ];

    let published = match (&book.publisher, &book.publish_date) {
        (Some(publisher), Some(date)) => format!("{publisher} · {date}"),
        (Some(publisher), None) => publisher.clone(),
        (None, Some(date)) => date.clone(),
        (None, None) => "-".to_string(),
    };
    lines.push(field("Published", published));
    lines.push(field(
        "Pages",
        book.known_page_count()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ));
    let genres = book.genres_line();
    lines.push(field(
        "Genres",
        if genres.is_empty() { "-".to_string() } else { genres },
    ));
    lines.push(field("ISBN-10", or_dash(&book.isbn_10)));
    lines.push(field("ISBN-13", or_dash(&book.isbn_13)));

    let rating = match book.average_rating() {
        Some(rating) => format!(
            "{} {:.1} ({} ratings)",
            rating.glyphs(),
            book.avg_rating,
            book.rating_count
        ),
        None => "Not yet rated".to_string(),
    };
    lines.push(field("Rating", rating));

    if let Some(description) = book.description.as_deref().filter(|d| !d.trim().is_empty()) {
        lines.push(Line::raw(""));
        lines.extend(description.lines().map(|l| Line::raw(l.to_string())));
    }
    lines
}

fn draw_editor(editor: &LogEditor, focused: FormField, area: Rect, frame: &mut ratatui::Frame) {
    let popup_area = centered_rect(64, 80, area);
    frame.render_widget(Clear, popup_area);

    let title = match editor.mode() {
        LogMode::New => "New reading log",
        LogMode::Existing { .. } => "Reading log",
    };
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Text::from(editor_lines(editor, focused))).wrap(Wrap { trim: false }),
        sections[0],
    );
    frame.render_widget(Paragraph::new(action_line(editor)), sections[1]);
}

fn editor_lines(editor: &LogEditor, focused: FormField) -> Vec<Line<'static>> {
    let book = editor.book();
    let form = editor.form();
    let mut lines = vec![
        Line::styled(
            book.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::styled(book.display_authors(), Style::default().fg(Color::DarkGray)),
    ];
    lines.push(match editor.status() {
        EditorStatus::Loading => Line::styled("Loading log…", Style::default().fg(ACCENT)),
        EditorStatus::Saving => Line::styled("Saving…", Style::default().fg(ACCENT)),
        EditorStatus::Idle => Line::raw(""),
    });

    let row = |field: FormField, glyph: &str, value: Vec<Span<'static>>| {
        let selected = field == focused;
        let label_style = if selected {
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let mut spans = vec![
            Span::raw(if selected { "> " } else { "  " }),
            Span::styled(format!("{glyph} {:<14}", field.label()), label_style),
        ];
        spans.extend(value);
        Line::from(spans)
    };
    let placeholder = |value: &str, hint: &'static str| {
        if value.is_empty() {
            Span::styled(hint, Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(value.to_string())
        }
    };

    lines.push(row(
        FormField::Rating,
        "⊙",
        vec![
            Span::styled(form.rating.glyphs(), Style::default().fg(ACCENT)),
            Span::raw(format!(" {}", form.rating)),
        ],
    ));
    lines.push(row(
        FormField::Status,
        "✦",
        vec![Span::raw(format!("‹ {} ›", form.status.label()))],
    ));
    let pages = match book.known_page_count() {
        Some(total) => format!("{} / {total}", form.current_page),
        None => form.current_page.to_string(),
    };
    lines.push(row(FormField::CurrentPage, "#", vec![Span::raw(pages)]));

    let progress = editor.progress();
    if let (Some(percent), Some(shown)) = (progress.percent(), progress.display_percent()) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
                format!("∑ {:<14}", "Progress"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(progress_bar(shown, PROGRESS_BAR_WIDTH), Style::default().fg(ACCENT)),
            Span::raw(format!(" {percent}%")),
        ]));
    }

    lines.push(row(
        FormField::DateStarted,
        "▶",
        vec![placeholder(&form.date_started, "YYYY-MM-DD")],
    ));
    lines.push(row(
        FormField::DateFinished,
        "■",
        vec![placeholder(&form.date_finished, "YYYY-MM-DD")],
    ));
    lines.push(row(FormField::Notes, "≡", Vec::new()));
    if form.notes.is_empty() {
        lines.push(Line::styled(
            "    (no notes)",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        lines.extend(form.notes.lines().map(|l| Line::raw(format!("    {l}"))));
    }
    lines
}

fn action_line(editor: &LogEditor) -> Line<'static> {
    let enabled = Style::default().add_modifier(Modifier::BOLD);
    let disabled = Style::default().fg(Color::DarkGray);
    let save_style = if editor.can_submit() { enabled } else { disabled };

    let mut spans = vec![
        Span::styled("[Ctrl+s] ", save_style),
        Span::styled(editor.save_label(), save_style),
    ];
    if matches!(editor.mode(), LogMode::Existing { .. }) {
        let style = if editor.can_delete() {
            enabled.fg(Color::Red)
        } else {
            disabled
        };
        spans.push(Span::raw("   "));
        spans.push(Span::styled("[Ctrl+d] Delete", style));
    }
    spans.push(Span::raw("   "));
    spans.push(Span::styled("[Esc] Cancel", enabled));
    Line::from(spans)
}

fn draw_error_popup(message: &str, area: Rect, frame: &mut ratatui::Frame) {
    let popup_area = centered_rect(40, 20, area);
    frame.render_widget(Clear, popup_area);
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        "Error",
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ));
    let lines = vec![
        Line::raw(message.to_string()),
        Line::raw(""),
        Line::styled("Enter to dismiss", Style::default().fg(Color::DarkGray)),
    ];
    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Cuts `text` to at most `max_width` columns, ending in `…` when shortened.
fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max_width - 1 {
            break;
        }
        out.push(ch);
        width += w;
    }
    out.push('…');
    out
}

fn progress_bar(percent: u32, width: usize) -> String {
    let filled = (percent.min(100) as usize * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn mask_token(token: &str) -> String {
    if token.is_empty() {
        "(none)".to_string()
    } else {
        "•".repeat(token.chars().count().min(24))
    }
}
