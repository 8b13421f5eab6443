//! Sqlite-backed settings persistence.

use std::path::Path;

use anyhow::Context as _;
use booklog_core::{DEFAULT_API_BASE_URL, Settings};
use rusqlite::{Connection, OptionalExtension as _};
use tracing::debug;

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        debug!(path = %path.as_ref().display(), "settings store ready");
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                api_base_url TEXT NOT NULL
            );
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO settings (id, api_base_url) VALUES (1, ?)",
            [DEFAULT_API_BASE_URL],
        )?;

        self.add_column("settings", "access_token TEXT")?;
        Ok(())
    }

    fn add_column(&self, table: &str, column: &str) -> anyhow::Result<()> {
        match self
            .conn
            .execute(&format!("ALTER TABLE {table} ADD COLUMN {column}"), [])
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                if msg.contains("duplicate column name") {
                    Ok(())
                } else {
                    Err(err).with_context(|| format!("add {table}.{column} column"))
                }
            }
        }
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT api_base_url, access_token FROM settings WHERE id = 1",
                [],
                |row| {
                    let api_base_url: String = row.get(0)?;
                    let access_token: Option<String> = row.get(1)?;
                    Ok((api_base_url, access_token))
                },
            )
            .optional()?;

        let mut settings = match row {
            Some((api_base_url, access_token)) => Settings {
                api_base_url,
                access_token,
            },
            None => Settings::default(),
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET api_base_url = ?, access_token = ? WHERE id = 1",
            (&settings.api_base_url, &settings.access_token),
        )?;
        Ok(())
    }
}
