use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context as _;
use booklog_api::ApiClient;
use booklog_application::AppContext;
use booklog_core::Settings;
use booklog_storage::Storage;
use booklog_ui::{Ui, UiExit};
use directories::ProjectDirs;
use tracing::info;

const ENV_API_URL: &str = "BOOKLOG_API_URL";
const ENV_TOKEN: &str = "BOOKLOG_TOKEN";
const ENV_LOG: &str = "BOOKLOG_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dirs =
        ProjectDirs::from("dev", "booklog", "booklog").context("resolve project dirs")?;

    let data_dir = project_dirs.data_dir();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;
    configure_logging(&data_dir.join("booklog.log"))?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;

    let storage = Storage::open(config_dir.join("booklog.db"))?;
    let mut settings = storage.load_settings()?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    info!(base_url = %settings.api_base_url, "booklog starting");

    let mut ctx = AppContext::new(settings);
    loop {
        let api = ApiClient::new(&ctx.settings)?;
        let mut ui = Ui::new(ctx, Box::new(api))?;
        let outcome = ui.run()?;
        ctx = outcome.ctx;

        match outcome.exit {
            UiExit::Quit => break,
            // Only settings applied from the connection panel are persisted.
            UiExit::Reconnect => storage.save_settings(&ctx.settings)?,
        }
    }

    info!("booklog exiting");
    Ok(())
}

/// The terminal belongs to the UI, so log lines go to a file.
fn configure_logging(path: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::prelude::*;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_API_URL) {
        settings.api_base_url = url;
    }
    if let Some(token) = lookup(ENV_TOKEN) {
        settings.access_token = Some(token);
    }
    settings.normalize();
}
