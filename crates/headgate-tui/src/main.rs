//! `headgate-tui` -- terminal dashboard for irrigation pump and
//! gate-valve controllers.
//!
//! Built on [ratatui](https://ratatui.rs) with reactive session state
//! from `headgate-core`. The signed-in world is two screens, reachable
//! by number keys: Dashboard (1) and Mapping (2). Without a stored
//! session the sign-in screen comes up first.
//!
//! Logs are written to a file (default `/tmp/headgate-tui.log`) to
//! avoid corrupting the terminal UI. A background data bridge task
//! streams session and phase updates from the controller into the TUI
//! action loop.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and
//! app launch.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use headgate_config::SessionStore;
use headgate_core::{BackendConfig, Controller};

use crate::app::App;

/// Terminal dashboard for irrigation pump and gate-valve controllers.
#[derive(Parser, Debug)]
#[command(name = "headgate-tui", version, about)]
struct Cli {
    /// Backend profile from the config file (defaults to the
    /// configured default profile)
    #[arg(short = 'p', long, env = "HEADGATE_PROFILE")]
    profile: Option<String>,

    /// Log file path (defaults to /tmp/headgate-tui.log)
    #[arg(long, default_value = "/tmp/headgate-tui.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr; that
/// would corrupt the TUI output. Returns a guard that must be held for
/// the lifetime of the application to ensure logs are flushed.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("headgate_tui={log_level}")));

    let log_dir = cli
        .log_file
        .parent()
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("headgate-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Resolve the backend config and a username prefill from the config
/// file. An explicitly requested profile must exist; the implicit
/// default quietly falls back to the stock backend.
fn resolve_backend(cli: &Cli) -> Result<(BackendConfig, Option<String>)> {
    let config = headgate_config::load_config_or_default();
    let profile_name = cli
        .profile
        .clone()
        .or_else(|| config.default_profile.clone());

    let Some(name) = profile_name else {
        return Ok((BackendConfig::default(), None));
    };

    match config.profiles.get(&name) {
        Some(profile) => {
            let backend = headgate_config::profile_to_backend_config(profile, &config.defaults)?;
            Ok((backend, headgate_config::resolve_username(profile)))
        }
        None if cli.profile.is_some() => {
            bail!("profile '{name}' not found in config");
        }
        None => Ok((BackendConfig::default(), None)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Tracing to file; hold the guard so logs flush on exit
    let _log_guard = setup_tracing(&cli);

    let (backend, profile_user) = resolve_backend(&cli)?;
    let backend_label = backend.base_url.to_string();

    let session_store = SessionStore::default_location();
    let resume_user = match session_store.load() {
        Ok(stored) => stored.map(|s| s.user_name),
        Err(e) => {
            warn!(error = %e, "could not read stored session");
            None
        }
    };
    let prefill_user = resume_user.clone().or(profile_user);

    info!(
        backend = %backend_label,
        resuming = resume_user.is_some(),
        "starting headgate-tui"
    );

    let controller = Controller::new(backend)?;
    let mut app = App::new(
        controller,
        session_store,
        backend_label,
        prefill_user,
        resume_user,
    );
    app.run().await?;

    Ok(())
}
