//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;

use headgate_core::{Controller, ScheduleWindow};

use crate::cli::{GlobalOpts, ScheduleArgs};
use crate::config;
use crate::error::CliError;

// ── Session bootstrap ────────────────────────────────────────────────

/// Resolve the profile and acting user, run `f` against a connected
/// controller, and tear it down.
///
/// Every device-facing command funnels through here so that profile
/// resolution, the sign-in requirement, and the connect spinner behave
/// identically across subcommands.
pub async fn with_session<T, F, Fut>(global: &GlobalOpts, f: F) -> Result<T, CliError>
where
    F: FnOnce(Controller) -> Fut,
    Fut: std::future::Future<Output = Result<T, headgate_core::CoreError>>,
{
    let resolved = config::resolve_backend(global)?;
    let user = config::require_user(global, &resolved.config, &resolved.profile_name)?;

    let spin = spinner("Contacting backend...", global.quiet);
    let result = Controller::oneshot(resolved.backend, &user, f).await;
    spin.finish_and_clear();

    result.map_err(CliError::from)
}

/// A throwaway spinner for network round trips.
///
/// Draws to stderr and stays hidden in quiet mode or when stderr is
/// not a terminal, so piped output never sees control codes.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner().with_message(message.to_string());
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .expect("static spinner template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", ""]),
    );
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── Interactive prompts ──────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Prompt for a free-text line (user names, IMEIs).
pub fn prompt_line(prompt: &str) -> Result<String, CliError> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

/// Prompt for a password without echo.
pub fn prompt_password(prompt: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("{prompt}: "))?;
    Ok(SecretString::from(password))
}

// ── Wall-clock time parsing ──────────────────────────────────────────

/// Parse a schedule time the way operators type them.
///
/// Accepted forms, tried in order:
/// - `2024-03-10T08:30:00` / `2024-03-10T08:30`
/// - `2024-03-10 08:30:00` / `2024-03-10 08:30`
/// - `08:30:00` / `08:30` (today's date)
/// - `+30m`, `+2h 15m` (offset from now, humantime syntax)
///
/// Times are naive local wall clock; the controllers share no timezone.
pub fn parse_local_time(input: &str) -> Result<NaiveDateTime, CliError> {
    let input = input.trim();

    if let Some(offset) = input.strip_prefix('+') {
        let duration = humantime::parse_duration(offset.trim()).map_err(|e| {
            CliError::Validation {
                field: "time".into(),
                reason: format!("bad relative offset '{input}': {e}"),
            }
        })?;
        let duration = chrono::Duration::from_std(duration).map_err(|_| CliError::Validation {
            field: "time".into(),
            reason: format!("relative offset '{input}' is out of range"),
        })?;
        return Ok(Local::now().naive_local() + duration);
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(parsed);
        }
    }

    const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
    for format in TIME_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(input, format) {
            return Ok(Local::now().date_naive().and_time(parsed));
        }
    }

    Err(CliError::Validation {
        field: "time".into(),
        reason: format!(
            "cannot parse '{input}'; try '2024-03-10T08:30', '08:30', or '+30m'"
        ),
    })
}

/// Parse a `--start`/`--stop` pair into a schedule window.
pub fn parse_schedule(args: &ScheduleArgs) -> Result<ScheduleWindow, CliError> {
    let start = parse_local_time(&args.start)?;
    let stop = parse_local_time(&args.stop)?;
    Ok(ScheduleWindow::new(start, stop))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_datetime() {
        let t = parse_local_time("2024-03-10T08:30:00").unwrap();
        assert_eq!(t.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-03-10T08:30:00");
    }

    #[test]
    fn parses_datetime_without_seconds() {
        let t = parse_local_time("2024-03-10 08:30").unwrap();
        assert_eq!(t.format("%H:%M:%S").to_string(), "08:30:00");
    }

    #[test]
    fn bare_time_lands_on_today() {
        let t = parse_local_time("23:59").unwrap();
        assert_eq!(t.date(), Local::now().date_naive());
    }

    #[test]
    fn relative_offset_moves_forward() {
        let before = Local::now().naive_local();
        let t = parse_local_time("+2h").unwrap();
        assert!(t > before + chrono::Duration::minutes(119));
    }

    #[test]
    fn garbage_is_rejected_with_examples() {
        let err = parse_local_time("next tuesday").unwrap_err();
        assert!(err.to_string().contains("time"));
    }
}
