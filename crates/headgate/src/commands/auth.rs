//! Sign-in, sign-out, registration, and the session overview.

use std::io::IsTerminal;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use headgate_config::{self as cfg, SessionStore, StoredSession};
use headgate_core::{Controller, RegisterAccount};

use crate::cli::{GlobalOpts, LoginArgs, LogoutArgs, RegisterArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Login ───────────────────────────────────────────────────────────

pub async fn login(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve_backend(global)?;
    let profile = resolved.config.profiles.get(&resolved.profile_name);

    let user = match args
        .user
        .clone()
        .or_else(|| global.user.clone())
        .or_else(|| profile.and_then(cfg::resolve_username))
    {
        Some(user) => user,
        None => util::prompt_line("User name")?,
    };

    let password = match profile {
        Some(profile) => match cfg::resolve_password(profile, &resolved.profile_name) {
            Ok(password) => password,
            Err(cfg::ConfigError::NoCredentials { .. }) => util::prompt_password("Password")?,
            Err(e) => return Err(e.into()),
        },
        None => match std::env::var("HEADGATE_PASSWORD") {
            Ok(password) => SecretString::from(password),
            Err(_) => util::prompt_password("Password")?,
        },
    };

    let controller = Controller::new(resolved.backend)?;
    let spin = util::spinner("Signing in...", global.quiet);
    let outcome = controller.sign_in(&user, &password).await;
    spin.finish_and_clear();
    controller.shutdown().await;
    outcome?;

    SessionStore::default_location().save(&StoredSession::new(&user))?;

    if args.save_password {
        cfg::store_password(&resolved.profile_name, password.expose_secret())?;
        if !global.quiet {
            eprintln!("Password stored in the system keyring");
        }
    }

    if !global.quiet {
        eprintln!("Signed in as {user}");
    }
    Ok(())
}

// ── Logout ──────────────────────────────────────────────────────────

pub fn logout(args: &LogoutArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = SessionStore::default_location();
    let previous = store.load().unwrap_or_default();
    store.clear()?;

    if args.forget {
        let config = cfg::load_config_or_default();
        let profile_name = config::active_profile_name(global, &config);
        cfg::forget_password(&profile_name)?;
        if !global.quiet {
            eprintln!("Stored password removed from the system keyring");
        }
    }

    if !global.quiet {
        match previous {
            Some(session) => eprintln!("Signed out ({})", session.user_name),
            None => eprintln!("Nobody was signed in"),
        }
    }
    Ok(())
}

// ── Register ────────────────────────────────────────────────────────

pub async fn register(args: RegisterArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve_backend(global)?;

    let user_name = required_field(args.user, "user", "User name")?;
    let first_name = required_field(args.first_name, "first-name", "First name")?;
    let last_name = required_field(args.last_name, "last-name", "Last name")?;
    let email = required_field(args.email, "email", "Email")?;
    let imei = required_field(args.imei, "imei", "Controller IMEI")?;

    // The password never travels through argv or the process list.
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "registration prompts for the password and needs a terminal".into(),
        });
    }
    let password = util::prompt_password("Password")?;
    let repeat = util::prompt_password("Repeat password")?;
    if password.expose_secret() != repeat.expose_secret() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "passwords do not match".into(),
        });
    }

    let account = RegisterAccount {
        user_name: user_name.clone(),
        first_name,
        last_name,
        email,
        password,
        imei,
    };

    let controller = Controller::new(resolved.backend)?;
    let spin = util::spinner("Creating account...", global.quiet);
    let outcome = controller.register(&account).await;
    spin.finish_and_clear();
    controller.shutdown().await;
    outcome?;

    if !global.quiet {
        eprintln!("Account {user_name} created; sign in with: headgate login {user_name}");
    }
    Ok(())
}

/// A flag value, or an interactive prompt when the terminal allows it.
fn required_field(
    value: Option<String>,
    flag: &str,
    prompt: &str,
) -> Result<String, CliError> {
    if let Some(value) = value {
        return Ok(value);
    }
    if std::io::stdin().is_terminal() {
        return util::prompt_line(prompt);
    }
    Err(CliError::Validation {
        field: flag.into(),
        reason: format!("--{flag} is required when not running interactively"),
    })
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusSummary {
    user: String,
    profile: String,
    backend: String,
    motor_imei: Option<String>,
    motor_active: Option<bool>,
    valve_count: usize,
    open_valves: usize,
    default_valve: Option<String>,
}

fn status_detail(s: &StatusSummary, color: bool) -> String {
    let mut lines = vec![
        format!("User:    {}", s.user),
        format!("Profile: {}", s.profile),
        format!("Backend: {}", s.backend),
    ];
    match (&s.motor_imei, s.motor_active) {
        (Some(imei), Some(active)) => lines.push(format!(
            "Motor:   {} ({imei})",
            output::paint_state(active, color)
        )),
        _ => lines.push("Motor:   none mapped".into()),
    }
    lines.push(format!(
        "Valves:  {} ({} open)",
        s.valve_count, s.open_valves
    ));
    if let Some(imei) = &s.default_valve {
        lines.push(format!("Default: {imei}"));
    }
    lines.join("\n")
}

pub async fn status(global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve_backend(global)?;
    let user = config::require_user(global, &resolved.config, &resolved.profile_name)?;

    let backend_url = resolved.backend.base_url.to_string();
    let spin = util::spinner("Contacting backend...", global.quiet);
    let session = Controller::oneshot(resolved.backend, &user, |controller| async move {
        Ok(controller.session_snapshot())
    })
    .await;
    spin.finish_and_clear();
    let session = session.map_err(CliError::from)?;

    let summary = StatusSummary {
        user: session.user_name().to_string(),
        profile: resolved.profile_name,
        backend: backend_url,
        motor_imei: session.motor().map(|d| d.imei.clone()),
        motor_active: session.motor().map(|d| d.active),
        valve_count: session.valve_count(),
        open_valves: session.valves().iter().filter(|v| v.active).count(),
        default_valve: session
            .valves()
            .iter()
            .find(|v| v.default_valve)
            .map(|v| v.imei.clone()),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &summary,
        |s| status_detail(s, color),
        |s| s.user.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
