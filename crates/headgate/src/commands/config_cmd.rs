//! Config subcommand handlers.

use dialoguer::{Input, Select};

use headgate_config::{self as cfg, Config, Profile};
use headgate_core::MotorPolicy;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(config: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = config.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", config.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", config.defaults.color);
    let _ = writeln!(out, "insecure = {}", config.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", config.defaults.timeout);

    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &config.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "backend = \"{}\"", p.backend);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(policy) = p.motor_policy {
            let _ = writeln!(out, "motor_policy = \"{}\"", policy_name(policy));
        }
        if let Some(interval) = p.refresh_interval {
            let _ = writeln!(out, "refresh_interval = {interval}");
        }
    }

    out
}

fn policy_name(policy: MotorPolicy) -> &'static str {
    match policy {
        MotorPolicy::FirstWins => "first-wins",
        MotorPolicy::Strict => "strict",
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Offer to store the password in the system keyring, the config file,
/// or nowhere (prompt at login).
///
/// Returns `Some(password)` if the user chose plaintext, `None` otherwise.
fn prompt_password_storage(profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Skip (prompt at login)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 2 {
        return Ok(None);
    }

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }

    if selection == 0 {
        cfg::store_password(profile_name, &password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password))
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = cfg::config_path();
            if config_path.exists()
                && !util::confirm("Config file exists, rewrite it?", global.yes)?
            {
                eprintln!("Aborted");
                return Ok(());
            }
            eprintln!("✨ headgate -- configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let backend: String = Input::new()
                .with_prompt("Backend URL")
                .default("https://backend.dhiever.com/api".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("Account user name (empty to skip)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;
            let username = (!username.is_empty()).then_some(username);

            let password = if username.is_some() {
                prompt_password_storage(&profile_name)?
            } else {
                None
            };

            let profile = Profile {
                backend,
                username,
                password,
                ..Profile::default()
            };

            let mut config = cfg::load_config_or_default();
            config.default_profile = Some(profile_name.clone());
            config.profiles.insert(profile_name.clone(), profile);

            cfg::save_config(&config)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: headgate login");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let config = cfg::load_config_or_default();
            let out = output::render_single(&global.output, &config, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut config = cfg::load_config_or_default();
            let profile_name = config::active_profile_name(global, &config);

            let profile = config
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(Profile::default);

            match key.as_str() {
                "backend" => profile.backend = value,
                "username" => profile.username = Some(value),
                "password" => profile.password = Some(value),
                "password_env" | "password-env" => profile.password_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => {
                    profile.insecure = Some(value.parse().map_err(|_| CliError::Validation {
                        field: "insecure".into(),
                        reason: "must be 'true' or 'false'".into(),
                    })?);
                }
                "timeout" => {
                    profile.timeout = Some(value.parse().map_err(|_| CliError::Validation {
                        field: "timeout".into(),
                        reason: "must be a number (seconds)".into(),
                    })?);
                }
                "motor_policy" | "motor-policy" => {
                    profile.motor_policy = Some(match value.as_str() {
                        "first-wins" => MotorPolicy::FirstWins,
                        "strict" => MotorPolicy::Strict,
                        _ => {
                            return Err(CliError::Validation {
                                field: "motor_policy".into(),
                                reason: "must be 'first-wins' or 'strict'".into(),
                            });
                        }
                    });
                }
                "refresh_interval" | "refresh-interval" => {
                    profile.refresh_interval =
                        Some(value.parse().map_err(|_| CliError::Validation {
                            field: "refresh_interval".into(),
                            reason: "must be a number (seconds, 0 disables)".into(),
                        })?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: backend, username, \
                             password, password_env, ca_cert, insecure, timeout, motor_policy, \
                             refresh_interval"
                        ),
                    });
                }
            }

            cfg::save_config(&config)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let config = cfg::load_config_or_default();
            let default = config.default_profile.as_deref().unwrap_or("default");
            if config.profiles.is_empty() {
                eprintln!("No profiles configured. Run: headgate config init");
            } else {
                let mut names: Vec<_> = config.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut config = cfg::load_config_or_default();

            if !config.profiles.contains_key(&name) {
                let available: Vec<_> = config.profiles.keys().cloned().collect();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                });
            }

            config.default_profile = Some(name.clone());
            cfg::save_config(&config)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let config = cfg::load_config_or_default();
            let profile_name =
                profile.unwrap_or_else(|| config::active_profile_name(global, &config));

            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            cfg::store_password(&profile_name, &password)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
