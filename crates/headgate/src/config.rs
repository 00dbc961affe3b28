//! Glue between CLI flags and the shared configuration crate.
//!
//! `headgate-config` owns the TOML schema, the credential chain, and the
//! translation to `headgate_core::BackendConfig`; this module layers the
//! per-invocation flag overrides on top.

use std::time::Duration;

use headgate_config::{self as cfg, Config, Profile, SessionStore};
use headgate_core::{BackendConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The fully resolved connection context for one invocation.
pub struct ResolvedBackend {
    pub config: Config,
    pub profile_name: String,
    pub backend: BackendConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Load the configuration and translate the selected profile into a
/// `BackendConfig`, applying `--backend`, `--insecure`, and `--timeout`
/// overrides.
///
/// A missing profile is not fatal when `--backend` supplies the URL;
/// that keeps `headgate -b https://... login` working on a fresh machine.
pub fn resolve_backend(global: &GlobalOpts) -> Result<ResolvedBackend, CliError> {
    let config = cfg::load_config()?;
    let profile_name = active_profile_name(global, &config);

    let mut backend = match (config.profiles.get(&profile_name), global.backend.as_deref()) {
        (Some(profile), _) => cfg::profile_to_backend_config(profile, &config.defaults)?,
        (None, Some(url)) => {
            let synthesized = Profile {
                backend: url.into(),
                ..Profile::default()
            };
            cfg::profile_to_backend_config(&synthesized, &config.defaults)?
        }
        (None, None) if config.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: cfg::config_path().display().to_string(),
            });
        }
        (None, None) => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
    };

    if let Some(url) = global.backend.as_deref() {
        backend.base_url = url.parse().map_err(|_| CliError::Validation {
            field: "backend".into(),
            reason: format!("invalid URL: {url}"),
        })?;
    }
    if global.insecure {
        backend.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        backend.timeout = Duration::from_secs(secs);
    }

    Ok(ResolvedBackend {
        config,
        profile_name,
        backend,
    })
}

/// Resolve the acting user name: flag, then stored session, then profile.
///
/// The backend issues no tokens, so whoever's name we act under IS the
/// session. A profile with `username` set works without a prior `login`.
pub fn resolve_user(global: &GlobalOpts, config: &Config, profile_name: &str) -> Option<String> {
    if let Some(user) = &global.user {
        return Some(user.clone());
    }
    if let Ok(Some(stored)) = SessionStore::default_location().load() {
        return Some(stored.user_name);
    }
    config
        .profiles
        .get(profile_name)
        .and_then(cfg::resolve_username)
}

/// Resolve the acting user or fail with a sign-in hint.
pub fn require_user(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<String, CliError> {
    resolve_user(global, config, profile_name).ok_or(CliError::NotLoggedIn)
}
