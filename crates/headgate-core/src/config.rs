// ── Runtime backend configuration ──
//
// These types describe *how* to reach the irrigation backend.
// They carry connection tuning but never touch disk -- the CLI/TUI
// constructs a `BackendConfig` from its profile layer and hands it in.

use std::time::Duration;

use url::Url;

use crate::session::MotorPolicy;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default -- the backend is a public
    /// HTTPS service, not a self-signed local box.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (lab setups behind self-signed proxies).
    DangerAcceptInvalid,
}

/// Configuration for one backend connection.
///
/// Built by CLI/TUI, passed to `Controller` -- core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// API root, e.g. `https://backend.example.com/api`.
    pub base_url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// How often to re-fetch the device list (seconds). 0 = never;
    /// the dashboard is command-driven, not telemetry-driven.
    pub refresh_interval_secs: u64,
    /// How to treat accounts reporting more than one motor.
    pub motor_policy: MotorPolicy,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            // The stock ASP.NET development binding; deployments always
            // override this through config or HEADGATE_BACKEND.
            base_url: Url::parse("http://localhost:5000/api").expect("static default URL"),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval_secs: 0,
            motor_policy: MotorPolicy::default(),
        }
    }
}
