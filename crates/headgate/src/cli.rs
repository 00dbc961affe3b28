//! Clap derive structures for the `headgate` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Only depends on `clap` + `clap_complete` so `build.rs` can include
//! it for man page generation.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// headgate -- terminal control for irrigation pump and valve controllers
#[derive(Debug, Parser)]
#[command(
    name = "headgate",
    version,
    about = "Control irrigation pumps and gate valves from the command line",
    long_about = "A CLI for IMEI-addressed irrigation controllers.\n\n\
        Talks to the Dhiever backend: sign in once, then start, stop, and\n\
        schedule the pump motor and its gate valves from any terminal.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "HEADGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'b', env = "HEADGATE_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Account user name (overrides the stored session)
    #[arg(long, short = 'u', env = "HEADGATE_USERNAME", global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HEADGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "HEADGATE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HEADGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to the backend and persist the session
    Login(LoginArgs),

    /// Sign out and clear the persisted session
    Logout(LogoutArgs),

    /// Create a new backend account
    Register(RegisterArgs),

    /// Show the signed-in account and device overview
    #[command(alias = "st")]
    Status,

    /// Control the pump motor
    #[command(alias = "pump", alias = "m")]
    Motor(MotorArgs),

    /// Control gate valves
    #[command(alias = "gv", alias = "v")]
    Valve(ValveArgs),

    /// List every controller on the account
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Pair a motor controller with a gate valve
    Map(MapArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account user name (prompted when omitted)
    pub user: Option<String>,

    /// Store the password in the system keyring after a successful login
    #[arg(long)]
    pub save_password: bool,
}

#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Also remove the stored password from the system keyring
    #[arg(long)]
    pub forget: bool,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Account user name (prompted when omitted)
    #[arg(long)]
    pub user: Option<String>,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// IMEI of the first controller to bind to the account
    #[arg(long)]
    pub imei: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MOTOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MotorArgs {
    #[command(subcommand)]
    pub command: MotorCommand,
}

#[derive(Debug, Subcommand)]
pub enum MotorCommand {
    /// Show the motor's reported state
    Status,

    /// Start the motor now
    Start,

    /// Stop the motor now
    Stop,

    /// Send a run window (start time and stop time) to the motor
    Schedule(ScheduleArgs),
}

/// A run window for `schedule` commands.
///
/// Times are local wall clock: "2024-03-10T08:30:00",
/// "2024-03-10 08:30", a bare "08:30" for today, or a relative
/// "+30m" / "+2h" offset from now.
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// When the device should switch on
    #[arg(long)]
    pub start: String,

    /// When the device should switch off
    #[arg(long)]
    pub stop: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VALVES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ValveArgs {
    #[command(subcommand)]
    pub command: ValveCommand,
}

#[derive(Debug, Subcommand)]
pub enum ValveCommand {
    /// List gate valves in backend order
    #[command(alias = "ls")]
    List,

    /// Show one valve's reported state
    Show {
        /// Valve IMEI
        imei: String,
    },

    /// Open a valve now
    Start {
        /// Valve IMEI
        imei: String,
    },

    /// Close a valve now
    Stop {
        /// Valve IMEI
        imei: String,
    },

    /// Send a run window to a valve
    Schedule {
        /// Valve IMEI
        imei: String,

        #[command(flatten)]
        window: ScheduleArgs,
    },

    /// Mark a valve as the default (opens automatically with the motor)
    SetDefault {
        /// Valve IMEI
        imei: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MAPPING
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Motor controller IMEI
    #[arg(value_name = "MOTOR_IMEI")]
    pub motor_imei: String,

    /// Gate valve IMEI
    #[arg(value_name = "VALVE_IMEI")]
    pub valve_imei: String,

    /// Register the valve as the account's default
    #[arg(long)]
    pub default: bool,

    /// Initial motor active flag
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub motor_active: bool,

    /// Initial valve active flag
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub valve_active: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a configuration value on the active profile
    Set {
        /// Config key (backend, username, timeout, insecure, ca_cert,
        /// motor_policy, refresh_interval)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
