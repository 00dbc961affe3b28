//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod mapping;
pub mod motor;
pub mod util;
pub mod valve;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(args, global).await,
        Command::Logout(args) => auth::logout(&args, global),
        Command::Register(args) => auth::register(args, global).await,
        Command::Status => auth::status(global).await,
        Command::Motor(args) => motor::handle(args.command, global).await,
        Command::Valve(args) => valve::handle(args.command, global).await,
        Command::Devices => devices::handle(global).await,
        Command::Map(args) => mapping::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
