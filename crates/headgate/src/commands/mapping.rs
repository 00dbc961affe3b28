//! Motor/valve pairing.

use headgate_core::{Command as CoreCommand, MappingRequest};

use crate::cli::{GlobalOpts, MapArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(args: MapArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let request = MappingRequest {
        motor_imei: args.motor_imei.clone(),
        valve_imei: args.valve_imei.clone(),
        motor_active: args.motor_active,
        valve_active: args.valve_active,
        default_valve: args.default,
    };

    util::with_session(global, move |controller| async move {
        controller
            .execute(CoreCommand::RegisterMapping(request))
            .await
    })
    .await?;

    if !global.quiet {
        eprintln!(
            "Mapped motor {} to valve {}{}",
            args.motor_imei,
            args.valve_imei,
            if args.default { " (default)" } else { "" }
        );
    }
    Ok(())
}
