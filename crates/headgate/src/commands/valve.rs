//! Gate valve command handlers.

use headgate_core::Command as CoreCommand;

use crate::cli::{GlobalOpts, ValveCommand};
use crate::error::CliError;
use crate::output;

use super::{devices, util};

pub async fn handle(cmd: ValveCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        ValveCommand::List => {
            let session = util::with_session(global, |controller| async move {
                Ok(controller.session_snapshot())
            })
            .await?;

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                session.valves(),
                |d| devices::DeviceRow::for_device(d, color),
                |d| d.imei.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ValveCommand::Show { imei } => {
            let session = util::with_session(global, |controller| async move {
                Ok(controller.session_snapshot())
            })
            .await?;

            let valve = session.valve(&imei)?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                valve,
                |d| devices::detail(d, color),
                |d| d.imei.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ValveCommand::Start { imei } => {
            let shown = imei.clone();
            let opened = util::with_session(global, move |controller| async move {
                if controller.session_snapshot().valve(&imei)?.active {
                    return Ok(false);
                }
                controller.execute(CoreCommand::StartValve { imei }).await?;
                Ok(true)
            })
            .await?;
            if !global.quiet {
                if opened {
                    eprintln!("Valve {shown} opened");
                } else {
                    eprintln!("Valve {shown} is already open");
                }
            }
            Ok(())
        }

        ValveCommand::Stop { imei } => {
            let shown = imei.clone();
            let closed = util::with_session(global, move |controller| async move {
                if !controller.session_snapshot().valve(&imei)?.active {
                    return Ok(false);
                }
                controller.execute(CoreCommand::StopValve { imei }).await?;
                Ok(true)
            })
            .await?;
            if !global.quiet {
                if closed {
                    eprintln!("Valve {shown} closed");
                } else {
                    eprintln!("Valve {shown} is already closed");
                }
            }
            Ok(())
        }

        ValveCommand::Schedule { imei, window } => {
            let parsed = util::parse_schedule(&window)?;
            let shown = imei.clone();
            util::with_session(global, move |controller| async move {
                controller
                    .execute(CoreCommand::ScheduleValve {
                        imei,
                        window: parsed,
                    })
                    .await
            })
            .await?;
            if !global.quiet {
                eprintln!(
                    "Valve {shown} scheduled {} -> {}",
                    output::format_time(Some(parsed.start)),
                    output::format_time(Some(parsed.stop))
                );
            }
            Ok(())
        }

        ValveCommand::SetDefault { imei } => {
            let shown = imei.clone();
            util::with_session(global, move |controller| async move {
                controller
                    .execute(CoreCommand::SetDefaultValve { imei })
                    .await
            })
            .await?;
            if !global.quiet {
                eprintln!("Valve {shown} is now the default");
            }
            Ok(())
        }
    }
}
