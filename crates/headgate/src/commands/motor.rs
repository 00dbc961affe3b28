//! Motor command handlers.

use headgate_core::Command as CoreCommand;

use crate::cli::{GlobalOpts, MotorCommand};
use crate::error::CliError;
use crate::output;

use super::{devices, util};

pub async fn handle(cmd: MotorCommand, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        MotorCommand::Status => {
            let session = util::with_session(global, |controller| async move {
                Ok(controller.session_snapshot())
            })
            .await?;

            let motor = session.motor().ok_or(CliError::NoMotor)?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                motor,
                |d| devices::detail(d, color),
                |d| d.imei.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MotorCommand::Start => {
            // Mirror the dashboard: a running motor has no start action.
            let started = util::with_session(global, |controller| async move {
                match controller.session_snapshot().motor() {
                    Some(motor) if motor.active => Ok(false),
                    _ => {
                        controller.execute(CoreCommand::StartMotor).await?;
                        Ok(true)
                    }
                }
            })
            .await?;
            if !global.quiet {
                if started {
                    eprintln!("Motor started (default valves follow)");
                } else {
                    eprintln!("Motor is already running");
                }
            }
            Ok(())
        }

        MotorCommand::Stop => {
            let stopped = util::with_session(global, |controller| async move {
                match controller.session_snapshot().motor() {
                    Some(motor) if !motor.active => Ok(false),
                    _ => {
                        controller.execute(CoreCommand::StopMotor).await?;
                        Ok(true)
                    }
                }
            })
            .await?;
            if !global.quiet {
                if stopped {
                    eprintln!("Motor stopped");
                } else {
                    eprintln!("Motor is already stopped");
                }
            }
            Ok(())
        }

        MotorCommand::Schedule(args) => {
            let window = util::parse_schedule(&args)?;
            util::with_session(global, move |controller| async move {
                controller
                    .execute(CoreCommand::ScheduleMotor { window })
                    .await
            })
            .await?;
            if !global.quiet {
                eprintln!(
                    "Motor scheduled {} -> {}",
                    output::format_time(Some(window.start)),
                    output::format_time(Some(window.stop))
                );
            }
            Ok(())
        }
    }
}
