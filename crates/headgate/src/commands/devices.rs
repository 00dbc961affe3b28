//! Account-wide device listing.

use tabled::Tabled;

use headgate_core::Device;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct DeviceRow {
    #[tabled(rename = "IMEI")]
    imei: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Stop")]
    stop: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl DeviceRow {
    pub(crate) fn for_device(d: &Device, color: bool) -> Self {
        Self {
            imei: d.imei.clone(),
            kind: d.kind.to_string(),
            state: output::paint_state(d.active, color),
            start: output::format_time(d.reported_start),
            stop: output::format_time(d.reported_stop),
            default: if d.default_valve { "yes".into() } else { String::new() },
        }
    }
}

/// Single-device detail block shared by `motor status` and `valve show`.
pub(crate) fn detail(d: &Device, color: bool) -> String {
    let mut lines = vec![
        format!("IMEI:    {}", d.imei),
        format!("Type:    {}", d.kind),
        format!("State:   {}", output::paint_state(d.active, color)),
        format!("Start:   {}", output::format_time(d.reported_start)),
        format!("Stop:    {}", output::format_time(d.reported_stop)),
    ];
    if d.kind.is_gate_valve() {
        lines.push(format!(
            "Default: {}",
            if d.default_valve { "yes" } else { "no" }
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::with_session(global, |controller| async move {
        Ok(controller.session_snapshot())
    })
    .await?;

    let devices: Vec<Device> = session
        .motor()
        .cloned()
        .into_iter()
        .chain(session.valves().iter().cloned())
        .collect();

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::for_device(d, color),
        |d| d.imei.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
