//! Output formatting: table, JSON, plain.
//!
//! Table uses `tabled`, JSON serializes via serde, plain emits one
//! identifier per line for scripting.

use std::sync::Arc;

use tabled::{Table, Tabled, settings::Style};

use lumen_core::{ApplyResult, ConnectionStatus, Device, DeviceOutcome};

use crate::cli::OutputFormat;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "BACKEND")]
    backend: String,
    #[tabled(rename = "ZONES")]
    zones: usize,
    #[tabled(rename = "STATUS")]
    status: &'static str,
    #[tabled(rename = "LAST SEEN")]
    last_seen: String,
}

fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Online => "online",
        ConnectionStatus::Offline => "offline",
        ConnectionStatus::Degraded => "degraded",
    }
}

fn device_row(device: &Device) -> DeviceRow {
    DeviceRow {
        id: device.id.to_string(),
        name: device.name.clone(),
        backend: device.backend.clone(),
        zones: device.zones.len(),
        status: status_label(device.status),
        last_seen: device
            .last_seen
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string()),
    }
}

pub fn render_devices(format: &OutputFormat, devices: &[Arc<Device>]) -> String {
    match format {
        OutputFormat::Table => {
            if devices.is_empty() {
                return "No devices found.".to_string();
            }
            let rows: Vec<DeviceRow> = devices.iter().map(|d| device_row(d)).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(devices).unwrap_or_else(|e| format!("error: {e}"))
        }
        OutputFormat::Plain => devices
            .iter()
            .map(|d| d.id.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "OUTCOME")]
    outcome: String,
}

pub fn render_apply_result(format: &OutputFormat, result: &ApplyResult) -> String {
    match format {
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = result
                .outcomes
                .iter()
                .map(|(id, outcome)| OutcomeRow {
                    device: id.to_string(),
                    outcome: match outcome {
                        DeviceOutcome::Applied => "applied".to_string(),
                        DeviceOutcome::Failed { reason } => format!("failed: {reason}"),
                        DeviceOutcome::Skipped => "skipped".to_string(),
                    },
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            format!("{table}\n{result}")
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("error: {e}"))
        }
        OutputFormat::Plain => result
            .outcomes
            .iter()
            .filter(|(_, o)| o.is_applied())
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    println!("{output}");
}
