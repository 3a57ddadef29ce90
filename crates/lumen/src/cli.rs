//! Clap derive structures for the `lumen` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lumen_core::DeviceId;
use lumen_proto::Color;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lumen -- unified RGB lighting control from the command line
#[derive(Debug, Parser)]
#[command(
    name = "lumen",
    version,
    about = "Control RGB lighting across OpenRGB, Razer Chroma, and vendor backends",
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
    /// OpenRGB SDK server host
    #[arg(long, env = "LUMEN_OPENRGB_HOST", default_value = "127.0.0.1", global = true)]
    pub openrgb_host: String,

    /// OpenRGB SDK server port
    #[arg(long, env = "LUMEN_OPENRGB_PORT", default_value = "6742", global = true)]
    pub openrgb_port: u16,

    /// Disable the OpenRGB backend
    #[arg(long, global = true)]
    pub no_openrgb: bool,

    /// Enable the Razer Chroma SDK backend
    #[arg(long, env = "LUMEN_CHROMA", global = true)]
    pub chroma: bool,

    /// Chroma SDK REST endpoint
    #[arg(
        long,
        env = "LUMEN_CHROMA_ENDPOINT",
        default_value = "http://localhost:54235/razer/chromasdk",
        global = true
    )]
    pub chroma_endpoint: String,

    /// Enable detection-only vendor-software backends
    #[arg(long, global = true)]
    pub vendor_proxy: bool,

    /// Per-backend operation timeout in seconds
    #[arg(long, env = "LUMEN_TIMEOUT", default_value = "5", global = true)]
    pub timeout: u64,

    /// Output format
    #[arg(long, short = 'o', env = "LUMEN_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one discovery cycle and list everything found
    Scan,

    /// List known devices
    #[command(alias = "ls", alias = "dev")]
    Devices,

    /// Apply a profile from a JSON file
    Apply(ApplyArgs),

    /// Set one zone of one device to a solid color
    Set(SetArgs),

    /// Turn every controllable device off
    Off,

    /// Run discovery continuously and stream device events
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Path to the profile JSON file
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Device id (16 hex digits, from `lumen devices`)
    pub device: DeviceId,

    /// Zone id on the device
    pub zone: u32,

    /// Color as `#rrggbb` or `r,g,b`
    #[arg(value_parser = parse_color)]
    pub color: Color,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between discovery cycles
    #[arg(long, default_value = "30")]
    pub interval: u64,
}

/// Accepts `#rrggbb`, `rrggbb`, or `r,g,b`.
pub fn parse_color(s: &str) -> Result<Color, String> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let channel = |i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
        return Ok(Color::new(channel(0)?, channel(2)?, channel(4)?));
    }
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() == 3 {
        let channel = |i: usize| {
            parts[i]
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid channel value: {}", parts[i]))
        };
        return Ok(Color::new(channel(0)?, channel(1)?, channel(2)?));
    }
    Err(format!("cannot parse color from {s:?} (expected #rrggbb or r,g,b)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_color("#ff8000"), Ok(Color::new(255, 128, 0)));
        assert_eq!(parse_color("00ff00"), Ok(Color::new(0, 255, 0)));
    }

    #[test]
    fn parses_component_colors() {
        assert_eq!(parse_color("255, 0, 64"), Ok(Color::new(255, 0, 64)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_color("red").is_err());
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("#ff80").is_err());
    }
}
