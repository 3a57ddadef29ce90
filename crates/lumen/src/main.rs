//! `lumen` binary entry point: builds the protocol clients described by
//! the global flags, starts the coordinator, and dispatches to a command
//! handler.

mod cli;
mod commands;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lumen_core::{Coordinator, CoreConfig};
use lumen_proto::{
    ChromaClient, ChromaConfig, OpenRgbClient, ProtocolClient, ProxiedDevice, TransportConfig,
    VendorProxyClient,
};

use cli::{Cli, Command, GlobalOpts};

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lumen={default},lumen_core={default},lumen_proto={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_clients(global: &GlobalOpts) -> anyhow::Result<Vec<Arc<dyn ProtocolClient>>> {
    let timeout = Duration::from_secs(global.timeout);
    let mut clients: Vec<Arc<dyn ProtocolClient>> = Vec::new();

    if !global.no_openrgb {
        clients.push(Arc::new(OpenRgbClient::new(
            &global.openrgb_host,
            global.openrgb_port,
            timeout,
        )));
    }
    if global.chroma {
        let config = ChromaConfig {
            endpoint: global.chroma_endpoint.clone(),
            ..ChromaConfig::default()
        };
        let transport = TransportConfig {
            timeout,
            ..TransportConfig::default()
        };
        let client =
            ChromaClient::new(config, &transport).context("cannot build Chroma client")?;
        clients.push(Arc::new(client));
    }
    if global.vendor_proxy {
        clients.push(Arc::new(VendorProxyClient::asrock_polychrome(vec![
            ProxiedDevice {
                name: "ASRock Polychrome Motherboard".into(),
                key: "polychrome/motherboard".into(),
                zones: vec![("rgb_header".into(), 1), ("addressable_header".into(), 1)],
                identity_hint: None,
            },
        ])));
        clients.push(Arc::new(VendorProxyClient::lian_li_lconnect(vec![
            ProxiedDevice {
                name: "Lian Li Fan Controller".into(),
                key: "lconnect/controller".into(),
                zones: vec![("fans".into(), 4)],
                identity_hint: None,
            },
        ])));
        clients.push(Arc::new(VendorProxyClient::gskill_aura(vec![
            ProxiedDevice {
                name: "G.Skill Trident Z RGB".into(),
                key: "aura/dram".into(),
                zones: vec![("dimm_a".into(), 5), ("dimm_b".into(), 5)],
                identity_hint: None,
            },
        ])));
        clients.push(Arc::new(VendorProxyClient::msi_center(vec![
            ProxiedDevice {
                name: "MSI Mystic Light Motherboard".into(),
                key: "mystic-light/motherboard".into(),
                zones: vec![("jrgb".into(), 1), ("jrainbow".into(), 1)],
                identity_hint: None,
            },
        ])));
    }

    anyhow::ensure!(!clients.is_empty(), "every backend is disabled");
    Ok(clients)
}

/// One-shot commands disable the periodic tasks; `watch` keeps them.
fn core_config(command: &Command) -> CoreConfig {
    match command {
        Command::Watch(args) => CoreConfig {
            discovery_interval: Duration::from_secs(args.interval),
            ..CoreConfig::default()
        },
        _ => CoreConfig {
            discovery_interval: Duration::ZERO,
            heartbeat_interval: Duration::ZERO,
            ..CoreConfig::default()
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose, cli.global.quiet);

    let clients = build_clients(&cli.global)?;
    let coordinator = Coordinator::new(core_config(&cli.command), clients);
    coordinator
        .start()
        .await
        .context("no lighting backend is reachable")?;

    let result = match &cli.command {
        Command::Scan => commands::scan(&coordinator, &cli.global).await,
        Command::Devices => {
            coordinator.rescan().await;
            commands::devices(&coordinator, &cli.global)
        }
        Command::Apply(args) => commands::apply(&coordinator, &cli.global, args).await,
        Command::Set(args) => commands::set(&coordinator, &cli.global, args).await,
        Command::Off => commands::off(&coordinator, &cli.global).await,
        Command::Watch(args) => commands::watch(&coordinator, &cli.global, args).await,
    };

    coordinator.shutdown().await;
    result
}
