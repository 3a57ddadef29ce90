//! Command handlers: each takes a running [`Coordinator`] and the parsed
//! CLI arguments, performs the operation, and renders its output.

use anyhow::{Context, bail};
use tracing::debug;

use lumen_core::{Coordinator, Profile, ProfileEntry, RegistryEvent, Target, ZoneSelector};

use crate::cli::{ApplyArgs, GlobalOpts, SetArgs, WatchArgs};
use crate::output;

pub async fn scan(coordinator: &Coordinator, global: &GlobalOpts) -> anyhow::Result<()> {
    coordinator.rescan().await;
    devices(coordinator, global)
}

pub fn devices(coordinator: &Coordinator, global: &GlobalOpts) -> anyhow::Result<()> {
    let snapshot = coordinator.devices();
    output::print_output(
        &output::render_devices(&global.output, &snapshot),
        global.quiet,
    );
    Ok(())
}

pub async fn apply(
    coordinator: &Coordinator,
    global: &GlobalOpts,
    args: &ApplyArgs,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read profile {}", args.file.display()))?;
    let profile: Profile = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse profile {}", args.file.display()))?;
    debug!(profile = %profile.name, entries = profile.entries.len(), "loaded profile");

    coordinator.rescan().await;
    let result = coordinator.apply(&profile).await?;
    output::print_output(
        &output::render_apply_result(&global.output, &result),
        global.quiet,
    );
    if result.failed() > 0 {
        bail!("{} device(s) failed", result.failed());
    }
    Ok(())
}

pub async fn set(
    coordinator: &Coordinator,
    global: &GlobalOpts,
    args: &SetArgs,
) -> anyhow::Result<()> {
    coordinator.rescan().await;
    if coordinator.device(args.device).is_none() {
        bail!("unknown device {}", args.device);
    }
    let profile = Profile {
        name: format!("set-{}", args.device),
        entries: vec![ProfileEntry {
            device: args.device,
            zone: ZoneSelector::Zone(args.zone),
            target: Target::Color(args.color),
        }],
    };
    let result = coordinator.apply(&profile).await?;
    output::print_output(
        &output::render_apply_result(&global.output, &result),
        global.quiet,
    );
    if !result.is_fully_applied() {
        bail!("zone write did not complete");
    }
    Ok(())
}

pub async fn off(coordinator: &Coordinator, global: &GlobalOpts) -> anyhow::Result<()> {
    coordinator.rescan().await;
    let result = coordinator.off().await?;
    output::print_output(
        &output::render_apply_result(&global.output, &result),
        global.quiet,
    );
    if result.failed() > 0 {
        bail!("{} device(s) failed", result.failed());
    }
    Ok(())
}

/// Print the current device snapshot, then stream registry events until
/// interrupted. Devices found by the startup cycle land in the snapshot, so
/// nothing is lost to the gap between startup and subscription.
pub async fn watch(
    coordinator: &Coordinator,
    global: &GlobalOpts,
    _args: &WatchArgs,
) -> anyhow::Result<()> {
    coordinator.rescan().await;
    let snapshot = coordinator.devices();
    output::print_output(
        &output::render_devices(&global.output, &snapshot),
        global.quiet,
    );

    let mut events = coordinator.subscribe();
    if !global.quiet {
        println!("watching for device events (ctrl-c to stop)...");
    }
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(RegistryEvent::Added(device)) => {
                    println!("+ {} {} ({})", device.id, device.name, device.backend);
                }
                Ok(RegistryEvent::StatusChanged { id, name, from, to }) => {
                    println!("~ {id} {name}: {from:?} -> {to:?}");
                }
                Ok(RegistryEvent::Removed(id)) => {
                    println!("- {id}");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
