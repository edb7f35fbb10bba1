//! SpaceBridge - Main Application
//!
//! Bridges the SpaceControl daemon to Linux virtual input devices.
//! With `--simulate` a scripted daemon drives mock devices instead, which
//! needs neither the vendor library nor `/dev/uinput`.

use anyhow::Context;
use clap::Parser;
use log::info;
use spacebridge::backend::{DeviceBackend, MockDeviceBackend};
use spacebridge::mapping::config::{BridgeConfig, Config};
use spacebridge::spacecontrol::constants::DEV_FIT;
use spacebridge::spacecontrol::{
    DaemonSession, HighLevelEvent, RawEvent, ScriptEnd, ScriptStep, SimulatedDaemon,
};
use spacebridge::{ShutdownHandle, SpaceBridge};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "spacebridge", version, about = "SpaceControl to uinput bridge")]
struct Args {
    /// Configuration file (defaults to configs/default.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Replay a demo script against mock devices
    #[arg(long)]
    simulate: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if PathBuf::from("configs/default.toml").exists() => Config::load_default()?,
        None => Config::default(),
    };
    if let Some(level) = &args.log_level {
        config.settings.log_level = level.clone();
    }
    let config = config.resolve()?;

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.to_string()),
    )
    .init();

    let shutdown = ShutdownHandle::new();
    let handler_shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down");
        handler_shutdown.request_shutdown();
    })
    .context("installing Ctrl+C handler")?;

    if args.simulate {
        info!("Running simulated daemon");
        let daemon = demo_daemon(&shutdown);
        return run_bridge(config, daemon, MockDeviceBackend::new(), shutdown);
    }

    run_native(config, shutdown)
}

#[cfg(target_os = "linux")]
fn run_native(config: BridgeConfig, shutdown: ShutdownHandle) -> anyhow::Result<()> {
    use spacebridge::backend::UinputBackend;
    use spacebridge::spacecontrol::SpaceControlLibrary;

    let session = SpaceControlLibrary::new(&config.library_path);
    run_bridge(config, session, UinputBackend::new(), shutdown)
}

#[cfg(not(target_os = "linux"))]
fn run_native(_config: BridgeConfig, _shutdown: ShutdownHandle) -> anyhow::Result<()> {
    anyhow::bail!("uinput is only available on Linux; use --simulate")
}

fn run_bridge<S, B>(
    config: BridgeConfig,
    session: S,
    backend: B,
    shutdown: ShutdownHandle,
) -> anyhow::Result<()>
where
    S: DaemonSession,
    B: DeviceBackend,
{
    let mut bridge = SpaceBridge::new(config, session, backend).with_shutdown(shutdown);
    bridge.run()?;

    let stats = bridge.stats();
    info!(
        "✓ Done: {} events, {} frames, {} write failures, {} malformed",
        stats.events, stats.frames, stats.emit_failures, stats.malformed
    );
    Ok(())
}

/// Short script touching motion, buttons and a high-level event
fn demo_daemon(shutdown: &ShutdownHandle) -> SimulatedDaemon {
    SimulatedDaemon::scripted(vec![
        ScriptStep::Event(RawEvent::motion([10, -5, 0, 0, 0, 3])),
        ScriptStep::Event(RawEvent::buttons(0b101)),
        ScriptStep::Timeout,
        ScriptStep::Event(RawEvent::buttons(0)),
        ScriptStep::Event(RawEvent::high_level(HighLevelEvent::pressed(DEV_FIT))),
        ScriptStep::Event(RawEvent::high_level(HighLevelEvent::released(DEV_FIT))),
        ScriptStep::Event(RawEvent::motion([0; 6])),
    ])
    .ending_with(ScriptEnd::Shutdown(shutdown.clone()))
}
