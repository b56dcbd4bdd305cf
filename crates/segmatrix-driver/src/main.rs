//! segmatrix display smoke-test tool.
//!
//! Loads a named topology from a TOML configuration file, opens the bus,
//! runs the module initialization sequence, then writes an all-segments-on
//! pattern followed by a blank frame. Useful for verifying wiring and
//! addressing after assembling a panel.
//!
//! ```text
//! segmatrix [config.toml] [topology-name]
//! ```

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "config.toml".to_string());
    let topology_name = args.next().unwrap_or_else(|| "24x4".to_string());

    run(&config_path, &topology_name)
}

#[cfg(target_os = "linux")]
fn run(config_path: &str, topology_name: &str) -> anyhow::Result<()> {
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    use anyhow::Context;
    use segmatrix_core::{DigitGrid, DisplayKind};
    use tracing::info;
    use segmatrix_driver::application::initialize::initialize_displays;
    use segmatrix_driver::application::update_display::DisplayUpdater;
    use segmatrix_driver::infrastructure::bus::{i2c::I2cBus, BusTransport};
    use segmatrix_driver::infrastructure::storage::config::load_topology;

    let topology = load_topology(Path::new(config_path), topology_name)
        .with_context(|| format!("loading topology {topology_name:?} from {config_path}"))?;
    anyhow::ensure!(
        topology.kind == DisplayKind::Physical,
        "topology {topology_name:?} is emulated; use the emulator front end"
    );
    info!(
        "using display configuration {:?} ({}x{} digits)",
        topology.name, topology.total_width, topology.total_height
    );

    let mut bus = I2cBus::for_topology(&topology);
    bus.open().context("opening bus devices")?;

    let mut updater = DisplayUpdater::new();
    initialize_displays(&mut bus, &topology, updater.selector_mut())
        .context("initializing display modules")?;

    info!("writing all-on pattern");
    let all_on = DigitGrid::uniform(topology.total_width, topology.total_height, 0xFF);
    updater
        .update(&mut bus, &topology, &all_on)
        .context("writing all-on pattern")?;
    thread::sleep(Duration::from_millis(800));

    info!("clearing");
    let all_off = DigitGrid::uniform(topology.total_width, topology.total_height, 0x00);
    updater
        .update(&mut bus, &topology, &all_off)
        .context("clearing the panel")?;

    bus.close();
    info!("done");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run(_config_path: &str, _topology_name: &str) -> anyhow::Result<()> {
    anyhow::bail!("the physical bus backend requires Linux (/dev/i2c-N)");
}
