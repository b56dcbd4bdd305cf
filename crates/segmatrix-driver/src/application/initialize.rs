//! Module initialization sequence.
//!
//! Every driver module powers up with its oscillator stopped and the display
//! blanked. Before the first frame (and again after every bus recovery),
//! each module receives three single-byte commands in order: oscillator
//! enable, display enable without blink, and full brightness. Each command
//! is followed by a short fixed delay.
//!
//! Any single command failure aborts initialization for the whole topology;
//! it is retried only as part of the recovery controller's reinitialization
//! step, or by restarting the process.

use std::thread;
use std::time::Duration;

use segmatrix_core::{placements, DisplayTopology};
use thiserror::Error;
use tracing::debug;

use crate::application::channel_select::{ChannelSelector, SelectError};
use crate::infrastructure::bus::{BusError, BusTransport};

/// System setup: oscillator on.
pub const CMD_OSCILLATOR_ON: u8 = 0x21;
/// Display setup: display on, no blink.
pub const CMD_DISPLAY_ON: u8 = 0x81;
/// Dimming setup: maximum brightness.
pub const CMD_BRIGHTNESS_MAX: u8 = 0xEF;

/// Pause after each initialization command.
pub const COMMAND_DELAY: Duration = Duration::from_millis(1);

/// Error type for a failed initialization pass.
#[derive(Debug, Error)]
pub enum InitError {
    /// A channel could not be activated while walking the topology.
    #[error("initialization aborted: {0}")]
    Select(#[from] SelectError),

    /// A module rejected one of the setup commands.
    #[error("initialization command 0x{command:02X} failed for module 0x{address:02X}")]
    Command {
        address: u8,
        command: u8,
        #[source]
        source: BusError,
    },
}

/// Runs the setup command sequence against every module in the topology, in
/// the same traversal order the updater uses.
///
/// # Errors
///
/// Returns [`InitError`] on the first failed select or command; no further
/// modules are attempted.
pub fn initialize_displays(
    bus: &mut dyn BusTransport,
    topology: &DisplayTopology,
    selector: &mut ChannelSelector,
) -> Result<(), InitError> {
    for group in placements(topology) {
        for module in &group.modules {
            selector.select(bus, group.bus, group.expander, module.channel)?;
            for command in [CMD_OSCILLATOR_ON, CMD_DISPLAY_ON, CMD_BRIGHTNESS_MAX] {
                bus.write(group.bus, module.address, &[command])
                    .map_err(|source| InitError::Command {
                        address: module.address,
                        command,
                        source,
                    })?;
                thread::sleep(COMMAND_DELAY);
            }
        }
        if group.expander.is_some() && !group.modules.is_empty() {
            selector.deselect(bus, group.bus, group.expander)?;
        }
    }
    debug!(
        "initialized {} module(s) on topology {:?}",
        topology.all_addresses().len(),
        topology.name
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
