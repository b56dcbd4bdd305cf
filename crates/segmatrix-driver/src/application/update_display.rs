//! Flexible display update: digit grid in, bus transactions out.
//!
//! Walks the topology's placement groups in traversal order, switching
//! expander channels as needed, gathering each module's rectangle of digits
//! from the grid, and sending one encoded frame per module. Any failure
//! aborts the rest of the update immediately and reports the failing channel
//! and address; modules already written keep showing the new frame until the
//! next full success.

use segmatrix_core::{
    frame::{write_transaction, DIGITS_PER_MODULE},
    placements, DigitGrid, DisplayTopology, ModulePlacement,
};
use thiserror::Error;

use crate::application::channel_select::{ChannelSelector, SelectError};
use crate::infrastructure::bus::{BusError, BusTransport};

/// Error type for a failed frame update. Carries the failing channel and
/// device address so the caller can log and the recovery controller can act.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// An expander rejected a channel select (or deselect).
    #[error("channel select failed on expander 0x{expander:02X} (channel {channel:?})")]
    ChannelSelect {
        expander: u8,
        /// Requested channel, or `None` for the trailing deselect-all.
        channel: Option<u8>,
        #[source]
        source: BusError,
    },

    /// A module rejected its frame payload.
    #[error("module write failed at 0x{address:02X} (channel {channel})")]
    ModuleWrite {
        address: u8,
        channel: u8,
        #[source]
        source: BusError,
    },
}

impl From<SelectError> for UpdateError {
    fn from(e: SelectError) -> Self {
        UpdateError::ChannelSelect {
            expander: e.expander,
            channel: e.channel,
            source: e.source,
        }
    }
}

/// The display updater, owning the channel-select cache.
pub struct DisplayUpdater {
    selector: ChannelSelector,
}

impl DisplayUpdater {
    pub fn new() -> Self {
        Self {
            selector: ChannelSelector::new(),
        }
    }

    /// The channel-select cache, exposed for the recovery controller's
    /// unconditional reset.
    pub fn selector_mut(&mut self) -> &mut ChannelSelector {
        &mut self.selector
    }

    /// Writes one frame to the panel.
    ///
    /// Modules are written in topology declaration order. There is no
    /// atomicity across modules: a mid-frame failure leaves earlier modules
    /// on the new frame and later ones on the previous frame.
    ///
    /// # Errors
    ///
    /// Returns the first [`UpdateError`] encountered; no further modules are
    /// attempted.
    pub fn update(
        &mut self,
        bus: &mut dyn BusTransport,
        topology: &DisplayTopology,
        grid: &DigitGrid,
    ) -> Result<(), UpdateError> {
        for group in placements(topology) {
            for module in &group.modules {
                self.selector
                    .select(bus, group.bus, group.expander, module.channel)?;

                let digits = gather_module(topology, grid, module);
                let transaction = write_transaction(&digits);
                bus.write(group.bus, module.address, &transaction)
                    .map_err(|source| UpdateError::ModuleWrite {
                        address: module.address,
                        channel: module.channel,
                        source,
                    })?;
            }

            // Leave multiplexed expanders quiescent between frames.
            if group.expander.is_some() && !group.modules.is_empty() {
                self.selector.deselect(bus, group.bus, group.expander)?;
            }
        }
        Ok(())
    }
}

impl Default for DisplayUpdater {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects one module's rectangle of digits from the grid.
///
/// Cells outside the grid bounds stay zero (blank); digits beyond the
/// module's populated count are zero-filled.
fn gather_module(
    topology: &DisplayTopology,
    grid: &DigitGrid,
    module: &ModulePlacement,
) -> [u8; DIGITS_PER_MODULE] {
    let mut digits = [0u8; DIGITS_PER_MODULE];
    for row_in_module in 0..topology.module_digit_height {
        for col_in_module in 0..topology.module_digit_width {
            let index = row_in_module * topology.module_digit_width + col_in_module;
            if index >= DIGITS_PER_MODULE {
                continue;
            }
            if let Some(value) = grid.get(
                module.origin_row + row_in_module,
                module.origin_col + col_in_module,
            ) {
                digits[index] = value;
            }
        }
    }
    digits
}

// ── Tests ─────────────────────────────────────────────────────────────────────
