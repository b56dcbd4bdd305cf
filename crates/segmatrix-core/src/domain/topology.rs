//! Physical display topology domain entities.
//!
//! A topology describes how a logical digit grid maps onto hardware: which
//! buses exist, which channel-expander chips sit on them, which module
//! addresses hang off each channel, and how many digits a module carries
//! along each axis. Topologies are produced by the configuration loader and
//! are immutable afterwards.

use std::collections::BTreeMap;

/// Identifier of an independent physical bus (e.g. `/dev/i2c-1` has id 1).
pub type BusId = u8;

/// A 2-D arrangement of module bus addresses: rows of columns.
pub type ModuleGrid = Vec<Vec<u8>>;

/// Whether the topology targets real hardware or the on-screen emulator.
///
/// The emulator renderer is a drop-in alternative sink for the same digit
/// grid and lives outside this crate; the physical driver refuses
/// [`DisplayKind::Emulated`] topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    Physical,
    Emulated,
}

/// Position of one independently wired row strip in explicit-rows placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlacement {
    /// Expander channel the strip's modules are attached to.
    pub channel: u8,
    /// Digit-row offset of the strip's top-left corner.
    pub row_offset: usize,
    /// Digit-column offset of the strip's top-left corner.
    pub col_offset: usize,
}

/// How an expander's channels are placed onto the panel.
///
/// Chosen once when the topology is loaded, never inferred from panel
/// dimensions at update time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Channels are packed left-to-right, top-to-bottom by a running cursor
    /// that wraps to the next line when a channel no longer fits within the
    /// panel width.
    ScanFill,
    /// Each entry pins one row strip to an explicit `(channel, row, col)`
    /// position. Used by panels assembled from independently wired strips
    /// whose physical layout cannot be expressed as a simple scan.
    ExplicitRows(BTreeMap<u8, RowPlacement>),
}

/// One channel-expander chip and the module grids behind its channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpanderTopology {
    /// Bus address of the expander, or `None` when the modules attach
    /// directly to the bus with no multiplexer in between.
    pub address: Option<u8>,
    /// Channel number -> module address grid. Channels with empty grids are
    /// skipped entirely during layout.
    pub channels: BTreeMap<u8, ModuleGrid>,
    /// Placement rule for this expander's channels.
    pub placement: Placement,
}

/// An independent bus and its expanders, processed in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTopology {
    pub expanders: Vec<ExpanderTopology>,
}

/// Root description of a display panel. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTopology {
    /// Human-readable label. No behavioral effect.
    pub name: String,
    /// Physical hardware or emulator sink.
    pub kind: DisplayKind,
    /// Buses keyed by id; ids need not be contiguous.
    pub buses: BTreeMap<BusId, BusTopology>,
    /// Digits per module along the horizontal axis.
    pub module_digit_width: usize,
    /// Digits per module along the vertical axis.
    pub module_digit_height: usize,
    /// Panel width in digits.
    pub total_width: usize,
    /// Panel height in digits.
    pub total_height: usize,
}

impl DisplayTopology {
    /// Total number of digit positions on the panel.
    pub fn total_digits(&self) -> usize {
        self.total_width * self.total_height
    }

    /// Digits carried by every module regardless of its position.
    pub fn module_digits(&self) -> usize {
        self.module_digit_width * self.module_digit_height
    }

    /// All module addresses appearing anywhere in the topology, sorted and
    /// deduplicated. The same address may legitimately appear on several
    /// channels (channels are electrically isolated sub-buses).
    pub fn all_addresses(&self) -> Vec<u8> {
        let mut addrs: Vec<u8> = self
            .buses
            .values()
            .flat_map(|bus| &bus.expanders)
            .flat_map(|exp| exp.channels.values())
            .flat_map(|grid| grid.iter())
            .flat_map(|row| row.iter().copied())
            .collect();
        addrs.sort_unstable();
        addrs.dedup();
        addrs
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn single_bus_topology(channels: BTreeMap<u8, ModuleGrid>) -> DisplayTopology {
        DisplayTopology {
            name: "test".to_string(),
            kind: DisplayKind::Physical,
            buses: BTreeMap::from([(
                1,
                BusTopology {
                    expanders: vec![ExpanderTopology {
                        address: Some(0x77),
                        channels,
                        placement: Placement::ScanFill,
                    }],
                },
            )]),
            module_digit_width: 4,
            module_digit_height: 4,
            total_width: 24,
            total_height: 4,
        }
    }

    #[test]
    fn test_total_digits_is_width_times_height() {
        let topo = single_bus_topology(BTreeMap::new());
        assert_eq!(topo.total_digits(), 96);
    }

    #[test]
    fn test_module_digits_is_module_width_times_height() {
        let topo = single_bus_topology(BTreeMap::new());
        assert_eq!(topo.module_digits(), 16);
    }

    #[test]
    fn test_all_addresses_returns_sorted_addresses() {
        let channels = BTreeMap::from([(0, vec![vec![0x72, 0x70, 0x71]])]);
        let topo = single_bus_topology(channels);
        assert_eq!(topo.all_addresses(), vec![0x70, 0x71, 0x72]);
    }

    #[test]
    fn test_all_addresses_deduplicates_across_channels() {
        // The same addresses behind two channels count once.
        let channels = BTreeMap::from([
            (0, vec![vec![0x70, 0x71, 0x72]]),
            (1, vec![vec![0x70, 0x71, 0x72]]),
        ]);
        let topo = single_bus_topology(channels);
        assert_eq!(topo.all_addresses(), vec![0x70, 0x71, 0x72]);
    }

    #[test]
    fn test_all_addresses_spans_multiple_buses() {
        let mut topo = single_bus_topology(BTreeMap::from([(0, vec![vec![0x70]])]));
        topo.buses.insert(
            3,
            BusTopology {
                expanders: vec![ExpanderTopology {
                    address: None,
                    channels: BTreeMap::from([(0, vec![vec![0x74]])]),
                    placement: Placement::ScanFill,
                }],
            },
        );
        assert_eq!(topo.all_addresses(), vec![0x70, 0x74]);
    }

    #[test]
    fn test_all_addresses_empty_topology_is_empty() {
        let topo = single_bus_topology(BTreeMap::new());
        assert!(topo.all_addresses().is_empty());
    }
}
