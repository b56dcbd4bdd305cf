//! Display addressing arithmetic.
//!
//! Resolves a [`DisplayTopology`] into the ordered list of module placements
//! the updater walks each frame: buses in id order, expanders in declaration
//! order, and within an expander either an explicit rows table or a scanning
//! cursor that packs channels left-to-right and wraps to the next line like
//! text in a fixed-width terminal.
//!
//! The resolution is pure arithmetic over the topology; no bus traffic
//! happens here. This keeps the coverage invariants testable without
//! hardware.

use thiserror::Error;

use crate::domain::topology::{BusId, DisplayTopology, ModuleGrid, Placement};

/// Errors detected when checking a topology's digit coverage.
#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    /// Two modules claim the same global digit position.
    #[error("digit cell ({row}, {col}) is mapped by more than one module")]
    DoubleMapped { row: usize, col: usize },

    /// The module grids do not cover the whole panel.
    #[error("module grids cover {covered} digits but the panel has {expected}")]
    IncompleteCoverage { covered: usize, expected: usize },
}

/// One module pinned to its global digit origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulePlacement {
    /// Expander channel the module is attached to.
    pub channel: u8,
    /// Bus address of the module.
    pub address: u8,
    /// Global digit row of the module's top-left digit.
    pub origin_row: usize,
    /// Global digit column of the module's top-left digit.
    pub origin_col: usize,
}

/// All module placements behind one expander, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpanderPlacements {
    /// Bus the expander sits on.
    pub bus: BusId,
    /// Expander address, or `None` for direct-attached modules.
    pub expander: Option<u8>,
    /// Modules in traversal order.
    pub modules: Vec<ModulePlacement>,
}

/// Full resolution of a global digit position, down to the digit index
/// within its module's frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDigit {
    pub bus: BusId,
    pub expander: Option<u8>,
    pub channel: u8,
    pub address: u8,
    /// Row-major index of the digit within the module (0-based).
    pub digit_index: usize,
}

/// Resolves the topology into per-expander placement groups in traversal
/// order.
///
/// Scan-fill expanders share one running `(col, row)` cursor across the whole
/// topology: each non-empty channel grid is placed at the cursor, then the
/// cursor advances by the channel's digit width, wrapping to the start of the
/// next line when the next channel would no longer fit within the panel
/// width. Explicit-rows expanders place each strip at its configured offset
/// (relative to the cursor accumulated so far) and do not advance the cursor.
///
/// Channels with empty grids contribute nothing, not even a channel-select.
pub fn placements(topology: &DisplayTopology) -> Vec<ExpanderPlacements> {
    let mdw = topology.module_digit_width;
    let mdh = topology.module_digit_height;

    let mut groups = Vec::new();
    let mut col_cursor = 0usize;
    let mut row_cursor = 0usize;

    for (&bus_id, bus) in &topology.buses {
        for expander in &bus.expanders {
            let mut modules = Vec::new();

            match &expander.placement {
                Placement::ExplicitRows(rows) => {
                    for row_placement in rows.values() {
                        let Some(grid) = expander.channels.get(&row_placement.channel) else {
                            continue;
                        };
                        if grid_is_empty(grid) {
                            continue;
                        }
                        place_grid(
                            &mut modules,
                            grid,
                            row_placement.channel,
                            row_cursor + row_placement.row_offset,
                            col_cursor + row_placement.col_offset,
                            mdw,
                            mdh,
                        );
                    }
                }
                Placement::ScanFill => {
                    for (&channel, grid) in &expander.channels {
                        if grid_is_empty(grid) {
                            continue;
                        }
                        place_grid(&mut modules, grid, channel, row_cursor, col_cursor, mdw, mdh);

                        let channel_width = grid[0].len() * mdw;
                        let channel_height = grid.len() * mdh;
                        if col_cursor + channel_width < topology.total_width {
                            col_cursor += channel_width;
                        } else {
                            col_cursor = 0;
                            row_cursor += channel_height;
                        }
                    }
                }
            }

            groups.push(ExpanderPlacements {
                bus: bus_id,
                expander: expander.address,
                modules,
            });
        }
    }

    groups
}

/// Resolves the global digit position `(row, col)` to its module and digit
/// index, or `None` when no module covers that position.
pub fn module_at(topology: &DisplayTopology, row: usize, col: usize) -> Option<ResolvedDigit> {
    let mdw = topology.module_digit_width;
    let mdh = topology.module_digit_height;

    for group in placements(topology) {
        for module in &group.modules {
            if row < module.origin_row || col < module.origin_col {
                continue;
            }
            let r_in = row - module.origin_row;
            let c_in = col - module.origin_col;
            if r_in < mdh && c_in < mdw {
                return Some(ResolvedDigit {
                    bus: group.bus,
                    expander: group.expander,
                    channel: module.channel,
                    address: module.address,
                    digit_index: r_in * mdw + c_in,
                });
            }
        }
    }
    None
}

/// Checks the topology's digit coverage: no global position may be claimed
/// by two modules, and the in-bounds placements must cover the whole panel.
///
/// Module cells falling outside the panel bounds are ignored here, matching
/// the updater's skip-out-of-bounds behavior.
///
/// # Errors
///
/// Returns [`TopologyError::DoubleMapped`] or
/// [`TopologyError::IncompleteCoverage`].
pub fn validate(topology: &DisplayTopology) -> Result<(), TopologyError> {
    let mdw = topology.module_digit_width;
    let mdh = topology.module_digit_height;
    let mut claimed = vec![false; topology.total_digits()];
    let mut covered = 0usize;

    for group in placements(topology) {
        for module in &group.modules {
            for r_in in 0..mdh {
                for c_in in 0..mdw {
                    let row = module.origin_row + r_in;
                    let col = module.origin_col + c_in;
                    if row >= topology.total_height || col >= topology.total_width {
                        continue;
                    }
                    let index = row * topology.total_width + col;
                    if claimed[index] {
                        return Err(TopologyError::DoubleMapped { row, col });
                    }
                    claimed[index] = true;
                    covered += 1;
                }
            }
        }
    }

    if covered != topology.total_digits() {
        return Err(TopologyError::IncompleteCoverage {
            covered,
            expected: topology.total_digits(),
        });
    }
    Ok(())
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn grid_is_empty(grid: &ModuleGrid) -> bool {
    grid.is_empty() || grid[0].is_empty()
}

fn place_grid(
    out: &mut Vec<ModulePlacement>,
    grid: &ModuleGrid,
    channel: u8,
    origin_row: usize,
    origin_col: usize,
    mdw: usize,
    mdh: usize,
) {
    for (grid_row, addresses) in grid.iter().enumerate() {
        for (grid_col, &address) in addresses.iter().enumerate() {
            out.push(ModulePlacement {
                channel,
                address,
                origin_row: origin_row + grid_row * mdh,
                origin_col: origin_col + grid_col * mdw,
            });
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
