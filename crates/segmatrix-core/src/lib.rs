//! # segmatrix-core
//!
//! Shared library for segmatrix containing the display topology model, the
//! hierarchical addressing arithmetic, and the module frame codec.
//!
//! This crate is used by every playback front end and by the physical bus
//! driver. It has zero dependencies on OS APIs or bus devices.
//!
//! # Architecture overview
//!
//! segmatrix drives a large matrix of multiplexed 7-segment display modules
//! from a flat digit grid produced once per video frame. The hardware is a
//! tree: independent buses host channel-expander chips, each expander gates
//! one of several downstream channels, and each channel carries a 2-D
//! arrangement of 16-digit driver modules.
//!
//! This crate defines:
//!
//! - **`domain`** – Pure business logic with no OS dependencies. The most
//!   important pieces are the [`DisplayTopology`] (the wiring description)
//!   and the layout engine that resolves a global `(row, col)` digit position
//!   down to `(bus, expander, channel, module, digit-within-module)`.
//!
//! - **`frame`** – How bytes travel over the wire to a single module.
//!   Sixteen per-digit segment bytes are transposed into a 16-byte
//!   plane-major payload and sent as one 17-byte write transaction.

// Declare the top-level modules. Rust will look for each in a subdirectory
// or file with the same name (e.g., src/domain/mod.rs).
pub mod domain;
pub mod frame;

// Re-export the most-used types at the crate root so callers can write
// `segmatrix_core::DisplayTopology` instead of the full module path.
pub use domain::grid::{DigitGrid, GridError};
pub use domain::layout::{
    module_at, placements, ExpanderPlacements, ModulePlacement, ResolvedDigit, TopologyError,
};
pub use domain::topology::{
    BusId, BusTopology, DisplayKind, DisplayTopology, ExpanderTopology, ModuleGrid, Placement,
    RowPlacement,
};
pub use frame::{decode_frame, encode_frame, write_transaction, DIGITS_PER_MODULE};
