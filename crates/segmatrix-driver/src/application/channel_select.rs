//! Channel selection with a per-expander cache.
//!
//! Activating a channel costs a bus transaction plus a settle delay, so the
//! selector remembers each expander's active channel and skips redundant
//! selects. Per-frame bus traffic is therefore proportional to the number of
//! channel *changes*, not the number of modules written.
//!
//! The cache is an owned object; the fault recovery controller calls
//! [`ChannelSelector::reset`] after reopening the bus so that the first
//! select on every expander is issued unconditionally again.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use segmatrix_core::BusId;
use thiserror::Error;

use crate::infrastructure::bus::{BusError, BusTransport};

/// Settle time after switching an expander channel.
pub const SELECT_SETTLE: Duration = Duration::from_millis(1);

/// Error raised when an expander rejects a channel-select write.
#[derive(Debug, Error)]
#[error("channel select failed on expander 0x{expander:02X} (requested channel {channel:?})")]
pub struct SelectError {
    /// Address of the expander that failed.
    pub expander: u8,
    /// Requested channel, or `None` for deselect-all.
    pub channel: Option<u8>,
    #[source]
    pub source: BusError,
}

/// Cached channel state, one entry per expander identity.
///
/// A present entry holds `Some(channel)` for an active channel or `None`
/// after a deselect-all; an absent entry means the hardware state is unknown
/// and the next select must be issued unconditionally.
pub struct ChannelSelector {
    active: HashMap<(BusId, u8), Option<u8>>,
    settle: Duration,
}

impl ChannelSelector {
    /// Creates a selector with every expander in the unknown state.
    pub fn new() -> Self {
        Self {
            active: HashMap::new(),
            settle: SELECT_SETTLE,
        }
    }

    /// Activates `channel` on the expander at `expander` (bus `bus_id`).
    ///
    /// Direct-attached module groups (`expander == None`) need no gating and
    /// succeed without any bus traffic. A select matching the cached active
    /// channel is an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError`] when the control write fails; the cache is
    /// left unchanged so the next attempt is not skipped.
    pub fn select(
        &mut self,
        bus: &mut dyn BusTransport,
        bus_id: BusId,
        expander: Option<u8>,
        channel: u8,
    ) -> Result<(), SelectError> {
        self.apply(bus, bus_id, expander, Some(channel))
    }

    /// Disables every channel on the expander, leaving the bus quiescent.
    ///
    /// # Errors
    ///
    /// Returns [`SelectError`] when the control write fails.
    pub fn deselect(
        &mut self,
        bus: &mut dyn BusTransport,
        bus_id: BusId,
        expander: Option<u8>,
    ) -> Result<(), SelectError> {
        self.apply(bus, bus_id, expander, None)
    }

    /// Forgets every expander's active channel. Called after bus recovery,
    /// when the hardware state can no longer be trusted.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    fn apply(
        &mut self,
        bus: &mut dyn BusTransport,
        bus_id: BusId,
        expander: Option<u8>,
        target: Option<u8>,
    ) -> Result<(), SelectError> {
        let Some(address) = expander else {
            // No multiplexer in the path; nothing to switch.
            return Ok(());
        };

        let key = (bus_id, address);
        if self.active.get(&key) == Some(&target) {
            return Ok(());
        }

        // One control byte: a single bit at the channel position, or all
        // bits clear to disable every channel.
        let control = target.map_or(0u8, |channel| 1 << channel);
        bus.write(bus_id, address, &[control])
            .map_err(|source| SelectError {
                expander: address,
                channel: target,
                source,
            })?;
        thread::sleep(self.settle);
        self.active.insert(key, target);
        Ok(())
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
