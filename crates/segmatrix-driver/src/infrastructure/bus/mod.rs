//! Bus transport infrastructure.
//!
//! The display layer issues exactly two kinds of transactions: single-byte
//! channel-select writes to an expander, and 17-byte (start register +
//! payload) writes to a module. Both reduce to "write this byte sequence to
//! that address on that bus", which is the whole surface of the
//! [`BusTransport`] trait.
//!
//! On Linux the production implementation opens one `/dev/i2c-N` character
//! device per topology bus id. Tests use [`mock::MockBus`], which records
//! every transaction and can be scripted to fail.
//!
//! # Recovery
//!
//! Transports are re-openable: the fault recovery controller calls
//! [`BusTransport::close`] followed by [`BusTransport::open`] to get a fresh
//! set of device handles after a bus glitch.

use segmatrix_core::BusId;
use thiserror::Error;

pub mod mock;

#[cfg(target_os = "linux")]
pub mod i2c;

/// Error type for bus transport operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// A bus device could not be opened.
    #[error("failed to open bus device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A write transaction was rejected or the device did not respond.
    #[error("write to 0x{address:02X} on bus {bus} failed: {source}")]
    Write {
        bus: BusId,
        address: u8,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transport has no open handle for the requested bus.
    #[error("bus {0} is not open")]
    NotOpen(BusId),
}

/// Trait abstracting the physical bus.
///
/// Implementations own the device handles; exactly one logical writer may
/// drive a transport at a time (see `application::service` for the
/// single-owner arrangement).
pub trait BusTransport: Send {
    /// Opens (or re-opens) every device handle the transport needs.
    ///
    /// Calling `open` on an already open transport first releases the
    /// existing handles.
    fn open(&mut self) -> Result<(), BusError>;

    /// Releases all device handles. Idempotent.
    fn close(&mut self);

    /// Writes `bytes` to the device at `address` on logical bus `bus` as a
    /// single transaction.
    fn write(&mut self, bus: BusId, address: u8, bytes: &[u8]) -> Result<(), BusError>;
}
