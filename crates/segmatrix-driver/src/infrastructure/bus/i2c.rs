//! Linux I2C bus transport backed by `/dev/i2c-N` character devices.
//!
//! Each logical bus id in the topology maps to one kernel I2C adapter:
//! bus id 1 is `/dev/i2c-1`, and so on. The kernel handles slave addressing
//! per transaction, so a single handle per adapter serves every expander and
//! module on that bus.

use std::collections::BTreeMap;

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use segmatrix_core::{BusId, DisplayTopology};
use tracing::debug;

use super::{BusError, BusTransport};

/// Physical bus transport over Linux I2C character devices.
///
/// Created closed; call [`BusTransport::open`] before the first write. The
/// fault recovery controller relies on `close` + `open` producing fresh file
/// descriptors.
pub struct I2cBus {
    bus_ids: Vec<BusId>,
    devices: BTreeMap<BusId, I2cdev>,
}

impl I2cBus {
    /// Creates a transport for the given bus ids, not yet open.
    pub fn new(mut bus_ids: Vec<BusId>) -> Self {
        bus_ids.sort_unstable();
        bus_ids.dedup();
        Self {
            bus_ids,
            devices: BTreeMap::new(),
        }
    }

    /// Creates a transport covering every bus the topology declares.
    pub fn for_topology(topology: &DisplayTopology) -> Self {
        Self::new(topology.buses.keys().copied().collect())
    }

    /// Device path for a logical bus id.
    pub fn device_path(bus: BusId) -> String {
        format!("/dev/i2c-{bus}")
    }
}

impl BusTransport for I2cBus {
    fn open(&mut self) -> Result<(), BusError> {
        self.devices.clear();
        for &bus in &self.bus_ids {
            let path = Self::device_path(bus);
            let device = I2cdev::new(&path).map_err(|e| BusError::Open {
                path: path.clone(),
                source: Box::new(std::io::Error::other(format!("{e:?}"))),
            })?;
            debug!("opened bus device {path}");
            self.devices.insert(bus, device);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.devices.clear();
    }

    fn write(&mut self, bus: BusId, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let device = self.devices.get_mut(&bus).ok_or(BusError::NotOpen(bus))?;
        device.write(address, bytes).map_err(|e| BusError::Write {
            bus,
            address,
            source: Box::new(std::io::Error::other(format!("{e:?}"))),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
