//! Mock bus transport for unit and integration testing.
//!
//! Records every transaction and can be scripted to fail writes to chosen
//! addresses or to fail the next open attempts, so fault-recovery paths can
//! be exercised without hardware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use segmatrix_core::BusId;

use super::{BusError, BusTransport};

/// One recorded bus write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub bus: BusId,
    pub address: u8,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    transactions: Vec<Transaction>,
    open_count: usize,
    close_count: usize,
    failed_writes: usize,
    failing_opens: usize,
    failing_writes: HashMap<u8, usize>,
}

/// A mock implementation of [`BusTransport`].
///
/// Clones share the same underlying state, so a test can keep one clone for
/// inspection while another is moved into the code under test.
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    /// Creates a new mock bus, already open.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                open: true,
                ..MockState::default()
            })),
        }
    }

    /// Scripts the next `times` writes to `address` to fail.
    pub fn fail_writes_to(&self, address: u8, times: usize) {
        let mut state = self.state.lock().expect("lock poisoned");
        *state.failing_writes.entry(address).or_insert(0) += times;
    }

    /// Scripts the next `times` calls to `open` to fail.
    pub fn fail_opens(&self, times: usize) {
        self.state.lock().expect("lock poisoned").failing_opens += times;
    }

    /// All successfully recorded transactions, in order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state
            .lock()
            .expect("lock poisoned")
            .transactions
            .clone()
    }

    /// Payloads of successful writes to `address`, in order.
    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.transactions()
            .into_iter()
            .filter(|t| t.address == address)
            .map(|t| t.bytes)
            .collect()
    }

    /// Number of times `open` was called (successful or not).
    pub fn open_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").open_count
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").close_count
    }

    /// Number of scripted write failures that fired.
    pub fn failed_write_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").failed_writes
    }

    /// Discards the recorded transaction log; scripting is untouched.
    pub fn clear_transactions(&self) {
        self.state
            .lock()
            .expect("lock poisoned")
            .transactions
            .clear();
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for MockBus {
    fn open(&mut self) -> Result<(), BusError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.open_count += 1;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(BusError::Open {
                path: "mock".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "scripted open failure",
                )),
            });
        }
        state.open = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.close_count += 1;
        state.open = false;
    }

    fn write(&mut self, bus: BusId, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let mut guard = self.state.lock().expect("lock poisoned");
        let state = &mut *guard;
        if !state.open {
            return Err(BusError::NotOpen(bus));
        }
        if let Some(remaining) = state.failing_writes.get_mut(&address) {
            if *remaining > 0 {
                *remaining -= 1;
                state.failed_writes += 1;
                return Err(BusError::Write {
                    bus,
                    address,
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "scripted write failure",
                    )),
                });
            }
        }
        state.transactions.push(Transaction {
            bus,
            address,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
