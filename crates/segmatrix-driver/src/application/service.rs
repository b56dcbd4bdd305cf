//! Display service: single-owner frame pump.
//!
//! The bus handles and the channel-select cache must only ever have one
//! logical writer. The service owns both on a dedicated thread; playback
//! front ends submit frames through a bounded queue and never touch the bus.
//!
//! The owner thread drains the queue to the most recent frame before
//! writing, so a slow bus drops stale frames instead of falling behind;
//! display correctness only requires eventually showing the newest frame.
//! After an exhausted recovery the thread pauses briefly and keeps retrying
//! on subsequent frames.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, SyncSender, TrySendError},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use segmatrix_core::{DigitGrid, DisplayKind, DisplayTopology};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::initialize::{initialize_displays, InitError};
use crate::application::recovery::RecoveryController;
use crate::application::update_display::DisplayUpdater;
use crate::infrastructure::bus::{BusError, BusTransport};

/// Frames buffered between producer and the owner thread. Small on purpose:
/// staleness is bounded by the queue depth.
const FRAME_QUEUE_DEPTH: usize = 2;

/// Poll interval for the shutdown flag while no frames arrive.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Pause after an exhausted recovery before the next frame attempt.
pub const DEGRADE_PAUSE: Duration = Duration::from_secs(2);

/// Error type for service startup.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The topology targets the emulator sink, not physical hardware.
    #[error("topology {0:?} is emulated; the physical driver cannot consume it")]
    EmulatedTopology(String),

    /// The bus devices could not be opened.
    #[error("bus open failed: {0}")]
    Open(#[from] BusError),

    /// The startup initialization sequence failed.
    #[error("display initialization failed: {0}")]
    Init(#[from] InitError),
}

/// Outcome of a frame submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The frame was queued for the owner thread.
    Queued,
    /// The queue was full; the frame was dropped (a newer one will follow).
    Dropped,
    /// The service has stopped; the frame was discarded.
    Stopped,
}

/// Handle to the display owner thread.
pub struct DisplayService {
    frame_tx: SyncSender<DigitGrid>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DisplayService {
    /// Opens the bus, runs the startup initialization sequence, and spawns
    /// the owner thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the topology is emulated, the bus
    /// cannot be opened, or initialization fails (a hard startup failure;
    /// startup is not retried internally).
    pub fn start(
        topology: DisplayTopology,
        mut bus: Box<dyn BusTransport>,
    ) -> Result<Self, ServiceError> {
        if topology.kind == DisplayKind::Emulated {
            return Err(ServiceError::EmulatedTopology(topology.name.clone()));
        }

        bus.open()?;
        let mut updater = DisplayUpdater::new();
        initialize_displays(bus.as_mut(), &topology, updater.selector_mut())?;

        let (frame_tx, frame_rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("segmatrix-display".to_string())
            .spawn(move || display_loop(bus, topology, updater, frame_rx, thread_running))
            .expect("failed to spawn display thread");

        info!("display service started");
        Ok(Self {
            frame_tx,
            running,
            handle: Some(handle),
        })
    }

    /// Submits a frame for display. Never blocks: a full queue drops the
    /// frame, relying on the producer to keep submitting newer ones.
    pub fn submit(&self, grid: DigitGrid) -> SubmitOutcome {
        match self.frame_tx.try_send(grid) {
            Ok(()) => SubmitOutcome::Queued,
            Err(TrySendError::Full(_)) => SubmitOutcome::Dropped,
            Err(TrySendError::Disconnected(_)) => SubmitOutcome::Stopped,
        }
    }

    /// Stops the owner thread and waits for it to release the bus.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("display thread panicked during shutdown");
            }
        }
    }
}

impl Drop for DisplayService {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// The owner-thread loop: drain to the newest frame, update, recover.
fn display_loop(
    mut bus: Box<dyn BusTransport>,
    topology: DisplayTopology,
    mut updater: DisplayUpdater,
    frame_rx: Receiver<DigitGrid>,
    running: Arc<AtomicBool>,
) {
    let recovery = RecoveryController::new();

    while running.load(Ordering::Relaxed) {
        let mut frame = match frame_rx.recv_timeout(IDLE_POLL) {
            Ok(frame) => frame,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        // Drop stale frames; only the newest one matters.
        while let Ok(newer) = frame_rx.try_recv() {
            frame = newer;
        }

        if let Err(e) = updater.update(bus.as_mut(), &topology, &frame) {
            warn!("frame update failed: {e}");
            if let Err(e) = recovery.recover(bus.as_mut(), &topology, updater.selector_mut()) {
                error!("{e}; pausing before the next frame attempt");
                thread::sleep(DEGRADE_PAUSE);
            }
        }
    }

    bus.close();
    info!("display service stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
