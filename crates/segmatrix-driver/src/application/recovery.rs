//! Bus fault recovery.
//!
//! Intermittent bus glitches (loose wiring, transient noise) surface as
//! failed channel selects or module writes. Recovery runs a bounded
//! close → reset → back-off → reopen → reinitialize cycle:
//!
//! 1. release the current bus handles;
//! 2. unconditionally reset the channel-select cache (the hardware state can
//!    no longer be trusted);
//! 3. wait `attempt × back-off step` (linear back-off);
//! 4. reopen the bus devices; on failure, move to the next attempt;
//! 5. replay the full module initialization sequence; success ends
//!    recovery, failure moves to the next attempt.
//!
//! Failures below the attempt bound are logged and swallowed; only
//! exhaustion is surfaced. The caller is expected to pause briefly after an
//! exhausted recovery and keep retrying on subsequent frames: a transient
//! glitch self-heals within a few seconds, a persistent fault degrades to
//! periodic retries with console diagnostics, never a crash.

use std::thread;
use std::time::Duration;

use segmatrix_core::DisplayTopology;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::channel_select::ChannelSelector;
use crate::application::initialize::initialize_displays;
use crate::infrastructure::bus::BusTransport;

/// Reopen/reinitialize attempts per recovery cycle.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Linear back-off step: attempt `n` waits `n × BACKOFF_STEP`.
pub const BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Error type for an exhausted recovery cycle.
#[derive(Debug, Error, PartialEq)]
pub enum RecoveryError {
    /// Every reopen/reinitialize attempt failed.
    #[error("bus recovery exhausted after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },
}

/// The fault recovery controller.
pub struct RecoveryController {
    max_attempts: u32,
    backoff_step: Duration,
}

impl RecoveryController {
    /// Creates a controller with the standard bound and back-off.
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_RECOVERY_ATTEMPTS,
            backoff_step: BACKOFF_STEP,
        }
    }

    /// Creates a controller with a custom bound and back-off step. Tests use
    /// a millisecond-scale step to keep the suite fast.
    pub fn with_backoff(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            backoff_step,
        }
    }

    /// Delay before the given 1-based attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Runs the recovery cycle until the bus is reinitialized or the attempt
    /// bound is exhausted.
    ///
    /// On success the transport holds fresh device handles and every module
    /// has been re-initialized; the caller resumes frame updates with the
    /// same transport.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::Exhausted`] after the final failed attempt.
    pub fn recover(
        &self,
        bus: &mut dyn BusTransport,
        topology: &DisplayTopology,
        selector: &mut ChannelSelector,
    ) -> Result<(), RecoveryError> {
        for attempt in 1..=self.max_attempts {
            info!(
                "bus recovery attempt {attempt}/{}: closing and reopening",
                self.max_attempts
            );
            bus.close();
            selector.reset();
            thread::sleep(self.backoff_delay(attempt));

            if let Err(e) = bus.open() {
                warn!("reopen failed on attempt {attempt}: {e}");
                continue;
            }

            match initialize_displays(bus, topology, selector) {
                Ok(()) => {
                    info!("bus recovered after {attempt} attempt(s)");
                    return Ok(());
                }
                Err(e) => warn!("reinitialization failed on attempt {attempt}: {e}"),
            }
        }

        warn!(
            "bus recovery exhausted after {} attempt(s)",
            self.max_attempts
        );
        Err(RecoveryError::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for RecoveryController {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bus::mock::MockBus;
    use segmatrix_core::{BusTopology, DisplayKind, ExpanderTopology, Placement};
    use std::collections::BTreeMap;

    fn tiny_topology() -> DisplayTopology {
        DisplayTopology {
            name: "tiny".to_string(),
            kind: DisplayKind::Physical,
            buses: BTreeMap::from([(
                1,
                BusTopology {
                    expanders: vec![ExpanderTopology {
                        address: None,
                        channels: BTreeMap::from([(0, vec![vec![0x70]])]),
                        placement: Placement::ScanFill,
                    }],
                },
            )]),
            module_digit_width: 4,
            module_digit_height: 4,
            total_width: 4,
            total_height: 4,
        }
    }

    fn fast_controller() -> RecoveryController {
        RecoveryController::with_backoff(3, Duration::from_millis(1))
    }

    #[test]
    fn test_backoff_delays_are_linear_half_seconds() {
        let controller = RecoveryController::new();
        assert_eq!(controller.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(controller.backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(controller.backoff_delay(3), Duration::from_millis(1500));
    }

    #[test]
    fn test_recovery_succeeds_on_first_attempt_with_healthy_bus() {
        // Arrange
        let topology = tiny_topology();
        let mut bus = MockBus::new();
        let mut selector = ChannelSelector::new();

        // Act
        let result = fast_controller().recover(&mut bus, &topology, &mut selector);

        // Assert – one close/open cycle and a full re-initialization
        assert_eq!(result, Ok(()));
        assert_eq!(bus.close_count(), 1);
        assert_eq!(bus.open_count(), 1);
        assert_eq!(bus.writes_to(0x70), vec![vec![0x21], vec![0x81], vec![0xEF]]);
    }

    #[test]
    fn test_recovery_exhausts_after_exactly_three_reopen_attempts() {
        // Arrange – every open fails.
        let topology = tiny_topology();
        let mut bus = MockBus::new();
        bus.fail_opens(3);
        let mut selector = ChannelSelector::new();

        // Act
        let result = fast_controller().recover(&mut bus, &topology, &mut selector);

        // Assert
        assert_eq!(result, Err(RecoveryError::Exhausted { attempts: 3 }));
        assert_eq!(bus.open_count(), 3, "exactly one reopen per attempt");
        assert_eq!(bus.close_count(), 3);
    }

    #[test]
    fn test_recovery_retries_after_failed_reinitialization() {
        // Arrange – the module rejects its first command once, so attempt 1
        // fails at reinitialization and attempt 2 succeeds.
        let topology = tiny_topology();
        let mut bus = MockBus::new();
        bus.fail_writes_to(0x70, 1);
        let mut selector = ChannelSelector::new();

        // Act
        let result = fast_controller().recover(&mut bus, &topology, &mut selector);

        // Assert
        assert_eq!(result, Ok(()));
        assert_eq!(bus.open_count(), 2);
    }

    #[test]
    fn test_recovery_exhausts_when_reinitialization_never_succeeds() {
        let topology = tiny_topology();
        let mut bus = MockBus::new();
        bus.fail_writes_to(0x70, 100);
        let mut selector = ChannelSelector::new();

        let result = fast_controller().recover(&mut bus, &topology, &mut selector);

        assert_eq!(result, Err(RecoveryError::Exhausted { attempts: 3 }));
        assert_eq!(bus.failed_write_count(), 3, "one init failure per attempt");
    }

    #[test]
    fn test_recovery_resets_the_channel_cache() {
        // Arrange – a multiplexed topology so the cache is observable.
        let topology = DisplayTopology {
            name: "gated".to_string(),
            kind: DisplayKind::Physical,
            buses: BTreeMap::from([(
                1,
                BusTopology {
                    expanders: vec![ExpanderTopology {
                        address: Some(0x77),
                        channels: BTreeMap::from([(0, vec![vec![0x70]])]),
                        placement: Placement::ScanFill,
                    }],
                },
            )]),
            module_digit_width: 4,
            module_digit_height: 4,
            total_width: 4,
            total_height: 4,
        };
        let mut bus = MockBus::new();
        let mut selector = ChannelSelector::new();

        // Prime the cache with channel 0 active.
        selector.select(&mut bus, 1, Some(0x77), 0).unwrap();
        bus.clear_transactions();

        // Act
        fast_controller()
            .recover(&mut bus, &topology, &mut selector)
            .unwrap();

        // Assert – reinitialization re-selected channel 0 despite the primed
        // cache, proving the reset happened.
        assert_eq!(bus.writes_to(0x77), vec![vec![0x01], vec![0x00]]);
    }
}
