//! Integration tests for the fault recovery cycle.
//!
//! Exercises the full failure path: a frame update fails mid-frame, the
//! recovery controller closes and reopens the bus, resets the channel
//! cache, replays initialization, and the next frame succeeds.

use std::time::{Duration, Instant};

use segmatrix_core::{DigitGrid, DisplayTopology};
use segmatrix_driver::application::recovery::{RecoveryController, RecoveryError};
use segmatrix_driver::application::update_display::DisplayUpdater;
use segmatrix_driver::infrastructure::bus::mock::MockBus;
use segmatrix_driver::infrastructure::storage::config::{build_topology, ConfigFile};

/// 8×4 panel behind one expander channel, so channel-cache behavior is
/// observable on the control address.
const GATED_8X4: &str = r#"
[configurations."8x4"]
name = "8x4 Gated"
module_digit_width = 4
module_digit_height = 4
total_width = 8
total_height = 4

[[configurations."8x4".buses]]
id = 1

[[configurations."8x4".buses.expanders]]
address = "0x77"
[configurations."8x4".buses.expanders.channels]
"0" = [["0x70", "0x71"]]
"#;

fn load_gated() -> DisplayTopology {
    let file: ConfigFile = toml::from_str(GATED_8X4).expect("fixture must parse");
    build_topology(file.configurations.get("8x4").expect("fixture must exist"))
        .expect("fixture must validate")
}

fn fast_controller() -> RecoveryController {
    RecoveryController::with_backoff(3, Duration::from_millis(1))
}

#[test]
fn test_update_failure_then_recovery_then_clean_frame() {
    // Arrange
    let topology = load_gated();
    let mut bus = MockBus::new();
    let mut updater = DisplayUpdater::new();
    let grid = DigitGrid::uniform(8, 4, 0xFF);

    // Act 1 – the second module rejects its payload mid-frame.
    bus.fail_writes_to(0x71, 1);
    let failure = updater.update(&mut bus, &topology, &grid);
    assert!(failure.is_err(), "scripted mid-frame failure");

    // Act 2 – recover.
    fast_controller()
        .recover(&mut bus, &topology, updater.selector_mut())
        .expect("healthy bus must recover on the first attempt");

    // Act 3 – the next frame goes through untouched.
    bus.clear_transactions();
    updater
        .update(&mut bus, &topology, &grid)
        .expect("post-recovery frame");

    // Assert – both modules written, channel reselected after the reset.
    assert_eq!(bus.writes_to(0x70).len(), 1);
    assert_eq!(bus.writes_to(0x71).len(), 1);
    assert_eq!(
        bus.writes_to(0x77),
        vec![vec![0x01], vec![0x00]],
        "select and trailing deselect for the recovered frame"
    );
}

#[test]
fn test_recovery_reinitializes_every_module() {
    let topology = load_gated();
    let mut bus = MockBus::new();
    let mut updater = DisplayUpdater::new();

    fast_controller()
        .recover(&mut bus, &topology, updater.selector_mut())
        .expect("recovery");

    for address in [0x70, 0x71] {
        assert_eq!(
            bus.writes_to(address),
            vec![vec![0x21], vec![0x81], vec![0xEF]],
            "module 0x{address:02X} must be re-initialized"
        );
    }
}

#[test]
fn test_exhausted_recovery_performs_exactly_three_attempts() {
    let topology = load_gated();
    let mut bus = MockBus::new();
    bus.fail_opens(3);
    let mut updater = DisplayUpdater::new();

    let result = fast_controller().recover(&mut bus, &topology, updater.selector_mut());

    assert_eq!(result, Err(RecoveryError::Exhausted { attempts: 3 }));
    assert_eq!(bus.open_count(), 3);
    assert_eq!(bus.close_count(), 3);
}

#[test]
fn test_backoff_delays_accumulate_linearly() {
    // With a 10 ms step, three failed attempts sleep 10 + 20 + 30 = 60 ms.
    let topology = load_gated();
    let mut bus = MockBus::new();
    bus.fail_opens(3);
    let mut updater = DisplayUpdater::new();
    let controller = RecoveryController::with_backoff(3, Duration::from_millis(10));

    let start = Instant::now();
    let result = controller.recover(&mut bus, &topology, updater.selector_mut());
    let elapsed = start.elapsed();

    assert!(result.is_err());
    assert!(
        elapsed >= Duration::from_millis(60),
        "expected at least 60 ms of back-off, slept {elapsed:?}"
    );
}

#[test]
fn test_recovery_succeeds_on_second_attempt_after_one_bad_open() {
    let topology = load_gated();
    let mut bus = MockBus::new();
    bus.fail_opens(1);
    let mut updater = DisplayUpdater::new();

    let result = fast_controller().recover(&mut bus, &topology, updater.selector_mut());

    assert!(result.is_ok());
    assert_eq!(bus.open_count(), 2, "first reopen fails, second succeeds");
}

#[test]
fn test_single_failure_causes_exactly_one_cache_reset() {
    // A module write failure, one recovery, then a successful update. The
    // expander control log shows exactly one extra activation from the
    // cache reset: prime (1) + reinit select/deselect (2) + frame
    // select/deselect (2).
    let topology = load_gated();
    let mut bus = MockBus::new();
    let mut updater = DisplayUpdater::new();
    let grid = DigitGrid::uniform(8, 4, 0x00);

    bus.fail_writes_to(0x70, 1);
    assert!(updater.update(&mut bus, &topology, &grid).is_err());

    fast_controller()
        .recover(&mut bus, &topology, updater.selector_mut())
        .expect("recovery");
    updater
        .update(&mut bus, &topology, &grid)
        .expect("post-recovery frame");

    assert_eq!(
        bus.writes_to(0x77),
        vec![
            vec![0x01], // failed frame: channel 0 activated
            vec![0x01], // reinitialization reselects after the cache reset
            vec![0x00], // reinitialization leaves the bus quiescent
            vec![0x01], // recovered frame
            vec![0x00], // trailing deselect
        ]
    );
}
