// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_both_readings() {
    let clock = FakeClock::at_epoch_ms(10_000);
    let t0 = clock.now();

    clock.advance(Duration::from_millis(250));

    assert_eq!(clock.epoch_ms(), 10_250);
    assert_eq!(clock.now() - t0, Duration::from_millis(250));
}

#[test]
fn clones_share_the_same_time() {
    let clock = FakeClock::default();
    let other = clock.clone();

    clock.advance(Duration::from_secs(1));

    assert_eq!(other.epoch_ms(), 1_000);
}

#[test]
fn elapsed_ms_measures_from_an_earlier_reading() {
    let clock = FakeClock::default();
    let start = clock.now();

    clock.advance(Duration::from_millis(1_500));

    assert_eq!(clock.elapsed_ms(start), 1_500);
}

#[test]
fn elapsed_ms_never_goes_negative() {
    let clock = FakeClock::default();
    clock.advance(Duration::from_secs(3_600));
    let later = clock.now();

    // a reading from the future saturates to zero
    assert_eq!(FakeClock::default().elapsed_ms(later), 0);
}

#[test]
fn system_clock_is_monotonic_and_stamps_wall_time() {
    let clock = SystemClock;
    let a = clock.now();
    assert!(clock.now() >= a);
    assert!(clock.epoch_ms() > 0);
}
