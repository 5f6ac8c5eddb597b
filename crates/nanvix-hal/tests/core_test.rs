// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Work dispatch, sleep and shutdown of slave cores.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use common::{TestHal, core, hal, run, start_when_idle, wait_for_reset, wait_until};
use nanvix_hal::backend::hosted::CoreExit;
use nanvix_hal::{CoreState, HalError};

// ============================================================================
// Work lifecycle
// ============================================================================

static RAN_ON: AtomicUsize = AtomicUsize::new(usize::MAX);
static RUNS: AtomicUsize = AtomicUsize::new(0);
static RELEASE: AtomicBool = AtomicBool::new(false);
static BUSY_WHILE_WORKING: AtomicBool = AtomicBool::new(false);
static AGE_AFTER: AtomicU64 = AtomicU64::new(0);

fn hold_until_released(hal: &TestHal) {
    RAN_ON.store(hal.core_get_id().as_usize(), Ordering::SeqCst);
    RUNS.fetch_add(1, Ordering::SeqCst);
    wait_until("the master to release the work", || RELEASE.load(Ordering::SeqCst));
}

fn work_lifecycle(hal: &TestHal) {
    start_when_idle(hal, core(1), hold_until_released);
    wait_until("the work to start", || RUNS.load(Ordering::SeqCst) == 1);

    let state = hal.core_state(core(1)).unwrap();
    BUSY_WHILE_WORKING.store(
        !state.idle && hal.core_start(core(1), hold_until_released) == Err(HalError::Busy),
        Ordering::SeqCst,
    );

    RELEASE.store(true, Ordering::SeqCst);
    wait_for_reset(hal, core(1), 1);
    start_when_idle(hal, core(1), hold_until_released);
    wait_for_reset(hal, core(1), 2);
    AGE_AFTER.store(hal.core_state(core(1)).unwrap().age, Ordering::SeqCst);
}

#[test]
fn slave_runs_work_then_resets() {
    let hal = hal(2);
    let exits = run(&hal, work_lifecycle);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert_eq!(RAN_ON.load(Ordering::SeqCst), 1);
    assert_eq!(RUNS.load(Ordering::SeqCst), 2);
    assert!(BUSY_WHILE_WORKING.load(Ordering::SeqCst));
    assert_eq!(AGE_AFTER.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Sleep and wakeup
// ============================================================================

static SLEPT: AtomicBool = AtomicBool::new(false);
static WOKE: AtomicBool = AtomicBool::new(false);

fn sleep_once(hal: &TestHal) {
    SLEPT.store(true, Ordering::SeqCst);
    hal.core_sleep();
    WOKE.store(true, Ordering::SeqCst);
}

fn sleep_and_wake(hal: &TestHal) {
    start_when_idle(hal, core(1), sleep_once);
    wait_until("the slave to fall asleep", || {
        hal.core_state(core(1)).unwrap().state == CoreState::Sleeping
    });
    assert!(!WOKE.load(Ordering::SeqCst));
    hal.core_wakeup(core(1)).unwrap();
    wait_until("the slave to wake up", || WOKE.load(Ordering::SeqCst));
    wait_for_reset(hal, core(1), 1);
}

#[test]
fn sleeping_core_wakes_on_request() {
    let hal = hal(2);
    let exits = run(&hal, sleep_and_wake);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert!(SLEPT.load(Ordering::SeqCst));
    assert!(WOKE.load(Ordering::SeqCst));
}

static EARLY_WAKEUP_SENT: AtomicBool = AtomicBool::new(false);
static EARLY_WOKE: AtomicBool = AtomicBool::new(false);

fn sleep_after_wakeup(hal: &TestHal) {
    wait_until("the early wakeup", || EARLY_WAKEUP_SENT.load(Ordering::SeqCst));
    hal.core_sleep();
    EARLY_WOKE.store(true, Ordering::SeqCst);
}

fn wake_before_sleep(hal: &TestHal) {
    start_when_idle(hal, core(1), sleep_after_wakeup);
    hal.core_wakeup(core(1)).unwrap();
    EARLY_WAKEUP_SENT.store(true, Ordering::SeqCst);
    wait_for_reset(hal, core(1), 1);
}

#[test]
fn wakeup_sent_before_sleep_is_not_lost() {
    let hal = hal(2);
    let exits = run(&hal, wake_before_sleep);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert!(EARLY_WOKE.load(Ordering::SeqCst));
}

static FIRST_RUNNING: AtomicBool = AtomicBool::new(false);
static WAKEUP_SENT_DURING_FIRST: AtomicBool = AtomicBool::new(false);
static SECOND_WOKE: AtomicBool = AtomicBool::new(false);
static WOKE_WITHOUT_WAKEUP: AtomicBool = AtomicBool::new(true);

fn ignore_wakeup(_: &TestHal) {
    FIRST_RUNNING.store(true, Ordering::SeqCst);
    wait_until("the wakeup", || WAKEUP_SENT_DURING_FIRST.load(Ordering::SeqCst));
}

fn sleep_after_reset(hal: &TestHal) {
    hal.core_sleep();
    SECOND_WOKE.store(true, Ordering::SeqCst);
}

fn wakeup_then_reset(hal: &TestHal) {
    start_when_idle(hal, core(1), ignore_wakeup);
    wait_until("the first work", || FIRST_RUNNING.load(Ordering::SeqCst));
    hal.core_wakeup(core(1)).unwrap();
    WAKEUP_SENT_DURING_FIRST.store(true, Ordering::SeqCst);
    wait_for_reset(hal, core(1), 1);

    start_when_idle(hal, core(1), sleep_after_reset);
    wait_until("the second work to sleep", || {
        SECOND_WOKE.load(Ordering::SeqCst)
            || hal.core_state(core(1)).unwrap().state == CoreState::Sleeping
    });
    WOKE_WITHOUT_WAKEUP.store(SECOND_WOKE.load(Ordering::SeqCst), Ordering::SeqCst);
    hal.core_wakeup(core(1)).unwrap();
    wait_for_reset(hal, core(1), 2);
}

#[test]
fn reset_discards_wakeups_sent_to_earlier_work() {
    let hal = hal(2);
    let exits = run(&hal, wakeup_then_reset);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert!(!WOKE_WITHOUT_WAKEUP.load(Ordering::SeqCst));
    assert!(SECOND_WOKE.load(Ordering::SeqCst));
}

// ============================================================================
// Shutdown
// ============================================================================

static SHUTDOWN_OBSERVED: AtomicBool = AtomicBool::new(false);
static START_AFTER_SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn never(_: &TestHal) {}

fn shut_down_one(hal: &TestHal) {
    wait_until("both slaves to idle", || {
        hal.core_state(core(1)).unwrap().idle && hal.core_state(core(2)).unwrap().idle
    });
    hal.core_shutdown(core(1)).unwrap();
    wait_until("slave 1 to go offline", || {
        hal.core_state(core(1)).unwrap().state == CoreState::Offline
    });
    SHUTDOWN_OBSERVED.store(hal.core_state(core(2)).unwrap().running, Ordering::SeqCst);
    let refused = hal.core_start(core(1), never) == Err(HalError::Busy);
    START_AFTER_SHUTDOWN.store(refused, Ordering::SeqCst);
}

#[test]
fn shutdown_powers_off_only_the_target() {
    let hal = hal(3);
    let exits = run(&hal, shut_down_one);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 3]);
    assert!(SHUTDOWN_OBSERVED.load(Ordering::SeqCst));
    assert!(START_AFTER_SHUTDOWN.load(Ordering::SeqCst));
}
