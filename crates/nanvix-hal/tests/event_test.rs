// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Inter-core events across a running cluster.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::{TestHal, core, hal, run, start_when_idle, wait_for_reset};
use nanvix_hal::backend::hosted::CoreExit;

fn notify_master(hal: &TestHal) {
    hal.event_notify(core(0)).unwrap();
}

fn notify_master_repeatedly(hal: &TestHal) {
    for _ in 0..3 {
        hal.cluster_ipi_send(core(0)).unwrap();
    }
}

// ============================================================================
// Coalescing
// ============================================================================

static COALESCED_SENDER: AtomicUsize = AtomicUsize::new(usize::MAX);
static COALESCED_DRAINED: AtomicBool = AtomicBool::new(false);

fn coalescing(hal: &TestHal) {
    start_when_idle(hal, core(1), notify_master_repeatedly);
    wait_for_reset(hal, core(1), 1);

    COALESCED_SENDER.store(hal.event_wait().as_usize(), Ordering::SeqCst);
    COALESCED_DRAINED.store(hal.event_try_wait().is_none(), Ordering::SeqCst);
}

#[test]
fn repeated_notifications_are_observed_once() {
    let hal = hal(2);
    let exits = run(&hal, coalescing);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert_eq!(COALESCED_SENDER.load(Ordering::SeqCst), 1);
    assert!(COALESCED_DRAINED.load(Ordering::SeqCst));
}

// ============================================================================
// Ordering
// ============================================================================

static FIRST: AtomicUsize = AtomicUsize::new(usize::MAX);
static SECOND: AtomicUsize = AtomicUsize::new(usize::MAX);

fn ordering(hal: &TestHal) {
    // Core 2 notifies first; core 1 must still be observed first.
    start_when_idle(hal, core(2), notify_master);
    wait_for_reset(hal, core(2), 1);
    start_when_idle(hal, core(1), notify_master);
    wait_for_reset(hal, core(1), 1);

    FIRST.store(hal.event_wait().as_usize(), Ordering::SeqCst);
    SECOND.store(hal.cluster_ipi_wait().as_usize(), Ordering::SeqCst);
}

#[test]
fn lower_sender_is_observed_first() {
    let hal = hal(3);
    let exits = run(&hal, ordering);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 3]);
    assert_eq!(FIRST.load(Ordering::SeqCst), 1);
    assert_eq!(SECOND.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Blocking wait
// ============================================================================

static WOKEN_BY: AtomicUsize = AtomicUsize::new(usize::MAX);

fn blocking_wait(hal: &TestHal) {
    // The slave notifies only after the master is already waiting.
    start_when_idle(hal, core(1), notify_master);
    WOKEN_BY.store(hal.event_wait().as_usize(), Ordering::SeqCst);
}

#[test]
fn wait_blocks_until_notified() {
    let hal = hal(2);
    let exits = run(&hal, blocking_wait);
    assert_eq!(exits, vec![CoreExit::PoweredOff; 2]);
    assert_eq!(WOKEN_BY.load(Ordering::SeqCst), 1);
}
