// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Cluster boot sequencing.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::{TestHal, core, hal, run, wait_until};
use nanvix_hal::backend::hosted::{BootStep, CoreExit};
use nanvix_hal::{CoreState, InterruptNum};

// ============================================================================
// Normal boot
// ============================================================================

static KMAIN_CALLS: AtomicUsize = AtomicUsize::new(0);
static KMAIN_CORE: AtomicUsize = AtomicUsize::new(usize::MAX);
static SLAVES_IDLE: AtomicBool = AtomicBool::new(false);
static FENCE_OPEN: AtomicBool = AtomicBool::new(false);

fn observe_boot(hal: &TestHal) {
    KMAIN_CALLS.fetch_add(1, Ordering::SeqCst);
    KMAIN_CORE.store(hal.core_get_id().as_usize(), Ordering::SeqCst);
    let master_running = hal.core_state(core(0)).unwrap().state == CoreState::Running;
    FENCE_OPEN.store(master_running, Ordering::SeqCst);

    wait_until("slaves to reach the idle loop", || {
        (1..4).all(|index| {
            let state = hal.core_state(core(index)).unwrap();
            state.state == CoreState::Running && state.running && state.idle
        })
    });
    SLAVES_IDLE.store(true, Ordering::SeqCst);
}

#[test]
fn four_cores_run_kmain_once_on_master() {
    let hal = hal(4);

    let exits = run(&hal, observe_boot);

    assert_eq!(exits, vec![CoreExit::PoweredOff; 4]);
    assert_eq!(KMAIN_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(KMAIN_CORE.load(Ordering::SeqCst), 0);
    assert!(FENCE_OPEN.load(Ordering::SeqCst));
    assert!(SLAVES_IDLE.load(Ordering::SeqCst));
    for index in 0..4 {
        assert_eq!(hal.core_state(core(index)).unwrap().state, CoreState::Offline);
    }
}

// ============================================================================
// Master setup
// ============================================================================

static TIMER_ARMED: AtomicBool = AtomicBool::new(false);

fn check_master_setup(hal: &TestHal) {
    let timer_open = hal.interrupt_is_masked(InterruptNum::new(27)) == Ok(false);
    let spi_closed = hal.backend().is_masked(InterruptNum::new(40));
    let reload_set = hal.timer_reload() == Some(625_000);
    let armed = timer_open && spi_closed && reload_set && !hal.interrupts_are_enabled();
    TIMER_ARMED.store(armed, Ordering::SeqCst);
}

#[test]
fn master_arms_timer_and_controller_before_kmain() {
    let hal = hal(2);
    let exits = run(&hal, check_master_setup);
    assert_eq!(exits, [CoreExit::PoweredOff, CoreExit::PoweredOff]);
    assert!(TIMER_ARMED.load(Ordering::SeqCst));
}

// ============================================================================
// Boot failures
// ============================================================================

static NEVER_CALLED: AtomicBool = AtomicBool::new(false);

fn must_not_run(_: &TestHal) {
    NEVER_CALLED.store(true, Ordering::SeqCst);
}

#[test]
fn memory_setup_failure_halts_master() {
    let hal = hal(4);
    hal.backend().fail_at(BootStep::MemorySetup);

    let exits = run(&hal, must_not_run);

    assert_eq!(exits[0], CoreExit::Halted);
    assert!(exits[1..].iter().all(|exit| *exit == CoreExit::Killed));
    assert!(!NEVER_CALLED.load(Ordering::SeqCst));
    assert!(hal.backend().console_output().contains("memory setup failed"));
}

#[test]
fn controller_failure_halts_master() {
    let hal = hal(2);
    hal.backend().fail_at(BootStep::IrqControllerSetup);

    let exits = run(&hal, must_not_run);

    assert_eq!(exits, [CoreExit::Halted, CoreExit::Killed]);
    assert!(hal.backend().console_output().contains("interrupt controller setup failed"));
    assert_eq!(hal.core_state(core(1)).unwrap().state, CoreState::Resetting);
}

#[test]
fn core_setup_failure_halts_every_core() {
    let hal = hal(3);
    hal.backend().fail_at(BootStep::CoreSetup);

    let exits = run(&hal, must_not_run);

    assert!(exits.iter().all(|exit| *exit == CoreExit::Halted || *exit == CoreExit::Killed));
    assert_eq!(exits[0], CoreExit::Halted);
}

// ============================================================================
// Panics inside kmain
// ============================================================================

fn explode(_: &TestHal) {
    panic!("kmain exploded");
}

#[test]
fn panic_in_kmain_kills_the_cluster() {
    let hal = hal(2);
    let exits = run(&hal, explode);
    assert_eq!(exits[0], CoreExit::Panicked("kmain exploded".into()));
    assert!(matches!(exits[1], CoreExit::Killed | CoreExit::PoweredOff));
}
