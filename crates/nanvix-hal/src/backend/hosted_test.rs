// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the simulated machine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nanvix_hal_abi::{CoreId, HalError, InterruptNum};

use crate::arch::unix64::{SIGALRM, SIGUSR1};
use crate::arch::{LinuxHosted, source_mask};
use crate::backend::CoreBackend;
use crate::backend::hosted::{BootStep, CoreExit, HostedBackend, HostedCluster, catch_exit};
use crate::config::ClusterConfig;
use crate::hal::Hal;

fn backend() -> HostedBackend<LinuxHosted> {
    HostedBackend::new(ClusterConfig::with_cores(2)).unwrap()
}

fn slave() -> CoreId {
    CoreId::new(1).unwrap()
}

#[test]
fn rejects_shapes_the_arch_cannot_hold() {
    assert!(HostedBackend::<LinuxHosted>::new(ClusterConfig::with_cores(0)).is_err());
}

#[test]
fn binding_outside_cluster_is_invalid() {
    let machine = backend();
    assert_eq!(
        machine.bind_current_thread(CoreId::new(2).unwrap()),
        Err(HalError::InvalidArgument)
    );
    assert_eq!(machine.core_id(), CoreId::MASTER);
}

#[test]
fn raise_checks_range() {
    let machine = backend();
    assert_eq!(
        machine.raise_interrupt(CoreId::MASTER, InterruptNum::new(32)),
        Err(HalError::InvalidArgument)
    );
    assert_eq!(
        machine.raise_interrupt(CoreId::new(5).unwrap(), InterruptNum::new(1)),
        Err(HalError::InvalidArgument)
    );
}

#[test]
fn irq_next_delivers_lowest_deliverable_line_once() {
    let machine = backend();
    for num in [12, 3, 14] {
        machine.raise_interrupt(CoreId::MASTER, InterruptNum::new(num)).unwrap();
    }

    assert_eq!(machine.irq_next(1 << 12 | 1 << 14), Some(InterruptNum::new(12)));
    assert_eq!(machine.irq_next(1 << 12 | 1 << 14), Some(InterruptNum::new(14)));
    assert_eq!(machine.irq_next(1 << 12 | 1 << 14), None);
    assert_eq!(machine.pending_interrupts(CoreId::MASTER), Ok(1 << 3));
}

#[test]
fn lines_are_per_core() {
    let machine = backend();
    machine.fire_timer(slave()).unwrap();
    assert_eq!(machine.irq_next(u64::MAX), None);

    machine.bind_current_thread(slave()).unwrap();
    assert_eq!(machine.irq_next(u64::MAX), Some(InterruptNum::new(SIGALRM)));
    machine.unbind_current_thread();
}

#[test]
fn ipi_line_is_set_and_acked() {
    let machine = backend();
    machine.ipi_send(slave());
    assert_eq!(machine.pending_interrupts(slave()), Ok(1 << SIGUSR1));

    machine.bind_current_thread(slave()).unwrap();
    machine.ipi_ack();
    assert_eq!(machine.pending_interrupts(slave()), Ok(0));
    machine.unbind_current_thread();
}

#[test]
fn controller_setup_masks_every_line() {
    let machine = backend();
    machine.irq_unmask(InterruptNum::new(SIGALRM));
    machine.irq_controller_setup().unwrap();
    assert!(machine.is_masked(InterruptNum::new(SIGALRM)));
    assert_eq!(source_mask::<LinuxHosted>(), u64::from(u32::MAX));
}

#[test]
fn injected_failures_hit_only_their_step() {
    let machine = backend();
    machine.fail_at(BootStep::MemorySetup);
    assert_eq!(machine.memory_setup(), Err(HalError::NotSupported));
    assert_eq!(machine.core_setup(), Ok(()));
    assert_eq!(machine.irq_controller_setup(), Ok(()));
}

#[test]
fn clock_runs_at_base_frequency() {
    let machine = backend();
    let start = machine.clock_read();
    thread::sleep(Duration::from_millis(2));
    assert!(machine.clock_read() - start >= 2_000_000);
}

#[test]
fn halt_and_poweroff_unwind_with_exit() {
    let machine = backend();
    let halted = catch_exit(|| {
        machine.halt();
    });
    let powered_off = catch_exit(|| {
        machine.poweroff();
    });
    assert_eq!(halted, Some(CoreExit::Halted));
    assert_eq!(powered_off, Some(CoreExit::PoweredOff));
    assert_eq!(catch_exit(|| {}), None);
    assert_eq!(
        catch_exit(|| {
            panic!("boom");
        }),
        Some(CoreExit::Panicked("boom".into()))
    );
}

#[test]
fn killed_machine_releases_waiters() {
    let machine = backend();
    machine.wait_for_event();
    machine.kill();
    assert_eq!(catch_exit(|| machine.wait_for_event()), Some(CoreExit::Killed));
}

#[test]
fn console_is_captured() {
    let machine = backend();
    machine.stdout_write(b"abc");
    machine.stdout_write(b"def");
    assert_eq!(machine.console_output(), "abcdef");
}

fn return_at_once(_: &Hal<HostedBackend<LinuxHosted>>) {}

#[test]
fn cluster_powers_off_when_kmain_returns() {
    let backend = HostedBackend::new(ClusterConfig::with_cores(3)).unwrap();
    let hal = Arc::new(Hal::new(backend).unwrap());
    let cluster = HostedCluster::spawn(&hal, return_at_once).unwrap();
    assert_eq!(cluster.join(), [CoreExit::PoweredOff, CoreExit::PoweredOff, CoreExit::PoweredOff]);
}
