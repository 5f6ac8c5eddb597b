// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for HAL initialization, contexts and the fatal path.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nanvix_hal_abi::{CoreId, HalError, InterruptNum, Vaddr};

use crate::arch::unix64::{SIGALRM, SIGUSR1};
use crate::arch::{Arm64, LinuxHosted, X86};
use crate::backend::hosted::{CoreExit, HostedBackend, catch_exit};
use crate::config::ClusterConfig;
use crate::context::{ExecutionContext, Stack};
use crate::hal::Hal;

const USER: Stack = Stack::new(Vaddr::new(0x4000_0000), 0x4000);
const KERNEL: Stack = Stack::new(Vaddr::new(0x8000_0000), 0x2000);

fn arm64_hal() -> Hal<HostedBackend<Arm64>> {
    Hal::new(HostedBackend::new(ClusterConfig::with_cores(2)).unwrap()).unwrap()
}

#[test]
fn new_starts_with_everything_quiet() {
    let hal = Hal::new(HostedBackend::<LinuxHosted>::new(ClusterConfig::DEFAULT).unwrap()).unwrap();

    assert!(!hal.interrupts_are_enabled());
    assert_eq!(hal.interrupts_get_level(), 0);
    assert_eq!(hal.interrupt_is_masked(InterruptNum::new(SIGALRM)), Ok(false));
    assert_eq!(hal.interrupt_is_masked(InterruptNum::new(SIGUSR1)), Ok(false));
    assert_eq!(hal.interrupt_is_masked(InterruptNum::new(12)), Ok(true));
    assert_eq!(hal.timer_reload(), None);
    assert_eq!(hal.cluster_get_num_cores(), 4);
    assert!(hal.cluster_is_master());
    assert_eq!(hal.core_get_id(), CoreId::MASTER);
}

#[test]
fn core_queries_follow_thread_binding() {
    let hal = arm64_hal();
    let slave = CoreId::new(1).unwrap();

    hal.backend().bind_current_thread(slave).unwrap();
    assert_eq!(hal.core_get_id(), slave);
    assert!(!hal.cluster_is_master());

    hal.backend().unbind_current_thread();
    assert!(hal.cluster_is_master());
}

#[test]
fn check_core_rejects_cores_outside_cluster() {
    let hal = arm64_hal();
    assert_eq!(hal.check_core(CoreId::new(1).unwrap()), Ok(()));
    assert_eq!(hal.check_core(CoreId::new(2).unwrap()), Err(HalError::InvalidArgument));
}

#[test]
fn context_create_is_owned_by_caller() {
    let hal = arm64_hal();
    let ctx = hal.context_create(Vaddr::new(0x1000), USER, KERNEL).unwrap();

    assert_eq!(ctx.owner(), CoreId::MASTER);
    assert_eq!(ctx.pc(), 0x1000);
    assert_eq!(ctx.sp(), 0x4000_4000);
}

#[test]
fn context_create_unsupported_on_hosted_target() {
    let hal = Hal::new(HostedBackend::<LinuxHosted>::new(ClusterConfig::DEFAULT).unwrap()).unwrap();
    assert_eq!(
        hal.context_create(Vaddr::new(0x1000), USER, KERNEL),
        Err(HalError::NotSupported)
    );
}

#[test]
fn context_switch_swaps_register_file() {
    let hal = arm64_hal();
    let next = hal.context_create(Vaddr::new(0x2000), USER, KERNEL).unwrap();
    let mut live = hal.backend().live_context(CoreId::MASTER).unwrap();
    live.elr = 0xDEAD_0000;
    hal.backend().load_context(CoreId::MASTER, live).unwrap();

    let mut saved = ExecutionContext::empty(CoreId::new(1).unwrap());
    // SAFETY: the hosted backend only swaps records.
    unsafe { hal.context_switch_to(&mut saved, &next) }.unwrap();

    assert_eq!(saved.pc(), 0xDEAD_0000);
    assert_eq!(saved.owner(), CoreId::MASTER);
    assert_eq!(hal.backend().live_context(CoreId::MASTER).unwrap().elr, 0x2000);
}

#[test]
fn context_switch_rejects_foreign_or_empty_target() {
    let hal = arm64_hal();
    let mut saved = ExecutionContext::empty(CoreId::MASTER);

    let created = hal.context_create(Vaddr::new(0x2000), USER, KERNEL).unwrap();
    let foreign = ExecutionContext::from_saved(CoreId::new(1).unwrap(), *created.registers());
    // SAFETY: rejected before any switch happens.
    assert_eq!(
        unsafe { hal.context_switch_to(&mut saved, &foreign) },
        Err(HalError::InvalidArgument)
    );

    let empty = ExecutionContext::empty(CoreId::MASTER);
    // SAFETY: as above.
    assert_eq!(
        unsafe { hal.context_switch_to(&mut saved, &empty) },
        Err(HalError::InvalidArgument)
    );
}

#[test]
fn context_dump_goes_to_console() {
    let hal = arm64_hal();
    let ctx = hal.context_create(Vaddr::new(0xABC0), USER, KERNEL).unwrap();

    hal.context_dump(ctx.registers());

    let out = hal.backend().console_output();
    assert!(out.contains("context dump (core:0)"));
    assert!(out.contains("elr=000000000000abc0"));
}

#[test]
fn fatal_dumps_and_halts() {
    let hal = arm64_hal();
    let ctx = hal.context_create(Vaddr::new(0x3000), USER, KERNEL).unwrap();

    let exit = catch_exit(|| {
        hal.fatal(&"bad things", Some(ctx.registers()));
    });

    assert_eq!(exit, Some(CoreExit::Halted));
    let out = hal.backend().console_output();
    assert!(out.contains("[hal] fatal on core:0: bad things"));
    assert!(out.contains("elr=0000000000003000"));
    let state = hal.core_state(CoreId::MASTER).unwrap();
    assert!(!state.running);
}

#[test]
fn new_rejects_cluster_the_arch_cannot_hold() {
    let backend = HostedBackend::<X86>::new(ClusterConfig::UNIPROCESSOR).unwrap();
    assert!(Hal::new(backend).is_ok());
    assert_eq!(
        HostedBackend::<X86>::new(ClusterConfig::with_cores(2)).map(|_| ()),
        Err(HalError::InvalidArgument)
    );
}

#[test]
fn console_writer_appends() {
    use core::fmt::Write;

    let hal = arm64_hal();
    hal.stdout_init();
    write!(hal.console(), "hello {}", 42).unwrap();
    hal.stdout_write(b"!");
    assert_eq!(hal.backend().console_output(), "hello 42!");
}
