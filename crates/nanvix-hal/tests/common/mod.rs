// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Shared infrastructure for cluster integration tests.
//!
//! Every test boots a simulated `AArch64` cluster on the hosted backend,
//! one native thread per core, and inspects it through the HAL.

// Each test binary uses a different subset.
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::thread;
use std::time::{Duration, Instant};

use nanvix_hal::arch::Arm64;
use nanvix_hal::backend::hosted::{CoreExit, HostedBackend, HostedCluster};
use nanvix_hal::{ClusterConfig, CoreId, CoreWork, Hal, HalError, KernelMain};
use tracing_subscriber::EnvFilter;

/// Simulated machine used by the integration tests.
pub type Machine = HostedBackend<Arm64>;

/// HAL over [`Machine`].
pub type TestHal = Hal<Machine>;

/// How long a test waits for the cluster before giving up.
const DEADLINE: Duration = Duration::from_secs(10);

static TRACING: Once = Once::new();

/// Installs a test-friendly subscriber; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Core id for `index`.
#[must_use]
pub fn core(index: u16) -> CoreId {
    CoreId::new(index).unwrap_or(CoreId::MASTER)
}

/// A HAL for a cluster of `cores` cores, not yet booted.
#[must_use]
pub fn hal(cores: usize) -> Arc<TestHal> {
    init_tracing();
    let backend = HostedBackend::new(ClusterConfig::with_cores(cores));
    match backend.and_then(Hal::new) {
        Ok(hal) => Arc::new(hal),
        Err(err) => panic!("cannot build a {cores}-core cluster: {err}"),
    }
}

/// Boots every core of `hal` and waits for all of them to stop.
#[must_use]
pub fn run(hal: &Arc<TestHal>, kmain: KernelMain<Machine>) -> Vec<CoreExit> {
    match HostedCluster::spawn(hal, kmain) {
        Ok(cluster) => cluster.join(),
        Err(err) => panic!("cannot spawn cluster threads: {err}"),
    }
}

/// Spins until `condition` holds. Panics after a generous deadline so a
/// broken protocol fails the test instead of hanging it.
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < DEADLINE, "timed out waiting for {what}");
        thread::yield_now();
    }
}

/// Posts `work` to `target` as soon as it sits idle.
pub fn start_when_idle(hal: &TestHal, target: CoreId, work: CoreWork<Machine>) {
    let mut posted = false;
    wait_until("an idle slave", || match hal.core_start(target, work) {
        Ok(()) => {
            posted = true;
            true
        }
        Err(HalError::Busy) => false,
        Err(err) => panic!("core_start({target}) failed: {err}"),
    });
    assert!(posted);
}

/// Waits until `target` finished the work it was last given.
pub fn wait_for_reset(hal: &TestHal, target: CoreId, age: u64) {
    wait_until("the slave to finish its work", || {
        hal.core_state(target)
            .is_ok_and(|state| state.age >= age && state.idle)
    });
}
