// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Clock and scheduling timer.
//!
//! The timer ticks at `Arch::TIMER.base_hz`. `timer_init` turns a tick
//! rate into a reload value and arms the timer; periodic timers re-arm
//! themselves, one-shot compare timers need `timer_reset` after every tick.

use core::sync::atomic::{AtomicU64, Ordering};

use nanvix_hal_abi::{HalError, HalResult};

use crate::arch::{Arch, TimerMode, TimerSpec};
use crate::backend::CoreBackend;
use crate::hal::Hal;

/// Consecutive reads `clock_calibrate` measures.
pub const CALIBRATION_SAMPLES: usize = 16;

/// Reload value for ticking at `freq` Hz on `timer`.
///
/// # Errors
///
/// - `InvalidArgument` for a zero rate or one above the base frequency.
/// - `Overflow` if the reload does not fit the counter.
pub const fn timer_reload(timer: &TimerSpec, freq: u64) -> HalResult<u64> {
    if freq == 0 || freq > timer.base_hz {
        return Err(HalError::InvalidArgument);
    }
    let reload = timer.base_hz / freq;
    let max = if timer.counter_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << timer.counter_bits) - 1
    };
    if reload > max {
        return Err(HalError::Overflow);
    }
    Ok(reload)
}

/// Timer calibration shared by all cores.
#[derive(Debug, Default)]
pub struct Clock {
    reload: AtomicU64,
    overhead: AtomicU64,
}

impl Clock {
    /// Creates an uncalibrated clock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reload: AtomicU64::new(0),
            overhead: AtomicU64::new(0),
        }
    }

    /// Programmed reload value, or `None` before `timer_init`.
    #[must_use]
    pub fn reload(&self) -> Option<u64> {
        match self.reload.load(Ordering::Acquire) {
            0 => None,
            reload => Some(reload),
        }
    }

    /// Measured cost of one clock read, in ticks.
    #[must_use]
    pub fn overhead(&self) -> u64 {
        self.overhead.load(Ordering::Relaxed)
    }
}

impl<B: CoreBackend> Hal<B> {
    /// Arms the scheduling timer to fire `freq` times per second and
    /// returns the reload value.
    ///
    /// # Errors
    ///
    /// See [`timer_reload`].
    pub fn timer_init(&self, freq: u64) -> HalResult<u64> {
        let timer = <B::Arch as Arch>::TIMER;
        let reload = timer_reload(&timer, freq)?;
        self.clock.reload.store(reload, Ordering::Release);
        self.timer_arm(timer.mode, reload);
        tracing::debug!(freq, reload, base_hz = timer.base_hz, "timer armed");
        Ok(reload)
    }

    /// Re-arms the timer after a tick. A no-op on periodic timers.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` before [`timer_init`](Self::timer_init).
    pub fn timer_reset(&self) -> HalResult<()> {
        let reload = self.clock.reload().ok_or(HalError::InvalidArgument)?;
        let mode = <B::Arch as Arch>::TIMER.mode;
        if mode == TimerMode::OneShot {
            self.timer_arm(mode, reload);
        }
        Ok(())
    }

    fn timer_arm(&self, mode: TimerMode, reload: u64) {
        let value = match mode {
            TimerMode::Periodic => reload,
            TimerMode::OneShot => self.clock_read().wrapping_add(reload),
        };
        self.backend().timer_program(value);
    }

    /// Programmed reload value, or `None` before `timer_init`.
    #[must_use]
    pub fn timer_reload(&self) -> Option<u64> {
        self.clock.reload()
    }

    /// Raw free-running counter.
    #[must_use]
    pub fn clock_read(&self) -> u64 {
        self.backend().clock_read()
    }

    /// Measures the cost of a clock read and stores it for
    /// [`clock_elapsed`](Self::clock_elapsed). Returns the measurement.
    pub fn clock_calibrate(&self) -> u64 {
        let mut overhead = u64::MAX;
        let mut last = self.clock_read();
        for _ in 0..CALIBRATION_SAMPLES {
            let now = self.clock_read();
            overhead = overhead.min(now.wrapping_sub(last));
            last = now;
        }
        self.clock.overhead.store(overhead, Ordering::Relaxed);
        tracing::debug!(overhead, "clock calibrated");
        overhead
    }

    /// Ticks between two reads, less the read overhead.
    #[must_use]
    pub fn clock_elapsed(&self, start: u64, end: u64) -> u64 {
        end.wrapping_sub(start).saturating_sub(self.clock.overhead())
    }
}
