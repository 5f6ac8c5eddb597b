// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Cluster configuration.
//!
//! What a backend is told about the machine it drives: how many cores,
//! which one boots the kernel, and the scheduling tick rate the master
//! programs during boot.

use nanvix_hal_abi::{CoreId, HalError, HalResult, MAX_CORES};

use crate::arch::Arch;

/// Shape of a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Cores in the cluster, numbered `0..num_cores`.
    pub num_cores: usize,
    /// Core that runs `kmain`.
    pub master: CoreId,
    /// Scheduling tick rate in Hz.
    pub timer_frequency_hz: u64,
}

impl ClusterConfig {
    /// Four cores, core 0 as master, 100 Hz tick.
    pub const DEFAULT: Self = Self {
        num_cores: 4,
        master: CoreId::MASTER,
        timer_frequency_hz: 100,
    };

    /// Single core, for uniprocessor targets.
    pub const UNIPROCESSOR: Self = Self {
        num_cores: 1,
        master: CoreId::MASTER,
        timer_frequency_hz: 100,
    };

    /// Describes a cluster of `num_cores` with the default master and tick.
    #[must_use]
    pub const fn with_cores(num_cores: usize) -> Self {
        Self {
            num_cores,
            ..Self::DEFAULT
        }
    }

    /// Checks the configuration against what architecture `A` supports.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty cluster, more cores than `A` or the
    /// pending-set width allows, a master outside the cluster, or a zero
    /// tick rate.
    pub fn validate<A: Arch>(&self) -> HalResult<()> {
        if self.num_cores == 0 || self.num_cores > A::MAX_CORES || self.num_cores > MAX_CORES {
            return Err(HalError::InvalidArgument);
        }
        if self.master.as_usize() >= self.num_cores {
            return Err(HalError::InvalidArgument);
        }
        if self.timer_frequency_hz == 0 {
            return Err(HalError::InvalidArgument);
        }
        Ok(())
    }

    /// Core id for `index`, if that core belongs to this cluster.
    #[must_use]
    pub fn core(&self, index: usize) -> Option<CoreId> {
        if index < self.num_cores {
            CoreId::from_index(index)
        } else {
            None
        }
    }

    /// Every core id in the cluster, ascending.
    pub fn cores(&self) -> impl Iterator<Item = CoreId> {
        (0..self.num_cores).filter_map(CoreId::from_index)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
