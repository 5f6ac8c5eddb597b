// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bare-metal `AArch64` backend.
//!
//! Targets the QEMU `virt` machine at EL1: GICv2 for interrupts and SGIs,
//! the generic timer's virtual counter for the clock, a PL011 UART for the
//! console and PSCI over HVC for power management.
//!
//! The exception vectors enter the HAL through [`Hal::handle_irq`] and
//! [`Hal::handle_sync`]. An IRQ is claimed by reading `GICC_IAR` in
//! [`CoreBackend::irq_next`] and completed by writing the claimed value
//! back to `GICC_EOIR` when the HAL acknowledges it.

use core::arch::{asm, global_asm};
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{AtomicU32, Ordering};

use nanvix_hal_abi::{CoreId, HalResult, InterruptNum, MAX_CORES, Vaddr};

use crate::arch::arm64::{Arm64Context, esr_class};
use crate::arch::{Arch, Arm64, irq_bit};
use crate::backend::CoreBackend;
use crate::config::ClusterConfig;
use crate::hal::Hal;

/// GIC distributor on QEMU `virt`.
pub const QEMU_VIRT_GICD: usize = 0x0800_0000;
/// GIC CPU interface on QEMU `virt`.
pub const QEMU_VIRT_GICC: usize = 0x0801_0000;
/// PL011 UART on QEMU `virt`.
pub const QEMU_VIRT_UART: usize = 0x0900_0000;

const GICD_CTLR: usize = 0x000;
const GICD_ISENABLER: usize = 0x100;
const GICD_ICENABLER: usize = 0x180;
const GICD_SGIR: usize = 0xF00;
const GICC_CTLR: usize = 0x000;
const GICC_PMR: usize = 0x004;
const GICC_IAR: usize = 0x00C;
const GICC_EOIR: usize = 0x010;
/// INTID field of `GICC_IAR`; the bits above carry the SGI source core.
const GICC_IAR_INTID: u32 = 0x3FF;
/// INTIDs from here on mean nothing is pending.
const GICC_INTID_SPECIAL: u32 = 1020;
/// Claim slot value when nothing is claimed.
const UNCLAIMED: u32 = 1023;

const UARTDR: usize = 0x00;
const UARTFR: usize = 0x18;
const UARTFR_TXFF: u32 = 1 << 5;

const PSCI_CPU_OFF: u64 = 0x8400_0002;
const PSCI_SYSTEM_OFF: u64 = 0x8400_0008;

/// `CNTV_CTL_EL0.ENABLE`.
const CNTV_ENABLE: u64 = 1;

// x0: save record, x1: restore record. Offsets follow `Arm64Context`:
// x19 at 152, sp (SP_EL0) at 248, elr at 256, spsr at 264, ksp at 288.
//
// The caller is saved as an EL1h context resuming at its return address
// with its own DAIF bits. The restored context is entered through `eret`,
// so a freshly forged one starts at EL0 on its user stack while its
// kernel stack becomes SP_EL1 for the next trap.
global_asm!(
    ".global nanvix_hal_switch_context",
    "nanvix_hal_switch_context:",
    "mrs x10, daif",
    "msr daifset, #0xf",
    "stp x19, x20, [x0, #152]",
    "stp x21, x22, [x0, #168]",
    "stp x23, x24, [x0, #184]",
    "stp x25, x26, [x0, #200]",
    "stp x27, x28, [x0, #216]",
    "stp x29, x30, [x0, #232]",
    "mrs x9, sp_el0",
    "str x9, [x0, #248]",
    "str x30, [x0, #256]",
    "mov x11, #5",
    "orr x10, x10, x11",
    "str x10, [x0, #264]",
    "mov x9, sp",
    "str x9, [x0, #288]",
    "ldp x19, x20, [x1, #152]",
    "ldp x21, x22, [x1, #168]",
    "ldp x23, x24, [x1, #184]",
    "ldp x25, x26, [x1, #200]",
    "ldp x27, x28, [x1, #216]",
    "ldp x29, x30, [x1, #232]",
    "ldr x9, [x1, #248]",
    "msr sp_el0, x9",
    "ldr x9, [x1, #256]",
    "msr elr_el1, x9",
    "ldr x9, [x1, #264]",
    "msr spsr_el1, x9",
    "ldr x9, [x1, #288]",
    "mov sp, x9",
    "ldr x0, [x1, #0]",
    "eret",
);

unsafe extern "C" {
    fn nanvix_hal_switch_context(save: *mut Arm64Context, restore: *const Arm64Context);
}

/// Machine access for a QEMU `virt` cluster.
pub struct Aarch64Backend {
    config: ClusterConfig,
    gicd: usize,
    gicc: usize,
    uart: usize,
    claimed: [AtomicU32; MAX_CORES],
}

impl Aarch64Backend {
    /// Creates a backend driving the devices at the given bases.
    ///
    /// # Safety
    ///
    /// The bases must be mapped device memory of a GICv2 distributor, a
    /// GICv2 CPU interface and a PL011, not used by anything else.
    #[must_use]
    pub const unsafe fn new(config: ClusterConfig, gicd: usize, gicc: usize, uart: usize) -> Self {
        Self {
            config,
            gicd,
            gicc,
            uart,
            claimed: [const { AtomicU32::new(UNCLAIMED) }; MAX_CORES],
        }
    }

    fn claim_slot(&self) -> &AtomicU32 {
        &self.claimed[self.core_id().as_usize()]
    }

    fn write32(base: usize, offset: usize, value: u32) {
        // SAFETY: the bases are device memory per `new`'s contract.
        unsafe { write_volatile((base + offset) as *mut u32, value) }
    }

    fn read32(base: usize, offset: usize) -> u32 {
        // SAFETY: as in `write32`.
        unsafe { read_volatile((base + offset) as *const u32) }
    }

    /// Bank register and bit for interrupt `num`.
    const fn bank(num: InterruptNum) -> (usize, u32) {
        let n = num.as_usize();
        ((n / 32) * 4, 1 << (n % 32))
    }

    fn psci_call(function: u64) -> i64 {
        let result: i64;
        // SAFETY: PSCI calls do not touch memory visible to Rust.
        unsafe {
            asm!(
                "hvc #0",
                inout("x0") function => result,
                options(nomem, nostack)
            );
        }
        result
    }

    fn park() -> ! {
        loop {
            // SAFETY: waiting for an interrupt has no memory effects.
            unsafe { asm!("msr daifset, #2", "wfi", options(nomem, nostack)) };
        }
    }
}

impl CoreBackend for Aarch64Backend {
    type Arch = Arm64;

    fn config(&self) -> &ClusterConfig {
        &self.config
    }

    fn core_id(&self) -> CoreId {
        let mpidr: u64;
        // SAFETY: reading MPIDR_EL1 has no side effects.
        unsafe { asm!("mrs {}, mpidr_el1", out(reg) mpidr, options(nomem, nostack)) };
        CoreId::from_index((mpidr & 0xFF) as usize).unwrap_or(self.config.master)
    }

    fn core_setup(&self) -> HalResult<()> {
        Self::write32(self.gicc, GICC_PMR, 0xFF);
        Self::write32(self.gicc, GICC_CTLR, 1);
        Ok(())
    }

    /// BSS is cleared by the entry stub before any Rust code runs.
    fn memory_setup(&self) -> HalResult<()> {
        Ok(())
    }

    fn irq_controller_setup(&self) -> HalResult<()> {
        Self::write32(self.gicd, GICD_CTLR, 0);
        for bank in 0..Arm64::NUM_INTERRUPTS / 32 {
            Self::write32(self.gicd, GICD_ICENABLER + bank * 4, u32::MAX);
        }
        Self::write32(self.gicd, GICD_CTLR, 1);
        Ok(())
    }

    fn irq_enable(&self) {
        // SAFETY: unmasks IRQs on this core only.
        unsafe { asm!("msr daifclr, #2", options(nomem, nostack)) };
    }

    fn irq_disable(&self) {
        // SAFETY: masks IRQs on this core only.
        unsafe { asm!("msr daifset, #2", options(nomem, nostack)) };
    }

    fn irq_mask(&self, num: InterruptNum) {
        let (offset, bit) = Self::bank(num);
        Self::write32(self.gicd, GICD_ICENABLER + offset, bit);
    }

    fn irq_unmask(&self, num: InterruptNum) {
        let (offset, bit) = Self::bank(num);
        Self::write32(self.gicd, GICD_ISENABLER + offset, bit);
    }

    /// Completes the claim for `num`, source core bits included.
    fn irq_ack(&self, num: InterruptNum) {
        let iar = self.claim_slot().swap(UNCLAIMED, Ordering::AcqRel);
        let value = if iar & GICC_IAR_INTID == u32::from(num.as_u16()) {
            iar
        } else {
            u32::from(num.as_u16())
        };
        Self::write32(self.gicc, GICC_EOIR, value);
    }

    /// Claims the highest-priority pending source. A claimed source outside
    /// `deliverable` is completed and dropped.
    fn irq_next(&self, deliverable: u64) -> Option<InterruptNum> {
        let iar = Self::read32(self.gicc, GICC_IAR);
        let intid = iar & GICC_IAR_INTID;
        if intid >= GICC_INTID_SPECIAL {
            return None;
        }
        // Below 1020, so it fits.
        let num = InterruptNum::new(intid as u16);
        if intid as usize >= Arm64::NUM_INTERRUPTS || deliverable & irq_bit(num) == 0 {
            Self::write32(self.gicc, GICC_EOIR, iar);
            return None;
        }
        self.claim_slot().store(iar, Ordering::Release);
        Some(num)
    }

    fn ipi_send(&self, target: CoreId) {
        let sgi = Arm64::INTERRUPT_IPI.map_or(0, |num| u32::from(num.as_u16()));
        Self::write32(self.gicd, GICD_SGIR, (1 << (16 + target.as_u16())) | sgi);
        // SAFETY: SEV only signals an event.
        unsafe { asm!("sev", options(nomem, nostack)) };
    }

    /// SGIs are completed through `irq_ack`.
    fn ipi_ack(&self) {}

    fn wait_for_event(&self) {
        // SAFETY: WFE only suspends until the next event.
        unsafe { asm!("wfe", options(nomem, nostack)) };
    }

    fn wake_all(&self) {
        // SAFETY: SEV only signals an event.
        unsafe { asm!("sev", options(nomem, nostack)) };
    }

    fn clock_read(&self) -> u64 {
        let ticks: u64;
        // SAFETY: reading the virtual counter has no side effects.
        unsafe { asm!("isb", "mrs {}, cntvct_el0", out(reg) ticks, options(nomem, nostack)) };
        ticks
    }

    fn timer_program(&self, value: u64) {
        // SAFETY: programs this core's virtual timer only.
        unsafe {
            asm!(
                "msr cntv_cval_el0, {value}",
                "msr cntv_ctl_el0, {enable}",
                value = in(reg) value,
                enable = in(reg) CNTV_ENABLE,
                options(nomem, nostack)
            );
        }
    }

    unsafe fn switch_context(&self, save: &mut Arm64Context, restore: &Arm64Context) {
        // SAFETY: forwarded from the caller.
        unsafe { nanvix_hal_switch_context(save, restore) }
    }

    fn stdout_init(&self) {}

    fn stdout_write(&self, bytes: &[u8]) {
        for &byte in bytes {
            while Self::read32(self.uart, UARTFR) & UARTFR_TXFF != 0 {
                core::hint::spin_loop();
            }
            Self::write32(self.uart, UARTDR, u32::from(byte));
        }
    }

    fn halt(&self) -> ! {
        Self::park()
    }

    /// Slaves turn themselves off; the master turns off the system.
    fn poweroff(&self) -> ! {
        let function = if self.core_id() == self.config.master {
            PSCI_SYSTEM_OFF
        } else {
            PSCI_CPU_OFF
        };
        let _ = Self::psci_call(function);
        Self::park()
    }
}

impl Hal<Aarch64Backend> {
    /// IRQ vector entry: dispatches every source the CPU interface has
    /// pending for the calling core.
    pub fn handle_irq(&self) {
        while let Some(num) = self.interrupt_next() {
            self.dispatch_interrupt(num);
        }
    }

    /// Synchronous exception vector entry for the trap frame `ctx`.
    pub fn handle_sync(&self, ctx: &mut Arm64Context) {
        let Some(num) = esr_class(ctx.esr) else {
            let class = ctx.esr >> 26;
            self.fatal(&format_args!("unknown exception class {class:#x}"), Some(ctx));
        };
        self.dispatch_exception(num, Vaddr::new(ctx.far), ctx);
    }
}
