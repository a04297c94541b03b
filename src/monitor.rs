// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The saved monitor-mode state used when crossing between the secure and
//! non-secure privilege domains.
//!
//! The monitor's exception-return path reads [`MonitorContext`] to decide
//! where the non-secure world continues: `mon_lr` becomes the return address,
//! `mon_spsr` the restored program status. The power core programs these at
//! the end of cold boot, secondary bring-up and suspend resume.

use crate::platform::{Platform, PlatformImpl, exception_free};
use crate::sysregs::{self, Cpsr};
use core::cell::{RefCell, RefMut};
use percore::{Cores, ExceptionFree, ExceptionLock, PerCore};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Per-core mutable state.
pub type PerCoreState<T> =
    PerCore<[ExceptionLock<RefCell<T>>; PlatformImpl::CORE_COUNT], CoresImpl>;

/// Implementation of the `Cores` trait to get the index of the current CPU
/// core.
pub struct CoresImpl;

// SAFETY: This implementation never returns the same index for different
// cores because the affinity-0 field of MPIDR is unique per core on this
// part, and never exceeds CORE_COUNT - 1.
unsafe impl Cores for CoresImpl {
    fn core_index() -> usize {
        sysregs::core_index_from_mpidr(sysregs::read_mpidr())
    }
}

/// The point at which execution re-enters the non-secure world, with its
/// single boot argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EntryPoint {
    /// Physical address execution continues from.
    pub pc: u32,
    /// Opaque argument delivered in `r0`.
    pub context_id: u32,
}

/// Snapshot of the CP15 privileged register set, captured before deep sleep
/// and used to reconstruct addressing and control state on the way back up.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable,
)]
pub struct PrivilegedState {
    /// System control register.
    pub sctlr: u32,
    /// Auxiliary control register.
    pub actlr: u32,
    /// Coprocessor access control register.
    pub cpacr: u32,
    /// Translation table base register 0.
    pub ttbr0: u32,
    /// Translation table base register 1.
    pub ttbr1: u32,
    /// Translation table base control register.
    pub ttbcr: u32,
    /// Domain access control register.
    pub dacr: u32,
    /// Primary region remap register.
    pub prrr: u32,
    /// Normal memory remap register.
    pub nmrr: u32,
    /// Vector base address register.
    pub vbar: u32,
    /// Monitor vector base address register.
    pub mvbar: u32,
    /// Context ID register.
    pub contextidr: u32,
    /// Privileged-only thread ID register.
    pub tpidrprw: u32,
}

/// Reads the full privileged register set into a plain value.
pub fn save_privileged_state() -> PrivilegedState {
    PrivilegedState {
        sctlr: sysregs::read_sctlr(),
        actlr: sysregs::read_actlr(),
        cpacr: sysregs::read_cpacr(),
        ttbr0: sysregs::read_ttbr0(),
        ttbr1: sysregs::read_ttbr1(),
        ttbcr: sysregs::read_ttbcr(),
        dacr: sysregs::read_dacr(),
        prrr: sysregs::read_prrr(),
        nmrr: sysregs::read_nmrr(),
        vbar: sysregs::read_vbar(),
        mvbar: sysregs::read_mvbar(),
        contextidr: sysregs::read_contextidr(),
        tpidrprw: sysregs::read_tpidrprw(),
    }
}

/// The monitor-mode banked state restored by the exception return into the
/// non-secure world.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MonitorContext {
    /// Banked monitor link register; the non-secure return address.
    pub mon_lr: u32,
    /// Banked monitor saved program status; selects the non-secure mode and
    /// exception masks on return.
    pub mon_spsr: Cpsr,
    /// Value delivered in `r0` on return.
    pub r0: u32,
}

impl MonitorContext {
    const EMPTY: Self = Self {
        mon_lr: 0,
        mon_spsr: Cpsr::empty(),
        r0: 0,
    };
}

static MONITOR_STATE: PerCoreState<MonitorContext> = PerCore::new(
    [const { ExceptionLock::new(RefCell::new(MonitorContext::EMPTY)) }; PlatformImpl::CORE_COUNT],
);

/// Returns a reference to the monitor context of the current core.
///
/// Panics if the context is already borrowed.
pub fn monitor_state(token: ExceptionFree) -> RefMut<MonitorContext> {
    MONITOR_STATE.get().borrow_mut(token)
}

/// Arranges for the eventual exception return to the non-secure world to land
/// at `entry`, in supervisor mode with interrupts masked, with the argument in
/// `r0`.
pub fn prepare_nonsecure_return(entry: EntryPoint) {
    exception_free(|token| {
        let mut context = monitor_state(token);
        context.mon_lr = entry.pc;
        context.mon_spsr = Cpsr::M_SVC | Cpsr::I | Cpsr::F;
        context.r0 = entry.context_id;
    });
}
