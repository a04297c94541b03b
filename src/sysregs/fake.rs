// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Fake CP15 register values for unit tests and non-ARM builds.

use spin::mutex::SpinMutex;

/// Values of the fake CP15 registers.
pub static SYSREGS: SpinMutex<SystemRegisters> = SpinMutex::new(SystemRegisters::new());

/// A set of fake CP15 registers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemRegisters {
    /// Main ID register.
    pub midr: u32,
    /// Multiprocessor affinity register.
    pub mpidr: u32,
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

impl SystemRegisters {
    const fn new() -> Self {
        Self {
            midr: 0,
            mpidr: 0,
            sctlr: 0,
            actlr: 0,
            cpacr: 0,
            ttbr0: 0,
            ttbr1: 0,
            ttbcr: 0,
            dacr: 0,
            prrr: 0,
            nmrr: 0,
            vbar: 0,
            mvbar: 0,
            contextidr: 0,
            tpidrprw: 0,
        }
    }

    /// Resets all fake registers to their initial zero values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
