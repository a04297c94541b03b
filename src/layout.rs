// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Physical memory map and register layouts for the i.MX6 SoC.
//!
//! Only the blocks touched by the power-state coordination core are described
//! here. The values are bit-exact per the i.MX6 reference manual; mapping a
//! block into the address space is the job of the runtime's memory-management
//! layer, reached through [`crate::platform::AddressTranslation`].

use bitflags::bitflags;

/// Snoop control unit.
pub const SCU_BASE: u32 = 0x00A0_0000;
/// PL310 outer cache controller.
pub const PL310_BASE: u32 = 0x00A0_2000;
/// On-chip RAM; retained through the deepest sleep state.
pub const OCRAM_BASE: u32 = 0x0090_0000;
/// Size of the OCRAM window reserved for resume state.
pub const OCRAM_RESERVED_SIZE: usize = 0x4000;
/// System reset controller.
pub const SRC_BASE: u32 = 0x020D_8000;
/// Clock controller module.
pub const CCM_BASE: u32 = 0x020C_4000;
/// Analog/PMU control block.
pub const ANATOP_BASE: u32 = 0x020C_8000;
/// General power controller.
pub const GPC_BASE: u32 = 0x020D_C000;
/// Secure non-volatile storage (always-on domain).
pub const SNVS_BASE: u32 = 0x020C_C000;
/// Watchdog 1.
pub const WDOG_BASE: u32 = 0x020B_C000;
/// Central security unit.
pub const CSU_BASE: u32 = 0x021C_0000;

/// Base of the non-secure shared-memory window covered by the resume
/// integrity check.
pub const NSEC_SHARED_BASE: u32 = 0x4FB0_0000;
/// Size of the non-secure shared-memory window.
pub const NSEC_SHARED_SIZE: usize = 0x0010_0000;

/// SRC control register.
pub const SRC_SCR: usize = 0x000;
/// First boot-argument register; one pair of GPRs per core.
pub const SRC_GPR1: usize = 0x020;

/// Offset of the pair of SRC GPRs used as the rendezvous slot of a core.
pub const fn src_gpr_pair(core_index: usize) -> usize {
    SRC_GPR1 + core_index * 8
}

/// Bit position of the core 1 reset-release bit in `SRC_SCR`; cores 2 and 3
/// follow at the next bit positions.
pub const SRC_SCR_CORE1_RST_SHIFT: u32 = 14;
/// Bit position of the core 1 enable bit in `SRC_SCR`.
pub const SRC_SCR_CORE1_ENABLE_SHIFT: u32 = 22;
/// Field masking warm-reset requests from the watchdog.
pub const SRC_SCR_MASK_WDOG_RST: u32 = 0x0000_0780;
/// `MASK_WDOG_RST` value that lets watchdog resets through.
pub const SRC_SCR_WDOG_NOT_MASKED: u32 = 0xA << 7;

/// CCM low-power control register.
pub const CCM_CLPCR: usize = 0x054;
/// CCM general purpose register.
pub const CCM_CGPR: usize = 0x064;

bitflags! {
    /// Fields of `CCM_CLPCR`.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct Clpcr: u32 {
        /// Gate the ARM clock while in a low-power mode.
        const ARM_CLK_DIS_ON_LPM = 1 << 5;
        /// Shut the on-chip oscillator down in stop mode.
        const SBYOS = 1 << 6;
        /// Request the standby voltage rail in stop mode.
        const VSTBY = 1 << 8;
        /// Bypass the MMDC channel 0 low-power handshake.
        const BYPASS_MMDC_CH0_LPM_HS = 1 << 19;
        /// Bypass the MMDC channel 1 low-power handshake.
        const BYPASS_MMDC_CH1_LPM_HS = 1 << 21;
    }
}

/// Low-power-mode field of `CCM_CLPCR`.
pub const CLPCR_LPM_MASK: u32 = 0x3;
/// `LPM` value: stay in run mode.
pub const CLPCR_LPM_RUN: u32 = 0x0;
/// `LPM` value: wait mode (clock gated, power on).
pub const CLPCR_LPM_WAIT: u32 = 0x1;
/// `LPM` value: stop mode (clocks and, when armed, power removed).
pub const CLPCR_LPM_STOP: u32 = 0x2;

bitflags! {
    /// Fields of `CCM_CGPR`.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct Cgpr: u32 {
        /// Reserved bit that must read back as one.
        const MUST_BE_ONE = 1 << 1;
        /// Keep the ARM platform memories clocked in a low-power mode.
        /// Cleared to allow the deep-sleep signal to reach them.
        const INT_MEM_CLK_LPM = 1 << 17;
    }
}

/// ANATOP MISC0 set-bits register.
pub const ANATOP_MISC0_SET: usize = 0x154;
/// ANATOP MISC0 clear-bits register.
pub const ANATOP_MISC0_CLR: usize = 0x158;
/// Configure the analog blocks for light-sleep while in stop mode.
pub const ANATOP_MISC0_STOP_MODE_CONFIG: u32 = 1 << 12;

/// First GPC wakeup interrupt mask register; one register per bank of 32
/// interrupts starting at interrupt 32.
pub const GPC_IMR1: usize = 0x008;
/// Number of GPC interrupt mask banks.
pub const GPC_IMR_COUNT: usize = 4;
/// GPC CPU power-gating controller control register.
pub const GPC_PGC_CPU_CTRL: usize = 0x2A0;
/// Power down the CPU domain at the next stop-mode request.
pub const GPC_PGC_CTRL_PCR: u32 = 1 << 0;

bitflags! {
    /// Fields of the SNVS low-power control register (`LPCR`).
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct SnvsLpcr: u32 {
        /// "Dumb PMIC enabled": the external power manager follows the
        /// `PMIC_ON_REQ` signal without a handshake.
        const DP_EN = 1 << 5;
        /// Turn off the system power rail.
        const TOP = 1 << 6;
    }
}

/// SNVS low-power control register.
pub const SNVS_LPCR: usize = 0x038;
/// SNVS low-power status register.
pub const SNVS_LPSR: usize = 0x04C;
/// Power-glitch-detector status bit in `SNVS_LPSR`; write one to clear.
pub const SNVS_LPSR_PGD: u32 = 1 << 3;

/// Watchdog control register (16 bit).
pub const WDOG_WCR: usize = 0x000;
/// Watchdog service register (16 bit).
pub const WDOG_WSR: usize = 0x002;

bitflags! {
    /// Fields of the watchdog control register.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct WdogWcr: u16 {
        /// Watchdog enable.
        const WDE = 1 << 2;
        /// Assert `WDOG_B` (the SoC reset line) on timeout.
        const WDT = 1 << 3;
        /// Software reset signal; active low.
        const SRS = 1 << 4;
        /// Assert `WDOG_B` immediately; active low.
        const WDA = 1 << 5;
    }
}

/// First value of the two-value watchdog feed sequence.
pub const WDOG_FEED1: u16 = 0x5555;
/// Second value of the two-value watchdog feed sequence.
pub const WDOG_FEED2: u16 = 0xAAAA;

/// SCU control register.
pub const SCU_CTRL: usize = 0x000;
/// SCU per-core power status register; one byte per core, non-zero while the
/// core sits in a wait-for-event/interrupt low-power state.
pub const SCU_CPU_POWER_STATUS: usize = 0x008;

/// Returns the `SCU_CPU_POWER_STATUS` mask covering one core's status byte.
pub const fn scu_status_mask(core_index: usize) -> u32 {
    0x3 << (core_index * 8)
}

/// First CSU config/security-level register.
pub const CSU_CSL_START: usize = 0x000;
/// One past the last CSU config/security-level register.
pub const CSU_CSL_END: usize = 0x0A0;
/// Grant read and write access in every execution mode, for both peripherals
/// sharing one CSL register.
pub const CSU_ACCESS_ALL: u32 = 0x00FF_00FF;
/// Lock bits for both halves of a CSL register.
pub const CSU_SETTING_LOCK: u32 = 0x0100_0100;

/// PL310 cache sync register.
pub const PL310_CACHE_SYNC: usize = 0x730;
/// PL310 clean-line-by-PA register.
pub const PL310_CLEAN_PA: usize = 0x7B0;
/// PL310 invalidate-line-by-PA register.
pub const PL310_INV_PA: usize = 0x770;
/// Line size of the PL310 outer cache.
pub const PL310_LINE_SIZE: usize = 32;
