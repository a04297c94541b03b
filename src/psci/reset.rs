// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Terminal system reset and power-off.
//!
//! Neither operation has a recovery path. If the hardware fails to act, the
//! calling core spins in its wait loop forever; that failure mode is not
//! reported to anyone, matching the hardware's own no-recovery posture.

use crate::platform::{Platform, PlatformImpl};
use crate::{
    arch,
    layout::{self, SnvsLpcr, WdogWcr},
    mmio::DeviceBlock,
};
use log::info;

/// Resets the whole SoC through the watchdog. Never returns.
pub(crate) fn system_reset(platform: &PlatformImpl) -> ! {
    info!("system reset requested");

    // A reset request from the watchdog must not be masked out.
    platform.device(DeviceBlock::Src).modify32(
        layout::SRC_SCR,
        layout::SRC_SCR_MASK_WDOG_RST,
        layout::SRC_SCR_WDOG_NOT_MASKED,
    );

    // Arm the watchdog to drive the SoC reset line, then trigger it with the
    // two-value feed sequence.
    let wdog = platform.device(DeviceBlock::Wdog);
    wdog.write16(layout::WDOG_WCR, (WdogWcr::WDE | WdogWcr::WDT).bits());
    wdog.write16(layout::WDOG_WSR, layout::WDOG_FEED1);
    wdog.write16(layout::WDOG_WSR, layout::WDOG_FEED2);
    arch::dsb_sy();

    platform.terminal_spin()
}

/// Drops the board to battery-only power through the always-on controller.
/// Never returns.
pub(crate) fn system_off(platform: &PlatformImpl) -> ! {
    info!("system power-off requested");

    let snvs = platform.device(DeviceBlock::Snvs);
    // A pending glitch-detector event would veto the power-down request;
    // clear it first (write one to clear).
    snvs.write32(layout::SNVS_LPSR, layout::SNVS_LPSR_PGD);
    snvs.modify32(
        layout::SNVS_LPCR,
        0,
        (SnvsLpcr::DP_EN | SnvsLpcr::TOP).bits(),
    );
    arch::dsb_sy();

    platform.terminal_spin()
}
