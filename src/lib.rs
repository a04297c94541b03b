// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Power-state coordination for the i.MX6 TrustZone secure monitor.
//!
//! This crate is the CPU power-management core of the monitor runtime:
//! secondary-core bring-up, parking and state query over the SRC rendezvous
//! registers, deep-sleep suspend/resume with retained-memory checkpointing
//! and a post-wake integrity check, and terminal system reset/power-off
//! through the watchdog and the always-on power controller.
//!
//! The surrounding runtime owns SMC routing, boot, console and interrupt
//! bring-up; it hands this crate an [`platform::AddressTranslation`]
//! collaborator, routes each standardized power-management call to one
//! [`Psci`] method, and calls [`Psci::handle_core_boot`] from its warm boot
//! path.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod layout;
pub mod logger;
pub mod mmio;
pub mod monitor;
pub mod platform;
pub mod psci;
pub mod retained;
pub mod sysregs;

pub use monitor::EntryPoint;
pub use psci::{Psci, WakeCause};
