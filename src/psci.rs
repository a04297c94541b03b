// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The power-state coordination service.
//!
//! One typed operation per standardized power-management function. The
//! monitor's SMC router owns the function-identifier parsing and calls in
//! here; this module never sees raw call numbers. Operations that park,
//! reset or power off do not return; the router must treat them as terminal.

mod lifecycle;
mod reset;
pub(crate) mod suspend;

use crate::monitor::{self, CoresImpl, EntryPoint};
use crate::platform::{Platform, PlatformImpl};
use arm_psci::{AffinityInfo, ErrorCode, FunctionId, MigrateInfoType, PowerState, PsciFeature, Version};
use lifecycle::{CoreState, CoreStates, LifecycleState};
use log::info;
use percore::Cores;
use spin::mutex::SpinMutex;
use suspend::{SleepMode, SuspendManager};

/// Why a core entered the warm boot path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WakeCause {
    /// First execution after a bring-up, with the requested entry point.
    BringUp(EntryPoint),
    /// Deep sleep completed; execution continues where suspend was called
    /// from the non-secure world's point of view.
    Resume(EntryPoint),
}

/// The power-state coordination service.
pub struct Psci {
    platform: PlatformImpl,
    cores: CoreStates,
    suspend: SuspendManager,
}

impl Psci {
    /// Initialises the service on the booting core.
    ///
    /// This should be called exactly once, before any other method and
    /// before any secondary core is started.
    pub fn new(platform: PlatformImpl) -> Self {
        info!("initialising power-state coordination");
        let psci = Self {
            platform,
            cores: [const {
                SpinMutex::new(CoreState {
                    state: LifecycleState::Off,
                })
            }; PlatformImpl::CORE_COUNT],
            suspend: SuspendManager::new(),
        };
        psci.cores[CoresImpl::core_index()].lock().state = LifecycleState::On;
        psci
    }

    /// Reports the implemented version of the coordination interface.
    pub fn version(&self) -> Version {
        Version { major: 1, minor: 0 }
    }

    /// Brings the given secondary core up towards the given non-secure entry
    /// point. Asynchronous: success means the core was released, not that it
    /// is running yet.
    pub fn cpu_on(&self, core_index: usize, entry: EntryPoint) -> Result<(), ErrorCode> {
        lifecycle::bring_up(&self.platform, &self.cores, core_index, entry)
    }

    /// Parks the calling core. Never returns.
    pub fn cpu_off(&self) -> ! {
        lifecycle::park(&self.platform, &self.cores)
    }

    /// Reports the lifecycle state of the given core, completing the
    /// teardown of a parking core on the way.
    pub fn affinity_info(&self, core_index: usize) -> Result<AffinityInfo, ErrorCode> {
        lifecycle::query(&self.platform, &self.cores, core_index)
    }

    /// Suspends at the requested depth.
    ///
    /// Standby depths return after the next interrupt. The power-down depth
    /// quiesces the whole SoC and exits through the resume stub; it requires
    /// every other core to have parked already, and reports success even
    /// when a racing wake aborts the sleep before the power cycle.
    pub fn cpu_suspend(&self, power_state: PowerState, entry: EntryPoint) -> Result<(), ErrorCode> {
        match SleepMode::try_from_power_state(power_state).ok_or(ErrorCode::InvalidParameters)? {
            SleepMode::Standby => {
                self.suspend.standby(&self.platform);
                Ok(())
            }
            SleepMode::DeepSleep => {
                let this_core = CoresImpl::core_index();
                for core_index in 0..PlatformImpl::CORE_COUNT {
                    if core_index == this_core {
                        continue;
                    }
                    let parked = self.cores[core_index].lock().state == LifecycleState::Off
                        || lifecycle::is_parked(&self.platform, core_index);
                    if !parked {
                        return Err(ErrorCode::Denied);
                    }
                }
                self.suspend.enter_deep_sleep(&self.platform, entry)
            }
        }
    }

    /// Resets the whole system. Never returns.
    pub fn system_reset(&self) -> ! {
        reset::system_reset(&self.platform)
    }

    /// Powers the system off. Never returns.
    pub fn system_off(&self) -> ! {
        reset::system_off(&self.platform)
    }

    /// There are no migratable trusted-OS contexts on this monitor.
    pub fn migrate_info_type(&self) -> MigrateInfoType {
        MigrateInfoType::MigrationNotRequired
    }

    /// The capability query: reports which functions this implementation
    /// provides. Everything else, including all SMC64 variants on this
    /// 32-bit part, is not supported.
    pub fn features(&self, feature: PsciFeature) -> Result<u32, ErrorCode> {
        const SUCCESS: u32 = 0;

        match feature {
            PsciFeature::PsciFunction(function_id) => match function_id {
                FunctionId::PsciVersion
                | FunctionId::CpuOff
                | FunctionId::CpuOn32
                | FunctionId::AffinityInfo32
                | FunctionId::SystemOff
                | FunctionId::SystemReset
                | FunctionId::MigrateInfoType
                | FunctionId::PsciFeatures => Ok(SUCCESS),
                // Original power-state format, no extended states.
                FunctionId::CpuSuspend32 => Ok(SUCCESS),
                _ => Err(ErrorCode::NotSupported),
            },
            PsciFeature::SmcccVersion => Ok(SUCCESS),
        }
    }

    /// The warm boot hook, called by the runtime whenever a core is powered
    /// up. Distinguishes a bring-up from a deep-sleep resume, finishes the
    /// corresponding path and programs the monitor context for the return to
    /// the non-secure world.
    pub fn handle_core_boot(&self) -> WakeCause {
        if self.suspend.resuming() {
            let entry = self.suspend.finish_resume(&self.platform);
            monitor::prepare_nonsecure_return(entry);
            WakeCause::Resume(entry)
        } else {
            let entry = lifecycle::finish_bring_up(&self.platform, &self.cores);
            monitor::prepare_nonsecure_return(entry);
            WakeCause::BringUp(entry)
        }
    }
}
