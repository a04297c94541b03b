// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The always-retained memory arena.
//!
//! A small window of on-chip RAM stays powered through the deepest sleep
//! state. The power core statically carves it into two slots: the resume stub
//! image at offset zero, and the resume context right after it. No dynamic
//! allocation; the offsets are fixed for the lifetime of the system.

use zerocopy::FromZeros;

/// Creates a zeroed instance of the given type.
///
/// This is equivalent to `FromZeros::new_zeroed()` but const.
pub const fn const_zeroed<T: FromZeros>() -> T {
    // SAFETY: T implements `FromZeros` so it must be safe to initialise with
    // zeros.
    unsafe { core::mem::zeroed() }
}

/// Largest resume stub image the arena accepts.
pub const STUB_SLOT_SIZE: usize = 0x100;

/// The window of always-retained memory handed to the power core.
#[derive(Clone, Copy, Debug)]
pub struct RetainedRegion {
    /// Currently-addressable base of the window.
    pub virt: usize,
    /// Physical base of the window, as seen by the reset vector with
    /// translation off.
    pub phys: u32,
    /// Size of the window in bytes.
    pub size: usize,
}

impl RetainedRegion {
    /// Address the stub image is copied to.
    pub fn stub_virt(&self) -> usize {
        self.virt
    }

    /// Physical address of the stub image; the warm reset vector jumps here.
    pub fn stub_phys(&self) -> u32 {
        self.phys
    }

    /// Address of the resume context slot.
    pub fn context_virt(&self) -> usize {
        self.virt + STUB_SLOT_SIZE
    }

    /// Physical address of the resume context slot; the stub finds the
    /// checkpoint discriminant through it.
    pub fn context_phys(&self) -> u32 {
        self.phys + STUB_SLOT_SIZE as u32
    }

    /// Size available for the resume context.
    pub fn context_capacity(&self) -> usize {
        self.size.saturating_sub(STUB_SLOT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_zeroed() {
        static TEST_ZEROED: [u8; 100] = const_zeroed();

        assert_eq!(TEST_ZEROED[0], 0);
        assert_eq!(TEST_ZEROED[99], 0);
    }

    #[test]
    fn arena_slots_do_not_overlap() {
        let region = RetainedRegion {
            virt: 0x1000,
            phys: 0x0090_0000,
            size: 0x4000,
        };
        assert!(region.stub_virt() + STUB_SLOT_SIZE <= region.context_virt());
        assert_eq!(region.context_phys() - region.stub_phys(), STUB_SLOT_SIZE as u32);
        assert_eq!(region.context_capacity(), 0x4000 - STUB_SLOT_SIZE);
    }
}
