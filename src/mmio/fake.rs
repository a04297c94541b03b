// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Fake device memory for unit tests.
//!
//! Backs [`super::RegisterBank`] with a sparse register file and an ordered
//! access log, so tests can assert both final register values and the exact
//! order of writes, cache maintenance and reads.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// One recorded access to the fake device memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Access {
    /// 32-bit register read.
    Read32 {
        /// Absolute address of the register.
        addr: usize,
    },
    /// 32-bit register write.
    Write32 {
        /// Absolute address of the register.
        addr: usize,
        /// Value written.
        value: u32,
    },
    /// 16-bit register write.
    Write16 {
        /// Absolute address of the register.
        addr: usize,
        /// Value written.
        value: u16,
    },
    /// Data cache clean (write-back) over a range.
    Clean {
        /// Start of the range.
        base: usize,
        /// Length of the range.
        len: usize,
    },
    /// Data cache invalidate over a range.
    Invalidate {
        /// Start of the range.
        base: usize,
        /// Length of the range.
        len: usize,
    },
}

#[derive(Default)]
struct State {
    words: BTreeMap<usize, u32>,
    half_words: BTreeMap<usize, u16>,
    log: Vec<Access>,
}

/// A fake device register file shared by all banks of one test platform.
#[derive(Default)]
pub struct FakeDeviceMemory {
    state: Mutex<State>,
}

impl FakeDeviceMemory {
    /// Creates a fake device memory with a `'static` lifetime, as required by
    /// [`super::RegisterBank`]. Leaks; for tests only.
    pub fn leak_new() -> &'static Self {
        Box::leak(Box::default())
    }

    pub(super) fn read32(&self, addr: usize) -> u32 {
        let mut state = self.state.lock().unwrap();
        state.log.push(Access::Read32 { addr });
        state.words.get(&addr).copied().unwrap_or(0)
    }

    pub(super) fn write32(&self, addr: usize, value: u32) {
        let mut state = self.state.lock().unwrap();
        state.log.push(Access::Write32 { addr, value });
        state.words.insert(addr, value);
    }

    pub(super) fn read16(&self, addr: usize) -> u16 {
        self.state
            .lock()
            .unwrap()
            .half_words
            .get(&addr)
            .copied()
            .unwrap_or(0)
    }

    pub(super) fn write16(&self, addr: usize, value: u16) {
        let mut state = self.state.lock().unwrap();
        state.log.push(Access::Write16 { addr, value });
        state.half_words.insert(addr, value);
    }

    /// Records an access that did not go through a register bank, such as a
    /// cache maintenance operation performed by the platform.
    pub fn record(&self, access: Access) {
        self.state.lock().unwrap().log.push(access);
    }

    /// Sets a register value without recording the access; for test setup.
    pub fn preset32(&self, addr: usize, value: u32) {
        self.state.lock().unwrap().words.insert(addr, value);
    }

    /// Reads a register value without recording the access; for assertions.
    pub fn peek32(&self, addr: usize) -> u32 {
        self.state.lock().unwrap().words.get(&addr).copied().unwrap_or(0)
    }

    /// Reads a 16-bit register value without recording the access.
    pub fn peek16(&self, addr: usize) -> u16 {
        self.state
            .lock()
            .unwrap()
            .half_words
            .get(&addr)
            .copied()
            .unwrap_or(0)
    }

    /// Returns a copy of the access log.
    pub fn log(&self) -> Vec<Access> {
        self.state.lock().unwrap().log.clone()
    }

    /// Clears the access log, keeping register values.
    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }
}
