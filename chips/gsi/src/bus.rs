// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Access to the GSI register window.

use core::ptr;

/// A 32-bit register window addressed by byte offset.
pub trait RegisterBus {
    fn read32(&self, offset: u32) -> u32;
    fn write32(&self, offset: u32, value: u32);
}

/// Memory mapped GSI register window.
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must be the address of a mapped GSI register block, valid for
    /// volatile 32-bit accesses over the whole register map, and nothing else
    /// may alias it for the lifetime of the bus.
    pub const unsafe fn new(base: usize) -> MmioBus {
        MmioBus { base }
    }
}

impl RegisterBus for MmioBus {
    fn read32(&self, offset: u32) -> u32 {
        // Safety: the constructor guarantees the window is mapped.
        unsafe { ptr::read_volatile((self.base + offset as usize) as *const u32) }
    }

    fn write32(&self, offset: u32, value: u32) {
        // Safety: the constructor guarantees the window is mapped.
        unsafe { ptr::write_volatile((self.base + offset as usize) as *mut u32, value) }
    }
}
