// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Bookkeeping for a GSI transfer or event ring.
//!
//! A ring is a physically contiguous array of fixed size elements. Both
//! pointers are device addresses inside `[base, base + len)` and move
//! forward one element at a time, wrapping at the end. As with any ring
//! where `rp == wp` means empty, one element is always left unused.

use core::cell::Cell;

use crate::error::GsiError;
use crate::regmap::GsiVersion;

pub struct Ring {
    base: u64,
    len: u32,
    elem_size: u32,
    rp: Cell<u64>,
    wp: Cell<u64>,
}

impl Ring {
    /// The hardware version limits are checked when the ring is handed to
    /// a channel or event ring.
    pub fn new(base: u64, len: u32, elem_size: u32) -> Result<Ring, GsiError> {
        if elem_size == 0 || len & !GsiVersion::V3_0.ring_length_mask() != 0 {
            return Err(GsiError::InvalidRingLength);
        }
        if len % elem_size != 0 || len / elem_size < 2 {
            return Err(GsiError::InvalidRingLength);
        }
        if base % u64::from(elem_size) != 0 || base.checked_add(u64::from(len)).is_none() {
            return Err(GsiError::InvalidPointer);
        }
        Ok(Ring {
            base,
            len,
            elem_size,
            rp: Cell::new(base),
            wp: Cell::new(base),
        })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Length of the ring in bytes.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn elem_size(&self) -> u32 {
        self.elem_size
    }

    pub fn num_elements(&self) -> u32 {
        self.len / self.elem_size
    }

    pub fn rp(&self) -> u64 {
        self.rp.get()
    }

    pub fn wp(&self) -> u64 {
        self.wp.get()
    }

    /// Index of the element `ptr` points at, `None` if `ptr` is outside
    /// the ring.
    pub fn index_of(&self, ptr: u64) -> Option<u32> {
        let offset = ptr.checked_sub(self.base)?;
        if offset >= u64::from(self.len) {
            return None;
        }
        Some((offset / u64::from(self.elem_size)) as u32)
    }

    fn advance(&self, ptr: u64, elements: u32) -> u64 {
        let offset = (ptr - self.base) + u64::from(elements) * u64::from(self.elem_size);
        self.base + offset % u64::from(self.len)
    }

    pub fn used_slots(&self) -> u32 {
        let rp = self.rp.get() - self.base;
        let wp = self.wp.get() - self.base;
        let used = (wp + u64::from(self.len) - rp) % u64::from(self.len);
        (used / u64::from(self.elem_size)) as u32
    }

    pub fn free_slots(&self) -> u32 {
        self.num_elements() - 1 - self.used_slots()
    }

    pub fn is_empty(&self) -> bool {
        self.rp.get() == self.wp.get()
    }

    /// Claim `elements` slots past the write pointer and return the new
    /// write pointer, which is the value to ring the doorbell with.
    pub fn advance_wp(&self, elements: u32) -> Result<u64, GsiError> {
        if elements > self.free_slots() {
            return Err(GsiError::RingFull);
        }
        let wp = self.advance(self.wp.get(), elements);
        self.wp.set(wp);
        Ok(wp)
    }

    /// Record how far the hardware has consumed the ring. Returns the number
    /// of elements completed since the previous update.
    pub fn update_rp(&self, rp: u64) -> Result<u32, GsiError> {
        let new = match rp.checked_sub(self.base) {
            Some(new) if new < u64::from(self.len) && new % u64::from(self.elem_size) == 0 => new,
            _ => return Err(GsiError::InvalidPointer),
        };
        let old = self.rp.get() - self.base;
        let done = (new + u64::from(self.len) - old) % u64::from(self.len);
        if done / u64::from(self.elem_size) > u64::from(self.used_slots()) {
            return Err(GsiError::InvalidPointer);
        }
        self.rp.set(rp);
        Ok((done / u64::from(self.elem_size)) as u32)
    }

    pub fn reset(&self) {
        self.rp.set(self.base);
        self.wp.set(self.base);
    }
}
