// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! A register bus backed by memory that models the command engine.
//!
//! Writing a channel or event ring command updates the `CHSTATE` field of
//! the addressed context the way the hardware would, unless the bus is told
//! to ignore commands or to report a fixed state.

extern crate std;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::bus::RegisterBus;

const EE_STRIDE: u32 = 0x12000;
const CH_STRIDE: u32 = 0x80;
const CH_CMD: u32 = 0x25008;
const EV_CH_CMD: u32 = 0x25010;
const CH_CNTXT_0: u32 = 0x14000;
const EV_CNTXT_0: u32 = 0x1c000;
const CHSTATE_SHIFT: u32 = 20;
const CHSTATE_MASK: u32 = 0xf << CHSTATE_SHIFT;

pub struct FakeBus {
    regs: RefCell<BTreeMap<u32, u32>>,
    writes: RefCell<Vec<(u32, u32)>>,
    ignore_commands: Cell<bool>,
    forced_state: Cell<Option<u32>>,
    /// Number of polls a STOP reports STOP_IN_PROC before completing.
    stop_delay: Cell<u32>,
}

impl FakeBus {
    pub fn new() -> FakeBus {
        FakeBus {
            regs: RefCell::new(BTreeMap::new()),
            writes: RefCell::new(Vec::new()),
            ignore_commands: Cell::new(false),
            forced_state: Cell::new(None),
            stop_delay: Cell::new(0),
        }
    }

    pub fn peek(&self, offset: u32) -> u32 {
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn poke(&self, offset: u32, value: u32) {
        self.regs.borrow_mut().insert(offset, value);
    }

    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    pub fn ignore_commands(&self, ignore: bool) {
        self.ignore_commands.set(ignore);
    }

    pub fn force_state(&self, state: Option<u32>) {
        self.forced_state.set(state);
    }

    pub fn delay_stop(&self, polls: u32) {
        self.stop_delay.set(polls);
    }

    fn set_state(&self, cntxt: u32, state: u32) {
        let old = self.peek(cntxt);
        self.poke(cntxt, (old & !CHSTATE_MASK) | (state << CHSTATE_SHIFT));
    }

    fn command(&self, ee: u32, value: u32, ch_cmd: bool) {
        if self.ignore_commands.get() {
            return;
        }
        let chid = value & 0xff;
        let opcode = value >> 24;
        let base = if ch_cmd { CH_CNTXT_0 } else { EV_CNTXT_0 };
        let cntxt = base + ee * EE_STRIDE + chid * CH_STRIDE;

        let state = match self.forced_state.get() {
            Some(state) => state,
            None => match opcode {
                0x0 => 1,
                0x1 => 2,
                0x2 if self.stop_delay.get() > 0 => 4,
                0x2 => 3,
                0x9 => 1,
                0xa => 0,
                _ => return,
            },
        };
        self.set_state(cntxt, state);
    }

    fn is_context_0(offset: u32) -> bool {
        let in_block = |base: u32| {
            offset >= base
                && (offset - base) % EE_STRIDE < 0x4000
                && (offset - base) % CH_STRIDE == 0
        };
        offset < 0x24000 + 4 * EE_STRIDE && (in_block(CH_CNTXT_0) || in_block(EV_CNTXT_0))
    }

    fn is_at(offset: u32, base: u32) -> bool {
        offset >= base && (offset - base) % EE_STRIDE == 0
    }
}

impl RegisterBus for FakeBus {
    fn read32(&self, offset: u32) -> u32 {
        let value = self.peek(offset);
        if Self::is_context_0(offset) && (value & CHSTATE_MASK) >> CHSTATE_SHIFT == 4 {
            let delay = self.stop_delay.get();
            if delay > 0 {
                self.stop_delay.set(delay - 1);
            } else {
                self.set_state(offset, 3);
            }
        }
        value
    }

    fn write32(&self, offset: u32, value: u32) {
        self.writes.borrow_mut().push((offset, value));

        if Self::is_at(offset, CH_CMD) {
            self.command((offset - CH_CMD) / EE_STRIDE, value, true);
        } else if Self::is_at(offset, EV_CH_CMD) {
            self.command((offset - EV_CH_CMD) / EE_STRIDE, value, false);
        } else if Self::is_context_0(offset) {
            // CHSTATE is read-only.
            let old = self.peek(offset);
            self.poke(offset, (value & !CHSTATE_MASK) | (old & CHSTATE_MASK));
        } else {
            self.poke(offset, value);
        }
    }
}
