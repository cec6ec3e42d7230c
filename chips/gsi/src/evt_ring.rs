// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! GSI event rings.
//!
//! Event rings carry completion events from the hardware back to software.
//! Their command set is smaller than the one of channels: an event ring is
//! either allocated or not.

use core::cell::Cell;

use tock_registers::fields::FieldValue;
use tracing::{debug, error, warn};

use crate::bus::RegisterBus;
use crate::channel::{wait_for_state, Protocol};
use crate::error::GsiError;
use crate::hal::GsiHal;
use crate::registers::{EV_CH_CMD, EV_CNTXT_0, EV_CNTXT_1, EV_CNTXT_8};
use crate::regmap::GsiReg;
use crate::ring::Ring;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvtRingState {
    NotAllocated,
    Allocated,
    Error,
}

impl EvtRingState {
    pub fn from_hw(chstate: u32) -> Option<EvtRingState> {
        match chstate {
            0x0 => Some(EvtRingState::NotAllocated),
            0x1 => Some(EvtRingState::Allocated),
            0xf => Some(EvtRingState::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntType {
    Msi,
    Irq,
}

#[derive(Clone, Copy, Debug)]
pub struct EvtRingProps {
    pub protocol: Protocol,
    pub intype: IntType,
    /// Interrupt moderation timer, in 32kHz ticks.
    pub int_modt: u32,
    /// Interrupt moderation packet counter.
    pub int_modc: u32,
    pub intvec: u32,
    pub msi_addr: u64,
    /// Where the hardware mirrors its read pointer, 0 to disable.
    pub rp_update_addr: u64,
}

pub struct EventRing<'a, B: RegisterBus> {
    hal: &'a GsiHal<B>,
    id: u32,
    ring: Ring,
    state: Cell<EvtRingState>,
}

impl<'a, B: RegisterBus> EventRing<'a, B> {
    pub fn new(hal: &'a GsiHal<B>, id: u32, ring: Ring) -> EventRing<'a, B> {
        EventRing {
            hal,
            id,
            ring,
            state: Cell::new(EvtRingState::NotAllocated),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn state(&self) -> EvtRingState {
        self.state.get()
    }

    pub fn hw_state(&self) -> Result<Option<EvtRingState>, GsiError> {
        let cntxt = self
            .hal
            .read_fields::<EV_CNTXT_0::Register>(GsiReg::EvCntxt0, self.hal.ee(), self.id)?;
        Ok(EvtRingState::from_hw(cntxt.read(EV_CNTXT_0::CHSTATE)))
    }

    fn command(
        &self,
        opcode: FieldValue<u32, EV_CH_CMD::Register>,
        want: EvtRingState,
    ) -> Result<(), GsiError> {
        self.hal.write_fields(
            GsiReg::EvChCmd,
            self.hal.ee(),
            0,
            EV_CH_CMD::CHID.val(self.id) + opcode,
        )?;

        match wait_for_state(|| self.hw_state(), want, EvtRingState::Error) {
            Ok(()) => {
                debug!(ev = self.id, to = ?want, "event ring state change");
                self.state.set(want);
                Ok(())
            }
            Err(GsiError::ChannelError) => {
                error!(ev = self.id, "event ring moved to error state");
                self.state.set(EvtRingState::Error);
                Err(GsiError::ChannelError)
            }
            Err(e) => {
                warn!(ev = self.id, ?want, "event ring command did not complete");
                Err(e)
            }
        }
    }

    fn require(&self, allowed: &[EvtRingState]) -> Result<(), GsiError> {
        if allowed.contains(&self.state.get()) {
            Ok(())
        } else {
            Err(GsiError::InvalidState)
        }
    }

    /// Allocate the event ring, program its context and hand the whole ring
    /// to the hardware.
    pub fn alloc(&self, props: &EvtRingProps) -> Result<(), GsiError> {
        self.require(&[EvtRingState::NotAllocated])?;
        self.hal.check_ring_length(self.ring.len(), self.ring.elem_size())?;
        for reg in [GsiReg::EvCntxt0, GsiReg::EvCntxt1] {
            self.hal.check_fields(reg)?;
        }
        self.command(EV_CH_CMD::OPCODE::Allocate, EvtRingState::Allocated)?;
        self.program(props)?;

        // Every element but one is available for the hardware to fill.
        let wp = self.ring.advance_wp(self.ring.num_elements() - 1)?;
        self.ring_doorbell(wp)
    }

    fn program(&self, props: &EvtRingProps) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        let id = self.id;
        let intype = match props.intype {
            IntType::Msi => EV_CNTXT_0::INTYPE::Msi,
            IntType::Irq => EV_CNTXT_0::INTYPE::Irq,
        };
        self.hal.write_fields(
            GsiReg::EvCntxt0,
            ee,
            id,
            EV_CNTXT_0::CHTYPE.val(props.protocol as u32)
                + intype
                + EV_CNTXT_0::EVCHID.val(id)
                + EV_CNTXT_0::EE.val(ee)
                + EV_CNTXT_0::ELEMENT_SIZE.val(self.ring.elem_size()),
        )?;
        self.hal
            .write_fields(GsiReg::EvCntxt1, ee, id, EV_CNTXT_1::R_LENGTH.val(self.ring.len()))?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt2, ee, id, self.ring.base() as u32)?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt3, ee, id, (self.ring.base() >> 32) as u32)?;
        self.hal.write_fields(
            GsiReg::EvCntxt8,
            ee,
            id,
            EV_CNTXT_8::INT_MODT.val(props.int_modt) + EV_CNTXT_8::INT_MODC.val(props.int_modc),
        )?;
        self.hal.write_reg_nk(GsiReg::EvCntxt9, ee, id, props.intvec)?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt10, ee, id, props.msi_addr as u32)?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt11, ee, id, (props.msi_addr >> 32) as u32)?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt12, ee, id, props.rp_update_addr as u32)?;
        self.hal
            .write_reg_nk(GsiReg::EvCntxt13, ee, id, (props.rp_update_addr >> 32) as u32)
    }

    pub fn reset(&self) -> Result<(), GsiError> {
        self.require(&[EvtRingState::Allocated, EvtRingState::Error])?;
        self.command(EV_CH_CMD::OPCODE::Reset, EvtRingState::Allocated)?;
        self.ring.reset();
        Ok(())
    }

    pub fn dealloc(&self) -> Result<(), GsiError> {
        self.require(&[EvtRingState::Allocated])?;
        self.command(EV_CH_CMD::OPCODE::DeAlloc, EvtRingState::NotAllocated)
    }

    pub fn ring_doorbell(&self, wp: u64) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        self.hal
            .write_reg_nk(GsiReg::EvDoorbell1, ee, self.id, (wp >> 32) as u32)?;
        self.hal.write_reg_nk(GsiReg::EvDoorbell0, ee, self.id, wp as u32)
    }

    /// Consume events up to the hardware read pointer in `CNTXT_4`/`CNTXT_5`
    /// and give the processed elements back to the hardware. Returns the
    /// number of events consumed.
    pub fn process(&self) -> Result<u32, GsiError> {
        let ee = self.hal.ee();
        let lsb = self.hal.read_reg_nk(GsiReg::EvCntxt4, ee, self.id)?;
        let msb = self.hal.read_reg_nk(GsiReg::EvCntxt5, ee, self.id)?;
        let done = self.ring.update_rp((u64::from(msb) << 32) | u64::from(lsb))?;
        if done > 0 {
            let wp = self.ring.advance_wp(done)?;
            self.ring_doorbell(wp)?;
        }
        Ok(done)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::regmap::GsiVersion;
    use crate::test_bus::FakeBus;

    fn props() -> EvtRingProps {
        EvtRingProps {
            protocol: Protocol::Gpi,
            intype: IntType::Irq,
            int_modt: 32,
            int_modc: 1,
            intvec: 0x55,
            msi_addr: 0x1_2345_6780,
            rp_update_addr: 0,
        }
    }

    #[test]
    fn alloc_programs_context() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V3_0);
        let ev = EventRing::new(&hal, 1, Ring::new(0x8000, 8 * 16, 16).unwrap());
        ev.alloc(&props()).unwrap();
        assert_eq!(ev.state(), EvtRingState::Allocated);

        let base = 0x80;
        let cntxt_0 = hal.bus().peek(0x1c000 + base);
        assert_eq!(cntxt_0 & 0x7f, 2);
        assert_eq!((cntxt_0 >> 7) & 1, 1);
        assert_eq!((cntxt_0 >> 8) & 0xff, 1);
        assert_eq!((cntxt_0 >> 20) & 0xf, 1);
        assert_eq!(cntxt_0 >> 24, 16);
        assert_eq!(hal.bus().peek(0x1c004 + base), 128);
        assert_eq!(hal.bus().peek(0x1c008 + base), 0x8000);
        assert_eq!(hal.bus().peek(0x1c020 + base), (1 << 16) | 32);
        assert_eq!(hal.bus().peek(0x1c024 + base), 0x55);
        assert_eq!(hal.bus().peek(0x1c028 + base), 0x2345_6780);
        assert_eq!(hal.bus().peek(0x1c02c + base), 0x1);

        // The whole ring minus one element is handed over.
        assert_eq!(hal.bus().peek(0x24800 + 8), 0x8000 + 7 * 16);
        assert_eq!(ev.ring().free_slots(), 0);
    }

    #[test]
    fn process_recycles_elements() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V3_0);
        let ev = EventRing::new(&hal, 0, Ring::new(0x8000, 8 * 16, 16).unwrap());
        ev.alloc(&props()).unwrap();

        hal.bus().poke(0x1c010, 0x8000 + 3 * 16);
        assert_eq!(ev.process(), Ok(3));
        assert_eq!(hal.bus().peek(0x24800), 0x8000 + 2 * 16);
        assert_eq!(ev.process(), Ok(0));
    }

    #[test]
    fn lifecycle() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V3_0);
        let ev = EventRing::new(&hal, 2, Ring::new(0x8000, 4 * 16, 16).unwrap());
        assert_eq!(ev.reset(), Err(GsiError::InvalidState));
        ev.alloc(&props()).unwrap();
        ev.reset().unwrap();
        assert!(ev.ring().is_empty());
        ev.dealloc().unwrap();
        assert_eq!(ev.hw_state(), Ok(Some(EvtRingState::NotAllocated)));
        assert_eq!(ev.dealloc(), Err(GsiError::InvalidState));
    }

    #[test]
    fn lost_command_times_out() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V3_0);
        let ev = EventRing::new(&hal, 1, Ring::new(0x8000, 4 * 16, 16).unwrap());
        hal.bus().ignore_commands(true);
        assert_eq!(ev.alloc(&props()), Err(GsiError::Timeout));
        assert_eq!(ev.state(), EvtRingState::NotAllocated);
        // Nothing past the command was programmed.
        assert_eq!(hal.bus().peek(0x1c000 + 0x80), 0);

        hal.bus().ignore_commands(false);
        ev.alloc(&props()).unwrap();
        assert_eq!(ev.state(), EvtRingState::Allocated);
    }

    #[test]
    fn error_state() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V3_0);
        let ev = EventRing::new(&hal, 1, Ring::new(0x8000, 4 * 16, 16).unwrap());
        ev.alloc(&props()).unwrap();

        hal.bus().force_state(Some(0xf));
        assert_eq!(ev.reset(), Err(GsiError::ChannelError));
        assert_eq!(ev.state(), EvtRingState::Error);
        assert_eq!(ev.hw_state(), Ok(Some(EvtRingState::Error)));
        assert_eq!(ev.dealloc(), Err(GsiError::InvalidState));

        hal.bus().force_state(None);
        ev.reset().unwrap();
        assert_eq!(ev.state(), EvtRingState::Allocated);
    }

    #[test]
    fn alloc_checks_the_running_version() {
        let hal = GsiHal::new(FakeBus::new(), 0, GsiVersion::V2_9);
        let ev = EventRing::new(&hal, 1, Ring::new(0x8000, 0x0010_0000, 16).unwrap());
        assert_eq!(ev.alloc(&props()), Err(GsiError::InvalidRingLength));

        let ev = EventRing::new(&hal, 1, Ring::new(0x8000, 4 * 16, 16).unwrap());
        assert_eq!(
            ev.alloc(&props()),
            Err(GsiError::NoFieldAccessor(GsiReg::EvCntxt0))
        );
        assert_eq!(ev.state(), EvtRingState::NotAllocated);
        assert!(hal.bus().writes().is_empty());
    }
}
