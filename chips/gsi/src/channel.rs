// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! GSI transfer channels.
//!
//! A channel moves through its states only through commands written to
//! `EE_n_GSI_CH_CMD`. The hardware reports completion by updating the
//! `CHSTATE` field of `CNTXT_0`, which is polled here with a bounded
//! number of reads.
//!
//! ```text
//!  NOT_ALLOCATED --ALLOCATE--> ALLOCATED --START--> STARTED
//!        ^                      |   ^                 |
//!        +-------DE_ALLOC-------+   |               STOP
//!                                 RESET               v
//!                                   +----------- STOPPED
//! ```

use core::cell::Cell;

use tock_registers::fields::FieldValue;
use tracing::{debug, error, warn};

use crate::bus::RegisterBus;
use crate::error::GsiError;
use crate::hal::GsiHal;
use crate::registers::{CH_CMD, CH_CNTXT_0, CH_CNTXT_1, CH_QOS};
use crate::regmap::GsiReg;
use crate::ring::Ring;

/// Number of context reads before a command is considered lost.
pub const POLL_ATTEMPTS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    NotAllocated,
    Allocated,
    Started,
    Stopped,
    StopInProc,
    FlowControlled,
    Error,
}

impl ChannelState {
    pub fn from_hw(chstate: u32) -> Option<ChannelState> {
        match chstate {
            0x0 => Some(ChannelState::NotAllocated),
            0x1 => Some(ChannelState::Allocated),
            0x2 => Some(ChannelState::Started),
            0x3 => Some(ChannelState::Stopped),
            0x4 => Some(ChannelState::StopInProc),
            0x5 => Some(ChannelState::FlowControlled),
            0xf => Some(ChannelState::Error),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Protocol {
    Mhi = 0,
    Xhci = 1,
    Gpi = 2,
    Xdci = 3,
    Wdi2 = 4,
    Gci = 5,
    Wdi3 = 6,
    Mhip = 7,
    Aqc = 8,
    Ad11 = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Data flows from the GSI to the peripheral.
    FromGsi,
    /// Data flows from the peripheral to the GSI.
    ToGsi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefetchMode {
    UseCase = 0,
    Escape = 1,
    SmartPrefetch = 2,
    FreePrefetch = 3,
}

#[derive(Clone, Copy, Debug)]
pub struct QosProps {
    pub wrr_weight: u32,
    pub two_element_prefetch: bool,
    pub use_db_eng: bool,
    pub prefetch_mode: PrefetchMode,
    pub empty_lvl_threshold: u32,
    pub db_in_bytes: bool,
    pub low_latency: bool,
}

impl Default for QosProps {
    fn default() -> QosProps {
        QosProps {
            wrr_weight: 0,
            two_element_prefetch: false,
            use_db_eng: true,
            prefetch_mode: PrefetchMode::UseCase,
            empty_lvl_threshold: 0,
            db_in_bytes: false,
            low_latency: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChannelProps {
    pub protocol: Protocol,
    pub dir: Direction,
    /// Event ring completions are posted to.
    pub evt_ring: u32,
    pub qos: QosProps,
    pub scratch: [u32; 4],
}

/// Poll `read_state` until it reports `want`.
pub(crate) fn wait_for_state<S: Copy + PartialEq>(
    read_state: impl Fn() -> Result<Option<S>, GsiError>,
    want: S,
    error_state: S,
) -> Result<(), GsiError> {
    for _ in 0..POLL_ATTEMPTS {
        match read_state()? {
            Some(state) if state == want => return Ok(()),
            Some(state) if state == error_state => return Err(GsiError::ChannelError),
            _ => {}
        }
    }
    Err(GsiError::Timeout)
}

pub struct Channel<'a, B: RegisterBus> {
    hal: &'a GsiHal<B>,
    id: u32,
    ring: Ring,
    state: Cell<ChannelState>,
}

impl<'a, B: RegisterBus> Channel<'a, B> {
    pub fn new(hal: &'a GsiHal<B>, id: u32, ring: Ring) -> Channel<'a, B> {
        Channel {
            hal,
            id,
            ring,
            state: Cell::new(ChannelState::NotAllocated),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    /// State as last observed by the driver.
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// State as currently reported by the hardware.
    pub fn hw_state(&self) -> Result<Option<ChannelState>, GsiError> {
        let cntxt = self
            .hal
            .read_fields::<CH_CNTXT_0::Register>(GsiReg::ChCntxt0, self.hal.ee(), self.id)?;
        Ok(ChannelState::from_hw(cntxt.read(CH_CNTXT_0::CHSTATE)))
    }

    fn command(
        &self,
        opcode: FieldValue<u32, CH_CMD::Register>,
        want: ChannelState,
    ) -> Result<(), GsiError> {
        self.hal.write_fields(
            GsiReg::GsiChCmd,
            self.hal.ee(),
            0,
            CH_CMD::CHID.val(self.id) + opcode,
        )?;

        let res = wait_for_state(|| self.hw_state(), want, ChannelState::Error);
        match res {
            Ok(()) => {
                debug!(ch = self.id, from = ?self.state.get(), to = ?want, "channel state change");
                self.state.set(want);
            }
            Err(GsiError::ChannelError) => {
                error!(ch = self.id, "channel moved to error state");
                self.state.set(ChannelState::Error);
            }
            Err(e) => {
                warn!(ch = self.id, ?want, "channel command did not complete");
                if let Ok(Some(state)) = self.hw_state() {
                    self.state.set(state);
                }
                return Err(e);
            }
        }
        res
    }

    fn require(&self, allowed: &[ChannelState]) -> Result<(), GsiError> {
        if allowed.contains(&self.state.get()) {
            Ok(())
        } else {
            warn!(ch = self.id, state = ?self.state.get(), "command not allowed");
            Err(GsiError::InvalidState)
        }
    }

    /// Allocate the channel and program its context.
    pub fn alloc(&self, props: &ChannelProps) -> Result<(), GsiError> {
        self.require(&[ChannelState::NotAllocated])?;
        self.hal.check_ring_length(self.ring.len(), self.ring.elem_size())?;
        for reg in [GsiReg::ChCntxt0, GsiReg::ChCntxt1, GsiReg::ChQos] {
            self.hal.check_fields(reg)?;
        }
        self.command(CH_CMD::OPCODE::Allocate, ChannelState::Allocated)?;
        self.program(props)
    }

    fn program(&self, props: &ChannelProps) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        let dir = match props.dir {
            Direction::FromGsi => CH_CNTXT_0::CHTYPE_DIR::FromGsi,
            Direction::ToGsi => CH_CNTXT_0::CHTYPE_DIR::ToGsi,
        };
        self.hal.write_fields(
            GsiReg::ChCntxt0,
            ee,
            self.id,
            CH_CNTXT_0::CHTYPE_PROTOCOL.val(props.protocol as u32)
                + dir
                + CH_CNTXT_0::EE.val(ee)
                + CH_CNTXT_0::CHID.val(self.id)
                + CH_CNTXT_0::ELEMENT_SIZE.val(self.ring.elem_size()),
        )?;
        self.hal.write_fields(
            GsiReg::ChCntxt1,
            ee,
            self.id,
            CH_CNTXT_1::R_LENGTH.val(self.ring.len()) + CH_CNTXT_1::ERINDEX.val(props.evt_ring),
        )?;
        self.hal
            .write_reg_nk(GsiReg::ChCntxt2, ee, self.id, self.ring.base() as u32)?;
        self.hal
            .write_reg_nk(GsiReg::ChCntxt3, ee, self.id, (self.ring.base() >> 32) as u32)?;

        let qos = &props.qos;
        let max_prefetch = if qos.two_element_prefetch {
            CH_QOS::MAX_PREFETCH::TwoElements
        } else {
            CH_QOS::MAX_PREFETCH::OneElement
        };
        self.hal.write_fields(
            GsiReg::ChQos,
            ee,
            self.id,
            CH_QOS::WRR_WEIGHT.val(qos.wrr_weight)
                + max_prefetch
                + CH_QOS::USE_DB_ENG.val(qos.use_db_eng as u32)
                + CH_QOS::PREFETCH_MODE.val(qos.prefetch_mode as u32)
                + CH_QOS::EMPTY_LVL_THRSHOLD.val(qos.empty_lvl_threshold)
                + CH_QOS::DB_IN_BYTES.val(qos.db_in_bytes as u32)
                + CH_QOS::LOW_LATENCY_EN.val(qos.low_latency as u32),
        )?;

        let scratch = [
            GsiReg::ChScratch0,
            GsiReg::ChScratch1,
            GsiReg::ChScratch2,
            GsiReg::ChScratch3,
        ];
        for (reg, value) in scratch.iter().zip(props.scratch.iter()) {
            self.hal.write_reg_nk(*reg, ee, self.id, *value)?;
        }
        Ok(())
    }

    pub fn start(&self) -> Result<(), GsiError> {
        self.require(&[ChannelState::Allocated, ChannelState::Stopped])?;
        self.command(CH_CMD::OPCODE::Start, ChannelState::Started)
    }

    /// Stop the channel. The hardware may sit in STOP_IN_PROC while it
    /// drains outstanding transfers; that is polled through.
    pub fn stop(&self) -> Result<(), GsiError> {
        self.require(&[ChannelState::Started, ChannelState::FlowControlled])?;
        self.command(CH_CMD::OPCODE::Stop, ChannelState::Stopped)
    }

    /// Return a stopped channel to ALLOCATED and rewind its ring.
    pub fn reset(&self) -> Result<(), GsiError> {
        self.require(&[ChannelState::Stopped, ChannelState::Error])?;
        self.command(CH_CMD::OPCODE::Reset, ChannelState::Allocated)?;
        self.ring.reset();
        Ok(())
    }

    pub fn dealloc(&self) -> Result<(), GsiError> {
        self.require(&[ChannelState::Allocated])?;
        self.command(CH_CMD::OPCODE::DeAlloc, ChannelState::NotAllocated)
    }

    /// Ask the doorbell engine to stop accepting doorbells for this channel.
    pub fn db_stop(&self) -> Result<(), GsiError> {
        self.require(&[ChannelState::Started, ChannelState::FlowControlled])?;
        self.hal.write_fields(
            GsiReg::GsiChCmd,
            self.hal.ee(),
            0,
            CH_CMD::CHID.val(self.id) + CH_CMD::OPCODE::DbStop,
        )
    }

    /// Publish `elements` new transfer elements to the hardware.
    pub fn queue(&self, elements: u32) -> Result<(), GsiError> {
        self.require(&[ChannelState::Started, ChannelState::FlowControlled])?;
        let wp = self.ring.advance_wp(elements)?;
        self.ring_doorbell(wp)
    }

    /// The MSB half must be written first, the LSB write triggers the
    /// doorbell.
    pub fn ring_doorbell(&self, wp: u64) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        self.hal
            .write_reg_nk(GsiReg::ChDoorbell1, ee, self.id, (wp >> 32) as u32)?;
        self.hal.write_reg_nk(GsiReg::ChDoorbell0, ee, self.id, wp as u32)
    }

    /// Pull the hardware read pointer from `CNTXT_4`/`CNTXT_5` and return
    /// the number of elements consumed since the last call.
    pub fn sync_rp(&self) -> Result<u32, GsiError> {
        let ee = self.hal.ee();
        let lsb = self.hal.read_reg_nk(GsiReg::ChCntxt4, ee, self.id)?;
        let msb = self.hal.read_reg_nk(GsiReg::ChCntxt5, ee, self.id)?;
        self.ring.update_rp((u64::from(msb) << 32) | u64::from(lsb))
    }
}
