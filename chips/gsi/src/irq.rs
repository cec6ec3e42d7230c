// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Top level interrupt handling for one execution environment.

use tock_cells::optional_cell::OptionalCell;
use tracing::{debug, error};

use crate::bus::RegisterBus;
use crate::error::GsiError;
use crate::evt_ring::IntType;
use crate::hal::{ch_bit_map_mask, GsiHal};
use crate::registers::{GLOB_IRQ, GSI_IRQ, INTSET, TYPE_IRQ};
use crate::regmap::GsiReg;

/// Receives the decoded GSI interrupts.
pub trait GsiClient {
    /// Channel `ch` completed a command or changed state.
    fn channel_ctrl(&self, ch: u32);
    /// Event ring `ev` completed a command.
    fn evt_ring_ctrl(&self, ev: u32);
    /// Event ring `ev` has new events (interrupt on end of block).
    fn ieob(&self, ev: u32);
    /// The hardware logged an error.
    fn global_error(&self, error_log: u32);
    /// General purpose interrupt `1..=3`, used by the firmware to signal
    /// completion of generic EE commands.
    fn general_purpose(&self, index: u32);
    /// Bus or firmware fault, raw `GSI_IRQ_STTS` value.
    fn general(&self, status: u32);
}

/// Iterator over the indices of the set bits of a word.
struct SetBits(u32);

impl Iterator for SetBits {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

pub struct GsiInterrupts<'a, B: RegisterBus> {
    hal: &'a GsiHal<B>,
    client: OptionalCell<&'a dyn GsiClient>,
}

impl<'a, B: RegisterBus> GsiInterrupts<'a, B> {
    pub fn new(hal: &'a GsiHal<B>) -> GsiInterrupts<'a, B> {
        GsiInterrupts {
            hal,
            client: OptionalCell::empty(),
        }
    }

    pub fn set_client(&self, client: &'a dyn GsiClient) {
        self.client.set(client);
    }

    /// Route interrupts of this EE and unmask the interrupt types the driver
    /// handles. Channel and event ring sources are unmasked separately.
    pub fn enable(&self, intype: IntType) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        let intset = match intype {
            IntType::Msi => INTSET::INTYPE::Msi,
            IntType::Irq => INTSET::INTYPE::Irq,
        };
        self.hal.write_fields(GsiReg::CntxtIntset, ee, 0, intset)?;
        self.hal.write_fields(
            GsiReg::CntxtTypeIrqMsk,
            ee,
            0,
            TYPE_IRQ::CH_CTRL::SET
                + TYPE_IRQ::EV_CTRL::SET
                + TYPE_IRQ::GLOB_EE::SET
                + TYPE_IRQ::IEOB::SET
                + TYPE_IRQ::GENERAL::SET,
        )?;
        self.hal.write_fields(
            GsiReg::CntxtGlobIrqEn,
            ee,
            0,
            GLOB_IRQ::ERROR_INT::SET + GLOB_IRQ::GP_INT1::SET,
        )?;
        self.hal.write_fields(
            GsiReg::CntxtGsiIrqEn,
            ee,
            0,
            GSI_IRQ::BREAK_POINT::SET
                + GSI_IRQ::BUS_ERROR::SET
                + GSI_IRQ::CMD_FIFO_OVRFLOW::SET
                + GSI_IRQ::MCS_STACK_OVRFLOW::SET,
        )
    }

    fn unmask(&self, reg: GsiReg, id: u32) -> Result<(), GsiError> {
        let mask = self.hal.read_ch_reg(reg, id)?;
        self.hal
            .write_reg_nk(reg, self.hal.ee(), 0, mask | ch_bit_map_mask(id))
    }

    pub fn enable_channel(&self, ch: u32) -> Result<(), GsiError> {
        self.unmask(GsiReg::CntxtSrcGsiChIrqMsk, ch)
    }

    pub fn enable_evt_ring(&self, ev: u32) -> Result<(), GsiError> {
        self.unmask(GsiReg::CntxtSrcEvChIrqMsk, ev)?;
        self.unmask(GsiReg::CntxtSrcIeobIrqMsk, ev)
    }

    /// Read the pending bitmap in `stts`, restricted to `msk` when given,
    /// acknowledge it through `clr` and return it.
    fn take_bitmap(&self, stts: GsiReg, msk: Option<GsiReg>, clr: GsiReg) -> Result<u32, GsiError> {
        let ee = self.hal.ee();
        let mut pending = self.hal.read_reg_nk(stts, ee, 0)?;
        if let Some(msk) = msk {
            pending &= self.hal.read_reg_nk(msk, ee, 0)?;
        }
        if pending != 0 {
            self.hal.write_reg_nk(clr, ee, 0, pending)?;
        }
        Ok(pending)
    }

    pub fn handle_interrupt(&self) -> Result<(), GsiError> {
        let ee = self.hal.ee();
        let mut ty = self
            .hal
            .read_fields::<TYPE_IRQ::Register>(GsiReg::CntxtTypeIrq, ee, 0)?;
        let msk = self
            .hal
            .read_fields::<TYPE_IRQ::Register>(GsiReg::CntxtTypeIrqMsk, ee, 0)?;
        ty.set(ty.get() & msk.get());
        debug!(type_irq = ty.get(), "gsi interrupt");

        if ty.is_set(TYPE_IRQ::CH_CTRL) {
            let pending = self.take_bitmap(GsiReg::CntxtSrcGsiChIrq, None, GsiReg::CntxtSrcGsiChIrqClr)?;
            for ch in SetBits(pending) {
                self.client.map(|c| c.channel_ctrl(ch));
            }
        }

        if ty.is_set(TYPE_IRQ::EV_CTRL) {
            let pending = self.take_bitmap(GsiReg::CntxtSrcEvChIrq, None, GsiReg::CntxtSrcEvChIrqClr)?;
            for ev in SetBits(pending) {
                self.client.map(|c| c.evt_ring_ctrl(ev));
            }
        }

        if ty.is_set(TYPE_IRQ::GLOB_EE) {
            let stts = self
                .hal
                .read_fields::<GLOB_IRQ::Register>(GsiReg::CntxtGlobIrqStts, ee, 0)?;
            if stts.is_set(GLOB_IRQ::ERROR_INT) {
                let log = self.hal.read_reg_nk(GsiReg::ErrorLog, ee, 0)?;
                self.hal.write_reg_nk(GsiReg::ErrorLogClr, ee, 0, 0xffff_ffff)?;
                error!(error_log = log, "gsi error interrupt");
                self.client.map(|c| c.global_error(log));
            }
            for (index, field) in [(1, GLOB_IRQ::GP_INT1), (2, GLOB_IRQ::GP_INT2), (3, GLOB_IRQ::GP_INT3)] {
                if stts.is_set(field) {
                    self.client.map(|c| c.general_purpose(index));
                }
            }
            self.hal
                .write_reg_nk(GsiReg::CntxtGlobIrqClr, ee, 0, stts.get())?;
        }

        if ty.is_set(TYPE_IRQ::IEOB) {
            let pending = self.take_bitmap(
                GsiReg::CntxtSrcIeobIrq,
                Some(GsiReg::CntxtSrcIeobIrqMsk),
                GsiReg::CntxtSrcIeobIrqClr,
            )?;
            for ev in SetBits(pending) {
                self.client.map(|c| c.ieob(ev));
            }
        }

        if ty.is_set(TYPE_IRQ::INTER_EE_CH_CTRL) {
            let pending = self.hal.read_reg_nk(GsiReg::InterEeSrcGsiChIrq, ee, 0)?;
            self.hal
                .write_reg_nk(GsiReg::InterEeSrcGsiChIrqClr, ee, 0, pending)?;
            debug!(pending, "inter-EE channel interrupt");
        }

        if ty.is_set(TYPE_IRQ::INTER_EE_EV_CTRL) {
            let pending = self.hal.read_reg_nk(GsiReg::InterEeSrcEvChIrq, ee, 0)?;
            self.hal
                .write_reg_nk(GsiReg::InterEeSrcEvChIrqClr, ee, 0, pending)?;
            debug!(pending, "inter-EE event ring interrupt");
        }

        if ty.is_set(TYPE_IRQ::GENERAL) {
            let stts = self.hal.read_reg_nk(GsiReg::CntxtGsiIrqStts, ee, 0)?;
            self.hal.write_reg_nk(GsiReg::CntxtGsiIrqClr, ee, 0, stts)?;
            error!(status = stts, "gsi general interrupt");
            self.client.map(|c| c.general(stts));
        }

        Ok(())
    }
}
