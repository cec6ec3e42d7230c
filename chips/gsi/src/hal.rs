// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Register level access to the GSI block.
//!
//! `GsiHal` resolves a [`GsiReg`] and its `(n, k)` indices into a byte
//! offset on the register bus. Raw accessors are available for every
//! register that exists on the hardware; field accessors only for those
//! with a layout in [`crate::registers`].

use tock_registers::fields::FieldValue;
use tock_registers::{LocalRegisterCopy, RegisterLongName};
use tracing::{debug, error};

use crate::bus::RegisterBus;
use crate::error::GsiError;
use crate::registers::{
    GENERIC_CMD, GLOB_IRQ, GSI_CFG, GSI_STATUS, HW_PARAM_2, HW_PARAM_4, SW_VERSION, VP_TABLE,
};
use crate::regmap::{GsiReg, GsiVersion};

/// Number of 32-bit cells in a channel bitmap register array.
pub const CH_BIT_MAP_ARR_SIZE: u32 = 1;

/// Cell of a channel bitmap register array holding `ch`.
pub const fn ch_bit_map_cell(ch: u32) -> u32 {
    ch >> 5
}

/// Bit of `ch` inside its bitmap cell.
pub const fn ch_bit_map_mask(ch: u32) -> u32 {
    1 << (ch & 31)
}

/// Commands executed by the firmware on behalf of an EE. Completion is
/// signalled through the `GP_INT1` global interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenericCmd {
    HaltChannel,
    AllocChannel,
    EnableFlowControl,
    DisableFlowControl,
    QueryFlowControl,
}

/// Decoded hardware capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HwParams {
    pub num_ch_per_ee: u32,
    pub num_ev_per_ee: u32,
    pub iram_size: u32,
    pub iram_protocol_cnt: u32,
    pub use_inter_ee: bool,
    pub use_rd_wr_eng: bool,
    pub sw_major: u32,
    pub sw_minor: u32,
    pub sw_step: u32,
}

pub struct GsiHal<B: RegisterBus> {
    bus: B,
    ee: u32,
    version: GsiVersion,
}

impl<B: RegisterBus> GsiHal<B> {
    /// `ee` is the execution environment this driver runs in, `version` the
    /// revision of the block behind `bus`.
    pub const fn new(bus: B, ee: u32, version: GsiVersion) -> GsiHal<B> {
        GsiHal { bus, ee, version }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn ee(&self) -> u32 {
        self.ee
    }

    pub fn version(&self) -> GsiVersion {
        self.version
    }

    fn offset(&self, reg: GsiReg, n: u32, k: u32) -> Result<u32, GsiError> {
        reg.obj(self.version).offset_nk(n, k).ok_or_else(|| {
            error!(reg = reg.name(), "access to obsolete register");
            GsiError::ObsoleteRegister(reg)
        })
    }

    pub fn read_reg(&self, reg: GsiReg) -> Result<u32, GsiError> {
        self.read_reg_nk(reg, 0, 0)
    }

    pub fn read_reg_n(&self, reg: GsiReg, n: u32) -> Result<u32, GsiError> {
        self.read_reg_nk(reg, n, 0)
    }

    pub fn read_reg_nk(&self, reg: GsiReg, n: u32, k: u32) -> Result<u32, GsiError> {
        let offset = self.offset(reg, n, k)?;
        Ok(self.bus.read32(offset))
    }

    pub fn write_reg(&self, reg: GsiReg, value: u32) -> Result<(), GsiError> {
        self.write_reg_nk(reg, 0, 0, value)
    }

    pub fn write_reg_n(&self, reg: GsiReg, n: u32, value: u32) -> Result<(), GsiError> {
        self.write_reg_nk(reg, n, 0, value)
    }

    pub fn write_reg_nk(&self, reg: GsiReg, n: u32, k: u32, value: u32) -> Result<(), GsiError> {
        let offset = self.offset(reg, n, k)?;
        self.bus.write32(offset, value);
        Ok(())
    }

    /// Fails unless `reg` has a field layout on this version.
    pub fn check_fields(&self, reg: GsiReg) -> Result<(), GsiError> {
        if reg.obj(self.version).fields {
            Ok(())
        } else {
            error!(reg = reg.name(), version = ?self.version, "no field accessor for register");
            Err(GsiError::NoFieldAccessor(reg))
        }
    }

    /// Read a register and decode it with layout `R`.
    ///
    /// The caller picks the layout matching `reg` from
    /// [`crate::registers`].
    pub fn read_fields<R: RegisterLongName>(
        &self,
        reg: GsiReg,
        n: u32,
        k: u32,
    ) -> Result<LocalRegisterCopy<u32, R>, GsiError> {
        self.check_fields(reg)?;
        self.read_reg_nk(reg, n, k).map(LocalRegisterCopy::new)
    }

    /// Write a register composed from field values. Fields not named in
    /// `value` are written as zero.
    pub fn write_fields<R: RegisterLongName>(
        &self,
        reg: GsiReg,
        n: u32,
        k: u32,
        value: FieldValue<u32, R>,
    ) -> Result<(), GsiError> {
        self.check_fields(reg)?;
        self.write_reg_nk(reg, n, k, value.value)
    }

    /// Read-modify-write of the fields named in `value`.
    pub fn modify_fields<R: RegisterLongName>(
        &self,
        reg: GsiReg,
        n: u32,
        k: u32,
        value: FieldValue<u32, R>,
    ) -> Result<(), GsiError> {
        let mut copy = self.read_fields::<R>(reg, n, k)?;
        copy.modify(value);
        self.write_reg_nk(reg, n, k, copy.get())
    }

    /// Read the bitmap cell of `reg` that holds channel `ch` for this EE.
    pub fn read_ch_reg(&self, reg: GsiReg, ch: u32) -> Result<u32, GsiError> {
        let cell = ch_bit_map_cell(ch);
        if cell >= CH_BIT_MAP_ARR_SIZE {
            return Err(GsiError::OutOfRange);
        }
        self.read_reg_nk(reg, self.ee, cell)
    }

    /// Set the bit of channel `ch` in bitmap register `reg` of EE `n`.
    /// Other bits of the cell are written as zero, which is what the
    /// clear and mask-set registers expect.
    pub fn write_set_ch_bit_map_reg_n(&self, reg: GsiReg, n: u32, ch: u32) -> Result<(), GsiError> {
        let cell = ch_bit_map_cell(ch);
        if cell >= CH_BIT_MAP_ARR_SIZE {
            return Err(GsiError::OutOfRange);
        }
        self.write_reg_nk(reg, n, cell, ch_bit_map_mask(ch))
    }

    /// Size of the instruction RAM in bytes, 0 if it is not known for this
    /// version.
    pub fn inst_ram_size(&self) -> u32 {
        self.version.inst_ram_max_n().map_or(0, |max_n| 4 * (max_n + 1))
    }

    /// Load firmware words into the instruction RAM starting at word `start`.
    pub fn write_inst_ram(&self, start: u32, words: &[u32]) -> Result<(), GsiError> {
        let max_n = self.version.inst_ram_max_n().ok_or_else(|| {
            error!(version = ?self.version, "instruction RAM size unknown");
            GsiError::UnsupportedVersion
        })?;
        let end = (start as usize).checked_add(words.len()).ok_or(GsiError::OutOfRange)?;
        if end > (max_n + 1) as usize {
            error!(start, len = words.len(), "firmware does not fit instruction RAM");
            return Err(GsiError::OutOfRange);
        }
        for (n, word) in (start..).zip(words.iter()) {
            self.write_reg_n(GsiReg::InstRamN, n, *word)?;
        }
        Ok(())
    }

    pub fn glob_irq_gp_int1_mask(&self) -> u32 {
        GLOB_IRQ::GP_INT1::SET.value
    }

    /// Turn the engine on. `sleep_clk_div` is the divider of the sleep
    /// clock used while collapsed.
    pub fn enable(&self, sleep_clk_div: u32) -> Result<(), GsiError> {
        debug!(sleep_clk_div, "enabling GSI");
        self.modify_fields(
            GsiReg::GsiCfg,
            0,
            0,
            GSI_CFG::GSI_ENABLE::SET + GSI_CFG::MCS_ENABLE::SET + GSI_CFG::SLEEP_CLK_DIV.val(sleep_clk_div),
        )
    }

    pub fn disable(&self) -> Result<(), GsiError> {
        debug!("disabling GSI");
        self.modify_fields(GsiReg::GsiCfg, 0, 0, GSI_CFG::GSI_ENABLE::CLEAR)
    }

    pub fn is_enabled(&self) -> Result<bool, GsiError> {
        Ok(self
            .read_fields::<GSI_STATUS::Register>(GsiReg::GsiStatus, self.ee, 0)?
            .is_set(GSI_STATUS::ENABLED))
    }

    pub fn set_periph_base(&self, addr: u64) -> Result<(), GsiError> {
        self.write_reg(GsiReg::PeriphBaseAddrLsb, addr as u32)?;
        self.write_reg(GsiReg::PeriphBaseAddrMsb, (addr >> 32) as u32)
    }

    /// Map virtual channel `vch` of EE `ee` onto physical channel `phy_ch`.
    pub fn map_virtual_channel(&self, ee: u32, vch: u32, phy_ch: u32) -> Result<(), GsiError> {
        self.write_fields(
            GsiReg::MapEeChVpTable,
            ee,
            vch,
            VP_TABLE::PHY_CH.val(phy_ch) + VP_TABLE::VALID::SET,
        )
    }

    /// Issue a generic command on virtual channel `vch` of EE `ee`.
    pub fn generic_cmd(&self, cmd: GenericCmd, vch: u32, ee: u32) -> Result<(), GsiError> {
        let opcode = match cmd {
            GenericCmd::HaltChannel => GENERIC_CMD::OPCODE::Halt,
            GenericCmd::AllocChannel => GENERIC_CMD::OPCODE::Alloc,
            GenericCmd::EnableFlowControl => GENERIC_CMD::OPCODE::EnableFlowControl,
            GenericCmd::DisableFlowControl => GENERIC_CMD::OPCODE::Disable,
            GenericCmd::QueryFlowControl => GENERIC_CMD::OPCODE::Query,
        };
        debug!(?cmd, vch, ee, "generic command");
        self.write_fields(
            GsiReg::EeGenericCmd,
            self.ee,
            0,
            opcode + GENERIC_CMD::VIRT_CHAN_IDX.val(vch) + GENERIC_CMD::EE.val(ee),
        )
    }

    /// Validate a ring of `r_len` bytes holding `elem_size` byte elements
    /// against the context length field of this version.
    pub fn check_ring_length(&self, r_len: u32, elem_size: u32) -> Result<(), GsiError> {
        if !self.version.ring_length_valid(r_len, elem_size) {
            error!(r_len, elem_size, version = ?self.version, "invalid ring length");
            return Err(GsiError::InvalidRingLength);
        }
        Ok(())
    }

    pub fn hw_param(&self) -> Result<HwParams, GsiError> {
        let p2 = self.read_fields::<HW_PARAM_2::Register>(GsiReg::GsiHwParam2, self.ee, 0)?;
        let p4 = self.read_fields::<HW_PARAM_4::Register>(GsiReg::GsiHwParam4, self.ee, 0)?;
        let ver = self.read_fields::<SW_VERSION::Register>(GsiReg::GsiSwVersion, self.ee, 0)?;

        Ok(HwParams {
            num_ch_per_ee: p2.read(HW_PARAM_2::NUM_CH_PER_EE),
            num_ev_per_ee: p4.read(HW_PARAM_4::NUM_EV_PER_EE),
            iram_size: p2.read(HW_PARAM_2::IRAM_SIZE),
            iram_protocol_cnt: p4.read(HW_PARAM_4::IRAM_PROTCOL_CNT),
            use_inter_ee: p2.is_set(HW_PARAM_2::USE_INTER_EE),
            use_rd_wr_eng: p2.is_set(HW_PARAM_2::USE_RD_WR_ENG),
            sw_major: ver.read(SW_VERSION::MAJOR),
            sw_minor: ver.read(SW_VERSION::MINOR),
            sw_step: ver.read(SW_VERSION::STEP),
        })
    }
}
