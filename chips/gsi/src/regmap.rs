// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Register map of the GSI block, per hardware version.
//!
//! Every register is described by a base offset and two strides. `n`
//! selects the execution environment (or the word index for the RAM
//! windows) and `k` selects the channel or event ring. A register whose
//! offset is `None` is obsolete on the running version of the hardware and
//! must not be touched.
//!
//! The v3.0 map is the reference table below. Earlier versions keep the
//! per-EE blocks at other bases with a 16 KiB EE stride, and have no
//! channel bitmap arrays: the `_k` interrupt registers are a single word.

/// Hardware revisions of the GSI block. A revision keeps every register of
/// the previous one unless it moves or drops it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GsiVersion {
    V1_0,
    V1_2,
    V1_3,
    V2_0,
    V2_2,
    V2_5,
    V2_7,
    V2_9,
    V2_11,
    V3_0,
}

impl GsiVersion {
    const fn at_least(self, other: GsiVersion) -> bool {
        self as u8 >= other as u8
    }

    /// Highest valid index of `GSI_INST_RAM_n`. The size is not known for
    /// v2.11.
    pub const fn inst_ram_max_n(self) -> Option<u32> {
        match self {
            GsiVersion::V1_0 | GsiVersion::V1_2 | GsiVersion::V1_3 => Some(4095),
            GsiVersion::V2_0 => Some(6143),
            GsiVersion::V2_2 => Some(4095),
            GsiVersion::V2_5 => Some(8191),
            GsiVersion::V2_7 | GsiVersion::V2_9 => Some(6143),
            GsiVersion::V2_11 => None,
            GsiVersion::V3_0 => Some(4095),
        }
    }

    /// Bits of the ring length field in the channel and event contexts.
    pub const fn ring_length_mask(self) -> u32 {
        if self.at_least(GsiVersion::V3_0) {
            0x00ff_ffff
        } else if self.at_least(GsiVersion::V2_9) {
            0x000f_ffff
        } else {
            0x0000_ffff
        }
    }

    /// Largest number of elements a ring may hold, if the version has a
    /// limit besides the length field.
    pub const fn max_ring_elements(self) -> Option<u32> {
        if self.at_least(GsiVersion::V3_0) {
            Some(65535)
        } else {
            None
        }
    }

    /// `true` if a ring of `r_len` bytes made of `elem_size` byte elements
    /// can be described to this version of the hardware.
    pub const fn ring_length_valid(self, r_len: u32, elem_size: u32) -> bool {
        if elem_size == 0 || r_len & !self.ring_length_mask() != 0 {
            return false;
        }
        match self.max_ring_elements() {
            Some(max) => r_len / elem_size <= max,
            None => true,
        }
    }
}

/// Location of one register in the GSI address space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegObj {
    pub offset: Option<u32>,
    pub n_ofst: u32,
    pub k_ofst: u32,
    /// The register has a bit layout in [`crate::registers`].
    pub fields: bool,
}

impl RegObj {
    /// Byte offset of instance `(n, k)`, or `None` for an obsolete register.
    pub const fn offset_nk(&self, n: u32, k: u32) -> Option<u32> {
        match self.offset {
            Some(base) => Some(base + n * self.n_ofst + k * self.k_ofst),
            None => None,
        }
    }
}

const EE: u32 = 0x12000;
const LEGACY_EE: u32 = 0x4000;
const CH: u32 = 0x80;
const DB: u32 = 0x8;
const SRC: u32 = 0x24;
const INTER_EE: u32 = 0x1000;
const INTER_EE_K: u32 = 0x18;

macro_rules! gsi_regs {
    ($($reg:ident => $name:literal, $offset:expr, $n:expr, $k:expr, $fields:literal;)*) => {
        /// All registers known to the driver.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum GsiReg {
            $($reg,)*
        }

        impl GsiReg {
            pub const ALL: &'static [GsiReg] = &[$(GsiReg::$reg,)*];

            /// Hardware name of the register, used in log messages.
            pub const fn name(self) -> &'static str {
                match self {
                    $(GsiReg::$reg => $name,)*
                }
            }

            /// Entry of the v3.0 map.
            const fn v3_0(self) -> RegObj {
                match self {
                    $(GsiReg::$reg => RegObj {
                        offset: $offset,
                        n_ofst: $n,
                        k_ofst: $k,
                        fields: $fields,
                    },)*
                }
            }
        }
    };
}

gsi_regs! {
    GsiCfg => "GSI_CFG", Some(0x0), 0, 0, true;
    PeriphBaseAddrLsb => "GSI_PERIPH_BASE_ADDR_LSB", Some(0x18), 0, 0, false;
    PeriphBaseAddrMsb => "GSI_PERIPH_BASE_ADDR_MSB", Some(0x1c), 0, 0, false;
    McsCfg => "GSI_MCS_CFG", Some(0xb000), 0, 0, true;

    IramPtrChCmd => "GSI_IRAM_PTR_CH_CMD", Some(0x400), 0, 0, false;
    IramPtrEeGenericCmd => "GSI_IRAM_PTR_EE_GENERIC_CMD", Some(0x404), 0, 0, false;
    IramPtrTlvChNotFull => "GSI_IRAM_PTR_TLV_CH_NOT_FULL", Some(0x408), 0, 0, false;
    IramPtrMsiDb => "GSI_IRAM_PTR_MSI_DB", Some(0x414), 0, 0, false;
    IramPtrChDb => "GSI_IRAM_PTR_CH_DB", Some(0x418), 0, 0, false;
    IramPtrEvDb => "GSI_IRAM_PTR_EV_DB", Some(0x41c), 0, 0, false;
    IramPtrNewRe => "GSI_IRAM_PTR_NEW_RE", Some(0x420), 0, 0, false;
    IramPtrChDisComp => "GSI_IRAM_PTR_CH_DIS_COMP", Some(0x424), 0, 0, false;
    IramPtrChEmpty => "GSI_IRAM_PTR_CH_EMPTY", Some(0x428), 0, 0, false;
    IramPtrEventGenComp => "GSI_IRAM_PTR_EVENT_GEN_COMP", Some(0x42c), 0, 0, false;
    IramPtrPeriphIfTlvIn0 => "GSI_IRAM_PTR_PERIPH_IF_TLV_IN_0", Some(0x430), 0, 0, false;
    IramPtrPeriphIfTlvIn2 => "GSI_IRAM_PTR_PERIPH_IF_TLV_IN_2", Some(0x434), 0, 0, false;
    IramPtrPeriphIfTlvIn1 => "GSI_IRAM_PTR_PERIPH_IF_TLV_IN_1", Some(0x438), 0, 0, false;
    IramPtrTimerExpired => "GSI_IRAM_PTR_TIMER_EXPIRED", Some(0x43c), 0, 0, false;
    IramPtrWriteEngComp => "GSI_IRAM_PTR_WRITE_ENG_COMP", Some(0x440), 0, 0, false;
    IramPtrReadEngComp => "GSI_IRAM_PTR_READ_ENG_COMP", Some(0x444), 0, 0, false;
    IramPtrUcGpInt => "GSI_IRAM_PTR_UC_GP_INT", Some(0x448), 0, 0, false;
    IramPtrIntModStopped => "GSI_IRAM_PTR_INT_MOD_STOPPED", Some(0x44c), 0, 0, false;
    IramPtrIntNotifyMcs => "GSI_IRAM_PTR_INT_NOTIFY_MCS", Some(0x470), 0, 0, false;

    InstRamN => "GSI_INST_RAM_n", Some(0xa4000), 4, 0, false;
    ShramN => "GSI_SHRAM_n", Some(0x2000), 4, 0, false;
    MapEeChVpTable => "GSI_MAP_EE_n_CH_k_VP_TABLE", Some(0x9000), 0x400, 4, true;

    ChCntxt0 => "EE_n_GSI_CH_k_CNTXT_0", Some(0x14000), EE, CH, true;
    ChCntxt1 => "EE_n_GSI_CH_k_CNTXT_1", Some(0x14004), EE, CH, true;
    ChCntxt2 => "EE_n_GSI_CH_k_CNTXT_2", Some(0x14008), EE, CH, false;
    ChCntxt3 => "EE_n_GSI_CH_k_CNTXT_3", Some(0x1400c), EE, CH, false;
    ChCntxt4 => "EE_n_GSI_CH_k_CNTXT_4", Some(0x14010), EE, CH, false;
    ChCntxt5 => "EE_n_GSI_CH_k_CNTXT_5", Some(0x14014), EE, CH, false;
    ChCntxt6 => "EE_n_GSI_CH_k_CNTXT_6", Some(0x14018), EE, CH, false;
    ChCntxt7 => "EE_n_GSI_CH_k_CNTXT_7", Some(0x1401c), EE, CH, false;
    ChCntxt8 => "EE_n_GSI_CH_k_CNTXT_8", Some(0x14020), EE, CH, false;
    ChReFetchReadPtr => "EE_n_GSI_CH_k_RE_FETCH_READ_PTR", Some(0x14040), EE, CH, false;
    ChReFetchWritePtr => "EE_n_GSI_CH_k_RE_FETCH_WRITE_PTR", Some(0x14044), EE, CH, false;
    ChQos => "EE_n_GSI_CH_k_QOS", Some(0x14048), EE, CH, true;
    ChScratch0 => "EE_n_GSI_CH_k_SCRATCH_0", Some(0x1404c), EE, CH, false;
    ChScratch1 => "EE_n_GSI_CH_k_SCRATCH_1", Some(0x14050), EE, CH, false;
    ChScratch2 => "EE_n_GSI_CH_k_SCRATCH_2", Some(0x14054), EE, CH, false;
    ChScratch3 => "EE_n_GSI_CH_k_SCRATCH_3", Some(0x14058), EE, CH, false;
    ChScratch4 => "EE_n_GSI_CH_k_SCRATCH_4", Some(0x1405c), EE, CH, false;
    ChScratch5 => "EE_n_GSI_CH_k_SCRATCH_5", Some(0x14060), EE, CH, false;
    ChScratch6 => "EE_n_GSI_CH_k_SCRATCH_6", Some(0x14064), EE, CH, false;
    ChScratch7 => "EE_n_GSI_CH_k_SCRATCH_7", Some(0x14068), EE, CH, false;
    ChScratch8 => "EE_n_GSI_CH_k_SCRATCH_8", Some(0x1406c), EE, CH, false;
    ChScratch9 => "EE_n_GSI_CH_k_SCRATCH_9", Some(0x14070), EE, CH, false;

    EvCntxt0 => "EE_n_EV_CH_k_CNTXT_0", Some(0x1c000), EE, CH, true;
    EvCntxt1 => "EE_n_EV_CH_k_CNTXT_1", Some(0x1c004), EE, CH, true;
    EvCntxt2 => "EE_n_EV_CH_k_CNTXT_2", Some(0x1c008), EE, CH, false;
    EvCntxt3 => "EE_n_EV_CH_k_CNTXT_3", Some(0x1c00c), EE, CH, false;
    EvCntxt4 => "EE_n_EV_CH_k_CNTXT_4", Some(0x1c010), EE, CH, false;
    EvCntxt5 => "EE_n_EV_CH_k_CNTXT_5", Some(0x1c014), EE, CH, false;
    EvCntxt6 => "EE_n_EV_CH_k_CNTXT_6", Some(0x1c018), EE, CH, false;
    EvCntxt7 => "EE_n_EV_CH_k_CNTXT_7", Some(0x1c01c), EE, CH, false;
    EvCntxt8 => "EE_n_EV_CH_k_CNTXT_8", Some(0x1c020), EE, CH, true;
    EvCntxt9 => "EE_n_EV_CH_k_CNTXT_9", Some(0x1c024), EE, CH, false;
    EvCntxt10 => "EE_n_EV_CH_k_CNTXT_10", Some(0x1c028), EE, CH, false;
    EvCntxt11 => "EE_n_EV_CH_k_CNTXT_11", Some(0x1c02c), EE, CH, false;
    EvCntxt12 => "EE_n_EV_CH_k_CNTXT_12", Some(0x1c030), EE, CH, false;
    EvCntxt13 => "EE_n_EV_CH_k_CNTXT_13", Some(0x1c034), EE, CH, false;
    EvScratch0 => "EE_n_EV_CH_k_SCRATCH_0", Some(0x1c048), EE, CH, false;
    EvScratch1 => "EE_n_EV_CH_k_SCRATCH_1", Some(0x1c04c), EE, CH, false;

    ChDoorbell0 => "EE_n_GSI_CH_k_DOORBELL_0", Some(0x24000), EE, DB, false;
    ChDoorbell1 => "EE_n_GSI_CH_k_DOORBELL_1", Some(0x24004), EE, DB, false;
    EvDoorbell0 => "EE_n_EV_CH_k_DOORBELL_0", Some(0x24800), EE, DB, false;
    EvDoorbell1 => "EE_n_EV_CH_k_DOORBELL_1", Some(0x24804), EE, DB, false;

    GsiStatus => "EE_n_GSI_STATUS", Some(0x25000), EE, 0, true;
    GsiChCmd => "EE_n_GSI_CH_CMD", Some(0x25008), EE, 0, true;
    EvChCmd => "EE_n_EV_CH_CMD", Some(0x25010), EE, 0, true;
    EeGenericCmd => "EE_n_GSI_EE_GENERIC_CMD", Some(0x25018), EE, 0, true;
    GsiHwParam => "EE_n_GSI_HW_PARAM", None, EE, 0, false;
    GsiHwParam2 => "EE_n_GSI_HW_PARAM_2", Some(0x25040), EE, 0, true;
    GsiSwVersion => "EE_n_GSI_SW_VERSION", Some(0x25044), EE, 0, true;
    GsiHwParam4 => "EE_n_GSI_HW_PARAM_4", Some(0x25050), EE, 0, true;
    CntxtTypeIrq => "EE_n_CNTXT_TYPE_IRQ", Some(0x25080), EE, 0, true;
    CntxtTypeIrqMsk => "EE_n_CNTXT_TYPE_IRQ_MSK", Some(0x25088), EE, 0, true;
    CntxtSrcGsiChIrq => "EE_n_CNTXT_SRC_GSI_CH_IRQ_k", Some(0x25090), EE, SRC, false;
    CntxtSrcGsiChIrqMsk => "EE_n_CNTXT_SRC_GSI_CH_IRQ_MSK_k", Some(0x25094), EE, SRC, false;
    CntxtSrcGsiChIrqClr => "EE_n_CNTXT_SRC_GSI_CH_IRQ_CLR_k", Some(0x25098), EE, SRC, false;
    CntxtSrcEvChIrq => "EE_n_CNTXT_SRC_EV_CH_IRQ_k", Some(0x2509c), EE, SRC, false;
    CntxtSrcEvChIrqMsk => "EE_n_CNTXT_SRC_EV_CH_IRQ_MSK_k", Some(0x250a0), EE, SRC, false;
    CntxtSrcEvChIrqClr => "EE_n_CNTXT_SRC_EV_CH_IRQ_CLR_k", Some(0x250a4), EE, SRC, false;
    CntxtSrcIeobIrq => "EE_n_CNTXT_SRC_IEOB_IRQ_k", Some(0x250a8), EE, SRC, false;
    CntxtSrcIeobIrqMsk => "EE_n_CNTXT_SRC_IEOB_IRQ_MSK_k", Some(0x250ac), EE, SRC, false;
    CntxtSrcIeobIrqClr => "EE_n_CNTXT_SRC_IEOB_IRQ_CLR_k", Some(0x250b0), EE, SRC, false;
    CntxtGlobIrqStts => "EE_n_CNTXT_GLOB_IRQ_STTS", Some(0x25200), EE, 0, true;
    CntxtGlobIrqEn => "EE_n_CNTXT_GLOB_IRQ_EN", Some(0x25204), EE, 0, true;
    CntxtGlobIrqClr => "EE_n_CNTXT_GLOB_IRQ_CLR", Some(0x25208), EE, 0, true;
    CntxtGsiIrqStts => "EE_n_CNTXT_GSI_IRQ_STTS", Some(0x2520c), EE, 0, true;
    CntxtGsiIrqEn => "EE_n_CNTXT_GSI_IRQ_EN", Some(0x25210), EE, 0, true;
    CntxtGsiIrqClr => "EE_n_CNTXT_GSI_IRQ_CLR", Some(0x25214), EE, 0, true;
    CntxtIntset => "EE_n_CNTXT_INTSET", Some(0x25220), EE, 0, true;
    CntxtMsiBaseLsb => "EE_n_CNTXT_MSI_BASE_LSB", Some(0x25230), EE, 0, false;
    CntxtMsiBaseMsb => "EE_n_CNTXT_MSI_BASE_MSB", Some(0x25234), EE, 0, false;
    ErrorLog => "EE_n_ERROR_LOG", Some(0x25240), EE, 0, false;
    ErrorLogClr => "EE_n_ERROR_LOG_CLR", Some(0x25244), EE, 0, false;
    CntxtScratch0 => "EE_n_CNTXT_SCRATCH_0", Some(0x24500), EE, 0, false;

    InterEeSrcGsiChIrq => "INTER_EE_n_SRC_GSI_CH_IRQ_k", Some(0xc018), INTER_EE, INTER_EE_K, false;
    InterEeSrcGsiChIrqClr => "INTER_EE_n_SRC_GSI_CH_IRQ_CLR_k", Some(0xc020), INTER_EE, INTER_EE_K, false;
    InterEeSrcEvChIrq => "INTER_EE_n_SRC_EV_CH_IRQ_k", Some(0xc024), INTER_EE, INTER_EE_K, false;
    InterEeSrcEvChIrqClr => "INTER_EE_n_SRC_EV_CH_IRQ_CLR_k", Some(0xc02c), INTER_EE, INTER_EE_K, false;
}

/// Bases of the blocks that moved in v2.5 and again in v3.0.
struct Blocks {
    ch: u32,
    ev: u32,
    ch_db: u32,
    ev_db: u32,
    ee: u32,
    inst_ram: u32,
}

const V1_0_BLOCKS: Blocks = Blocks {
    ch: 0x1c000,
    ev: 0x1d000,
    ch_db: 0x1e000,
    ev_db: 0x1e100,
    ee: 0x1f000,
    inst_ram: 0x4000,
};

const V2_5_BLOCKS: Blocks = Blocks {
    ch: 0xf000,
    ev: 0x10000,
    ch_db: 0x11000,
    ev_db: 0x11100,
    ee: 0x12000,
    inst_ram: 0x1b000,
};

const fn at(offset: u32, n_ofst: u32, k_ofst: u32) -> Option<(u32, u32, u32)> {
    Some((offset, n_ofst, k_ofst))
}

const fn since(
    version: GsiVersion,
    first: GsiVersion,
    offset: u32,
    n_ofst: u32,
    k_ofst: u32,
) -> Option<(u32, u32, u32)> {
    if version.at_least(first) {
        at(offset, n_ofst, k_ofst)
    } else {
        None
    }
}

/// Offset and strides of `reg` before v3.0, `None` if it does not exist.
const fn legacy_location(reg: GsiReg, version: GsiVersion) -> Option<(u32, u32, u32)> {
    use GsiReg::*;

    let b = if version.at_least(GsiVersion::V2_5) {
        V2_5_BLOCKS
    } else {
        V1_0_BLOCKS
    };
    let v3 = reg.v3_0();
    let v3_offset = match v3.offset {
        Some(offset) => offset,
        None => 0,
    };

    match reg {
        GsiCfg | PeriphBaseAddrLsb | PeriphBaseAddrMsb | IramPtrChCmd | IramPtrEeGenericCmd
        | IramPtrChDb | IramPtrEvDb | IramPtrNewRe | IramPtrChDisComp | IramPtrChEmpty
        | IramPtrEventGenComp | IramPtrPeriphIfTlvIn0 | IramPtrPeriphIfTlvIn2
        | IramPtrPeriphIfTlvIn1 | IramPtrTimerExpired | IramPtrWriteEngComp
        | IramPtrReadEngComp | IramPtrUcGpInt | IramPtrIntModStopped => at(v3_offset, 0, 0),
        McsCfg => since(version, GsiVersion::V1_2, v3_offset, 0, 0),
        IramPtrTlvChNotFull => since(version, GsiVersion::V2_5, v3_offset, 0, 0),
        IramPtrMsiDb => since(version, GsiVersion::V2_11, v3_offset, 0, 0),
        IramPtrIntNotifyMcs => None,

        InstRamN => at(b.inst_ram, 4, 0),
        ShramN => since(version, GsiVersion::V2_5, 0x2000, 4, 0),
        MapEeChVpTable => since(version, GsiVersion::V2_5, 0x3800, 0x80, 4),

        ChCntxt0 | ChCntxt1 | ChCntxt2 | ChCntxt3 | ChCntxt4 | ChCntxt5 | ChCntxt6
        | ChCntxt7 => at(b.ch + (v3_offset - 0x14000), LEGACY_EE, CH),
        ChCntxt8 => None,
        ChReFetchReadPtr => at(b.ch + 0x54, LEGACY_EE, CH),
        ChReFetchWritePtr => at(b.ch + 0x58, LEGACY_EE, CH),
        ChQos => at(b.ch + 0x5c, LEGACY_EE, CH),
        ChScratch0 => at(b.ch + 0x60, LEGACY_EE, CH),
        ChScratch1 => at(b.ch + 0x64, LEGACY_EE, CH),
        ChScratch2 => at(b.ch + 0x68, LEGACY_EE, CH),
        ChScratch3 => at(b.ch + 0x6c, LEGACY_EE, CH),
        ChScratch4 | ChScratch5 | ChScratch6 | ChScratch7 | ChScratch8 | ChScratch9 => None,

        EvCntxt0 | EvCntxt1 | EvCntxt2 | EvCntxt3 | EvCntxt4 | EvCntxt5 | EvCntxt6
        | EvCntxt7 | EvCntxt8 | EvCntxt9 | EvCntxt10 | EvCntxt11 | EvCntxt12 | EvCntxt13
        | EvScratch0 | EvScratch1 => at(b.ev + (v3_offset - 0x1c000), LEGACY_EE, CH),

        ChDoorbell0 | ChDoorbell1 => at(b.ch_db + (v3_offset - 0x24000), LEGACY_EE, DB),
        EvDoorbell0 | EvDoorbell1 => at(b.ev_db + (v3_offset - 0x24800), LEGACY_EE, DB),

        GsiStatus => at(b.ee, LEGACY_EE, 0),
        GsiChCmd => at(b.ee + 0x8, LEGACY_EE, 0),
        EvChCmd => at(b.ee + 0x10, LEGACY_EE, 0),
        EeGenericCmd => at(b.ee + 0x18, LEGACY_EE, 0),
        GsiHwParam => match version {
            GsiVersion::V1_0 => at(b.ee + 0x40, LEGACY_EE, 0),
            _ => None,
        },
        GsiHwParam2 => since(version, GsiVersion::V1_3, b.ee + 0x40, LEGACY_EE, 0),
        GsiSwVersion => at(b.ee + 0x44, LEGACY_EE, 0),
        GsiHwParam4 => None,
        CntxtTypeIrq => at(b.ee + 0x80, LEGACY_EE, 0),
        CntxtTypeIrqMsk => at(b.ee + 0x88, LEGACY_EE, 0),
        CntxtSrcGsiChIrq => at(b.ee + 0x90, LEGACY_EE, 0),
        CntxtSrcEvChIrq => at(b.ee + 0x94, LEGACY_EE, 0),
        CntxtSrcGsiChIrqMsk => at(b.ee + 0x98, LEGACY_EE, 0),
        CntxtSrcEvChIrqMsk => at(b.ee + 0x9c, LEGACY_EE, 0),
        CntxtSrcGsiChIrqClr => at(b.ee + 0xa0, LEGACY_EE, 0),
        CntxtSrcEvChIrqClr => at(b.ee + 0xa4, LEGACY_EE, 0),
        CntxtSrcIeobIrq => at(b.ee + 0xb0, LEGACY_EE, 0),
        CntxtSrcIeobIrqMsk => at(b.ee + 0xb8, LEGACY_EE, 0),
        CntxtSrcIeobIrqClr => at(b.ee + 0xc0, LEGACY_EE, 0),
        CntxtGlobIrqStts => at(b.ee + 0x100, LEGACY_EE, 0),
        CntxtGlobIrqEn => at(b.ee + 0x108, LEGACY_EE, 0),
        CntxtGlobIrqClr => at(b.ee + 0x110, LEGACY_EE, 0),
        CntxtGsiIrqStts => at(b.ee + 0x118, LEGACY_EE, 0),
        CntxtGsiIrqEn => at(b.ee + 0x120, LEGACY_EE, 0),
        CntxtGsiIrqClr => at(b.ee + 0x128, LEGACY_EE, 0),
        CntxtIntset => at(b.ee + 0x180, LEGACY_EE, 0),
        CntxtMsiBaseLsb => since(version, GsiVersion::V2_5, b.ee + 0x188, LEGACY_EE, 0),
        CntxtMsiBaseMsb => since(version, GsiVersion::V2_5, b.ee + 0x18c, LEGACY_EE, 0),
        ErrorLog => at(b.ee + 0x200, LEGACY_EE, 0),
        ErrorLogClr => at(b.ee + 0x210, LEGACY_EE, 0),
        CntxtScratch0 => at(b.ee + 0x400, LEGACY_EE, 0),

        InterEeSrcGsiChIrq => at(0xc018, INTER_EE, 0),
        InterEeSrcEvChIrq => at(0xc01c, INTER_EE, 0),
        InterEeSrcGsiChIrqClr => at(0xc028, INTER_EE, 0),
        InterEeSrcEvChIrqClr => at(0xc02c, INTER_EE, 0),
    }
}

/// The field layouts in [`crate::registers`] are those of v3.0. These
/// registers had a different layout before it.
const fn layout_changed_in_v3_0(reg: GsiReg) -> bool {
    matches!(
        reg,
        GsiReg::ChCntxt0
            | GsiReg::ChCntxt1
            | GsiReg::ChQos
            | GsiReg::EvCntxt0
            | GsiReg::EvCntxt1
            | GsiReg::EeGenericCmd
            | GsiReg::GsiHwParam2
            | GsiReg::GsiHwParam4
    )
}

impl GsiReg {
    /// Entry of `self` in the map of `version`.
    pub const fn obj(self, version: GsiVersion) -> RegObj {
        let v3 = self.v3_0();
        if version.at_least(GsiVersion::V3_0) {
            return v3;
        }
        let fields = v3.fields
            && !layout_changed_in_v3_0(self)
            && !(matches!(self, GsiReg::GsiCfg) && !version.at_least(GsiVersion::V2_5));
        match legacy_location(self, version) {
            Some((offset, n_ofst, k_ofst)) => RegObj {
                offset: Some(offset),
                n_ofst,
                k_ofst,
                fields,
            },
            None => RegObj {
                offset: None,
                n_ofst: 0,
                k_ofst: 0,
                fields: false,
            },
        }
    }
}
