// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Stats types the host can request and the tags of the TLVs the firmware
//! answers with.

use core::fmt;

use crate::HttError;

pub const MAX_STRING_SZ32: usize = 4;
pub const MACID_INVALID: u32 = 0xff;

pub const MAX_URRN_STATS: usize = 3;
pub const MAX_FLUSH_REASON_STATS: usize = 71;
pub const MAX_SIFS_BURST_STATS: usize = 9;
pub const MAX_PHY_ERR_STATS: usize = 18;
pub const MAX_SIFS_BURST_HIST_STATS: usize = 10;

pub const TX_HWQ_MAX_DIFS_LATENCY_BINS: usize = 10;
pub const TX_HWQ_MAX_CMD_RESULT_STATS: usize = 13;
pub const TX_HWQ_MAX_CMD_STALL_STATS: usize = 5;
pub const TX_HWQ_MAX_FES_RESULT_STATS: usize = 10;

pub const MAX_HW_INTR_NAME_LEN: usize = 8;
pub const MAX_HW_MODULE_NAME_LEN: usize = 8;
pub const MAX_TID_NAME_LEN: usize = 8;
pub const MAX_COUNTER_NAME_LEN: usize = 8;

pub const TX_PEER_STATS_NUM_MCS_COUNTERS: usize = 12;
pub const TX_PEER_STATS_NUM_GI_COUNTERS: usize = 4;
pub const TX_PEER_STATS_NUM_DCM_COUNTERS: usize = 5;
pub const TX_PEER_STATS_NUM_BW_COUNTERS: usize = 4;
pub const TX_PEER_STATS_NUM_SPATIAL_STREAMS: usize = 8;
pub const TX_PEER_STATS_NUM_PREAMBLE_TYPES: usize = 7;

/// Extended stats types, the `stats_type` of a host request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatsType {
    Reset = 0,
    PdevTx = 1,
    PdevRx = 2,
    PdevTxHwq = 3,
    PdevTxSched = 4,
    PdevError = 5,
    PdevTqm = 6,
    TqmCmdq = 7,
    TxDeInfo = 8,
    PdevTxRate = 9,
    PdevRxRate = 10,
    PeerInfo = 11,
    TxSelfgenInfo = 12,
    TxMuHwq = 13,
    RingIfInfo = 14,
    SrngInfo = 15,
    SfmInfo = 16,
    PdevTxMu = 17,
    ActivePeersList = 18,
}

impl TryFrom<u32> for StatsType {
    type Error = HttError;

    fn try_from(value: u32) -> Result<StatsType, HttError> {
        let stats_type = match value {
            0 => StatsType::Reset,
            1 => StatsType::PdevTx,
            2 => StatsType::PdevRx,
            3 => StatsType::PdevTxHwq,
            4 => StatsType::PdevTxSched,
            5 => StatsType::PdevError,
            6 => StatsType::PdevTqm,
            7 => StatsType::TqmCmdq,
            8 => StatsType::TxDeInfo,
            9 => StatsType::PdevTxRate,
            10 => StatsType::PdevRxRate,
            11 => StatsType::PeerInfo,
            12 => StatsType::TxSelfgenInfo,
            13 => StatsType::TxMuHwq,
            14 => StatsType::RingIfInfo,
            15 => StatsType::SrngInfo,
            16 => StatsType::SfmInfo,
            17 => StatsType::PdevTxMu,
            18 => StatsType::ActivePeersList,
            _ => return Err(HttError::InvalidTag(value)),
        };
        Ok(stats_type)
    }
}

macro_rules! tlv_tags {
    ($($variant:ident = $value:literal => $name:literal),* $(,)?) => {
        /// Tag of a TLV in a stats response.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum TlvTag {
            $($variant,)*
            /// A tag this crate has no name for, kept as received.
            Unknown(u16),
        }

        impl TlvTag {
            /// Number of tags with a name.
            pub const COUNT: usize = [$($value),*].len();

            pub const fn from_raw(raw: u16) -> TlvTag {
                match raw {
                    $($value => TlvTag::$variant,)*
                    _ => TlvTag::Unknown(raw),
                }
            }

            pub const fn raw(&self) -> u16 {
                match self {
                    $(TlvTag::$variant => $value,)*
                    TlvTag::Unknown(raw) => *raw,
                }
            }

            pub const fn name(&self) -> &'static str {
                match self {
                    $(TlvTag::$variant => $name,)*
                    TlvTag::Unknown(_) => "unknown",
                }
            }
        }
    };
}

tlv_tags! {
    TxPdevCmn = 0 => "tx_pdev_cmn",
    TxPdevUnderrun = 1 => "tx_pdev_underrun",
    TxPdevSifs = 2 => "tx_pdev_sifs",
    TxPdevFlush = 3 => "tx_pdev_flush",
    TxPdevPhyErr = 4 => "tx_pdev_phy_err",
    String = 5 => "string",
    TxHwqCmn = 6 => "tx_hwq_cmn",
    TxHwqDifsLatency = 7 => "tx_hwq_difs_latency",
    TxHwqCmdResult = 8 => "tx_hwq_cmd_result",
    TxHwqCmdStall = 9 => "tx_hwq_cmd_stall",
    TxHwqFesStatus = 10 => "tx_hwq_fes_status",
    TxTqmGenMpdu = 11 => "tx_tqm_gen_mpdu",
    TxTqmListMpdu = 12 => "tx_tqm_list_mpdu",
    TxTqmListMpduCnt = 13 => "tx_tqm_list_mpdu_cnt",
    TxTqmCmn = 14 => "tx_tqm_cmn",
    TxTqmPdev = 15 => "tx_tqm_pdev",
    TxTqmCmdqStatus = 16 => "tx_tqm_cmdq_status",
    TxDeEapolPackets = 17 => "tx_de_eapol_packets",
    TxDeClassifyFailed = 18 => "tx_de_classify_failed",
    TxDeClassifyStats = 19 => "tx_de_classify_stats",
    TxDeClassifyStatus = 20 => "tx_de_classify_status",
    TxDeEnqueuePackets = 21 => "tx_de_enqueue_packets",
    TxDeEnqueueDiscard = 22 => "tx_de_enqueue_discard",
    TxDeCmn = 23 => "tx_de_cmn",
    RingIf = 24 => "ring_if",
    TxPdevMuMimoStats = 25 => "tx_pdev_mu_mimo_stats",
    SfmCmn = 26 => "sfm_cmn",
    SringStats = 27 => "sring_stats",
    RxPdevFwStats = 28 => "rx_pdev_fw_stats",
    RxPdevFwRingMpduErr = 29 => "rx_pdev_fw_ring_mpdu_err",
    RxPdevFwMpduDrop = 30 => "rx_pdev_fw_mpdu_drop",
    RxSocFwStats = 31 => "rx_soc_fw_stats",
    RxSocFwRefillRingEmpty = 32 => "rx_soc_fw_refill_ring_empty",
    RxSocFwRefillRingNumRefill = 33 => "rx_soc_fw_refill_ring_num_refill",
    TxPdevRateStats = 34 => "tx_pdev_rate_stats",
    RxPdevRateStats = 35 => "rx_pdev_rate_stats",
    TxPdevSchedulerTxqStats = 36 => "tx_pdev_scheduler_txq_stats",
    TxSchedCmn = 37 => "tx_sched_cmn",
    TxPdevMumimoMpduStats = 38 => "tx_pdev_mumimo_mpdu_stats",
    SchedTxqCmdPosted = 39 => "sched_txq_cmd_posted",
    RingIfCmn = 40 => "ring_if_cmn",
    SfmClientUser = 41 => "sfm_client_user",
    SfmClient = 42 => "sfm_client",
    TxTqmErrorStats = 43 => "tx_tqm_error_stats",
    SchedTxqCmdReaped = 44 => "sched_txq_cmd_reaped",
    SringCmn = 45 => "sring_cmn",
    TxSelfgenAcErrStats = 46 => "tx_selfgen_ac_err_stats",
    TxSelfgenCmnStats = 47 => "tx_selfgen_cmn_stats",
    TxSelfgenAcStats = 48 => "tx_selfgen_ac_stats",
    TxSelfgenAxStats = 49 => "tx_selfgen_ax_stats",
    TxSelfgenAxErrStats = 50 => "tx_selfgen_ax_err_stats",
    TxHwqMumimoSchStats = 51 => "tx_hwq_mumimo_sch_stats",
    TxHwqMumimoMpduStats = 52 => "tx_hwq_mumimo_mpdu_stats",
    TxHwqMumimoCmnStats = 53 => "tx_hwq_mumimo_cmn_stats",
    HwIntrMisc = 54 => "hw_intr_misc",
    HwWdTimeout = 55 => "hw_wd_timeout",
    HwPdevErrs = 56 => "hw_pdev_errs",
    CounterName = 57 => "counter_name",
    TxTidDetails = 58 => "tx_tid_details",
    RxTidDetails = 59 => "rx_tid_details",
    PeerStatsCmn = 60 => "peer_stats_cmn",
    PeerDetails = 61 => "peer_details",
    PeerTxRateStats = 62 => "peer_tx_rate_stats",
    PeerRxRateStats = 63 => "peer_rx_rate_stats",
    PeerMsduFlowq = 64 => "peer_msdu_flowq",
    TxDeComplStats = 65 => "tx_de_compl_stats",
    WhalTx = 66 => "whal_tx",
    TxPdevSifsHist = 67 => "tx_pdev_sifs_hist",
}

/// Tags are 12 bits wide on the wire, anything wider cannot be a tag.
impl TryFrom<u32> for TlvTag {
    type Error = HttError;

    fn try_from(value: u32) -> Result<TlvTag, HttError> {
        if value > 0xfff {
            return Err(HttError::InvalidTag(value));
        }
        Ok(TlvTag::from_raw(value as u16))
    }
}

impl fmt::Display for TlvTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlvTag::Unknown(raw) => write!(f, "unknown({})", raw),
            tag => f.write_str(tag.name()),
        }
    }
}
