// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Decoding of the TLV payloads.
//!
//! Fixed layout TLVs are declared with `tlv_struct!`, which generates the
//! byte level decoder and encoder for the listed fields in order and a
//! `Display` implementation printing one `name = value` line per field. The
//! payloads are little-endian and have no padding, since every field is
//! either a word or a byte array whose length is a multiple of four.
//!
//! Variable length counter arrays are not copied, `U32Array` reads them in
//! place from the payload.

use core::fmt;

use crate::tags::{self, TlvTag};
use crate::tlv::Tlv;
use crate::HttError;

macro_rules! tlv_struct {
    (
        $(#[$attr_struct:meta])* $vis_struct:vis struct $name:ident { $($(#[$attr_field:meta])* $vis_field:vis $field:ident : $field_ty:tt),* $(,)? }
        ) => {
        $(#[$attr_struct])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis_struct struct $name {
            $($(#[$attr_field])* $vis_field $field : $field_ty),*,
        }

        impl $name {
            /// Size of the payload on the wire, without the TLV header.
            pub const SIZE: usize = 0 $(+ tlv_struct!(@size $field_ty))*;

            #[allow(unused_assignments)]
            pub fn from_bytes(__bytes: &[u8]) -> Result<Self, HttError> {
                if __bytes.len() < Self::SIZE {
                    return Err(HttError::Truncated);
                }
                let mut __len = 0;
                $(
                    tlv_struct!(@from_f __len, __bytes, $field, $field_ty);
                )*
                Ok(Self {
                    $($field),*
                })
            }

            #[allow(unused_assignments)]
            pub fn into_bytes(self) -> [u8; Self::SIZE] {
                let mut __bytes = [0u8; Self::SIZE];
                let mut __len = 0;
                $(
                    tlv_struct!(@f __len, __bytes, self.$field, $field_ty);
                )*
                __bytes
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(
                    tlv_struct!(@show f, stringify!($field), self.$field, $field_ty);
                )*
                Ok(())
            }
        }
    };

    (@size u32) => { 4 };
    (@size i32) => { 4 };
    (@size [u8; $N:literal]) => { $N };
    (@size [u32; $N:literal]) => { 4 * $N };

    // Inner macros for copying the bytes from the buffer into a field.
    (@from_f $len:ident, $bytes:ident, $field:ident, u32) => {
        let $field = u32::from_le_bytes([$bytes[$len], $bytes[$len + 1], $bytes[$len + 2], $bytes[$len + 3]]);
        $len += 4;
    };
    (@from_f $len:ident, $bytes:ident, $field:ident, i32) => {
        let $field = i32::from_le_bytes([$bytes[$len], $bytes[$len + 1], $bytes[$len + 2], $bytes[$len + 3]]);
        $len += 4;
    };
    (@from_f $len:ident, $bytes:ident, $field:ident, [u8; $N:literal]) => {
        let mut $field = [0u8; $N];
        $field.copy_from_slice(&$bytes[$len..$len + $N]);
        $len += $N;
    };
    (@from_f $len:ident, $bytes:ident, $field:ident, [u32; $N:literal]) => {
        let mut $field = [0u32; $N];
        for __word in $field.iter_mut() {
            *__word = u32::from_le_bytes([$bytes[$len], $bytes[$len + 1], $bytes[$len + 2], $bytes[$len + 3]]);
            $len += 4;
        }
    };

    // Inner macros for copying the field value to the bytes buffer.
    (@f $len:ident, $bytes:ident, $field:expr, u32) => {
        $bytes[$len..$len + 4].copy_from_slice(&$field.to_le_bytes());
        $len += 4;
    };
    (@f $len:ident, $bytes:ident, $field:expr, i32) => {
        $bytes[$len..$len + 4].copy_from_slice(&$field.to_le_bytes());
        $len += 4;
    };
    (@f $len:ident, $bytes:ident, $field:expr, [u8; $N:literal]) => {
        $bytes[$len..$len + $N].copy_from_slice(&$field);
        $len += $N;
    };
    (@f $len:ident, $bytes:ident, $field:expr, [u32; $N:literal]) => {
        for __word in $field.iter() {
            $bytes[$len..$len + 4].copy_from_slice(&__word.to_le_bytes());
            $len += 4;
        }
    };

    (@show $f:ident, $name:expr, $field:expr, u32) => {
        writeln!($f, "{} = {}", $name, $field)?;
    };
    (@show $f:ident, $name:expr, $field:expr, i32) => {
        writeln!($f, "{} = {}", $name, $field)?;
    };
    (@show $f:ident, $name:expr, $field:expr, [u8; $N:literal]) => {
        writeln!($f, "{} = {}", $name, Name(&$field))?;
    };
    (@show $f:ident, $name:expr, $field:expr, [u32; $N:literal]) => {
        writeln!($f, "{} = {}", $name, Counters($field.iter().copied()))?;
    };
}

/// NUL padded name as sent by the firmware.
struct Name<'a>(&'a [u8]);

impl fmt::Display for Name<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter().take_while(|&&b| b != 0) {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

/// Counters printed as `index:value` pairs.
struct Counters<I>(I);

impl<I: Iterator<Item = u32> + Clone> fmt::Display for Counters<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.clone().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", i, value)?;
        }
        Ok(())
    }
}

tlv_struct! {
    /// Common transmit counters of a physical device.
    pub struct TxPdevCmn {
        pub mac_id_word: u32,
        pub hw_queued: u32,
        pub hw_reaped: u32,
        pub underrun: u32,
        pub hw_paused: u32,
        pub hw_flush: u32,
        pub hw_filt: u32,
        pub tx_abort: u32,
        pub mpdu_requed: u32,
        pub tx_xretry: u32,
        pub data_rc: u32,
        pub mpdu_dropped_xretry: u32,
        pub illgl_rate_phy_err: u32,
        pub cont_xretry: u32,
        pub tx_timeout: u32,
        pub pdev_resets: u32,
        pub phy_underrun: u32,
        pub txop_ovf: u32,
        pub seq_posted: u32,
        pub seq_failed_queueing: u32,
        pub seq_completed: u32,
        pub seq_restarted: u32,
        pub mu_seq_posted: u32,
        pub seq_switch_hw_paused: u32,
        pub next_seq_posted_dsr: u32,
        pub seq_posted_isr: u32,
        pub seq_ctrl_cached: u32,
        pub mpdu_count_tqm: u32,
        pub msdu_count_tqm: u32,
        pub mpdu_removed_tqm: u32,
        pub msdu_removed_tqm: u32,
        pub mpdus_sw_flush: u32,
        pub mpdus_hw_filter: u32,
        pub mpdus_truncated: u32,
        pub mpdus_ack_failed: u32,
        pub mpdus_expired: u32,
        pub mpdus_seq_hw_retry: u32,
        pub ack_tlv_proc: u32,
        pub coex_abort_mpdu_cnt_valid: u32,
        pub coex_abort_mpdu_cnt: u32,
        pub num_total_ppdus_tried_ota: u32,
        pub num_data_ppdus_tried_ota: u32,
    }
}

tlv_struct! {
    pub struct TxHwqCmn {
        pub mac_id_hwq_id_word: u32,
        pub xretry: u32,
        pub underrun_cnt: u32,
        pub flush_cnt: u32,
        pub filt_cnt: u32,
        pub null_mpdu_bmap: u32,
        pub user_ack_failure: u32,
        pub ack_tlv_proc: u32,
        pub sched_id_proc: u32,
        pub null_mpdu_tx_count: u32,
        pub mpdu_bmap_not_recvd: u32,
        pub num_bar: u32,
        pub rts: u32,
        pub cts2self: u32,
        pub qos_null: u32,
        pub mpdu_tried_cnt: u32,
        pub mpdu_queued_cnt: u32,
        pub mpdu_ack_fail_cnt: u32,
        pub mpdu_filt_cnt: u32,
        pub false_mpdu_ack_count: u32,
    }
}

tlv_struct! {
    pub struct HwqMuMimoSch {
        pub mu_mimo_sch_posted: u32,
        pub mu_mimo_sch_failed: u32,
        pub mu_mimo_ppdu_posted: u32,
    }
}

tlv_struct! {
    /// Per user MU-MIMO MPDU counters of a hardware queue.
    pub struct HwqMuMimoMpdu {
        pub mu_mimo_mpdus_queued_usr: u32,
        pub mu_mimo_mpdus_tried_usr: u32,
        pub mu_mimo_mpdus_failed_usr: u32,
        pub mu_mimo_mpdus_requeued_usr: u32,
        pub mu_mimo_err_no_ba_usr: u32,
        pub mu_mimo_mpdu_underrun_usr: u32,
        pub mu_mimo_ampdu_underrun_usr: u32,
    }
}

tlv_struct! {
    pub struct HwqMuMimoCmn {
        pub mac_id_hwq_id_word: u32,
    }
}

tlv_struct! {
    pub struct HwIntrMisc {
        pub hw_intr_name: [u8; 8],
        pub mask: u32,
        pub count: u32,
    }
}

tlv_struct! {
    pub struct HwWdTimeout {
        pub hw_module_name: [u8; 8],
        pub count: u32,
    }
}

tlv_struct! {
    pub struct HwPdevErrs {
        pub mac_id_word: u32,
        pub tx_abort: u32,
        pub tx_abort_fail_count: u32,
        pub rx_abort: u32,
        pub rx_abort_fail_count: u32,
        pub warm_reset: u32,
        pub cold_reset: u32,
        pub tx_flush: u32,
        pub tx_glb_reset: u32,
        pub tx_txq_reset: u32,
        pub rx_timeout_reset: u32,
    }
}

tlv_struct! {
    pub struct WhalTx {
        pub mac_id_word: u32,
        pub last_unpause_ppdu_id: u32,
        pub hwsch_unpause_wait_tqm_write: u32,
        pub hwsch_dummy_tlv_skipped: u32,
        pub hwsch_misaligned_offset_received: u32,
        pub hwsch_reset_count: u32,
        pub hwsch_dev_reset_war: u32,
        pub hwsch_delayed_pause: u32,
        pub hwsch_long_delayed_pause: u32,
        pub sch_rx_ppdu_no_response: u32,
        pub sch_selfgen_response: u32,
        pub sch_rx_sifs_resp_trigger: u32,
    }
}

tlv_struct! {
    pub struct MsduFlow {
        pub last_update_timestamp: u32,
        pub last_add_timestamp: u32,
        pub last_remove_timestamp: u32,
        pub total_processed_msdu_count: u32,
        pub cur_msdu_count_in_flowq: u32,
        pub sw_peer_id: u32,
        pub tx_flow_no_tid_num_drop_rule: u32,
    }
}

tlv_struct! {
    pub struct TxTidDetails {
        pub tid_name: [u8; 8],
        pub sw_peer_id_tid_num: u32,
        pub num_sched_pending_num_ppdu_in_hwq: u32,
        pub tid_flags: u32,
        pub hw_queued: u32,
        pub hw_reaped: u32,
        pub mpdus_hw_filter: u32,
        pub qdepth_bytes: u32,
        pub qdepth_num_msdu: u32,
        pub qdepth_num_mpdu: u32,
        pub last_scheduled_tsmp: u32,
        pub pause_module_id: u32,
        pub block_module_id: u32,
        pub tid_tx_airtime: u32,
    }
}

tlv_struct! {
    // The receive side puts the peer word before the name.
    pub struct RxTidDetails {
        pub sw_peer_id_tid_num: u32,
        pub tid_name: [u8; 8],
        pub dup_in_reorder: u32,
        pub dup_past_outside_window: u32,
        pub dup_past_within_window: u32,
        pub rxdesc_err_decrypt: u32,
        pub tid_rx_airtime: u32,
    }
}

tlv_struct! {
    pub struct Counter {
        pub counter_name: [u8; 8],
        pub count: u32,
    }
}

tlv_struct! {
    pub struct PeerStatsCmn {
        pub ppdu_cnt: u32,
        pub mpdu_cnt: u32,
        pub msdu_cnt: u32,
        pub pause_bitmap: u32,
        pub block_bitmap: u32,
        pub current_timestamp: u32,
        /// Cumulative, in seconds.
        pub peer_tx_airtime: u32,
        /// Cumulative, in seconds.
        pub peer_rx_airtime: u32,
        /// dBm.
        pub rssi: i32,
    }
}

tlv_struct! {
    pub struct PeerDetails {
        pub peer_type: u32,
        pub sw_peer_id: u32,
        pub vdev_pdev_ast_idx: u32,
        pub mac_addr_l32: u32,
        pub mac_addr_h16: u32,
        pub peer_flags: u32,
        pub qpeer_flags: u32,
    }
}

tlv_struct! {
    /// Transmit rate histograms of one peer. `tx_gi` holds the four guard
    /// interval rows of MCS counters one after the other.
    pub struct TxPeerRate {
        pub tx_ldpc: u32,
        pub rts_cnt: u32,
        pub ack_rssi: u32,
        pub tx_mcs: [u32; 12],
        pub tx_su_mcs: [u32; 12],
        pub tx_mu_mcs: [u32; 12],
        pub tx_nss: [u32; 8],
        pub tx_bw: [u32; 4],
        pub tx_stbc: [u32; 12],
        pub tx_pream: [u32; 7],
        pub tx_gi: [u32; 48],
        pub tx_dcm: [u32; 5],
    }
}

impl TxPdevCmn {
    pub fn mac_id(&self) -> u32 {
        self.mac_id_word & 0xff
    }
}

impl HwPdevErrs {
    pub fn mac_id(&self) -> u32 {
        self.mac_id_word & 0xff
    }
}

impl WhalTx {
    pub fn mac_id(&self) -> u32 {
        self.mac_id_word & 0xff
    }
}

impl TxHwqCmn {
    pub fn mac_id(&self) -> u32 {
        self.mac_id_hwq_id_word & 0xff
    }

    pub fn hwq_id(&self) -> u32 {
        (self.mac_id_hwq_id_word & 0xff00) >> 8
    }
}

impl HwqMuMimoCmn {
    pub fn mac_id(&self) -> u32 {
        self.mac_id_hwq_id_word & 0xff
    }

    pub fn hwq_id(&self) -> u32 {
        (self.mac_id_hwq_id_word & 0xff00) >> 8
    }
}

impl MsduFlow {
    pub fn tx_flow_no(&self) -> u32 {
        self.tx_flow_no_tid_num_drop_rule & 0xffff
    }

    pub fn tid_num(&self) -> u32 {
        (self.tx_flow_no_tid_num_drop_rule & 0x000f_0000) >> 16
    }

    pub fn drop_rule(&self) -> bool {
        self.tx_flow_no_tid_num_drop_rule & (1 << 20) != 0
    }
}

impl TxTidDetails {
    pub fn sw_peer_id(&self) -> u32 {
        self.sw_peer_id_tid_num & 0xffff
    }

    pub fn tid_num(&self) -> u32 {
        (self.sw_peer_id_tid_num & 0xffff_0000) >> 16
    }

    pub fn num_sched_pending(&self) -> u32 {
        self.num_sched_pending_num_ppdu_in_hwq & 0xff
    }

    pub fn num_ppdu_in_hwq(&self) -> u32 {
        (self.num_sched_pending_num_ppdu_in_hwq & 0xff00) >> 8
    }
}

impl RxTidDetails {
    pub fn sw_peer_id(&self) -> u32 {
        self.sw_peer_id_tid_num & 0xffff
    }

    pub fn tid_num(&self) -> u32 {
        (self.sw_peer_id_tid_num & 0xffff_0000) >> 16
    }
}

impl PeerDetails {
    pub fn vdev_id(&self) -> u32 {
        self.vdev_pdev_ast_idx & 0xff
    }

    pub fn pdev_id(&self) -> u32 {
        (self.vdev_pdev_ast_idx & 0xff00) >> 8
    }

    pub fn ast_idx(&self) -> u32 {
        (self.vdev_pdev_ast_idx & 0xffff_0000) >> 16
    }

    pub fn mac_addr(&self) -> [u8; 6] {
        let l = self.mac_addr_l32.to_le_bytes();
        let h = self.mac_addr_h16.to_le_bytes();
        [l[0], l[1], l[2], l[3], h[0], h[1]]
    }
}

/// A counter array TLV, read in place.
///
/// The firmware may send fewer entries than the array can hold. Entries past
/// the maximum known for the tag are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct U32Array<'a> {
    name: &'static str,
    words: &'a [u8],
    max: usize,
}

impl<'a> U32Array<'a> {
    pub fn new(name: &'static str, payload: &'a [u8], max: usize) -> Result<U32Array<'a>, HttError> {
        if payload.len() % 4 != 0 {
            return Err(HttError::InvalidLength);
        }
        Ok(U32Array {
            name,
            words: payload,
            max,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        (self.words.len() / 4).min(self.max)
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        if index >= self.len() {
            return None;
        }
        let b = &self.words[index * 4..index * 4 + 4];
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + Clone + 'a {
        let len = self.len();
        self.words[..len * 4]
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl fmt::Display for U32Array<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} = {}", self.name, Counters(self.iter()))
    }
}

/// DIFS latency histogram of a hardware queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifsLatency<'a> {
    pub hist_intvl: u32,
    pub hist: U32Array<'a>,
}

impl<'a> DifsLatency<'a> {
    pub fn from_bytes(payload: &'a [u8]) -> Result<DifsLatency<'a>, HttError> {
        if payload.len() < 4 {
            return Err(HttError::Truncated);
        }
        Ok(DifsLatency {
            hist_intvl: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            hist: U32Array::new(
                "difs_latency_hist",
                &payload[4..],
                tags::TX_HWQ_MAX_DIFS_LATENCY_BINS,
            )?,
        })
    }
}

impl fmt::Display for DifsLatency<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hist_intvl = {}", self.hist_intvl)?;
        fmt::Display::fmt(&self.hist, f)
    }
}

/// Free text sent by the firmware, NUL padded to a word boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringTlv<'a> {
    pub data: &'a [u8],
}

impl StringTlv<'_> {
    /// Length of the text, without the padding.
    pub fn text_len(&self) -> usize {
        self.data.iter().position(|&b| b == 0).unwrap_or(self.data.len())
    }
}

impl fmt::Display for StringTlv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "data = {}", Name(self.data))
    }
}

/// A decoded TLV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stats<'a> {
    TxPdevCmn(TxPdevCmn),
    /// Underrun, flush, SIFS, PHY error, SIFS histogram and the hardware
    /// queue command and FES counters.
    Array(U32Array<'a>),
    String(StringTlv<'a>),
    TxHwqCmn(TxHwqCmn),
    DifsLatency(DifsLatency<'a>),
    HwqMuMimoSch(HwqMuMimoSch),
    HwqMuMimoMpdu(HwqMuMimoMpdu),
    HwqMuMimoCmn(HwqMuMimoCmn),
    HwIntrMisc(HwIntrMisc),
    HwWdTimeout(HwWdTimeout),
    HwPdevErrs(HwPdevErrs),
    WhalTx(WhalTx),
    MsduFlow(MsduFlow),
    TxTidDetails(TxTidDetails),
    RxTidDetails(RxTidDetails),
    Counter(Counter),
    PeerStatsCmn(PeerStatsCmn),
    PeerDetails(PeerDetails),
    TxPeerRate(TxPeerRate),
    /// A TLV without a decoder, payload untouched.
    Raw { tag: TlvTag, payload: &'a [u8] },
}

impl<'a> Stats<'a> {
    pub fn decode(tlv: &Tlv<'a>) -> Result<Stats<'a>, HttError> {
        let p = tlv.payload;
        let stats = match tlv.tag {
            TlvTag::TxPdevCmn => Stats::TxPdevCmn(TxPdevCmn::from_bytes(p)?),
            TlvTag::TxPdevUnderrun => {
                Stats::Array(U32Array::new("urrn_stats", p, tags::MAX_URRN_STATS)?)
            }
            TlvTag::TxPdevSifs => Stats::Array(U32Array::new(
                "sifs_status",
                p,
                tags::MAX_SIFS_BURST_STATS,
            )?),
            TlvTag::TxPdevFlush => Stats::Array(U32Array::new(
                "flush_errs",
                p,
                tags::MAX_FLUSH_REASON_STATS,
            )?),
            TlvTag::TxPdevPhyErr => {
                Stats::Array(U32Array::new("phy_errs", p, tags::MAX_PHY_ERR_STATS)?)
            }
            TlvTag::TxPdevSifsHist => Stats::Array(U32Array::new(
                "sifs_hist_status",
                p,
                tags::MAX_SIFS_BURST_HIST_STATS,
            )?),
            TlvTag::String => Stats::String(StringTlv { data: p }),
            TlvTag::TxHwqCmn => Stats::TxHwqCmn(TxHwqCmn::from_bytes(p)?),
            TlvTag::TxHwqDifsLatency => Stats::DifsLatency(DifsLatency::from_bytes(p)?),
            TlvTag::TxHwqCmdResult => Stats::Array(U32Array::new(
                "cmd_result",
                p,
                tags::TX_HWQ_MAX_CMD_RESULT_STATS,
            )?),
            TlvTag::TxHwqCmdStall => Stats::Array(U32Array::new(
                "cmd_stall_status",
                p,
                tags::TX_HWQ_MAX_CMD_STALL_STATS,
            )?),
            TlvTag::TxHwqFesStatus => Stats::Array(U32Array::new(
                "fes_result",
                p,
                tags::TX_HWQ_MAX_FES_RESULT_STATS,
            )?),
            TlvTag::TxHwqMumimoSchStats => Stats::HwqMuMimoSch(HwqMuMimoSch::from_bytes(p)?),
            TlvTag::TxHwqMumimoMpduStats => Stats::HwqMuMimoMpdu(HwqMuMimoMpdu::from_bytes(p)?),
            TlvTag::TxHwqMumimoCmnStats => Stats::HwqMuMimoCmn(HwqMuMimoCmn::from_bytes(p)?),
            TlvTag::HwIntrMisc => Stats::HwIntrMisc(HwIntrMisc::from_bytes(p)?),
            TlvTag::HwWdTimeout => Stats::HwWdTimeout(HwWdTimeout::from_bytes(p)?),
            TlvTag::HwPdevErrs => Stats::HwPdevErrs(HwPdevErrs::from_bytes(p)?),
            TlvTag::WhalTx => Stats::WhalTx(WhalTx::from_bytes(p)?),
            TlvTag::PeerMsduFlowq => Stats::MsduFlow(MsduFlow::from_bytes(p)?),
            TlvTag::TxTidDetails => Stats::TxTidDetails(TxTidDetails::from_bytes(p)?),
            TlvTag::RxTidDetails => Stats::RxTidDetails(RxTidDetails::from_bytes(p)?),
            TlvTag::CounterName => Stats::Counter(Counter::from_bytes(p)?),
            TlvTag::PeerStatsCmn => Stats::PeerStatsCmn(PeerStatsCmn::from_bytes(p)?),
            TlvTag::PeerDetails => Stats::PeerDetails(PeerDetails::from_bytes(p)?),
            TlvTag::PeerTxRateStats => Stats::TxPeerRate(TxPeerRate::from_bytes(p)?),
            tag => Stats::Raw { tag, payload: p },
        };
        Ok(stats)
    }
}

impl fmt::Display for Stats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stats::TxPdevCmn(s) => fmt::Display::fmt(s, f),
            Stats::Array(s) => fmt::Display::fmt(s, f),
            Stats::String(s) => fmt::Display::fmt(s, f),
            Stats::TxHwqCmn(s) => fmt::Display::fmt(s, f),
            Stats::DifsLatency(s) => fmt::Display::fmt(s, f),
            Stats::HwqMuMimoSch(s) => fmt::Display::fmt(s, f),
            Stats::HwqMuMimoMpdu(s) => fmt::Display::fmt(s, f),
            Stats::HwqMuMimoCmn(s) => fmt::Display::fmt(s, f),
            Stats::HwIntrMisc(s) => fmt::Display::fmt(s, f),
            Stats::HwWdTimeout(s) => fmt::Display::fmt(s, f),
            Stats::HwPdevErrs(s) => fmt::Display::fmt(s, f),
            Stats::WhalTx(s) => fmt::Display::fmt(s, f),
            Stats::MsduFlow(s) => fmt::Display::fmt(s, f),
            Stats::TxTidDetails(s) => fmt::Display::fmt(s, f),
            Stats::RxTidDetails(s) => fmt::Display::fmt(s, f),
            Stats::Counter(s) => fmt::Display::fmt(s, f),
            Stats::PeerStatsCmn(s) => fmt::Display::fmt(s, f),
            Stats::PeerDetails(s) => fmt::Display::fmt(s, f),
            Stats::TxPeerRate(s) => fmt::Display::fmt(s, f),
            Stats::Raw { tag, payload } => writeln!(f, "{} = {} bytes", tag, payload.len()),
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::string::ToString;

    use super::*;
    use crate::tlv::{write_tlv, TlvIter};

    fn words(values: &[u32]) -> std::vec::Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(TxPdevCmn::SIZE, 42 * 4);
        assert_eq!(TxHwqCmn::SIZE, 20 * 4);
        assert_eq!(HwqMuMimoSch::SIZE, 12);
        assert_eq!(HwqMuMimoMpdu::SIZE, 28);
        assert_eq!(HwqMuMimoCmn::SIZE, 4);
        assert_eq!(HwIntrMisc::SIZE, 16);
        assert_eq!(HwWdTimeout::SIZE, 12);
        assert_eq!(HwPdevErrs::SIZE, 44);
        assert_eq!(WhalTx::SIZE, 48);
        assert_eq!(MsduFlow::SIZE, 28);
        assert_eq!(TxTidDetails::SIZE, 60);
        assert_eq!(RxTidDetails::SIZE, 32);
        assert_eq!(Counter::SIZE, 12);
        assert_eq!(PeerStatsCmn::SIZE, 36);
        assert_eq!(PeerDetails::SIZE, 28);
        assert_eq!(TxPeerRate::SIZE, 123 * 4);
        assert_eq!(
            TxPeerRate::SIZE,
            4 * (3
                + 4 * tags::TX_PEER_STATS_NUM_MCS_COUNTERS
                + tags::TX_PEER_STATS_NUM_SPATIAL_STREAMS
                + tags::TX_PEER_STATS_NUM_BW_COUNTERS
                + tags::TX_PEER_STATS_NUM_PREAMBLE_TYPES
                + tags::TX_PEER_STATS_NUM_GI_COUNTERS * tags::TX_PEER_STATS_NUM_MCS_COUNTERS
                + tags::TX_PEER_STATS_NUM_DCM_COUNTERS)
        );
    }

    #[test]
    fn pdev_cmn_fields() {
        let mut values = [0u32; 42];
        for (i, v) in values.iter_mut().enumerate() {
            *v = i as u32;
        }
        values[0] = 0x1234_5602;
        let cmn = TxPdevCmn::from_bytes(&words(&values)).unwrap();
        assert_eq!(cmn.mac_id(), 2);
        assert_eq!(cmn.hw_queued, 1);
        assert_eq!(cmn.tx_xretry, 9);
        assert_eq!(cmn.num_data_ppdus_tried_ota, 41);
        assert_eq!(&cmn.into_bytes()[..], &words(&values)[..]);
    }

    #[test]
    fn short_payload_is_truncated() {
        assert_eq!(
            HwPdevErrs::from_bytes(&[0u8; 40]),
            Err(HttError::Truncated)
        );
        assert_eq!(DifsLatency::from_bytes(&[0u8; 3]), Err(HttError::Truncated));
        let tlv = Tlv {
            tag: TlvTag::PeerDetails,
            payload: &[0u8; 8],
        };
        assert_eq!(Stats::decode(&tlv), Err(HttError::Truncated));
    }

    #[test]
    fn packed_words() {
        let flow = MsduFlow::from_bytes(&words(&[0, 0, 0, 0, 0, 7, 0x0013_0042])).unwrap();
        assert_eq!(flow.tx_flow_no(), 0x42);
        assert_eq!(flow.tid_num(), 3);
        assert!(flow.drop_rule());

        let mut tid = [0u8; 60];
        tid[..3].copy_from_slice(b"BE\0");
        tid[8..12].copy_from_slice(&0x0005_0011u32.to_le_bytes());
        tid[12..16].copy_from_slice(&0x0000_0304u32.to_le_bytes());
        let tx = TxTidDetails::from_bytes(&tid).unwrap();
        assert_eq!(tx.sw_peer_id(), 0x11);
        assert_eq!(tx.tid_num(), 5);
        assert_eq!(tx.num_sched_pending(), 4);
        assert_eq!(tx.num_ppdu_in_hwq(), 3);

        let mut rx = [0u8; 32];
        rx[..4].copy_from_slice(&0x0006_0022u32.to_le_bytes());
        rx[4..6].copy_from_slice(b"VI");
        let rx = RxTidDetails::from_bytes(&rx).unwrap();
        assert_eq!(rx.sw_peer_id(), 0x22);
        assert_eq!(rx.tid_num(), 6);
        assert_eq!(&rx.tid_name[..2], b"VI");

        let hwq = TxHwqCmn::from_bytes(&[0x01u8, 0x0a, 0, 0].repeat(20)).unwrap();
        assert_eq!(hwq.mac_id(), 1);
        assert_eq!(hwq.hwq_id(), 10);
    }

    #[test]
    fn peer_details() {
        let details = PeerDetails::from_bytes(&words(&[
            1,
            0x33,
            0x0102_0304,
            0xddcc_bbaa,
            0x0000_ffee,
            0,
            0,
        ]))
        .unwrap();
        assert_eq!(details.vdev_id(), 4);
        assert_eq!(details.pdev_id(), 3);
        assert_eq!(details.ast_idx(), 0x0102);
        assert_eq!(details.mac_addr(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn arrays_are_capped() {
        let payload = words(&[1, 2, 3, 4, 5]);
        let tlv = Tlv {
            tag: TlvTag::TxPdevUnderrun,
            payload: &payload,
        };
        match Stats::decode(&tlv).unwrap() {
            Stats::Array(a) => {
                assert_eq!(a.len(), tags::MAX_URRN_STATS);
                assert_eq!(a.get(2), Some(3));
                assert_eq!(a.get(3), None);
                assert_eq!(a.to_string(), "urrn_stats = 0:1, 1:2, 2:3\n");
            }
            other => panic!("unexpected {:?}", other),
        }

        let odd = Tlv {
            tag: TlvTag::TxHwqCmdStall,
            payload: &[0u8; 6],
        };
        assert_eq!(Stats::decode(&odd), Err(HttError::InvalidLength));
    }

    #[test]
    fn difs_latency() {
        let payload = words(&[500, 9, 8]);
        let difs = DifsLatency::from_bytes(&payload).unwrap();
        assert_eq!(difs.hist_intvl, 500);
        assert_eq!(difs.hist.len(), 2);
        assert_eq!(
            difs.to_string(),
            "hist_intvl = 500\ndifs_latency_hist = 0:9, 1:8\n"
        );
    }

    #[test]
    fn display_names_and_values() {
        let mut payload = [0u8; 12];
        payload[..6].copy_from_slice(b"rx_ok\0");
        payload[8..].copy_from_slice(&77u32.to_le_bytes());
        let counter = Counter::from_bytes(&payload).unwrap();
        assert_eq!(counter.to_string(), "counter_name = rx_ok\ncount = 77\n");

        let misc = HwIntrMisc {
            hw_intr_name: *b"WDOG\x01\0\0\0",
            mask: 3,
            count: 1,
        };
        assert_eq!(
            misc.to_string(),
            "hw_intr_name = WDOG.\nmask = 3\ncount = 1\n"
        );

        let s = StringTlv {
            data: b"fw 1.2\0\0",
        };
        assert_eq!(s.text_len(), 6);
        assert_eq!(s.to_string(), "data = fw 1.2\n");
    }

    #[test]
    fn decode_stream() {
        let mut buf = [0u8; 256];
        let errs = HwPdevErrs {
            mac_id_word: 1,
            tx_abort: 2,
            tx_abort_fail_count: 0,
            rx_abort: 0,
            rx_abort_fail_count: 0,
            warm_reset: 5,
            cold_reset: 1,
            tx_flush: 0,
            tx_glb_reset: 0,
            tx_txq_reset: 0,
            rx_timeout_reset: 0,
        };
        let mut len = write_tlv(&mut buf, TlvTag::HwPdevErrs, &errs.into_bytes()).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::SfmCmn, &[0xaa; 8]).unwrap();

        let mut iter = TlvIter::new(&buf[..len]);
        let first = Stats::decode(&iter.next().unwrap().unwrap()).unwrap();
        assert_eq!(first, Stats::HwPdevErrs(errs));
        let second = Stats::decode(&iter.next().unwrap().unwrap()).unwrap();
        assert_eq!(
            second,
            Stats::Raw {
                tag: TlvTag::SfmCmn,
                payload: &[0xaa; 8]
            }
        );
        assert_eq!(second.to_string(), "sfm_cmn = 8 bytes\n");
        assert!(iter.next().is_none());
    }

    #[test]
    fn peer_rate_layout() {
        let mut values = [0u32; 123];
        values[3] = 10; // tx_mcs[0]
        values[3 + 36 + 8 + 4 + 12 + 7 + 12] = 20; // tx_gi[1][0]
        values[122] = 30; // tx_dcm[4]
        let rate = TxPeerRate::from_bytes(&words(&values)).unwrap();
        assert_eq!(rate.tx_mcs[0], 10);
        assert_eq!(rate.tx_gi[12], 20);
        assert_eq!(rate.tx_dcm[4], 30);
    }
}
