// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Summary of one or more stats responses.

use core::fmt;

use tracing::{debug, warn};

use crate::stats::Stats;
use crate::tags::TlvTag;
use crate::tlv::{Tlv, TlvIter};
use crate::HttError;

/// Airtime seen for one peer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerAirtime {
    pub sw_peer_id: u16,
    pub mac_addr: [u8; 6],
    /// Seconds, from the peer common TLV.
    pub tx_airtime: u64,
    pub rx_airtime: u64,
    /// Sum over the TIDs of the peer.
    pub tid_tx_airtime: u64,
    pub tid_rx_airtime: u64,
}

/// Counters folded from a TLV stream.
///
/// Pdev totals are summed over every `TxPdevCmn` seen, so feeding the
/// responses of several MACs gives the device total. Peer records are kept
/// in arrival order, up to `PEERS`.
pub struct StatsAggregate<const PEERS: usize = 16> {
    tag_counts: [u32; TlvTag::COUNT],
    unknown: u32,
    tlv_bitmap: u64,
    decode_errors: u32,

    pub hw_queued: u64,
    pub hw_reaped: u64,
    pub underrun: u64,
    pub tx_abort: u64,
    pub mpdu_requed: u64,
    pub tx_xretry: u64,

    pub warm_resets: u64,
    pub cold_resets: u64,

    peers: [PeerAirtime; PEERS],
    num_peers: usize,
    dropped_peers: u32,
    // Peer the next peer stats TLV belongs to.
    current_peer: Option<usize>,
}

impl<const PEERS: usize> StatsAggregate<PEERS> {
    pub fn new() -> StatsAggregate<PEERS> {
        StatsAggregate {
            tag_counts: [0; TlvTag::COUNT],
            unknown: 0,
            tlv_bitmap: 0,
            decode_errors: 0,
            hw_queued: 0,
            hw_reaped: 0,
            underrun: 0,
            tx_abort: 0,
            mpdu_requed: 0,
            tx_xretry: 0,
            warm_resets: 0,
            cold_resets: 0,
            peers: [PeerAirtime::default(); PEERS],
            num_peers: 0,
            dropped_peers: 0,
            current_peer: None,
        }
    }

    /// Number of TLVs seen with `tag`.
    pub fn count(&self, tag: TlvTag) -> u32 {
        match tag {
            TlvTag::Unknown(_) => self.unknown,
            tag => self.tag_counts[tag.raw() as usize],
        }
    }

    /// Bit `n` is set if a TLV with tag `n` was seen. Tags above 63 are
    /// counted but not in the bitmap.
    pub fn tlv_bitmap(&self) -> u64 {
        self.tlv_bitmap
    }

    pub fn decode_errors(&self) -> u32 {
        self.decode_errors
    }

    pub fn peers(&self) -> &[PeerAirtime] {
        &self.peers[..self.num_peers]
    }

    pub fn peer(&self, sw_peer_id: u16) -> Option<&PeerAirtime> {
        self.peers().iter().find(|p| p.sw_peer_id == sw_peer_id)
    }

    /// Peers that did not fit in the table.
    pub fn dropped_peers(&self) -> u32 {
        self.dropped_peers
    }

    fn peer_slot(&mut self, sw_peer_id: u16) -> Option<usize> {
        if let Some(i) = self.peers().iter().position(|p| p.sw_peer_id == sw_peer_id) {
            return Some(i);
        }
        if self.num_peers == PEERS {
            warn!(sw_peer_id, "peer table full");
            self.dropped_peers += 1;
            return None;
        }
        let i = self.num_peers;
        self.peers[i] = PeerAirtime {
            sw_peer_id,
            ..PeerAirtime::default()
        };
        self.num_peers += 1;
        Some(i)
    }

    pub fn add_tlv(&mut self, tlv: &Tlv<'_>) {
        match tlv.tag {
            TlvTag::Unknown(_) => self.unknown += 1,
            tag => {
                let raw = tag.raw() as usize;
                self.tag_counts[raw] += 1;
                if raw < 64 {
                    self.tlv_bitmap |= 1 << raw;
                }
            }
        }

        let stats = match Stats::decode(tlv) {
            Ok(stats) => stats,
            Err(e) => {
                debug!(tag = tlv.tag.raw(), len = tlv.len(), "undecodable TLV: {}", e);
                self.decode_errors += 1;
                return;
            }
        };

        match stats {
            Stats::TxPdevCmn(cmn) => {
                self.hw_queued += u64::from(cmn.hw_queued);
                self.hw_reaped += u64::from(cmn.hw_reaped);
                self.underrun += u64::from(cmn.underrun);
                self.tx_abort += u64::from(cmn.tx_abort);
                self.mpdu_requed += u64::from(cmn.mpdu_requed);
                self.tx_xretry += u64::from(cmn.tx_xretry);
            }
            Stats::HwPdevErrs(errs) => {
                self.warm_resets += u64::from(errs.warm_reset);
                self.cold_resets += u64::from(errs.cold_reset);
            }
            Stats::PeerDetails(details) => {
                self.current_peer = self.peer_slot(details.sw_peer_id as u16);
                if let Some(i) = self.current_peer {
                    self.peers[i].mac_addr = details.mac_addr();
                }
            }
            Stats::PeerStatsCmn(cmn) => {
                if let Some(i) = self.current_peer {
                    self.peers[i].tx_airtime += u64::from(cmn.peer_tx_airtime);
                    self.peers[i].rx_airtime += u64::from(cmn.peer_rx_airtime);
                }
            }
            Stats::TxTidDetails(tid) => {
                if let Some(i) = self.peer_slot(tid.sw_peer_id() as u16) {
                    self.peers[i].tid_tx_airtime += u64::from(tid.tid_tx_airtime);
                }
            }
            Stats::RxTidDetails(tid) => {
                if let Some(i) = self.peer_slot(tid.sw_peer_id() as u16) {
                    self.peers[i].tid_rx_airtime += u64::from(tid.tid_rx_airtime);
                }
            }
            _ => {}
        }
    }

    /// Fold every TLV of `buf`. TLVs before a framing error are kept.
    pub fn add_stream(&mut self, buf: &[u8]) -> Result<(), HttError> {
        for tlv in TlvIter::new(buf) {
            self.add_tlv(&tlv?);
        }
        Ok(())
    }
}

impl<const PEERS: usize> Default for StatsAggregate<PEERS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const PEERS: usize> fmt::Display for StatsAggregate<PEERS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tlv_bitmap = {:#018x}", self.tlv_bitmap)?;
        for (raw, &count) in self.tag_counts.iter().enumerate() {
            if count != 0 {
                writeln!(f, "{} = {}", TlvTag::from_raw(raw as u16), count)?;
            }
        }
        if self.unknown != 0 {
            writeln!(f, "unknown = {}", self.unknown)?;
        }
        if self.decode_errors != 0 {
            writeln!(f, "decode_errors = {}", self.decode_errors)?;
        }
        writeln!(f, "hw_queued = {}", self.hw_queued)?;
        writeln!(f, "hw_reaped = {}", self.hw_reaped)?;
        writeln!(f, "underrun = {}", self.underrun)?;
        writeln!(f, "tx_abort = {}", self.tx_abort)?;
        writeln!(f, "mpdu_requed = {}", self.mpdu_requed)?;
        writeln!(f, "tx_xretry = {}", self.tx_xretry)?;
        writeln!(f, "warm_resets = {}", self.warm_resets)?;
        writeln!(f, "cold_resets = {}", self.cold_resets)?;
        for p in self.peers() {
            let m = p.mac_addr;
            writeln!(
                f,
                "peer {} {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x} tx_airtime = {} rx_airtime = {} tid_tx_airtime = {} tid_rx_airtime = {}",
                p.sw_peer_id,
                m[0],
                m[1],
                m[2],
                m[3],
                m[4],
                m[5],
                p.tx_airtime,
                p.rx_airtime,
                p.tid_tx_airtime,
                p.tid_rx_airtime
            )?;
        }
        if self.dropped_peers != 0 {
            writeln!(f, "dropped_peers = {}", self.dropped_peers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stats::{HwPdevErrs, PeerDetails, PeerStatsCmn, TxPdevCmn};
    use crate::tlv::write_tlv;

    fn pdev_cmn(hw_queued: u32, tx_xretry: u32) -> [u8; TxPdevCmn::SIZE] {
        let mut bytes = [0u8; TxPdevCmn::SIZE];
        bytes[4..8].copy_from_slice(&hw_queued.to_le_bytes());
        bytes[36..40].copy_from_slice(&tx_xretry.to_le_bytes());
        bytes
    }

    fn peer(sw_peer_id: u32, mac_l32: u32) -> [u8; PeerDetails::SIZE] {
        PeerDetails {
            peer_type: 0,
            sw_peer_id,
            vdev_pdev_ast_idx: 0,
            mac_addr_l32: mac_l32,
            mac_addr_h16: 0x2211,
            peer_flags: 0,
            qpeer_flags: 0,
        }
        .into_bytes()
    }

    fn airtime(tx: u32, rx: u32) -> [u8; PeerStatsCmn::SIZE] {
        PeerStatsCmn {
            ppdu_cnt: 0,
            mpdu_cnt: 0,
            msdu_cnt: 0,
            pause_bitmap: 0,
            block_bitmap: 0,
            current_timestamp: 0,
            peer_tx_airtime: tx,
            peer_rx_airtime: rx,
            rssi: -40,
        }
        .into_bytes()
    }

    #[test]
    fn sums_pdev_counters() {
        let mut buf = [0u8; 512];
        let mut len = write_tlv(&mut buf, TlvTag::TxPdevCmn, &pdev_cmn(10, 2)).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::TxPdevCmn, &pdev_cmn(5, 1)).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::TxPdevUnderrun, &[0; 12]).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::Unknown(100), &[0; 4]).unwrap();

        let mut agg: StatsAggregate = StatsAggregate::new();
        assert_eq!(agg.add_stream(&buf[..len]), Ok(()));
        assert_eq!(agg.hw_queued, 15);
        assert_eq!(agg.tx_xretry, 3);
        assert_eq!(agg.count(TlvTag::TxPdevCmn), 2);
        assert_eq!(agg.count(TlvTag::TxPdevUnderrun), 1);
        assert_eq!(agg.count(TlvTag::Unknown(100)), 1);
        assert_eq!(agg.tlv_bitmap(), 0b11);
        assert_eq!(agg.decode_errors(), 0);
    }

    #[test]
    fn resets_and_bitmap_high_tags() {
        let errs = HwPdevErrs {
            mac_id_word: 0,
            tx_abort: 0,
            tx_abort_fail_count: 0,
            rx_abort: 0,
            rx_abort_fail_count: 0,
            warm_reset: 3,
            cold_reset: 1,
            tx_flush: 0,
            tx_glb_reset: 0,
            tx_txq_reset: 0,
            rx_timeout_reset: 0,
        };
        let mut buf = [0u8; 128];
        let mut len = write_tlv(&mut buf, TlvTag::HwPdevErrs, &errs.into_bytes()).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::WhalTx, &[0; 8]).unwrap();

        let mut agg: StatsAggregate = StatsAggregate::new();
        agg.add_stream(&buf[..len]).unwrap();
        assert_eq!(agg.warm_resets, 3);
        assert_eq!(agg.cold_resets, 1);
        // Tag 66 is counted, but does not fit in the bitmap.
        assert_eq!(agg.count(TlvTag::WhalTx), 1);
        assert_eq!(agg.tlv_bitmap(), 1 << 56);
        // The short WhalTx payload cannot be decoded.
        assert_eq!(agg.decode_errors(), 1);
    }

    #[test]
    fn peer_airtime_table() {
        let mut agg: StatsAggregate<2> = StatsAggregate::new();
        let mut buf = [0u8; 512];
        let mut len = 0;
        for id in 1..=3 {
            len += write_tlv(&mut buf[len..], TlvTag::PeerDetails, &peer(id, 0xddcc_bbaa)).unwrap();
            len += write_tlv(&mut buf[len..], TlvTag::PeerStatsCmn, &airtime(id * 10, id)).unwrap();
        }
        agg.add_stream(&buf[..len]).unwrap();

        assert_eq!(agg.peers().len(), 2);
        assert_eq!(agg.dropped_peers(), 1);
        let p = agg.peer(2).unwrap();
        assert_eq!(p.tx_airtime, 20);
        assert_eq!(p.rx_airtime, 2);
        assert_eq!(p.mac_addr, [0xaa, 0xbb, 0xcc, 0xdd, 0x11, 0x22]);
        assert!(agg.peer(3).is_none());

        // A second response for a known peer adds up.
        let len = write_tlv(&mut buf, TlvTag::PeerDetails, &peer(1, 0)).unwrap();
        let len = len + write_tlv(&mut buf[len..], TlvTag::PeerStatsCmn, &airtime(5, 5)).unwrap();
        agg.add_stream(&buf[..len]).unwrap();
        assert_eq!(agg.peer(1).unwrap().tx_airtime, 15);
    }

    #[test]
    fn framing_error_keeps_earlier_tlvs() {
        let mut buf = [0u8; 256];
        let len = write_tlv(&mut buf, TlvTag::TxPdevCmn, &pdev_cmn(7, 0)).unwrap();
        // Header claiming far more than what is left.
        buf[len..len + 4].copy_from_slice(&0x0010_0000u32.to_le_bytes());
        let mut agg: StatsAggregate = StatsAggregate::new();
        assert_eq!(agg.add_stream(&buf[..len + 8]), Err(HttError::Truncated));
        assert_eq!(agg.hw_queued, 7);
    }
}
