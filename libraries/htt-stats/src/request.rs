// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Host requests for extended stats.
//!
//! A request is a stats type and four configuration words whose meaning
//! depends on the type.

use crate::tags::StatsType;
use crate::HttError;

/// How the firmware gathers peer stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PeerStatsReqMode {
    NoQuery = 0,
    QueryTqm = 1,
    FlushTqm = 2,
}

/// Bits of the peer TLV mask, selecting which TLVs the firmware sends back.
pub mod peer_tlv {
    pub const CMN: u32 = 1 << 0;
    pub const DETAILS: u32 = 1 << 1;
    pub const TX_RATE: u32 = 1 << 2;
    pub const RX_RATE: u32 = 1 << 3;
    pub const TX_TID: u32 = 1 << 4;
    pub const RX_TID: u32 = 1 << 5;
    pub const MSDU_FLOW: u32 = 1 << 6;

    pub const ALL: u32 = CMN | DETAILS | TX_RATE | RX_RATE | TX_TID | RX_TID | MSDU_FLOW;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerId {
    SwPeerId(u16),
    MacAddr([u8; 6]),
}

const IS_MAC_ADDR: u32 = 0x0000_0001;
const REQ_MODE_MASK: u32 = 0x0000_fffe;
const REQ_MODE_SHIFT: u32 = 1;
const SW_PEER_ID_SHIFT: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerInfoRequest {
    pub peer: PeerId,
    pub mode: PeerStatsReqMode,
    /// Bits from `peer_tlv`.
    pub tlv_mask: u32,
}

impl PeerInfoRequest {
    pub fn config_params(&self) -> [u32; 4] {
        let mut param0 = ((self.mode as u32) << REQ_MODE_SHIFT) & REQ_MODE_MASK;
        let (param2, param3) = match self.peer {
            PeerId::SwPeerId(id) => {
                param0 |= u32::from(id) << SW_PEER_ID_SHIFT;
                (0, 0)
            }
            PeerId::MacAddr(mac) => {
                param0 |= IS_MAC_ADDR;
                (
                    u32::from_le_bytes([mac[0], mac[1], mac[2], mac[3]]),
                    u32::from_le_bytes([mac[4], mac[5], 0, 0]),
                )
            }
        };
        [param0, self.tlv_mask, param2, param3]
    }
}

/// A stats request as sent to the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsRequest {
    pub stats_type: StatsType,
    pub config: [u32; 4],
}

impl StatsRequest {
    /// Request for a stats type without parameters.
    pub fn new(stats_type: StatsType) -> StatsRequest {
        StatsRequest {
            stats_type,
            config: [0; 4],
        }
    }

    /// Request for the hardware queues in `hwq_mask`.
    pub fn hwq(stats_type: StatsType, hwq_mask: u32) -> StatsRequest {
        StatsRequest {
            stats_type,
            config: [hwq_mask, 0, 0, 0],
        }
    }

    pub fn peer_info(request: &PeerInfoRequest) -> StatsRequest {
        StatsRequest {
            stats_type: StatsType::PeerInfo,
            config: request.config_params(),
        }
    }

    /// Reset the stats of the given types. The mask words are relative to
    /// the lowest type.
    pub fn reset(types: &[StatsType]) -> Result<StatsRequest, HttError> {
        let start = match types.iter().map(|&t| t as u32).min() {
            Some(start) => start,
            None => return Err(HttError::InvalidLength),
        };
        let mut config = [start, 0, 0, 0];
        for &t in types {
            let bit = t as u32 - start;
            config[1 + (bit / 32) as usize] |= 1 << (bit % 32);
        }
        Ok(StatsRequest {
            stats_type: StatsType::Reset,
            config,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn peer_by_id() {
        let req = PeerInfoRequest {
            peer: PeerId::SwPeerId(0x1234),
            mode: PeerStatsReqMode::QueryTqm,
            tlv_mask: peer_tlv::CMN | peer_tlv::TX_TID,
        };
        assert_eq!(req.config_params(), [0x1234_0002, 0x11, 0, 0]);
    }

    #[test]
    fn peer_by_mac() {
        let req = PeerInfoRequest {
            peer: PeerId::MacAddr([0x00, 0x03, 0x7f, 0x12, 0x34, 0x56]),
            mode: PeerStatsReqMode::FlushTqm,
            tlv_mask: peer_tlv::ALL,
        };
        let request = StatsRequest::peer_info(&req);
        assert_eq!(request.stats_type, StatsType::PeerInfo);
        assert_eq!(request.config, [0x0000_0005, 0x7f, 0x127f_0300, 0x0000_5634]);
    }

    #[test]
    fn reset_bitmask() {
        let req = StatsRequest::reset(&[StatsType::PdevTx, StatsType::PeerInfo]).unwrap();
        assert_eq!(req.stats_type, StatsType::Reset);
        assert_eq!(req.config, [1, 0x401, 0, 0]);
        assert_eq!(StatsRequest::reset(&[]), Err(HttError::InvalidLength));
        assert_eq!(
            StatsRequest::hwq(StatsType::PdevTxHwq, 0x3).config,
            [3, 0, 0, 0]
        );
    }
}
