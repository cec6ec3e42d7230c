// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! TLV framing of a stats response.
//!
//! Every TLV starts with a little-endian header word:
//!
//! ```text
//!  31      24 23          12 11           0
//! +----------+--------------+--------------+
//! | reserved |    length    |     tag      |
//! +----------+--------------+--------------+
//! ```
//!
//! `length` counts the payload bytes that follow the header.

use tracing::warn;

use crate::tags::TlvTag;
use crate::HttError;

pub const TLV_HDR_SIZE: usize = 4;
pub const TLV_MAX_LEN: usize = 0xfff;

const TAG_MASK: u32 = 0x0000_0fff;
const LENGTH_MASK: u32 = 0x00ff_f000;
const LENGTH_SHIFT: u32 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlvHeader {
    pub tag: u16,
    pub length: u16,
}

impl TlvHeader {
    pub const fn from_word(word: u32) -> TlvHeader {
        TlvHeader {
            tag: (word & TAG_MASK) as u16,
            length: ((word & LENGTH_MASK) >> LENGTH_SHIFT) as u16,
        }
    }

    pub const fn to_word(&self) -> u32 {
        ((self.length as u32) << LENGTH_SHIFT) & LENGTH_MASK | (self.tag as u32 & TAG_MASK)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<TlvHeader, HttError> {
        match bytes.get(..TLV_HDR_SIZE) {
            Some(b) => Ok(TlvHeader::from_word(u32::from_le_bytes([
                b[0], b[1], b[2], b[3],
            ]))),
            None => Err(HttError::Truncated),
        }
    }
}

/// One TLV of a stats response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: TlvTag,
    pub payload: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn len(&self) -> usize {
        self.payload.len()
    }
}

/// Iterator over the TLVs of a buffer.
///
/// Iteration ends at the end of the buffer or at a TLV of length zero, which
/// the firmware uses as padding. A TLV that claims more bytes than the buffer
/// holds is reported once as `HttError::Truncated` and ends the iteration.
pub struct TlvIter<'a> {
    buf: &'a [u8],
    done: bool,
}

impl<'a> TlvIter<'a> {
    pub fn new(buf: &'a [u8]) -> TlvIter<'a> {
        TlvIter { buf, done: false }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }
}

impl<'a> Iterator for TlvIter<'a> {
    type Item = Result<Tlv<'a>, HttError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.buf.is_empty() {
            return None;
        }

        let header = match TlvHeader::from_bytes(self.buf) {
            Ok(header) => header,
            Err(e) => {
                warn!(left = self.buf.len(), "partial TLV header");
                self.done = true;
                return Some(Err(e));
            }
        };
        if header.length == 0 {
            self.done = true;
            return None;
        }

        let end = TLV_HDR_SIZE + header.length as usize;
        match self.buf.get(TLV_HDR_SIZE..end) {
            Some(payload) => {
                self.buf = &self.buf[end..];
                Some(Ok(Tlv {
                    tag: TlvTag::from_raw(header.tag),
                    payload,
                }))
            }
            None => {
                warn!(
                    tag = header.tag,
                    length = header.length,
                    left = self.buf.len() - TLV_HDR_SIZE,
                    "TLV overruns buffer"
                );
                self.done = true;
                Some(Err(HttError::Truncated))
            }
        }
    }
}

/// Write a TLV with `payload` at the start of `buf`. Returns the number of
/// bytes written.
pub fn write_tlv(buf: &mut [u8], tag: TlvTag, payload: &[u8]) -> Result<usize, HttError> {
    if payload.len() > TLV_MAX_LEN {
        return Err(HttError::InvalidLength);
    }
    let end = TLV_HDR_SIZE + payload.len();
    if buf.len() < end {
        return Err(HttError::Truncated);
    }
    let header = TlvHeader {
        tag: tag.raw(),
        length: payload.len() as u16,
    };
    buf[..TLV_HDR_SIZE].copy_from_slice(&header.to_word().to_le_bytes());
    buf[TLV_HDR_SIZE..end].copy_from_slice(payload);
    Ok(end)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_fields() {
        let header = TlvHeader::from_word(0xab03_c03d);
        assert_eq!(header.tag, 0x03d);
        assert_eq!(header.length, 0x03c);
        // Reserved bits are dropped.
        assert_eq!(header.to_word(), 0x0003_c03d);
    }

    #[test]
    fn walks_stream() {
        let mut buf = [0u8; 32];
        let mut len = write_tlv(&mut buf, TlvTag::CounterName, &[1; 12]).unwrap();
        len += write_tlv(&mut buf[len..], TlvTag::Unknown(200), &[2; 4]).unwrap();

        let mut iter = TlvIter::new(&buf[..len]);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.tag, TlvTag::CounterName);
        assert_eq!(first.len(), 12);
        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.tag, TlvTag::Unknown(200));
        assert_eq!(second.payload, &[2u8; 4]);
        assert!(iter.next().is_none());
    }

    #[test]
    fn stops_at_zero_length() {
        let mut buf = [0u8; 24];
        let len = write_tlv(&mut buf, TlvTag::String, &[0x41; 4]).unwrap();
        // Padding after the first TLV, then garbage that must not be read.
        buf[len + 4] = 0xff;
        let tlvs: usize = TlvIter::new(&buf).filter(|t| t.is_ok()).count();
        assert_eq!(tlvs, 1);
    }

    #[test]
    fn overrun_reported_once() {
        let mut buf = [0u8; 16];
        buf[..4].copy_from_slice(&TlvHeader { tag: 5, length: 64 }.to_word().to_le_bytes());
        let mut iter = TlvIter::new(&buf);
        assert_eq!(iter.next(), Some(Err(HttError::Truncated)));
        assert_eq!(iter.next(), None);

        let mut iter = TlvIter::new(&buf[..3]);
        assert_eq!(iter.next(), Some(Err(HttError::Truncated)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn write_checks_space() {
        let mut buf = [0u8; 8];
        assert_eq!(
            write_tlv(&mut buf, TlvTag::String, &[0; 8]),
            Err(HttError::Truncated)
        );
        let big = [0u8; TLV_MAX_LEN + 1];
        let mut out = [0u8; TLV_MAX_LEN + 8];
        assert_eq!(
            write_tlv(&mut out, TlvTag::String, &big),
            Err(HttError::InvalidLength)
        );
    }
}
