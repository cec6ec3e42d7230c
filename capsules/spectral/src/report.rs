// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Gen3 spectral reports.
//!
//! A phyerr event of gen3 hardware starts with a report header naming what
//! follows. Only search FFT reports are decoded, as a 24 byte header and
//! then one magnitude byte per FFT bin. At 160 MHz the secondary 80 MHz
//! segment follows as a second search FFT report of the same length.
//!
//! ```text
//!  0       4       6     7     8      12     16     20     24
//!  +-------+-------+-----+-----+------+------+------+------+------...
//!  | tstamp| length| tag | sig | hdr_a| hdr_b| hdr_c| resv | bins
//!  +-------+-------+-----+-----+------+------+------+------+------...
//! ```
//!
//! `length` counts 32 bit words from `hdr_a` to the end of the bins.

use tock_registers::{register_bitfields, LocalRegisterCopy};

/// Length of the search FFT report header preceding the bins.
pub const FFT_REPORT_HEADER_LEN: usize = 24;

pub const PHYERR_SIGNATURE_GEN3: u8 = 0xfa;
pub const TAG_SUMMARY_REPORT_GEN3: u8 = 0x02;
pub const TAG_SEARCH_FFT_REPORT_GEN3: u8 = 0x03;

const HDR_LENGTH_POS: usize = 4;
const HDR_TAG_POS: usize = 6;
const HDR_SIG_POS: usize = 7;
const HDR_A_POS: usize = 8;
const HDR_B_POS: usize = 12;
const HDR_C_POS: usize = 16;

/// Bytes in front of `hdr_a`, not counted by the length field.
const HDR_UNCOUNTED_LEN: usize = 8;
/// Header bytes counted by the length field.
const HDR_COUNTED_LEN: usize = FFT_REPORT_HEADER_LEN - HDR_UNCOUNTED_LEN;

register_bitfields![u32,
    FFT_HDR_A [
        DETECTOR_ID OFFSET(0) NUMBITS(2) [],
        FFT_NUM OFFSET(2) NUMBITS(3) [],
        RADAR_CHECK OFFSET(5) NUMBITS(12) [],
        PEAK_SIDX OFFSET(17) NUMBITS(11) [],
        CHN_IDX OFFSET(28) NUMBITS(3) []
    ],
    FFT_HDR_B [
        BASE_PWR_DB OFFSET(0) NUMBITS(9) [],
        TOTAL_GAIN_DB OFFSET(9) NUMBITS(8) []
    ],
    FFT_HDR_C [
        NUM_STR_BINS_IB OFFSET(0) NUMBITS(8) [],
        PEAK_MAG OFFSET(8) NUMBITS(10) [],
        AVGPWR_DB OFFSET(18) NUMBITS(7) [],
        RELPWR_DB OFFSET(25) NUMBITS(7) []
    ]
];

/// Why a report was dropped. Each maps to one of the diag counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportError {
    /// Not a gen3 spectral report.
    Signature,
    /// The length field or the data is too short for a search FFT report.
    Truncated,
    /// The primary report does not come from segment 0.
    Seg1IdMismatch,
    /// The data has no room for exactly one secondary 80 MHz report.
    Sec80InsuffLen,
    /// What follows the primary report is not a search FFT report.
    NoSec80Sfft,
    /// The secondary report does not come from segment 1.
    Seg2IdMismatch,
}

/// The decoded header fields of a search FFT report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchFftInfo {
    pub timestamp: u32,
    pub fft_detector_id: u8,
    pub fft_num: u8,
    pub fft_radar_check: u16,
    pub fft_peak_sidx: i16,
    pub fft_chn_idx: u8,
    pub fft_base_pwr_db: u16,
    pub fft_total_gain_db: u8,
    pub fft_num_str_bins_ib: u8,
    pub fft_peak_mag: i16,
    pub fft_avgpwr_db: u8,
    pub fft_relpwr_db: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchFft<'a> {
    pub info: SearchFftInfo,
    pub bins: &'a [u8],
}

/// One FFT of the channel. `sec80` is only present at 160 MHz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FftSample<'a> {
    pub primary: SearchFft<'a>,
    pub sec80: Option<SearchFft<'a>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gen3Report<'a> {
    SearchFft(FftSample<'a>),
    /// Spectral summary reports carry nothing the driver uses.
    Summary,
    Unknown(u8),
}

/// Sign extend the low `bits` bits of `value`.
fn to_signed(value: u32, bits: u32) -> i16 {
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as i16
}

fn le_u32(header: &[u8; FFT_REPORT_HEADER_LEN], pos: usize) -> u32 {
    u32::from_le_bytes([
        header[pos],
        header[pos + 1],
        header[pos + 2],
        header[pos + 3],
    ])
}

/// Decode the search FFT report at the start of `data`, returning it with
/// the number of bytes it covers.
fn search_fft(data: &[u8]) -> Result<(SearchFft<'_>, usize), ReportError> {
    let header: &[u8; FFT_REPORT_HEADER_LEN] = data
        .get(..FFT_REPORT_HEADER_LEN)
        .and_then(|header| header.try_into().ok())
        .ok_or(ReportError::Truncated)?;

    let counted_len = usize::from(u16::from_le_bytes([
        header[HDR_LENGTH_POS],
        header[HDR_LENGTH_POS + 1],
    ])) * 4;
    if counted_len < HDR_COUNTED_LEN {
        return Err(ReportError::Truncated);
    }
    let report_len = counted_len + HDR_UNCOUNTED_LEN;
    let bins = data
        .get(FFT_REPORT_HEADER_LEN..report_len)
        .ok_or(ReportError::Truncated)?;

    let a = LocalRegisterCopy::<u32, FFT_HDR_A::Register>::new(le_u32(header, HDR_A_POS));
    let b = LocalRegisterCopy::<u32, FFT_HDR_B::Register>::new(le_u32(header, HDR_B_POS));
    let c = LocalRegisterCopy::<u32, FFT_HDR_C::Register>::new(le_u32(header, HDR_C_POS));
    let info = SearchFftInfo {
        timestamp: le_u32(header, 0),
        fft_detector_id: a.read(FFT_HDR_A::DETECTOR_ID) as u8,
        fft_num: a.read(FFT_HDR_A::FFT_NUM) as u8,
        fft_radar_check: a.read(FFT_HDR_A::RADAR_CHECK) as u16,
        fft_peak_sidx: to_signed(a.read(FFT_HDR_A::PEAK_SIDX), 11),
        fft_chn_idx: a.read(FFT_HDR_A::CHN_IDX) as u8,
        fft_base_pwr_db: b.read(FFT_HDR_B::BASE_PWR_DB) as u16,
        fft_total_gain_db: b.read(FFT_HDR_B::TOTAL_GAIN_DB) as u8,
        fft_num_str_bins_ib: c.read(FFT_HDR_C::NUM_STR_BINS_IB) as u8,
        fft_peak_mag: to_signed(c.read(FFT_HDR_C::PEAK_MAG), 10),
        fft_avgpwr_db: c.read(FFT_HDR_C::AVGPWR_DB) as u8,
        fft_relpwr_db: c.read(FFT_HDR_C::RELPWR_DB) as u8,
    };
    Ok((SearchFft { info, bins }, report_len))
}

fn search_fft_sample(data: &[u8], with_sec80: bool) -> Result<FftSample<'_>, ReportError> {
    let (primary, report_len) = search_fft(data)?;
    if primary.info.fft_detector_id != 0 {
        return Err(ReportError::Seg1IdMismatch);
    }
    if !with_sec80 {
        return Ok(FftSample {
            primary,
            sec80: None,
        });
    }

    if data.len() != 2 * report_len {
        return Err(ReportError::Sec80InsuffLen);
    }
    let rest = data.get(report_len..).ok_or(ReportError::Sec80InsuffLen)?;
    if rest.get(HDR_SIG_POS) != Some(&PHYERR_SIGNATURE_GEN3) {
        return Err(ReportError::Signature);
    }
    if rest.get(HDR_TAG_POS) != Some(&TAG_SEARCH_FFT_REPORT_GEN3) {
        return Err(ReportError::NoSec80Sfft);
    }
    let (secondary, _) = search_fft(rest)?;
    if secondary.info.fft_detector_id != 1 {
        return Err(ReportError::Seg2IdMismatch);
    }
    Ok(FftSample {
        primary,
        sec80: Some(secondary),
    })
}

/// Decode the phyerr data of a gen3 spectral event. `with_sec80` expects a
/// secondary 80 MHz report behind a search FFT report.
pub fn parse_gen3(data: &[u8], with_sec80: bool) -> Result<Gen3Report<'_>, ReportError> {
    let (tag, sig) = match (data.get(HDR_TAG_POS), data.get(HDR_SIG_POS)) {
        (Some(&tag), Some(&sig)) => (tag, sig),
        _ => return Err(ReportError::Signature),
    };
    if sig != PHYERR_SIGNATURE_GEN3 {
        return Err(ReportError::Signature);
    }
    match tag {
        TAG_SEARCH_FFT_REPORT_GEN3 => {
            search_fft_sample(data, with_sec80).map(Gen3Report::SearchFft)
        }
        TAG_SUMMARY_REPORT_GEN3 => Ok(Gen3Report::Summary),
        other => Ok(Gen3Report::Unknown(other)),
    }
}
