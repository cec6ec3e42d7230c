// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Spectral scan parameters.

use tracing::debug;

/// Chains times two, one noise floor per chain and segment.
pub const NF_ENTRIES: usize = 6;

/// Parameters of a spectral scan, in the units the firmware takes them.
///
/// Signed thresholds are stored as their two's complement `u16`, so the
/// default noise floor reference of -96 dBm is `0xffa0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpectralParams {
    pub fft_period: u16,
    /// Time between scans, in units of 256 us.
    pub period: u16,
    /// Number of reports before the scan stops, 0 for no limit.
    pub count: u16,
    pub short_report: u16,
    pub radar_bin_thresh_sel: u16,
    /// Priority of the scan over receive.
    pub spectral_pri: u16,
    /// log2 of the FFT length.
    pub fft_size: u16,
    pub gc_ena: u16,
    pub restart_ena: u16,
    pub noise_floor_ref: u16,
    pub init_delay: u16,
    pub nb_tone_thr: u16,
    pub str_bin_thr: u16,
    pub wb_rpt_mode: u16,
    pub rssi_rpt_mode: u16,
    pub rssi_thr: u16,
    pub pwr_format: u16,
    pub rpt_mode: u16,
    pub bin_scale: u16,
    pub dbm_adj: u16,
    pub chn_mask: u16,
    pub nf_cal: [i16; NF_ENTRIES],
    pub nf_pwr: [i16; NF_ENTRIES],
}

impl Default for SpectralParams {
    fn default() -> SpectralParams {
        SpectralParams {
            fft_period: 1,
            period: 35,
            count: 0,
            short_report: 1,
            radar_bin_thresh_sel: 0,
            spectral_pri: 1,
            fft_size: 7,
            gc_ena: 1,
            restart_ena: 0,
            noise_floor_ref: (-96i16) as u16,
            init_delay: 80,
            nb_tone_thr: 12,
            str_bin_thr: 8,
            wb_rpt_mode: 0,
            rssi_rpt_mode: 0,
            rssi_thr: (-16i16) as u16,
            pwr_format: 0,
            rpt_mode: 2,
            bin_scale: 1,
            dbm_adj: 1,
            // Chain 0 only.
            chn_mask: 1,
            nf_cal: [0; NF_ENTRIES],
            nf_pwr: [0; NF_ENTRIES],
        }
    }
}

/// Identifiers of the parameters settable with `set_param`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ParamId {
    FftPeriod = 1,
    ScanPeriod = 2,
    ScanCount = 3,
    ShortReport = 4,
    SpectPri = 5,
    FftSize = 6,
    GcEna = 7,
    RestartEna = 8,
    NoiseFloorRef = 9,
    InitDelay = 10,
    NbToneThr = 11,
    StrBinThr = 12,
    WbRptMode = 13,
    RssiRptMode = 14,
    RssiThr = 15,
    PwrFormat = 16,
    RptMode = 17,
    BinScale = 18,
    DbmAdj = 19,
    ChnMask = 20,
    /// State, not parameters. Accepted but ignored by `set_param`.
    Active = 21,
    Stop = 22,
    Enable = 23,
}

impl TryFrom<u32> for ParamId {
    type Error = u32;

    fn try_from(value: u32) -> Result<ParamId, u32> {
        let id = match value {
            1 => ParamId::FftPeriod,
            2 => ParamId::ScanPeriod,
            3 => ParamId::ScanCount,
            4 => ParamId::ShortReport,
            5 => ParamId::SpectPri,
            6 => ParamId::FftSize,
            7 => ParamId::GcEna,
            8 => ParamId::RestartEna,
            9 => ParamId::NoiseFloorRef,
            10 => ParamId::InitDelay,
            11 => ParamId::NbToneThr,
            12 => ParamId::StrBinThr,
            13 => ParamId::WbRptMode,
            14 => ParamId::RssiRptMode,
            15 => ParamId::RssiThr,
            16 => ParamId::PwrFormat,
            17 => ParamId::RptMode,
            18 => ParamId::BinScale,
            19 => ParamId::DbmAdj,
            20 => ParamId::ChnMask,
            21 => ParamId::Active,
            22 => ParamId::Stop,
            23 => ParamId::Enable,
            _ => return Err(value),
        };
        Ok(id)
    }
}

impl SpectralParams {
    /// Set one parameter. Flags are stored as 0 or 1 whatever the value,
    /// other values are truncated to 16 bits.
    pub fn set_param(&mut self, id: ParamId, value: u32) {
        let flag = u16::from(value != 0);
        let word = value as u16;
        match id {
            ParamId::FftPeriod => self.fft_period = word,
            ParamId::ScanPeriod => self.period = word,
            ParamId::ScanCount => self.count = word,
            ParamId::ShortReport => self.short_report = flag,
            ParamId::SpectPri => self.spectral_pri = flag,
            ParamId::FftSize => self.fft_size = word,
            ParamId::GcEna => self.gc_ena = flag,
            ParamId::RestartEna => self.restart_ena = flag,
            ParamId::NoiseFloorRef => self.noise_floor_ref = word,
            ParamId::InitDelay => self.init_delay = word,
            ParamId::NbToneThr => self.nb_tone_thr = word,
            ParamId::StrBinThr => self.str_bin_thr = word,
            ParamId::WbRptMode => self.wb_rpt_mode = flag,
            ParamId::RssiRptMode => self.rssi_rpt_mode = flag,
            ParamId::RssiThr => self.rssi_thr = word,
            ParamId::PwrFormat => self.pwr_format = flag,
            ParamId::RptMode => self.rpt_mode = word,
            ParamId::BinScale => self.bin_scale = word,
            ParamId::DbmAdj => self.dbm_adj = flag,
            ParamId::ChnMask => self.chn_mask = word,
            ParamId::Active | ParamId::Stop | ParamId::Enable => {
                debug!(?id, "not a scan parameter");
            }
        }
    }

    pub fn noise_floor_ref_dbm(&self) -> i16 {
        self.noise_floor_ref as i16
    }

    pub fn rssi_thr_dbm(&self) -> i16 {
        self.rssi_thr as i16
    }
}

/// Number of FFT bins for an `fft_size`, 0 if the size is not supported.
pub fn fft_bin_count(fft_size: u16) -> u32 {
    match fft_size {
        5 => 16,
        6 => 32,
        7 => 64,
        8 => 128,
        9 => 256,
        _ => 0,
    }
}
