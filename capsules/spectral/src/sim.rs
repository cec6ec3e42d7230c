// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Simulated spectral hardware.
//!
//! `SimOps` replays canned reports for each channel width, for testing the
//! controller and its clients without a radio. A scan only starts if the
//! configuration matches the one the reports were captured with. While a
//! scan runs, an alarm delivers the next report every `SIM_PERIOD_MS`.
//!
//! Each report set remembers where its replay stopped, so switching
//! configuration and back continues with the next report of the set.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let sim = static_init!(
//!     SimOps<'static, VirtualMuxAlarm<'static, Rtc>, NUM_REPORT_SETS>,
//!     SimOps::new(utils, vdev, sim_alarm)
//! );
//! sim_alarm.set_alarm_client(sim);
//! ```

use core::cell::Cell;

use tock_cells::optional_cell::OptionalCell;
use tracing::{debug, warn};

use crate::alarm::{Alarm, AlarmClient};
use crate::config::{fft_bin_count, SpectralParams};
use crate::error::SpectralError;
use crate::legacy::{ChannelWidth, SpectralUtils, VdevId};
use crate::ops::{
    Capability, ChanInfo, ChainRssi, PhyerrReport, ReportClient, RfQualInfo, SpectralOps,
};
use crate::report::FFT_REPORT_HEADER_LEN;

/// Milliseconds between simulated reports.
const SIM_PERIOD_MS: u32 = 1;

/// Search FFT report header captured from hardware.
const GEN3_HEADER: [u8; FFT_REPORT_HEADER_LEN] = [
    0x78, 0x56, 0x34, 0x12, 0x14, 0x00, 0x03, 0xfa, 0xe0, 0x00, 0xf6, 0x0f, 0xba, 0x2f, 0x00,
    0x00, 0x01, 0x2c, 0xb4, 0x20, 0x00, 0x00, 0x00, 0x00,
];

/// `segments` search FFT reports of equal length filling `N` bytes. Each is
/// the captured header, then a bin pattern rising towards DC. Segment `i`
/// reports detector id `i`.
const fn sim_report<const N: usize>(segments: usize) -> [u8; N] {
    let mut data = [0u8; N];
    let segment_len = N / segments;
    let bins = segment_len - FFT_REPORT_HEADER_LEN;
    // The length field counts words from the fifth header word on.
    let words = ((bins + FFT_REPORT_HEADER_LEN - 8) / 4) as u16;
    let mut i = 0;
    while i < N {
        let segment = i / segment_len;
        let pos = i % segment_len;
        data[i] = if pos < FFT_REPORT_HEADER_LEN {
            match pos {
                4 => words.to_le_bytes()[0],
                5 => words.to_le_bytes()[1],
                8 => GEN3_HEADER[8] | segment as u8,
                _ => GEN3_HEADER[pos],
            }
        } else {
            let bin = pos - FFT_REPORT_HEADER_LEN;
            let dist = if bin < bins / 2 { bins / 2 - bin } else { bin - bins / 2 };
            (0x40 - (dist * 0x30 / (bins / 2))) as u8
        };
        i += 1;
    }
    data
}

static REPORT_64: [u8; FFT_REPORT_HEADER_LEN + 64] = sim_report(1);
static REPORT_128: [u8; FFT_REPORT_HEADER_LEN + 128] = sim_report(1);
static REPORT_256: [u8; FFT_REPORT_HEADER_LEN + 256] = sim_report(1);
static REPORT_160: [u8; 2 * (FFT_REPORT_HEADER_LEN + 256)] = sim_report(2);

const SIM_RFQUAL: RfQualInfo = RfQualInfo {
    rssi_comb: 1,
    pc_rssi_info: [
        ChainRssi {
            rssi_pri20: 1,
            rssi_sec20: 128,
            rssi_sec40: 128,
            rssi_sec80: 128,
        },
        ChainRssi {
            rssi_pri20: 128,
            rssi_sec20: 128,
            rssi_sec40: 128,
            rssi_sec80: 128,
        },
        ChainRssi {
            rssi_pri20: 128,
            rssi_sec20: 128,
            rssi_sec40: 128,
            rssi_sec80: 128,
        },
        ChainRssi {
            rssi_pri20: 128,
            rssi_sec20: 128,
            rssi_sec40: 128,
            rssi_sec80: 128,
        },
    ],
    noise_floor: [-90; 4],
};

/// A captured report.
pub struct SimReport {
    pub data: &'static [u8],
    pub rfqual_info: RfQualInfo,
    pub chan_info: ChanInfo,
}

/// The reports captured at one channel width, and the configuration they
/// were captured with.
pub struct ReportSet {
    pub width: ChannelWidth,
    pub config: SpectralParams,
    pub reports: &'static [SimReport],
}

const fn sim_config(fft_size: u16) -> SpectralParams {
    SpectralParams {
        fft_period: 1,
        period: 35,
        count: 0,
        short_report: 1,
        radar_bin_thresh_sel: 0,
        spectral_pri: 1,
        fft_size,
        gc_ena: 1,
        restart_ena: 0,
        noise_floor_ref: 0xffa0,
        init_delay: 80,
        nb_tone_thr: 12,
        str_bin_thr: 8,
        wb_rpt_mode: 0,
        rssi_rpt_mode: 0,
        rssi_thr: 0xfff0,
        pwr_format: 0,
        rpt_mode: 2,
        bin_scale: 1,
        dbm_adj: 1,
        chn_mask: 1,
        nf_cal: [0; 6],
        nf_pwr: [0; 6],
    }
}

const fn sim_chan(center_freq1: u16, center_freq2: u16, chan_width: u8) -> ChanInfo {
    ChanInfo {
        center_freq1,
        center_freq2,
        chan_width,
    }
}

static REPORTS_20: [SimReport; 1] = [SimReport {
    data: &REPORT_64,
    rfqual_info: SIM_RFQUAL,
    chan_info: sim_chan(5180, 0, 20),
}];

static REPORTS_40: [SimReport; 1] = [SimReport {
    data: &REPORT_128,
    rfqual_info: SIM_RFQUAL,
    chan_info: sim_chan(5180, 0, 40),
}];

static REPORTS_80: [SimReport; 1] = [SimReport {
    data: &REPORT_256,
    rfqual_info: SIM_RFQUAL,
    chan_info: sim_chan(5210, 0, 80),
}];

static REPORTS_160: [SimReport; 1] = [SimReport {
    data: &REPORT_160,
    rfqual_info: SIM_RFQUAL,
    chan_info: sim_chan(5250, 0, 160),
}];

static REPORTS_80P80: [SimReport; 1] = [SimReport {
    data: &REPORT_256,
    rfqual_info: SIM_RFQUAL,
    chan_info: sim_chan(5210, 5530, 160),
}];

/// Number of built in report sets.
pub const NUM_REPORT_SETS: usize = 5;

pub static REPORT_SETS: [ReportSet; NUM_REPORT_SETS] = [
    ReportSet {
        width: ChannelWidth::Mhz20,
        config: sim_config(7),
        reports: &REPORTS_20,
    },
    ReportSet {
        width: ChannelWidth::Mhz40,
        config: sim_config(8),
        reports: &REPORTS_40,
    },
    ReportSet {
        width: ChannelWidth::Mhz80,
        config: sim_config(9),
        reports: &REPORTS_80,
    },
    ReportSet {
        width: ChannelWidth::Mhz160,
        config: sim_config(9),
        reports: &REPORTS_160,
    },
    ReportSet {
        width: ChannelWidth::Mhz80P80,
        config: sim_config(9),
        reports: &REPORTS_80P80,
    },
];

pub struct SimOps<'a, A: Alarm<'a>, const N: usize> {
    utils: &'a SpectralUtils<'a>,
    vdev: VdevId,
    alarm: &'a A,
    sets: &'a [ReportSet; N],
    client: OptionalCell<&'a dyn ReportClient>,

    /// Index of the configured set in `sets`.
    curr_set: OptionalCell<usize>,
    /// Next report to replay, per set.
    positions: [Cell<usize>; N],
    enabled: Cell<bool>,
    active: Cell<bool>,
    tsf64: Cell<u64>,
    start_tsf: Cell<u64>,
    period_ms: Cell<u64>,
    count: Cell<u32>,
}

impl<'a, A: Alarm<'a>> SimOps<'a, A, NUM_REPORT_SETS> {
    /// Simulated hardware on `vdev`, replaying the built in report sets.
    pub fn new(
        utils: &'a SpectralUtils<'a>,
        vdev: VdevId,
        alarm: &'a A,
    ) -> SimOps<'a, A, NUM_REPORT_SETS> {
        SimOps::with_report_sets(utils, vdev, alarm, &REPORT_SETS)
    }
}

impl<'a, A: Alarm<'a>, const N: usize> SimOps<'a, A, N> {
    pub fn with_report_sets(
        utils: &'a SpectralUtils<'a>,
        vdev: VdevId,
        alarm: &'a A,
        sets: &'a [ReportSet; N],
    ) -> SimOps<'a, A, N> {
        SimOps {
            utils,
            vdev,
            alarm,
            sets,
            client: OptionalCell::empty(),
            curr_set: OptionalCell::empty(),
            positions: core::array::from_fn(|_| Cell::new(0)),
            enabled: Cell::new(false),
            active: Cell::new(false),
            tsf64: Cell::new(0),
            start_tsf: Cell::new(0),
            period_ms: Cell::new(0),
            count: Cell::new(0),
        }
    }

    pub fn set_report_client(&self, client: &'a dyn ReportClient) {
        self.client.set(client);
    }

    /// Reports delivered since the scan started.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    fn arm(&self) {
        let dt = self.alarm.ticks_from_ms(SIM_PERIOD_MS);
        self.alarm.set_alarm(self.alarm.now(), dt);
    }

    /// Deliver the next report of a running scan.
    fn deliver_next(&self) {
        if !self.active.get() {
            return;
        }
        let (set, position) = match self.curr_set.get() {
            Some(index) if !self.sets[index].reports.is_empty() => {
                (&self.sets[index], &self.positions[index])
            }
            _ => return,
        };

        let index = position.get() % set.reports.len();
        let sim = &set.reports[index];
        let tsf64 = self.start_tsf.get()
            + self.period_ms.get() * u64::from(self.count.get()) * 1000;
        let report = PhyerrReport {
            data: sim.data,
            rfqual_info: sim.rfqual_info,
            chan_info: sim.chan_info,
            tsf64,
        };
        if let Err(e) = self.process_phyerr(&report) {
            debug!("spectral sim: report dropped: {}", e);
        }

        self.count.set(self.count.get().wrapping_add(1));
        position.set((index + 1) % set.reports.len());

        let limit = u32::from(set.config.count);
        if limit != 0 && self.count.get() == limit {
            debug!(limit, "spectral sim: scan count reached");
            self.stop();
        }
    }

    fn stop(&self) {
        self.alarm.disarm();
        self.active.set(false);
        self.enabled.set(false);
        self.start_tsf.set(0);
        self.count.set(0);
        self.period_ms.set(0);
    }
}

impl<'a, A: Alarm<'a>, const N: usize> AlarmClient for SimOps<'a, A, N> {
    fn alarm(&self) {
        self.deliver_next();
        if self.active.get() {
            self.arm();
        }
    }
}

impl<'a, A: Alarm<'a>, const N: usize> SpectralOps for SimOps<'a, A, N> {
    fn get_tsf64(&self) -> u64 {
        self.tsf64.get()
    }

    fn get_capability(&self, _cap: Capability) -> bool {
        true
    }

    fn set_rxfilter(&self, _rxfilter: u32) -> u32 {
        0
    }

    fn get_rxfilter(&self) -> u32 {
        0
    }

    fn is_spectral_active(&self) -> bool {
        self.active.get()
    }

    fn is_spectral_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn start_spectral_scan(&self) -> Result<(), SpectralError> {
        if self.curr_set.is_none() {
            warn!("spectral sim: no report set configured");
            return Err(SpectralError::NoReportSet);
        }
        self.enabled.set(true);
        self.active.set(true);
        self.start_tsf.set(0);
        self.count.set(0);
        self.period_ms.set(u64::from(SIM_PERIOD_MS));
        self.arm();
        Ok(())
    }

    fn stop_spectral_scan(&self) -> Result<(), SpectralError> {
        self.stop();
        Ok(())
    }

    fn get_extension_channel(&self) -> u32 {
        self.utils
            .spectral_vdev_get_sec20chan_freq_mhz(self.vdev)
            .map(u32::from)
            .unwrap_or(0)
    }

    fn get_current_channel(&self) -> u32 {
        match self.utils.spectral_vdev_get_chan_freq(self.vdev) {
            Ok(freq) if freq > 0 => freq as u32,
            _ => 0,
        }
    }

    fn get_ch_width(&self) -> Result<ChannelWidth, SpectralError> {
        self.utils.spectral_vdev_get_ch_width(self.vdev)
    }

    fn get_ctl_noisefloor(&self) -> i8 {
        0
    }

    fn get_ext_noisefloor(&self) -> i8 {
        0
    }

    fn configure_spectral(&self, params: &SpectralParams) -> Result<(), SpectralError> {
        let width = self.get_ch_width()?;
        if width == ChannelWidth::Invalid {
            return Err(SpectralError::InvalidChannelWidth);
        }

        let index = self
            .sets
            .iter()
            .position(|set| set.width == width && set.config == *params);
        self.curr_set.insert(index);
        match index.map(|index| &self.sets[index]) {
            Some(set) => {
                debug!(
                    ?width,
                    bins = fft_bin_count(set.config.fft_size),
                    "spectral sim: report set selected"
                );
                Ok(())
            }
            None => {
                warn!(?width, "spectral sim: no report set for configuration");
                Err(SpectralError::NoReportSet)
            }
        }
    }

    fn get_spectral_config(&self) -> Result<SpectralParams, SpectralError> {
        self.curr_set
            .map(|index| self.sets[index].config)
            .ok_or(SpectralError::NoReportSet)
    }

    fn get_ent_spectral_mask(&self) -> u32 {
        0
    }

    fn get_mac_address(&self) -> [u8; 6] {
        [0; 6]
    }

    fn reset_hw(&self) -> u32 {
        0
    }

    fn get_chain_noise_floor(&self, _nf_buf: &mut [i16]) -> u32 {
        0
    }

    fn process_phyerr(&self, report: &PhyerrReport<'_>) -> Result<(), SpectralError> {
        self.tsf64.set(report.tsf64);
        self.client
            .map(|client| client.report_received(report))
            .ok_or(SpectralError::NoSpectral)
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::cell::RefCell;
    use std::vec::Vec;

    use super::*;
    use crate::alarm::test::ManualAlarm;
    use crate::legacy::test::FixedVdev;
    use crate::report::{parse_gen3, Gen3Report};
    use crate::scan::Spectral;

    #[derive(Default)]
    struct Collect {
        tsfs: RefCell<Vec<u64>>,
        lens: RefCell<Vec<usize>>,
        chans: RefCell<Vec<ChanInfo>>,
    }

    impl ReportClient for Collect {
        fn report_received(&self, report: &PhyerrReport<'_>) {
            self.tsfs.borrow_mut().push(report.tsf64);
            self.lens.borrow_mut().push(report.data.len());
            self.chans.borrow_mut().push(report.chan_info);
        }
    }

    #[test]
    fn report_data() {
        assert_eq!(&REPORT_64[..4], &[0x78u8, 0x56, 0x34, 0x12]);
        assert_eq!(REPORT_64[FFT_REPORT_HEADER_LEN], 0x10);
        assert_eq!(REPORT_64[FFT_REPORT_HEADER_LEN + 32], 0x40);
        assert_eq!(REPORT_256.len(), FFT_REPORT_HEADER_LEN + 256);
        for set in REPORT_SETS.iter() {
            let bins = fft_bin_count(set.config.fft_size) as usize;
            let with_sec80 = set.width == ChannelWidth::Mhz160;
            let sample = match parse_gen3(set.reports[0].data, with_sec80) {
                Ok(Gen3Report::SearchFft(sample)) => sample,
                other => panic!("{:?}: {:?}", set.width, other),
            };
            assert_eq!(sample.primary.bins.len(), bins);
            assert_eq!(sample.primary.info.fft_peak_mag, 44);
            assert_eq!(sample.sec80.map(|sec80| sec80.bins.len()), with_sec80.then_some(bins));
        }
    }

    #[test]
    fn config_must_match() {
        let vdev = FixedVdev::new(5180, None, ChannelWidth::Mhz20);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);
        let alarm = ManualAlarm::new();
        let sim = SimOps::new(&utils, 0, &alarm);

        let mut params = SpectralParams::default();
        params.fft_size = 8;
        assert_eq!(sim.configure_spectral(&params), Err(SpectralError::NoReportSet));
        assert_eq!(sim.start_spectral_scan(), Err(SpectralError::NoReportSet));
        assert_eq!(sim.get_spectral_config(), Err(SpectralError::NoReportSet));
        assert!(!alarm.is_armed());

        vdev.width.set(ChannelWidth::Mhz40);
        sim.configure_spectral(&params).unwrap();
        assert_eq!(sim.get_spectral_config(), Ok(params));

        vdev.width.set(ChannelWidth::Invalid);
        assert_eq!(
            sim.configure_spectral(&params),
            Err(SpectralError::InvalidChannelWidth)
        );
    }

    static PAIR: [SimReport; 2] = [
        SimReport {
            data: &REPORT_256,
            rfqual_info: SIM_RFQUAL,
            chan_info: sim_chan(5210, 5530, 160),
        },
        SimReport {
            data: &REPORT_128,
            rfqual_info: SIM_RFQUAL,
            chan_info: sim_chan(5210, 5530, 160),
        },
    ];

    #[test]
    fn alarm_paces_reports_until_count() {
        let vdev = FixedVdev::new(5210, Some(5530), ChannelWidth::Mhz80P80);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);

        let mut config = sim_config(9);
        config.count = 3;
        let sets = [ReportSet {
            width: ChannelWidth::Mhz80P80,
            config,
            reports: &PAIR,
        }];
        let alarm = ManualAlarm::new();
        let sim = SimOps::with_report_sets(&utils, 0, &alarm, &sets);
        alarm.set_alarm_client(&sim);
        let collect = Collect::default();
        sim.set_report_client(&collect);

        assert!(!alarm.fire());
        assert!(collect.tsfs.borrow().is_empty());

        sim.configure_spectral(&config).unwrap();
        sim.start_spectral_scan().unwrap();
        assert_eq!(alarm.deadline(), Some(32));
        assert!(alarm.fire());
        assert_eq!(alarm.deadline(), Some(64));
        while alarm.fire() {}

        assert_eq!(*collect.tsfs.borrow(), [0, 1000, 2000]);
        assert_eq!(*collect.lens.borrow(), [280, 152, 280]);
        assert_eq!(collect.chans.borrow()[0].center_freq2, 5530);
        assert!(!alarm.is_armed());
        assert!(!sim.is_spectral_active());
        assert!(!sim.is_spectral_enabled());
        assert_eq!(sim.count(), 0);
        assert_eq!(sim.get_tsf64(), 2000);
    }

    #[test]
    fn stop_disarms() {
        let vdev = FixedVdev::new(5180, None, ChannelWidth::Mhz20);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);
        let alarm = ManualAlarm::new();
        let sim = SimOps::new(&utils, 0, &alarm);
        alarm.set_alarm_client(&sim);
        let collect = Collect::default();
        sim.set_report_client(&collect);

        sim.configure_spectral(&sim_config(7)).unwrap();
        sim.start_spectral_scan().unwrap();
        assert!(alarm.fire());
        assert!(alarm.is_armed());

        sim.stop_spectral_scan().unwrap();
        assert!(!alarm.is_armed());
        assert!(!alarm.fire());
        assert_eq!(collect.lens.borrow().len(), 1);
    }

    #[test]
    fn replay_resumes_per_set() {
        let vdev = FixedVdev::new(5210, Some(5530), ChannelWidth::Mhz80P80);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);

        let sets = [
            ReportSet {
                width: ChannelWidth::Mhz80P80,
                config: sim_config(9),
                reports: &PAIR,
            },
            ReportSet {
                width: ChannelWidth::Mhz20,
                config: sim_config(7),
                reports: &REPORTS_20,
            },
        ];
        let alarm = ManualAlarm::new();
        let sim = SimOps::with_report_sets(&utils, 0, &alarm, &sets);
        alarm.set_alarm_client(&sim);
        let collect = Collect::default();
        sim.set_report_client(&collect);

        sim.configure_spectral(&sim_config(9)).unwrap();
        sim.start_spectral_scan().unwrap();
        alarm.fire();
        sim.stop_spectral_scan().unwrap();

        // Another set in between does not move the first one.
        vdev.width.set(ChannelWidth::Mhz20);
        sim.configure_spectral(&sim_config(7)).unwrap();
        sim.start_spectral_scan().unwrap();
        alarm.fire();
        sim.stop_spectral_scan().unwrap();

        vdev.width.set(ChannelWidth::Mhz80P80);
        sim.configure_spectral(&sim_config(9)).unwrap();
        sim.start_spectral_scan().unwrap();
        alarm.fire();
        alarm.fire();

        assert_eq!(*collect.lens.borrow(), [280, 88, 152, 280]);
    }

    #[test]
    fn count_wraps() {
        let vdev = FixedVdev::new(5180, None, ChannelWidth::Mhz20);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);
        let alarm = ManualAlarm::new();
        let sim = SimOps::new(&utils, 0, &alarm);
        alarm.set_alarm_client(&sim);
        let collect = Collect::default();
        sim.set_report_client(&collect);

        sim.configure_spectral(&sim_config(7)).unwrap();
        sim.start_spectral_scan().unwrap();
        sim.count.set(u32::MAX);
        assert!(alarm.fire());
        assert_eq!(sim.count(), 0);
        assert!(sim.is_spectral_active());
        assert!(alarm.is_armed());
    }

    #[test]
    fn drives_the_controller() {
        let vdev = FixedVdev::new(5180, None, ChannelWidth::Mhz20);
        let utils = SpectralUtils::new();
        utils.register_legacy_cb(&vdev);
        let alarm = ManualAlarm::new();
        let sim = SimOps::new(&utils, 0, &alarm);
        alarm.set_alarm_client(&sim);
        let spectral = Spectral::new(&sim).unwrap();
        sim.set_report_client(&spectral);

        spectral.start_spectral_scan().unwrap();
        assert!(spectral.is_spectral_active());
        assert_eq!(spectral.fft_layout().numbins, 72);

        alarm.fire();
        alarm.fire();
        assert_eq!(spectral.num_spectral_data(), 2);
        assert_eq!(spectral.get_stats().num_reports, 2);

        spectral.stop_spectral_scan().unwrap();
        assert!(!alarm.fire());
        assert_eq!(spectral.num_spectral_data(), 2);
        assert!(!spectral.is_spectral_enabled());

        // The priority reset no longer matches the captured configuration.
        assert_eq!(
            spectral.start_spectral_scan(),
            Err(SpectralError::NoReportSet)
        );
    }
}
