// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! The spectral scan controller.
//!
//! `Spectral` keeps the scan parameters and the FFT layout of the reports
//! the radio will produce for the current channel. Starting a scan
//! recomputes the layout from the channel width, hands the parameters to the
//! ops and reads back what the hardware accepted.
//!
//! Reports reach the controller through `ReportClient`. Search FFT reports
//! are decoded and passed on to an optional `SpectralClient`, the others are
//! dropped and counted in the diag stats.

use core::cell::Cell;

use tock_cells::optional_cell::OptionalCell;
use tracing::{debug, error, info, trace};

use crate::config::{fft_bin_count, ParamId, SpectralParams};
use crate::error::SpectralError;
use crate::legacy::ChannelWidth;
use crate::ops::{Capability, PhyerrReport, ReportClient, SpectralOps};
use crate::report::{parse_gen3, FftSample, Gen3Report, ReportError};

/// Base bit of the debug level mask.
pub const DEBUG_SPECTRAL: u32 = 0x1;

/// Legacy (pre 11ac) FFT layouts.
const HT20_NUM_BINS: u32 = 56;
const HT20_FFT_LEN: u32 = 56;
const HT20_DC_INDEX: u32 = HT20_FFT_LEN / 2;
const HT20_TOTAL_DATA_LEN: u32 = HT20_FFT_LEN + 4;
const HT40_TOTAL_NUM_BINS: u32 = 128;
const HT40_FFT_LEN: u32 = 128;
const HT40_DC_INDEX: u32 = HT40_FFT_LEN / 2;
const HT40_TOTAL_DATA_LEN: u32 = HT40_FFT_LEN + 7;

/// Extra bins on each edge of an advanced report in report mode 2.
const EDGE_EXTRABINS: u32 = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpectralCaps {
    pub phydiag_cap: bool,
    pub radar_cap: bool,
    pub spectral_cap: bool,
    pub advncd_spectral_cap: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpectralStats {
    /// Reports received since the last reset.
    pub num_reports: u32,
    /// TSF when the stats were last cleared.
    pub last_reset_tstamp: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagStats {
    /// Reports without the gen3 signature or too short to decode.
    pub spectral_mismatch: u64,
    pub spectral_sec80_sfft_insufflen: u64,
    pub spectral_no_sec80_sfft: u64,
    pub spectral_vhtseg1id_mismatch: u64,
    pub spectral_vhtseg2id_mismatch: u64,
}

impl DiagStats {
    fn count(&mut self, error: ReportError) {
        let counter = match error {
            ReportError::Signature | ReportError::Truncated => &mut self.spectral_mismatch,
            ReportError::Seg1IdMismatch => &mut self.spectral_vhtseg1id_mismatch,
            ReportError::Sec80InsuffLen => &mut self.spectral_sec80_sfft_insufflen,
            ReportError::NoSec80Sfft => &mut self.spectral_no_sec80_sfft,
            ReportError::Seg2IdMismatch => &mut self.spectral_vhtseg2id_mismatch,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// Shape of the FFT data in the reports of a scan.
///
/// The index offsets are -1 where they do not apply to the mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FftLayout {
    pub numbins: u32,
    pub fft_len: u32,
    pub data_len: u32,
    pub dc_index: u32,
    pub lb_edge_extrabins: u32,
    pub rb_edge_extrabins: u32,
    pub max_index_offset: i32,
    pub lower_max_index_offset: i32,
    pub upper_max_index_offset: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassifierMode {
    #[default]
    Mode20 = 0,
    Mode2040 = 1,
}

/// What the interference classifier needs to know about the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifierParams {
    pub spectral_20_40_mode: ClassifierMode,
    pub spectral_dc_index: u32,
    pub upper_chan_in_mhz: u32,
    pub lower_chan_in_mhz: u32,
}

/// Which half of a 20/40 MHz channel is the control channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelHalves {
    pub lower_is_control: bool,
    pub upper_is_control: bool,
    pub lower_is_extension: bool,
    pub upper_is_extension: bool,
}

/// Where the classifier found interference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Detects {
    pub control_channel: bool,
    pub extension_channel: bool,
    pub above_dc: bool,
    pub below_dc: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterferenceType {
    Cw,
    Wifi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterferenceMsg {
    pub int_type: InterferenceType,
    pub dcs_enabled: bool,
    pub macaddr: [u8; 6],
}

pub trait SpectralClient {
    fn interference_found(&self, msg: &InterferenceMsg);

    /// A search FFT report was decoded from `report`.
    fn spectral_report(&self, report: &PhyerrReport<'_>, sample: &FftSample<'_>);
}

pub struct Spectral<'a, O: SpectralOps> {
    ops: &'a O,
    client: OptionalCell<&'a dyn SpectralClient>,

    params: Cell<SpectralParams>,
    caps: Cell<SpectralCaps>,
    stats: Cell<SpectralStats>,
    diag: Cell<DiagStats>,
    debug_level: Cell<u32>,

    ch_width: Cell<ChannelWidth>,
    layout: Cell<FftLayout>,
    classifier: Cell<ClassifierParams>,
    halves: Cell<ChannelHalves>,
    detects: Cell<Detects>,

    is_160_format: Cell<bool>,
    lb_edge_extrabins_format: Cell<bool>,
    rb_edge_extrabins_format: Cell<bool>,

    send_single_packet: Cell<bool>,
    sent_msg: Cell<bool>,
    classify_scan: Cell<bool>,
    scan: Cell<bool>,
    noise_pwr_cal: Cell<bool>,
    num_spectral_data: Cell<u32>,
}

impl<'a, O: SpectralOps> Spectral<'a, O> {
    /// Attach to the ops. Fails with `NotSupported` if the hardware lacks a
    /// capability spectral needs.
    pub fn new(ops: &'a O) -> Result<Spectral<'a, O>, SpectralError> {
        let spectral = Spectral {
            ops,
            client: OptionalCell::empty(),
            params: Cell::new(SpectralParams::default()),
            caps: Cell::new(SpectralCaps::default()),
            stats: Cell::new(SpectralStats::default()),
            diag: Cell::new(DiagStats::default()),
            debug_level: Cell::new(DEBUG_SPECTRAL),
            ch_width: Cell::new(ChannelWidth::Invalid),
            layout: Cell::new(FftLayout::default()),
            classifier: Cell::new(ClassifierParams::default()),
            halves: Cell::new(ChannelHalves::default()),
            detects: Cell::new(Detects::default()),
            is_160_format: Cell::new(false),
            lb_edge_extrabins_format: Cell::new(false),
            rb_edge_extrabins_format: Cell::new(false),
            send_single_packet: Cell::new(false),
            sent_msg: Cell::new(false),
            classify_scan: Cell::new(false),
            scan: Cell::new(false),
            noise_pwr_cal: Cell::new(false),
            num_spectral_data: Cell::new(0),
        };

        spectral.check_hw_capability()?;
        spectral.is_160_format.set(true);
        spectral.lb_edge_extrabins_format.set(true);
        spectral.rb_edge_extrabins_format.set(true);
        spectral.clear_stats();
        Ok(spectral)
    }

    pub fn set_client(&self, client: &'a dyn SpectralClient) {
        self.client.set(client);
    }

    fn check_hw_capability(&self) -> Result<(), SpectralError> {
        let required = [
            Capability::Phydiag,
            Capability::Radar,
            Capability::SpectralScan,
        ];
        for cap in required {
            if !self.ops.get_capability(cap) {
                error!(?cap, "spectral: hardware capability missing");
                return Err(SpectralError::NotSupported);
            }
        }
        self.caps.set(SpectralCaps {
            phydiag_cap: true,
            radar_cap: true,
            spectral_cap: true,
            advncd_spectral_cap: self.ops.get_capability(Capability::AdvncdSpectralScan),
        });
        Ok(())
    }

    /// Layout of the advanced reports `params` produce. Report mode 2 adds
    /// the edge bins the hardware supports.
    fn advanced_layout(&self, params: &SpectralParams) -> FftLayout {
        let rpt_mode_2 = params.rpt_mode == 2;
        let lb = if self.lb_edge_extrabins_format.get() && rpt_mode_2 {
            EDGE_EXTRABINS
        } else {
            0
        };
        let rb = if self.rb_edge_extrabins_format.get() && rpt_mode_2 {
            EDGE_EXTRABINS
        } else {
            0
        };
        // Unsupported FFT sizes leave the lengths at 0.
        let bins = fft_bin_count(params.fft_size);
        let extend = |len: u32| if len != 0 { len + lb + rb } else { 0 };
        FftLayout {
            numbins: extend(bins),
            fft_len: extend(bins),
            data_len: extend(bins),
            lb_edge_extrabins: lb,
            rb_edge_extrabins: rb,
            ..self.layout.get()
        }
    }

    /// Configure and start a scan with `params` on the current channel.
    ///
    /// If a scan is already running only the derived state is refreshed.
    /// Afterwards the stored parameters are what the hardware accepted. The
    /// layout, width and classifier state only change once the hardware has
    /// taken the parameters.
    pub fn scan_enable_params(&self, params: &SpectralParams) -> Result<(), SpectralError> {
        let extension_channel = self.ops.get_extension_channel();
        let current_channel = self.ops.get_current_channel();
        let (low, high) = if extension_channel < current_channel {
            (extension_channel, current_channel)
        } else {
            (current_channel, extension_channel)
        };

        let ch_width = self.ops.get_ch_width()?;
        if ch_width == ChannelWidth::Invalid {
            return Err(SpectralError::InvalidChannelWidth);
        }

        let (layout, mode, lower, upper) = if self.caps.get().advncd_spectral_cap {
            let layout = self.advanced_layout(params);
            match ch_width {
                ChannelWidth::Mhz20 | ChannelWidth::Mhz5 | ChannelWidth::Mhz10 => {
                    (layout, ClassifierMode::Mode20, current_channel, 0)
                }
                ChannelWidth::Mhz40 => (layout, ClassifierMode::Mode2040, low, high),
                // 160 and 80+80 share the 80 MHz layout.
                _ => (layout, ClassifierMode::Mode20, low, high),
            }
        } else if extension_channel == 0 {
            // Legacy hardware picks the mode from the extension channel, the
            // width can change under it.
            let layout = FftLayout {
                numbins: HT20_NUM_BINS,
                fft_len: HT20_FFT_LEN,
                data_len: HT20_TOTAL_DATA_LEN,
                dc_index: HT20_DC_INDEX,
                lb_edge_extrabins: 0,
                rb_edge_extrabins: 0,
                max_index_offset: HT20_FFT_LEN as i32 + 2,
                lower_max_index_offset: -1,
                upper_max_index_offset: -1,
            };
            (layout, ClassifierMode::Mode20, current_channel, 0)
        } else {
            let layout = FftLayout {
                numbins: HT40_TOTAL_NUM_BINS,
                fft_len: HT40_FFT_LEN,
                data_len: HT40_TOTAL_DATA_LEN,
                dc_index: HT40_DC_INDEX,
                lb_edge_extrabins: 0,
                rb_edge_extrabins: 0,
                max_index_offset: -1,
                lower_max_index_offset: HT40_FFT_LEN as i32 + 2,
                upper_max_index_offset: HT40_FFT_LEN as i32 + 5,
            };
            (layout, ClassifierMode::Mode2040, low, high)
        };

        if !self.ops.is_spectral_active() {
            self.ops.configure_spectral(params)?;
            self.ops.start_spectral_scan()?;
            info!(current_channel, ?ch_width, "spectral scan enabled");
        } else {
            debug!(current_channel, "spectral scan already active");
        }
        let accepted = self.ops.get_spectral_config()?;

        self.ch_width.set(ch_width);
        self.noise_pwr_cal.set(params.spectral_pri != 0);
        self.layout.set(layout);
        self.classifier.set(ClassifierParams {
            spectral_20_40_mode: mode,
            spectral_dc_index: layout.dc_index,
            upper_chan_in_mhz: upper,
            lower_chan_in_mhz: lower,
        });

        self.send_single_packet.set(false);
        self.sent_msg.set(false);
        self.classify_scan.set(false);
        self.num_spectral_data.set(0);
        self.scan.set(true);

        self.params.set(accepted);
        self.init_upper_lower_flags();
        Ok(())
    }

    /// Start a scan with the stored parameters.
    pub fn start_spectral_scan(&self) -> Result<(), SpectralError> {
        self.scan_enable_params(&self.params.get())
    }

    /// Stop the scan. The scan priority is reset since it holds off
    /// receive, it has to be set again for the next scan.
    pub fn stop_spectral_scan(&self) -> Result<(), SpectralError> {
        let res = self.ops.stop_spectral_scan();
        if self.classify_scan.get() {
            self.detects.set(Detects::default());
            self.classify_scan.set(false);
        }
        self.send_single_packet.set(false);
        self.scan.set(false);
        self.noise_pwr_cal.set(false);

        let mut params = self.params.get();
        params.spectral_pri = 0;
        self.params.set(params);
        res
    }

    /// Set one parameter and push the parameters to the hardware. The
    /// stored parameters are then re-read from the hardware.
    pub fn set_spectral_config(&self, id: ParamId, value: u32) -> Result<(), SpectralError> {
        let mut params = self.params.get();
        params.set_param(id, value);
        self.params.set(params);

        self.ops.configure_spectral(&params)?;
        self.params.set(self.ops.get_spectral_config()?);
        Ok(())
    }

    /// The parameters the hardware is running with.
    pub fn get_spectral_config(&self) -> Result<SpectralParams, SpectralError> {
        self.ops.get_spectral_config()
    }

    /// Work out which half of the channel is control and which extension.
    pub fn init_upper_lower_flags(&self) {
        let current_channel = self.ops.get_current_channel();
        let extension_channel = self.ops.get_extension_channel();
        if current_channel == 0 || extension_channel == 0 {
            return;
        }

        let halves = match self.classifier.get().spectral_20_40_mode {
            ClassifierMode::Mode2040 if extension_channel < current_channel => ChannelHalves {
                lower_is_extension: true,
                upper_is_control: true,
                ..ChannelHalves::default()
            },
            ClassifierMode::Mode2040 => ChannelHalves {
                lower_is_control: true,
                upper_is_extension: true,
                ..ChannelHalves::default()
            },
            ClassifierMode::Mode20 => ChannelHalves {
                lower_is_control: true,
                ..ChannelHalves::default()
            },
        };
        self.halves.set(halves);
    }

    /// Enable debug output `level` bits above `DEBUG_SPECTRAL`.
    pub fn set_debug_level(&self, level: u32) {
        self.debug_level
            .set(DEBUG_SPECTRAL.checked_shl(level).unwrap_or(0));
    }

    pub fn get_debug_level(&self) -> u32 {
        self.debug_level.get()
    }

    pub fn get_capinfo(&self) -> SpectralCaps {
        self.caps.get()
    }

    pub fn get_diagstats(&self) -> DiagStats {
        self.diag.get()
    }

    pub fn get_stats(&self) -> SpectralStats {
        self.stats.get()
    }

    pub fn clear_stats(&self) {
        self.stats.set(SpectralStats {
            last_reset_tstamp: self.ops.get_tsf64(),
            ..SpectralStats::default()
        });
    }

    pub fn is_spectral_active(&self) -> bool {
        self.ops.is_spectral_active()
    }

    pub fn is_spectral_enabled(&self) -> bool {
        self.ops.is_spectral_enabled()
    }

    pub fn ch_width(&self) -> ChannelWidth {
        self.ch_width.get()
    }

    pub fn fft_layout(&self) -> FftLayout {
        self.layout.get()
    }

    pub fn classifier_params(&self) -> ClassifierParams {
        self.classifier.get()
    }

    pub fn channel_halves(&self) -> ChannelHalves {
        self.halves.get()
    }

    pub fn detects(&self) -> Detects {
        self.detects.get()
    }

    pub fn is_160_format(&self) -> bool {
        self.is_160_format.get()
    }

    /// Whether noise power calibration is on for the running scan.
    pub fn noise_pwr_cal(&self) -> bool {
        self.noise_pwr_cal.get()
    }

    pub fn num_spectral_data(&self) -> u32 {
        self.num_spectral_data.get()
    }

    /// Start classifying the reports of the running scan.
    pub fn set_classify_scan(&self, classify: bool) {
        self.classify_scan.set(classify);
    }

    /// Record where the classifier found interference. Ignored unless a
    /// classifying scan is running.
    pub fn set_detects(&self, detects: Detects) {
        if self.classify_scan.get() {
            self.detects.set(detects);
        }
    }

    /// Tell the client interference was found on the channel.
    pub fn send_intf_found_msg(&self, cw_int: bool, dcs_enabled: bool) {
        let msg = InterferenceMsg {
            int_type: if cw_int {
                InterferenceType::Cw
            } else {
                InterferenceType::Wifi
            },
            dcs_enabled,
            macaddr: self.ops.get_mac_address(),
        };
        debug!(?msg, "spectral interference found");
        if self.client.map(|client| client.interference_found(&msg)).is_some() {
            self.sent_msg.set(true);
        }
    }

    /// Whether an interference message went out since the scan started.
    pub fn sent_msg(&self) -> bool {
        self.sent_msg.get()
    }
}

impl<O: SpectralOps> ReportClient for Spectral<'_, O> {
    fn report_received(&self, report: &PhyerrReport<'_>) {
        // Only 160 MHz sends the secondary segment behind the primary one.
        let with_sec80 = self.ch_width.get() == ChannelWidth::Mhz160;
        let sample = match parse_gen3(report.data, with_sec80) {
            Ok(Gen3Report::SearchFft(sample)) => sample,
            Ok(other) => {
                trace!(?other, "spectral report ignored");
                return;
            }
            Err(e) => {
                let mut diag = self.diag.get();
                diag.count(e);
                self.diag.set(diag);
                debug!(?e, len = report.data.len(), "spectral report dropped");
                return;
            }
        };

        self.num_spectral_data
            .set(self.num_spectral_data.get().wrapping_add(1));
        let mut stats = self.stats.get();
        stats.num_reports = stats.num_reports.wrapping_add(1);
        self.stats.set(stats);

        if self.debug_level.get() > DEBUG_SPECTRAL {
            debug!(
                tsf = report.tsf64,
                peak_mag = sample.primary.info.fft_peak_mag,
                bins = sample.primary.bins.len(),
                "spectral report"
            );
        }
        self.client.map(|client| client.spectral_report(report, &sample));
    }
}
