// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Hardware operations behind the spectral controller.
//!
//! `SpectralOps` is the interface the controller drives. Three
//! implementations exist: `NullOps` for radios without spectral support,
//! `WmiOps` for firmware configured over WMI commands, and the simulator in
//! `sim`.

use core::cell::Cell;

use tock_cells::optional_cell::OptionalCell;
use tracing::{debug, error};

use crate::config::SpectralParams;
use crate::error::SpectralError;
use crate::legacy::{ChannelWidth, SpectralUtils, VdevId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Phydiag,
    Radar,
    SpectralScan,
    AdvncdSpectralScan,
}

/// Per chain RSSI of one report, for the primary 20 MHz and the secondary
/// 20, 40 and 80 MHz segments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainRssi {
    pub rssi_pri20: u8,
    pub rssi_sec20: u8,
    pub rssi_sec40: u8,
    pub rssi_sec80: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RfQualInfo {
    pub rssi_comb: i8,
    pub pc_rssi_info: [ChainRssi; 4],
    pub noise_floor: [i16; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChanInfo {
    pub center_freq1: u16,
    pub center_freq2: u16,
    pub chan_width: u8,
}

/// A spectral report as delivered by the radio, the raw search FFT report
/// plus the reception quality and channel it was taken on.
#[derive(Clone, Copy, Debug)]
pub struct PhyerrReport<'a> {
    pub data: &'a [u8],
    pub rfqual_info: RfQualInfo,
    pub chan_info: ChanInfo,
    pub tsf64: u64,
}

/// Receiver of the reports the radio produces.
pub trait ReportClient {
    fn report_received(&self, report: &PhyerrReport<'_>);
}

pub trait SpectralOps {
    fn get_tsf64(&self) -> u64;
    fn get_capability(&self, cap: Capability) -> bool;
    fn set_rxfilter(&self, rxfilter: u32) -> u32;
    fn get_rxfilter(&self) -> u32;
    fn is_spectral_active(&self) -> bool;
    fn is_spectral_enabled(&self) -> bool;
    fn start_spectral_scan(&self) -> Result<(), SpectralError>;
    fn stop_spectral_scan(&self) -> Result<(), SpectralError>;
    /// Secondary 20 MHz channel in MHz, 0 if there is none.
    fn get_extension_channel(&self) -> u32;
    /// Primary channel in MHz, 0 if unknown.
    fn get_current_channel(&self) -> u32;
    fn get_ch_width(&self) -> Result<ChannelWidth, SpectralError>;
    fn get_ctl_noisefloor(&self) -> i8;
    fn get_ext_noisefloor(&self) -> i8;
    fn configure_spectral(&self, params: &SpectralParams) -> Result<(), SpectralError>;
    fn get_spectral_config(&self) -> Result<SpectralParams, SpectralError>;
    fn get_ent_spectral_mask(&self) -> u32;
    fn get_mac_address(&self) -> [u8; 6];
    fn reset_hw(&self) -> u32;
    /// Fill `nf_buf` with the per chain noise floor. Returns the number of
    /// entries written.
    fn get_chain_noise_floor(&self, nf_buf: &mut [i16]) -> u32;
    /// Hand a report received from the radio to the controller.
    fn process_phyerr(&self, report: &PhyerrReport<'_>) -> Result<(), SpectralError>;
}

/// Ops for a radio without spectral support. Every operation succeeds and
/// does nothing.
pub struct NullOps;

impl SpectralOps for NullOps {
    fn get_tsf64(&self) -> u64 {
        0
    }

    fn get_capability(&self, _cap: Capability) -> bool {
        false
    }

    fn set_rxfilter(&self, _rxfilter: u32) -> u32 {
        0
    }

    fn get_rxfilter(&self) -> u32 {
        0
    }

    fn is_spectral_active(&self) -> bool {
        false
    }

    fn is_spectral_enabled(&self) -> bool {
        false
    }

    fn start_spectral_scan(&self) -> Result<(), SpectralError> {
        Ok(())
    }

    fn stop_spectral_scan(&self) -> Result<(), SpectralError> {
        Ok(())
    }

    fn get_extension_channel(&self) -> u32 {
        0
    }

    fn get_current_channel(&self) -> u32 {
        0
    }

    fn get_ch_width(&self) -> Result<ChannelWidth, SpectralError> {
        Ok(ChannelWidth::Invalid)
    }

    fn get_ctl_noisefloor(&self) -> i8 {
        0
    }

    fn get_ext_noisefloor(&self) -> i8 {
        0
    }

    fn configure_spectral(&self, _params: &SpectralParams) -> Result<(), SpectralError> {
        Ok(())
    }

    fn get_spectral_config(&self) -> Result<SpectralParams, SpectralError> {
        Ok(SpectralParams::default())
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

    fn process_phyerr(&self, _report: &PhyerrReport<'_>) -> Result<(), SpectralError> {
        Ok(())
    }
}

/// `WMI_VDEV_SPECTRAL_SCAN_CONFIGURE_CMD` arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VdevConfigureParams {
    pub vdev_id: VdevId,
    pub count: u16,
    pub period: u16,
    pub spectral_pri: u16,
    pub fft_size: u16,
    pub gc_enable: u16,
    pub restart_enable: u16,
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
}

impl VdevConfigureParams {
    pub fn new(vdev_id: VdevId, p: &SpectralParams) -> VdevConfigureParams {
        VdevConfigureParams {
            vdev_id,
            count: p.count,
            period: p.period,
            spectral_pri: p.spectral_pri,
            fft_size: p.fft_size,
            gc_enable: p.gc_ena,
            restart_enable: p.restart_ena,
            noise_floor_ref: p.noise_floor_ref,
            init_delay: p.init_delay,
            nb_tone_thr: p.nb_tone_thr,
            str_bin_thr: p.str_bin_thr,
            wb_rpt_mode: p.wb_rpt_mode,
            rssi_rpt_mode: p.rssi_rpt_mode,
            rssi_thr: p.rssi_thr,
            pwr_format: p.pwr_format,
            rpt_mode: p.rpt_mode,
            bin_scale: p.bin_scale,
            dbm_adj: p.dbm_adj,
            chn_mask: p.chn_mask,
        }
    }
}

/// `WMI_VDEV_SPECTRAL_SCAN_ENABLE_CMD` arguments. A state is only changed
/// when its `_valid` flag is set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VdevEnableParams {
    pub vdev_id: VdevId,
    pub active_valid: bool,
    pub active: bool,
    pub enabled_valid: bool,
    pub enabled: bool,
}

/// Transport of the spectral WMI commands.
pub trait WmiSender {
    fn spectral_configure_cmd_send(&self, params: &VdevConfigureParams)
        -> Result<(), SpectralError>;
    fn spectral_enable_cmd_send(&self, params: &VdevEnableParams) -> Result<(), SpectralError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VdevInfo {
    pub id: VdevId,
    pub rx_chainmask: u8,
}

/// The physical device spectral runs on.
pub trait PdevInfo {
    /// The first vdev of the pdev, `None` if no vdev is up.
    fn first_vdev(&self) -> Option<VdevInfo>;
    fn mac_addr(&self) -> [u8; 6];
}

/// Last state written to the firmware. The firmware cannot be queried, so
/// reads are answered from here. The first access fills in the defaults,
/// writes included.
#[derive(Clone, Copy)]
struct OpsCache {
    valid: bool,
    active: bool,
    enabled: bool,
    params: SpectralParams,
}

pub struct WmiOps<'a, W: WmiSender> {
    wmi: &'a W,
    pdev: &'a dyn PdevInfo,
    utils: &'a SpectralUtils<'a>,
    cache: Cell<OpsCache>,
    tsf64: Cell<u64>,
    report_client: OptionalCell<&'a dyn ReportClient>,
}

impl<'a, W: WmiSender> WmiOps<'a, W> {
    pub fn new(wmi: &'a W, pdev: &'a dyn PdevInfo, utils: &'a SpectralUtils<'a>) -> Self {
        WmiOps {
            wmi,
            pdev,
            utils,
            cache: Cell::new(OpsCache {
                valid: false,
                active: false,
                enabled: false,
                params: SpectralParams::default(),
            }),
            tsf64: Cell::new(0),
            report_client: OptionalCell::empty(),
        }
    }

    pub fn set_report_client(&self, client: &'a dyn ReportClient) {
        self.report_client.set(client);
    }

    fn vdev(&self) -> Result<VdevInfo, SpectralError> {
        self.pdev.first_vdev().ok_or_else(|| {
            debug!("spectral: no vdev on pdev");
            SpectralError::NoVdev
        })
    }

    fn info_read(&self) -> Result<OpsCache, SpectralError> {
        let cache = self.cache.get();
        if cache.valid {
            return Ok(cache);
        }
        let vdev = self.vdev()?;
        let cache = OpsCache {
            valid: true,
            active: false,
            enabled: false,
            params: SpectralParams {
                chn_mask: u16::from(vdev.rx_chainmask),
                ..SpectralParams::default()
            },
        };
        self.cache.set(cache);
        Ok(cache)
    }

    fn send_enable(
        &self,
        active: Option<bool>,
        enabled: Option<bool>,
    ) -> Result<(), SpectralError> {
        let vdev = self.vdev()?;
        let params = VdevEnableParams {
            vdev_id: vdev.id,
            active_valid: active.is_some(),
            active: active.unwrap_or(false),
            enabled_valid: enabled.is_some(),
            enabled: enabled.unwrap_or(false),
        };
        self.wmi.spectral_enable_cmd_send(&params).map_err(|e| {
            error!(?params, "spectral enable command failed: {}", e);
            e
        })
    }

    fn write_active(&self, active: bool) -> Result<(), SpectralError> {
        self.send_enable(Some(active), None)?;
        let mut cache = self.info_read()?;
        cache.active = active;
        self.cache.set(cache);
        Ok(())
    }

    fn write_enabled(&self, enabled: bool) -> Result<(), SpectralError> {
        self.send_enable(None, Some(enabled))?;
        let mut cache = self.info_read()?;
        cache.enabled = enabled;
        self.cache.set(cache);
        Ok(())
    }

    fn write_params(&self, params: &SpectralParams) -> Result<(), SpectralError> {
        let vdev = self.vdev()?;
        let cmd = VdevConfigureParams::new(vdev.id, params);
        self.wmi.spectral_configure_cmd_send(&cmd).map_err(|e| {
            error!(?cmd, "spectral configure command failed: {}", e);
            e
        })?;
        let mut cache = self.info_read()?;
        cache.params = *params;
        self.cache.set(cache);
        Ok(())
    }
}

impl<W: WmiSender> SpectralOps for WmiOps<'_, W> {
    fn get_tsf64(&self) -> u64 {
        self.tsf64.get()
    }

    fn get_capability(&self, cap: Capability) -> bool {
        match cap {
            Capability::Phydiag
            | Capability::Radar
            | Capability::SpectralScan
            | Capability::AdvncdSpectralScan => true,
        }
    }

    // Enabling spectral in the firmware sets up the filter.
    fn set_rxfilter(&self, _rxfilter: u32) -> u32 {
        0
    }

    fn get_rxfilter(&self) -> u32 {
        0
    }

    fn is_spectral_active(&self) -> bool {
        self.info_read().map(|c| c.active).unwrap_or(false)
    }

    fn is_spectral_enabled(&self) -> bool {
        self.info_read().map(|c| c.enabled).unwrap_or(false)
    }

    fn start_spectral_scan(&self) -> Result<(), SpectralError> {
        let enabled = self.info_read().map(|c| c.enabled).unwrap_or(false);
        if !enabled {
            self.write_enabled(true)?;
        }
        self.write_active(true)
    }

    fn stop_spectral_scan(&self) -> Result<(), SpectralError> {
        // Both writes are attempted even if the first fails.
        let active = self.write_active(false);
        let enabled = self.write_enabled(false);
        active.and(enabled)
    }

    fn get_extension_channel(&self) -> u32 {
        self.vdev()
            .and_then(|vdev| self.utils.spectral_vdev_get_sec20chan_freq_mhz(vdev.id))
            .map(u32::from)
            .unwrap_or(0)
    }

    fn get_current_channel(&self) -> u32 {
        match self
            .vdev()
            .and_then(|vdev| self.utils.spectral_vdev_get_chan_freq(vdev.id))
        {
            Ok(freq) if freq > 0 => freq as u32,
            _ => 0,
        }
    }

    fn get_ch_width(&self) -> Result<ChannelWidth, SpectralError> {
        let vdev = self.vdev()?;
        self.utils.spectral_vdev_get_ch_width(vdev.id)
    }

    fn get_ctl_noisefloor(&self) -> i8 {
        0
    }

    fn get_ext_noisefloor(&self) -> i8 {
        0
    }

    fn configure_spectral(&self, params: &SpectralParams) -> Result<(), SpectralError> {
        self.write_params(params)
    }

    fn get_spectral_config(&self) -> Result<SpectralParams, SpectralError> {
        self.info_read().map(|c| c.params)
    }

    fn get_ent_spectral_mask(&self) -> u32 {
        0
    }

    fn get_mac_address(&self) -> [u8; 6] {
        self.pdev.mac_addr()
    }

    fn reset_hw(&self) -> u32 {
        0
    }

    fn get_chain_noise_floor(&self, _nf_buf: &mut [i16]) -> u32 {
        0
    }

    fn process_phyerr(&self, report: &PhyerrReport<'_>) -> Result<(), SpectralError> {
        self.tsf64.set(report.tsf64);
        self.report_client
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
    use crate::legacy::test::FixedVdev;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Cmd {
        Configure(VdevConfigureParams),
        Enable(VdevEnableParams),
    }

    /// Records the commands and fails them on request.
    #[derive(Default)]
    struct FakeWmi {
        sent: RefCell<Vec<Cmd>>,
        fail: Cell<bool>,
    }

    impl WmiSender for FakeWmi {
        fn spectral_configure_cmd_send(
            &self,
            params: &VdevConfigureParams,
        ) -> Result<(), SpectralError> {
            self.sent.borrow_mut().push(Cmd::Configure(*params));
            if self.fail.get() {
                Err(SpectralError::Wmi)
            } else {
                Ok(())
            }
        }

        fn spectral_enable_cmd_send(&self, params: &VdevEnableParams) -> Result<(), SpectralError> {
            self.sent.borrow_mut().push(Cmd::Enable(*params));
            if self.fail.get() {
                Err(SpectralError::Wmi)
            } else {
                Ok(())
            }
        }
    }

    struct FakePdev {
        vdev: Cell<Option<VdevInfo>>,
    }

    impl FakePdev {
        fn new() -> FakePdev {
            FakePdev {
                vdev: Cell::new(Some(VdevInfo {
                    id: 2,
                    rx_chainmask: 0x3,
                })),
            }
        }
    }

    impl PdevInfo for FakePdev {
        fn first_vdev(&self) -> Option<VdevInfo> {
            self.vdev.get()
        }

        fn mac_addr(&self) -> [u8; 6] {
            [0x00, 0x03, 0x7f, 0x01, 0x02, 0x03]
        }
    }

    fn enable(active: Option<bool>, enabled: Option<bool>) -> Cmd {
        Cmd::Enable(VdevEnableParams {
            vdev_id: 2,
            active_valid: active.is_some(),
            active: active.unwrap_or(false),
            enabled_valid: enabled.is_some(),
            enabled: enabled.unwrap_or(false),
        })
    }

    #[test]
    fn cache_defaults_from_vdev() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);

        let params = ops.get_spectral_config().unwrap();
        assert_eq!(params.chn_mask, 3);
        assert_eq!(params.fft_size, SpectralParams::default().fft_size);
        assert!(!ops.is_spectral_active());
        assert!(wmi.sent.borrow().is_empty());
        assert_eq!(ops.get_mac_address()[2], 0x7f);
    }

    #[test]
    fn no_vdev() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        pdev.vdev.set(None);
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);

        assert_eq!(ops.get_spectral_config(), Err(SpectralError::NoVdev));
        assert_eq!(ops.start_spectral_scan(), Err(SpectralError::NoVdev));
        assert_eq!(ops.get_current_channel(), 0);
        assert!(wmi.sent.borrow().is_empty());
    }

    #[test]
    fn start_enables_then_activates() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);

        ops.start_spectral_scan().unwrap();
        assert_eq!(
            *wmi.sent.borrow(),
            [enable(None, Some(true)), enable(Some(true), None)]
        );
        assert!(ops.is_spectral_active());
        assert!(ops.is_spectral_enabled());

        // Already enabled, only activate.
        wmi.sent.borrow_mut().clear();
        ops.start_spectral_scan().unwrap();
        assert_eq!(*wmi.sent.borrow(), [enable(Some(true), None)]);
    }

    #[test]
    fn stop_attempts_both() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);
        ops.start_spectral_scan().unwrap();
        wmi.sent.borrow_mut().clear();

        wmi.fail.set(true);
        assert_eq!(ops.stop_spectral_scan(), Err(SpectralError::Wmi));
        assert_eq!(
            *wmi.sent.borrow(),
            [enable(Some(false), None), enable(None, Some(false))]
        );
        // Failed writes leave the cache alone.
        assert!(ops.is_spectral_active());

        wmi.fail.set(false);
        ops.stop_spectral_scan().unwrap();
        assert!(!ops.is_spectral_active());
        assert!(!ops.is_spectral_enabled());
    }

    #[test]
    fn configure_updates_cache_on_success() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);

        let mut params = SpectralParams::default();
        params.count = 5;
        ops.configure_spectral(&params).unwrap();
        assert_eq!(ops.get_spectral_config().unwrap().count, 5);
        match wmi.sent.borrow()[0] {
            Cmd::Configure(cmd) => {
                assert_eq!(cmd.vdev_id, 2);
                assert_eq!(cmd.count, 5);
                assert_eq!(cmd.gc_enable, params.gc_ena);
            }
            other => panic!("unexpected {:?}", other),
        }

        wmi.fail.set(true);
        params.count = 9;
        assert_eq!(ops.configure_spectral(&params), Err(SpectralError::Wmi));
        assert_eq!(ops.get_spectral_config().unwrap().count, 5);
    }

    #[test]
    fn channels_from_legacy_callbacks() {
        let wmi = FakeWmi::default();
        let pdev = FakePdev::new();
        let utils = SpectralUtils::new();
        let ops = WmiOps::new(&wmi, &pdev, &utils);
        assert_eq!(ops.get_current_channel(), 0);
        assert_eq!(ops.get_ch_width(), Err(SpectralError::NoCallbacks));

        let vdev = FixedVdev::new(5180, Some(5200), ChannelWidth::Mhz40);
        utils.register_legacy_cb(&vdev);
        assert_eq!(ops.get_current_channel(), 5180);
        assert_eq!(ops.get_extension_channel(), 5200);
        assert_eq!(ops.get_ch_width(), Ok(ChannelWidth::Mhz40));

        vdev.freq.set(-1);
        vdev.sec20.set(None);
        assert_eq!(ops.get_current_channel(), 0);
        assert_eq!(ops.get_extension_channel(), 0);
    }

    #[test]
    fn null_ops() {
        let ops = NullOps;
        assert!(!ops.get_capability(Capability::Phydiag));
        assert_eq!(ops.start_spectral_scan(), Ok(()));
        assert_eq!(ops.get_ch_width(), Ok(ChannelWidth::Invalid));
        assert_eq!(ops.get_mac_address(), [0; 6]);
        let mut nf = [0i16; 4];
        assert_eq!(ops.get_chain_noise_floor(&mut nf), 0);
    }
}
