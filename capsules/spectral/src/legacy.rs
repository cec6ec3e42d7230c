// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Channel queries answered by the legacy vdev manager.
//!
//! Spectral needs the channel a virtual device (vdev) is tuned to, but the
//! vdev state is owned by the driver stack. The stack registers its
//! `LegacyCallbacks` once at boot and spectral queries go through
//! `SpectralUtils`.

use tock_cells::optional_cell::OptionalCell;
use tracing::warn;

use crate::error::SpectralError;

pub type VdevId = u8;

/// Channel width of a vdev.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelWidth {
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
    Mhz80P80,
    Mhz5,
    Mhz10,
    Invalid,
}

impl ChannelWidth {
    /// Width in MHz, 0 for `Invalid`. 80+80 reports 160.
    pub fn mhz(&self) -> u32 {
        match self {
            ChannelWidth::Mhz20 => 20,
            ChannelWidth::Mhz40 => 40,
            ChannelWidth::Mhz80 => 80,
            ChannelWidth::Mhz160 | ChannelWidth::Mhz80P80 => 160,
            ChannelWidth::Mhz5 => 5,
            ChannelWidth::Mhz10 => 10,
            ChannelWidth::Invalid => 0,
        }
    }
}

pub trait LegacyCallbacks {
    /// Center frequency of the primary 20 MHz channel, in MHz.
    fn vdev_get_chan_freq(&self, vdev: VdevId) -> Result<i16, SpectralError>;

    fn vdev_get_ch_width(&self, vdev: VdevId) -> ChannelWidth;

    /// Center frequency of the secondary 20 MHz channel, in MHz.
    fn vdev_get_sec20chan_freq_mhz(&self, vdev: VdevId) -> Result<u16, SpectralError>;
}

pub struct SpectralUtils<'a> {
    legacy: OptionalCell<&'a dyn LegacyCallbacks>,
}

impl<'a> SpectralUtils<'a> {
    pub const fn new() -> SpectralUtils<'a> {
        SpectralUtils {
            legacy: OptionalCell::empty(),
        }
    }

    pub fn register_legacy_cb(&self, callbacks: &'a dyn LegacyCallbacks) {
        self.legacy.set(callbacks);
    }

    fn callbacks(&self) -> Result<&'a dyn LegacyCallbacks, SpectralError> {
        self.legacy.get().ok_or_else(|| {
            warn!("spectral legacy callbacks not registered");
            SpectralError::NoCallbacks
        })
    }

    pub fn spectral_vdev_get_chan_freq(&self, vdev: VdevId) -> Result<i16, SpectralError> {
        self.callbacks()?.vdev_get_chan_freq(vdev)
    }

    pub fn spectral_vdev_get_ch_width(&self, vdev: VdevId) -> Result<ChannelWidth, SpectralError> {
        Ok(self.callbacks()?.vdev_get_ch_width(vdev))
    }

    pub fn spectral_vdev_get_sec20chan_freq_mhz(
        &self,
        vdev: VdevId,
    ) -> Result<u16, SpectralError> {
        self.callbacks()?.vdev_get_sec20chan_freq_mhz(vdev)
    }
}

impl Default for SpectralUtils<'_> {
    fn default() -> Self {
        Self::new()
    }
}
