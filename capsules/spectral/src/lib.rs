// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Spectral scan support for Wi-Fi radios.
//!
//! The radio can periodically run an FFT over the channel it is tuned to and
//! report the power per frequency bin. `Spectral` is the controller: it holds
//! the scan parameters, derives the FFT layout from the channel width, and
//! drives a `SpectralOps` implementation. `WmiOps` drives firmware that is
//! configured over WMI commands, `SimOps` replays canned reports paced by an
//! alarm.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let utils = static_init!(SpectralUtils<'static>, SpectralUtils::new());
//! utils.register_legacy_cb(vdev_mgr);
//! let ops = static_init!(
//!     WmiOps<'static, WmiTransport>,
//!     WmiOps::new(wmi, pdev, utils)
//! );
//! let spectral = static_init!(
//!     Spectral<'static, WmiOps<'static, WmiTransport>>,
//!     Spectral::new(ops)?
//! );
//! ops.set_report_client(spectral);
//! spectral.start_spectral_scan()?;
//! ```

#![no_std]
#![forbid(unsafe_code)]

pub mod alarm;
pub mod config;
pub mod error;
pub mod legacy;
pub mod ops;
pub mod report;
pub mod scan;
pub mod sim;

pub use alarm::{Alarm, AlarmClient};
pub use config::{ParamId, SpectralParams};
pub use error::SpectralError;
pub use legacy::{ChannelWidth, LegacyCallbacks, SpectralUtils, VdevId};
pub use ops::{NullOps, SpectralOps, WmiOps, WmiSender};
pub use report::{FftSample, SearchFft};
pub use scan::{Spectral, SpectralClient};
pub use sim::{SimOps, NUM_REPORT_SETS};
