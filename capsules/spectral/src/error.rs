// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpectralError {
    /// The radio has no virtual device to scan on.
    NoVdev,
    /// No legacy callbacks were registered.
    NoCallbacks,
    /// The hardware lacks a capability spectral scan needs.
    NotSupported,
    /// The operation is not available on these ops.
    NoSpectral,
    /// The firmware rejected a WMI command or it could not be sent.
    Wmi,
    InvalidChannelWidth,
    /// The simulator has no reports for the width or configuration.
    NoReportSet,
}

impl fmt::Display for SpectralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SpectralError::NoVdev => "no vdev",
            SpectralError::NoCallbacks => "legacy callbacks not registered",
            SpectralError::NotSupported => "spectral scan not supported",
            SpectralError::NoSpectral => "operation not available",
            SpectralError::Wmi => "WMI command failed",
            SpectralError::InvalidChannelWidth => "invalid channel width",
            SpectralError::NoReportSet => "no simulation data for configuration",
        };
        f.write_str(msg)
    }
}
