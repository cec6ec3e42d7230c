// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

use core::fmt;

use crate::regmap::GsiReg;

/// Errors reported by the GSI driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GsiError {
    /// The register does not exist on this hardware version.
    ObsoleteRegister(GsiReg),
    /// The register has no field layout, only raw access is possible.
    NoFieldAccessor(GsiReg),
    /// Ring length does not fit the context registers.
    InvalidRingLength,
    /// Index past the end of a register array or RAM window.
    OutOfRange,
    /// The command is not legal in the current channel state.
    InvalidState,
    /// The hardware did not reach the expected state in time.
    Timeout,
    /// The hardware moved the channel or event ring to its error state.
    ChannelError,
    /// Not enough free elements in the ring.
    RingFull,
    /// The pointer does not belong to the ring.
    InvalidPointer,
    /// The operation is not supported by this hardware version.
    UnsupportedVersion,
}

impl fmt::Display for GsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GsiError::ObsoleteRegister(reg) => write!(f, "access to obsolete reg={}", reg.name()),
            GsiError::NoFieldAccessor(reg) => write!(f, "no field accessor for reg={}", reg.name()),
            GsiError::InvalidRingLength => f.write_str("invalid ring length"),
            GsiError::OutOfRange => f.write_str("index out of range"),
            GsiError::InvalidState => f.write_str("command not allowed in current state"),
            GsiError::Timeout => f.write_str("timed out waiting for hardware"),
            GsiError::ChannelError => f.write_str("channel in error state"),
            GsiError::RingFull => f.write_str("ring full"),
            GsiError::InvalidPointer => f.write_str("pointer outside ring"),
            GsiError::UnsupportedVersion => f.write_str("not supported by this GSI version"),
        }
    }
}
