// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Host Target Transport (HTT) statistics.
//!
//! The Wi-Fi firmware reports its extended statistics as a stream of
//! little-endian TLVs. This crate walks such a stream, decodes the TLVs with a
//! fixed layout, folds a stream into a summary, and keeps the circular logs
//! the host uses to trace HTT traffic.

// Decoding is done on byte slices only.
#![forbid(unsafe_code)]
#![no_std]

pub mod aggregate;
pub mod logger;
pub mod request;
pub mod stats;
pub mod tags;
pub mod tlv;

use core::fmt;

/// Errors when decoding HTT statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttError {
    /// The buffer ends before the TLV or structure does.
    Truncated,
    /// The value is not a known tag or stats type.
    InvalidTag(u32),
    /// The length is not valid for this TLV.
    InvalidLength,
}

impl fmt::Display for HttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttError::Truncated => f.write_str("truncated TLV"),
            HttError::InvalidTag(tag) => write!(f, "invalid tag {}", tag),
            HttError::InvalidLength => f.write_str("invalid TLV length"),
        }
    }
}
