// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Driver for the GSI (Generic Software Interface) DMA engine of the
//! Qualcomm IP Accelerator. The register map follows the hardware version
//! passed to [`hal::GsiHal::new`], from v1.0 to v3.0.

#![no_std]
#![crate_name = "gsi"]
#![crate_type = "rlib"]

pub mod bus;
pub mod channel;
pub mod error;
pub mod evt_ring;
pub mod hal;
pub mod irq;
pub mod registers;
pub mod regmap;
pub mod ring;

#[cfg(test)]
mod test_bus;
