// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Parallel RGB bus formats
//!
//! The DAC samples a subset of the DPI data pins, so the format the display
//! controller drives must match how the resistor ladder is wired. Formats are
//! named the way the bridge configuration names them and map to the kernel's
//! `MEDIA_BUS_FMT_*` codes.

use std::{fmt, str::FromStr};

use crate::Error;

/// Pixel layout on the DPI data pins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusFormat {
    Rgb565,
    Rgb565PadHi,
    Bgr666,
    Bgr666PadHi,
    /// 18-bit RGB in the low bits of a 24-bit bus, the stock VGA666 wiring
    #[default]
    Rgb666PadHi,
    Bgr888,
    Rgb888,
}

impl BusFormat {
    pub const ALL: [BusFormat; 7] = [
        BusFormat::Rgb565,
        BusFormat::Rgb565PadHi,
        BusFormat::Bgr666,
        BusFormat::Bgr666PadHi,
        BusFormat::Rgb666PadHi,
        BusFormat::Bgr888,
        BusFormat::Rgb888,
    ];

    /// Configuration name, e.g. `"rgb666-padhi"`
    pub fn name(&self) -> &'static str {
        match self {
            BusFormat::Rgb565 => "rgb565",
            BusFormat::Rgb565PadHi => "rgb565-padhi",
            BusFormat::Bgr666 => "bgr666",
            BusFormat::Bgr666PadHi => "bgr666-padhi",
            BusFormat::Rgb666PadHi => "rgb666-padhi",
            BusFormat::Bgr888 => "bgr888",
            BusFormat::Rgb888 => "rgb888",
        }
    }

    /// Kernel `MEDIA_BUS_FMT_*` identifier
    pub fn media_bus_name(&self) -> &'static str {
        match self {
            BusFormat::Rgb565 => "MEDIA_BUS_FMT_RGB565_1X16",
            BusFormat::Rgb565PadHi => "MEDIA_BUS_FMT_RGB565_1X24_CPADHI",
            BusFormat::Bgr666 => "MEDIA_BUS_FMT_BGR666_1X18",
            BusFormat::Bgr666PadHi => "MEDIA_BUS_FMT_BGR666_1X24_CPADHI",
            BusFormat::Rgb666PadHi => "MEDIA_BUS_FMT_RGB666_1X24_CPADHI",
            BusFormat::Bgr888 => "MEDIA_BUS_FMT_BGR888_1X24",
            BusFormat::Rgb888 => "MEDIA_BUS_FMT_RGB888_1X24",
        }
    }

    /// Numeric `MEDIA_BUS_FMT_*` code
    pub fn media_bus_code(&self) -> u32 {
        match self {
            BusFormat::Rgb565 => 0x1017,
            BusFormat::Rgb565PadHi => 0x1022,
            BusFormat::Bgr666 => 0x1023,
            BusFormat::Bgr666PadHi => 0x1024,
            BusFormat::Rgb666PadHi => 0x1015,
            BusFormat::Bgr888 => 0x1013,
            BusFormat::Rgb888 => 0x100a,
        }
    }

    /// Bits per pixel actually carried to the DAC
    pub fn color_depth(&self) -> u32 {
        match self {
            BusFormat::Rgb565 | BusFormat::Rgb565PadHi => 16,
            BusFormat::Bgr666 | BusFormat::Bgr666PadHi | BusFormat::Rgb666PadHi => 18,
            BusFormat::Bgr888 | BusFormat::Rgb888 => 24,
        }
    }
}

impl FromStr for BusFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BusFormat::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnrecognizedBusFormat(s.to_string()))
    }
}

impl fmt::Display for BusFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
