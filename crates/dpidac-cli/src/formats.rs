// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::utils::print_json;
use clap::Args as ClapArgs;
use dpidac::bus_format::BusFormat;
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {}

#[derive(Debug, Serialize)]
struct FormatInfo {
    name: &'static str,
    media_bus_format: &'static str,
    media_bus_code: u32,
    color_depth: u32,
    default: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing formats command: {:?}", args);

    let formats: Vec<FormatInfo> = BusFormat::ALL
        .iter()
        .map(|format| FormatInfo {
            name: format.name(),
            media_bus_format: format.media_bus_name(),
            media_bus_code: format.media_bus_code(),
            color_depth: format.color_depth(),
            default: *format == BusFormat::default(),
        })
        .collect();

    if json {
        return print_json(&formats);
    }

    for info in &formats {
        println!(
            "{} {:<14} {:<34} 0x{:04x}  {}-bit",
            if info.default { '*' } else { ' ' },
            info.name,
            info.media_bus_format,
            info.media_bus_code,
            info.color_depth
        );
    }
    Ok(())
}
