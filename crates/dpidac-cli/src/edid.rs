// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Synthesize the EDID an attached bridge would publish.

use crate::config::{resolve_config, IdentityArgs, SourceArgs};
use crate::error::CliError;
use crate::utils::{hex_dump, print_json};
use clap::Args as ClapArgs;
use dpidac::bridge::Bridge;
use serde::Serialize;
use std::path::PathBuf;

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[command(flatten)]
    sources: SourceArgs,

    #[command(flatten)]
    identity: IdentityArgs,

    /// Write the 256-byte binary EDID to FILE instead of printing a hex dump
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EdidOutput {
    size: usize,
    valid: bool,
    vendor: String,
    product_code: u16,
    serial: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    native_vic: Option<u8>,
    vics: Vec<VicInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    hex: String,
}

#[derive(Debug, Serialize)]
struct VicInfo {
    vic: u8,
    native: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing edid command: {:?}", args);

    let config = resolve_config(&args.sources, Some(&args.identity))?;
    let identity = config.identity().clone();
    let mut bridge = Bridge::create(config);
    let published = bridge.attach()?;
    let edid = &published.edid;

    if let Some(path) = &args.output {
        std::fs::write(path, edid.as_bytes()).map_err(|e| {
            CliError::General(format!("Failed to write {}: {}", path.display(), e))
        })?;
        log::info!("Wrote {} bytes to {}", edid.len(), path.display());
    }

    if json {
        let output = EdidOutput {
            size: edid.len(),
            valid: edid.is_valid(),
            vendor: edid.vendor(),
            product_code: identity.product_code,
            serial: identity.serial,
            name: edid.display_name(),
            preferred_mode: published
                .catalog
                .preferred()
                .map(|mode| mode.display_name().to_string()),
            native_vic: edid.native_vic(),
            vics: edid
                .vics()
                .into_iter()
                .map(|(vic, native)| VicInfo { vic, native })
                .collect(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            hex: edid.as_bytes().iter().map(|b| format!("{:02x}", b)).collect(),
        };
        print_json(&output)?;
    } else if args.output.is_none() {
        print!("{}", hex_dump(edid.as_bytes()));
    }

    bridge.destroy();
    Ok(())
}
