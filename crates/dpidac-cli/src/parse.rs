// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Show how a forced or preferred mode descriptor resolves.

use crate::error::CliError;
use crate::utils::{format_mhz, print_json};
use clap::Args as ClapArgs;
use dpidac::catalog::{cea_label, resolve_forced_mode};
use dpidac::edid::vic_for_label;
use dpidac::mode::{DesiredModeSpec, ForceFlag, ForcedMode};
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Mode descriptor, e.g. "720p60", "1366x768R@60" or a 13-field timings line
    descriptor: String,
}

#[derive(Debug, Serialize)]
struct ParseOutput {
    descriptor: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_spec: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flags: Vec<String>,
    forced: ForcedOutput,
}

#[derive(Debug, Serialize)]
struct ForcedOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_clock_hz: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cea_label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vic: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn descriptor_flags(mode: Option<&ForcedMode>) -> Vec<String> {
    let Some(ForcedMode::Descriptor(desc)) = mode else {
        return Vec::new();
    };
    let mut flags = Vec::new();
    if desc.cvt {
        flags.push("cvt".to_string());
    }
    if desc.reduced_blanking {
        flags.push("reduced-blanking".to_string());
    }
    if desc.interlaced {
        flags.push("interlaced".to_string());
    }
    if desc.margins {
        flags.push("margins".to_string());
    }
    if let Some(bpp) = desc.bpp {
        flags.push(format!("bpp={}", bpp));
    }
    match desc.force {
        Some(ForceFlag::Enable) => flags.push("force-on".to_string()),
        Some(ForceFlag::EnableDigital) => flags.push("force-digital".to_string()),
        Some(ForceFlag::Disable) => flags.push("force-off".to_string()),
        None => {}
    }
    flags
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing parse command: {:?}", args);

    let descriptor = args.descriptor.trim();
    if descriptor.is_empty() {
        return Err(CliError::InvalidArgs("Empty mode descriptor".to_string()));
    }

    let spec = DesiredModeSpec::parse(descriptor).ok();
    let parsed = match ForcedMode::parse(descriptor) {
        Ok(mode) => Some(mode),
        Err(e) if spec.is_none() => return Err(e.into()),
        Err(e) => {
            log::warn!("not usable as a forced mode: {}", e);
            None
        }
    };
    let kind = match parsed {
        Some(ForcedMode::Timing(_)) => "timing-line",
        Some(ForcedMode::Descriptor(_)) => "mode-descriptor",
        None => "preferred-only",
    };

    let forced = match resolve_forced_mode(descriptor) {
        Ok(timing) => {
            let label = cea_label(&timing);
            ForcedOutput {
                name: Some(format!("{}@{}", timing.name(), timing.refresh_rounded())),
                pixel_clock_hz: Some(timing.pixel_clock_hz),
                cea_label: label,
                vic: label.and_then(vic_for_label),
                modeline: Some(timing.to_string()),
                error: None,
            }
        }
        Err(e) => ForcedOutput {
            name: None,
            pixel_clock_hz: None,
            cea_label: None,
            vic: None,
            modeline: None,
            error: Some(e.to_string()),
        },
    };

    let output = ParseOutput {
        descriptor: descriptor.to_string(),
        kind,
        preferred_spec: spec.map(|s| s.to_string()),
        flags: descriptor_flags(parsed.as_ref()),
        forced,
    };

    if json {
        return print_json(&output);
    }

    println!("descriptor: {} ({})", output.descriptor, output.kind);
    if let Some(spec) = &output.preferred_spec {
        println!("preferred:  matches {}", spec);
    }
    if !output.flags.is_empty() {
        println!("flags:      {}", output.flags.join(", "));
    }
    match (&output.forced.name, &output.forced.error) {
        (Some(name), _) => {
            println!(
                "forced:     {} {}",
                name,
                format_mhz(output.forced.pixel_clock_hz.unwrap_or_default())
            );
            if let (Some(label), Some(vic)) = (output.forced.cea_label, output.forced.vic) {
                println!("cea:        {} (VIC {})", label, vic);
            }
            if let Some(modeline) = &output.forced.modeline {
                println!("modeline:   {}", modeline);
            }
        }
        (None, Some(error)) => println!("forced:     unusable ({})", error),
        (None, None) => {}
    }

    Ok(())
}
