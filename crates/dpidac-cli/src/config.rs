// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Bridge configuration from a JSON file, the environment and flags.
//!
//! Precedence, lowest first: library defaults, `DPIDAC_TIMINGS`, the
//! `--config` file, command-line flags.

use crate::error::CliError;
use crate::utils::parse_number;
use clap::Args as ClapArgs;
use dpidac::bridge::BridgeConfig;
use dpidac::edid::DisplayIdentity;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Timings document read when nothing else is configured
pub const DEFAULT_TIMINGS_PATH: &str = "/boot/firmware/timings.txt";

/// Environment variable overriding [`DEFAULT_TIMINGS_PATH`]
pub const TIMINGS_ENV: &str = "DPIDAC_TIMINGS";

/// Mode source flags shared by the `modes` and `edid` commands
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SourceArgs {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Timings document (default: $DPIDAC_TIMINGS or /boot/firmware/timings.txt)
    #[arg(short, long, value_name = "FILE")]
    pub timings: Option<PathBuf>,

    /// Ignore any timings document
    #[arg(long, conflicts_with = "timings")]
    pub no_timings: bool,

    /// Forced mode, e.g. "1280x720@60", "720p50" or a 13-field timings line
    #[arg(short, long, value_name = "MODE")]
    pub forced: Option<String>,

    /// Preferred mode, e.g. "1080p60" or "1024x768@60"
    #[arg(short, long, value_name = "MODE")]
    pub preferred: Option<String>,

    /// Pixel bus format (see `dpidac formats`)
    #[arg(short, long, value_name = "FORMAT")]
    pub bus_format: Option<String>,
}

/// Display identity flags of the `edid` command
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct IdentityArgs {
    /// Three-letter vendor code
    #[arg(long)]
    pub vendor: Option<String>,

    /// Product code (decimal or 0x-prefixed hex)
    #[arg(long)]
    pub product: Option<String>,

    /// Serial number (decimal or 0x-prefixed hex)
    #[arg(long)]
    pub serial: Option<String>,

    /// Display name, at most 13 characters
    #[arg(long)]
    pub name: Option<String>,

    /// Week of manufacture (0-54)
    #[arg(long)]
    pub week: Option<u8>,

    /// Year of manufacture (1990-2245)
    #[arg(long)]
    pub year: Option<u16>,
}

/// On-disk configuration
///
/// ```json
/// {
///   "forced_mode": "",
///   "preferred_mode": "720p60",
///   "bus_format": "rgb666-padhi",
///   "timings": "/boot/firmware/timings.txt",
///   "identity": { "vendor": "RPI", "name": "DPIDAC" }
/// }
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub forced_mode: Option<String>,
    pub preferred_mode: Option<String>,
    pub bus_format: Option<String>,
    pub timings: Option<PathBuf>,
    pub identity: IdentityFile,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityFile {
    pub vendor: Option<String>,
    pub product_code: Option<u16>,
    pub serial: Option<u32>,
    pub week: Option<u8>,
    pub year: Option<u16>,
    pub name: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(format!("{}: {}", path.display(), e))
            }
            _ => CliError::General(format!("Failed to read {}: {}", path.display(), e)),
        })?;
        Self::from_json(&text)
            .map_err(|e| CliError::InvalidArgs(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl IdentityFile {
    fn apply(&self, identity: &mut DisplayIdentity) {
        if let Some(vendor) = &self.vendor {
            identity.vendor = vendor.clone();
        }
        if let Some(product_code) = self.product_code {
            identity.product_code = product_code;
        }
        if let Some(serial) = self.serial {
            identity.serial = serial;
        }
        if let Some(week) = self.week {
            identity.week = week;
        }
        if let Some(year) = self.year {
            identity.year = year;
        }
        if let Some(name) = &self.name {
            identity.name = name.clone();
        }
    }
}

impl IdentityArgs {
    fn apply(&self, identity: &mut DisplayIdentity) -> Result<(), CliError> {
        if let Some(vendor) = &self.vendor {
            identity.vendor = vendor.to_ascii_uppercase();
        }
        if let Some(product) = &self.product {
            identity.product_code = u16::try_from(parse_number(product)?).map_err(|_| {
                CliError::InvalidArgs(format!("Product code out of range: {}", product))
            })?;
        }
        if let Some(serial) = &self.serial {
            identity.serial = parse_number(serial)?;
        }
        if let Some(week) = self.week {
            identity.week = week;
        }
        if let Some(year) = self.year {
            identity.year = year;
        }
        if let Some(name) = &self.name {
            identity.name = name.clone();
        }
        Ok(())
    }
}

fn default_timings_path() -> PathBuf {
    std::env::var_os(TIMINGS_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TIMINGS_PATH))
}

/// Build the bridge configuration from all layers.
pub fn resolve_config(
    sources: &SourceArgs,
    identity: Option<&IdentityArgs>,
) -> Result<BridgeConfig, CliError> {
    let file = match &sources.config {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            ConfigFile::load(path)?
        }
        None => ConfigFile::default(),
    };

    let mut config = BridgeConfig::default();

    if let Some(forced) = sources.forced.as_ref().or(file.forced_mode.as_ref()) {
        config.set_forced_mode(forced);
    }
    if let Some(preferred) = sources.preferred.as_ref().or(file.preferred_mode.as_ref()) {
        config.set_preferred_mode(preferred);
    }
    if let Some(format) = sources.bus_format.as_ref().or(file.bus_format.as_ref()) {
        config.set_bus_format(format)?;
    }

    let timings = if sources.no_timings {
        None
    } else {
        Some(
            sources
                .timings
                .clone()
                .or(file.timings)
                .unwrap_or_else(default_timings_path),
        )
    };
    config.set_timings_path(timings);

    let mut display = config.identity().clone();
    file.identity.apply(&mut display);
    if let Some(args) = identity {
        args.apply(&mut display)?;
    }
    display.validate()?;
    config.set_identity(display);

    log::debug!("Resolved configuration: {:?}", config);
    Ok(config)
}
