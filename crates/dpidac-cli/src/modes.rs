// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Resolve and print the mode catalog.

use crate::config::{resolve_config, SourceArgs};
use crate::error::CliError;
use crate::utils::{format_mhz, print_json};
use clap::Args as ClapArgs;
use dpidac::bridge::Bridge;
use dpidac::catalog::{CandidateMode, Diagnostic, ModeCatalog};
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    #[command(flatten)]
    sources: SourceArgs,

    /// Print X11 modelines instead of the summary table
    #[arg(long)]
    modelines: bool,
}

#[derive(Debug, Serialize)]
pub struct ModesOutput {
    pub bus_format: String,
    pub media_bus_code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    pub modes: Vec<ModeInfo>,
    pub diagnostics: Vec<DiagnosticInfo>,
}

#[derive(Debug, Serialize)]
pub struct ModeInfo {
    pub name: String,
    pub origin: &'static str,
    pub preferred: bool,
    pub native: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cea_label: Option<&'static str>,
    pub pixel_clock_hz: u64,
    pub refresh_hz: f64,
    pub h_active: u32,
    pub h_front_porch: u32,
    pub h_sync_len: u32,
    pub h_back_porch: u32,
    pub v_active: u32,
    pub v_front_porch: u32,
    pub v_sync_len: u32,
    pub v_back_porch: u32,
    pub interlaced: bool,
    pub hsync: String,
    pub vsync: String,
    pub modeline: String,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticInfo {
    pub origin: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl From<&CandidateMode> for ModeInfo {
    fn from(mode: &CandidateMode) -> Self {
        let t = mode.timing();
        ModeInfo {
            name: mode.display_name().to_string(),
            origin: mode.origin().name(),
            preferred: mode.is_preferred(),
            native: mode.is_native(),
            cea_label: mode.cea_label(),
            pixel_clock_hz: t.pixel_clock_hz,
            refresh_hz: (t.refresh_hz() * 100.0).round() / 100.0,
            h_active: t.h_active,
            h_front_porch: t.h_front_porch,
            h_sync_len: t.h_sync_len,
            h_back_porch: t.h_back_porch,
            v_active: t.v_active,
            v_front_porch: t.v_front_porch,
            v_sync_len: t.v_sync_len,
            v_back_porch: t.v_back_porch,
            interlaced: t.interlaced,
            hsync: t.h_sync_polarity.sign().to_string(),
            vsync: t.v_sync_polarity.sign().to_string(),
            modeline: t.to_string(),
        }
    }
}

impl From<&Diagnostic> for DiagnosticInfo {
    fn from(diag: &Diagnostic) -> Self {
        DiagnosticInfo {
            origin: diag.origin.name(),
            line: diag.line,
            message: diag.message.clone(),
        }
    }
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing modes command: {:?}", args);

    let config = resolve_config(&args.sources, None)?;
    let bus_format = config.bus_format();
    let catalog = Bridge::create(config).resolve_modes();

    if json {
        let output = ModesOutput {
            bus_format: bus_format.name().to_string(),
            media_bus_code: bus_format.media_bus_code(),
            preferred: catalog
                .preferred()
                .map(|mode| mode.display_name().to_string()),
            modes: catalog.iter().map(ModeInfo::from).collect(),
            diagnostics: catalog.diagnostics().iter().map(DiagnosticInfo::from).collect(),
        };
        return print_json(&output);
    }

    if args.modelines {
        for mode in &catalog {
            println!("Modeline {}", mode.timing());
        }
    } else {
        print_table(&catalog);
    }

    for diag in catalog.diagnostics() {
        eprintln!("warning: {}", diag);
    }

    Ok(())
}

fn print_table(catalog: &ModeCatalog) {
    println!(
        "  {:<16} {:>12}  {:>8}  {:<22} {}",
        "MODE", "CLOCK", "REFRESH", "ORIGIN", "FLAGS"
    );
    for mode in catalog {
        let marker = if mode.is_preferred() { '*' } else { ' ' };
        let mut flags = Vec::new();
        if mode.is_preferred() {
            flags.push("preferred".to_string());
        }
        if mode.is_native() {
            flags.push("native".to_string());
        }
        if let Some(label) = mode.cea_label() {
            flags.push(format!("cea:{}", label));
        }
        println!(
            "{} {:<16} {:>12}  {:>5.2} Hz  {:<22} {}",
            marker,
            mode.display_name(),
            format_mhz(mode.timing().pixel_clock_hz),
            mode.timing().refresh_hz(),
            mode.origin().name(),
            flags.join(",")
        );
    }
}
