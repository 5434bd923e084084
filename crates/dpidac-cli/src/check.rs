// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Validate a timings document line by line.

use crate::error::CliError;
use crate::utils::{format_mhz, print_json};
use clap::Args as ClapArgs;
use dpidac::timing::{parse_timing_line, try_read_timings_document, TimingLines, READ_SIZE_MAX};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Timings document to check
    file: PathBuf,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum LineStatus {
    Ok,
    Error,
    Comment,
    Skipped,
}

#[derive(Debug, Serialize)]
struct LineReport {
    line: usize,
    status: LineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    file: String,
    bytes: usize,
    truncated: bool,
    valid: usize,
    invalid: usize,
    lines: Vec<LineReport>,
}

/// Whether the file holds more than the [`READ_SIZE_MAX`] bytes the bridge
/// reads.
fn is_truncated(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.len() > READ_SIZE_MAX as u64)
        .unwrap_or(false)
}

fn check_document(document: &[u8]) -> Vec<LineReport> {
    TimingLines::new(document)
        .map(|raw| {
            let (status, mode, message) = if raw.is_comment() {
                (LineStatus::Comment, None, None)
            } else if raw.is_too_short() {
                (LineStatus::Skipped, None, None)
            } else {
                match parse_timing_line(&raw.text) {
                    Ok(timing) => (
                        LineStatus::Ok,
                        Some(format!(
                            "{}@{} {}",
                            timing.name(),
                            timing.refresh_rounded(),
                            format_mhz(timing.pixel_clock_hz)
                        )),
                        None,
                    ),
                    Err(e) => (LineStatus::Error, None, Some(e.to_string())),
                }
            };
            LineReport {
                line: raw.number,
                status,
                mode,
                message,
            }
        })
        .collect()
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing check command: {:?}", args);

    let document = try_read_timings_document(&args.file)?;
    let lines = check_document(&document);
    let count = |status| lines.iter().filter(|l| l.status == status).count();
    let (valid, invalid) = (count(LineStatus::Ok), count(LineStatus::Error));
    let truncated = is_truncated(&args.file);

    if json {
        print_json(&CheckOutput {
            file: args.file.display().to_string(),
            bytes: document.len(),
            truncated,
            valid,
            invalid,
            lines,
        })?;
    } else {
        for report in &lines {
            match report.status {
                LineStatus::Ok => println!(
                    "line {}: ok {}",
                    report.line,
                    report.mode.as_deref().unwrap_or_default()
                ),
                LineStatus::Error => println!(
                    "line {}: error {}",
                    report.line,
                    report.message.as_deref().unwrap_or_default()
                ),
                LineStatus::Comment | LineStatus::Skipped => {}
            }
        }
        if truncated {
            println!("note: only the first {} bytes are read", READ_SIZE_MAX);
        }
        println!("{} valid, {} invalid", valid, invalid);
    }

    if invalid > 0 {
        return Err(CliError::General(format!(
            "{} malformed line(s) in {}",
            invalid,
            args.file.display()
        )));
    }
    if valid == 0 {
        log::warn!(
            "{} has no usable modes, the built-in defaults would be used",
            args.file.display()
        );
    }
    Ok(())
}
