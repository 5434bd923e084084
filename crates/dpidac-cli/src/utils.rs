// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use serde::Serialize;
use std::fmt::Write;

/// Parse an unsigned number in decimal or `0x`-prefixed hexadecimal
///
/// # Examples
/// ```ignore
/// assert_eq!(parse_number("3500").unwrap(), 3500);
/// assert_eq!(parse_number("0x0dac").unwrap(), 0x0dac);
/// ```
pub fn parse_number(s: &str) -> Result<u32, CliError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|_| CliError::InvalidArgs(format!("Invalid number: {}", s)))
}

/// Format bytes as a classic hex dump, 16 bytes per row with offsets
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4);
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}:", row * 16);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}

/// Format a pixel clock in MHz with two decimals
pub fn format_mhz(hz: u64) -> String {
    format!("{:.2} MHz", hz as f64 / 1_000_000.0)
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
    println!("{}", json);
    Ok(())
}
