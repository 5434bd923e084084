// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments or configuration values
    InvalidArgs(String),
    /// Timings document or configuration file not found
    FileNotFound(String),
    /// EDID buffer could not be allocated
    AllocationFailure(String),
    /// General error from the dpidac library
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            CliError::AllocationFailure(msg) => write!(f, "Allocation failure: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            CliError::InvalidArgs(_) => 2,
            CliError::FileNotFound(_) => 3,
            CliError::AllocationFailure(_) => 4,
            CliError::General(_) => 1,
        }
    }
}

/// Map dpidac::Error to CliError with appropriate exit codes
impl From<dpidac::Error> for CliError {
    fn from(err: dpidac::Error) -> Self {
        use dpidac::Error;

        match err {
            Error::MalformedLine(msg) => CliError::InvalidArgs(format!("Malformed mode: {}", msg)),
            Error::UnrecognizedBusFormat(name) => CliError::InvalidArgs(format!(
                "Unrecognized bus format: {} (see `dpidac formats`)",
                name
            )),
            Error::InvalidIdentity(msg) => {
                CliError::InvalidArgs(format!("Invalid display identity: {}", msg))
            }
            Error::AllocationFailure => {
                CliError::AllocationFailure("Failed to allocate EDID buffer".to_string())
            }
            Error::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound => CliError::FileNotFound(io_err.to_string()),
                std::io::ErrorKind::PermissionDenied => {
                    CliError::FileNotFound(format!("Permission denied: {}", io_err))
                }
                _ => CliError::General(format!("I/O error: {}", io_err)),
            },
        }
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}
