// SPDX-License-Identifier: GPL-3.0-only
//! Error types for TV service control
//!
//! Separates transport failures (the command never made it to the device)
//! from device rejections (the device answered with a negative code).

use thiserror::Error;

use crate::transport::TransportError;

/// Rejection codes returned by the device for a well-formed command it
/// refuses to carry out. Small positive integers on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceError {
    FormatUnsupported,
    InvalidFormat,
    InvalidProperty,
    InvalidValue,
    OutOfRange,
    InvalidInfoframe,
    Unknown(i32),
}

impl DeviceError {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => DeviceError::FormatUnsupported,
            2 => DeviceError::InvalidFormat,
            3 => DeviceError::InvalidProperty,
            4 => DeviceError::InvalidValue,
            5 => DeviceError::OutOfRange,
            6 => DeviceError::InvalidInfoframe,
            other => DeviceError::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            DeviceError::FormatUnsupported => 1,
            DeviceError::InvalidFormat => 2,
            DeviceError::InvalidProperty => 3,
            DeviceError::InvalidValue => 4,
            DeviceError::OutOfRange => 5,
            DeviceError::InvalidInfoframe => 6,
            DeviceError::Unknown(code) => *code,
        }
    }
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::FormatUnsupported => write!(f, "format unsupported"),
            DeviceError::InvalidFormat => write!(f, "invalid format"),
            DeviceError::InvalidProperty => write!(f, "invalid property"),
            DeviceError::InvalidValue => write!(f, "invalid value"),
            DeviceError::OutOfRange => write!(f, "out of range"),
            DeviceError::InvalidInfoframe => write!(f, "invalid infoframe"),
            DeviceError::Unknown(code) => write!(f, "unknown device error {code}"),
        }
    }
}

/// Main error type for TV service operations
#[derive(Error, Debug)]
pub enum TvError {
    /// The command could not be delivered or no reply arrived
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device understood the command and rejected it
    #[error("device rejected command: {0}")]
    Device(DeviceError),

    /// Host-side validation: mode code outside the 7-bit namespace
    #[error("mode code {code} out of range (max 127)")]
    InvalidMode { code: u32 },

    /// All notification subscriber slots are taken
    #[error("notification registry full")]
    RegistryFull,

    /// The very first EDID block came back short; nothing is usable
    #[error("short first EDID block ({got} of 128 bytes)")]
    EdidShortFirstBlock { got: usize },

    /// The reply variant does not match the command that was sent
    #[error("unexpected reply to '{command}'")]
    UnexpectedReply { command: &'static str },
}

/// Result type alias for TvError
pub type Result<T> = std::result::Result<T, TvError>;
