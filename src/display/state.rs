// SPDX-License-Identifier: GPL-3.0-only
//! Current output state as reported by the device.
//!
//! Exactly one output can be active at a time, so the state is a sum type
//! rather than a flag word: either everything is off, or the HDMI path is
//! up, or the SDTV path is, or an LCD panel owns the output.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::mode::{
    HdmiAspect, HdmiDrive, ModeGroup, ScanMode, SdtvAspect, SdtvColour, SdtvCpMode, SdtvMode,
    ThreeDFormat,
};

/// Pixel encoding on an active HDMI output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelEncoding {
    #[default]
    Default,
    RgbLimited,
    RgbFull,
    YcbcrLimited,
    YcbcrFull,
}

/// Payload for an active HDMI (or DVI) output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HdmiState {
    pub drive: HdmiDrive,
    pub group: ModeGroup,
    pub code: u32,
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate in Hz; callers apply the 1000/1001 correction
    /// when the pixel clock type property says NTSC.
    pub frame_rate: u32,
    pub scan_mode: ScanMode,
    pub aspect: HdmiAspect,
    pub pixel_rep: u32,
    pub pixel_encoding: PixelEncoding,
    pub format_3d: Option<ThreeDFormat>,
    pub hdcp_active: bool,
}

/// Payload for an active analog TV output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SdtvState {
    pub mode: SdtvMode,
    pub aspect: SdtvAspect,
    pub colour: SdtvColour,
    pub cp_mode: Option<SdtvCpMode>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// What the output is doing right now.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DisplayState {
    Off,
    Hdmi(HdmiState),
    Sdtv(SdtvState),
    Lcd,
}

impl DisplayState {
    pub fn is_off(&self) -> bool {
        matches!(self, DisplayState::Off)
    }

    /// Active geometry, when there is one.
    pub fn resolution(&self) -> Option<(u32, u32)> {
        match self {
            DisplayState::Hdmi(h) => Some((h.width, h.height)),
            DisplayState::Sdtv(s) => Some((s.width, s.height)),
            DisplayState::Off | DisplayState::Lcd => None,
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayState::Off => write!(f, "TV is off"),
            DisplayState::Lcd => write!(f, "LCD panel active"),
            DisplayState::Hdmi(h) => {
                let scan = match h.scan_mode {
                    ScanMode::Progressive => "progressive",
                    ScanMode::Interlaced => "interlaced",
                };
                write!(
                    f,
                    "{} {} ({}) {}, {}x{} @ {}Hz, {}",
                    h.drive, h.group, h.code, h.aspect, h.width, h.height, h.frame_rate, scan
                )?;
                if let Some(threed) = h.format_3d {
                    write!(f, ", {threed}")?;
                }
                Ok(())
            }
            DisplayState::Sdtv(s) => {
                write!(
                    f,
                    "SDTV {} {}, {}x{} @ {}Hz",
                    s.mode, s.aspect, s.width, s.height, s.frame_rate
                )
            }
        }
    }
}
