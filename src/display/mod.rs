// SPDX-License-Identifier: GPL-3.0-only
//! Display mode catalog and output state types
//!
//! This module contains the host-side model of what the device can show
//! (mode descriptors and groups) and what it is showing (the display
//! state sum type).

pub mod mode;
pub mod state;

pub use mode::{
    ExplicitMode, HdmiAspect, HdmiDrive, MatchFlags, ModeDescriptor, ModeGroup, PreferredMode,
    ScanMode, SdtvAspect, SdtvColour, SdtvCpMode, SdtvMode, SdtvSelection, ThreeDFormat,
    ThreeDStructMask, MAX_MODE_ID,
};
pub use state::{DisplayState, HdmiState, PixelEncoding, SdtvState};
