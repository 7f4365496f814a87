// SPDX-License-Identifier: GPL-3.0-only
//! Typed command contract between the client and a transport.
//!
//! The client never sees wire bytes: it hands a [`Request`] to the
//! transport and gets a [`Reply`] back. How those are framed is entirely
//! the transport's business.

use serde::{Deserialize, Serialize};

use crate::audio::{AudioFormat, SampleRate, SampleSize};
use crate::display::{
    DisplayState, MatchFlags, ModeDescriptor, ModeGroup, PreferredMode, SdtvAspect, SdtvCpMode,
    SdtvMode,
};

/// Device-side properties read and written around power-on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyId {
    /// RGB/YCbCr range on the HDMI output.
    PixelEncoding,
    /// Nominal vs NTSC-adjusted (1000/1001) pixel clock.
    PixelClockType,
    /// Content type signalled in the AVI infoframe.
    ContentType,
    /// Whether best-match may relax unset criteria further.
    FuzzyMatch,
    /// Stereoscopic structure for the next power-on.
    ThreeDStructure,
}

/// Pixel clock type values for [`PropertyId::PixelClockType`].
pub const PIXEL_CLOCK_TYPE_PAL: u32 = 0;
pub const PIXEL_CLOCK_TYPE_NTSC: u32 = 1;

/// One property write: which property and up to two parameter words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySetting {
    pub property: PropertyId,
    pub param1: u32,
    pub param2: u32,
}

impl PropertySetting {
    /// Select the stereoscopic packing applied at the next power-on;
    /// `None` clears it.
    pub fn three_d_structure(format: Option<crate::display::ThreeDFormat>) -> Self {
        PropertySetting {
            property: PropertyId::ThreeDStructure,
            param1: format.map_or(0, |f| f.property_code()),
            param2: 0,
        }
    }

    /// Select nominal (PAL) or 1000/1001-adjusted (NTSC) pixel clocks.
    pub fn pixel_clock_type(ntsc: bool) -> Self {
        PropertySetting {
            property: PropertyId::PixelClockType,
            param1: if ntsc { PIXEL_CLOCK_TYPE_NTSC } else { PIXEL_CLOCK_TYPE_PAL },
            param2: 0,
        }
    }
}

/// EDID-derived identity of the attached display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub vendor: String,
    pub monitor_name: String,
    pub serial_num: u32,
}

/// Everything the host can ask the device to do.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    GetDisplayState,
    HdmiOnPreferred {
        drive: crate::display::HdmiDrive,
    },
    HdmiOnExplicit {
        drive: crate::display::HdmiDrive,
        group: ModeGroup,
        code: u32,
    },
    HdmiOnBest {
        width: u32,
        height: u32,
        frame_rate: u32,
        interlaced: bool,
        match_flags: MatchFlags,
    },
    SdtvOn {
        mode: SdtvMode,
        aspect: SdtvAspect,
        progressive: bool,
    },
    Off,
    /// Phase one of mode enumeration: how many and which is preferred.
    QueryModeCount {
        group: ModeGroup,
    },
    /// Phase two: download the descriptors counted in phase one.
    DownloadModes {
        group: ModeGroup,
        count: u32,
    },
    QueryModeSupport {
        group: ModeGroup,
        code: u32,
    },
    QueryAudioSupport {
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        size: SampleSize,
    },
    /// Raw bitrate probe for compressed formats (param is kb/s ÷ 8).
    QueryAudioBitrate {
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        bitrate: u32,
    },
    EnableCopyProtect {
        mode: SdtvCpMode,
        timeout_ms: u32,
    },
    DisableCopyProtect,
    ShowInfo {
        on: bool,
    },
    GetAvLatency,
    HdcpSetKey {
        key: Vec<u8>,
    },
    HdcpSetSrm {
        srm: Vec<u8>,
    },
    SetProperty(PropertySetting),
    GetProperty {
        property: PropertyId,
    },
    /// Read one 128-byte EDID block.
    DdcRead {
        offset: u32,
        length: u32,
    },
    SetAttached {
        attached: bool,
    },
    GetDeviceId,
}

impl Request {
    /// Stable command name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetDisplayState => "get_display_state",
            Request::HdmiOnPreferred { .. } => "hdmi_on_preferred",
            Request::HdmiOnExplicit { .. } => "hdmi_on_explicit",
            Request::HdmiOnBest { .. } => "hdmi_on_best",
            Request::SdtvOn { .. } => "sdtv_on",
            Request::Off => "off",
            Request::QueryModeCount { .. } => "query_mode_count",
            Request::DownloadModes { .. } => "download_modes",
            Request::QueryModeSupport { .. } => "query_mode_support",
            Request::QueryAudioSupport { .. } => "query_audio_support",
            Request::QueryAudioBitrate { .. } => "query_audio_bitrate",
            Request::EnableCopyProtect { .. } => "enable_copy_protect",
            Request::DisableCopyProtect => "disable_copy_protect",
            Request::ShowInfo { .. } => "show_info",
            Request::GetAvLatency => "get_av_latency",
            Request::HdcpSetKey { .. } => "hdcp_set_key",
            Request::HdcpSetSrm { .. } => "hdcp_set_srm",
            Request::SetProperty(_) => "set_property",
            Request::GetProperty { .. } => "get_property",
            Request::DdcRead { .. } => "ddc_read",
            Request::SetAttached { .. } => "set_attached",
            Request::GetDeviceId => "get_device_id",
        }
    }

    /// Fire-and-forget commands: the device sends no reply and the
    /// transport reports success once the command is written out.
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            Request::Off
                | Request::ShowInfo { .. }
                | Request::SetAttached { .. }
                | Request::HdcpSetKey { .. }
                | Request::HdcpSetSrm { .. }
        )
    }
}

/// Everything the device can answer with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Plain status word: zero for success, small positive code for a
    /// device rejection, meaning depends on the command for queries.
    Code(i32),
    DisplayState(DisplayState),
    ModeSummary {
        count: u32,
        preferred: Option<PreferredMode>,
    },
    Modes(Vec<ModeDescriptor>),
    /// Raw bytes from a DDC read; shorter than requested means
    /// end-of-data.
    Block(Vec<u8>),
    Property {
        param1: u32,
        param2: u32,
    },
    DeviceId(DeviceId),
}
