// SPDX-License-Identifier: GPL-3.0-only
//! The TV service client: command serialization, state cache and the
//! power-on negotiation paths.
//!
//! The device accepts one outstanding command at a time, so every
//! operation funnels through a single command lock. Notifications bypass
//! the lock entirely and land in the dispatcher from the transport's
//! delivery thread.

use std::sync::{Arc, Mutex};

use crate::audio::{
    self, AudioFormat, AudioFormatCapability, AudioProbe, AudioSupportFlags, SampleRate,
    SampleSize,
};
use crate::display::{
    DisplayState, ExplicitMode, HdmiDrive, MatchFlags, ModeDescriptor, ModeGroup, PreferredMode,
    SdtvCpMode, SdtvSelection, MAX_MODE_ID,
};
use crate::edid::BlockReader;
use crate::error::{DeviceError, Result, TvError};
use crate::notify::NotificationDispatcher;
use crate::protocol::{
    DeviceId, PropertyId, PropertySetting, Reply, Request, PIXEL_CLOCK_TYPE_NTSC,
};
use crate::transport::Transport;

/// Handle to the TV service.
pub struct TvClient {
    transport: Arc<dyn Transport>,
    command_lock: Mutex<()>,
    state_cache: Mutex<Option<DisplayState>>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl TvClient {
    /// Wrap a transport and wire its notification stream into a fresh
    /// dispatcher.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new());
        let sink_dispatcher = Arc::clone(&dispatcher);
        transport.set_notify_sink(Arc::new(move |notification| {
            debug!("notification '{}'", notification.name());
            sink_dispatcher.dispatch(&notification);
        }));
        TvClient {
            transport,
            command_lock: Mutex::new(()),
            state_cache: Mutex::new(None),
            dispatcher,
        }
    }

    /// The notification registry for this client.
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    fn roundtrip(&self, request: Request) -> Result<Reply> {
        let _guard = self.command_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.roundtrip_unlocked(request)
    }

    fn roundtrip_unlocked(&self, request: Request) -> Result<Reply> {
        debug!("sending '{}'", request.name());
        Ok(self.transport.submit(request)?)
    }

    /// Submit a command whose reply is a plain status word.
    fn roundtrip_code(&self, request: Request) -> Result<i32> {
        let command = request.name();
        match self.roundtrip(request)? {
            Reply::Code(code) => Ok(code),
            _ => Err(TvError::UnexpectedReply { command }),
        }
    }

    /// Submit a command that must succeed with status zero.
    fn roundtrip_ok(&self, request: Request) -> Result<()> {
        let command = request.name();
        match self.roundtrip_code(request)? {
            0 => Ok(()),
            code => {
                let err = DeviceError::from_code(code);
                warn!("'{command}' rejected: {err}");
                Err(TvError::Device(err))
            }
        }
    }

    /// Ask the device what the output is doing. The cache is only
    /// updated when the query succeeds.
    pub fn get_display_state(&self) -> Result<DisplayState> {
        let reply = self.roundtrip(Request::GetDisplayState)?;
        let state = match reply {
            Reply::DisplayState(state) => state,
            _ => {
                return Err(TvError::UnexpectedReply { command: "get_display_state" });
            }
        };
        let mut cache = self.state_cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some(state);
        Ok(state)
    }

    /// Last state a successful query returned, if any. Never touched by
    /// power operations or notifications.
    pub fn cached_state(&self) -> Option<DisplayState> {
        let cache = self.state_cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache
    }

    /// Power on in the display's preferred mode. Any leftover 3D
    /// selection is cleared first so it cannot leak into this power-on.
    pub fn power_on_preferred(&self, drive: HdmiDrive) -> Result<()> {
        self.set_property(PropertySetting::three_d_structure(None))?;
        self.roundtrip_ok(Request::HdmiOnPreferred { drive })
    }

    /// Power on in an explicitly chosen mode. The 3D structure and pixel
    /// clock type properties are set before the power-on command so the
    /// device applies them to this mode change.
    pub fn power_on_explicit(&self, mode: ExplicitMode, ntsc_rates: bool) -> Result<()> {
        if mode.code > MAX_MODE_ID {
            return Err(TvError::InvalidMode { code: mode.code });
        }
        self.set_property(PropertySetting::three_d_structure(mode.threed))?;
        self.set_property(PropertySetting::pixel_clock_type(ntsc_rates))?;
        self.roundtrip_ok(Request::HdmiOnExplicit {
            drive: mode.drive,
            group: mode.group,
            code: mode.code,
        })
    }

    /// Power on in the closest mode the device can find to the given
    /// geometry; criteria not named in `match_flags` may be relaxed.
    pub fn power_on_best(
        &self,
        width: u32,
        height: u32,
        frame_rate: u32,
        interlaced: bool,
        match_flags: MatchFlags,
    ) -> Result<()> {
        self.roundtrip_ok(Request::HdmiOnBest {
            width,
            height,
            frame_rate,
            interlaced,
            match_flags,
        })
    }

    pub fn power_on_sdtv(&self, selection: SdtvSelection) -> Result<()> {
        self.roundtrip_ok(Request::SdtvOn {
            mode: selection.mode,
            aspect: selection.aspect,
            progressive: selection.progressive,
        })
    }

    /// Power the output off. Fire-and-forget: success means the command
    /// was delivered, and (unlike power-on) no completion notification is
    /// guaranteed to follow. Idempotent when already off.
    pub fn power_off(&self) -> Result<()> {
        self.roundtrip(Request::Off)?;
        Ok(())
    }

    /// Enumerate the modes the display supports in `group`, plus the
    /// device's preferred mode when it names one. Always fetched fresh;
    /// nothing is cached across calls.
    pub fn get_modes(
        &self,
        group: ModeGroup,
    ) -> Result<(Vec<ModeDescriptor>, Option<PreferredMode>)> {
        let _guard = self.command_lock.lock().unwrap_or_else(|e| e.into_inner());

        let (count, preferred) =
            match self.roundtrip_unlocked(Request::QueryModeCount { group })? {
                Reply::ModeSummary { count, preferred } => (count, preferred),
                _ => return Err(TvError::UnexpectedReply { command: "query_mode_count" }),
            };
        if count == 0 {
            return Ok((Vec::new(), preferred));
        }

        let modes = match self.roundtrip_unlocked(Request::DownloadModes { group, count })? {
            Reply::Modes(modes) => modes,
            _ => return Err(TvError::UnexpectedReply { command: "download_modes" }),
        };
        if modes.len() as u32 != count {
            warn!(
                "mode download returned {} descriptors, expected {count}",
                modes.len()
            );
        }
        Ok((modes, preferred))
    }

    /// Whether the display supports a single (group, code) pair.
    pub fn mode_supported(&self, group: ModeGroup, code: u32) -> Result<bool> {
        if code > MAX_MODE_ID {
            return Err(TvError::InvalidMode { code });
        }
        let code = self.roundtrip_code(Request::QueryModeSupport { group, code })?;
        if code < 0 {
            return Err(TvError::Device(DeviceError::from_code(-code)));
        }
        Ok(code > 0)
    }

    /// Probe every audio format and return the supported ones.
    pub fn audio_capabilities(&self) -> Result<Vec<AudioFormatCapability>> {
        audio::probe_capabilities(self)
    }

    pub fn set_property(&self, setting: PropertySetting) -> Result<()> {
        self.roundtrip_ok(Request::SetProperty(setting))
    }

    pub fn get_property(&self, property: PropertyId) -> Result<(u32, u32)> {
        match self.roundtrip(Request::GetProperty { property })? {
            Reply::Property { param1, param2 } => Ok((param1, param2)),
            _ => Err(TvError::UnexpectedReply { command: "get_property" }),
        }
    }

    /// Whether the device is running 1000/1001-adjusted pixel clocks.
    pub fn pixel_clock_is_ntsc(&self) -> Result<bool> {
        let (param1, _) = self.get_property(PropertyId::PixelClockType)?;
        Ok(param1 == PIXEL_CLOCK_TYPE_NTSC)
    }

    pub fn enable_copy_protect(&self, mode: SdtvCpMode, timeout_ms: u32) -> Result<()> {
        self.roundtrip_ok(Request::EnableCopyProtect { mode, timeout_ms })
    }

    pub fn disable_copy_protect(&self) -> Result<()> {
        self.roundtrip_ok(Request::DisableCopyProtect)
    }

    /// Vendor, monitor name and serial as parsed from the EDID.
    pub fn get_device_id(&self) -> Result<DeviceId> {
        match self.roundtrip(Request::GetDeviceId)? {
            Reply::DeviceId(id) => Ok(id),
            _ => Err(TvError::UnexpectedReply { command: "get_device_id" }),
        }
    }

    /// HDMI AV latency in milliseconds; zero when off or undefined.
    pub fn get_av_latency(&self) -> Result<u32> {
        let code = self.roundtrip_code(Request::GetAvLatency)?;
        if code < 0 {
            return Err(TvError::Device(DeviceError::from_code(-code)));
        }
        Ok(code as u32)
    }

    /// Show or hide the on-screen info overlay. No reply.
    pub fn show_info(&self, on: bool) -> Result<()> {
        self.roundtrip(Request::ShowInfo { on })?;
        Ok(())
    }

    /// Override hotplug detection when the device cannot see the
    /// interrupt. No reply.
    pub fn set_attached(&self, attached: bool) -> Result<()> {
        self.roundtrip(Request::SetAttached { attached })?;
        Ok(())
    }

    /// Opaque HDCP key block pass-through. No reply.
    pub fn set_hdcp_key(&self, key: &[u8]) -> Result<()> {
        self.roundtrip(Request::HdcpSetKey { key: key.to_vec() })?;
        Ok(())
    }

    /// Opaque HDCP revocation list pass-through. No reply.
    pub fn set_hdcp_srm(&self, srm: &[u8]) -> Result<()> {
        self.roundtrip(Request::HdcpSetSrm { srm: srm.to_vec() })?;
        Ok(())
    }
}

impl BlockReader for TvClient {
    fn ddc_read(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        match self.roundtrip(Request::DdcRead { offset, length })? {
            Reply::Block(bytes) => Ok(bytes),
            _ => Err(TvError::UnexpectedReply { command: "ddc_read" }),
        }
    }
}

impl AudioProbe for TvClient {
    fn query_support(
        &self,
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        size: SampleSize,
    ) -> Result<AudioSupportFlags> {
        let code = self.roundtrip_code(Request::QueryAudioSupport {
            format,
            channels,
            rate,
            size,
        })?;
        if code < 0 {
            return Err(TvError::Device(DeviceError::from_code(-code)));
        }
        Ok(AudioSupportFlags::from_bits_truncate(code as u32))
    }

    fn query_bitrate(
        &self,
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        bitrate_units: u32,
    ) -> Result<AudioSupportFlags> {
        let code = self.roundtrip_code(Request::QueryAudioBitrate {
            format,
            channels,
            rate,
            bitrate: bitrate_units,
        })?;
        if code < 0 {
            return Err(TvError::Device(DeviceError::from_code(-code)));
        }
        Ok(AudioSupportFlags::from_bits_truncate(code as u32))
    }
}
