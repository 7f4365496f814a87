// SPDX-License-Identifier: GPL-3.0-only
//! In-process fake device for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tvctl::audio::{AudioFormat, AudioSupportFlags, SampleRates};
use tvctl::display::{
    DisplayState, HdmiAspect, HdmiDrive, HdmiState, ModeDescriptor, ModeGroup, PixelEncoding,
    PreferredMode, ScanMode, SdtvAspect, SdtvColour, SdtvMode, SdtvState, ThreeDStructMask,
};
use tvctl::notify::Notification;
use tvctl::protocol::{DeviceId, PropertyId, Reply, Request};
use tvctl::transport::{NotifySink, Transport, TransportError};

/// Per-format audio capability profile of the fake display.
pub struct AudioProfile {
    pub format: AudioFormat,
    pub max_channels: u32,
    pub rates: SampleRates,
    /// Max PCM sample size in bits (ignored for compressed formats).
    pub max_sample_bits: u32,
    /// Max bitrate in 8 kb/s units (ignored for PCM).
    pub max_bitrate_units: u32,
}

struct DeviceModel {
    cea_modes: Vec<ModeDescriptor>,
    dmt_modes: Vec<ModeDescriptor>,
    preferred: Option<PreferredMode>,
    state: DisplayState,
    edid: Vec<u8>,
    properties: HashMap<PropertyId, (u32, u32)>,
    audio: Vec<AudioProfile>,
    device_id: DeviceId,
    av_latency_ms: u32,
}

/// Transport backed by a scripted device model. Notifications for power
/// transitions are delivered synchronously from `submit`, which mirrors
/// the real ordering closely enough for the client's contract (the
/// notification never races the reply it follows).
pub struct FakeTransport {
    model: Mutex<DeviceModel>,
    sink: Mutex<Option<NotifySink>>,
    log: Mutex<Vec<&'static str>>,
    offline: AtomicBool,
}

pub fn cea_mode(code: u32, width: u32, height: u32, frame_rate: u32) -> ModeDescriptor {
    ModeDescriptor {
        group: ModeGroup::Cea,
        code,
        width,
        height,
        frame_rate,
        scan_mode: ScanMode::Progressive,
        native: false,
        pixel_rep: 0,
        aspect: HdmiAspect::Ratio16x9,
        pixel_freq: width * height * frame_rate,
        struct_3d: ThreeDStructMask::empty(),
    }
}

pub fn edid_image(extensions: u8, total_blocks: usize) -> Vec<u8> {
    let mut image = vec![0u8; total_blocks * 128];
    if !image.is_empty() {
        image[0x7e] = extensions;
    }
    image
}

impl FakeTransport {
    /// A 1080p-capable display: CEA modes 1/4/16 (16 native+preferred),
    /// DMT mode 82, a two-block EDID, stereo PCM + 5.1 AC3 audio.
    pub fn typical_display() -> Self {
        let mut native = cea_mode(16, 1920, 1080, 60);
        native.native = true;
        let cea_modes = vec![cea_mode(1, 640, 480, 60), cea_mode(4, 1280, 720, 60), native];
        let mut dmt = cea_mode(82, 1920, 1080, 60);
        dmt.group = ModeGroup::Dmt;
        FakeTransport::new(DeviceModel {
            cea_modes,
            dmt_modes: vec![dmt],
            preferred: Some(PreferredMode { group: ModeGroup::Cea, code: 16 }),
            state: DisplayState::Off,
            edid: edid_image(1, 2),
            properties: HashMap::new(),
            audio: vec![
                AudioProfile {
                    format: AudioFormat::Pcm,
                    max_channels: 2,
                    rates: SampleRates::R32K | SampleRates::R44_1K | SampleRates::R48K,
                    max_sample_bits: 24,
                    max_bitrate_units: 0,
                },
                AudioProfile {
                    format: AudioFormat::Ac3,
                    max_channels: 6,
                    rates: SampleRates::R44_1K | SampleRates::R48K,
                    max_sample_bits: 0,
                    max_bitrate_units: 80,
                },
            ],
            device_id: DeviceId {
                vendor: "TST".to_string(),
                monitor_name: "FakePanel".to_string(),
                serial_num: 1234,
            },
            av_latency_ms: 85,
        })
    }

    /// Same display but with a truncated (short) first EDID block.
    pub fn short_edid_display() -> Self {
        let fake = FakeTransport::typical_display();
        fake.set_edid(vec![0u8; 64]);
        fake
    }

    fn new(model: DeviceModel) -> Self {
        FakeTransport {
            model: Mutex::new(model),
            sink: Mutex::new(None),
            log: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_edid(&self, edid: Vec<u8>) {
        self.model.lock().unwrap().edid = edid;
    }

    /// Make every subsequent command fail as if the channel died.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn command_log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    fn notify(&self, notification: Notification) {
        let sink = self.sink.lock().unwrap().clone();
        if let Some(deliver) = sink {
            deliver(notification);
        }
    }

    fn find_mode(model: &DeviceModel, group: ModeGroup, code: u32) -> Option<ModeDescriptor> {
        let table = match group {
            ModeGroup::Cea => &model.cea_modes,
            ModeGroup::Dmt => &model.dmt_modes,
        };
        table.iter().find(|m| m.code == code).copied()
    }

    fn hdmi_state(mode: &ModeDescriptor, drive: HdmiDrive) -> HdmiState {
        HdmiState {
            drive,
            group: mode.group,
            code: mode.code,
            width: mode.width,
            height: mode.height,
            frame_rate: mode.frame_rate,
            scan_mode: mode.scan_mode,
            aspect: mode.aspect,
            pixel_rep: mode.pixel_rep,
            pixel_encoding: PixelEncoding::RgbFull,
            format_3d: None,
            hdcp_active: false,
        }
    }

    fn power_on_hdmi(&self, group: ModeGroup, code: u32, drive: HdmiDrive) -> Reply {
        let state = {
            let mut model = self.model.lock().unwrap();
            let Some(mode) = Self::find_mode(&model, group, code) else {
                return Reply::Code(1); // format unsupported
            };
            let state = DisplayState::Hdmi(Self::hdmi_state(&mode, drive));
            model.state = state;
            state
        };
        self.notify(Notification::ChangingMode);
        if let DisplayState::Hdmi(h) = state {
            match drive {
                HdmiDrive::Hdmi => {
                    self.notify(Notification::HdmiActive { group: h.group, code: h.code })
                }
                HdmiDrive::Dvi => {
                    self.notify(Notification::DviActive { group: h.group, code: h.code })
                }
            }
        }
        Reply::Code(0)
    }

    fn audio_flags(
        model: &DeviceModel,
        format: AudioFormat,
        channels: u32,
        rate: tvctl::audio::SampleRate,
        size_ok: bool,
    ) -> AudioSupportFlags {
        let Some(profile) = model.audio.iter().find(|p| p.format == format) else {
            return AudioSupportFlags::NO_SUPPORT;
        };
        let mut flags = AudioSupportFlags::empty();
        if channels == 0 || channels > profile.max_channels {
            flags |= AudioSupportFlags::CHANNELS_REJECTED;
        }
        let rate_flag = SampleRates::from_bits_truncate(
            1 << tvctl::audio::SampleRate::ALL.iter().position(|r| *r == rate).unwrap_or(0),
        );
        if !profile.rates.contains(rate_flag) {
            flags |= AudioSupportFlags::RATE_REJECTED;
        }
        if !size_ok {
            flags |= AudioSupportFlags::SIZE_REJECTED;
        }
        flags
    }
}

impl Transport for FakeTransport {
    fn submit(&self, request: Request) -> Result<Reply, TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.log.lock().unwrap().push(request.name());
        if !request.expects_reply() {
            // Fire-and-forget: apply the side effect, no device reply.
            if let Request::Off = request {
                self.model.lock().unwrap().state = DisplayState::Off;
                // Quirk preserved: plain power-off emits no notification.
            }
            return Ok(Reply::Code(0));
        }

        let reply = match request {
            Request::GetDisplayState => {
                Reply::DisplayState(self.model.lock().unwrap().state)
            }
            Request::HdmiOnPreferred { drive } => {
                let preferred = self.model.lock().unwrap().preferred;
                match preferred {
                    Some(p) => self.power_on_hdmi(p.group, p.code, drive),
                    None => Reply::Code(1),
                }
            }
            Request::HdmiOnExplicit { drive, group, code } => {
                self.power_on_hdmi(group, code, drive)
            }
            Request::HdmiOnBest { width, height, .. } => {
                let found = {
                    let model = self.model.lock().unwrap();
                    model
                        .cea_modes
                        .iter()
                        .find(|m| m.width == width && m.height == height)
                        .map(|m| (m.group, m.code))
                };
                match found {
                    Some((group, code)) => self.power_on_hdmi(group, code, HdmiDrive::Hdmi),
                    None => Reply::Code(1),
                }
            }
            Request::SdtvOn { mode, aspect, .. } => {
                let (width, height, frame_rate) = match mode {
                    SdtvMode::Ntsc | SdtvMode::NtscJ | SdtvMode::PalM => (720, 480, 30),
                    SdtvMode::Pal => (720, 576, 25),
                };
                self.model.lock().unwrap().state = DisplayState::Sdtv(SdtvState {
                    mode,
                    aspect,
                    colour: SdtvColour::Rgb,
                    cp_mode: None,
                    width,
                    height,
                    frame_rate,
                });
                self.notify(Notification::SdtvActive { mode, aspect });
                Reply::Code(0)
            }
            Request::QueryModeCount { group } => {
                let model = self.model.lock().unwrap();
                let count = match group {
                    ModeGroup::Cea => model.cea_modes.len(),
                    ModeGroup::Dmt => model.dmt_modes.len(),
                } as u32;
                let preferred = model.preferred.filter(|p| p.group == group);
                Reply::ModeSummary { count, preferred }
            }
            Request::DownloadModes { group, .. } => {
                let model = self.model.lock().unwrap();
                let modes = match group {
                    ModeGroup::Cea => model.cea_modes.clone(),
                    ModeGroup::Dmt => model.dmt_modes.clone(),
                };
                Reply::Modes(modes)
            }
            Request::QueryModeSupport { group, code } => {
                let model = self.model.lock().unwrap();
                let supported = Self::find_mode(&model, group, code).is_some();
                Reply::Code(i32::from(supported))
            }
            Request::QueryAudioSupport { format, channels, rate, size } => {
                let model = self.model.lock().unwrap();
                let size_ok = model
                    .audio
                    .iter()
                    .find(|p| p.format == format)
                    .is_some_and(|p| size.bits() <= p.max_sample_bits);
                let flags = Self::audio_flags(&model, format, channels, rate, size_ok);
                Reply::Code(flags.bits() as i32)
            }
            Request::QueryAudioBitrate { format, channels, rate, bitrate } => {
                let model = self.model.lock().unwrap();
                let bitrate_ok = model
                    .audio
                    .iter()
                    .find(|p| p.format == format)
                    .is_some_and(|p| bitrate <= p.max_bitrate_units);
                let flags = Self::audio_flags(&model, format, channels, rate, bitrate_ok);
                Reply::Code(flags.bits() as i32)
            }
            Request::EnableCopyProtect { .. } | Request::DisableCopyProtect => Reply::Code(0),
            Request::GetAvLatency => {
                Reply::Code(self.model.lock().unwrap().av_latency_ms as i32)
            }
            Request::SetProperty(setting) => {
                let mut model = self.model.lock().unwrap();
                model
                    .properties
                    .insert(setting.property, (setting.param1, setting.param2));
                Reply::Code(0)
            }
            Request::GetProperty { property } => {
                let model = self.model.lock().unwrap();
                let (param1, param2) = model.properties.get(&property).copied().unwrap_or((0, 0));
                Reply::Property { param1, param2 }
            }
            Request::DdcRead { offset, length } => {
                let model = self.model.lock().unwrap();
                let offset = offset as usize;
                let end = (offset + length as usize).min(model.edid.len());
                let bytes = if offset >= model.edid.len() {
                    Vec::new()
                } else {
                    model.edid[offset..end].to_vec()
                };
                Reply::Block(bytes)
            }
            Request::GetDeviceId => {
                Reply::DeviceId(self.model.lock().unwrap().device_id.clone())
            }
            // Fire-and-forget variants are handled above.
            Request::Off
            | Request::ShowInfo { .. }
            | Request::SetAttached { .. }
            | Request::HdcpSetKey { .. }
            | Request::HdcpSetSrm { .. } => unreachable!(),
        };
        Ok(reply)
    }

    fn set_notify_sink(&self, sink: NotifySink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}
