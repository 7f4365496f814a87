// SPDX-License-Identifier: GPL-3.0-only
//! Audio capability probing over the EDID.
//!
//! The device only answers point queries ("is this exact combination
//! supported?"), so capabilities are recovered by sweeping each axis
//! independently while the others are held at a known-good value. The
//! result is a per-axis maximum, not a joint matrix: a display may well
//! support 8 channels and 192 kHz without supporting them together.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Audio formats a display can advertise, per the EDID short audio
/// descriptor codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    Pcm,
    Ac3,
    Mpeg1,
    Mp3,
    Mpeg2,
    Aac,
    Dts,
    Atrac,
    Dsd,
    Eac3,
    DtsHd,
    Mlp,
    Dst,
    WmaPro,
    Extended,
}

impl AudioFormat {
    /// All probeable formats, in descriptor-code order.
    pub const ALL: [AudioFormat; 15] = [
        AudioFormat::Pcm,
        AudioFormat::Ac3,
        AudioFormat::Mpeg1,
        AudioFormat::Mp3,
        AudioFormat::Mpeg2,
        AudioFormat::Aac,
        AudioFormat::Dts,
        AudioFormat::Atrac,
        AudioFormat::Dsd,
        AudioFormat::Eac3,
        AudioFormat::DtsHd,
        AudioFormat::Mlp,
        AudioFormat::Dst,
        AudioFormat::WmaPro,
        AudioFormat::Extended,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Pcm => "PCM",
            AudioFormat::Ac3 => "AC3",
            AudioFormat::Mpeg1 => "MPEG1",
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Mpeg2 => "MPEG2",
            AudioFormat::Aac => "AAC",
            AudioFormat::Dts => "DTS",
            AudioFormat::Atrac => "ATRAC",
            AudioFormat::Dsd => "DSD",
            AudioFormat::Eac3 => "EAC3",
            AudioFormat::DtsHd => "DTS_HD",
            AudioFormat::Mlp => "MLP",
            AudioFormat::Dst => "DST",
            AudioFormat::WmaPro => "WMAPRO",
            AudioFormat::Extended => "Extended",
        }
    }

    /// PCM capabilities are described by sample size; everything else by
    /// raw bitrate.
    pub fn is_pcm(&self) -> bool {
        matches!(self, AudioFormat::Pcm)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the seven standard sample rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Rate32k,
    Rate44_1k,
    Rate48k,
    Rate88_2k,
    Rate96k,
    Rate176_4k,
    Rate192k,
}

impl SampleRate {
    pub const ALL: [SampleRate; 7] = [
        SampleRate::Rate32k,
        SampleRate::Rate44_1k,
        SampleRate::Rate48k,
        SampleRate::Rate88_2k,
        SampleRate::Rate96k,
        SampleRate::Rate176_4k,
        SampleRate::Rate192k,
    ];

    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Rate32k => 32_000,
            SampleRate::Rate44_1k => 44_100,
            SampleRate::Rate48k => 48_000,
            SampleRate::Rate88_2k => 88_200,
            SampleRate::Rate96k => 96_000,
            SampleRate::Rate176_4k => 176_400,
            SampleRate::Rate192k => 192_000,
        }
    }

    /// Truncated kHz, matching how rates are displayed.
    pub fn khz(&self) -> u32 {
        self.hz() / 1000
    }

    fn flag(&self) -> SampleRates {
        match self {
            SampleRate::Rate32k => SampleRates::R32K,
            SampleRate::Rate44_1k => SampleRates::R44_1K,
            SampleRate::Rate48k => SampleRates::R48K,
            SampleRate::Rate88_2k => SampleRates::R88_2K,
            SampleRate::Rate96k => SampleRates::R96K,
            SampleRate::Rate176_4k => SampleRates::R176_4K,
            SampleRate::Rate192k => SampleRates::R192K,
        }
    }
}

bitflags! {
    /// Set of supported sample rates.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SampleRates: u32 {
        const R32K    = 1 << 0;
        const R44_1K  = 1 << 1;
        const R48K    = 1 << 2;
        const R88_2K  = 1 << 3;
        const R96K    = 1 << 4;
        const R176_4K = 1 << 5;
        const R192K   = 1 << 6;
    }
}

impl SampleRates {
    /// Highest set rate, if any.
    pub fn max(&self) -> Option<SampleRate> {
        SampleRate::ALL
            .iter()
            .rev()
            .find(|r| self.contains(r.flag()))
            .copied()
    }
}

/// PCM sample sizes a display can advertise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SampleSize {
    Bits16,
    Bits20,
    Bits24,
}

impl SampleSize {
    pub const ALL: [SampleSize; 3] = [SampleSize::Bits16, SampleSize::Bits20, SampleSize::Bits24];

    pub fn bits(&self) -> u32 {
        match self {
            SampleSize::Bits16 => 16,
            SampleSize::Bits20 => 20,
            SampleSize::Bits24 => 24,
        }
    }
}

bitflags! {
    /// Per-axis rejection flags in an audio probe reply. Empty means the
    /// probed combination is fully supported.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AudioSupportFlags: u32 {
        /// The format itself is not in the EDID at all.
        const NO_SUPPORT         = 1 << 0;
        const CHANNELS_REJECTED  = 1 << 1;
        const RATE_REJECTED      = 1 << 2;
        const SIZE_REJECTED      = 1 << 3;
    }
}

impl AudioSupportFlags {
    pub fn supported(&self) -> bool {
        self.is_empty()
    }
}

/// What a sweep found for one format. Axes are independent maxima.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioFormatCapability {
    pub format: AudioFormat,
    pub max_channels: u32,
    pub rates: SampleRates,
    /// Largest PCM sample size; `None` for compressed formats.
    pub max_sample_size: Option<SampleSize>,
    /// Largest raw bitrate unit for compressed formats; one unit is
    /// 8 kb/s. `None` for PCM.
    pub max_bitrate_units: Option<u32>,
}

impl AudioFormatCapability {
    pub fn max_bitrate_kbps(&self) -> Option<u32> {
        self.max_bitrate_units.map(|units| units * 8)
    }
}

/// Point-query interface the sweep drives. Implemented by the client.
pub trait AudioProbe {
    fn query_support(
        &self,
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        size: SampleSize,
    ) -> Result<AudioSupportFlags>;

    fn query_bitrate(
        &self,
        format: AudioFormat,
        channels: u32,
        rate: SampleRate,
        bitrate_units: u32,
    ) -> Result<AudioSupportFlags>;
}

const ANCHOR_RATE: SampleRate = SampleRate::Rate44_1k;
const ANCHOR_SIZE: SampleSize = SampleSize::Bits16;
const ANCHOR_CHANNELS: u32 = 1;
const MAX_CHANNELS: u32 = 8;
const MAX_BITRATE_UNITS: u32 = 255;

/// Sweep every format and report those the display supports at all.
///
/// Channels are swept first at 44.1 kHz / 16-bit; a format with no
/// supported channel count is omitted. The remaining axes are each swept
/// at 1 channel, so every axis is maximized independently of the others.
pub fn probe_capabilities<P: AudioProbe>(probe: &P) -> Result<Vec<AudioFormatCapability>> {
    let mut capabilities = Vec::new();
    for format in AudioFormat::ALL {
        if let Some(cap) = probe_format(probe, format)? {
            capabilities.push(cap);
        }
    }
    Ok(capabilities)
}

fn probe_format<P: AudioProbe>(
    probe: &P,
    format: AudioFormat,
) -> Result<Option<AudioFormatCapability>> {
    let mut max_channels = 0;
    for channels in 1..=MAX_CHANNELS {
        let flags = if format.is_pcm() {
            probe.query_support(format, channels, ANCHOR_RATE, ANCHOR_SIZE)?
        } else {
            probe.query_bitrate(format, channels, ANCHOR_RATE, 1)?
        };
        if flags.contains(AudioSupportFlags::NO_SUPPORT) {
            return Ok(None);
        }
        if flags.supported() {
            max_channels = channels;
        }
    }
    if max_channels == 0 {
        return Ok(None);
    }

    let mut rates = SampleRates::empty();
    for rate in SampleRate::ALL {
        let flags = if format.is_pcm() {
            probe.query_support(format, ANCHOR_CHANNELS, rate, ANCHOR_SIZE)?
        } else {
            probe.query_bitrate(format, ANCHOR_CHANNELS, rate, 1)?
        };
        if flags.supported() {
            rates |= rate.flag();
        }
    }

    if format.is_pcm() {
        let mut max_sample_size = None;
        for size in SampleSize::ALL {
            let flags = probe.query_support(format, ANCHOR_CHANNELS, ANCHOR_RATE, size)?;
            if flags.supported() {
                max_sample_size = Some(size);
            }
        }
        Ok(Some(AudioFormatCapability {
            format,
            max_channels,
            rates,
            max_sample_size,
            max_bitrate_units: None,
        }))
    } else {
        let mut max_bitrate_units = 0;
        for units in 1..=MAX_BITRATE_UNITS {
            let flags = probe.query_bitrate(format, ANCHOR_CHANNELS, ANCHOR_RATE, units)?;
            if flags.supported() {
                max_bitrate_units = units;
            }
        }
        Ok(Some(AudioFormatCapability {
            format,
            max_channels,
            rates,
            max_sample_size: None,
            max_bitrate_units: Some(max_bitrate_units),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Probe backed by a simple per-format profile table.
    struct TableProbe {
        profiles: Vec<(AudioFormat, u32, SampleRates, u32, u32)>,
    }

    impl TableProbe {
        fn lookup(&self, format: AudioFormat) -> Option<&(AudioFormat, u32, SampleRates, u32, u32)> {
            self.profiles.iter().find(|p| p.0 == format)
        }
    }

    impl AudioProbe for TableProbe {
        fn query_support(
            &self,
            format: AudioFormat,
            channels: u32,
            rate: SampleRate,
            size: SampleSize,
        ) -> Result<AudioSupportFlags> {
            let Some((_, max_ch, rates, max_bits, _)) = self.lookup(format) else {
                return Ok(AudioSupportFlags::NO_SUPPORT);
            };
            let mut flags = AudioSupportFlags::empty();
            if channels > *max_ch {
                flags |= AudioSupportFlags::CHANNELS_REJECTED;
            }
            if !rates.contains(rate.flag()) {
                flags |= AudioSupportFlags::RATE_REJECTED;
            }
            if size.bits() > *max_bits {
                flags |= AudioSupportFlags::SIZE_REJECTED;
            }
            Ok(flags)
        }

        fn query_bitrate(
            &self,
            format: AudioFormat,
            channels: u32,
            rate: SampleRate,
            bitrate_units: u32,
        ) -> Result<AudioSupportFlags> {
            let Some((_, max_ch, rates, _, max_units)) = self.lookup(format) else {
                return Ok(AudioSupportFlags::NO_SUPPORT);
            };
            let mut flags = AudioSupportFlags::empty();
            if channels > *max_ch {
                flags |= AudioSupportFlags::CHANNELS_REJECTED;
            }
            if !rates.contains(rate.flag()) {
                flags |= AudioSupportFlags::RATE_REJECTED;
            }
            if bitrate_units > *max_units {
                flags |= AudioSupportFlags::SIZE_REJECTED;
            }
            Ok(flags)
        }
    }

    fn typical_tv() -> TableProbe {
        TableProbe {
            profiles: vec![
                (
                    AudioFormat::Pcm,
                    2,
                    SampleRates::R32K | SampleRates::R44_1K | SampleRates::R48K,
                    24,
                    0,
                ),
                (
                    AudioFormat::Ac3,
                    6,
                    SampleRates::R44_1K | SampleRates::R48K,
                    0,
                    80, // 640 kb/s
                ),
            ],
        }
    }

    #[test]
    fn test_sweep_reports_only_supported_formats() {
        let caps = probe_capabilities(&typical_tv()).unwrap();
        let formats: Vec<AudioFormat> = caps.iter().map(|c| c.format).collect();
        assert_eq!(formats, vec![AudioFormat::Pcm, AudioFormat::Ac3]);
    }

    #[test]
    fn test_sweep_pcm_axes() {
        let caps = probe_capabilities(&typical_tv()).unwrap();
        let pcm = caps.iter().find(|c| c.format == AudioFormat::Pcm).unwrap();
        assert_eq!(pcm.max_channels, 2);
        assert_eq!(pcm.max_sample_size, Some(SampleSize::Bits24));
        assert_eq!(pcm.max_bitrate_units, None);
        assert_eq!(pcm.rates.max(), Some(SampleRate::Rate48k));
    }

    #[test]
    fn test_sweep_compressed_bitrate() {
        let caps = probe_capabilities(&typical_tv()).unwrap();
        let ac3 = caps.iter().find(|c| c.format == AudioFormat::Ac3).unwrap();
        assert_eq!(ac3.max_channels, 6);
        assert_eq!(ac3.max_bitrate_kbps(), Some(640));
        assert_eq!(ac3.max_sample_size, None);
    }

    /// Probe whose rate support narrows as the channel count grows:
    /// 2 channels only at 44.1 kHz, but 1 channel up to 96 kHz.
    struct NarrowingProbe;

    impl AudioProbe for NarrowingProbe {
        fn query_support(
            &self,
            format: AudioFormat,
            channels: u32,
            rate: SampleRate,
            size: SampleSize,
        ) -> Result<AudioSupportFlags> {
            if format != AudioFormat::Pcm {
                return Ok(AudioSupportFlags::NO_SUPPORT);
            }
            let rate_ok = match channels {
                1 => matches!(
                    rate,
                    SampleRate::Rate44_1k | SampleRate::Rate48k | SampleRate::Rate96k
                ),
                2 => rate == SampleRate::Rate44_1k,
                _ => false,
            };
            let mut flags = AudioSupportFlags::empty();
            if channels > 2 {
                flags |= AudioSupportFlags::CHANNELS_REJECTED;
            }
            if !rate_ok {
                flags |= AudioSupportFlags::RATE_REJECTED;
            }
            if size != SampleSize::Bits16 {
                flags |= AudioSupportFlags::SIZE_REJECTED;
            }
            Ok(flags)
        }

        fn query_bitrate(
            &self,
            _format: AudioFormat,
            _channels: u32,
            _rate: SampleRate,
            _bitrate_units: u32,
        ) -> Result<AudioSupportFlags> {
            Ok(AudioSupportFlags::NO_SUPPORT)
        }
    }

    #[test]
    fn test_rate_sweep_anchored_at_one_channel() {
        // Rates are an independent axis: the sweep must report the
        // 1-channel maximum even though 2 channels cap out at 44.1 kHz.
        let caps = probe_capabilities(&NarrowingProbe).unwrap();
        let pcm = caps.iter().find(|c| c.format == AudioFormat::Pcm).unwrap();
        assert_eq!(pcm.max_channels, 2);
        assert_eq!(pcm.rates.max(), Some(SampleRate::Rate96k));
        assert_eq!(
            pcm.rates,
            SampleRates::R44_1K | SampleRates::R48K | SampleRates::R96K
        );
        assert_eq!(pcm.max_sample_size, Some(SampleSize::Bits16));
    }

    #[test]
    fn test_channel_maximum_is_monotonic() {
        // Support for N channels implies the sweep never reports more
        // than N even when higher counts are probed.
        for limit in 1..=8 {
            let probe = TableProbe {
                profiles: vec![(AudioFormat::Pcm, limit, SampleRates::R44_1K, 16, 0)],
            };
            let caps = probe_capabilities(&probe).unwrap();
            assert_eq!(caps[0].max_channels, limit);
        }
    }
}
