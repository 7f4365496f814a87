// SPDX-License-Identifier: GPL-3.0-only
//! Resolution groups, mode descriptors and the argument forms used to
//! request them.
//!
//! Mode codes live in two standardised namespaces: CEA (consumer
//! electronics timings) and DMT (computer monitor timings). A code is a
//! small integer unique within its group and never larger than
//! [`MAX_MODE_ID`].

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Largest valid mode code in either group (7-bit namespace).
pub const MAX_MODE_ID: u32 = 127;

/// Resolution code namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeGroup {
    Cea,
    Dmt,
}

impl fmt::Display for ModeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeGroup::Cea => "CEA",
            ModeGroup::Dmt => "DMT",
        })
    }
}

impl FromStr for ModeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("CEA") {
            Ok(ModeGroup::Cea)
        } else if s.eq_ignore_ascii_case("DMT") {
            Ok(ModeGroup::Dmt)
        } else {
            Err(format!("invalid group '{s}' (expected CEA or DMT)"))
        }
    }
}

/// Signal type driven on the HDMI connector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdmiDrive {
    #[default]
    Hdmi,
    Dvi,
}

impl fmt::Display for HdmiDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HdmiDrive::Hdmi => "HDMI",
            HdmiDrive::Dvi => "DVI",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanMode {
    Progressive,
    Interlaced,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanMode::Progressive => "progressive",
            ScanMode::Interlaced => "interlaced",
        })
    }
}

/// Aspect ratio of an HDMI mode (the format's ratio, not what is signalled
/// in the AVI infoframe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdmiAspect {
    Ratio4x3,
    Ratio14x9,
    Ratio16x9,
    Ratio5x4,
    Ratio16x10,
    Ratio15x9,
    Ratio64x27,
    Unknown,
}

impl fmt::Display for HdmiAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HdmiAspect::Ratio4x3 => "4:3",
            HdmiAspect::Ratio14x9 => "14:9",
            HdmiAspect::Ratio16x9 => "16:9",
            HdmiAspect::Ratio5x4 => "5:4",
            HdmiAspect::Ratio16x10 => "16:10",
            HdmiAspect::Ratio15x9 => "15:9",
            HdmiAspect::Ratio64x27 => "64:27 (21:9)",
            HdmiAspect::Unknown => "unknown AR",
        })
    }
}

/// Stereoscopic packing selected for HDMI output (CEA modes only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreeDFormat {
    SideBySideHalf,
    TopBottomHalf,
    FramePacking,
    FrameSequential,
}

impl ThreeDFormat {
    /// Device-side code for the 3D structure property (0 means none).
    pub fn property_code(self) -> u32 {
        match self {
            ThreeDFormat::SideBySideHalf => 1,
            ThreeDFormat::TopBottomHalf => 2,
            ThreeDFormat::FramePacking => 3,
            ThreeDFormat::FrameSequential => 4,
        }
    }
}

impl fmt::Display for ThreeDFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThreeDFormat::SideBySideHalf => "3D SbS",
            ThreeDFormat::TopBottomHalf => "3D T&B",
            ThreeDFormat::FramePacking => "3D FP",
            ThreeDFormat::FrameSequential => "3D FS",
        })
    }
}

bitflags! {
    /// Stereoscopic packings a CEA mode can carry, as advertised by the
    /// display. Bit order follows the EDID 3D structure fields.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ThreeDStructMask: u32 {
        const FRAME_PACKING        = 1 << 0;
        const FIELD_ALTERNATIVE    = 1 << 1;
        const LINE_ALTERNATIVE     = 1 << 2;
        const SIDE_BY_SIDE_FULL    = 1 << 3;
        const L_DEPTH              = 1 << 4;
        const L_DEPTH_GFX          = 1 << 5;
        const TOP_AND_BOTTOM       = 1 << 6;
        const SIDE_BY_SIDE_HALF    = 1 << 7;
        const SBS_ODD_LEFT_ODD_RIGHT   = 1 << 8;
        const SBS_ODD_LEFT_EVEN_RIGHT  = 1 << 9;
        const SBS_EVEN_LEFT_ODD_RIGHT  = 1 << 10;
        const SBS_EVEN_LEFT_EVEN_RIGHT = 1 << 11;
    }
}

impl ThreeDStructMask {
    /// Short names for set bits, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        const NAMES: [&str; 12] = [
            "FP", "F-Alt", "L-Alt", "SbS-Full", "Ldep", "Ldep+Gfx", "TopBot", "SbS-HH",
            "SbS-OLOR", "SbS-OLER", "SbS-ELOR", "SbS-ELER",
        ];
        NAMES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.bits() & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

bitflags! {
    /// Which criteria the device must honour when asked for a best-match
    /// mode; unset criteria are free for the device to relax.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MatchFlags: u32 {
        const RESOLUTION = 1 << 0;
        const FRAME_RATE = 1 << 1;
        const SCAN_MODE  = 1 << 2;
    }
}

/// One supported resolution/format as enumerated by the device.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeDescriptor {
    pub group: ModeGroup,
    pub code: u32,
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate in Hz (fractional rates are selected separately
    /// via the pixel clock type property).
    pub frame_rate: u32,
    pub scan_mode: ScanMode,
    /// The display flags this as its native timing; independent of
    /// "preferred".
    pub native: bool,
    /// Pixel repetition factor (0 or 1 means none).
    pub pixel_rep: u32,
    pub aspect: HdmiAspect,
    /// Pixel clock in Hz.
    pub pixel_freq: u32,
    /// Only meaningful for CEA modes.
    pub struct_3d: ThreeDStructMask,
}

/// The device's preferred entry for a mode enumeration. When present it
/// always names an entry of the enumerated list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredMode {
    pub group: ModeGroup,
    pub code: u32,
}

impl PreferredMode {
    pub fn matches(&self, mode: &ModeDescriptor) -> bool {
        self.group == mode.group && self.code == mode.code
    }
}

/// Analog TV broadcast standard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdtvMode {
    Ntsc,
    NtscJ,
    Pal,
    PalM,
}

impl fmt::Display for SdtvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SdtvMode::Ntsc => "NTSC",
            SdtvMode::NtscJ => "NTSC-J",
            SdtvMode::Pal => "PAL",
            SdtvMode::PalM => "PAL-M",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdtvAspect {
    #[default]
    Ratio4x3,
    Ratio14x9,
    Ratio16x9,
}

impl fmt::Display for SdtvAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SdtvAspect::Ratio4x3 => "4:3",
            SdtvAspect::Ratio14x9 => "14:9",
            SdtvAspect::Ratio16x9 => "16:9",
        })
    }
}

/// Colour encoding reported for an active SDTV output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdtvColour {
    #[default]
    Unknown,
    Rgb,
    Yprpb,
}

/// Analog copy-protection waveform in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdtvCpMode {
    MacrovisionType1,
    MacrovisionType2,
    MacrovisionType3,
    MacrovisionTest1,
    MacrovisionTest2,
    CgmsCopyFree,
    CgmsCopyNoMore,
    CgmsCopyOnce,
    CgmsCopyNever,
    WssCopyFree,
    WssCopyrightCopyFree,
    WssNoCopy,
    WssCopyrightNoCopy,
}

impl fmt::Display for SdtvCpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SdtvCpMode::MacrovisionType1 => "Macrovision type 1",
            SdtvCpMode::MacrovisionType2 => "Macrovision type 2",
            SdtvCpMode::MacrovisionType3 => "Macrovision type 3",
            SdtvCpMode::MacrovisionTest1 => "Macrovision test 1",
            SdtvCpMode::MacrovisionTest2 => "Macrovision test 2",
            SdtvCpMode::CgmsCopyFree => "CGMS copy free",
            SdtvCpMode::CgmsCopyNoMore => "CGMS copy no more",
            SdtvCpMode::CgmsCopyOnce => "CGMS copy once",
            SdtvCpMode::CgmsCopyNever => "CGMS copy never",
            SdtvCpMode::WssCopyFree => "WSS copy free",
            SdtvCpMode::WssCopyrightCopyFree => "WSS (c) copy free",
            SdtvCpMode::WssNoCopy => "WSS no copy",
            SdtvCpMode::WssCopyrightNoCopy => "WSS (c) no copy",
        })
    }
}

/// A fully specified HDMI power-on request, as parsed from the CLI's
/// `"GROUP MODE [DRIVE]"` argument. The group token may carry a 3D packing
/// suffix (`CEA_3D_SBS`, `CEA_3D_TB`, `CEA_3D_FP`, `CEA_3D_FS`); plain
/// `CEA_3D` is accepted as an alias for side-by-side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExplicitMode {
    pub group: ModeGroup,
    pub code: u32,
    pub drive: HdmiDrive,
    pub threed: Option<ThreeDFormat>,
}

impl FromStr for ExplicitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let group_str = tokens.next().ok_or_else(|| format!("invalid arguments '{s}'"))?;
        let code_str = tokens.next().ok_or_else(|| format!("invalid arguments '{s}'"))?;
        let drive_str = tokens.next();
        if tokens.next().is_some() {
            return Err(format!("invalid arguments '{s}'"));
        }

        let (group, threed) = if group_str.eq_ignore_ascii_case("CEA") {
            (ModeGroup::Cea, None)
        } else if group_str.eq_ignore_ascii_case("DMT") {
            (ModeGroup::Dmt, None)
        } else if group_str.eq_ignore_ascii_case("CEA_3D")
            || group_str.eq_ignore_ascii_case("CEA_3D_SBS")
        {
            (ModeGroup::Cea, Some(ThreeDFormat::SideBySideHalf))
        } else if group_str.eq_ignore_ascii_case("CEA_3D_TB") {
            (ModeGroup::Cea, Some(ThreeDFormat::TopBottomHalf))
        } else if group_str.eq_ignore_ascii_case("CEA_3D_FP") {
            (ModeGroup::Cea, Some(ThreeDFormat::FramePacking))
        } else if group_str.eq_ignore_ascii_case("CEA_3D_FS") {
            (ModeGroup::Cea, Some(ThreeDFormat::FrameSequential))
        } else {
            return Err(format!("invalid group '{group_str}'"));
        };

        let code: u32 = code_str
            .parse()
            .map_err(|_| format!("invalid mode '{code_str}'"))?;
        if code > MAX_MODE_ID {
            return Err(format!("invalid mode '{code}'"));
        }

        let drive = match drive_str {
            None => HdmiDrive::Hdmi,
            Some(d) if d.eq_ignore_ascii_case("HDMI") => HdmiDrive::Hdmi,
            Some(d) if d.eq_ignore_ascii_case("DVI") => HdmiDrive::Dvi,
            Some(d) => return Err(format!("invalid drive '{d}'")),
        };

        Ok(ExplicitMode { group, code, drive, threed })
    }
}

/// An SDTV power-on request, as parsed from the CLI's `"MODE ASPECT [P]"`
/// argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SdtvSelection {
    pub mode: SdtvMode,
    pub aspect: SdtvAspect,
    pub progressive: bool,
}

impl FromStr for SdtvSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let mode_str = tokens.next().ok_or_else(|| format!("invalid arguments '{s}'"))?;
        let aspect_str = tokens.next().ok_or_else(|| format!("invalid arguments '{s}'"))?;
        let progressive_str = tokens.next();
        if tokens.next().is_some() {
            return Err(format!("invalid arguments '{s}'"));
        }

        let mode = if mode_str.eq_ignore_ascii_case("NTSC") {
            SdtvMode::Ntsc
        } else if mode_str.eq_ignore_ascii_case("NTSC_J") {
            SdtvMode::NtscJ
        } else if mode_str.eq_ignore_ascii_case("PAL") {
            SdtvMode::Pal
        } else if mode_str.eq_ignore_ascii_case("PAL_M") {
            SdtvMode::PalM
        } else {
            return Err(format!("invalid mode '{mode_str}'"));
        };

        let aspect = match aspect_str {
            "4:3" => SdtvAspect::Ratio4x3,
            "14:9" => SdtvAspect::Ratio14x9,
            "16:9" => SdtvAspect::Ratio16x9,
            other => return Err(format!("invalid aspect '{other}'")),
        };

        let progressive = match progressive_str {
            Some(p) if p.eq_ignore_ascii_case("P") => true,
            Some(p) => return Err(format!("invalid arguments '{p}'")),
            None => false,
        };

        Ok(SdtvSelection { mode, aspect, progressive })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_mode_basic() {
        let parsed: ExplicitMode = "CEA 4 HDMI".parse().unwrap();
        assert_eq!(
            parsed,
            ExplicitMode {
                group: ModeGroup::Cea,
                code: 4,
                drive: HdmiDrive::Hdmi,
                threed: None,
            }
        );
    }

    #[test]
    fn test_explicit_mode_defaults_to_hdmi_drive() {
        let parsed: ExplicitMode = "DMT 82".parse().unwrap();
        assert_eq!(parsed.drive, HdmiDrive::Hdmi);
        assert_eq!(parsed.group, ModeGroup::Dmt);
    }

    #[test]
    fn test_explicit_mode_3d_suffixes() {
        let cases = [
            ("CEA_3D 4", Some(ThreeDFormat::SideBySideHalf)),
            ("cea_3d_sbs 4", Some(ThreeDFormat::SideBySideHalf)),
            ("CEA_3D_TB 4", Some(ThreeDFormat::TopBottomHalf)),
            ("CEA_3D_FP 4", Some(ThreeDFormat::FramePacking)),
            ("CEA_3D_FS 4", Some(ThreeDFormat::FrameSequential)),
        ];
        for (input, expected) in cases {
            let parsed: ExplicitMode = input.parse().unwrap();
            assert_eq!(parsed.threed, expected, "input {input:?}");
            assert_eq!(parsed.group, ModeGroup::Cea);
        }
    }

    #[test]
    fn test_explicit_mode_rejects_out_of_range_code() {
        assert!("CEA 128 HDMI".parse::<ExplicitMode>().is_err());
        assert!("CEA 127 HDMI".parse::<ExplicitMode>().is_ok());
    }

    #[test]
    fn test_explicit_mode_rejects_bad_tokens() {
        assert!("XYZ 4".parse::<ExplicitMode>().is_err());
        assert!("CEA".parse::<ExplicitMode>().is_err());
        assert!("CEA 4 VGA".parse::<ExplicitMode>().is_err());
        assert!("CEA 4 HDMI extra".parse::<ExplicitMode>().is_err());
    }

    #[test]
    fn test_sdtv_selection_parse() {
        let parsed: SdtvSelection = "PAL 16:9".parse().unwrap();
        assert_eq!(parsed.mode, SdtvMode::Pal);
        assert_eq!(parsed.aspect, SdtvAspect::Ratio16x9);
        assert!(!parsed.progressive);

        let parsed: SdtvSelection = "ntsc_j 4:3 P".parse().unwrap();
        assert_eq!(parsed.mode, SdtvMode::NtscJ);
        assert!(parsed.progressive);
    }

    #[test]
    fn test_sdtv_selection_rejects_bad_tokens() {
        assert!("SECAM 4:3".parse::<SdtvSelection>().is_err());
        assert!("PAL 21:9".parse::<SdtvSelection>().is_err());
        assert!("PAL 4:3 X".parse::<SdtvSelection>().is_err());
    }

    #[test]
    fn test_threed_mask_names() {
        let mask = ThreeDStructMask::FRAME_PACKING | ThreeDStructMask::SIDE_BY_SIDE_HALF;
        assert_eq!(mask.names(), vec!["FP", "SbS-HH"]);
        assert!(ThreeDStructMask::empty().names().is_empty());
    }
}
