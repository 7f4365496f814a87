// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use tvctl::audio::AudioFormatCapability;
use tvctl::client::TvClient;
use tvctl::display::{
    DisplayState, ExplicitMode, HdmiDrive, ModeDescriptor, ModeGroup, PreferredMode, ScanMode,
    SdtvSelection,
};
use tvctl::edid::read_edid;
use tvctl::notify::{Notification, NotifyFn};
use tvctl::transport::socket::SocketTransport;

#[macro_use]
extern crate tracing;

fn setup_logs() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new(format!(
        "warn,{}=warn",
        env!("CARGO_CRATE_NAME")
    )));

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }
}

/// Power on/off and query a TV/HDMI output attached to the video device.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Power on HDMI in the display's preferred mode
    #[arg(short, long)]
    preferred: bool,

    /// Power on HDMI in an explicit mode: "GROUP MODE [DRIVE]"
    /// (group CEA, DMT or CEA_3D[_SBS|_TB|_FP|_FS]; drive HDMI or DVI)
    #[arg(short, long, value_name = "GROUP MODE DRIVE")]
    explicit: Option<ExplicitMode>,

    /// Use NTSC (1000/1001-adjusted) frame rates for an explicit power-on
    #[arg(short = 't', long)]
    ntsc: bool,

    /// Power on SDTV: "MODE ASPECT [P]" (mode NTSC, NTSC_J, PAL or PAL_M;
    /// aspect 4:3, 14:9 or 16:9; P for progressive)
    #[arg(short = 'c', long, value_name = "MODE ASPECT P")]
    sdtvon: Option<SdtvSelection>,

    /// Power off the display
    #[arg(short, long)]
    off: bool,

    /// List supported modes in the given group (CEA or DMT)
    #[arg(short, long, value_name = "GROUP")]
    modes: Option<ModeGroup>,

    /// Emit the mode list as JSON
    #[arg(short, long)]
    json: bool,

    /// Print notifications as they arrive, until interrupted
    #[arg(short = 'M', long)]
    monitor: bool,

    /// Print the current display state
    #[arg(short, long)]
    status: bool,

    /// Print the audio capabilities of the attached display
    #[arg(short, long)]
    audio: bool,

    /// Dump the raw EDID to a file
    #[arg(short, long, value_name = "FILE")]
    dumpedid: Option<PathBuf>,

    /// Print the device identifier of the attached display
    #[arg(short, long)]
    name: bool,

    /// Show (1) or hide (0) the on-screen info overlay
    #[arg(short, long, value_name = "0|1", value_parser = clap::value_parser!(u8).range(0..=1))]
    info: Option<u8>,

    /// Socket of the device daemon
    #[arg(long, env = "TVCTL_SOCKET", default_value = "/run/tvctl.sock")]
    socket: PathBuf,
}

fn main() {
    setup_logs();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let power_on_count = usize::from(cli.preferred)
        + usize::from(cli.explicit.is_some())
        + usize::from(cli.sdtvon.is_some());
    if power_on_count > 1 {
        bail!("Conflicting power on options");
    }
    if power_on_count > 0 && cli.off {
        bail!("Cannot power on and power off simultaneously");
    }

    let transport =
        Arc::new(SocketTransport::connect(&cli.socket).context("connecting to device daemon")?);
    let client = TvClient::new(transport);

    if cli.preferred {
        client
            .power_on_preferred(HdmiDrive::Hdmi)
            .context("powering on in preferred mode")?;
    } else if let Some(mode) = cli.explicit {
        client
            .power_on_explicit(mode, cli.ntsc)
            .with_context(|| format!("powering on {} mode {}", mode.group, mode.code))?;
    } else if let Some(selection) = cli.sdtvon {
        client
            .power_on_sdtv(selection)
            .context("powering on SDTV")?;
    } else if cli.off {
        client.power_off().context("powering off")?;
    }

    if let Some(group) = cli.modes {
        print_modes(&client, group, cli.json)?;
    }

    if cli.status {
        print_status(&client)?;
    }

    if cli.audio {
        for capability in client.audio_capabilities().context("probing audio")? {
            print_audio_capability(&capability);
        }
    }

    if let Some(path) = &cli.dumpedid {
        match read_edid(&client) {
            Ok(edid) => {
                edid.write_to(path)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Written {} bytes to {}", edid.len(), path.display());
            }
            Err(err) => {
                println!("Nothing written!");
                return Err(err).context("reading EDID");
            }
        }
    }

    if cli.name {
        let id = client.get_device_id().context("reading device id")?;
        println!("device_name={}-{}", id.vendor, id.monitor_name);
    }

    if let Some(value) = cli.info {
        client.show_info(value != 0).context("setting info overlay")?;
    }

    if cli.monitor {
        run_monitor(&client)?;
    }

    Ok(())
}

fn print_modes(client: &TvClient, group: ModeGroup, json: bool) -> anyhow::Result<()> {
    let (modes, preferred) = client
        .get_modes(group)
        .with_context(|| format!("enumerating {group} modes"))?;
    if json {
        let entries: Vec<serde_json::Value> = modes
            .iter()
            .map(|mode| {
                serde_json::json!({
                    "code": mode.code,
                    "width": mode.width,
                    "height": mode.height,
                    "rate": mode.frame_rate,
                    "aspect_ratio": mode.aspect.to_string(),
                    "scan": match mode.scan_mode {
                        ScanMode::Progressive => "p",
                        ScanMode::Interlaced => "i",
                    },
                    "3d_modes": mode.struct_3d.names(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&entries)?);
    } else {
        println!("Group {group} has {} modes:", modes.len());
        for mode in &modes {
            print_mode_line(mode, preferred);
        }
    }
    Ok(())
}

fn print_mode_line(mode: &ModeDescriptor, preferred: Option<PreferredMode>) {
    let marker = if preferred.is_some_and(|p| p.matches(mode)) {
        "(prefer) "
    } else {
        ""
    };
    let mut line = format!(
        "  {}mode {}: {}x{} @ {}Hz {}, clock:{}MHz {}",
        marker,
        mode.code,
        mode.width,
        mode.height,
        mode.frame_rate,
        mode.aspect,
        mode.pixel_freq / 1_000_000,
        mode.scan_mode,
    );
    if mode.pixel_rep > 1 {
        line.push_str(&format!(" x{}", mode.pixel_rep));
    }
    if !mode.struct_3d.is_empty() {
        line.push_str(&format!(" 3D:{}", mode.struct_3d.names().join("|")));
    }
    if mode.native {
        line.push_str(" (native)");
    }
    println!("{line}");
}

fn print_status(client: &TvClient) -> anyhow::Result<()> {
    let state = client.get_display_state().context("querying display state")?;
    if let DisplayState::Hdmi(h) = state {
        // Frame rates are reported nominal; correct by 1000/1001 when
        // the device runs NTSC pixel clocks.
        let rate = if client.pixel_clock_is_ntsc()? {
            f64::from(h.frame_rate) * 1000.0 / 1001.0
        } else {
            f64::from(h.frame_rate)
        };
        println!(
            "{} {} ({}) {}, {}x{} @ {:.2}Hz, {}",
            h.drive, h.group, h.code, h.aspect, h.width, h.height, rate, h.scan_mode
        );
    } else {
        println!("{state}");
    }
    Ok(())
}

fn print_audio_capability(capability: &AudioFormatCapability) {
    let max_rate = capability.rates.max().map_or(0, |r| r.khz());
    match (capability.max_sample_size, capability.max_bitrate_kbps()) {
        (Some(size), _) => println!(
            "{:>8} supported: Max channels: {}, Max samplerate:{:>4}kHz, Max samplesize {:>2} bits.",
            capability.format.name(),
            capability.max_channels,
            max_rate,
            size.bits()
        ),
        (None, Some(kbps)) => println!(
            "{:>8} supported: Max channels: {}, Max samplerate:{:>4}kHz, Max rate {:>4} kb/s.",
            capability.format.name(),
            capability.max_channels,
            max_rate,
            kbps
        ),
        (None, None) => println!(
            "{:>8} supported: Max channels: {}, Max samplerate:{:>4}kHz.",
            capability.format.name(),
            capability.max_channels,
            max_rate
        ),
    }
}

fn monitor_callback() -> NotifyFn {
    Arc::new(|_context, notification| {
        let message = match notification {
            Notification::HdmiUnplugged => "HDMI cable is unplugged".to_string(),
            Notification::HdmiAttached { .. } => "HDMI is attached".to_string(),
            Notification::DviActive { group, code } => {
                format!("HDMI in DVI mode: {group} ({code})")
            }
            Notification::HdmiActive { group, code } => {
                format!("HDMI in HDMI mode: {group} ({code})")
            }
            Notification::HdcpUnauthorized { .. } => "HDCP authentication is broken".to_string(),
            Notification::HdcpAuthenticated => "HDCP is active".to_string(),
            Notification::HdcpKeyDownloaded { .. } => "HDCP key download".to_string(),
            Notification::HdcpSrmDownloaded { .. } => "HDCP revocation list download".to_string(),
            Notification::ChangingMode => "Changing mode".to_string(),
            Notification::SdtvAttached => "SDTV is attached".to_string(),
            Notification::SdtvUnplugged => "SDTV cable is unplugged".to_string(),
            Notification::SdtvActive { mode, aspect } => {
                format!("SDTV in {mode} mode {aspect}")
            }
            Notification::SdtvCopyProtectChanged { enabled } => {
                if *enabled {
                    "SDTV copy protection enabled".to_string()
                } else {
                    "SDTV copy protection disabled".to_string()
                }
            }
        };
        println!("{message}");
    })
}

/// Print notifications until SIGINT or SIGTERM.
fn run_monitor(client: &TvClient) -> anyhow::Result<()> {
    let callback = monitor_callback();
    client
        .dispatcher()
        .register(Arc::clone(&callback), 0)
        .context("registering monitor callback")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("starting signal runtime")?;
    runtime.block_on(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("installing SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("waiting for SIGINT")?,
            _ = sigterm.recv() => {}
        }
        Ok::<(), anyhow::Error>(())
    })?;

    println!("Shutting down...");
    client.dispatcher().unregister(&callback);
    Ok(())
}
