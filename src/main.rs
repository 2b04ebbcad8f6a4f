// src/main.rs
//
// Daemon entry point: parse flags, layer them over the settings file, run
// the bridge.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use oscbridge::settings::BridgeSettings;

#[derive(Debug, Parser)]
#[command(
    name = "oscbridge",
    version,
    about = "Bridge irregular OSC or gamepad control events to a paced, byte-framed serial stream"
)]
struct Args {
    /// Settings file (TOML). Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device path.
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// UDP port to receive OSC control messages on.
    #[arg(long)]
    listen_port: Option<u16>,

    /// UDP port of the upstream OSC sender, for the registration message.
    #[arg(long)]
    send_port: Option<u16>,

    /// Outbound frames per second.
    #[arg(long)]
    fps: Option<u32>,

    /// Read control input from a gamepad instead of the OSC listener.
    #[arg(long)]
    gamepad: bool,

    /// Tee log output into a timestamped file under this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, settings: &mut BridgeSettings) {
        if let Some(port) = self.port {
            settings.serial.port = port;
        }
        if let Some(baud) = self.baud {
            settings.serial.baud_rate = baud;
        }
        if let Some(listen_port) = self.listen_port {
            settings.osc.listen_port = listen_port;
        }
        if let Some(send_port) = self.send_port {
            settings.osc.send_port = send_port;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if self.gamepad {
            settings.gamepad.enabled = true;
        }
        if let Some(log_dir) = self.log_dir {
            settings.log_dir = Some(log_dir);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => match BridgeSettings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("oscbridge: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => BridgeSettings::default(),
    };
    args.apply(&mut settings);

    if let Some(log_dir) = settings.log_dir.clone() {
        if let Err(e) = oscbridge::logging::init_file_logging(&log_dir) {
            eprintln!("oscbridge: {} (continuing without file logging)", e);
        }
    }

    let result = oscbridge::run(settings).await;
    oscbridge::logging::stop_file_logging();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("oscbridge: {}", e);
            ExitCode::FAILURE
        }
    }
}
