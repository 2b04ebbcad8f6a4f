// src/lib.rs
//
// Rate-decoupling bridge: absorbs irregular inbound control events (OSC over
// UDP, or a gamepad's evdev stream) into one authoritative parameter
// snapshot, and emits that snapshot as a byte-framed serial stream at a
// fixed, drift-corrected cadence. Inbound rate and outbound rate never see
// each other.

#[macro_use]
pub mod logging;

pub mod dispatch;
pub mod io;
pub mod params;
pub mod scheduler;
pub mod settings;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::mpsc;

use crate::dispatch::AddressTable;
use crate::io::serial::SerialLink;
use crate::io::IoError;
use crate::params::ParamVector;
use crate::scheduler::{run_bridge, Scheduler};
use crate::settings::BridgeSettings;

/// Run the bridge until interrupted or a setup failure.
///
/// Wires the configured inbound source to the paced serial transmit loop:
/// listeners run as tokio tasks holding only the channel sender, while the
/// scheduler owns the parameter vector and the serial handle on a blocking
/// worker. Ctrl-C flips the shared cancel flag; every path out of here has
/// dropped the serial handle by the time it returns.
pub async fn run(settings: BridgeSettings) -> Result<(), IoError> {
    let routes = settings.routes();
    let table = AddressTable::from_routes(routes.iter().map(String::as_str));
    let params = ParamVector::new(settings.param_defaults());
    if params.is_empty() {
        return Err(IoError::setup("no parameters configured"));
    }

    let (tx, rx) = mpsc::channel();
    let scheduler = Scheduler::new(table, params, rx);
    let link = SerialLink::new(settings.serial_link_config());
    let cancel = Arc::new(AtomicBool::new(false));

    if settings.gamepad.enabled {
        #[cfg(target_os = "linux")]
        {
            // Gamepad events carry `<route_prefix>/<EVENT_NAME>` addresses;
            // a table without such routes would silently drop every event.
            if !routes
                .iter()
                .any(|r| r.starts_with(&settings.gamepad.route_prefix))
            {
                tlog!(
                    "[bridge] no configured route starts with {}; gamepad events \
                     will all be dropped (set per-param 'route' entries)",
                    settings.gamepad.route_prefix
                );
            }
            let config = io::gamepad::GamepadConfig {
                name: settings.gamepad.name.clone(),
                route_prefix: settings.gamepad.route_prefix.clone(),
                scan_backoff: std::time::Duration::from_millis(settings.gamepad.scan_backoff_ms),
                keepalive: std::time::Duration::from_millis(settings.gamepad.keepalive_ms),
            };
            tokio::spawn(io::gamepad::run_reader(config, tx.clone(), cancel.clone()));
        }
        #[cfg(not(target_os = "linux"))]
        return Err(IoError::setup("gamepad input is only supported on linux"));
    } else {
        let socket = io::osc::bind_listener(settings.osc.listen_port).await?;
        let config = io::osc::OscReceiverConfig {
            listen_port: settings.osc.listen_port,
            send_port: settings.osc.send_port,
        };
        tokio::spawn(io::osc::run_receiver(socket, config, tx.clone(), cancel.clone()));
    }
    drop(tx);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tlog!("[bridge] interrupt received, shutting down");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let period = settings.frame_period();
    tlog!(
        "[bridge] {} slots at {} fps ({:?} per frame) to {}",
        routes.len(),
        settings.fps,
        period,
        settings.serial.port
    );

    let worker_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        run_bridge(scheduler, link, period, worker_cancel)
    })
    .await
    .map_err(|e| IoError::setup(format!("transmit worker failed: {}", e)))?;

    // Stop the listeners whichever way the worker ended.
    cancel.store(true, Ordering::Relaxed);
    result
}
