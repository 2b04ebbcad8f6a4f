// src/settings.rs
//
// Bridge configuration: TOML file with per-field defaults, so an empty file
// (or no file at all) yields a fully working setup for the stock 12-channel
// LED controller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::io::serial::{Parity, SerialLinkConfig};

// ============================================================================
// Defaults
// ============================================================================

fn default_route_prefix() -> String {
    "/rnbo/inst/1/messages/out".to_string()
}

/// The stock parameter table: one slot per LED render parameter, in wire
/// order, with the controller's power-on values.
fn default_params() -> Vec<ParamSpec> {
    [
        ("brightness", 90u8),
        ("radius", 253),
        ("palette", 0),
        ("divisions", 2),
        ("width", 201),
        ("curve", 126),
        ("rotation", 231),
        ("fadeIn", 59),
        ("fadeOut", 0),
        ("peakPosition", 128),
        ("pattern", 0),
        ("gradientOffset", 0),
    ]
    .into_iter()
    .map(|(name, default)| ParamSpec {
        name: name.to_string(),
        route: None,
        default,
    })
    .collect()
}

fn default_fps() -> u32 {
    260
}

fn default_serial_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    10_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_listen_port() -> u16 {
    4321
}

fn default_send_port() -> u16 {
    1234
}

fn default_gamepad_name() -> String {
    "Xbox Wireless Controller".to_string()
}

fn default_gamepad_route_prefix() -> String {
    "/gamepad".to_string()
}

fn default_scan_backoff_ms() -> u64 {
    3_000
}

fn default_keepalive_ms() -> u64 {
    60_000
}

// ============================================================================
// Sections
// ============================================================================

/// One tracked parameter. Slot order on the wire is declaration order.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ParamSpec {
    pub name: String,
    /// Explicit inbound address. When absent, `<route_prefix>/<name>`.
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub default: u8,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SerialSettings {
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OscSettings {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_send_port")]
    pub send_port: u16,
}

impl Default for OscSettings {
    fn default() -> Self {
        OscSettings {
            listen_port: default_listen_port(),
            send_port: default_send_port(),
        }
    }
}

/// Gamepad events arrive addressed as `<route_prefix>/<EVENT_NAME>`
/// (`/gamepad/ABS_X`, `/gamepad/BTN_SOUTH`, ...), not as the OSC parameter
/// routes, so gamepad mode needs explicit per-param `route` entries pointing
/// at those addresses:
///
/// ```toml
/// [[params]]
/// name = "brightness"
/// route = "/gamepad/ABS_GAS"
/// default = 90
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GamepadSettings {
    /// Off by default; the OSC listener is the usual inbound source.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_gamepad_name")]
    pub name: String,
    #[serde(default = "default_gamepad_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_scan_backoff_ms")]
    pub scan_backoff_ms: u64,
    /// Zero disables the keep-alive pulse.
    #[serde(default = "default_keepalive_ms")]
    pub keepalive_ms: u64,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        GamepadSettings {
            enabled: false,
            name: default_gamepad_name(),
            route_prefix: default_gamepad_route_prefix(),
            scan_backoff_ms: default_scan_backoff_ms(),
            keepalive_ms: default_keepalive_ms(),
        }
    }
}

// ============================================================================
// BridgeSettings
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BridgeSettings {
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default = "default_params")]
    pub params: Vec<ParamSpec>,
    /// Outbound frames per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// When set, `tlog!` lines are teed into a timestamped file here.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub osc: OscSettings,
    #[serde(default)]
    pub gamepad: GamepadSettings,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        BridgeSettings {
            route_prefix: default_route_prefix(),
            params: default_params(),
            fps: default_fps(),
            log_dir: None,
            serial: SerialSettings::default(),
            osc: OscSettings::default(),
            gamepad: GamepadSettings::default(),
        }
    }
}

impl BridgeSettings {
    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&raw).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Integer division so the period is exact in nanoseconds; summing it
    /// never drifts from the configured rate the way a rounded float would.
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    /// Inbound address per slot, in wire order.
    pub fn routes(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|p| match &p.route {
                Some(route) => route.clone(),
                None => format!("{}/{}", self.route_prefix, p.name),
            })
            .collect()
    }

    /// `(name, default)` pairs for building the parameter vector.
    pub fn param_defaults(&self) -> impl Iterator<Item = (String, u8)> + '_ {
        self.params.iter().map(|p| (p.name.clone(), p.default))
    }

    pub fn serial_link_config(&self) -> SerialLinkConfig {
        SerialLinkConfig {
            port: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
            data_bits: self.serial.data_bits,
            stop_bits: self.serial.stop_bits,
            parity: self.serial.parity,
            max_retries: self.serial.max_retries,
            retry_backoff: Duration::from_millis(self.serial.retry_backoff_ms),
            settle_delay: Duration::from_millis(self.serial.settle_delay_ms),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_stock_defaults() {
        let settings: BridgeSettings = toml::from_str("").unwrap();
        assert_eq!(settings.params.len(), 12);
        assert_eq!(settings.params[0].name, "brightness");
        assert_eq!(settings.params[0].default, 90);
        assert_eq!(settings.fps, 260);
        assert_eq!(settings.serial.port, "/dev/ttyACM0");
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.osc.listen_port, 4321);
        assert!(!settings.gamepad.enabled);
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        let settings: BridgeSettings = toml::from_str(
            r#"
            fps = 60

            [serial]
            port = "/dev/ttyUSB3"

            [[params]]
            name = "level"
            default = 100

            [[params]]
            name = "tilt"
            route = "/custom/tilt"
            "#,
        )
        .unwrap();
        assert_eq!(settings.fps, 60);
        assert_eq!(settings.serial.port, "/dev/ttyUSB3");
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.params.len(), 2);
        assert_eq!(settings.params[1].default, 0);
    }

    #[test]
    fn test_routes_follow_prefix_unless_explicit() {
        let settings: BridgeSettings = toml::from_str(
            r#"
            route_prefix = "/out"

            [[params]]
            name = "level"

            [[params]]
            name = "tilt"
            route = "/custom/tilt"
            "#,
        )
        .unwrap();
        assert_eq!(settings.routes(), vec!["/out/level", "/custom/tilt"]);
    }

    #[test]
    fn test_default_routes_use_stock_prefix() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.routes()[0], "/rnbo/inst/1/messages/out/brightness");
        assert_eq!(
            settings.routes()[11],
            "/rnbo/inst/1/messages/out/gradientOffset"
        );
    }

    #[test]
    fn test_frame_period_is_exact_integer_division() {
        let settings = BridgeSettings::default();
        assert_eq!(settings.frame_period(), Duration::from_secs(1) / 260);
        let mut s = settings;
        s.fps = 0;
        assert_eq!(s.frame_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_gamepad_routed_table() {
        let settings: BridgeSettings = toml::from_str(
            r#"
            [gamepad]
            enabled = true

            [[params]]
            name = "brightness"
            route = "/gamepad/ABS_GAS"
            default = 90

            [[params]]
            name = "pattern"
            route = "/gamepad/BTN_SOUTH"
            "#,
        )
        .unwrap();
        assert!(settings.gamepad.enabled);
        let routes = settings.routes();
        assert_eq!(routes, vec!["/gamepad/ABS_GAS", "/gamepad/BTN_SOUTH"]);
        // Every route is reachable from the gamepad source.
        assert!(routes
            .iter()
            .all(|r| r.starts_with(&settings.gamepad.route_prefix)));
    }

    #[test]
    fn test_parity_parses_lowercase() {
        let settings: BridgeSettings = toml::from_str(
            r#"
            [serial]
            parity = "even"
            "#,
        )
        .unwrap();
        assert_eq!(settings.serial.parity, Parity::Even);
    }
}
