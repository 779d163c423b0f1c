//! Daemon configuration.
//!
//! All values are fixed at load time; nothing here is runtime-negotiable.
//! The `*_configured` enables decide which low-power features the device
//! carries at all — the live toggles (input switches) then only matter for
//! features that are configured in.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Fixed UDP/IP header overhead used when logging on-wire payload sizes.
pub const UDP_IP_HEADER_SIZE: usize = 28;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UplinkConfig {
    /// Destination address for telemetry uploads.
    pub server_addr: IpAddr,
    /// Destination port.
    pub server_port: u16,
    /// Size of each upload payload in bytes (excluding UDP/IP headers).
    pub payload_size_bytes: usize,
    /// Period between uploads, in seconds.
    pub upload_period_secs: u64,
    /// Poll interval of the startup wait loop, in seconds.
    pub startup_poll_secs: u64,
    /// How long startup may wait for the link to settle before failing.
    pub startup_timeout_secs: u64,
    /// Whether power-save mode is available on this build of the device.
    pub power_save_configured: bool,
    /// Whether idle-receive negotiation is available.
    pub idle_receive_configured: bool,
    /// Whether release assistance is available.
    pub release_assist_configured: bool,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        UplinkConfig {
            server_addr: "8.8.8.8".parse().unwrap(),
            server_port: 2469,
            payload_size_bytes: 10,
            upload_period_secs: 900,
            startup_poll_secs: 3,
            startup_timeout_secs: 120,
            power_save_configured: true,
            idle_receive_configured: false,
            release_assist_configured: true,
        }
    }
}

impl UplinkConfig {
    /// Load configuration from a TOML file. Missing keys take defaults;
    /// unknown keys are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: UplinkConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn destination(&self) -> SocketAddr {
        SocketAddr::new(self.server_addr, self.server_port)
    }

    pub fn upload_period(&self) -> Duration {
        Duration::from_secs(self.upload_period_secs)
    }

    pub fn startup_poll(&self) -> Duration {
        Duration::from_secs(self.startup_poll_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = UplinkConfig::default();
        assert_eq!(cfg.payload_size_bytes, 10);
        assert_eq!(cfg.upload_period_secs, 900);
        assert_eq!(cfg.destination().port(), 2469);
        assert!(cfg.power_save_configured);
        assert!(!cfg.idle_receive_configured);
    }

    #[test]
    fn parse_partial_toml() {
        let cfg: UplinkConfig = toml::from_str(
            r#"
            server_addr = "192.0.2.10"
            server_port = 5000
            upload_period_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.destination().to_string(), "192.0.2.10:5000");
        assert_eq!(cfg.upload_period(), Duration::from_secs(60));
        // Unspecified keys fall back to defaults
        assert_eq!(cfg.payload_size_bytes, 10);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: std::result::Result<UplinkConfig, _> =
            toml::from_str("not_a_real_key = true");
        assert!(result.is_err());
    }

    #[test]
    fn load_missing_file_errors() {
        let err = UplinkConfig::load("/nonexistent/uplink.toml").unwrap_err();
        assert!(err.to_string().contains("uplink.toml"));
    }
}
