// ── Configuration ────────────────────────────────────────────────────────────
//
// JSON file layout (every field optional):
//
//   {
//     "device":    { "macAddress": "...", "cachedAddress": "...", "username": "pi" },
//     "discovery": { "subnet": "192.168.1.0/24", "probeTimeoutSecs": 15, ... },
//     "session":   { "port": 22, "timeoutSecs": 30, "knownHostsPath": null },
//     "transfer":  { "remotePath": "/home/pi/grow_sensors.csv", "localPath": null }
//   }
//
// Secrets are never read from or written to this file.

use crate::error::{FetchError, FetchResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Serde default helpers ────────────────────────────────────────────────────

fn default_subnet() -> String {
    "192.168.1.0/24".to_string()
}
fn default_nmap_path() -> String {
    "nmap".to_string()
}
fn default_arp_path() -> String {
    "arp".to_string()
}
fn default_sudo_path() -> String {
    "sudo".to_string()
}
fn default_probe_timeout_secs() -> u64 {
    15
}
fn default_sweep_timeout_secs() -> u64 {
    120
}
fn default_ssh_port() -> u16 {
    22
}
fn default_timeout_secs() -> u64 {
    30
}

// ── Sections ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default)]
    pub mac_address: Option<String>,
    /// Last address the device was seen at. Verifying it needs the
    /// local privileged password.
    #[serde(default)]
    pub cached_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfig {
    #[serde(default = "default_subnet")]
    pub subnet: String,
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,
    #[serde(default = "default_arp_path")]
    pub arp_path: String,
    #[serde(default = "default_sudo_path")]
    pub sudo_path: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_sweep_timeout_secs")]
    pub sweep_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            subnet: default_subnet(),
            nmap_path: default_nmap_path(),
            arp_path: default_arp_path(),
            sudo_path: default_sudo_path(),
            probe_timeout_secs: default_probe_timeout_secs(),
            sweep_timeout_secs: default_sweep_timeout_secs(),
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_secs(self.sweep_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Host keys are accepted automatically; when set, they are also
    /// recorded in this OpenSSH known_hosts file.
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: default_ssh_port(),
            timeout_secs: default_timeout_secs(),
            known_hosts_path: None,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferConfig {
    #[serde(default)]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiFetchConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

impl PiFetchConfig {
    /// `<config dir>/pifetch/config.json`, e.g. `~/.config/pifetch/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pifetch").join("config.json"))
    }

    pub fn load(path: &Path) -> FetchResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FetchError::config(format!("Cannot read config '{}'", path.display()))
                .with_detail(e.to_string())
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            FetchError::config(format!("Invalid config '{}'", path.display()))
                .with_detail(e.to_string())
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> FetchResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load(&p),
                _ => Ok(Self::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use std::io::Write;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: PiFetchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PiFetchConfig::default());
        assert_eq!(cfg.discovery.subnet, "192.168.1.0/24");
        assert_eq!(cfg.session.port, 22);
        assert_eq!(cfg.session.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: PiFetchConfig = serde_json::from_str(
            r#"{
                "device": { "macAddress": "AA:BB:CC:DD:EE:FF", "cachedAddress": "192.168.1.42" },
                "discovery": { "subnet": "10.0.0.0/24" },
                "session": { "port": 2222 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.device.mac_address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(cfg.device.cached_address, Some(Ipv4Addr::new(192, 168, 1, 42)));
        assert_eq!(cfg.discovery.subnet, "10.0.0.0/24");
        assert_eq!(cfg.discovery.nmap_path, "nmap");
        assert_eq!(cfg.discovery.probe_timeout_secs, 15);
        assert_eq!(cfg.session.port, 2222);
        assert_eq!(cfg.session.timeout_secs, 30);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "transfer": {{ "remotePath": "/home/pi/grow_sensors.csv" }} }}"#
        )
        .unwrap();
        let cfg = PiFetchConfig::load(file.path()).unwrap();
        assert_eq!(
            cfg.transfer.remote_path.as_deref(),
            Some("/home/pi/grow_sensors.csv")
        );
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PiFetchConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::ConfigError);
    }

    #[test]
    fn load_invalid_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"session\": {{ \"port\": \"twenty-two\" }} }}").unwrap();
        let err = PiFetchConfig::load(file.path()).unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::ConfigError);
    }
}
