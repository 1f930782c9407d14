//! Configuration management

use anyhow::{Context, Result};
use avsync_protocol::DEFAULT_LISTEN_ADDR;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wol::MacAddr;

/// Display (webOS TV) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// IP address of the display
    #[serde(default = "default_display_address")]
    pub address: IpAddr,
    /// MAC address used to wake the display
    #[serde(default = "default_display_mac")]
    pub mac: MacAddr,
    /// Pairing key issued by the display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}

fn default_display_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 123))
}
fn default_display_mac() -> MacAddr {
    MacAddr::new([0x12, 0x34, 0x56, 0x78, 0x90, 0xAB])
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            address: default_display_address(),
            mac: default_display_mac(),
            client_key: None,
        }
    }
}

/// Receiver (Onkyo IR bridge) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_address")]
    pub address: IpAddr,
}

fn default_receiver_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 234))
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            address: default_receiver_address(),
        }
    }
}

/// Companion PC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcConfig {
    #[serde(default = "default_pc_mac")]
    pub mac: MacAddr,
}

fn default_pc_mac() -> MacAddr {
    MacAddr::new([0x12, 0x34, 0x56, 0x78, 0x90, 0xCD])
}

impl Default for PcConfig {
    fn default() -> Self {
        Self {
            mac: default_pc_mac(),
        }
    }
}

/// Control surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (`host:port`)
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Delays and timeouts, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Timeout for opening the display connection and for receiver requests
    #[serde(default = "default_connect")]
    pub connect_ms: u64,
    /// Wait before reconnecting after the display went idle
    #[serde(default = "default_reconnect")]
    pub reconnect_ms: u64,
    /// Wait before reconnecting after a failure
    #[serde(default = "default_retry_connect")]
    pub retry_connect_ms: u64,
    /// Receiver settle time after power on/off
    #[serde(default = "default_receiver_boot")]
    pub receiver_boot_ms: u64,
    /// Display boot time after a wake signal
    #[serde(default = "default_display_boot")]
    pub display_boot_ms: u64,
}

fn default_connect() -> u64 {
    3000
}
fn default_reconnect() -> u64 {
    5000
}
fn default_retry_connect() -> u64 {
    3000
}
fn default_receiver_boot() -> u64 {
    1000
}
fn default_display_boot() -> u64 {
    5000
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_ms: default_connect(),
            reconnect_ms: default_reconnect(),
            retry_connect_ms: default_retry_connect(),
            receiver_boot_ms: default_receiver_boot(),
            display_boot_ms: default_display_boot(),
        }
    }
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn retry_connect(&self) -> Duration {
        Duration::from_millis(self.retry_connect_ms)
    }

    pub fn receiver_boot(&self) -> Duration {
        Duration::from_millis(self.receiver_boot_ms)
    }

    pub fn display_boot(&self) -> Duration {
        Duration::from_millis(self.display_boot_ms)
    }
}

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub pc: PcConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::config_path()?;
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "avsync", "AvSync")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }
}
