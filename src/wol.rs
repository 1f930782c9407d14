//! Wake-on-LAN magic packets

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::UdpSocket;
use tracing::debug;

/// UDP "discard" port conventionally used for magic packets
pub const WOL_PORT: u16 = 9;

/// Magic packet size: 6 sync bytes + 16 repetitions of the MAC
pub const MAGIC_PACKET_SIZE: usize = 6 + 16 * 6;

/// 48-bit hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

#[derive(Debug, thiserror::Error)]
pub enum MacParseError {
    #[error("expected 6 octets in MAC address {0:?}")]
    Length(String),
    #[error("invalid octet {octet:?} in MAC address {input:?}")]
    Octet { input: String, octet: String },
}

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl FromStr for MacAddr {
    type Err = MacParseError;

    /// Accepts `:` or `-` separated hex octets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(MacParseError::Length(s.to_string()));
        }
        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(MacParseError::Octet {
                    input: s.to_string(),
                    octet: part.to_string(),
                });
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| MacParseError::Octet {
                input: s.to_string(),
                octet: part.to_string(),
            })?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = MacParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d, e, g)
    }
}

/// Build the magic packet for `mac`
pub fn magic_packet(mac: MacAddr) -> [u8; MAGIC_PACKET_SIZE] {
    let mut packet = [0xFFu8; MAGIC_PACKET_SIZE];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.0);
    }
    packet
}

#[derive(Debug, thiserror::Error)]
pub enum WakeError {
    #[error("failed to send magic packet to {target}: {source}")]
    Io {
        target: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Sends wake signals to sleeping machines
#[async_trait]
pub trait WakeSignal: Send + Sync {
    /// Wake `mac`. With `via`, the packet is sent to that host directly;
    /// otherwise it is broadcast on the local network.
    async fn wake(&self, mac: MacAddr, via: Option<IpAddr>) -> Result<(), WakeError>;
}

/// Magic packets over UDP
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicPacket;

#[async_trait]
impl WakeSignal for MagicPacket {
    async fn wake(&self, mac: MacAddr, via: Option<IpAddr>) -> Result<(), WakeError> {
        let target = SocketAddr::new(via.unwrap_or(IpAddr::V4(Ipv4Addr::BROADCAST)), WOL_PORT);
        let io_err = |source| WakeError::Io { target, source };

        let bind: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind).await.map_err(io_err)?;
        socket.set_broadcast(true).map_err(io_err)?;
        socket.send_to(&magic_packet(mac), target).await.map_err(io_err)?;

        debug!("Sent magic packet for {} to {}", mac, target);
        Ok(())
    }
}
