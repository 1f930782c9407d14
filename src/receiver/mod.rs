//! Receiver module - commands for the Onkyo A/V receiver and the serialized
//! path they take to the device

mod onkyo;
mod serializer;

pub use onkyo::OnkyoTransport;
pub use serializer::CommandSerializer;

use async_trait::async_trait;

/// Receiver commands, each a single IR code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverCommand {
    PowerOn,
    PowerOff,
    /// GAME input (PC)
    InputGame,
    /// TV/CD input (the display's own tuner and apps)
    InputTvCd,
    /// BD/DVD input (secondary receiver box)
    InputBdDvd,
}

impl ReceiverCommand {
    /// NEC IR code understood by the receiver
    pub fn code(self) -> u32 {
        match self {
            ReceiverCommand::PowerOn => 0x4BB6_20DF,
            ReceiverCommand::PowerOff => 0x4B36_E21D,
            ReceiverCommand::InputGame => 0x4BB6_B04F,
            ReceiverCommand::InputTvCd => 0x4BB6_906F,
            ReceiverCommand::InputBdDvd => 0x4B36_31CE,
        }
    }
}

impl std::fmt::Display for ReceiverCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiverCommand::PowerOn => write!(f, "power on"),
            ReceiverCommand::PowerOff => write!(f, "power off"),
            ReceiverCommand::InputGame => write!(f, "input GAME"),
            ReceiverCommand::InputTvCd => write!(f, "input TV/CD"),
            ReceiverCommand::InputBdDvd => write!(f, "input BD/DVD"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("receiver request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("receiver rejected code {code:#010X} with HTTP {status}")]
    Status { code: u32, status: u16 },
}

/// Raw command transport to the receiver
#[async_trait]
pub trait ReceiverTransport: Send + Sync {
    async fn send_code(&self, code: u32) -> Result<(), ReceiverError>;
}
