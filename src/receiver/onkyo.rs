//! HTTP IR bridge in front of the Onkyo receiver

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

use super::{ReceiverError, ReceiverTransport};

/// Sends IR codes as `GET http://<bridge>/ir?code=<decimal>`
pub struct OnkyoTransport {
    client: reqwest::Client,
    base_url: String,
}

impl OnkyoTransport {
    pub fn new(address: IpAddr, timeout: Duration) -> Result<Self, ReceiverError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let host = match address {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{}]", v6),
        };
        Ok(Self {
            client,
            base_url: format!("http://{}", host),
        })
    }

    fn ir_url(&self, code: u32) -> String {
        format!("{}/ir?code={}", self.base_url, code)
    }
}

#[async_trait]
impl ReceiverTransport for OnkyoTransport {
    async fn send_code(&self, code: u32) -> Result<(), ReceiverError> {
        let url = self.ir_url(code);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReceiverError::Status {
                code,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
