// Node client - one request, one reply

use crate::config::Config;
use crate::error::{Result, TransportError};
use crate::network::{Node, Packet};
use std::time::Duration;

/// Content type for JSON request bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type older nodes expect on the same JSON body
pub const LEGACY_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Moves an encoded request to a node and returns the raw reply body
pub trait Transport: Send + Sync {
    fn post(
        &self,
        uri: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = std::result::Result<Vec<u8>, TransportError>> + Send;
}

/// HTTP POST transport
pub struct HttpTransport {
    client: reqwest::Client,
    content_type: &'static str,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, legacy_form_content_type: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let content_type = if legacy_form_content_type {
            LEGACY_FORM_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        };

        Ok(Self {
            client,
            content_type,
            timeout,
        })
    }

    pub fn content_type(&self) -> &str {
        self.content_type
    }
}

impl Transport for HttpTransport {
    async fn post(
        &self,
        uri: &str,
        body: Vec<u8>,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(uri)
            .header(reqwest::header::CONTENT_TYPE, self.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::ConnectFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::NonSuccessStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

/// Sends packets to nodes and decodes their replies
pub struct NodeClient<T: Transport = HttpTransport> {
    transport: T,
    timeout: Duration,
}

impl NodeClient<HttpTransport> {
    /// HTTP client configured from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let transport = HttpTransport::new(timeout, config.legacy_form_content_type)?;
        Ok(Self::new(transport, timeout))
    }
}

impl<T: Transport> NodeClient<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one packet to `node` and wait for its reply.
    ///
    /// The reply is decoded but not verified; callers check the node
    /// signature before acting on it.
    pub async fn send(&self, packet: &Packet, node: &Node) -> Result<Packet> {
        let body = packet.to_json(false)?.into_bytes();
        log::debug!("Sending {} to {}", packet.packet_type(), node.uri);

        let reply = tokio::time::timeout(self.timeout, self.transport.post(&node.uri, body))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        let reply = Packet::from_bytes(&reply)?;
        log::debug!("Received {} from {}", reply.packet_type(), node.uri);

        Ok(reply)
    }
}
