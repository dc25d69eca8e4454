//! Port-forward negotiation
//!
//! Negotiates a forwarded port with the remote control endpoint, keyed by a
//! persisted high-entropy client identifier. The endpoint binds the port to
//! the identifier rather than the session, so repeat calls with the same
//! identifier normally return the same port; the returned value is always
//! re-persisted rather than assumed.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ForwardError;
use crate::paths::Paths;

/// Default control endpoint for forwarding requests
pub const DEFAULT_FORWARDING_ENDPOINT: &str = "http://209.222.18.222:2000";

/// Request timeout; non-response is a soft failure at this layer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Client identifier length in bytes (hex-encoded on disk)
const CLIENT_ID_BYTES: usize = 32;

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    port: i64,
}

/// Negotiates and renews the forwarded port
pub struct PortForwarder {
    endpoint: String,
    client_id_path: PathBuf,
    port_path: PathBuf,
}

impl PortForwarder {
    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(
            DEFAULT_FORWARDING_ENDPOINT,
            paths.client_id_path.clone(),
            paths.port_path.clone(),
        )
    }

    pub fn new(
        endpoint: impl Into<String>,
        client_id_path: PathBuf,
        port_path: PathBuf,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client_id_path,
            port_path,
        }
    }

    /// Request a forwarded port for this client
    ///
    /// With `new_identity`, or when no identifier is persisted, a fresh
    /// 256-bit identifier is generated and written to disk before the
    /// network call so a crashed request never leaves disk inconsistent
    /// with what was sent.
    pub async fn forwarded_port(&self, new_identity: bool) -> Result<u16, ForwardError> {
        let client_id = self.load_or_generate_client_id(new_identity)?;

        let url = format!("{}/?client_id={}", self.endpoint, client_id);
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response: ForwardResponse = client.get(&url).send().await?.json().await?;

        let port = u16::try_from(response.port)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| ForwardError::BadPort(response.port.to_string()))?;

        fs::write(&self.port_path, port.to_string())?;
        tracing::info!("Forwarded port ({}) saved to {:?}", port, self.port_path);
        Ok(port)
    }

    /// Current persisted client identifier, if any
    pub fn client_id(&self) -> Option<String> {
        fs::read_to_string(&self.client_id_path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn load_or_generate_client_id(&self, new_identity: bool) -> Result<String, ForwardError> {
        if !new_identity {
            if let Some(id) = self.client_id() {
                return Ok(id);
            }
        }
        use rand::Rng;
        let mut bytes = [0u8; CLIENT_ID_BYTES];
        rand::thread_rng().fill(&mut bytes[..]);
        let client_id = hex::encode(bytes);
        if let Some(parent) = self.client_id_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.client_id_path, &client_id)?;
        tracing::debug!("Generated new forwarding client identifier");
        Ok(client_id)
    }
}
