// Device HTTP client
//
// Wraps `reqwest::Client` with SmartCB URL construction, status checking,
// and JSON decoding. Endpoint groups (info, settings, schedules, time,
// data) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use std::net::Ipv4Addr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Acknowledgement body returned by the device's write endpoints.
///
/// Older firmware answers with an empty body or plain text, so every
/// field is optional and an unparseable body counts as success.
#[derive(Debug, Default, Deserialize)]
struct Ack {
    success: Option<bool>,
    #[serde(alias = "error")]
    message: Option<String>,
}

/// Raw HTTP client for one SmartCB device.
///
/// All methods return decoded payloads; HTTP status failures and JSON
/// decoding problems are mapped into [`Error`] before the caller sees them.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
    /// Configured request timeout, used to report `Error::Timeout`.
    timeout_ms: Option<u64>,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the device root, e.g. `http://192.168.4.1`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_ms: Some(transport.timeout_ms()),
        })
    }

    /// Create a client for `http://{host}:{port}`.
    pub fn for_host(host: Ipv4Addr, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("http://{host}:{port}/"))?;
        Self::new(base_url, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_ms: None,
        }
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for `/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        self.parse_json(resp).await
    }

    /// Send a POST request to a write endpoint and check its acknowledgement.
    pub(crate) async fn post_ack(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let body = self.checked_body(resp).await?;
        let ack: Ack = serde_json::from_str(&body).unwrap_or_default();
        trace!(?ack, "device acknowledgement");

        if ack.success == Some(false) {
            return Err(Error::Rejected {
                message: ack
                    .message
                    .unwrap_or_else(|| "device reported success=false".into()),
            });
        }
        Ok(())
    }

    /// Check the status and return the body text.
    async fn checked_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        resp.text().await.map_err(|e| self.map_transport(e))
    }

    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let body = self.checked_body(resp).await?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        match self.timeout_ms {
            Some(timeout_ms) if err.is_timeout() => Error::Timeout { timeout_ms },
            _ => Error::Transport(err),
        }
    }
}
