// ── Pull-based HTTP client ──
//
// Thin typed wrapper over the monitor server's HTTP surface. Every call
// is a single request-response cycle; the push channel lives in
// `websocket.rs`.

use serde::{Deserialize, Serialize};
use url::Url;

use srtwatch_core::{StatusReport, WireEntry};

use crate::error::Error;
use crate::transport::TransportConfig;

/// Server response to a report submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportAck {
    pub status: String,
    pub action: ReportAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Inserted,
    Updated,
}

#[derive(Debug, Serialize)]
struct RemoveRequest<'a> {
    identity: &'a str,
    local_address: &'a str,
    port: u16,
}

#[derive(Debug, Serialize)]
struct RenameRequest<'a> {
    old_name: &'a str,
    new_name: &'a str,
}

/// HTTP client for the monitor server.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    base: Url,
    http: reqwest::Client,
}

impl MonitorClient {
    pub fn new(base: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            base,
            http: transport.build_client()?,
        })
    }

    /// Build from an existing `reqwest::Client` (used in tests).
    pub fn from_reqwest(base: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            base: base.parse()?,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base.join(path)?)
    }

    /// Submit a status report. Returns whether the identity was new.
    pub async fn submit_report(&self, report: &StatusReport) -> Result<ReportAck, Error> {
        let resp = self
            .http
            .post(self.endpoint("/report")?)
            .json(report)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Pull the full snapshot, most recently mutated first.
    pub async fn fetch_snapshot(&self) -> Result<Vec<WireEntry>, Error> {
        let resp = self.http.get(self.base.clone()).send().await?;
        read_json(resp).await
    }

    /// Pull only the records matching a local address.
    pub async fn fetch_by_address(&self, address: &str) -> Result<Vec<WireEntry>, Error> {
        let mut url = self.endpoint("/devices")?;
        url.query_pairs_mut().append_pair("address", address);
        let resp = self.http.get(url).send().await?;
        read_json(resp).await
    }

    /// Remove the record matching the exact triple.
    pub async fn remove_device(
        &self,
        identity: &str,
        local_address: &str,
        port: u16,
    ) -> Result<(), Error> {
        let resp = self
            .http
            .post(self.endpoint("/remove")?)
            .json(&RemoveRequest {
                identity,
                local_address,
                port,
            })
            .send()
            .await?;
        expect_ok(resp).await
    }

    /// Rename a device identity in place.
    pub async fn rename_device(&self, old_name: &str, new_name: &str) -> Result<(), Error> {
        let resp = self
            .http
            .post(self.endpoint("/update_name")?)
            .json(&RenameRequest { old_name, new_name })
            .send()
            .await?;
        expect_ok(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

async fn expect_ok(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| status.to_string());
    Err(Error::Api {
        message,
        status: status.as_u16(),
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| status.to_string());
        return Err(Error::Api {
            message,
            status: status.as_u16(),
        });
    }
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
