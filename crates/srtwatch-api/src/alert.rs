//! Outbound alert webhook.
//!
//! Formats change notifications into the one-line-per-device text block
//! the ops channel expects and delivers it as a `{"content": ...}` JSON
//! payload. Delivery is fire-and-forget from the observer's point of
//! view: a failed send is logged and the next change tries again.

use chrono::{DateTime, Utc};
use url::Url;

use srtwatch_core::NormalizedEntry;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── AlertMessage ─────────────────────────────────────────────────────

/// A formatted alert payload, one line per device under a title line.
///
/// ```text
/// === STATUS CHANGED - 29/08/2026 10:15:00 ===
/// [PREFIX][CAM1] SRT ON | IPWAN: 203.0.113.5 | PORT: 9001
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    content: String,
}

impl AlertMessage {
    /// Alert for entries whose status or public address changed.
    pub fn status_changed(prefix: &str, entries: &[NormalizedEntry], at: DateTime<Utc>) -> Self {
        Self::build("STATUS CHANGED", prefix, entries, at)
    }

    /// Alert carrying the full current list, sent when broadcasting starts.
    pub fn full_list(prefix: &str, entries: &[NormalizedEntry], at: DateTime<Utc>) -> Self {
        Self::build("FULL STATUS LIST", prefix, entries, at)
    }

    fn build(title: &str, prefix: &str, entries: &[NormalizedEntry], at: DateTime<Utc>) -> Self {
        let mut lines = Vec::with_capacity(entries.len() + 1);
        lines.push(format!("=== {title} - {} ===", at.format("%d/%m/%Y %H:%M:%S")));
        for entry in entries {
            lines.push(device_line(prefix, entry));
        }
        Self {
            content: lines.join("\n"),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

fn device_line(prefix: &str, entry: &NormalizedEntry) -> String {
    format!(
        "[{prefix}][{}] SRT {} | IPWAN: {} | PORT: {}",
        entry.identity,
        entry.streaming,
        entry.public_address.as_deref().unwrap_or(""),
        entry.port,
    )
}

// ── AlertSink ────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Webhook delivery target for [`AlertMessage`]s.
#[derive(Debug, Clone)]
pub struct AlertSink {
    webhook: Url,
    http: reqwest::Client,
}

impl AlertSink {
    pub fn new(webhook: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            webhook,
            http: transport.build_client()?,
        })
    }

    /// Build from an existing `reqwest::Client` (used in tests).
    pub fn from_reqwest(webhook: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            webhook: webhook.parse()?,
            http,
        })
    }

    /// Deliver one alert. Any 2xx response counts as accepted.
    pub async fn send(&self, message: &AlertMessage) -> Result<(), Error> {
        let resp = self
            .http
            .post(self.webhook.clone())
            .json(&WebhookPayload {
                content: message.content(),
            })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "alert delivered");
            Ok(())
        } else {
            Err(Error::AlertRejected {
                status: status.as_u16(),
            })
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
