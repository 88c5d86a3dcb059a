// ── Inbound status reports ──

use serde::{Deserialize, Serialize};

use super::record::StreamingState;
use crate::error::CoreError;

/// A status tuple reported by a device.
///
/// `identity` falls back to `local_address` when absent; `liveness`
/// defaults to true -- a device that manages to report is, by definition,
/// alive unless it says otherwise (a clean shutdown reports false).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub identity: Option<String>,
    pub local_address: String,
    #[serde(default)]
    pub public_address: Option<String>,
    pub streaming_state: StreamingState,
    pub port: u16,
    #[serde(default)]
    pub liveness: Option<bool>,
}

impl StatusReport {
    /// The canonical store key for this report.
    pub fn identity(&self) -> &str {
        match self.identity.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.local_address,
        }
    }

    pub fn liveness(&self) -> bool {
        self.liveness.unwrap_or(true)
    }

    /// Reject malformed reports before they reach the store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.local_address.trim().is_empty() {
            return Err(CoreError::validation("local_address must not be empty"));
        }
        if self.port == 0 {
            return Err(CoreError::validation("port must be in 1..=65535"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(identity: Option<&str>) -> StatusReport {
        StatusReport {
            identity: identity.map(String::from),
            local_address: "10.0.0.5".into(),
            public_address: None,
            streaming_state: StreamingState::Off,
            port: 9000,
            liveness: None,
        }
    }

    #[test]
    fn identity_falls_back_to_local_address() {
        assert_eq!(report(Some("CAM1")).identity(), "CAM1");
        assert_eq!(report(None).identity(), "10.0.0.5");
        assert_eq!(report(Some("")).identity(), "10.0.0.5");
    }

    #[test]
    fn empty_address_is_rejected() {
        let mut r = report(Some("CAM1"));
        r.local_address = "  ".into();
        assert!(r.validate().is_err());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut r = report(Some("CAM1"));
        r.port = 0;
        assert!(r.validate().is_err());
    }

    #[test]
    fn liveness_defaults_to_true() {
        assert!(report(None).liveness());
    }
}
