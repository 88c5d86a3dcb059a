//! Resolved runtime context shared by command handlers.
//!
//! Merges the layered config with CLI flag overrides once, so handlers
//! work with a ready-made client and resolved URLs instead of raw flags.

use url::Url;

use srtwatch_api::{MonitorClient, TransportConfig};
use srtwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub struct Context {
    pub config: Config,
    pub server_url: Url,
    pub transport: TransportConfig,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = match global.config.as_deref() {
            Some(path) => srtwatch_config::load_config_from(path)?,
            None => srtwatch_config::load_config_or_default(),
        };

        let server_url = match global.server.as_deref() {
            Some(raw) => raw.parse().map_err(|_| CliError::Validation {
                field: "server".into(),
                reason: format!("invalid URL: {raw}"),
            })?,
            None => config.observer.server_url()?,
        };

        let transport = TransportConfig::with_timeout(config.observer.timeout());

        Ok(Self {
            config,
            server_url,
            transport,
        })
    }

    pub fn client(&self) -> Result<MonitorClient, CliError> {
        MonitorClient::new(self.server_url.clone(), &self.transport)
            .map_err(|e| CliError::from_api(e, &self.server_url))
    }
}
