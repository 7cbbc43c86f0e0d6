//! Collector configuration.
//!
//! Configuration is read from TOML using the key names of the sample
//! configuration ([`SAMPLE_CONFIG`]):
//!
//! ```toml
//! total = true
//! perRemote = false
//! remotesAddr = ["192.168.0.10:443"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::RemoteFilter;

/// One-line description of what is collected.
pub const DESCRIPTION: &str =
    "Read metrics about TCP status such as established, time wait etc and UDP sockets counts.";

/// Commented sample configuration.
pub const SAMPLE_CONFIG: &str = r#"
 # Decomment to not collect total metrics
 # total = false

 # Set to true to collect metrics for each remote address separately
 perRemote = false

 # Use to limit metrics collection to listed remote address
 # remotesAddr = [ "192.168.0.10:443" ]

"#;

/// What to emit each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Emit one record with host-wide totals.
    #[serde(rename = "total", alias = "emitTotal")]
    pub emit_total: bool,

    /// Emit one record per remote endpoint.
    #[serde(rename = "perRemote", alias = "emitPerRemote")]
    pub emit_per_remote: bool,

    /// Only count connections to these `address:port` remotes.
    #[serde(
        rename = "remotesAddr",
        alias = "remoteAllowList",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_allow_list: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emit_total: true,
            emit_per_remote: false,
            remote_allow_list: None,
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&contents)
    }

    /// Check the configuration for values that can never match anything.
    pub fn validate(&self) -> Result<()> {
        if let Some(remotes) = &self.remote_allow_list
            && let Some(bad) = remotes.iter().find(|r| !r.contains(':'))
        {
            return Err(Error::Config(format!(
                "remotesAddr entry {:?} is not in address:port form",
                bad
            )));
        }
        Ok(())
    }

    /// Check whether this configuration emits nothing.
    pub fn is_noop(&self) -> bool {
        !self.emit_total && !self.emit_per_remote
    }

    /// Build the filter for this configuration's allow-list.
    pub fn remote_filter(&self) -> RemoteFilter {
        match &self.remote_allow_list {
            Some(remotes) => RemoteFilter::allow_list(remotes.iter().map(String::as_str)),
            None => RemoteFilter::allow_all(),
        }
    }
}
