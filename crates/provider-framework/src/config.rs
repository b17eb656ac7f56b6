//! Provider-level options.

use crate::error::ConfigError;
use std::time::Duration;

/// Environment variable holding the per-operation deadline in seconds.
pub const OPERATION_TIMEOUT_ENV: &str = "XYZ_OPERATION_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Package name used in the exported schema.
    pub name: String,
    /// Reported by `get_plugin_info` and the exported schema.
    pub version: String,
    /// Deadline for each Create/Read/Update/Delete; `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl ProviderOptions {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            operation_timeout: None,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Builds options, reading the operation deadline from
    /// [`OPERATION_TIMEOUT_ENV`] when it is set.
    pub fn from_env(name: impl Into<String>, version: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = std::env::var(OPERATION_TIMEOUT_ENV).ok();
        Ok(Self {
            operation_timeout: parse_timeout(raw.as_deref())?,
            ..Self::new(name, version)
        })
    }
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(ConfigError::InvalidValue {
            var: OPERATION_TIMEOUT_ENV,
            value: raw.to_string(),
        }),
    }
}
