//! Configuration types.

use crate::error::ConfigError;

/// Default buffer for hot signals created through a host config.
const DEFAULT_SIGNAL_CAPACITY: usize = 64;

/// Host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Name used in log spans and error messages.
    pub name: String,
    /// Buffer size of signals created with [`HostConfig::signal`].
    pub signal_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "workflow".to_string(),
            signal_capacity: DEFAULT_SIGNAL_CAPACITY,
        }
    }
}

impl HostConfig {
    /// Create a config with the given host name and default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a config from `WORKFLOW_HOST_NAME` and `WORKFLOW_SIGNAL_CAPACITY`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("WORKFLOW_HOST_NAME") {
            config.name = name;
        }

        if let Ok(raw) = std::env::var("WORKFLOW_SIGNAL_CAPACITY") {
            config.signal_capacity = parse_capacity("WORKFLOW_SIGNAL_CAPACITY", &raw)?;
        }

        Ok(config)
    }

    /// Create a hot signal sized by this config.
    pub fn signal<V: Clone + Send + 'static>(&self) -> crate::reactive::Signal<V> {
        crate::reactive::Signal::with_capacity(self.signal_capacity)
    }
}

fn parse_capacity(key: &str, raw: &str) -> Result<usize, ConfigError> {
    let value: usize = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{e}"),
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "capacity must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
