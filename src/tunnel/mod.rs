//! HTTP tunnel channel configuration
//!
//! Provides:
//! - The tunnel configuration facade layered over a real channel's configuration
//! - The tunnel option vocabulary
//! - Bulk option application with a selectable failure policy
//! - `TunnelChannel`, binding one facade to one real-channel configuration

mod config;
mod option;

pub use config::HttpTunnelingSocketChannelConfig;
pub use option::TunnelOption;

use crate::channel::{ConfigError, DefaultSocketChannelConfig, OptionMap, SocketChannelConfig};
use std::sync::Arc;

/// How a bulk apply reacts to an entry that fails coercion or validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyPolicy {
    /// Stop at the first failing entry; earlier entries stay applied
    #[default]
    FailFast,
    /// Apply every entry that can be applied and collect the failures
    BestEffort,
}

/// Outcome of a bulk apply, keys listed in application order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsReport {
    pub applied: Vec<String>,
    pub unrecognized: Vec<String>,
    pub failed: Vec<(String, ConfigError)>,
}

impl OptionsReport {
    /// True when every entry was recognized and applied
    pub fn is_complete(&self) -> bool {
        self.unrecognized.is_empty() && self.failed.is_empty()
    }

    /// The first failure as an error, otherwise the report
    pub fn into_result(mut self) -> Result<Self, ConfigError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(self.failed.swap_remove(0).1)
        }
    }

    /// Fail on the first failure, then on the first unrecognized key
    pub fn require_recognized(self) -> Result<Self, ConfigError> {
        let report = self.into_result()?;
        match report.unrecognized.first() {
            Some(key) => Err(ConfigError::UnrecognizedOption(key.clone())),
            None => Ok(report),
        }
    }
}

/// A tunneled channel's configuration surface.
///
/// Owns the real channel's configuration and the tunnel configuration that
/// forwards to it; the binding is fixed at construction.
pub struct TunnelChannel {
    config: HttpTunnelingSocketChannelConfig,
}

impl TunnelChannel {
    /// Bind a new tunnel configuration to `real_config`
    pub fn new(real_config: Arc<dyn SocketChannelConfig>) -> Self {
        Self {
            config: HttpTunnelingSocketChannelConfig::new(real_config),
        }
    }

    /// Bind to a fresh real-channel configuration holding the defaults
    pub fn with_default_socket() -> Self {
        Self::new(DefaultSocketChannelConfig::shared())
    }

    /// Bind to `real_config` and apply `options`, as a channel factory does
    pub fn with_options(
        real_config: Arc<dyn SocketChannelConfig>,
        options: &OptionMap,
    ) -> Result<Self, ConfigError> {
        let channel = Self::new(real_config);
        channel.config.set_options(options)?;
        Ok(channel)
    }

    pub fn config(&self) -> &HttpTunnelingSocketChannelConfig {
        &self.config
    }

    pub fn real_config(&self) -> &Arc<dyn SocketChannelConfig> {
        self.config.real_config()
    }
}
