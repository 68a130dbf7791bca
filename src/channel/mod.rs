//! Socket channel configuration
//!
//! Provides:
//! - The `SocketChannelConfig` contract every stream channel configuration exposes
//! - Opaque option values and their coercions (`OptionValue`, `OptionMap`)
//! - An in-memory real-channel configuration (`DefaultSocketChannelConfig`)
//! - Buffer and pipeline factory handles

mod factory;
mod option;
mod socket;

pub use factory::{BufferFactory, HeapBufferFactory, PipelineFactory};
pub use option::{OptionMap, OptionValue};
pub use socket::{DefaultSocketChannelConfig, PerformancePreferences, SocketOption};

use std::sync::Arc;
use thiserror::Error;

/// Channel configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidArgument { key: String, reason: String },

    #[error("Unrecognized option: {0}")]
    UnrecognizedOption(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration of a stream-socket channel.
///
/// All methods take `&self`: a configuration is shared between the code that
/// manages the connection and the code doing its I/O, so implementations keep
/// every attribute in its own atomic cell.
///
/// `set_option` is the string-keyed entry point used by factory-style channel
/// construction. It returns `Ok(false)` for keys outside the implementation's
/// vocabulary and fails only when a recognized key carries a value that
/// cannot be coerced or is out of range.
pub trait SocketChannelConfig: Send + Sync {
    fn receive_buffer_size(&self) -> i32;
    fn set_receive_buffer_size(&self, size: i32) -> Result<(), ConfigError>;

    fn send_buffer_size(&self) -> i32;
    fn set_send_buffer_size(&self, size: i32) -> Result<(), ConfigError>;

    /// Linger time in seconds, negative when disabled
    fn so_linger(&self) -> i32;
    fn set_so_linger(&self, linger: i32) -> Result<(), ConfigError>;

    fn traffic_class(&self) -> i32;
    fn set_traffic_class(&self, traffic_class: i32) -> Result<(), ConfigError>;

    fn is_keep_alive(&self) -> bool;
    fn set_keep_alive(&self, keep_alive: bool) -> Result<(), ConfigError>;

    fn is_reuse_address(&self) -> bool;
    fn set_reuse_address(&self, reuse_address: bool) -> Result<(), ConfigError>;

    fn is_tcp_no_delay(&self) -> bool;
    fn set_tcp_no_delay(&self, tcp_no_delay: bool) -> Result<(), ConfigError>;

    /// Relative importance of short connection time, low latency and high
    /// bandwidth.
    fn set_performance_preferences(
        &self,
        connection_time: i32,
        latency: i32,
        bandwidth: i32,
    ) -> Result<(), ConfigError>;

    fn connect_timeout_millis(&self) -> i32;
    fn set_connect_timeout_millis(&self, millis: i32) -> Result<(), ConfigError>;

    fn buffer_factory(&self) -> Arc<dyn BufferFactory>;
    fn set_buffer_factory(&self, factory: Arc<dyn BufferFactory>) -> Result<(), ConfigError>;

    fn pipeline_factory(&self) -> Option<Arc<dyn PipelineFactory>>;
    fn set_pipeline_factory(&self, factory: Arc<dyn PipelineFactory>) -> Result<(), ConfigError>;

    /// Set a single option by name. Returns whether the key was recognized.
    fn set_option(&self, key: &str, value: &OptionValue) -> Result<bool, ConfigError>;

    /// Keys accepted by `set_option`
    fn recognized_keys(&self) -> Vec<&'static str>;

    /// Apply every entry of `options` in order.
    ///
    /// Unrecognized keys are skipped; the first failing entry aborts the
    /// remaining ones and its error is returned.
    fn set_options(&self, options: &OptionMap) -> Result<(), ConfigError> {
        for (key, value) in options.iter() {
            self.set_option(key, value)?;
        }
        Ok(())
    }
}
