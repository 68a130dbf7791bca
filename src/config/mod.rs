//! Configuration management

use crate::channel::{ConfigError, OptionMap, OptionValue, SocketChannelConfig};
use crate::tunnel::TunnelChannel;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Channel options
    #[serde(default)]
    pub channel: ChannelSection,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, crate::Error> {
        toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| crate::Error::Config(format!("Failed to write config: {}", e)))
    }

    /// Build a tunnel channel over `real_config` with the configured options
    pub fn tunnel_channel(
        &self,
        real_config: Arc<dyn SocketChannelConfig>,
    ) -> Result<TunnelChannel, crate::Error> {
        let options = self.channel.option_map()?;
        Ok(TunnelChannel::with_options(real_config, &options)?)
    }
}

/// `[channel]` section: option keys and values, applied in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSection {
    #[serde(default)]
    pub options: toml::Table,
}

impl ChannelSection {
    /// Convert the TOML option table into an option map.
    ///
    /// Strings, booleans, integers and arrays of strings are supported.
    pub fn option_map(&self) -> Result<OptionMap, ConfigError> {
        let mut map = OptionMap::new();
        for (key, value) in &self.options {
            map.insert(key.as_str(), option_value(key, value)?);
        }
        Ok(map)
    }
}

fn option_value(key: &str, value: &toml::Value) -> Result<OptionValue, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(OptionValue::Str(s.clone())),
        toml::Value::Boolean(b) => Ok(OptionValue::Bool(*b)),
        toml::Value::Integer(i) => Ok(OptionValue::Int(*i)),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s.clone()),
                other => Err(ConfigError::invalid(
                    key,
                    format!("list items must be strings, got {}", other.type_str()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(OptionValue::StrList),
        other => Err(ConfigError::invalid(
            key,
            format!("unsupported value type {}", other.type_str()),
        )),
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: String,
    /// Log file path (optional)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Install the global tracing subscriber described by `config`
pub fn init_logging(config: &LoggingConfig) -> Result<(), crate::Error> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| crate::Error::Config(format!("Invalid log level: {}", e)))?;

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(config.file.is_none());

    let result = match config.format.as_str() {
        "pretty" => builder.pretty().try_init(),
        "compact" => builder.compact().try_init(),
        "json" => builder.json().try_init(),
        other => {
            return Err(crate::Error::Config(format!("Unknown log format: {}", other)));
        }
    };

    result.map_err(|e| crate::Error::Config(format!("Failed to install logger: {}", e)))
}

/// Generate example configuration
pub fn generate_example_config() -> Config {
    let mut options = toml::Table::new();
    options.insert("serverName".into(), "tunnel.example.com".into());
    options.insert("serverPath".into(), crate::DEFAULT_SERVER_PATH.into());
    options.insert("enableSslSessionCreation".into(), true.into());
    options.insert(
        "enabledSslProtocols".into(),
        toml::Value::Array(vec!["TLSv1.3".into()]),
    );
    options.insert("connectTimeoutMillis".into(), 10_000.into());

    Config {
        channel: ChannelSection { options },
        logging: LoggingConfig::default(),
    }
}
