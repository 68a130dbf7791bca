//! Tunnel option vocabulary
//!
//! The keys a tunnel configuration resolves locally once the real channel
//! has declined them. Lookup goes through a key table so the vocabulary can
//! be enumerated and tested as data.

use super::HttpTunnelingSocketChannelConfig;
use crate::channel::{ConfigError, OptionValue};
use std::fmt;

/// Options stored by the tunnel configuration itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelOption {
    /// Host name sent in the `Host` header
    ServerName,
    /// Path the tunnel endpoint is mapped to
    ServerPath,
    /// TLS context; absent means a plain-text tunnel
    SslContext,
    EnabledSslCipherSuites,
    EnabledSslProtocols,
    EnableSslSessionCreation,
}

/// Key table: canonical keys first, then accepted aliases
const KEYS: [(&str, TunnelOption); 10] = [
    ("serverName", TunnelOption::ServerName),
    ("serverPath", TunnelOption::ServerPath),
    ("sslContext", TunnelOption::SslContext),
    ("enabledSslCipherSuites", TunnelOption::EnabledSslCipherSuites),
    ("enabledSslProtocols", TunnelOption::EnabledSslProtocols),
    ("enableSslSessionCreation", TunnelOption::EnableSslSessionCreation),
    ("tlsContext", TunnelOption::SslContext),
    ("enabledCipherSuites", TunnelOption::EnabledSslCipherSuites),
    ("enabledProtocols", TunnelOption::EnabledSslProtocols),
    ("allowSessionCreation", TunnelOption::EnableSslSessionCreation),
];

impl TunnelOption {
    pub const ALL: [TunnelOption; 6] = [
        Self::ServerName,
        Self::ServerPath,
        Self::SslContext,
        Self::EnabledSslCipherSuites,
        Self::EnabledSslProtocols,
        Self::EnableSslSessionCreation,
    ];

    /// Canonical option map key
    pub fn key(self) -> &'static str {
        match self {
            Self::ServerName => "serverName",
            Self::ServerPath => "serverPath",
            Self::SslContext => "sslContext",
            Self::EnabledSslCipherSuites => "enabledSslCipherSuites",
            Self::EnabledSslProtocols => "enabledSslProtocols",
            Self::EnableSslSessionCreation => "enableSslSessionCreation",
        }
    }

    /// Exact, case-sensitive lookup of a canonical key or alias
    pub fn from_key(key: &str) -> Option<Self> {
        KEYS.iter()
            .find(|(known, _)| *known == key)
            .map(|(_, option)| *option)
    }

    /// Every key `from_key` accepts
    pub fn keys() -> impl Iterator<Item = &'static str> {
        KEYS.iter().map(|(key, _)| *key)
    }

    /// Coerce `value` and hand it to the matching typed setter
    pub fn apply(
        self,
        config: &HttpTunnelingSocketChannelConfig,
        value: &OptionValue,
    ) -> Result<(), ConfigError> {
        let key = self.key();
        match self {
            Self::ServerName => {
                config.set_server_name(value.to_optional_string(key)?.as_deref());
            }
            Self::ServerPath => {
                if value.is_null() {
                    return Err(ConfigError::invalid(key, "must not be null"));
                }
                config.set_server_path(value.to_string_value(key)?);
            }
            Self::SslContext => config.set_ssl_context(value.to_tls_context(key)?),
            Self::EnabledSslCipherSuites => {
                config.set_enabled_ssl_cipher_suites(value.to_string_list(key)?.as_deref());
            }
            Self::EnabledSslProtocols => {
                config.set_enabled_ssl_protocols(value.to_string_list(key)?.as_deref());
            }
            Self::EnableSslSessionCreation => {
                config.set_enable_ssl_session_creation(value.to_bool(key)?);
            }
        }
        Ok(())
    }
}

impl fmt::Display for TunnelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
