//! # HTTP Tunnel
//!
//! Configuration surface for socket channels whose bytes travel over an
//! HTTP tunnel (for crossing HTTP-only proxies and firewalls).
//!
//! A tunneled channel looks like an ordinary stream socket to its callers.
//! Its configuration therefore has two tiers:
//!
//! - **Socket options** (buffer sizes, linger, no-delay, ...) are owned by the
//!   real channel underneath the tunnel and are forwarded to it verbatim.
//! - **Tunnel options** (HTTP server name, tunnel endpoint path, TLS context,
//!   cipher suites, protocol versions, session creation) are stored locally.
//!
//! ## Option resolution
//!
//! ```text
//! set_option(key, value)
//!        │
//!        ▼
//! ┌──────────────────────────┐  recognized   ┌──────────┐
//! │ real channel set_option  │──────────────▶│  true    │
//! └──────────────────────────┘               └──────────┘
//!        │ not recognized
//!        ▼
//! ┌──────────────────────────┐  match        ┌──────────────────────┐
//! │ tunnel vocabulary lookup │──────────────▶│ coerce, apply, true  │
//! └──────────────────────────┘               └──────────────────────┘
//!        │ no match
//!        ▼
//!      false
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use http_tunnel::channel::{OptionMap, OptionValue, SocketChannelConfig};
//! use http_tunnel::tunnel::TunnelChannel;
//!
//! let channel = TunnelChannel::with_default_socket();
//! let config = channel.config();
//!
//! let options = OptionMap::from([
//!     ("serverName", OptionValue::from("example.com")),
//!     ("serverPath", OptionValue::from("/tunnel")),
//!     ("tcpNoDelay", OptionValue::from(true)),
//! ]);
//! config.set_options(&options).unwrap();
//!
//! assert_eq!(config.server_path(), "/tunnel");
//! ```

pub mod channel;
pub mod config;
pub mod tls;
pub mod tunnel;

pub use channel::{ConfigError, OptionValue, SocketChannelConfig};
pub use config::Config;
pub use tunnel::{HttpTunnelingSocketChannelConfig, TunnelChannel};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path the tunnel endpoint is mapped to unless configured otherwise
pub const DEFAULT_SERVER_PATH: &str = "/netty-tunnel";

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel configuration error: {0}")]
    Channel(#[from] channel::ConfigError),

    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),

    #[error("Configuration error: {0}")]
    Config(String),
}
