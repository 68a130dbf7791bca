//! Configuration of a client-side HTTP tunneling channel

use super::{ApplyPolicy, OptionsReport, TunnelOption};
use crate::channel::{
    BufferFactory, ConfigError, OptionMap, OptionValue, PipelineFactory, SocketChannelConfig,
};
use crate::tls::{TlsContext, TlsError};
use crate::DEFAULT_SERVER_PATH;
use arc_swap::{ArcSwap, ArcSwapOption};
use rustls::ClientConfig;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Configuration of a socket channel carried over an HTTP tunnel.
///
/// Socket options are forwarded to the configuration of the real channel
/// beneath the tunnel. The tunnel's own options are stored here:
///
/// | Key | Setter |
/// |---|---|
/// | `serverName` | [`set_server_name`](Self::set_server_name) |
/// | `serverPath` | [`set_server_path`](Self::set_server_path) |
/// | `sslContext` | [`set_ssl_context`](Self::set_ssl_context) |
/// | `enabledSslCipherSuites` | [`set_enabled_ssl_cipher_suites`](Self::set_enabled_ssl_cipher_suites) |
/// | `enabledSslProtocols` | [`set_enabled_ssl_protocols`](Self::set_enabled_ssl_protocols) |
/// | `enableSslSessionCreation` | [`set_enable_ssl_session_creation`](Self::set_enable_ssl_session_creation) |
///
/// `set_option` always offers a key to the real channel first. The tunnel
/// vocabulary is only consulted for keys the real channel does not know.
///
/// Each attribute is stored in its own atomic cell. Reads and writes of one
/// attribute never tear, but a reader may observe any interleaving of the
/// entries of a concurrent `set_options` call.
pub struct HttpTunnelingSocketChannelConfig {
    real: Arc<dyn SocketChannelConfig>,
    server_name: ArcSwapOption<String>,
    server_path: ArcSwap<String>,
    ssl_context: ArcSwapOption<TlsContext>,
    enabled_ssl_cipher_suites: ArcSwapOption<Vec<String>>,
    enabled_ssl_protocols: ArcSwapOption<Vec<String>>,
    enable_ssl_session_creation: AtomicBool,
}

impl HttpTunnelingSocketChannelConfig {
    /// Create a configuration forwarding socket options to `real`
    pub fn new(real: Arc<dyn SocketChannelConfig>) -> Self {
        Self {
            real,
            server_name: ArcSwapOption::empty(),
            server_path: ArcSwap::from_pointee(DEFAULT_SERVER_PATH.to_string()),
            ssl_context: ArcSwapOption::empty(),
            enabled_ssl_cipher_suites: ArcSwapOption::empty(),
            enabled_ssl_protocols: ArcSwapOption::empty(),
            enable_ssl_session_creation: AtomicBool::new(true),
        }
    }

    /// Configuration of the real channel options are forwarded to
    pub fn real_config(&self) -> &Arc<dyn SocketChannelConfig> {
        &self.real
    }

    /// Host name of the HTTP server. If absent, no `Host` header is sent.
    pub fn server_name(&self) -> Option<String> {
        self.server_name.load_full().map(|name| (*name).clone())
    }

    pub fn set_server_name(&self, name: Option<&str>) {
        self.server_name.store(name.map(|n| Arc::new(n.to_string())));
    }

    /// Path the tunnel endpoint is mapped to. Defaults to
    /// [`DEFAULT_SERVER_PATH`].
    pub fn server_path(&self) -> String {
        (**self.server_path.load()).clone()
    }

    /// Replace the tunnel endpoint path. No format check is made.
    pub fn set_server_path(&self, path: impl Into<String>) {
        self.server_path.store(Arc::new(path.into()));
    }

    /// TLS context of the HTTPS connection. If absent, the tunnel is plain text.
    pub fn ssl_context(&self) -> Option<TlsContext> {
        self.ssl_context.load_full().map(|ctx| (*ctx).clone())
    }

    pub fn set_ssl_context(&self, context: Option<TlsContext>) {
        self.ssl_context.store(context.map(Arc::new));
    }

    /// Cipher suites enabled on the TLS connection, `None` for the defaults.
    /// Returns a copy; changing it does not affect the configuration.
    pub fn enabled_ssl_cipher_suites(&self) -> Option<Vec<String>> {
        self.enabled_ssl_cipher_suites
            .load_full()
            .map(|suites| suites.to_vec())
    }

    /// Store a copy of `suites`, or clear the option with `None`.
    pub fn set_enabled_ssl_cipher_suites(&self, suites: Option<&[String]>) {
        self.enabled_ssl_cipher_suites
            .store(suites.map(|s| Arc::new(s.to_vec())));
    }

    /// Protocol versions enabled on the TLS connection, `None` for the
    /// defaults. Returns a copy.
    pub fn enabled_ssl_protocols(&self) -> Option<Vec<String>> {
        self.enabled_ssl_protocols
            .load_full()
            .map(|protocols| protocols.to_vec())
    }

    /// Store a copy of `protocols`, or clear the option with `None`.
    pub fn set_enabled_ssl_protocols(&self, protocols: Option<&[String]>) {
        self.enabled_ssl_protocols
            .store(protocols.map(|p| Arc::new(p.to_vec())));
    }

    /// Whether new TLS sessions may be established
    pub fn is_enable_ssl_session_creation(&self) -> bool {
        self.enable_ssl_session_creation.load(Ordering::Acquire)
    }

    pub fn set_enable_ssl_session_creation(&self, flag: bool) {
        self.enable_ssl_session_creation
            .store(flag, Ordering::Release);
    }

    /// Apply `options` in order under `policy` and report what happened to
    /// each key.
    pub fn apply_options(&self, options: &OptionMap, policy: ApplyPolicy) -> OptionsReport {
        let mut report = OptionsReport::default();

        for (key, value) in options.iter() {
            match self.set_option(key, value) {
                Ok(true) => report.applied.push(key.to_string()),
                Ok(false) => report.unrecognized.push(key.to_string()),
                Err(e) => {
                    report.failed.push((key.to_string(), e));
                    if policy == ApplyPolicy::FailFast {
                        break;
                    }
                }
            }
        }

        debug!(
            applied = report.applied.len(),
            unrecognized = report.unrecognized.len(),
            failed = report.failed.len(),
            ?policy,
            "tunnel options applied"
        );
        report
    }

    /// Client TLS configuration for the next connection, or `None` for a
    /// plain-text tunnel.
    pub fn tls_client_config(&self) -> Result<Option<ClientConfig>, TlsError> {
        let Some(context) = self.ssl_context() else {
            return Ok(None);
        };

        let suites = self.enabled_ssl_cipher_suites();
        let protocols = self.enabled_ssl_protocols();

        context
            .client_config(
                suites.as_deref(),
                protocols.as_deref(),
                self.is_enable_ssl_session_creation(),
            )
            .map(Some)
    }
}

impl fmt::Debug for HttpTunnelingSocketChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTunnelingSocketChannelConfig")
            .field("server_name", &self.server_name())
            .field("server_path", &self.server_path())
            .field("ssl_context", &self.ssl_context())
            .field("enabled_ssl_cipher_suites", &self.enabled_ssl_cipher_suites())
            .field("enabled_ssl_protocols", &self.enabled_ssl_protocols())
            .field(
                "enable_ssl_session_creation",
                &self.is_enable_ssl_session_creation(),
            )
            .finish_non_exhaustive()
    }
}

impl SocketChannelConfig for HttpTunnelingSocketChannelConfig {
    fn receive_buffer_size(&self) -> i32 {
        self.real.receive_buffer_size()
    }

    fn set_receive_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        self.real.set_receive_buffer_size(size)
    }

    fn send_buffer_size(&self) -> i32 {
        self.real.send_buffer_size()
    }

    fn set_send_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        self.real.set_send_buffer_size(size)
    }

    fn so_linger(&self) -> i32 {
        self.real.so_linger()
    }

    fn set_so_linger(&self, linger: i32) -> Result<(), ConfigError> {
        self.real.set_so_linger(linger)
    }

    fn traffic_class(&self) -> i32 {
        self.real.traffic_class()
    }

    fn set_traffic_class(&self, traffic_class: i32) -> Result<(), ConfigError> {
        self.real.set_traffic_class(traffic_class)
    }

    fn is_keep_alive(&self) -> bool {
        self.real.is_keep_alive()
    }

    fn set_keep_alive(&self, keep_alive: bool) -> Result<(), ConfigError> {
        self.real.set_keep_alive(keep_alive)
    }

    fn is_reuse_address(&self) -> bool {
        self.real.is_reuse_address()
    }

    fn set_reuse_address(&self, reuse_address: bool) -> Result<(), ConfigError> {
        self.real.set_reuse_address(reuse_address)
    }

    fn is_tcp_no_delay(&self) -> bool {
        self.real.is_tcp_no_delay()
    }

    fn set_tcp_no_delay(&self, tcp_no_delay: bool) -> Result<(), ConfigError> {
        self.real.set_tcp_no_delay(tcp_no_delay)
    }

    fn set_performance_preferences(
        &self,
        connection_time: i32,
        latency: i32,
        bandwidth: i32,
    ) -> Result<(), ConfigError> {
        self.real
            .set_performance_preferences(connection_time, latency, bandwidth)
    }

    fn connect_timeout_millis(&self) -> i32 {
        self.real.connect_timeout_millis()
    }

    fn set_connect_timeout_millis(&self, millis: i32) -> Result<(), ConfigError> {
        self.real.set_connect_timeout_millis(millis)
    }

    fn buffer_factory(&self) -> Arc<dyn BufferFactory> {
        self.real.buffer_factory()
    }

    fn set_buffer_factory(&self, factory: Arc<dyn BufferFactory>) -> Result<(), ConfigError> {
        self.real.set_buffer_factory(factory)
    }

    fn pipeline_factory(&self) -> Option<Arc<dyn PipelineFactory>> {
        self.real.pipeline_factory()
    }

    fn set_pipeline_factory(&self, factory: Arc<dyn PipelineFactory>) -> Result<(), ConfigError> {
        self.real.set_pipeline_factory(factory)
    }

    fn set_option(&self, key: &str, value: &OptionValue) -> Result<bool, ConfigError> {
        if self.real.set_option(key, value)? {
            trace!(key, "option handled by real channel");
            return Ok(true);
        }

        match TunnelOption::from_key(key) {
            Some(option) => {
                option.apply(self, value)?;
                trace!(key, %option, "tunnel option applied");
                Ok(true)
            }
            None => {
                debug!(key, "unrecognized channel option");
                Ok(false)
            }
        }
    }

    fn recognized_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = TunnelOption::keys().collect();
        for key in self.real.recognized_keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn set_options(&self, options: &OptionMap) -> Result<(), ConfigError> {
        self.apply_options(options, ApplyPolicy::FailFast)
            .into_result()
            .map(|_| ())
    }
}
