//! Integration tests for HTTP tunnel channel configuration
//!
//! Tests the option resolution chain end to end:
//! - Delegation to the real channel's configuration first
//! - Local tunnel vocabulary as the fallback
//! - Bulk application from option maps and config files
//! - Concurrent readers and writers

use http_tunnel::channel::{
    BufferFactory, ConfigError, DefaultSocketChannelConfig, HeapBufferFactory, OptionMap,
    OptionValue, PipelineFactory, SocketChannelConfig,
};
use http_tunnel::tls::TlsContext;
use http_tunnel::tunnel::{ApplyPolicy, HttpTunnelingSocketChannelConfig, TunnelChannel};
use http_tunnel::{Config, DEFAULT_SERVER_PATH};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Real-channel configuration that claims `serverPath` as its own option
/// and records every key offered to it.
struct ClaimingConfig {
    inner: DefaultSocketChannelConfig,
    offered: Mutex<Vec<String>>,
    server_path: Mutex<Option<String>>,
}

impl ClaimingConfig {
    fn new() -> Self {
        Self {
            inner: DefaultSocketChannelConfig::new(),
            offered: Mutex::new(Vec::new()),
            server_path: Mutex::new(None),
        }
    }
}

impl SocketChannelConfig for ClaimingConfig {
    fn receive_buffer_size(&self) -> i32 {
        self.inner.receive_buffer_size()
    }
    fn set_receive_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        self.inner.set_receive_buffer_size(size)
    }
    fn send_buffer_size(&self) -> i32 {
        self.inner.send_buffer_size()
    }
    fn set_send_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        self.inner.set_send_buffer_size(size)
    }
    fn so_linger(&self) -> i32 {
        self.inner.so_linger()
    }
    fn set_so_linger(&self, linger: i32) -> Result<(), ConfigError> {
        self.inner.set_so_linger(linger)
    }
    fn traffic_class(&self) -> i32 {
        self.inner.traffic_class()
    }
    fn set_traffic_class(&self, traffic_class: i32) -> Result<(), ConfigError> {
        self.inner.set_traffic_class(traffic_class)
    }
    fn is_keep_alive(&self) -> bool {
        self.inner.is_keep_alive()
    }
    fn set_keep_alive(&self, keep_alive: bool) -> Result<(), ConfigError> {
        self.inner.set_keep_alive(keep_alive)
    }
    fn is_reuse_address(&self) -> bool {
        self.inner.is_reuse_address()
    }
    fn set_reuse_address(&self, reuse_address: bool) -> Result<(), ConfigError> {
        self.inner.set_reuse_address(reuse_address)
    }
    fn is_tcp_no_delay(&self) -> bool {
        self.inner.is_tcp_no_delay()
    }
    fn set_tcp_no_delay(&self, tcp_no_delay: bool) -> Result<(), ConfigError> {
        self.inner.set_tcp_no_delay(tcp_no_delay)
    }
    fn set_performance_preferences(
        &self,
        connection_time: i32,
        latency: i32,
        bandwidth: i32,
    ) -> Result<(), ConfigError> {
        self.inner
            .set_performance_preferences(connection_time, latency, bandwidth)
    }
    fn connect_timeout_millis(&self) -> i32 {
        self.inner.connect_timeout_millis()
    }
    fn set_connect_timeout_millis(&self, millis: i32) -> Result<(), ConfigError> {
        self.inner.set_connect_timeout_millis(millis)
    }
    fn buffer_factory(&self) -> Arc<dyn BufferFactory> {
        self.inner.buffer_factory()
    }
    fn set_buffer_factory(&self, factory: Arc<dyn BufferFactory>) -> Result<(), ConfigError> {
        self.inner.set_buffer_factory(factory)
    }
    fn pipeline_factory(&self) -> Option<Arc<dyn PipelineFactory>> {
        self.inner.pipeline_factory()
    }
    fn set_pipeline_factory(&self, factory: Arc<dyn PipelineFactory>) -> Result<(), ConfigError> {
        self.inner.set_pipeline_factory(factory)
    }

    fn set_option(&self, key: &str, value: &OptionValue) -> Result<bool, ConfigError> {
        self.offered.lock().unwrap().push(key.to_string());
        if key == "serverPath" {
            *self.server_path.lock().unwrap() = Some(value.to_string_value(key)?);
            return Ok(true);
        }
        self.inner.set_option(key, value)
    }

    fn recognized_keys(&self) -> Vec<&'static str> {
        let mut keys = self.inner.recognized_keys();
        keys.push("serverPath");
        keys
    }
}

fn assert_socket_defaults(config: &dyn SocketChannelConfig) {
    let defaults = DefaultSocketChannelConfig::new();

    assert_eq!(config.receive_buffer_size(), defaults.receive_buffer_size());
    assert_eq!(config.send_buffer_size(), defaults.send_buffer_size());
    assert_eq!(config.so_linger(), defaults.so_linger());
    assert_eq!(config.traffic_class(), defaults.traffic_class());
    assert_eq!(config.is_keep_alive(), defaults.is_keep_alive());
    assert_eq!(config.is_reuse_address(), defaults.is_reuse_address());
    assert_eq!(config.is_tcp_no_delay(), defaults.is_tcp_no_delay());
    assert_eq!(config.connect_timeout_millis(), defaults.connect_timeout_millis());
    assert!(config.pipeline_factory().is_none());
}

/// Bulk apply of tunnel options leaves the real channel untouched
#[test]
fn test_bulk_apply_scenario() {
    let real = DefaultSocketChannelConfig::shared();
    let channel = TunnelChannel::new(real.clone());

    let mut options = BTreeMap::new();
    options.insert("serverName".to_string(), OptionValue::from("example.com"));
    options.insert("serverPath".to_string(), OptionValue::from("/tunnel"));
    options.insert("enableSslSessionCreation".to_string(), OptionValue::from("false"));

    channel.config().set_options(&options.into()).unwrap();

    let config = channel.config();
    assert_eq!(config.server_name().as_deref(), Some("example.com"));
    assert_eq!(config.server_path(), "/tunnel");
    assert!(!config.is_enable_ssl_session_creation());

    assert_socket_defaults(config);
    assert_socket_defaults(&*real);
}

/// The real channel gets first refusal even for keys in the tunnel vocabulary
#[test]
fn test_delegation_first_precedence() {
    let real = Arc::new(ClaimingConfig::new());
    let config = HttpTunnelingSocketChannelConfig::new(real.clone());

    assert!(config.set_option("serverPath", &"/claimed".into()).unwrap());
    assert_eq!(config.server_path(), DEFAULT_SERVER_PATH);
    assert_eq!(real.server_path.lock().unwrap().as_deref(), Some("/claimed"));

    assert!(config.set_option("serverName", &"host".into()).unwrap());
    assert_eq!(config.server_name().as_deref(), Some("host"));

    let offered = real.offered.lock().unwrap().clone();
    assert_eq!(offered, vec!["serverPath".to_string(), "serverName".to_string()]);
}

#[test]
fn test_unknown_key_mutates_nothing() {
    let real = DefaultSocketChannelConfig::shared();
    let config = HttpTunnelingSocketChannelConfig::new(real.clone());
    let before = format!("{:?}", config);

    for value in [
        OptionValue::Null,
        OptionValue::from(1),
        OptionValue::from("x"),
        OptionValue::from(TlsContext::with_webpki_roots()),
    ] {
        assert!(!config.set_option("totallyUnknownKey", &value).unwrap());
    }

    assert_eq!(format!("{:?}", config), before);
    assert_socket_defaults(&*real);
}

#[test]
fn test_bulk_apply_in_map_order() {
    let channel = TunnelChannel::with_default_socket();
    let options: OptionMap = [
        ("serverPath", OptionValue::from("/x")),
        ("enableSslSessionCreation", OptionValue::from("true")),
        ("serverPath", OptionValue::from("/y")),
    ]
    .into_iter()
    .collect();

    channel.config().set_options(&options).unwrap();

    // a repeated key replaces the earlier value in place
    assert_eq!(channel.config().server_path(), "/y");
    assert!(channel.config().is_enable_ssl_session_creation());
}

#[test]
fn test_bulk_apply_failure_is_visible() {
    let channel = TunnelChannel::with_default_socket();
    let options: OptionMap = [
        ("serverName", OptionValue::from("a.example")),
        ("sendBufferSize", OptionValue::from("not a number")),
        ("serverPath", OptionValue::from("/never")),
    ]
    .into();

    let err = channel.config().set_options(&options).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidArgument { ref key, .. } if key == "sendBufferSize"));
    assert_eq!(channel.config().server_name().as_deref(), Some("a.example"));
    assert_eq!(channel.config().server_path(), DEFAULT_SERVER_PATH);

    let report = channel
        .config()
        .apply_options(&options, ApplyPolicy::BestEffort);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(channel.config().server_path(), "/never");
}

#[test]
fn test_delegated_accessors_pass_through() {
    let real = DefaultSocketChannelConfig::shared();
    let config = HttpTunnelingSocketChannelConfig::new(real.clone());

    config.set_keep_alive(true).unwrap();
    config.set_reuse_address(true).unwrap();
    config.set_so_linger(5).unwrap();
    config.set_traffic_class(0x10).unwrap();
    config.set_connect_timeout_millis(1234).unwrap();
    config.set_performance_preferences(1, 2, 3).unwrap();

    assert!(real.is_keep_alive());
    assert!(real.is_reuse_address());
    assert_eq!(real.so_linger(), 5);
    assert_eq!(real.traffic_class(), 0x10);
    assert_eq!(real.connect_timeout_millis(), 1234);
    assert_eq!(real.performance_preferences().bandwidth, 3);

    // the real channel's validation is surfaced unchanged
    assert_eq!(
        config.set_receive_buffer_size(0),
        real.set_receive_buffer_size(0)
    );

    let heap: Arc<dyn BufferFactory> = Arc::new(HeapBufferFactory);
    config.set_buffer_factory(heap.clone()).unwrap();
    assert!(Arc::ptr_eq(&real.buffer_factory(), &heap));
}

#[test]
fn test_config_file_to_channel() {
    let config = Config::parse(
        r#"
[channel.options]
serverName = "files.example"
enabledSslProtocols = "TLSv1.2, TLSv1.3"
keepAlive = true
"#,
    )
    .unwrap();

    let channel = config
        .tunnel_channel(DefaultSocketChannelConfig::shared())
        .unwrap();

    assert_eq!(
        channel.config().enabled_ssl_protocols(),
        Some(vec!["TLSv1.2".to_string(), "TLSv1.3".to_string()])
    );
    assert!(channel.real_config().is_keep_alive());
}

/// Readers never observe a torn sequence while writers replace it
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access() {
    let config = Arc::new(HttpTunnelingSocketChannelConfig::new(
        DefaultSocketChannelConfig::shared(),
    ));
    let short = vec!["A".to_string()];
    let long = vec!["B".to_string(), "B".to_string(), "B".to_string()];
    let reads = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 0..4 {
        let config = config.clone();
        let short = short.clone();
        let long = long.clone();
        handles.push(tokio::spawn(async move {
            for n in 0..500 {
                let suites = if (n + i) % 2 == 0 { &short } else { &long };
                config.set_enabled_ssl_cipher_suites(Some(suites.as_slice()));
                config.set_server_path(format!("/path-{}", n));
                tokio::task::yield_now().await;
            }
        }));
    }
    for _ in 0..4 {
        let config = config.clone();
        let reads = reads.clone();
        let short = short.clone();
        let long = long.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..500 {
                if let Some(suites) = config.enabled_ssl_cipher_suites() {
                    assert!(suites == short || suites == long, "torn read: {:?}", suites);
                }
                assert!(config.server_path().starts_with('/'));
                reads.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(reads.load(Ordering::Relaxed), 2000);
}
