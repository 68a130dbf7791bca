//! In-memory socket channel configuration
//!
//! `DefaultSocketChannelConfig` is the configuration of a real (non-tunneled)
//! stream channel. Every attribute lives in its own atomic cell so readers
//! never observe a torn value while another context writes.

use super::{
    BufferFactory, ConfigError, HeapBufferFactory, OptionValue, PipelineFactory,
    SocketChannelConfig,
};
use arc_swap::{ArcSwap, ArcSwapOption};
use socket2::SockRef;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Default socket receive/send buffer size (64 KB)
pub const DEFAULT_BUFFER_SIZE: i32 = 65536;

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MILLIS: i32 = 10_000;

/// Options understood by every socket channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    ReceiveBufferSize,
    SendBufferSize,
    SoLinger,
    TrafficClass,
    KeepAlive,
    ReuseAddress,
    TcpNoDelay,
    ConnectTimeoutMillis,
    BufferFactory,
    PipelineFactory,
}

impl SocketOption {
    /// The complete vocabulary, in documentation order
    pub const ALL: [SocketOption; 10] = [
        Self::ReceiveBufferSize,
        Self::SendBufferSize,
        Self::SoLinger,
        Self::TrafficClass,
        Self::KeepAlive,
        Self::ReuseAddress,
        Self::TcpNoDelay,
        Self::ConnectTimeoutMillis,
        Self::BufferFactory,
        Self::PipelineFactory,
    ];

    /// Option map key
    pub fn key(self) -> &'static str {
        match self {
            Self::ReceiveBufferSize => "receiveBufferSize",
            Self::SendBufferSize => "sendBufferSize",
            Self::SoLinger => "soLinger",
            Self::TrafficClass => "trafficClass",
            Self::KeepAlive => "keepAlive",
            Self::ReuseAddress => "reuseAddress",
            Self::TcpNoDelay => "tcpNoDelay",
            Self::ConnectTimeoutMillis => "connectTimeoutMillis",
            Self::BufferFactory => "bufferFactory",
            Self::PipelineFactory => "pipelineFactory",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|option| option.key() == key)
    }

    /// Coerce `value` and hand it to the matching typed setter of `config`
    pub fn apply<C>(self, config: &C, value: &OptionValue) -> Result<(), ConfigError>
    where
        C: SocketChannelConfig + ?Sized,
    {
        let key = self.key();
        match self {
            Self::ReceiveBufferSize => config.set_receive_buffer_size(value.to_i32(key)?),
            Self::SendBufferSize => config.set_send_buffer_size(value.to_i32(key)?),
            Self::SoLinger => config.set_so_linger(value.to_i32(key)?),
            Self::TrafficClass => config.set_traffic_class(value.to_i32(key)?),
            Self::KeepAlive => config.set_keep_alive(value.to_bool(key)?),
            Self::ReuseAddress => config.set_reuse_address(value.to_bool(key)?),
            Self::TcpNoDelay => config.set_tcp_no_delay(value.to_bool(key)?),
            Self::ConnectTimeoutMillis => config.set_connect_timeout_millis(value.to_i32(key)?),
            Self::BufferFactory => config.set_buffer_factory(value.to_buffer_factory(key)?),
            Self::PipelineFactory => config.set_pipeline_factory(value.to_pipeline_factory(key)?),
        }
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Relative importance of connection time, latency and bandwidth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformancePreferences {
    pub connection_time: i32,
    pub latency: i32,
    pub bandwidth: i32,
}

/// Configuration of a real stream channel
pub struct DefaultSocketChannelConfig {
    receive_buffer_size: AtomicI32,
    send_buffer_size: AtomicI32,
    so_linger: AtomicI32,
    traffic_class: AtomicI32,
    keep_alive: AtomicBool,
    reuse_address: AtomicBool,
    tcp_no_delay: AtomicBool,
    connect_timeout_millis: AtomicI32,
    performance: ArcSwap<PerformancePreferences>,
    buffer_factory: ArcSwap<Arc<dyn BufferFactory>>,
    pipeline_factory: ArcSwapOption<Arc<dyn PipelineFactory>>,
}

impl DefaultSocketChannelConfig {
    /// Create a configuration holding the defaults
    pub fn new() -> Self {
        let heap: Arc<dyn BufferFactory> = Arc::new(HeapBufferFactory);
        Self {
            receive_buffer_size: AtomicI32::new(DEFAULT_BUFFER_SIZE),
            send_buffer_size: AtomicI32::new(DEFAULT_BUFFER_SIZE),
            so_linger: AtomicI32::new(-1),
            traffic_class: AtomicI32::new(0),
            keep_alive: AtomicBool::new(false),
            reuse_address: AtomicBool::new(false),
            tcp_no_delay: AtomicBool::new(true),
            connect_timeout_millis: AtomicI32::new(DEFAULT_CONNECT_TIMEOUT_MILLIS),
            performance: ArcSwap::from_pointee(PerformancePreferences::default()),
            buffer_factory: ArcSwap::from_pointee(heap),
            pipeline_factory: ArcSwapOption::empty(),
        }
    }

    /// Create a shareable configuration with the defaults
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Last value given to `set_performance_preferences`
    pub fn performance_preferences(&self) -> PerformancePreferences {
        **self.performance.load()
    }

    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_millis().max(0) as u64)
    }

    /// Push the options a connected tokio stream supports onto it
    pub fn apply_to(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.is_tcp_no_delay())?;

        let linger = self.so_linger();
        let linger = (linger >= 0).then(|| Duration::from_secs(linger as u64));
        stream.set_linger(linger)?;

        // IP_TOS only exists for IPv4 sockets
        if stream.local_addr()?.is_ipv4() {
            SockRef::from(stream).set_tos(self.traffic_class() as u32)?;
        }

        Ok(())
    }
}

impl Default for DefaultSocketChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DefaultSocketChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSocketChannelConfig")
            .field("receive_buffer_size", &self.receive_buffer_size())
            .field("send_buffer_size", &self.send_buffer_size())
            .field("so_linger", &self.so_linger())
            .field("traffic_class", &self.traffic_class())
            .field("keep_alive", &self.is_keep_alive())
            .field("reuse_address", &self.is_reuse_address())
            .field("tcp_no_delay", &self.is_tcp_no_delay())
            .field("connect_timeout_millis", &self.connect_timeout_millis())
            .field("buffer_factory", &self.buffer_factory())
            .field(
                "pipeline_factory",
                &self.pipeline_factory().map(|p| p.name().to_string()),
            )
            .finish()
    }
}

fn require_positive(key: &str, value: i32) -> Result<i32, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::invalid(key, format!("must be positive, got {}", value)));
    }
    Ok(value)
}

impl SocketChannelConfig for DefaultSocketChannelConfig {
    fn receive_buffer_size(&self) -> i32 {
        self.receive_buffer_size.load(Ordering::Acquire)
    }

    fn set_receive_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        let size = require_positive(SocketOption::ReceiveBufferSize.key(), size)?;
        self.receive_buffer_size.store(size, Ordering::Release);
        Ok(())
    }

    fn send_buffer_size(&self) -> i32 {
        self.send_buffer_size.load(Ordering::Acquire)
    }

    fn set_send_buffer_size(&self, size: i32) -> Result<(), ConfigError> {
        let size = require_positive(SocketOption::SendBufferSize.key(), size)?;
        self.send_buffer_size.store(size, Ordering::Release);
        Ok(())
    }

    fn so_linger(&self) -> i32 {
        self.so_linger.load(Ordering::Acquire)
    }

    fn set_so_linger(&self, linger: i32) -> Result<(), ConfigError> {
        self.so_linger.store(linger, Ordering::Release);
        Ok(())
    }

    fn traffic_class(&self) -> i32 {
        self.traffic_class.load(Ordering::Acquire)
    }

    fn set_traffic_class(&self, traffic_class: i32) -> Result<(), ConfigError> {
        if !(0..=255).contains(&traffic_class) {
            return Err(ConfigError::invalid(
                SocketOption::TrafficClass.key(),
                format!("must be within 0..=255, got {}", traffic_class),
            ));
        }
        self.traffic_class.store(traffic_class, Ordering::Release);
        Ok(())
    }

    fn is_keep_alive(&self) -> bool {
        self.keep_alive.load(Ordering::Acquire)
    }

    fn set_keep_alive(&self, keep_alive: bool) -> Result<(), ConfigError> {
        self.keep_alive.store(keep_alive, Ordering::Release);
        Ok(())
    }

    fn is_reuse_address(&self) -> bool {
        self.reuse_address.load(Ordering::Acquire)
    }

    fn set_reuse_address(&self, reuse_address: bool) -> Result<(), ConfigError> {
        self.reuse_address.store(reuse_address, Ordering::Release);
        Ok(())
    }

    fn is_tcp_no_delay(&self) -> bool {
        self.tcp_no_delay.load(Ordering::Acquire)
    }

    fn set_tcp_no_delay(&self, tcp_no_delay: bool) -> Result<(), ConfigError> {
        self.tcp_no_delay.store(tcp_no_delay, Ordering::Release);
        Ok(())
    }

    fn set_performance_preferences(
        &self,
        connection_time: i32,
        latency: i32,
        bandwidth: i32,
    ) -> Result<(), ConfigError> {
        self.performance.store(Arc::new(PerformancePreferences {
            connection_time,
            latency,
            bandwidth,
        }));
        Ok(())
    }

    fn connect_timeout_millis(&self) -> i32 {
        self.connect_timeout_millis.load(Ordering::Acquire)
    }

    fn set_connect_timeout_millis(&self, millis: i32) -> Result<(), ConfigError> {
        if millis < 0 {
            return Err(ConfigError::invalid(
                SocketOption::ConnectTimeoutMillis.key(),
                format!("must not be negative, got {}", millis),
            ));
        }
        self.connect_timeout_millis.store(millis, Ordering::Release);
        Ok(())
    }

    fn buffer_factory(&self) -> Arc<dyn BufferFactory> {
        let guard = self.buffer_factory.load();
        Arc::clone(&**guard)
    }

    fn set_buffer_factory(&self, factory: Arc<dyn BufferFactory>) -> Result<(), ConfigError> {
        self.buffer_factory.store(Arc::new(factory));
        Ok(())
    }

    fn pipeline_factory(&self) -> Option<Arc<dyn PipelineFactory>> {
        self.pipeline_factory
            .load_full()
            .map(|factory| Arc::clone(&*factory))
    }

    fn set_pipeline_factory(&self, factory: Arc<dyn PipelineFactory>) -> Result<(), ConfigError> {
        self.pipeline_factory.store(Some(Arc::new(factory)));
        Ok(())
    }

    fn set_option(&self, key: &str, value: &OptionValue) -> Result<bool, ConfigError> {
        match SocketOption::from_key(key) {
            Some(option) => {
                option.apply(self, value)?;
                trace!(key, "socket option applied");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn recognized_keys(&self) -> Vec<&'static str> {
        SocketOption::ALL.iter().map(|option| option.key()).collect()
    }
}
