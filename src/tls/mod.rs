//! TLS context for HTTPS tunnels
//!
//! A `TlsContext` is the opaque handle stored in a tunnel configuration.
//! When a tunnel connects over HTTPS it derives a per-connection rustls
//! `ClientConfig` from the context plus the tunnel's enabled cipher suites,
//! enabled protocol versions and session creation policy.

use rustls::client::Resumption;
use rustls::crypto::ring as ring_provider;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore, SupportedCipherSuite, SupportedProtocolVersion};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// ALPN advertised by default; tunnel requests are plain HTTP/1.1
pub const DEFAULT_ALPN: &[u8] = b"http/1.1";

/// Protocol version names accepted in the enabled-protocols option
static PROTOCOLS: [(&str, &SupportedProtocolVersion); 2] = [
    ("TLSv1.2", &rustls::version::TLS12),
    ("TLSv1.3", &rustls::version::TLS13),
];

/// TLS configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TlsError {
    #[error("Unknown cipher suite: {0}")]
    UnknownCipherSuite(String),

    #[error("Unknown protocol version: {0}")]
    UnknownProtocol(String),

    #[error("No cipher suites enabled")]
    NoCipherSuites,

    #[error("No protocol versions enabled")]
    NoProtocols,

    #[error("TLS configuration error: {0}")]
    Config(String),
}

struct Inner {
    roots: Arc<RootCertStore>,
    provider: CryptoProvider,
    alpn_protocols: Vec<Vec<u8>>,
}

/// Shared TLS context handle.
///
/// Cloning is cheap. Two handles are equal only when they refer to the same
/// context.
#[derive(Clone)]
pub struct TlsContext {
    inner: Arc<Inner>,
}

impl TlsContext {
    /// Create a context trusting `roots`
    pub fn new(roots: RootCertStore) -> Self {
        Self::with_alpn(roots, vec![DEFAULT_ALPN.to_vec()])
    }

    /// Create a context trusting `roots` and advertising `alpn_protocols`
    pub fn with_alpn(roots: RootCertStore, alpn_protocols: Vec<Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                roots: Arc::new(roots),
                provider: ring_provider::default_provider(),
                alpn_protocols,
            }),
        }
    }

    /// Create a context trusting the Mozilla root program
    pub fn with_webpki_roots() -> Self {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Self::new(roots)
    }

    /// Number of trust anchors
    pub fn root_count(&self) -> usize {
        self.inner.roots.len()
    }

    pub fn alpn_protocols(&self) -> &[Vec<u8>] {
        &self.inner.alpn_protocols
    }

    /// Names accepted in the enabled cipher suites option, in provider order
    pub fn supported_cipher_suites(&self) -> Vec<String> {
        self.inner
            .provider
            .cipher_suites
            .iter()
            .map(suite_name)
            .collect()
    }

    /// Names accepted in the enabled protocols option
    pub fn supported_protocols() -> Vec<&'static str> {
        PROTOCOLS.iter().map(|(name, _)| *name).collect()
    }

    /// Derive a client configuration for one connection.
    ///
    /// `None` selects the provider's defaults. Cipher suites keep the order
    /// they are given in. Disabling session creation turns resumption off.
    pub fn client_config(
        &self,
        cipher_suites: Option<&[String]>,
        protocols: Option<&[String]>,
        session_creation: bool,
    ) -> Result<ClientConfig, TlsError> {
        let mut provider = self.inner.provider.clone();
        if let Some(names) = cipher_suites {
            provider.cipher_suites = select_cipher_suites(&self.inner.provider, names)?;
        }

        let versions = match protocols {
            Some(names) => select_protocols(names)?,
            None => PROTOCOLS.iter().map(|(_, version)| *version).collect(),
        };

        let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&versions)
            .map_err(|e| TlsError::Config(e.to_string()))?
            .with_root_certificates(Arc::clone(&self.inner.roots))
            .with_no_client_auth();

        config.alpn_protocols = self.inner.alpn_protocols.clone();

        if !session_creation {
            config.resumption = Resumption::disabled();
        }

        Ok(config)
    }
}

impl PartialEq for TlsContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TlsContext {}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alpn: Vec<String> = self
            .inner
            .alpn_protocols
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect();

        f.debug_struct("TlsContext")
            .field("roots", &self.root_count())
            .field("alpn", &alpn)
            .finish()
    }
}

fn suite_name(suite: &SupportedCipherSuite) -> String {
    format!("{:?}", suite.suite())
}

fn select_cipher_suites(
    provider: &CryptoProvider,
    names: &[String],
) -> Result<Vec<SupportedCipherSuite>, TlsError> {
    let selected = names
        .iter()
        .map(|name| {
            provider
                .cipher_suites
                .iter()
                .find(|suite| suite_name(suite) == *name)
                .copied()
                .ok_or_else(|| TlsError::UnknownCipherSuite(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if selected.is_empty() {
        return Err(TlsError::NoCipherSuites);
    }
    Ok(selected)
}

fn select_protocols(names: &[String]) -> Result<Vec<&'static SupportedProtocolVersion>, TlsError> {
    let selected = names
        .iter()
        .map(|name| {
            PROTOCOLS
                .iter()
                .find(|(known, _)| known == name)
                .map(|(_, version)| *version)
                .ok_or_else(|| TlsError::UnknownProtocol(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if selected.is_empty() {
        return Err(TlsError::NoProtocols);
    }
    Ok(selected)
}
