//! Secure session context
//!
//! A [`ServerConfig`] is the reusable TLS context for a listener: protocol
//! version bounds, identity material (certificate and private key files),
//! trust anchors (CA file), verification depth and the peer trust policy.
//! It is built once, is immutable afterwards, and is shared read-only by
//! every accepted connection.
//!
//! File loading happens at [`ServerConfigBuilder::build`] in a fixed order:
//! certificate, CA (which also sets the verification depth), private key.
//! The first failure is fatal for the whole build; nothing later is
//! attempted. An empty or unset path skips that step without error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use openssl::ssl::{
    SslContext, SslContextBuilder, SslFiletype, SslMethod, SslVerifyMode, SslVersion,
};

use super::cert::CertInfo;
use super::error::TlsError;
use super::Result;
use crate::logger::Logger;

const COMPONENT: &str = "ServerConfig";

/// Default peer verification depth applied when a CA file is configured.
pub const DEFAULT_VERIFY_DEPTH: u32 = 1;

/// TLS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Parse a TLS version from a string (case-insensitive).
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TLSV1.0" | "TLS1.0" | "TLSV1" | "TLS1" => Ok(TlsVersion::Tls10),
            "TLSV1.1" | "TLS1.1" => Ok(TlsVersion::Tls11),
            "TLSV1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(TlsError::InvalidVersion(s.to_string())),
        }
    }

    /// Map to the engine's protocol version constant.
    pub fn to_openssl_version(&self) -> SslVersion {
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Version as a display string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLSv1.0",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

/// Client certificate verification mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientVerify {
    /// Don't request a client certificate.
    None,
    /// Request a client certificate but don't require it.
    Optional,
    /// Require a client certificate; the handshake fails without one.
    Required,
}

/// Callback deciding whether a peer certificate is acceptable.
///
/// Receives the engine's chain preverification result and a summary of the
/// certificate under inspection; returns true to accept.
pub type VerifyCallback = Arc<dyn Fn(bool, Option<&CertInfo>) -> bool + Send + Sync>;

/// Peer trust decision policy.
///
/// The production default is [`TrustPolicy::Strict`]: the engine's chain
/// verification against the configured CA is authoritative.
#[derive(Clone)]
pub enum TrustPolicy {
    /// The engine's verification result stands.
    Strict,
    /// Accept any presented certificate, valid or not. This defeats peer
    /// authentication entirely and exists for tests against throwaway
    /// certificates; it must never ship as a production default.
    AcceptAny,
    /// Caller-supplied decision.
    Custom(VerifyCallback),
}

impl TrustPolicy {
    /// Build a custom policy from a closure.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(bool, Option<&CertInfo>) -> bool + Send + Sync + 'static,
    {
        TrustPolicy::Custom(Arc::new(f))
    }
}

impl fmt::Debug for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustPolicy::Strict => f.write_str("Strict"),
            TrustPolicy::AcceptAny => f.write_str("AcceptAny"),
            TrustPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Immutable secure session context, shared across accepted connections.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) ctx: SslContext,
    version_min: TlsVersion,
    version_max: TlsVersion,
    verify_depth: Option<u32>,
}

impl ServerConfig {
    /// Start building a context pinned to one protocol version.
    pub fn builder(version: TlsVersion) -> ServerConfigBuilder {
        ServerConfigBuilder::new(version, version)
    }

    /// Start building a context that negotiates within a version range.
    pub fn builder_range(min: TlsVersion, max: TlsVersion) -> ServerConfigBuilder {
        ServerConfigBuilder::new(min, max)
    }

    /// Minimum protocol version the context accepts.
    pub fn version_min(&self) -> TlsVersion {
        self.version_min
    }

    /// Maximum protocol version the context accepts.
    pub fn version_max(&self) -> TlsVersion {
        self.version_max
    }

    /// Effective peer verification depth.
    ///
    /// `None` when no CA file was configured; the depth is only ever set
    /// together with trust anchors.
    pub fn verify_depth(&self) -> Option<u32> {
        self.verify_depth
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("version_min", &self.version_min)
            .field("version_max", &self.version_max)
            .field("verify_depth", &self.verify_depth)
            .finish()
    }
}

/// Builder for [`ServerConfig`].
pub struct ServerConfigBuilder {
    version_min: TlsVersion,
    version_max: TlsVersion,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    ca_file: Option<PathBuf>,
    verify_depth: u32,
    client_verify: ClientVerify,
    trust: TrustPolicy,
    logger: Logger,
}

impl ServerConfigBuilder {
    fn new(min: TlsVersion, max: TlsVersion) -> Self {
        ServerConfigBuilder {
            version_min: min,
            version_max: max,
            cert_file: None,
            key_file: None,
            ca_file: None,
            verify_depth: DEFAULT_VERIFY_DEPTH,
            client_verify: ClientVerify::None,
            trust: TrustPolicy::Strict,
            logger: Logger::disabled(),
        }
    }

    /// Server certificate file (PEM). An empty path skips the step.
    pub fn cert_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cert_file = non_empty(path);
        self
    }

    /// Server private key file (PEM). An empty path skips the step.
    pub fn key_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.key_file = non_empty(path);
        self
    }

    /// CA / trust-anchor file for peer verification. An empty path skips
    /// the step; configuring one also sets the verification depth.
    pub fn ca_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ca_file = non_empty(path);
        self
    }

    /// Override the peer verification depth (default 1). Only takes effect
    /// when a CA file is configured, and must be positive.
    pub fn verify_depth(mut self, depth: u32) -> Self {
        self.verify_depth = depth;
        self
    }

    /// Whether to request or require a client certificate.
    pub fn client_verify(mut self, mode: ClientVerify) -> Self {
        self.client_verify = mode;
        self
    }

    /// Install the peer trust policy.
    pub fn trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.trust = policy;
        self
    }

    /// Diagnostics sink used while building.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Build the context.
    ///
    /// Loads, in order: certificate, CA file (then verification depth),
    /// private key. The first failure is logged and fatal. When both a
    /// certificate and a key were loaded, verifies they match.
    pub fn build(self) -> Result<ServerConfig> {
        let log = &self.logger;

        let mut ctx = match SslContextBuilder::new(SslMethod::tls_server()) {
            Ok(builder) => builder,
            Err(e) => {
                log.error(COMPONENT, "SSL CTX failed.");
                return Err(TlsError::OpenSsl(e));
            }
        };

        ctx.set_min_proto_version(Some(self.version_min.to_openssl_version()))?;
        ctx.set_max_proto_version(Some(self.version_max.to_openssl_version()))?;

        install_trust_policy(&mut ctx, self.client_verify, &self.trust);

        if let Some(path) = &self.cert_file {
            if let Err(e) = ctx.set_certificate_file(path, SslFiletype::PEM) {
                log.error(COMPONENT, "Loading cert file failed.");
                return Err(TlsError::Certificate(format!("{}: {}", path.display(), e)));
            }
        }

        let verify_depth = if let Some(path) = &self.ca_file {
            if let Err(e) = ctx.set_ca_file(path) {
                log.error(COMPONENT, "Loading CA file failed.");
                return Err(TlsError::CaFile(format!("{}: {}", path.display(), e)));
            }
            // Trust anchors without a positive depth would make every chain
            // fail verification.
            let depth = self.verify_depth.max(1);
            ctx.set_verify_depth(depth);
            Some(depth)
        } else {
            None
        };

        if let Some(path) = &self.key_file {
            if let Err(e) = ctx.set_private_key_file(path, SslFiletype::PEM) {
                log.error(COMPONENT, "Loading key file failed.");
                return Err(TlsError::PrivateKey(format!("{}: {}", path.display(), e)));
            }

            if self.cert_file.is_some() {
                if let Err(e) = ctx.check_private_key() {
                    log.error(COMPONENT, "Private key does not match the certificate.");
                    return Err(TlsError::PrivateKey(format!(
                        "key does not match certificate: {}",
                        e
                    )));
                }
            }
        }

        Ok(ServerConfig {
            ctx: ctx.build(),
            version_min: self.version_min,
            version_max: self.version_max,
            verify_depth,
        })
    }
}

fn install_trust_policy(ctx: &mut SslContextBuilder, mode: ClientVerify, trust: &TrustPolicy) {
    let verify_mode = match mode {
        ClientVerify::None => SslVerifyMode::NONE,
        ClientVerify::Optional => SslVerifyMode::PEER,
        ClientVerify::Required => SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
    };

    match trust {
        TrustPolicy::Strict => ctx.set_verify(verify_mode),
        TrustPolicy::AcceptAny => {
            ctx.set_verify_callback(verify_mode, |_preverified, _store| true);
        }
        TrustPolicy::Custom(callback) => {
            let callback = Arc::clone(callback);
            ctx.set_verify_callback(verify_mode, move |preverified, store| {
                let info = store.current_cert().map(CertInfo::from_x509_ref);
                callback(preverified, info.as_ref())
            });
        }
    }
}

fn non_empty<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_version_parsing() {
        assert_eq!(TlsVersion::from_str("TLSv1.2").unwrap(), TlsVersion::Tls12);
        assert_eq!(TlsVersion::from_str("tlsv1.3").unwrap(), TlsVersion::Tls13);
        assert_eq!(TlsVersion::from_str("TLS1.0").unwrap(), TlsVersion::Tls10);
        assert_eq!(TlsVersion::from_str("TLS1.1").unwrap(), TlsVersion::Tls11);
        assert!(TlsVersion::from_str("sslv3").is_err());
        assert!(TlsVersion::from_str("invalid").is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(TlsVersion::Tls10 < TlsVersion::Tls13);
        assert_eq!(TlsVersion::Tls12.as_str(), "TLSv1.2");
    }

    #[test]
    fn test_build_without_identity_material() {
        // No cert, no key, no CA: every loading step is skipped and the
        // context still builds. Handshakes against clients that require
        // server authentication will fail later, at handshake time.
        let config = ServerConfig::builder(TlsVersion::Tls12).build().unwrap();
        assert_eq!(config.verify_depth(), None);
        assert_eq!(config.version_min(), TlsVersion::Tls12);
        assert_eq!(config.version_max(), TlsVersion::Tls12);
    }

    #[test]
    fn test_empty_paths_are_skipped() {
        let config = ServerConfig::builder(TlsVersion::Tls12)
            .cert_file("")
            .key_file("")
            .ca_file("")
            .build()
            .unwrap();
        // An empty CA path means the depth is never set.
        assert_eq!(config.verify_depth(), None);
    }

    #[test]
    fn test_version_range_builder() {
        let config = ServerConfig::builder_range(TlsVersion::Tls12, TlsVersion::Tls13)
            .build()
            .unwrap();
        assert_eq!(config.version_min(), TlsVersion::Tls12);
        assert_eq!(config.version_max(), TlsVersion::Tls13);
    }

    #[test]
    fn test_missing_cert_file_is_fatal() {
        let err = ServerConfig::builder(TlsVersion::Tls12)
            .cert_file("/nonexistent/cert.pem")
            .build()
            .unwrap_err();
        assert!(matches!(err, TlsError::Certificate(_)));
    }

    #[test]
    fn test_missing_key_file_is_fatal() {
        let err = ServerConfig::builder(TlsVersion::Tls12)
            .key_file("/nonexistent/key.pem")
            .build()
            .unwrap_err();
        assert!(matches!(err, TlsError::PrivateKey(_)));
    }

    #[test]
    fn test_missing_ca_file_is_fatal_and_logged() {
        use std::sync::Mutex;

        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);

        let err = ServerConfig::builder(TlsVersion::Tls12)
            .ca_file("/nonexistent/ca.pem")
            .logger(Logger::new(move |line| {
                captured.lock().unwrap().push(line.to_string())
            }))
            .build()
            .unwrap_err();

        assert!(matches!(err, TlsError::CaFile(_)));
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[ServerConfig][Error]"));
        assert!(lines[0].contains("CA file failed"));
    }

    #[test]
    fn test_trust_policy_debug() {
        assert_eq!(format!("{:?}", TrustPolicy::Strict), "Strict");
        assert_eq!(format!("{:?}", TrustPolicy::AcceptAny), "AcceptAny");
        let custom = TrustPolicy::custom(|preverified, _| preverified);
        assert_eq!(format!("{:?}", custom), "Custom(..)");
    }

    #[test]
    fn test_zero_verify_depth_is_clamped() {
        use std::io::Write;

        // A CA file with any valid certificate; the depth invariant is what
        // is under test.
        let pkey = openssl::pkey::PKey::from_rsa(openssl::rsa::Rsa::generate(2048).unwrap())
            .unwrap();
        let mut name = openssl::x509::X509Name::builder().unwrap();
        name.append_entry_by_nid(openssl::nid::Nid::COMMONNAME, "depth-test")
            .unwrap();
        let name = name.build();
        let mut builder = openssl::x509::X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = openssl::bn::BigNum::from_u32(1)
            .and_then(|bn| bn.to_asn1_integer())
            .unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder
            .set_not_before(&openssl::asn1::Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&openssl::asn1::Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .sign(&pkey, openssl::hash::MessageDigest::sha256())
            .unwrap();
        let pem = builder.build().to_pem().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&pem).unwrap();

        let config = ServerConfig::builder(TlsVersion::Tls12)
            .ca_file(file.path())
            .verify_depth(0)
            .build()
            .unwrap();

        // CA configured means the effective depth is a positive integer.
        assert_eq!(config.verify_depth(), Some(1));
    }
}
