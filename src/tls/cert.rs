//! Peer certificate inspection
//!
//! Trust-policy callbacks and post-handshake introspection both need a small,
//! owned summary of an X.509 certificate rather than a borrowed engine
//! handle; this module extracts one.

use openssl::nid::Nid;
use openssl::x509::{X509, X509NameRef, X509Ref};

/// Summary of one peer certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// Subject Common Name
    pub subject: String,
    /// Issuer Common Name
    pub issuer: String,
    /// Subject Alternative Names (DNS names and IP addresses)
    pub subject_alt_names: Vec<String>,
}

impl CertInfo {
    /// Extract certificate information from an owned certificate.
    pub fn from_x509(cert: &X509) -> Self {
        Self::from_x509_ref(cert.as_ref())
    }

    /// Extract certificate information from a borrowed certificate.
    pub fn from_x509_ref(cert: &X509Ref) -> Self {
        CertInfo {
            subject: common_name(cert.subject_name()),
            issuer: common_name(cert.issuer_name()),
            subject_alt_names: subject_alt_names(cert),
        }
    }

    /// Whether the certificate is self-signed, judged by name only.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

fn common_name(name: &X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<undef>".to_string())
}

fn subject_alt_names(cert: &X509Ref) -> Vec<String> {
    let mut names = Vec::new();

    if let Some(sans) = cert.subject_alt_names() {
        for san in sans {
            if let Some(dns) = san.dnsname() {
                names.push(format!("DNS:{}", dns));
            } else if let Some(ip) = san.ipaddress() {
                if let Ok(octets) = <[u8; 4]>::try_from(ip) {
                    names.push(format!("IP:{}", std::net::Ipv4Addr::from(octets)));
                } else if let Ok(octets) = <[u8; 16]>::try_from(ip) {
                    names.push(format!("IP:{}", std::net::Ipv6Addr::from(octets)));
                }
            }
        }
    }

    names
}
