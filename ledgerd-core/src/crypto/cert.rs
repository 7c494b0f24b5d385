//! Development certificate generation.
//!
//! Provides the X.509 material for dev-mode bootstrap: a root CA and
//! CA-chained TLS/identity certificates derived from a node's legal name.
//! Everything here runs synchronously during startup.

use crate::encoding;
use crate::error::{LedgerdError, LedgerdResult};
use crate::identity::LegalName;
use chrono::Duration;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SanType,
};
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Development certificates are long-lived; they never see production.
pub const DEV_VALIDITY_DAYS: i64 = 3650;

const DEV_CA_COMMON_NAME: &str = "Ledgerd Dev Root CA";
const DEV_CA_ORGANIZATION: &str = "Ledgerd";

/// A generated certificate with its private key, both PEM-encoded.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    pub cert_pem: String,
    pub key_pem: String,
    /// SHA-256 fingerprint of the certificate, colon-separated hex.
    pub fingerprint: String,
}

enum CertificateUsage {
    Identity,
    Tls,
}

/// The development root CA used to sign node certificates.
///
/// The CA certificate PEM is captured once at generation time and reused
/// verbatim everywhere the certificate is referenced. Re-serializing would
/// re-sign, and ECDSA signatures are randomized, so repeated
/// serializations of the same CA would not be byte-identical.
pub struct DevCertificateAuthority {
    cert: Certificate,
    cert_pem: String,
}

impl DevCertificateAuthority {
    /// Generate a fresh self-signed dev root CA.
    pub fn generate() -> LedgerdResult<Self> {
        let mut params = CertificateParams::new(vec![DEV_CA_COMMON_NAME.to_string()]);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, DEV_CA_COMMON_NAME);
        dn.push(DnType::OrganizationName, DEV_CA_ORGANIZATION);
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        set_validity(&mut params)?;
        params.key_pair = Some(generate_key_pair()?);

        let cert = Certificate::from_params(params).map_err(|e| LedgerdError::Security {
            message: format!("Failed to generate dev CA certificate: {}", e),
        })?;
        let cert_pem = cert.serialize_pem().map_err(|e| LedgerdError::Security {
            message: format!("Failed to serialize dev CA certificate: {}", e),
        })?;
        debug!("Generated development root CA");
        Ok(Self { cert, cert_pem })
    }

    /// Reconstruct a signing CA from previously persisted PEM material.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> LedgerdResult<Self> {
        let key_pair = KeyPair::from_pem(key_pem).map_err(|e| LedgerdError::Security {
            message: format!("Failed to parse dev CA key: {}", e),
        })?;
        let params =
            CertificateParams::from_ca_cert_pem(cert_pem, key_pair).map_err(|e| {
                LedgerdError::Security {
                    message: format!("Failed to parse dev CA certificate: {}", e),
                }
            })?;
        let cert = Certificate::from_params(params).map_err(|e| LedgerdError::Security {
            message: format!("Failed to rebuild dev CA certificate: {}", e),
        })?;
        Ok(Self {
            cert,
            cert_pem: cert_pem.to_string(),
        })
    }

    /// The canonical PEM of the CA certificate, as persisted in the dev CA
    /// store and the trust store.
    pub fn certificate_pem(&self) -> &str {
        &self.cert_pem
    }

    pub fn private_key_pem(&self) -> String {
        self.cert.serialize_private_key_pem()
    }

    /// Issue the node's signing identity certificate.
    pub fn issue_identity_certificate(
        &self,
        legal_name: &LegalName,
    ) -> LedgerdResult<CertificateBundle> {
        self.issue(legal_name, CertificateUsage::Identity)
    }

    /// Issue the node's TLS certificate for mutually authenticated
    /// transport.
    pub fn issue_tls_certificate(&self, legal_name: &LegalName) -> LedgerdResult<CertificateBundle> {
        self.issue(legal_name, CertificateUsage::Tls)
    }

    fn issue(
        &self,
        legal_name: &LegalName,
        usage: CertificateUsage,
    ) -> LedgerdResult<CertificateBundle> {
        let mut params = CertificateParams::new(vec![legal_name.organization().to_string()]);
        params.distinguished_name = distinguished_name(legal_name);
        params.is_ca = IsCa::NoCa;
        match usage {
            CertificateUsage::Identity => {
                params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
            }
            CertificateUsage::Tls => {
                params.key_usages = vec![
                    KeyUsagePurpose::DigitalSignature,
                    KeyUsagePurpose::KeyAgreement,
                ];
                params.extended_key_usages = vec![
                    ExtendedKeyUsagePurpose::ServerAuth,
                    ExtendedKeyUsagePurpose::ClientAuth,
                ];
                params.subject_alt_names = vec![
                    SanType::DnsName("localhost".to_string()),
                    SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                ];
            }
        }
        set_validity(&mut params)?;
        params.key_pair = Some(generate_key_pair()?);

        let cert = Certificate::from_params(params).map_err(|e| LedgerdError::Security {
            message: format!("Failed to generate node certificate: {}", e),
        })?;
        let cert_pem = cert
            .serialize_pem_with_signer(&self.cert)
            .map_err(|e| LedgerdError::Security {
                message: format!("Failed to sign node certificate: {}", e),
            })?;
        let key_pem = cert.serialize_private_key_pem();
        let fingerprint = fingerprint(&cert_pem)?;

        debug!(subject = %legal_name, %fingerprint, "Issued dev certificate");
        Ok(CertificateBundle {
            cert_pem,
            key_pem,
            fingerprint,
        })
    }
}

/// SHA-256 fingerprint of a PEM-encoded certificate.
pub fn fingerprint(cert_pem: &str) -> LedgerdResult<String> {
    let block = pem::parse(cert_pem).map_err(|e| LedgerdError::Security {
        message: format!("Failed to parse certificate PEM: {}", e),
    })?;
    Ok(encoding::sha256_fingerprint(block.contents()))
}

fn generate_key_pair() -> LedgerdResult<KeyPair> {
    KeyPair::generate(&rcgen::PKCS_ECDSA_P256_SHA256).map_err(|e| LedgerdError::Security {
        message: format!("Failed to generate ECDSA P-256 key: {}", e),
    })
}

fn set_validity(params: &mut CertificateParams) -> LedgerdResult<()> {
    params.not_before = time::OffsetDateTime::now_utc();
    params.not_after = params.not_before
        + Duration::days(DEV_VALIDITY_DAYS)
            .to_std()
            .map_err(|e| LedgerdError::Security {
                message: format!("Invalid validity period: {}", e),
            })?;
    Ok(())
}

fn distinguished_name(legal_name: &LegalName) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        legal_name.common_name().unwrap_or(legal_name.organization()),
    );
    dn.push(DnType::OrganizationName, legal_name.organization());
    if let Some(ou) = legal_name.organizational_unit() {
        dn.push(DnType::OrganizationalUnitName, ou);
    }
    dn.push(DnType::LocalityName, legal_name.locality());
    if let Some(state) = legal_name.state() {
        dn.push(DnType::StateOrProvinceName, state);
    }
    dn.push(DnType::CountryName, legal_name.country());
    dn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal_name() -> LegalName {
        "O=Test,L=London,C=GB".parse().unwrap()
    }

    #[test]
    fn test_ca_generation() {
        let ca = DevCertificateAuthority::generate().unwrap();
        assert!(ca.certificate_pem().contains("BEGIN CERTIFICATE"));
        assert!(ca.private_key_pem().contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_ca_round_trips_through_pem() {
        let ca = DevCertificateAuthority::generate().unwrap();
        let cert_pem = ca.certificate_pem().to_string();
        let key_pem = ca.private_key_pem();

        let reopened = DevCertificateAuthority::from_pem(&cert_pem, &key_pem).unwrap();
        // The canonical PEM survives the round trip byte for byte
        assert_eq!(reopened.certificate_pem(), cert_pem);
        // The reconstructed CA must still be able to sign.
        let bundle = reopened.issue_identity_certificate(&legal_name()).unwrap();
        assert!(bundle.cert_pem.contains("BEGIN CERTIFICATE"));
    }

    #[test]
    fn test_issued_certificates_carry_fingerprints() {
        let ca = DevCertificateAuthority::generate().unwrap();
        let identity = ca.issue_identity_certificate(&legal_name()).unwrap();
        let tls = ca.issue_tls_certificate(&legal_name()).unwrap();

        assert_eq!(identity.fingerprint.split(':').count(), 32);
        assert_ne!(identity.fingerprint, tls.fingerprint);
        assert!(!identity.key_pem.is_empty());
    }
}
