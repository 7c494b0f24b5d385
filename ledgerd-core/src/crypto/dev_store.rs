//! Development credential-store provisioning.
//!
//! Strictly for dev bootstrap: materializes the trust store and the node's
//! key stores from development defaults when they are absent, and migrates
//! a previously generated distributed-service identity into the fresh node
//! key store. Existing stores are never rewritten.

use crate::config::settings::StoreSettings;
use crate::crypto::cert::DevCertificateAuthority;
use crate::crypto::keystore::{migrate, CredentialStore, StoreEntry};
use crate::error::{LedgerdError, LedgerdResult};
use crate::identity::LegalName;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// File inside the certificates directory holding the per-installation
/// dev root CA key pair.
pub const DEV_CA_STORE_FILE: &str = "dev-ca.store";

/// Legacy composite-identity store picked up for migration when present.
pub const LEGACY_DISTRIBUTED_SERVICE_STORE_FILE: &str = "distributedservice.store";

/// Fixed password protecting development-only stores (the dev CA store and
/// the legacy distributed-service store).
pub const DEV_CA_STORE_PASS: &str = "devcastorepass";

pub const DEV_CA_ALIAS: &str = "devca";
pub const IDENTITY_ALIAS: &str = "identity";
pub const TLS_ALIAS: &str = "tls";

/// Ensure the trust store and the ssl/node key stores exist, creating any
/// that are missing from development defaults. Idempotent: a second call
/// against the same directory performs no writes.
pub fn ensure_dev_stores(
    settings: &StoreSettings,
    legal_name: &LegalName,
) -> LedgerdResult<()> {
    fs::create_dir_all(&settings.certificates_directory).map_err(|e| LedgerdError::Security {
        message: format!(
            "Failed to create certificates directory {}: {}",
            settings.certificates_directory.display(),
            e
        ),
    })?;

    if !settings.trust_store_file.exists() {
        let ca = load_or_create_dev_ca(&settings.certificates_directory)?;
        let mut trust_store = CredentialStore::new();
        trust_store.set_certificate(DEV_CA_ALIAS, ca.certificate_pem());
        trust_store.save(&settings.trust_store_file, &settings.trust_store_password)?;
        info!(path = %settings.trust_store_file.display(), "Created development trust store");
    }

    if !settings.ssl_keystore_file.exists() || !settings.node_keystore_file.exists() {
        let ca = load_or_create_dev_ca(&settings.certificates_directory)?;
        let ca_cert_pem = ca.certificate_pem().to_string();

        let identity = ca.issue_identity_certificate(legal_name)?;
        let mut node_store = CredentialStore::new();
        node_store.set_private_key(
            IDENTITY_ALIAS,
            identity.key_pem,
            vec![identity.cert_pem, ca_cert_pem.clone()],
        );

        let tls = ca.issue_tls_certificate(legal_name)?;
        let mut ssl_store = CredentialStore::new();
        ssl_store.set_private_key(TLS_ALIAS, tls.key_pem, vec![tls.cert_pem, ca_cert_pem]);

        // Pick up a previously generated distributed-service composite
        // identity, if one was left alongside by an identity generator.
        let legacy_path = settings
            .certificates_directory
            .join(LEGACY_DISTRIBUTED_SERVICE_STORE_FILE);
        if legacy_path.exists() {
            let legacy = CredentialStore::load(&legacy_path, DEV_CA_STORE_PASS)?;
            info!(
                path = %legacy_path.display(),
                entries = legacy.len(),
                "Migrating legacy distributed-service store into node key store"
            );
            node_store = migrate(&legacy, node_store);
        }

        ssl_store.save(&settings.ssl_keystore_file, &settings.key_store_password)?;
        node_store.save(&settings.node_keystore_file, &settings.key_store_password)?;
        info!(
            identity = %legal_name,
            "Created development key stores"
        );
    }

    Ok(())
}

/// The dev root CA is materialized once per certificates directory and
/// reused afterwards, so the trust store and every generated node
/// certificate chain to the same root.
fn load_or_create_dev_ca(certificates_directory: &Path) -> LedgerdResult<DevCertificateAuthority> {
    let path = certificates_directory.join(DEV_CA_STORE_FILE);
    if path.exists() {
        let store = CredentialStore::load(&path, DEV_CA_STORE_PASS)?;
        match store.get(DEV_CA_ALIAS) {
            Some(StoreEntry::KeyPair { key_pem, chain_pem }) => {
                let cert_pem = chain_pem.first().ok_or_else(|| LedgerdError::Security {
                    message: format!("Dev CA store {} has an empty chain", path.display()),
                })?;
                debug!(path = %path.display(), "Reusing existing dev CA");
                DevCertificateAuthority::from_pem(cert_pem, key_pem)
            }
            _ => Err(LedgerdError::Security {
                message: format!(
                    "Dev CA store {} is missing its key pair entry",
                    path.display()
                ),
            }),
        }
    } else {
        let ca = DevCertificateAuthority::generate()?;
        let mut store = CredentialStore::new();
        store.set_private_key(
            DEV_CA_ALIAS,
            ca.private_key_pem(),
            vec![ca.certificate_pem().to_string()],
        );
        store.save(&path, DEV_CA_STORE_PASS)?;
        debug!(path = %path.display(), "Persisted new dev CA");
        Ok(ca)
    }
}
