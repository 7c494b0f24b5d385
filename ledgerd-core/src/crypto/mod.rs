//! Credential stores and development PKI.

pub mod cert;
pub mod dev_store;
pub mod keystore;

pub use cert::{CertificateBundle, DevCertificateAuthority};
pub use dev_store::ensure_dev_stores;
pub use keystore::{migrate, CredentialStore, StoreEntry};
