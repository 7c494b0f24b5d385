//! Typed views over a [`ResolvedConfig`](super::ResolvedConfig).
//!
//! The resolver treats configuration as an opaque key/value tree; the
//! bootstrap path reads these typed settings out of it.

use crate::config::resolver::ResolvedConfig;
use crate::error::LedgerdResult;
use crate::identity::LegalName;
use std::path::PathBuf;

/// Paths and passwords of the node's credential stores.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub certificates_directory: PathBuf,
    pub trust_store_file: PathBuf,
    pub ssl_keystore_file: PathBuf,
    pub node_keystore_file: PathBuf,
    pub key_store_password: String,
    pub trust_store_password: String,
}

impl StoreSettings {
    pub fn from_config(config: &ResolvedConfig) -> LedgerdResult<Self> {
        Ok(Self {
            certificates_directory: config.get_path("certificatesDirectory")?,
            trust_store_file: config.get_path("trustStoreFile")?,
            ssl_keystore_file: config.get_path("sslKeystoreFile")?,
            node_keystore_file: config.get_path("nodeKeystoreFile")?,
            key_store_password: config.get_string("keyStorePassword")?,
            trust_store_password: config.get_string("trustStorePassword")?,
        })
    }
}

/// The settings a node needs before any subsystem starts.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    pub my_legal_name: LegalName,
    pub base_directory: PathBuf,
    pub data_directory: PathBuf,
    pub email_address: String,
    pub dev_mode: bool,
    pub store: StoreSettings,
}

impl NodeSettings {
    pub fn from_config(config: &ResolvedConfig) -> LedgerdResult<Self> {
        Ok(Self {
            my_legal_name: config.get_string("myLegalName")?.parse()?,
            base_directory: config.get_path("baseDirectory")?,
            data_directory: config.get_path("dataDirectory")?,
            email_address: config.get_string("emailAddress")?,
            dev_mode: config.get_bool("devMode")?,
            store: StoreSettings::from_config(config)?,
        })
    }
}
