//! Layered configuration resolution for a node.

pub mod layer;
pub mod resolver;
pub mod settings;

pub use layer::{merge, ConfigLayer};
pub use resolver::{
    ConfigLoader, Diagnostics, LogDiagnostics, ResolvedConfig, LEDGERD_PROPERTY_PREFIX,
};
pub use settings::{NodeSettings, StoreSettings};
