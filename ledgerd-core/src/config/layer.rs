//! Configuration source layers and the precedence fold.
//!
//! Each source of configuration (environment entries, programmatic
//! overrides, the node's config file, packaged defaults) is loaded into a
//! named, immutable [`ConfigLayer`]. Precedence is expressed as an explicit
//! ordered slice of layers folded by the pure [`merge`] function, so the
//! collision order can be tested on its own.

use crate::error::{LedgerdError, LedgerdResult};
use toml::{Table, Value};

/// One named source of configuration key/value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    name: String,
    root: Table,
}

impl ConfigLayer {
    pub fn new(name: impl Into<String>, root: Table) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Table::new())
    }

    /// Build a layer from dotted-key pairs; `a.b` expands to a nested table.
    pub fn from_pairs<N, K, I>(name: N, pairs: I) -> Self
    where
        N: Into<String>,
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut root = Table::new();
        for (key, value) in pairs {
            insert_dotted(&mut root, key.as_ref(), value);
        }
        Self::new(name, root)
    }

    /// Parse a layer from TOML text. The layer name is used to attribute
    /// syntax errors to their source.
    pub fn parse_str(name: impl Into<String>, source: &str) -> LedgerdResult<Self> {
        let name = name.into();
        let root: Table = source.parse().map_err(|e| {
            LedgerdError::ConfigError(format!("Failed to parse {}: {}", name, e))
        })?;
        Ok(Self::new(name, root))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

/// Fold layers into one table. `layers` is ordered highest precedence
/// first: for each key the first layer defining it wins, and nested tables
/// merge key-by-key rather than replacing wholesale.
pub fn merge(layers: &[ConfigLayer]) -> Table {
    let mut merged = Table::new();
    for layer in layers.iter().rev() {
        merge_table(&mut merged, layer.root());
    }
    merged
}

fn merge_table(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_table(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

pub(crate) fn insert_dotted(table: &mut Table, key: &str, value: Value) {
    match key.split_once('.') {
        Some((head, rest)) => {
            let entry = table
                .entry(head.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            if let Value::Table(child) = entry {
                insert_dotted(child, rest, value);
            }
        }
        None => {
            table.insert(key.to_string(), value);
        }
    }
}
