//! Layered configuration resolution.
//!
//! [`ConfigLoader`] assembles a node's runtime configuration from ranked
//! sources and produces an immutable [`ResolvedConfig`]:
//!
//! 1. `ledgerd.`-prefixed process environment entries (prefix stripped)
//! 2. computed substitution values (`baseDirectory`)
//! 3. caller-supplied overrides
//! 4. the explicit config file (default `<baseDirectory>/node.conf`)
//! 5. packaged defaults embedded from `reference.conf`
//!
//! After the merge, `${dotted.key}` references are substituted in a single
//! pass. An unresolved reference or a reference cycle fails resolution;
//! keys containing a quote character are reported as warnings through the
//! [`Diagnostics`] sink but do not fail it.

use crate::config::layer::{insert_dotted, merge, ConfigLayer};
use crate::error::{LedgerdError, LedgerdResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

/// Environment entries carrying this prefix contribute to the environment
/// layer; the prefix is stripped before the merge.
pub const LEDGERD_PROPERTY_PREFIX: &str = "ledgerd.";

const DEFAULT_CONFIG_FILE: &str = "node.conf";

/// Packaged defaults. Shipping them inside the binary makes the defaults
/// layer impossible to lose at runtime; a parse failure is always fatal.
const REFERENCE_DEFAULTS: &str = include_str!("../../resources/reference.conf");

static REFERENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("reference pattern is valid"));

/// Sink for non-fatal resolution findings. Passing it explicitly keeps the
/// resolver decoupled from any process-wide logging configuration.
pub trait Diagnostics {
    fn warning(&mut self, message: &str);
}

/// Default sink that forwards warnings to `tracing`.
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn warning(&mut self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// The immutable configuration produced by [`ConfigLoader::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    root: Table,
}

impl ResolvedConfig {
    fn new(root: Table) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    /// Look up a value by case-sensitive dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_string(&self, path: &str) -> LedgerdResult<String> {
        self.required(path)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| wrong_type(path, "a string"))
    }

    pub fn get_i64(&self, path: &str) -> LedgerdResult<i64> {
        self.required(path)?
            .as_integer()
            .ok_or_else(|| wrong_type(path, "an integer"))
    }

    pub fn get_bool(&self, path: &str) -> LedgerdResult<bool> {
        self.required(path)?
            .as_bool()
            .ok_or_else(|| wrong_type(path, "a boolean"))
    }

    pub fn get_path(&self, path: &str) -> LedgerdResult<PathBuf> {
        self.get_string(path).map(PathBuf::from)
    }

    pub fn get_array(&self, path: &str) -> LedgerdResult<&Vec<Value>> {
        self.required(path)?
            .as_array()
            .ok_or_else(|| wrong_type(path, "an array"))
    }

    pub fn get_table(&self, path: &str) -> LedgerdResult<&Table> {
        self.required(path)?
            .as_table()
            .ok_or_else(|| wrong_type(path, "a table"))
    }

    /// All resolved leaf keys as sorted dotted paths.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.root, None, &mut keys);
        keys.sort();
        keys
    }

    pub fn to_toml_string(&self) -> LedgerdResult<String> {
        toml::to_string_pretty(&self.root)
            .map_err(|e| LedgerdError::ConfigError(format!("Failed to render configuration: {}", e)))
    }

    fn required(&self, path: &str) -> LedgerdResult<&Value> {
        self.get(path)
            .ok_or_else(|| LedgerdError::ConfigError(format!("Missing configuration key '{}'", path)))
    }
}

fn wrong_type(path: &str, expected: &str) -> LedgerdError {
    LedgerdError::ConfigError(format!("Configuration key '{}' is not {}", path, expected))
}

fn collect_keys(table: &Table, prefix: Option<&str>, out: &mut Vec<String>) {
    for (key, value) in table {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Table(child) => collect_keys(child, Some(&path), out),
            _ => out.push(path),
        }
    }
}

fn lookup<'a>(root: &'a Table, path: &str) -> Option<&'a Value> {
    let mut table = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        let value = table.get(part)?;
        if parts.peek().is_none() {
            return Some(value);
        }
        table = value.as_table()?;
    }
    None
}

/// Builder for resolving a node's configuration.
pub struct ConfigLoader {
    base_directory: PathBuf,
    config_file: Option<PathBuf>,
    allow_missing_config: bool,
    overrides: ConfigLayer,
}

impl ConfigLoader {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            config_file: None,
            allow_missing_config: false,
            overrides: ConfigLayer::empty("overrides"),
        }
    }

    /// Explicit config file path. Defaults to `<baseDirectory>/node.conf`.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Tolerate a missing config file and fall back to the layers below it.
    pub fn allow_missing_config(mut self, allow: bool) -> Self {
        self.allow_missing_config = allow;
        self
    }

    pub fn overrides(mut self, overrides: ConfigLayer) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn load(self) -> LedgerdResult<ResolvedConfig> {
        self.load_with_diagnostics(&mut LogDiagnostics)
    }

    pub fn load_with_diagnostics(
        self,
        diagnostics: &mut dyn Diagnostics,
    ) -> LedgerdResult<ResolvedConfig> {
        let defaults = ConfigLayer::parse_str("reference.conf", REFERENCE_DEFAULTS)?;

        let base_directory = absolute(&self.base_directory)?;
        let config_path = self
            .config_file
            .unwrap_or_else(|| base_directory.join(DEFAULT_CONFIG_FILE));
        let file_layer = load_config_file(&config_path, self.allow_missing_config)?;

        let substitutions = ConfigLayer::from_pairs(
            "substitutions",
            [(
                "baseDirectory",
                Value::String(base_directory.to_string_lossy().into_owned()),
            )],
        );

        let layers = [
            environment_layer(),
            substitutions,
            self.overrides,
            file_layer,
            defaults,
        ];
        let merged = merge(&layers);
        let resolved = substitute(&merged)?;
        let config = ResolvedConfig::new(resolved);

        for key in config.keys() {
            if key.contains('"') {
                diagnostics.warning(&format!(
                    "Config files should not contain '\"' in key names, found: {}",
                    key
                ));
            }
        }

        debug!(
            config_file = %config_path.display(),
            keys = config.keys().len(),
            "Resolved node configuration"
        );
        Ok(config)
    }
}

fn absolute(path: &Path) -> LedgerdResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

fn load_config_file(path: &Path, allow_missing: bool) -> LedgerdResult<ConfigLayer> {
    match fs::read_to_string(path) {
        Ok(contents) => ConfigLayer::parse_str(path.display().to_string(), &contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            debug!(path = %path.display(), "Config file absent, using remaining layers");
            Ok(ConfigLayer::empty(path.display().to_string()))
        }
        Err(e) => Err(LedgerdError::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))),
    }
}

fn environment_layer() -> ConfigLayer {
    let mut root = Table::new();
    for (name, value) in env::vars() {
        if let Some(key) = name.strip_prefix(LEDGERD_PROPERTY_PREFIX) {
            if key.is_empty() {
                continue;
            }
            insert_dotted(&mut root, key, Value::String(value));
        }
    }
    ConfigLayer::new("environment", root)
}

// Substitution walks the merged tree once; chained references are resolved
// recursively with an explicit stack for cycle detection.

fn substitute(root: &Table) -> LedgerdResult<Table> {
    let mut resolved = Table::new();
    let mut stack = Vec::new();
    for (key, value) in root {
        resolved.insert(key.clone(), resolve_value(root, value, &mut stack)?);
    }
    Ok(resolved)
}

fn resolve_value(root: &Table, value: &Value, stack: &mut Vec<String>) -> LedgerdResult<Value> {
    match value {
        Value::String(s) => resolve_string(root, s, stack),
        Value::Table(table) => {
            let mut resolved = Table::new();
            for (key, child) in table {
                resolved.insert(key.clone(), resolve_value(root, child, stack)?);
            }
            Ok(Value::Table(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(root, item, stack)?);
            }
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(root: &Table, s: &str, stack: &mut Vec<String>) -> LedgerdResult<Value> {
    // A value that is exactly one reference keeps the referenced type.
    if let Some(key) = whole_reference(s) {
        return resolve_reference(root, key, stack);
    }
    if !s.contains("${") {
        return Ok(Value::String(s.to_string()));
    }
    let mut result = String::new();
    let mut last = 0;
    for found in REFERENCE_PATTERN.find_iter(s) {
        let key = &s[found.start() + 2..found.end() - 1];
        result.push_str(&s[last..found.start()]);
        let value = resolve_reference(root, key, stack)?;
        result.push_str(&render_scalar(key, &value)?);
        last = found.end();
    }
    result.push_str(&s[last..]);
    Ok(Value::String(result))
}

fn whole_reference(s: &str) -> Option<&str> {
    let key = s.strip_prefix("${")?.strip_suffix('}')?;
    if key.is_empty() || key.contains('}') || key.contains("${") {
        return None;
    }
    Some(key)
}

fn resolve_reference(root: &Table, key: &str, stack: &mut Vec<String>) -> LedgerdResult<Value> {
    if stack.iter().any(|seen| seen == key) {
        return Err(LedgerdError::ConfigError(format!(
            "Configuration reference cycle involving '{}'",
            key
        )));
    }
    let target = lookup(root, key).ok_or_else(|| {
        LedgerdError::ConfigError(format!("Unresolved configuration reference '${{{}}}'", key))
    })?;
    stack.push(key.to_string());
    let resolved = resolve_value(root, target, stack);
    stack.pop();
    resolved
}

fn render_scalar(key: &str, value: &Value) -> LedgerdResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        Value::Table(_) | Value::Array(_) => Err(LedgerdError::ConfigError(format!(
            "Reference '${{{}}}' expands to a non-scalar value",
            key
        ))),
    }
}
