use ledgerd_core::config::{ConfigLayer, ConfigLoader, Diagnostics, NodeSettings};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use toml::Value;

/// Sink that records warnings instead of logging them.
#[derive(Default)]
struct RecordingDiagnostics {
    warnings: Vec<String>,
}

impl Diagnostics for RecordingDiagnostics {
    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

fn write_node_conf(dir: &TempDir, contents: &str) {
    fs::write(dir.path().join("node.conf"), contents).unwrap();
}

#[test]
#[serial]
fn test_defaults_resolve_without_config_file() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new(dir.path())
        .allow_missing_config(true)
        .load()
        .unwrap();

    assert_eq!(config.get_str("myLegalName"), Some("O=Test,L=London,C=GB"));
    assert_eq!(
        config.get_path("certificatesDirectory").unwrap(),
        dir.path().join("certificates")
    );
    assert_eq!(
        config.get_path("trustStoreFile").unwrap(),
        dir.path().join("certificates").join("truststore.store")
    );
}

#[test]
#[serial]
fn test_missing_config_file_is_fatal_by_default() {
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::new(dir.path()).load().unwrap_err();
    assert!(err.to_string().contains("node.conf"));
}

#[test]
#[serial]
fn test_explicit_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "myLegalName = \"O=MegaCorp,L=Paris,C=FR\"\n");

    let config = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(
        config.get_str("myLegalName"),
        Some("O=MegaCorp,L=Paris,C=FR")
    );
    // Untouched defaults survive underneath
    assert_eq!(config.get_str("emailAddress"), Some("admin@ledgerd.local"));
}

#[test]
#[serial]
fn test_override_layer_beats_explicit_file() {
    let dir = TempDir::new().unwrap();
    write_node_conf(
        &dir,
        "emailAddress = \"file@example.com\"\ndevMode = true\n",
    );

    let overrides = ConfigLayer::from_pairs(
        "overrides",
        [(
            "emailAddress",
            Value::String("override@example.com".to_string()),
        )],
    );
    let config = ConfigLoader::new(dir.path())
        .overrides(overrides)
        .load()
        .unwrap();

    assert_eq!(config.get_str("emailAddress"), Some("override@example.com"));
    // Keys only the file defines still come from the file
    assert_eq!(config.get_bool("devMode").unwrap(), true);
}

#[test]
#[serial]
fn test_environment_layer_strips_prefix() {
    let dir = TempDir::new().unwrap();
    env::set_var("ledgerd.emailAddress", "env@example.com");

    let config = ConfigLoader::new(dir.path())
        .allow_missing_config(true)
        .load()
        .unwrap();
    env::remove_var("ledgerd.emailAddress");

    assert_eq!(config.get_str("emailAddress"), Some("env@example.com"));
    let keys = config.keys();
    assert!(keys.contains(&"emailAddress".to_string()));
    assert!(keys.iter().all(|key| !key.starts_with("ledgerd.")));
}

#[test]
#[serial]
fn test_environment_beats_overrides() {
    let dir = TempDir::new().unwrap();
    env::set_var("ledgerd.emailAddress", "env@example.com");

    let overrides = ConfigLayer::from_pairs(
        "overrides",
        [(
            "emailAddress",
            Value::String("override@example.com".to_string()),
        )],
    );
    let config = ConfigLoader::new(dir.path())
        .allow_missing_config(true)
        .overrides(overrides)
        .load()
        .unwrap();
    env::remove_var("ledgerd.emailAddress");

    assert_eq!(config.get_str("emailAddress"), Some("env@example.com"));
}

#[test]
#[serial]
fn test_resolution_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "[network]\np2pPort = 20002\n");

    let first = ConfigLoader::new(dir.path()).load().unwrap();
    let second = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.keys(), second.keys());
}

#[test]
#[serial]
fn test_quoted_key_is_warning_not_error() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, r#""legal\"name" = "whoops""#);

    let mut diagnostics = RecordingDiagnostics::default();
    let config = ConfigLoader::new(dir.path())
        .load_with_diagnostics(&mut diagnostics)
        .unwrap();

    assert_eq!(diagnostics.warnings.len(), 1);
    assert!(diagnostics.warnings[0].contains("legal\"name"));
    // Resolution still succeeded with the rest of the configuration intact
    assert_eq!(config.get_str("myLegalName"), Some("O=Test,L=London,C=GB"));
}

#[test]
#[serial]
fn test_nested_tables_merge_key_by_key() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "[network]\np2pPort = 20002\n");

    let config = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(config.get_i64("network.p2pPort").unwrap(), 20002);
    // Sibling keys from the defaults table are preserved
    assert_eq!(config.get_str("network.host"), Some("localhost"));
    assert_eq!(config.get_i64("network.rpcPort").unwrap(), 10003);
}

#[test]
#[serial]
fn test_unresolved_reference_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "broken = \"${does.not.exist}\"\n");

    let err = ConfigLoader::new(dir.path()).load().unwrap_err();
    assert!(err.to_string().contains("Unresolved"));
}

#[test]
#[serial]
fn test_reference_cycle_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "a = \"${b}\"\nb = \"${a}\"\n");

    let err = ConfigLoader::new(dir.path()).load().unwrap_err();
    assert!(err.to_string().contains("cycle"));
}

#[test]
#[serial]
fn test_whole_reference_preserves_type() {
    let dir = TempDir::new().unwrap();
    write_node_conf(&dir, "peerPort = \"${network.p2pPort}\"\n");

    let config = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(config.get_i64("peerPort").unwrap(), 10002);
}

#[test]
#[serial]
fn test_interpolation_renders_scalars() {
    let dir = TempDir::new().unwrap();
    write_node_conf(
        &dir,
        "banner = \"listening on ${network.host}:${network.p2pPort}\"\n",
    );

    let config = ConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(config.get_str("banner"), Some("listening on localhost:10002"));
}

#[test]
#[serial]
fn test_explicit_config_file_path() {
    let base = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let config_path = elsewhere.path().join("custom.conf");
    fs::write(&config_path, "emailAddress = \"custom@example.com\"\n").unwrap();

    let config = ConfigLoader::new(base.path())
        .config_file(&config_path)
        .load()
        .unwrap();

    assert_eq!(config.get_str("emailAddress"), Some("custom@example.com"));
    // Substitution values still derive from the base directory
    assert_eq!(
        config.get_path("dataDirectory").unwrap(),
        base.path().join("data")
    );
}

#[test]
#[serial]
fn test_node_settings_extraction() {
    let dir = TempDir::new().unwrap();
    let config = ConfigLoader::new(dir.path())
        .allow_missing_config(true)
        .load()
        .unwrap();

    let settings = NodeSettings::from_config(&config).unwrap();

    assert_eq!(settings.my_legal_name.organization(), "Test");
    assert_eq!(settings.base_directory, dir.path());
    assert!(!settings.dev_mode);
    assert_eq!(
        settings.store.certificates_directory,
        dir.path().join("certificates")
    );
    assert_eq!(settings.store.key_store_password, "devstorepass");
    assert_eq!(settings.store.trust_store_password, "trustpass");
}
