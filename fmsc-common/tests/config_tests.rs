//! Configuration file and environment resolution

use fmsc_common::config::{
    locate_config_file, ConfigOrigin, CATALOG_ENV, CONFIG_ENV, DATABASE_ENV, PORT_ENV,
};
use fmsc_common::{Catalog, CoachConfig, Error};
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    for var in [CONFIG_ENV, PORT_ENV, DATABASE_ENV, CATALOG_ENV] {
        std::env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_load_from_explicit_path() {
    clear_env();
    let file = write_config(
        r#"
        catalog_path = "/srv/fmsc/catalog.json"

        [server]
        port = 5800

        [cache]
        max_entries = 16
        ttl_seconds = 60
        "#,
    );

    let config = CoachConfig::resolve(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 5800);
    assert_eq!(config.catalog_path, PathBuf::from("/srv/fmsc/catalog.json"));
    assert_eq!(config.cache.max_entries, 16);
    assert_eq!(config.cache.ttl_seconds, Some(60));
}

#[test]
#[serial]
fn test_config_env_var_locates_file() {
    clear_env();
    let file = write_config("[server]\nport = 5900\n");
    std::env::set_var(CONFIG_ENV, file.path());

    assert_eq!(locate_config_file(None), Some(file.path().to_path_buf()));
    let config = CoachConfig::resolve(None).unwrap();
    assert_eq!(config.server.port, 5900);

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let file = write_config("database_path = \"/tmp/from-toml.db\"\n[server]\nport = 5800\n");
    std::env::set_var(PORT_ENV, "6100");
    std::env::set_var(DATABASE_ENV, "/tmp/from-env.db");

    let config = CoachConfig::resolve(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 6100);
    assert_eq!(config.database_path, PathBuf::from("/tmp/from-env.db"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_env_is_configuration_error() {
    clear_env();
    let file = write_config("");
    std::env::set_var(PORT_ENV, "not-a-port");

    let err = CoachConfig::resolve(Some(file.path())).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    clear_env();
}

#[test]
#[serial]
fn test_missing_explicit_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = CoachConfig::resolve(Some(&missing)).unwrap();
    assert_eq!(config.server.port, 5740);
}

#[test]
#[serial]
fn test_origin_reports_missing_and_loaded_files() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let (config, origin) = CoachConfig::resolve_with_origin(Some(&missing)).unwrap();
    assert_eq!(config.server.port, 5740);
    assert_eq!(origin, ConfigOrigin::Missing(missing));

    let file = write_config("[server]\nport = 5801\n");
    let (config, origin) = CoachConfig::resolve_with_origin(Some(file.path())).unwrap();
    assert_eq!(config.server.port, 5801);
    assert_eq!(origin, ConfigOrigin::File(file.path().to_path_buf()));
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    clear_env();
    let file = write_config("[candidates]\nshortlist_size = 50\n");
    let err = CoachConfig::resolve(Some(file.path())).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_catalog_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"{"vocabulary_version": 2, "exercises": [
            {"name": "Wall Sit", "difficulty_level": 3, "tags": ["pattern_squat", "level_3"]}
        ]}"#,
    )
    .unwrap();

    let catalog = Catalog::load(file.path()).unwrap();
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_catalog_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load(&dir.path().join("none.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
