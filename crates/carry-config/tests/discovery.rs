use std::ffi::OsString;

use carry_config::{
    discover_config_path, load_for_workspace, with_config_env_lock, CarryConfig, ConfigError,
    CARRY_CONFIG_ENV_VAR,
};
use carry_refactor::FieldVisibility;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn missing_config_yields_defaults() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(CARRY_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();

        let (config, path) = load_for_workspace(dir.path()).unwrap();
        assert_eq!(config, CarryConfig::default());
        assert_eq!(path, None);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.refactor.field_visibility, FieldVisibility::PrivateFinal);
    });
}

#[test]
fn carry_toml_in_the_workspace_root_is_loaded() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(CARRY_CONFIG_ENV_VAR);
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("carry.toml");
        std::fs::write(
            &config_path,
            r#"[logging]
level = "debug"
json = true

[refactor]
field_visibility = "public"
normalize_imports = false
"#,
        )
        .unwrap();

        let (config, path) = load_for_workspace(dir.path()).unwrap();
        assert_eq!(path, Some(config_path.canonicalize().unwrap()));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.refactor.field_visibility, FieldVisibility::Public);
        assert!(!config.refactor.normalize_imports);
        assert!(config.refactor.collect_unused_fields);
    });
}

#[test]
fn env_var_overrides_discovery() {
    with_config_env_lock(|| {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("carry.toml"), "").unwrap();
        let other = dir.path().join("custom.toml");
        std::fs::write(&other, "[refactor]\nfield_visibility = \"private final\"\n").unwrap();
        let _env = EnvVarGuard::set(CARRY_CONFIG_ENV_VAR, &other);

        assert_eq!(
            discover_config_path(dir.path()),
            Some(other.canonicalize().unwrap())
        );
    });
}

#[test]
fn unknown_keys_are_reported_with_dotted_paths() {
    let (config, unknown) = CarryConfig::load_from_str_with_unknown_keys(
        r#"[refactor]
collect_unused_fields = false
field_visiblity = "public"

[extra]
x = 1
"#,
    )
    .unwrap();
    assert!(!config.refactor.collect_unused_fields);
    assert_eq!(config.refactor.field_visibility, FieldVisibility::PrivateFinal);
    assert_eq!(unknown, vec!["extra", "refactor.field_visiblity"]);
}

#[test]
fn malformed_values_are_toml_errors() {
    let text = "[refactor]\nfield_visibility = \"protected\"\n";
    let err = CarryConfig::load_from_str_with_unknown_keys(text).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err}");

    let missing = tempdir().unwrap().path().join("nope.toml");
    assert!(matches!(
        CarryConfig::load_from_path(&missing),
        Err(ConfigError::Io { .. })
    ));
}
