//! `carry.toml` configuration and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use carry_refactor::{FieldVisibility, MoveOptions};
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Environment variable naming an explicit config file.
pub const CARRY_CONFIG_ENV_VAR: &str = "CARRY_CONFIG_PATH";

/// File names searched for in the workspace root, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["carry.toml", ".carry.toml"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub refactor: RefactorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// The effective filter: the configured level with `RUST_LOG` merged on top.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorConfig {
    /// Modifiers of fields the refactoring injects.
    #[serde(default)]
    pub field_visibility: FieldVisibility,

    /// Drop imports a move leaves unused in the source and target files.
    #[serde(default = "default_true")]
    pub normalize_imports: bool,

    /// Drop fields a move leaves without references.
    #[serde(default = "default_true")]
    pub collect_unused_fields: bool,
}

impl RefactorConfig {
    pub fn move_options(&self) -> MoveOptions {
        MoveOptions {
            normalize_imports: self.normalize_imports,
            collect_unused_fields: self.collect_unused_fields,
        }
    }
}

impl Default for RefactorConfig {
    fn default() -> Self {
        Self {
            field_visibility: FieldVisibility::default(),
            normalize_imports: true,
            collect_unused_fields: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` quotes the offending source line; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl CarryConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_from_path_with_unknown_keys(path).map(|(config, _)| config)
    }

    /// Like [`CarryConfig::load_from_path`], also returning the dotted paths of keys the
    /// schema does not know.
    pub fn load_from_path_with_unknown_keys(
        path: impl AsRef<Path>,
    ) -> Result<(Self, Vec<String>), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str_with_unknown_keys(&text)
    }

    pub fn load_from_str_with_unknown_keys(
        text: &str,
    ) -> Result<(Self, Vec<String>), ConfigError> {
        let mut unknown = Vec::<String>::new();
        let deserializer = toml::de::Deserializer::new(text);
        let config = serde_ignored::deserialize(deserializer, |path| {
            unknown.push(path.to_string().trim_start_matches('.').to_owned());
        })?;
        unknown.sort();
        unknown.dedup();
        Ok((config, unknown))
    }
}

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Serializes access to [`CARRY_CONFIG_ENV_VAR`] with config discovery.
///
/// Environment variables are process-global; tests that set the variable should do so inside
/// this lock.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Finds the config file for a workspace root.
///
/// [`CARRY_CONFIG_ENV_VAR`] wins (absolute or relative to `workspace_root`); otherwise the first
/// of [`CONFIG_FILE_NAMES`] present in `workspace_root`.
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(CARRY_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    CONFIG_FILE_NAMES
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Loads the configuration for a workspace root.
///
/// Without a config file this is [`CarryConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(CarryConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((CarryConfig::default(), None));
    };
    let config = CarryConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Installs the global subscriber. Only the first call in a process has an effect.
pub fn init_tracing(logging: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = logging.env_filter();
        let layer: Box<dyn Layer<_> + Send + Sync> = if logging.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };
        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(
                target: "carry.config",
                level = %logging.level,
                json = logging.json,
                "tracing initialized"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn level_synonyms_normalize() {
        assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
        assert_eq!(
            LoggingConfig::normalize_level_directives("carry.refactor=debug"),
            "carry.refactor=debug"
        );
    }

    #[test]
    fn empty_documents_yield_defaults() {
        let (config, unknown) = CarryConfig::load_from_str_with_unknown_keys("").unwrap();
        assert_eq!(config, CarryConfig::default());
        assert!(unknown.is_empty());
        assert_eq!(config.refactor.move_options(), MoveOptions::default());
    }
}
