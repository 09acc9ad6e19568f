//! Configuration loading and tracing initialization for Loom.

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once, OnceLock};

use loom_core::CachingMode;
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

pub const LOOM_CONFIG_ENV_VAR: &str = "LOOM_CONFIG_PATH";

/// Overrides `vfs.caching` when set to a valid caching mode.
pub const LOOM_FS_CACHING_ENV_VAR: &str = "LOOM_FS_CACHING";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoomConfig {
    #[serde(default)]
    pub vfs: VfsConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsConfig {
    /// Directory listing cache policy.
    #[serde(default)]
    pub caching: CachingMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Class files may be written to disk by the host compiler.
    #[serde(default = "CompileConfig::default_from_compiler")]
    pub from_compiler: bool,

    /// Primary generated types are compiled to disk instead of kept in memory.
    #[serde(default)]
    pub static_compile: bool,

    /// Disables bootstrap static-block insertion.
    #[serde(default)]
    pub no_bootstrap: bool,

    /// The host module system is in use; generated sources on the class path are restricted.
    #[serde(default)]
    pub modular: bool,

    /// Resource files changed since the last build. Non-empty means incremental compilation:
    /// producers are skipped for names no changed file contributes to.
    #[serde(default)]
    pub changed_files: Vec<PathBuf>,
}

impl CompileConfig {
    fn default_from_compiler() -> bool {
        true
    }

    pub fn is_incremental(&self) -> bool {
        !self.changed_files.is_empty()
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            from_compiler: Self::default_from_compiler(),
            static_compile: false,
            no_bootstrap: false,
            modular: false,
            changed_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,

    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append logs to this file as well. A file that cannot be opened is skipped.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
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

    /// The effective filter: `level`, merged with `RUST_LOG` when set.
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
            stderr: Self::default_stderr(),
            file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Toml(err.message().to_string())
    }
}

/// Keys present in a config file that no setting reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    pub unknown_keys: Vec<String>,
}

impl ConfigDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty()
    }
}

impl LoomConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(Self::load_from_str_with_diagnostics(text)?.0)
    }

    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let deserializer = toml::Deserializer::new(text);
        let mut diagnostics = ConfigDiagnostics::default();
        let mut config: LoomConfig = serde_ignored::deserialize(deserializer, |path| {
            diagnostics.unknown_keys.push(path.to_string());
        })?;
        config.apply_env_overrides();
        for key in &diagnostics.unknown_keys {
            tracing::warn!(target: "loom.config", key = %key, "unknown config key");
        }
        Ok((config, diagnostics))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// `LOOM_FS_CACHING` wins over the file; an unparsable value is ignored.
    fn apply_env_overrides(&mut self) {
        let _guard = config_env_lock().lock();
        let Ok(value) = std::env::var(LOOM_FS_CACHING_ENV_VAR) else {
            return;
        };
        match value.parse::<CachingMode>() {
            Ok(mode) => self.vfs.caching = mode,
            Err(err) => tracing::warn!(
                target: "loom.config",
                error = %err,
                "ignoring {LOOM_FS_CACHING_ENV_VAR}"
            ),
        }
    }
}

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Runs `f` while holding the lock that guards Loom's environment variables.
///
/// Tests that set [`LOOM_CONFIG_ENV_VAR`] or [`LOOM_FS_CACHING_ENV_VAR`] wrap the mutation and
/// the loading that observes it in this helper.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Finds the config file for a project root.
///
/// Search order:
/// 1) `LOOM_CONFIG_PATH` (absolute or relative to `root`)
/// 2) `loom.toml` in `root`
/// 3) `.loom.toml` in `root`
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(LOOM_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["loom.toml", ".loom.toml"]
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Loads the config for `root`, or the default config when there is none.
pub fn load_for_root(root: &Path) -> Result<(LoomConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        let mut config = LoomConfig::default();
        config.apply_env_overrides();
        return Ok((config, None));
    };

    let config = LoomConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

struct MutexFileMakeWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl<'a> MakeWriter<'a> for MutexFileMakeWriter {
    type Writer = MutexFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MutexFileWriter {
            guard: self.file.lock(),
        }
    }
}

struct MutexFileWriter<'a> {
    guard: MutexGuard<'a, std::fs::File>,
}

impl Write for MutexFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Only the first call has an effect; later calls return immediately.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let file = config
            .file
            .as_ref()
            .and_then(|path| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .ok()
            })
            .map(|file| Arc::new(Mutex::new(file)));
        let file_open_failed = config.file.is_some() && file.is_none();

        let mut make_writer = BoxMakeWriter::new(io::sink);
        if config.stderr {
            // Test output capture only sees the stdlib print macros.
            if cfg!(debug_assertions) {
                make_writer = BoxMakeWriter::new(
                    make_writer.and(tracing_subscriber::fmt::writer::TestWriter::with_stderr),
                );
            } else {
                make_writer = BoxMakeWriter::new(make_writer.and(io::stderr));
            }
        }
        if let Some(file) = file {
            make_writer = BoxMakeWriter::new(make_writer.and(MutexFileMakeWriter { file }));
        }

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() && file_open_failed {
            if let Some(path) = config.file.as_ref() {
                tracing::warn!(
                    target: "loom.config",
                    path = %path.display(),
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_synonyms_normalize() {
        assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
        assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
        assert_eq!(
            LoggingConfig::normalize_level_directives("loom.vfs=trace,info"),
            "loom.vfs=trace,info"
        );
    }
}
