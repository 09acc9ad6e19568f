use std::path::PathBuf;

use loom_config::{
    discover_config_path, init_tracing, load_for_root, with_config_env_lock, CompileConfig,
    ConfigError, LoggingConfig, LoomConfig, LOOM_CONFIG_ENV_VAR, LOOM_FS_CACHING_ENV_VAR,
};
use loom_core::CachingMode;

#[test]
fn empty_config_uses_defaults() {
    with_config_env_lock(|| {
        std::env::remove_var(LOOM_FS_CACHING_ENV_VAR);
        let config = LoomConfig::load_from_str("").unwrap();
        assert_eq!(config, LoomConfig::default());
        assert_eq!(config.vfs.caching, CachingMode::CheckTimestamps);
        assert!(config.compile.from_compiler);
        assert!(!config.compile.is_incremental());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.stderr);
    });
}

#[test]
fn sections_are_read() {
    let text = r#"
[vfs]
caching = "fuzzy-timestamps"

[compile]
from_compiler = false
static_compile = true
no_bootstrap = true
changed_files = ["src/a/Foo.widget"]

[logging]
level = "debug"
json = true
stderr = false
file = "/tmp/loom.log"
"#;
    with_config_env_lock(|| {
        std::env::remove_var(LOOM_FS_CACHING_ENV_VAR);
        let config = LoomConfig::load_from_str(text).unwrap();
        assert_eq!(config.vfs.caching, CachingMode::FuzzyTimestamps);
        assert_eq!(
            config.compile,
            CompileConfig {
                from_compiler: false,
                static_compile: true,
                no_bootstrap: true,
                modular: false,
                changed_files: vec![PathBuf::from("src/a/Foo.widget")],
            }
        );
        assert!(config.compile.is_incremental());
        assert_eq!(
            config.logging,
            LoggingConfig {
                level: "debug".into(),
                json: true,
                stderr: false,
                file: Some(PathBuf::from("/tmp/loom.log")),
            }
        );
    });
}

#[test]
fn unknown_caching_mode_is_a_toml_error() {
    let err = LoomConfig::load_from_str("[vfs]\ncaching = \"sometimes\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)), "{err:?}");
}

#[test]
fn unknown_keys_are_reported() {
    with_config_env_lock(|| {
        std::env::remove_var(LOOM_FS_CACHING_ENV_VAR);
        let (config, diagnostics) =
            LoomConfig::load_from_str_with_diagnostics("[vfs]\ncaching = \"full-caching\"\nspeed = 3\n")
                .unwrap();
        assert_eq!(config.vfs.caching, CachingMode::FullCaching);
        assert_eq!(diagnostics.unknown_keys, vec!["vfs.speed"]);
    });
}

#[test]
fn caching_env_var_overrides_the_file() {
    with_config_env_lock(|| {
        std::env::set_var(LOOM_FS_CACHING_ENV_VAR, "NO_CACHING");
        let overridden = LoomConfig::load_from_str("[vfs]\ncaching = \"full-caching\"\n").unwrap();
        std::env::set_var(LOOM_FS_CACHING_ENV_VAR, "bogus");
        let kept = LoomConfig::load_from_str("[vfs]\ncaching = \"full-caching\"\n").unwrap();
        std::env::remove_var(LOOM_FS_CACHING_ENV_VAR);

        assert_eq!(overridden.vfs.caching, CachingMode::NoCaching);
        assert_eq!(kept.vfs.caching, CachingMode::FullCaching);
    });
}

#[test]
fn config_discovery_prefers_env_then_loom_toml() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    with_config_env_lock(|| {
        std::env::remove_var(LOOM_CONFIG_ENV_VAR);
        std::env::remove_var(LOOM_FS_CACHING_ENV_VAR);

        assert_eq!(discover_config_path(root), None);
        let (config, path) = load_for_root(root).unwrap();
        assert_eq!(config, LoomConfig::default());
        assert_eq!(path, None);

        std::fs::write(root.join(".loom.toml"), "[compile]\nno_bootstrap = true\n").unwrap();
        let hidden = discover_config_path(root).unwrap();
        assert!(hidden.ends_with(".loom.toml"));

        std::fs::write(root.join("loom.toml"), "[compile]\nstatic_compile = true\n").unwrap();
        let (config, path) = load_for_root(root).unwrap();
        assert!(path.unwrap().ends_with("loom.toml"));
        assert!(config.compile.static_compile);
        assert!(!config.compile.no_bootstrap);

        std::fs::write(root.join("custom.toml"), "[logging]\nlevel = \"trace\"\n").unwrap();
        std::env::set_var(LOOM_CONFIG_ENV_VAR, "custom.toml");
        let (config, path) = load_for_root(root).unwrap();
        std::env::remove_var(LOOM_CONFIG_ENV_VAR);
        assert!(path.unwrap().ends_with("custom.toml"));
        assert_eq!(config.logging.level, "trace");
    });
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LoomConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn init_tracing_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        level: "debug".into(),
        json: false,
        stderr: false,
        file: Some(dir.path().join("loom.log")),
    };
    init_tracing(&config);
    init_tracing(&config);
    tracing::info!(target: "loom.config", "after init");
}
