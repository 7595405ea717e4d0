use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = load_from_path(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, GameConfig::default());
    assert_eq!(config.matching.top_n, 3);
    assert_eq!(config.network.read_timeout_secs, 0);
}

#[test]
fn partial_file_keeps_defaults_for_missing_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[backend]\norigin = \"https://shapes.example.org\"\n\n[match]\npoll_interval_ms = 250\nunknown_key = 1\n",
    )
    .unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.backend.origin, "https://shapes.example.org");
    assert_eq!(config.backend.match_join_path, "/match/join");
    assert_eq!(config.matching.poll_interval_ms, 250);
    assert!(config.matching.poll_for_opponent);
    assert!(!config.matching.poll_for_pairing);
}

#[test]
fn saves_and_reloads_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut config = GameConfig::default();
    config.matching.top_n = 5;
    config.network.leaderboard_attempts = 1;
    save_to_path(&config, &path).unwrap();
    let loaded = load_from_path(&path).unwrap();
    assert_eq!(loaded, config);
    let leftovers = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn invalid_toml_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[match\ntop_n = ").unwrap();
    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn negative_top_n_is_rejected_by_parsing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[match]\ntop_n = -1\n").unwrap();
    assert!(matches!(
        load_from_path(&path),
        Err(ConfigError::ParseToml { .. })
    ));
}

#[test]
fn origin_must_be_http() {
    let backend = BackendSettings {
        origin: "ftp://shapes.example.org".to_string(),
        ..BackendSettings::default()
    };
    assert!(matches!(
        backend.origin_url(),
        Err(ConfigError::InvalidOrigin { .. })
    ));
}

#[test]
fn endpoint_joins_paths_against_origin() {
    let backend = BackendSettings {
        origin: "http://10.0.0.5:9000/ignored/".to_string(),
        ..BackendSettings::default()
    };
    let url = backend.endpoint("match/join").unwrap();
    assert_eq!(url.as_str(), "http://10.0.0.5:9000/match/join");
}

#[test]
fn config_path_lives_in_app_root() {
    let dir = tempdir().unwrap();
    let _guard = app_dirs::ConfigBaseGuard::set(dir.path().to_path_buf());
    let path = config_path().unwrap();
    assert_eq!(
        path,
        dir.path().join(app_dirs::APP_DIR_NAME).join(CONFIG_FILE_NAME)
    );
}

#[test]
fn poll_interval_below_floor_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[match]\npoll_interval_ms = 0\n").unwrap();
    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::PollIntervalTooShort {
            value_ms: 0,
            min_ms: MIN_POLL_INTERVAL_MS
        }
    ));

    let mut config = GameConfig::default();
    config.matching.poll_interval_ms = MIN_POLL_INTERVAL_MS;
    assert!(config.validate().is_ok());
}
