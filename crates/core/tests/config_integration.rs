//! quayscan.toml 통합 설정 테스트
//!
//! - quayscan.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use quayscan_core::config::QuayscanConfig;
use quayscan_core::error::{ConfigError, QuayscanError};
use serial_test::serial;

// =============================================================================
// quayscan.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../quayscan.toml.example");
    let config = QuayscanConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "warn");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.quay.api_base_url, "https://quay.io/api/v1/");
    assert_eq!(config.quay.timeout_secs, 15);
    assert_eq!(config.quay.user_agent, "quayscan/0.1.0");
    assert!(config.quay.token.is_none());
    assert_eq!(config.scan.workers, 5);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../quayscan.toml.example");
    let config = QuayscanConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial]
async fn load_partial_file_merges_defaults() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("quayscan.toml");
    std::fs::write(&path, "[scan]\nworkers = 3\n").expect("should write config");

    let config = QuayscanConfig::load(&path).await.expect("should load");
    assert_eq!(config.scan.workers, 3);
    assert_eq!(config.quay.timeout_secs, 15);
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("quayscan.toml");
    std::fs::write(&path, "[quay]\ntimeout_secs = 0\n").expect("should write config");

    let err = QuayscanConfig::load(&path).await.unwrap_err();
    assert!(matches!(
        err,
        QuayscanError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
#[serial]
async fn load_or_default_propagates_parse_errors() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[general\nlog_level = \"info\"\n").expect("should write config");

    let err = QuayscanConfig::load_or_default(&path).await.unwrap_err();
    assert!(matches!(
        err,
        QuayscanError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[tokio::test]
#[serial]
async fn empty_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("empty.toml");
    std::fs::write(&path, "").expect("should write config");

    let config = QuayscanConfig::load(&path).await.expect("should load");
    assert_eq!(config.scan.workers, 5);
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[tokio::test]
#[serial]
async fn env_overrides_take_precedence_over_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("quayscan.toml");
    std::fs::write(
        &path,
        "[quay]\ntimeout_secs = 20\ntoken = \"file-token\"\n\n[scan]\nworkers = 2\n",
    )
    .expect("should write config");

    // SAFETY: serial 테스트이므로 다른 스레드가 환경변수를 동시에 읽지 않습니다.
    unsafe {
        std::env::set_var("QUAYSCAN_QUAY_TIMEOUT_SECS", "45");
        std::env::set_var("QUAYSCAN_SCAN_WORKERS", "9");
        std::env::set_var("QUAY_TOKEN", "env-token");
    }

    let result = QuayscanConfig::load(&path).await;

    unsafe {
        std::env::remove_var("QUAYSCAN_QUAY_TIMEOUT_SECS");
        std::env::remove_var("QUAYSCAN_SCAN_WORKERS");
        std::env::remove_var("QUAY_TOKEN");
    }

    let config = result.expect("should load");
    assert_eq!(config.quay.timeout_secs, 45);
    assert_eq!(config.scan.workers, 9);
    assert_eq!(config.quay.token.as_deref(), Some("env-token"));
}

#[tokio::test]
#[serial]
async fn env_override_can_make_config_invalid() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("quayscan.toml");
    std::fs::write(&path, "").expect("should write config");

    // SAFETY: serial 테스트이므로 다른 스레드가 환경변수를 동시에 읽지 않습니다.
    unsafe { std::env::set_var("QUAYSCAN_SCAN_WORKERS", "0") };
    let result = QuayscanConfig::load(&path).await;
    unsafe { std::env::remove_var("QUAYSCAN_SCAN_WORKERS") };

    assert!(result.is_err(), "workers = 0 from env should be rejected");
}
