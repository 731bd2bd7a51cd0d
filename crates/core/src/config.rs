//! 설정 관리: quayscan.toml 파싱 및 런타임 설정
//!
//! [`QuayscanConfig`]는 모든 구성 요소의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`QUAYSCAN_QUAY_TIMEOUT_SECS=30` 형식, 토큰은 `QUAY_TOKEN`)
//! 3. 설정 파일 (`quayscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), quayscan_core::error::QuayscanError> {
//! use quayscan_core::config::QuayscanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 (파일이 없으면 기본값)
//! let config = QuayscanConfig::load_or_default("quayscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = QuayscanConfig::parse("[scan]\nworkers = 8")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, QuayscanError};

/// 기본 Quay API 주소
pub const DEFAULT_API_BASE_URL: &str = "https://quay.io/api/v1/";

/// 기본 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("quayscan/", env!("CARGO_PKG_VERSION"));

/// API 토큰 환경변수
pub const TOKEN_ENV_VAR: &str = "QUAY_TOKEN";

/// 요청 타임아웃 상한 (초)
const MAX_TIMEOUT_SECS: u64 = 300;

/// quayscan 통합 설정
///
/// `quayscan.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuayscanConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// Quay API 클라이언트 설정
    #[serde(default)]
    pub quay: QuayConfig,
    /// 스캔 실행 설정
    #[serde(default)]
    pub scan: ScanConfig,
}

impl QuayscanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QuayscanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값으로 대체하여 로드합니다.
    ///
    /// 파일이 존재하지만 읽기/파싱에 실패하면 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, QuayscanError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => {
                info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(QuayscanError::Config(ConfigError::FileNotFound { .. })) => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, QuayscanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QuayscanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                QuayscanError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, QuayscanError> {
        toml::from_str(toml_str).map_err(|e| {
            QuayscanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `QUAYSCAN_{SECTION}_{FIELD}`
    /// 예: `QUAYSCAN_QUAY_API_BASE_URL=https://quay.example.com/api/v1/`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "QUAYSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "QUAYSCAN_GENERAL_LOG_FORMAT");

        // Quay
        override_string(&mut self.quay.api_base_url, "QUAYSCAN_QUAY_API_BASE_URL");
        override_u64(&mut self.quay.timeout_secs, "QUAYSCAN_QUAY_TIMEOUT_SECS");
        override_string(&mut self.quay.user_agent, "QUAYSCAN_QUAY_USER_AGENT");
        override_optional_string(&mut self.quay.token, TOKEN_ENV_VAR);

        // Scan
        override_usize(&mut self.scan.workers, "QUAYSCAN_SCAN_WORKERS");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), QuayscanError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // api_base_url 검증
        let url = self.quay.api_base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "quay.api_base_url".to_owned(),
                reason: format!("'{url}' must start with http:// or https://"),
            }
            .into());
        }

        if self.quay.timeout_secs == 0 || self.quay.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "quay.timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.scan.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.workers".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Quay API 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuayConfig {
    /// API 기본 주소 (예: `https://quay.io/api/v1/`)
    pub api_base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// User-Agent 헤더 값
    pub user_agent: String,
    /// Bearer 토큰 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl QuayConfig {
    /// 타임아웃을 `Duration`으로 반환합니다.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QuayConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            token: None,
        }
    }
}

/// 스캔 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 동시 작업자 수
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { workers: 5 }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_optional_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        if !val.is_empty() {
            *target = Some(val);
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
