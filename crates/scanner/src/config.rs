//! 스캐너 설정
//!
//! - [`ScannerConfig`]: 워커 풀 크기와 결과 채널 용량
//! - [`QuayClientConfig`]: API 기본 URL, 타임아웃, User-Agent, 인증 토큰
//!
//! 두 설정 모두 core의 [`QuayscanConfig`](quayscan_core::QuayscanConfig) 섹션에서
//! `from_core`로 파생됩니다.
//!
//! # 사용 예시
//!
//! ```
//! use quayscan_scanner::{ScannerConfig, ScannerConfigBuilder};
//!
//! let config = ScannerConfig::default();
//! config.validate().unwrap();
//!
//! let config = ScannerConfigBuilder::new()
//!     .workers(8)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.workers, 8);
//! ```

use std::fmt;
use std::time::Duration;

use quayscan_core::config::{DEFAULT_API_BASE_URL, DEFAULT_USER_AGENT, QuayConfig, ScanConfig};
use serde::{Deserialize, Serialize};

use crate::error::VulnScannerError;

/// 기본 워커 수
pub const DEFAULT_WORKERS: usize = 5;

/// 기본 결과 채널 용량
pub const DEFAULT_RESULT_CHANNEL_CAPACITY: usize = 64;

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// 워커 풀 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 동시 작업자 수 (1 이상)
    pub workers: usize,
    /// 워커 → 수집기 결과 채널 용량
    pub result_channel_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            result_channel_capacity: DEFAULT_RESULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScannerConfig {
    /// core의 `[scan]` 섹션에서 생성합니다.
    pub fn from_core(core: &ScanConfig) -> Self {
        Self {
            workers: core.workers,
            ..Self::default()
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VulnScannerError> {
        if self.workers == 0 {
            return Err(VulnScannerError::Config {
                field: "workers".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.result_channel_capacity == 0 {
            return Err(VulnScannerError::Config {
                field: "result_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// [`ScannerConfig`] 빌더
#[derive(Debug, Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn result_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.result_channel_capacity = capacity;
        self
    }

    /// 검증 후 설정을 반환합니다.
    pub fn build(self) -> Result<ScannerConfig, VulnScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Quay API 클라이언트 설정
#[derive(Clone, PartialEq, Eq)]
pub struct QuayClientConfig {
    /// API 기본 URL (예: `https://quay.io/api/v1/`)
    pub api_base_url: String,
    /// 요청 하나의 전체 타임아웃
    pub timeout: Duration,
    /// User-Agent 헤더. 비어 있으면 기본값을 사용합니다.
    pub user_agent: String,
    /// Bearer 토큰
    pub token: Option<String>,
}

impl Default for QuayClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            token: None,
        }
    }
}

impl QuayClientConfig {
    /// core의 `[quay]` 섹션에서 생성합니다.
    pub fn from_core(core: &QuayConfig) -> Self {
        Self {
            api_base_url: core.api_base_url.clone(),
            timeout: core.timeout(),
            user_agent: core.user_agent.clone(),
            token: core.token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// 토큰을 덮어씁니다. 빈 문자열은 무시됩니다.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.token = Some(token);
        }
        self
    }

    /// 타임아웃을 검증합니다. URL 검증은 클라이언트 생성 시 수행됩니다.
    pub fn validate(&self) -> Result<(), VulnScannerError> {
        if self.timeout.is_zero() {
            return Err(VulnScannerError::Config {
                field: "timeout".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

// 토큰이 로그에 남지 않도록 Debug를 직접 구현
impl fmt::Debug for QuayClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuayClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}
