//! 에러 타입: 도메인별 에러 정의

/// quayscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum QuayscanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캐너 구성 에러
    #[error("scanner error: {0}")]
    Scanner(#[from] ScannerError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캐너 구성 에러
///
/// 배치 작업이 시작되기 전에만 발생합니다. 개별 이미지의 실패는
/// 결과 레코드에 기록되며 이 타입으로 전파되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// API 클라이언트 초기화 실패
    #[error("client init failed: {0}")]
    ClientInit(String),

    /// 스캐너 설정 오류
    #[error("invalid scanner config: {0}")]
    InvalidConfig(String),
}
