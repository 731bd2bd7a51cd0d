//! 스캐너 에러 타입
//!
//! 스캐너의 에러는 두 계층으로 나뉩니다.
//!
//! - **구성 에러** ([`VulnScannerError`]): 클라이언트/스캐너 생성 시점에 발생하며
//!   배치 작업 시작 전에 호출자에게 전파됩니다.
//!   `From<VulnScannerError> for QuayscanError` 구현으로 `?` 연산자를 통해
//!   상위 에러 타입으로 전파됩니다.
//! - **이미지 단위 에러** ([`ReferenceError`], [`ClientError`], [`TaskError`]):
//!   개별 이미지 처리 중 발생하며 결과 레코드의 `error` 문자열로 기록됩니다.
//!   배치를 중단시키지 않습니다.

use quayscan_core::error::{QuayscanError, ScannerError};

use crate::types::VulnerabilityReport;

/// 스캐너 구성 에러
#[derive(Debug, thiserror::Error)]
pub enum VulnScannerError {
    /// 설정 값 오류
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 초기화 실패
    #[error("client init failed: {0}")]
    ClientInit(String),
}

impl From<VulnScannerError> for QuayscanError {
    fn from(err: VulnScannerError) -> Self {
        match err {
            VulnScannerError::Config { field, reason } => QuayscanError::Scanner(
                ScannerError::InvalidConfig(format!("{field}: {reason}")),
            ),
            VulnScannerError::ClientInit(msg) => {
                QuayscanError::Scanner(ScannerError::ClientInit(msg))
            }
        }
    }
}

/// 이미지 참조 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// `quay.io/` 접두어가 없음
    #[error("invalid image reference '{input}': must start with 'quay.io/'")]
    BadPrefix { input: String },

    /// `<repository>:<tag>` 형식이 아니거나 한쪽이 비어 있음
    #[error("invalid image reference '{input}': expected quay.io/<repository>:<tag>")]
    BadFormat { input: String },

    /// 저장소나 태그에 `..`가 있거나 태그에 `/`가 있음
    #[error(
        "invalid image reference '{input}': repository and tag must not contain '..', tag must not contain '/'"
    )]
    InvalidChars { input: String },
}

/// Quay API 호출 에러
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 태그 조회 결과 404
    #[error("tag not found: {repository}:{tag}")]
    TagNotFound { repository: String, tag: String },

    /// 보안 보고서 조회 결과 404
    #[error("security report not found: {repository}@{digest}")]
    ReportNotFound { repository: String, digest: String },

    /// 태그 상세 정보에 다이제스트가 없음
    #[error("no image digest in tag details for {repository}:{tag}")]
    DigestNotFound { repository: String, tag: String },

    /// 그 밖의 비정상 HTTP 상태
    ///
    /// `body_snippet`은 응답 본문의 앞부분 최대 512바이트입니다.
    #[error("request failed with status {status}: {body_snippet}")]
    RequestFailed { status: u16, body_snippet: String },

    /// 전송 실패 또는 타임아웃
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 응답 본문 디코딩 실패
    ///
    /// 본문에서 상태값만이라도 읽을 수 있었다면 `partial`에 담깁니다.
    #[error("failed to decode response: {reason}")]
    Decode {
        reason: String,
        partial: Option<Box<VulnerabilityReport>>,
    },
}

impl ClientError {
    /// 에러에 동반된 부분 보고서를 꺼냅니다.
    pub fn take_partial(&mut self) -> Option<VulnerabilityReport> {
        match self {
            Self::Decode { partial, .. } => partial.take().map(|report| *report),
            _ => None,
        }
    }

    /// 메트릭/로그용 짧은 분류명
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TagNotFound { .. } => "tag_not_found",
            Self::ReportNotFound { .. } => "report_not_found",
            Self::DigestNotFound { .. } => "digest_not_found",
            Self::RequestFailed { .. } => "request_failed",
            Self::Network(_) => "network",
            Self::Decode { .. } => "decode",
        }
    }
}

/// 이미지 단위 작업 에러
///
/// 실패한 단계를 구분하며, `Display` 출력이 결과 레코드의 `error` 문자열이 됩니다.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("parsing failed: {0}")]
    Parse(#[source] ReferenceError),

    #[error("resolving image id failed: {0}")]
    ResolveDigest(#[source] ClientError),

    #[error("fetching vulnerabilities failed: {0}")]
    FetchVulnerabilities(#[source] ClientError),
}

impl TaskError {
    /// 메트릭 `stage` 레이블 값
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::ResolveDigest(_) => "resolve_digest",
            Self::FetchVulnerabilities(_) => "fetch_vulnerabilities",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanStatus;

    #[test]
    fn config_error_converts_to_scanner_error() {
        let err = VulnScannerError::Config {
            field: "workers".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let top: QuayscanError = err.into();
        assert!(matches!(
            top,
            QuayscanError::Scanner(ScannerError::InvalidConfig(_))
        ));
        assert!(top.to_string().contains("workers"));
    }

    #[test]
    fn client_init_converts_to_scanner_error() {
        let top: QuayscanError = VulnScannerError::ClientInit("tls".to_owned()).into();
        assert!(matches!(
            top,
            QuayscanError::Scanner(ScannerError::ClientInit(_))
        ));
    }

    #[test]
    fn task_error_messages_carry_stage_prefix() {
        let parse = TaskError::Parse(ReferenceError::BadPrefix {
            input: "docker.io/x:y".to_owned(),
        });
        assert!(parse.to_string().starts_with("parsing failed: "));
        assert!(parse.to_string().contains("docker.io/x:y"));

        let resolve = TaskError::ResolveDigest(ClientError::TagNotFound {
            repository: "org/app".to_owned(),
            tag: "v1".to_owned(),
        });
        assert_eq!(
            resolve.to_string(),
            "resolving image id failed: tag not found: org/app:v1"
        );

        let fetch = TaskError::FetchVulnerabilities(ClientError::RequestFailed {
            status: 500,
            body_snippet: "boom".to_owned(),
        });
        assert_eq!(
            fetch.to_string(),
            "fetching vulnerabilities failed: request failed with status 500: boom"
        );
    }

    #[test]
    fn take_partial_only_from_decode() {
        let mut decode = ClientError::Decode {
            reason: "bad features".to_owned(),
            partial: Some(Box::new(VulnerabilityReport::with_status(
                ScanStatus::Scanned,
            ))),
        };
        let partial = decode.take_partial().expect("decode carries partial report");
        assert_eq!(partial.status, ScanStatus::Scanned);
        assert!(decode.take_partial().is_none(), "partial is taken once");

        let mut other = ClientError::RequestFailed {
            status: 503,
            body_snippet: String::new(),
        };
        assert!(other.take_partial().is_none());
    }

    #[test]
    fn stage_labels() {
        let err = TaskError::Parse(ReferenceError::BadFormat {
            input: "quay.io/x".to_owned(),
        });
        assert_eq!(err.stage(), "parse");
    }
}
