//! Quay REST API 클라이언트
//!
//! [`QuayApi`] trait은 이미지 하나를 조회하는 두 단계 원격 호출을 추상화합니다.
//! 프로덕션 코드는 [`QuayClient`] (reqwest)를, 테스트는 `MockQuayClient`를 사용합니다.
//!
//! ```text
//!        ImageScanner / process_image
//!                    │
//!                    ▼
//!             ┌────────────┐
//!             │  QuayApi   │ (trait)
//!             └────────────┘
//!               │        │
//!               ▼        ▼
//!        ┌──────────┐ ┌──────┐
//!        │QuayClient│ │ Mock │
//!        └────┬─────┘ └──────┘
//!             │
//!             ▼
//!   GET {base}repository/{repo}/tag/{tag}
//!   GET {base}repository/{repo}/image/{digest}/security?vulnerabilities=true
//! ```
//!
//! # 에러 매핑
//!
//! | 상황 | 에러 |
//! |---|---|
//! | 태그 조회 404 | [`ClientError::TagNotFound`] |
//! | 보고서 조회 404 | [`ClientError::ReportNotFound`] |
//! | 그 밖의 non-2xx | [`ClientError::RequestFailed`] (본문 최대 512바이트) |
//! | 전송 실패/타임아웃 | [`ClientError::Network`] |
//! | 본문 디코딩 실패 | [`ClientError::Decode`] |

use std::future::Future;

use reqwest::{StatusCode, Url, header};
use serde::Deserialize;
use tracing::{debug, warn};

use quayscan_core::config::DEFAULT_USER_AGENT;

use crate::config::QuayClientConfig;
use crate::error::{ClientError, VulnScannerError};
use crate::reference::ImageDigest;
use crate::types::{ScanStatus, VulnerabilityReport};

/// 에러 응답 본문에서 보존할 최대 바이트 수
pub const MAX_BODY_SNIPPET: usize = 512;

/// Quay API 추상화
///
/// `Send + Sync + 'static`이므로 `Arc`로 감싸 여러 워커 태스크가 공유할 수 있습니다.
/// 구현체는 호출 간에 변경 가능한 상태를 갖지 않아야 합니다.
pub trait QuayApi: Send + Sync + 'static {
    /// 태그가 가리키는 이미지 다이제스트를 조회합니다.
    ///
    /// `manifest_digest`를 우선 사용하고, 없으면 `docker_image_id`를 사용합니다.
    ///
    /// # Errors
    ///
    /// - [`ClientError::TagNotFound`]: 404
    /// - [`ClientError::DigestNotFound`]: 두 필드 모두 없거나 비어 있음
    fn resolve_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> impl Future<Output = Result<ImageDigest, ClientError>> + Send;

    /// 다이제스트의 보안 스캔 보고서를 조회합니다.
    ///
    /// `scanned`가 아닌 상태도 에러가 아니며 그대로 반환됩니다.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ReportNotFound`]: 404
    /// - [`ClientError::Decode`]: 본문 디코딩 실패 (상태값을 읽을 수 있으면 부분 보고서 포함)
    fn fetch_vulnerabilities(
        &self,
        repository: &str,
        digest: &ImageDigest,
    ) -> impl Future<Output = Result<VulnerabilityReport, ClientError>> + Send;
}

/// 태그 상세 응답 중 사용하는 필드
#[derive(Debug, Default, Deserialize)]
struct TagDetail {
    #[serde(default)]
    manifest_digest: Option<String>,
    #[serde(default)]
    docker_image_id: Option<String>,
}

impl TagDetail {
    fn digest(&self) -> Option<ImageDigest> {
        self.manifest_digest
            .as_deref()
            .and_then(ImageDigest::new)
            .or_else(|| self.docker_image_id.as_deref().and_then(ImageDigest::new))
    }
}

/// reqwest 기반 프로덕션 클라이언트
///
/// 내부 `reqwest::Client`는 연결 풀을 공유하므로 인스턴스 하나를 `Arc`로 공유하면 됩니다.
/// 타임아웃, User-Agent, 인증 헤더는 생성 시 고정됩니다.
#[derive(Debug, Clone)]
pub struct QuayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl QuayClient {
    /// 설정으로부터 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// - [`VulnScannerError::Config`]: 잘못된 기본 URL, 0 타임아웃, 헤더에 쓸 수 없는 값
    /// - [`VulnScannerError::ClientInit`]: HTTP 클라이언트 초기화 실패
    pub fn new(config: QuayClientConfig) -> Result<Self, VulnScannerError> {
        config.validate()?;
        let base_url = parse_base_url(&config.api_base_url)?;

        let user_agent = if config.user_agent.trim().is_empty() {
            warn!(
                default = DEFAULT_USER_AGENT,
                "empty user agent configured, using default"
            );
            DEFAULT_USER_AGENT
        } else {
            config.user_agent.as_str()
        };

        let mut headers = header::HeaderMap::new();
        let user_agent =
            header::HeaderValue::from_str(user_agent).map_err(|e| VulnScannerError::Config {
                field: "user_agent".to_owned(),
                reason: e.to_string(),
            })?;
        headers.insert(header::USER_AGENT, user_agent);

        if let Some(token) = &config.token {
            let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| VulnScannerError::Config {
                    field: "token".to_owned(),
                    reason: "token contains characters not allowed in a header".to_owned(),
                })?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| VulnScannerError::ClientInit(e.to_string()))?;

        debug!(
            base_url = %base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            authenticated = config.token.is_some(),
            "quay client initialized"
        );

        Ok(Self { http, base_url })
    }

    /// 정규화된 기본 URL (항상 `/`로 끝남)
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `repository/{repo}/tag/{tag}` 엔드포인트
    ///
    /// 저장소의 `/` 구조는 유지하고, 태그는 하나의 경로 세그먼트로 인코딩합니다.
    pub fn tag_url(&self, repository: &str, tag: &str) -> Url {
        self.endpoint(repository, &["tag", tag])
    }

    /// `repository/{repo}/image/{digest}/security?vulnerabilities=true` 엔드포인트
    pub fn security_url(&self, repository: &str, digest: &ImageDigest) -> Url {
        let mut url = self.endpoint(repository, &["image", digest.as_str(), "security"]);
        url.query_pairs_mut().append_pair("vulnerabilities", "true");
        url
    }

    fn endpoint(&self, repository: &str, suffix: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URL은 항상 경로 세그먼트를 가질 수 있음
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("repository")
                .extend(repository.split('/'))
                .extend(suffix);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        debug!(url = %url, "GET");
        let response = self.http.get(url).send().await?;
        debug!(status = response.status().as_u16(), "response received");
        Ok(response)
    }
}

impl QuayApi for QuayClient {
    async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<ImageDigest, ClientError> {
        let response = self.get(self.tag_url(repository, tag)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ClientError::TagNotFound {
                    repository: repository.to_owned(),
                    tag: tag.to_owned(),
                });
            }
            status if !status.is_success() => return Err(request_failed(response).await),
            _ => {}
        }

        let body = response.bytes().await?;
        let detail: TagDetail =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
                reason: format!("tag details: {e}"),
                partial: None,
            })?;

        detail.digest().ok_or_else(|| ClientError::DigestNotFound {
            repository: repository.to_owned(),
            tag: tag.to_owned(),
        })
    }

    async fn fetch_vulnerabilities(
        &self,
        repository: &str,
        digest: &ImageDigest,
    ) -> Result<VulnerabilityReport, ClientError> {
        let response = self.get(self.security_url(repository, digest)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ClientError::ReportNotFound {
                    repository: repository.to_owned(),
                    digest: digest.to_string(),
                });
            }
            status if !status.is_success() => return Err(request_failed(response).await),
            _ => {}
        }

        let body = response.bytes().await?;
        let report: VulnerabilityReport = match serde_json::from_slice(&body) {
            Ok(report) => report,
            Err(e) => {
                return Err(ClientError::Decode {
                    reason: format!("security report: {e}"),
                    partial: status_only_report(&body).map(Box::new),
                });
            }
        };

        if !report.is_scanned() {
            warn!(
                repository,
                digest = %digest,
                status = %report.status,
                "scan status is not 'scanned', vulnerability data may be incomplete"
            );
        }

        Ok(report)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, VulnScannerError> {
    let mut url = Url::parse(raw).map_err(|e| VulnScannerError::Config {
        field: "api_base_url".to_owned(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(VulnScannerError::Config {
            field: "api_base_url".to_owned(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// non-2xx 응답을 [`ClientError::RequestFailed`]로 변환합니다.
///
/// 본문은 청크 단위로 읽으며 [`MAX_BODY_SNIPPET`]바이트에서 멈춥니다.
async fn request_failed(mut response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let mut buf = Vec::with_capacity(MAX_BODY_SNIPPET);

    while buf.len() < MAX_BODY_SNIPPET {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(MAX_BODY_SNIPPET - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "failed to read error response body");
                break;
            }
        }
    }

    ClientError::RequestFailed {
        status,
        body_snippet: truncate_to_char_boundary(String::from_utf8_lossy(&buf).into_owned()),
    }
}

fn truncate_to_char_boundary(mut s: String) -> String {
    if s.len() > MAX_BODY_SNIPPET {
        let mut end = MAX_BODY_SNIPPET;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
    s
}

/// 전체 디코딩에 실패한 본문에서 `status` 문자열만 추출합니다.
fn status_only_report(body: &[u8]) -> Option<VulnerabilityReport> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let status = value.get("status")?.as_str()?;
    Some(VulnerabilityReport::with_status(ScanStatus::from(
        status.to_owned(),
    )))
}

// ─── 테스트용 Mock ──────────────────────────────────────────────────

#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::time::Duration;

/// 테스트용 Mock Quay 클라이언트
///
/// 네트워크 없이 태그/보고서 응답을 설정할 수 있고, 호출 횟수와
/// 최대 동시 실행 수를 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockQuayClient {
    /// "repo:tag" → 다이제스트 원문
    digests: HashMap<String, String>,
    /// 다이제스트 → 보고서
    reports: HashMap<String, VulnerabilityReport>,
    /// 다이제스트 → 디코딩 실패 시 부분 상태
    decode_failures: HashMap<String, ScanStatus>,
    /// 500을 반환할 "repo:tag"
    failing_tags: HashSet<String>,
    /// 조회 중 패닉할 "repo:tag"
    panicking_tags: HashSet<String>,
    delay: Option<Duration>,
    resolve_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[cfg(test)]
impl MockQuayClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 태그 → 다이제스트 응답을 추가합니다.
    pub fn with_image(mut self, repository: &str, tag: &str, digest: &str) -> Self {
        self.digests
            .insert(format!("{repository}:{tag}"), digest.to_owned());
        self
    }

    /// 다이제스트 → 보고서 응답을 추가합니다 (`sha256:` 없이).
    pub fn with_report(mut self, digest: &str, report: VulnerabilityReport) -> Self {
        self.reports.insert(digest.to_owned(), report);
        self
    }

    /// 보고서 조회가 디코딩 실패하도록 설정합니다.
    pub fn with_decode_failure(mut self, digest: &str, status: ScanStatus) -> Self {
        self.decode_failures.insert(digest.to_owned(), status);
        self
    }

    /// 태그 조회가 500으로 실패하도록 설정합니다.
    pub fn with_failing_tag(mut self, repository: &str, tag: &str) -> Self {
        self.failing_tags.insert(format!("{repository}:{tag}"));
        self
    }

    /// 태그 조회 중 패닉하도록 설정합니다 (태스크 비정상 종료 재현용).
    pub fn with_panicking_tag(mut self, repository: &str, tag: &str) -> Self {
        self.panicking_tags.insert(format!("{repository}:{tag}"));
        self
    }

    /// 각 태그 조회에 지연을 추가합니다.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// 관측된 최대 동시 태그 조회 수
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
impl QuayApi for MockQuayClient {
    async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<ImageDigest, ClientError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = format!("{repository}:{tag}");
        if self.panicking_tags.contains(&key) {
            panic!("mock panic while resolving {key}");
        }
        if self.failing_tags.contains(&key) {
            return Err(ClientError::RequestFailed {
                status: 500,
                body_snippet: "internal error".to_owned(),
            });
        }

        match self.digests.get(&key) {
            Some(raw) => ImageDigest::new(raw).ok_or_else(|| ClientError::DigestNotFound {
                repository: repository.to_owned(),
                tag: tag.to_owned(),
            }),
            None => Err(ClientError::TagNotFound {
                repository: repository.to_owned(),
                tag: tag.to_owned(),
            }),
        }
    }

    async fn fetch_vulnerabilities(
        &self,
        repository: &str,
        digest: &ImageDigest,
    ) -> Result<VulnerabilityReport, ClientError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(status) = self.decode_failures.get(digest.as_str()) {
            return Err(ClientError::Decode {
                reason: "mock decode failure".to_owned(),
                partial: Some(Box::new(VulnerabilityReport::with_status(status.clone()))),
            });
        }

        self.reports
            .get(digest.as_str())
            .cloned()
            .ok_or_else(|| ClientError::ReportNotFound {
                repository: repository.to_owned(),
                digest: digest.to_string(),
            })
    }
}
