//! 이미지 단위 작업
//!
//! 참조 문자열 하나를 파싱, 다이제스트 조회, 보고서 조회의 세 단계로 처리하여
//! 항상 [`ImageScanResult`] 하나를 만듭니다. 재시도는 하지 않습니다.

use metrics::counter;
use tracing::debug;

use quayscan_core::metrics::{IMAGE_SCAN_FAILURES_TOTAL, LABEL_STAGE};

use crate::client::QuayApi;
use crate::error::TaskError;
use crate::reference::ImageReference;
use crate::types::{ImageScanResult, VulnerabilityReport};

/// 이미지 하나를 처리합니다.
///
/// 실패는 반환값의 `error`에 `"<단계> failed: <원인>"` 형식으로 기록되며,
/// 보고서 디코딩이 부분적으로 성공했다면 부분 보고서가 함께 첨부됩니다.
pub async fn process_image<C: QuayApi>(image_url: &str, client: &C) -> ImageScanResult {
    match scan(image_url, client).await {
        Ok(report) => ImageScanResult::success(image_url, report),
        Err(mut err) => {
            debug!(image = image_url, stage = err.stage(), error = %err, "image scan failed");
            counter!(IMAGE_SCAN_FAILURES_TOTAL, LABEL_STAGE => err.stage()).increment(1);
            let partial = match &mut err {
                TaskError::FetchVulnerabilities(cause) => cause.take_partial(),
                _ => None,
            };
            ImageScanResult::failure_with_partial(image_url, err, partial)
        }
    }
}

/// 단계별로 실패를 구분하여 보고서를 조회합니다.
pub async fn scan<C: QuayApi>(
    image_url: &str,
    client: &C,
) -> Result<VulnerabilityReport, TaskError> {
    let image = ImageReference::parse(image_url).map_err(TaskError::Parse)?;

    let digest = client
        .resolve_digest(image.repository(), image.tag())
        .await
        .map_err(TaskError::ResolveDigest)?;
    debug!(image = image_url, digest = %digest, "digest resolved");

    client
        .fetch_vulnerabilities(image.repository(), &digest)
        .await
        .map_err(TaskError::FetchVulnerabilities)
}
