//! 메트릭 이름 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 스캐너는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 모든 호출은 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `quayscan_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(quayscan_core::metrics::IMAGES_SCANNED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 실패 단계 레이블 키 (parse, resolve_digest, fetch_vulnerabilities)
pub const LABEL_STAGE: &str = "stage";

// ─── Scanner 메트릭 ────────────────────────────────────────────────

/// 처리된 이미지 수 (counter, label: result)
pub const IMAGES_SCANNED_TOTAL: &str = "quayscan_images_scanned_total";

/// 단계별 이미지 처리 실패 수 (counter, label: stage)
pub const IMAGE_SCAN_FAILURES_TOTAL: &str = "quayscan_image_scan_failures_total";

/// 이미지 하나의 처리 시간 (histogram, 초)
pub const IMAGE_SCAN_DURATION_SECONDS: &str = "quayscan_image_scan_duration_seconds";

/// 배치 전체 처리 시간 (histogram, 초)
pub const BATCH_DURATION_SECONDS: &str = "quayscan_batch_duration_seconds";

/// 발견된 취약점 수 (counter)
pub const VULNERABILITIES_FOUND_TOTAL: &str = "quayscan_vulnerabilities_found_total";
