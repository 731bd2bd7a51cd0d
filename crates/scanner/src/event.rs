//! 스캔 진행 이벤트
//!
//! [`ScanEvent`]는 워커가 작업을 시작하거나 마칠 때 진행 채널로 보내는 이벤트입니다.
//! 전송은 `try_send`로 이루어지므로 수신자가 느려도 워커는 멈추지 않으며,
//! 채널이 가득 차면 이벤트는 버려집니다.
//!
//! # 사용 예시
//!
//! ```
//! use quayscan_scanner::ScanEvent;
//!
//! let event = ScanEvent::started("batch-1", 0, "quay.io/org/app:v1");
//! assert_eq!(event.image_url(), "quay.io/org/app:v1");
//! assert!(!event.is_finished());
//! ```

use std::fmt;
use std::time::Duration;

/// 작업 진행 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// 워커가 참조 하나를 꺼내 처리를 시작함
    TaskStarted {
        batch_id: String,
        worker_id: usize,
        image_url: String,
    },
    /// 처리가 끝나 결과가 수집기로 전달됨
    TaskFinished {
        batch_id: String,
        worker_id: usize,
        image_url: String,
        success: bool,
        /// 보고된 취약점 수
        vulnerabilities: usize,
        elapsed: Duration,
    },
}

impl ScanEvent {
    pub fn started(batch_id: impl Into<String>, worker_id: usize, image_url: impl Into<String>) -> Self {
        Self::TaskStarted {
            batch_id: batch_id.into(),
            worker_id,
            image_url: image_url.into(),
        }
    }

    pub fn image_url(&self) -> &str {
        match self {
            Self::TaskStarted { image_url, .. } | Self::TaskFinished { image_url, .. } => {
                image_url
            }
        }
    }

    pub fn batch_id(&self) -> &str {
        match self {
            Self::TaskStarted { batch_id, .. } | Self::TaskFinished { batch_id, .. } => batch_id,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::TaskFinished { .. })
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskStarted {
                batch_id,
                worker_id,
                image_url,
            } => write!(
                f,
                "ScanEvent[{}] worker={worker_id} started {image_url}",
                &batch_id[..8.min(batch_id.len())]
            ),
            Self::TaskFinished {
                batch_id,
                worker_id,
                image_url,
                success,
                vulnerabilities,
                elapsed,
            } => write!(
                f,
                "ScanEvent[{}] worker={worker_id} finished {image_url} success={success} vulns={vulnerabilities} elapsed={}ms",
                &batch_id[..8.min(batch_id.len())],
                elapsed.as_millis()
            ),
        }
    }
}
