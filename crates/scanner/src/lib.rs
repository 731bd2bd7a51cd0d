#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: 에러 타입 (`VulnScannerError`, `ReferenceError`, `ClientError`, `TaskError`)
//! - [`config`]: 스캐너/클라이언트 설정 (`ScannerConfig`, `QuayClientConfig`, 빌더)
//! - [`reference`]: 이미지 참조 파싱 (`ImageReference`, `ImageDigest`)
//! - [`types`]: 보고서 데이터 모델 (`VulnerabilityReport`, `ImageScanResult`, `ResultSet`)
//! - [`client`]: Quay API 추상화와 구현 (`QuayApi` trait, `QuayClient`)
//! - [`task`]: 이미지 단위 작업 (`process_image`)
//! - [`event`]: 진행 이벤트 (`ScanEvent`)
//! - [`scanner`]: 워커 풀 오케스트레이터 (`ImageScanner`, `ImageScannerBuilder`)
//!
//! # Architecture
//!
//! ```text
//! Vec<String> --> ImageScanner::run --> job queue --> worker x W
//!                                                        |
//!                                                  process_image
//!                                                        |
//!                                  ImageReference::parse + QuayApi
//!                                  (resolve_digest, fetch_vulnerabilities)
//!                                                        |
//!                                                 ImageScanResult
//!                                                        |
//!                                     results channel --> collector --> ResultSet
//!                                                        |
//!                                          (optional) ScanEvent --> progress mpsc
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod reference;
pub mod scanner;
pub mod task;
pub mod types;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{ImageScanner, ImageScannerBuilder};

// Configuration
pub use config::{QuayClientConfig, ScannerConfig, ScannerConfigBuilder};

// Error
pub use error::{ClientError, ReferenceError, TaskError, VulnScannerError};

// Events
pub use event::ScanEvent;

// Client
pub use client::{QuayApi, QuayClient};

// Reference / task
pub use reference::{ImageDigest, ImageReference};
pub use task::process_image;

// Types
pub use types::{
    Feature, ImageScanResult, Layer, ResultSet, ScanStatus, SecurityData, SeverityCounts,
    Vulnerability, VulnerabilityReport,
};
