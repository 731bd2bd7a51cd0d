//! 워커 풀 통합 테스트
//!
//! 크레이트 외부에서 구현한 `QuayApi`로 스케줄링 속성을 검증합니다.
//! 시간은 `start_paused`로 가상화하여 지연을 결정적으로 측정합니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use quayscan_scanner::{
    ClientError, ImageDigest, ImageScannerBuilder, QuayApi, ScanEvent, ScanStatus,
    ScannerConfig, VulnerabilityReport,
};

/// 모든 태그를 `digest-<repo>`로 해석하고 고정 지연 후 scanned 보고서를 반환
struct FixedLatencyApi {
    latency: Duration,
    missing_repos: Vec<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FixedLatencyApi {
    fn new(latency: Duration) -> Self {
        Self {
            latency,
            missing_repos: Vec::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_missing_repo(mut self, repo: &str) -> Self {
        self.missing_repos.push(repo.to_owned());
        self
    }
}

impl QuayApi for FixedLatencyApi {
    async fn resolve_digest(&self, repository: &str, tag: &str) -> Result<ImageDigest, ClientError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.missing_repos.iter().any(|r| r == repository) {
            return Err(ClientError::TagNotFound {
                repository: repository.to_owned(),
                tag: tag.to_owned(),
            });
        }
        ImageDigest::new(&format!("digest-{}", repository.replace('/', "-"))).ok_or_else(|| {
            ClientError::DigestNotFound {
                repository: repository.to_owned(),
                tag: tag.to_owned(),
            }
        })
    }

    async fn fetch_vulnerabilities(
        &self,
        _repository: &str,
        _digest: &ImageDigest,
    ) -> Result<VulnerabilityReport, ClientError> {
        Ok(VulnerabilityReport::with_status(ScanStatus::Scanned))
    }
}

fn refs(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("quay.io/org/app{i}:latest")).collect()
}

#[tokio::test(start_paused = true)]
async fn workers_process_in_parallel() {
    // Given: 10개 이미지, 각 100ms, 워커 5개
    let api = Arc::new(FixedLatencyApi::new(Duration::from_millis(100)));
    let scanner = ImageScannerBuilder::new(Arc::clone(&api))
        .config(ScannerConfig {
            workers: 5,
            ..Default::default()
        })
        .build()
        .unwrap();

    // When
    let started = tokio::time::Instant::now();
    let results = scanner.run(refs(10)).await;
    let elapsed = started.elapsed();

    // Then: 두 라운드 분량의 시간, 동시 실행은 워커 수 이하
    assert_eq!(results.len(), 10);
    assert!(
        elapsed >= Duration::from_millis(200),
        "finished too early: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(1000),
        "ran sequentially: {elapsed:?}"
    );
    assert!(api.max_in_flight.load(Ordering::SeqCst) <= 5);
}

#[tokio::test(start_paused = true)]
async fn failures_are_isolated_per_image() {
    let api = Arc::new(
        FixedLatencyApi::new(Duration::from_millis(10)).with_missing_repo("org/app3"),
    );
    let scanner = ImageScannerBuilder::new(api).build().unwrap();

    let results = scanner.run(refs(6)).await;

    assert_eq!(results.len(), 6);
    assert_eq!(results.failure_count(), 1);
    let failed = results.get("quay.io/org/app3:latest").unwrap();
    assert!(failed.report.is_none());
    assert!(
        failed
            .error
            .as_deref()
            .unwrap()
            .contains("tag not found: org/app3:latest")
    );
}

#[tokio::test(start_paused = true)]
async fn progress_events_pair_start_and_finish() {
    let (tx, mut rx) = mpsc::channel(128);
    let scanner = ImageScannerBuilder::new(Arc::new(FixedLatencyApi::new(Duration::from_millis(5))))
        .config(ScannerConfig {
            workers: 3,
            ..Default::default()
        })
        .progress_sender(tx)
        .build()
        .unwrap();

    scanner.run(refs(7)).await;
    drop(scanner);

    let mut seen: HashMap<String, Vec<bool>> = HashMap::new();
    let mut batch_ids = Vec::new();
    while let Some(event) = rx.recv().await {
        batch_ids.push(event.batch_id().to_owned());
        seen.entry(event.image_url().to_owned())
            .or_default()
            .push(event.is_finished());
        if let ScanEvent::TaskFinished { success, .. } = event {
            assert!(success);
        }
    }

    assert_eq!(seen.len(), 7);
    for (image, phases) in &seen {
        assert_eq!(phases, &[false, true], "{image}: started must precede finished");
    }
    batch_ids.dedup();
    assert_eq!(batch_ids.len(), 1, "all events belong to one batch");
}

#[tokio::test]
async fn empty_batch_returns_immediately() {
    let api = Arc::new(FixedLatencyApi::new(Duration::from_secs(60)));
    let scanner = ImageScannerBuilder::new(Arc::clone(&api)).build().unwrap();

    let results = scanner.run(Vec::new()).await;

    assert!(results.is_empty());
    assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 0);
}
