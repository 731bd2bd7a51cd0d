//! 이미지 스캐너 오케스트레이터: 워커 풀과 결과 수집
//!
//! [`ImageScanner::run`]은 참조 목록 하나를 배치로 처리합니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//!  image_refs ──prefill──> [job queue (cap N, closed)]
//!                                  │ Arc<Mutex<Receiver>>
//!              ┌───────────────────┼───────────────────┐
//!              ▼                   ▼                   ▼
//!          worker 0            worker 1    ...     worker W-1
//!       process_image       process_image        process_image
//!              │                   │                   │
//!              └───────> [results (bounded)] <─────────┘
//!                                  │
//!                                  ▼
//!                          collector (N건 수신)
//!                                  │
//!                                  ▼
//!                              ResultSet
//! ```
//!
//! - 작업 큐는 시작 전에 모두 채워지고 닫히므로 생산자는 절대 대기하지 않습니다.
//! - `ResultSet`은 수집 태스크만 수정합니다.
//! - 이미지 하나의 처리는 별도 태스크에서 실행되므로, 패닉이 나도 해당 참조만
//!   실패로 기록되고 워커는 다음 작업을 계속 가져갑니다.
//! - 워커가 결과를 보내지 못하고 종료되더라도 모든 입력은 결과를 하나씩 가집니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, debug, error, info, info_span, warn};

use quayscan_core::metrics as m;

use crate::client::QuayApi;
use crate::config::ScannerConfig;
use crate::error::VulnScannerError;
use crate::event::ScanEvent;
use crate::task::process_image;
use crate::types::{ImageScanResult, ResultSet};

/// 워커가 결과 없이 종료된 참조에 기록되는 에러
pub const WORKER_LOST_ERROR: &str = "worker terminated before producing a result";

/// 이미지 처리 태스크가 비정상 종료(패닉)된 참조에 기록되는 에러
pub const TASK_ABORTED_ERROR: &str = "image task terminated abnormally";

type JobQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// 이미지 스캐너
///
/// 하나의 클라이언트를 모든 워커가 `Arc`로 공유합니다.
/// `run`은 여러 번 호출할 수 있으며, 호출마다 독립된 배치로 처리됩니다.
pub struct ImageScanner<C: QuayApi> {
    client: Arc<C>,
    config: ScannerConfig,
    progress_tx: Option<mpsc::Sender<ScanEvent>>,
    batches_completed: Arc<AtomicU64>,
    images_processed: Arc<AtomicU64>,
}

impl<C: QuayApi> ImageScanner<C> {
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// 완료된 배치 수
    pub fn batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::Relaxed)
    }

    /// 누적 처리된 이미지 수 (중복 입력 포함)
    pub fn images_processed(&self) -> u64 {
        self.images_processed.load(Ordering::Relaxed)
    }

    /// 참조 목록을 동시에 처리하고 결과를 수집합니다.
    ///
    /// 개별 실패는 결과 레코드에 기록되며 배치를 중단시키지 않습니다.
    /// 빈 입력은 워커를 생성하지 않고 즉시 빈 결과를 반환합니다.
    pub async fn run(&self, image_refs: Vec<String>) -> ResultSet {
        let total = image_refs.len();
        if total == 0 {
            debug!("no image references given, nothing to scan");
            return ResultSet::new();
        }

        let batch_id: Arc<str> = Arc::from(uuid::Uuid::new_v4().to_string());
        let worker_count = self.config.workers.min(total);
        let started = Instant::now();

        info!(
            batch_id = %batch_id,
            images = total,
            workers = worker_count,
            "starting scan batch"
        );

        // 작업 큐: 용량 N으로 전부 채운 뒤 닫음
        let (job_tx, job_rx) = mpsc::channel::<String>(total);
        for image_url in &image_refs {
            if let Err(e) = job_tx.try_send(image_url.clone()) {
                warn!(image = %image_url, error = %e, "failed to enqueue image reference");
            }
        }
        drop(job_tx);
        let jobs: JobQueue = Arc::new(Mutex::new(job_rx));

        let capacity = self.config.result_channel_capacity.min(total);
        let (result_tx, result_rx) = mpsc::channel::<ImageScanResult>(capacity);
        let collector = tokio::spawn(
            collect_results(result_rx, total).instrument(info_span!("collector", batch_id = %batch_id)),
        );

        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = Worker {
                id: worker_id,
                batch_id: Arc::clone(&batch_id),
                client: Arc::clone(&self.client),
                jobs: Arc::clone(&jobs),
                results: result_tx.clone(),
                progress: self.progress_tx.clone(),
            };
            let span = info_span!("worker", worker_id, batch_id = %batch_id);
            handles.push(tokio::spawn(worker.run().instrument(span)));
        }
        // 수집기는 모든 워커의 송신자가 닫히면 종료됨
        drop(result_tx);

        for (worker_id, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker_id, error = %e, "worker task terminated abnormally");
            }
        }

        let mut results = match collector.await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "result collector terminated abnormally");
                ResultSet::new()
            }
        };

        for image_url in image_refs {
            if !results.contains(&image_url) {
                warn!(image = %image_url, "no result produced for image reference");
                results.insert(ImageScanResult::failure(image_url, WORKER_LOST_ERROR));
            }
        }

        let elapsed = started.elapsed();
        histogram!(m::BATCH_DURATION_SECONDS).record(elapsed.as_secs_f64());
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
        self.images_processed
            .fetch_add(total as u64, Ordering::Relaxed);

        info!(
            batch_id = %batch_id,
            images = results.len(),
            succeeded = results.success_count(),
            failed = results.failure_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "scan batch completed"
        );

        results
    }
}

/// 결과 채널에서 최대 `expected`건을 받아 집계합니다.
///
/// 모든 송신자가 닫히면 `expected`에 못 미쳐도 종료합니다.
async fn collect_results(
    mut rx: mpsc::Receiver<ImageScanResult>,
    expected: usize,
) -> ResultSet {
    let mut results = ResultSet::with_capacity(expected);
    let mut received = 0;

    while received < expected {
        match rx.recv().await {
            Some(result) => {
                received += 1;
                results.insert(result);
            }
            None => {
                warn!(received, expected, "result channel closed early");
                break;
            }
        }
    }

    debug!(received, "collector finished");
    results
}

struct Worker<C: QuayApi> {
    id: usize,
    batch_id: Arc<str>,
    client: Arc<C>,
    jobs: JobQueue,
    results: mpsc::Sender<ImageScanResult>,
    progress: Option<mpsc::Sender<ScanEvent>>,
}

impl<C: QuayApi> Worker<C> {
    async fn run(self) {
        let mut handled = 0usize;

        loop {
            let next = self.jobs.lock().await.recv().await;
            let Some(image_url) = next else {
                break;
            };

            self.emit(ScanEvent::started(self.batch_id.as_ref(), self.id, image_url.as_str()));

            let task_started = Instant::now();
            let result = self.process_isolated(&image_url).await;
            let elapsed = task_started.elapsed();
            record_task_metrics(&result, elapsed);

            let event = ScanEvent::TaskFinished {
                batch_id: self.batch_id.to_string(),
                worker_id: self.id,
                image_url,
                success: result.is_success(),
                vulnerabilities: result.vulnerability_count(),
                elapsed,
            };

            if self.results.send(result).await.is_err() {
                warn!("result collector is gone, stopping worker");
                break;
            }
            handled += 1;
            self.emit(event);
        }

        debug!(handled, "worker finished");
    }

    /// 참조 하나를 별도 태스크에서 처리합니다.
    ///
    /// 태스크가 패닉하면 그 참조만 실패 결과가 됩니다.
    async fn process_isolated(&self, image_url: &str) -> ImageScanResult {
        let client = Arc::clone(&self.client);
        let url = image_url.to_owned();
        let task = tokio::spawn(
            async move { process_image(&url, client.as_ref()).await }.in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(image = %image_url, error = %e, "image task terminated abnormally");
                ImageScanResult::failure(image_url, TASK_ABORTED_ERROR)
            }
        }
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.progress {
            if let Err(e) = tx.try_send(event) {
                debug!(error = %e, "progress event dropped");
            }
        }
    }
}

fn record_task_metrics(result: &ImageScanResult, elapsed: Duration) {
    let outcome = if result.is_success() { "success" } else { "failure" };
    counter!(m::IMAGES_SCANNED_TOTAL, m::LABEL_RESULT => outcome).increment(1);
    histogram!(m::IMAGE_SCAN_DURATION_SECONDS).record(elapsed.as_secs_f64());
    if result.is_success() {
        counter!(m::VULNERABILITIES_FOUND_TOTAL).increment(result.vulnerability_count() as u64);
    }
}

/// [`ImageScanner`] 빌더
///
/// # 사용 예시
///
/// ```ignore
/// let (tx, mut rx) = tokio::sync::mpsc::channel(64);
/// let scanner = ImageScannerBuilder::new(Arc::new(client))
///     .config(ScannerConfig::default())
///     .progress_sender(tx)
///     .build()?;
/// ```
pub struct ImageScannerBuilder<C: QuayApi> {
    client: Arc<C>,
    config: ScannerConfig,
    progress_tx: Option<mpsc::Sender<ScanEvent>>,
}

impl<C: QuayApi> ImageScannerBuilder<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: ScannerConfig::default(),
            progress_tx: None,
        }
    }

    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 진행 이벤트 채널을 설정합니다.
    ///
    /// 채널이 가득 차면 이벤트는 버려집니다.
    pub fn progress_sender(mut self, tx: mpsc::Sender<ScanEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn build(self) -> Result<ImageScanner<C>, VulnScannerError> {
        self.config.validate()?;

        Ok(ImageScanner {
            client: self.client,
            config: self.config,
            progress_tx: self.progress_tx,
            batches_completed: Arc::new(AtomicU64::new(0)),
            images_processed: Arc::new(AtomicU64::new(0)),
        })
    }
}
