//! Batch coordinator for running the pipeline over many images.
//!
//! Each image runs as one blocking unit (`spawn_blocking`) bounded by a
//! semaphore. Results come back in input order regardless of completion
//! order, and no single image's failure escapes `process_batch`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::options::ProcessOptions;
use crate::pipeline::ImageProcessor;
use crate::sources::{ImageSink, ImageSource};
use crate::types::{ImageStatus, ProcessResult, ProcessedImage};

/// Where an item's encoded bytes come from.
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// Bytes already in memory
    Bytes(Vec<u8>),
    /// A location resolved through the configured `ImageSource`
    Fetch(String),
}

/// One unit of work: an id, its input, and the options to apply.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: String,
    pub input: BatchInput,
    pub options: ProcessOptions,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, input: BatchInput, options: ProcessOptions) -> Self {
        Self {
            id: id.into(),
            input,
            options,
        }
    }
}

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum images processed at once
    pub parallel: usize,
    /// Per-image time budget in milliseconds
    pub timeout_ms: u64,
    /// Base seed for reproducible scrambles; image `i` uses `seed + i`
    pub seed: Option<u64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            timeout_ms: 60_000,
            seed: None,
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            parallel: config.processing.parallel_workers.max(1),
            timeout_ms: config.limits.process_timeout_ms,
            seed: None,
        }
    }
}

/// Stops submission of new images when triggered.
///
/// Images already running finish normally; images not yet started are
/// reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Applies the pipeline to a list of items with bounded parallelism.
pub struct BatchCoordinator {
    processor: Arc<ImageProcessor>,
    source: Option<Arc<dyn ImageSource>>,
    sink: Option<Arc<dyn ImageSink>>,
    options: BatchOptions,
    cancel: CancelHandle,
}

impl BatchCoordinator {
    pub fn new(processor: ImageProcessor, options: BatchOptions) -> Self {
        Self {
            processor: Arc::new(processor),
            source: None,
            sink: None,
            options,
            cancel: CancelHandle::default(),
        }
    }

    /// Resolve `BatchInput::Fetch` locations through `source`.
    pub fn with_source(mut self, source: impl ImageSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Hand successful outputs to `sink`; its returned location becomes
    /// the result's `new_url`.
    pub fn with_sink(mut self, sink: impl ImageSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Handle that stops submission of further images.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Process every item and return one result per item, in input order.
    pub async fn process_batch(&self, items: Vec<BatchItem>) -> Vec<ProcessResult> {
        self.process_batch_with(items, |_| {}).await
    }

    /// Like `process_batch`, calling `on_result` as each image completes
    /// (in completion order) so callers can report progress.
    pub async fn process_batch_with<F>(&self, items: Vec<BatchItem>, on_result: F) -> Vec<ProcessResult>
    where
        F: Fn(&ProcessResult) + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.options.parallel.max(1)));
        let on_result = Arc::new(on_result);
        let mut handles = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let id = item.id.clone();

            let permit = if self.cancel.is_cancelled() {
                None
            } else {
                semaphore.clone().acquire_owned().await.ok()
            };
            let permit = match permit {
                Some(permit) if !self.cancel.is_cancelled() => permit,
                _ => {
                    let result = ProcessResult::failed(&id, PipelineError::Cancelled);
                    on_result(&result);
                    handles.push((id, None, Some(result)));
                    continue;
                }
            };

            let processor = self.processor.clone();
            let source = self.source.clone();
            let sink = self.sink.clone();
            let on_result = on_result.clone();
            let timeout_ms = self.options.timeout_ms;
            let mut rng = match self.options.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => StdRng::from_entropy(),
            };

            let handle = tokio::spawn(async move {
                let item_id = item.id.clone();
                let deadline = Deadline::new(timeout_ms);
                let work = {
                    let deadline = deadline.clone();
                    tokio::task::spawn_blocking(move || {
                        // The slot stays taken until the work really ends
                        let _permit = permit;
                        run_item(
                            &processor,
                            source.as_deref(),
                            sink.as_deref(),
                            item,
                            &mut rng,
                            &deadline,
                        )
                    })
                };

                let result = match tokio::time::timeout(Duration::from_millis(timeout_ms), work).await {
                    Ok(Ok(Ok((processed, new_url)))) => {
                        let mut result = ProcessResult::succeeded(&item_id, processed);
                        if new_url.is_some() {
                            result.new_url = new_url;
                            result.output = None;
                        }
                        result
                    }
                    Ok(Ok(Err(e))) => ProcessResult::failed(&item_id, e),
                    Ok(Err(e)) => ProcessResult::failed(&item_id, format!("Processing task panicked: {e}")),
                    Err(_) => {
                        deadline.abandon();
                        ProcessResult::failed(&item_id, deadline.error("process"))
                    }
                };

                if let Some(error) = &result.error {
                    tracing::error!("{}: {}", item_id, error);
                }
                on_result(&result);
                result
            });

            handles.push((id, Some(handle), None));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle, ready) in handles {
            let result = match (handle, ready) {
                (Some(handle), _) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Batch task for {} panicked: {}", id, e);
                        ProcessResult::failed(&id, format!("Processing task panicked: {e}"))
                    }
                },
                (None, Some(result)) => result,
                (None, None) => ProcessResult::failed(&id, PipelineError::Cancelled),
            };
            results.push(result);
        }

        results
    }
}

/// Shared between a running item and its waiter. Once the waiter reports
/// a timeout, the item must not publish anything.
#[derive(Debug, Clone)]
struct Deadline {
    abandoned: Arc<AtomicBool>,
    timeout_ms: u64,
}

impl Deadline {
    fn new(timeout_ms: u64) -> Self {
        Self {
            abandoned: Arc::new(AtomicBool::new(false)),
            timeout_ms,
        }
    }

    fn abandon(&self) {
        self.abandoned.store(true, Ordering::SeqCst);
    }

    fn error(&self, stage: &str) -> PipelineError {
        PipelineError::Timeout {
            stage: stage.to_string(),
            timeout_ms: self.timeout_ms,
        }
    }

    /// Fail with `Timeout` if the waiter has already given up.
    fn check(&self, stage: &str) -> PipelineResult<()> {
        if self.abandoned.load(Ordering::SeqCst) {
            return Err(self.error(stage));
        }
        Ok(())
    }
}

/// Fetch, transform and store one item on the blocking pool.
fn run_item(
    processor: &ImageProcessor,
    source: Option<&dyn ImageSource>,
    sink: Option<&dyn ImageSink>,
    item: BatchItem,
    rng: &mut StdRng,
    deadline: &Deadline,
) -> PipelineResult<(ProcessedImage, Option<String>)> {
    let BatchItem { id, input, options } = item;

    let bytes = match input {
        BatchInput::Bytes(bytes) => bytes,
        BatchInput::Fetch(location) => {
            transition(&id, ImageStatus::Downloading);
            let source = source.ok_or_else(|| PipelineError::Fetch {
                location: location.clone(),
                message: "no image source configured".to_string(),
            })?;
            source.fetch(&location)?
        }
    };

    deadline.check("fetch")?;
    transition(&id, ImageStatus::Transforming);
    let processed = processor.process_bytes(bytes, &options, rng)?;
    for warning in &processed.warnings {
        tracing::warn!("{}: {}", id, warning);
    }

    let new_url = match sink {
        Some(sink) => {
            deadline.check("process")?;
            transition(&id, ImageStatus::Uploading);
            Some(sink.store(&id, &processed.image)?)
        }
        None => None,
    };

    Ok((processed, new_url))
}

fn transition(id: &str, status: ImageStatus) {
    tracing::debug!("{}: {}", id, status);
}
