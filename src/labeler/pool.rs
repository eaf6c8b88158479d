//! The batch worker pool.
//!
//! A fixed number of workers pull image paths from a shared queue and run one
//! dispatch each. Workers are plain futures joined together rather than
//! spawned tasks, so the pool borrows the engine and directory for the
//! duration of the batch and winds down cleanly when the queue drains or the
//! cancellation token fires.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::DispatchEngine;
use crate::domain::{DispatchRequest, DispatchResult};
use crate::error::{Result, TaggrError};
use crate::id::generate_label_id;
use crate::llm::ChatTransport;
use crate::store::ConfigDirectory;

use super::images::{list_images, tag_text_path};
use super::payload::image_payload;

/// How to run one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub schedule_group_id: String,
    pub prompt: String,
    /// Pool size; falls back to the schedule group's concurrency.
    pub workers: Option<usize>,
    pub min_chars: Option<u32>,
    pub max_chars: Option<u32>,
    pub auto_retry: Option<bool>,
}

/// Per-image outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRecord {
    pub id: String,
    pub name: String,
    pub image_path: PathBuf,
    pub text_path: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempt_count: usize,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// The whole batch, with records in file-name order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub labeled: usize,
    pub failed: usize,
    pub records: Vec<LabelRecord>,
}

/// Label every image in `dir` through the given schedule group.
///
/// One image's failure never aborts the batch; it becomes a failed record and
/// the pool moves on. Cancellation stops workers at the next queue pull, so
/// images never dequeued produce no record at all.
pub async fn run_batch<T, D>(
    engine: &DispatchEngine<T>,
    directory: &D,
    dir: &Path,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Result<BatchReport>
where
    T: ChatTransport,
    D: ConfigDirectory + ?Sized + Sync,
{
    let group = directory
        .schedule_group(&options.schedule_group_id)
        .ok_or_else(|| TaggrError::GroupNotFound(options.schedule_group_id.clone()))?;

    let images = list_images(dir)?;
    let total = images.len();
    if total == 0 {
        info!(dir = %dir.display(), "no images to label");
        return Ok(BatchReport { total: 0, labeled: 0, failed: 0, records: Vec::new() });
    }

    let workers = options.workers.unwrap_or(group.concurrency).max(1).min(total);
    info!(dir = %dir.display(), total, workers, group = %group.name, "labeling batch started");

    let queue: Mutex<VecDeque<PathBuf>> = Mutex::new(images.into_iter().collect());
    let records: Mutex<Vec<LabelRecord>> = Mutex::new(Vec::with_capacity(total));

    let handles = (0..workers).map(|worker| {
        let queue = &queue;
        let records = &records;
        async move {
            loop {
                if cancel.is_cancelled() {
                    debug!(worker, "worker stopping: cancelled");
                    break;
                }
                let image = {
                    let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
                    q.pop_front()
                };
                let Some(image) = image else {
                    debug!(worker, "worker stopping: queue drained");
                    break;
                };
                let record = label_one(engine, directory, &image, options, cancel).await;
                records
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(record);
            }
        }
    });
    futures::future::join_all(handles).await;

    let mut records = records.into_inner().unwrap_or_else(|e| e.into_inner());
    records.sort_by(|a, b| a.name.cmp(&b.name));
    let labeled = records.iter().filter(|r| r.ok).count();
    let failed = records.len() - labeled;
    info!(total, labeled, failed, "labeling batch finished");

    Ok(BatchReport { total, labeled, failed, records })
}

async fn label_one<T, D>(
    engine: &DispatchEngine<T>,
    directory: &D,
    image: &Path,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> LabelRecord
where
    T: ChatTransport,
    D: ConfigDirectory + ?Sized + Sync,
{
    let started = Instant::now();
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text_path = tag_text_path(image);
    let mut record = LabelRecord {
        id: generate_label_id(),
        name,
        image_path: image.to_path_buf(),
        text_path: text_path.clone(),
        ok: false,
        text_length: None,
        error: None,
        attempt_count: 0,
        duration_ms: 0,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let payload = match image_payload(image, &options.prompt).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(image = %image.display(), error = %e, "failed to read image");
            record.error = Some(e.to_string());
            record.duration_ms = started.elapsed().as_millis() as u64;
            return record;
        }
    };

    let mut request = DispatchRequest::new(&options.schedule_group_id, payload);
    request.min_chars = options.min_chars;
    request.max_chars = options.max_chars;
    request.auto_retry = options.auto_retry;

    match engine.dispatch(directory, &request, cancel).await {
        Ok(DispatchResult::Success(success)) => {
            let content = crate::llm::extract_content(&success.response);
            record.attempt_count = success.attempts.len();
            match tokio::fs::write(&text_path, &content).await {
                Ok(()) => {
                    record.ok = true;
                    record.text_length = Some(content.chars().count());
                    debug!(image = %record.name, length = record.text_length, "image labeled");
                }
                Err(e) => {
                    warn!(path = %text_path.display(), error = %e, "failed to write tag file");
                    record.error = Some(format!("failed to write tag file: {}", e));
                }
            }
        }
        Ok(DispatchResult::Failed(failure)) => {
            warn!(image = %record.name, error = %failure.error, "image labeling failed");
            record.attempt_count = failure.attempts.len();
            record.error = Some(failure.error);
        }
        Err(e) => {
            warn!(image = %record.name, error = %e, "dispatch rejected");
            record.error = Some(e.to_string());
        }
    }
    record.duration_ms = started.elapsed().as_millis() as u64;
    record
}
