//! Batch rendering: run the [`SymbolEncoder`] over every payload.
//!
//! ## spawn_blocking
//!
//! Symbol encoding and PNG compression are CPU-bound. Each item runs on
//! tokio's blocking pool so the async workers stay free; a panicking encoder
//! surfaces as a `JoinError`, which is recorded as a per-item
//! [`EncodeError::Panicked`] instead of tearing down the batch.
//!
//! ## Ordering
//!
//! With `concurrency > 1` items complete in any order. Results are written
//! into a slot per input index, so [`RenderOutcome::results`] is always in
//! batch order regardless of completion order.

use crate::config::BatchConfig;
use crate::error::{BatchError, EncodeError};
use crate::pipeline::canonicalize::{Payload, PayloadBatch};
use crate::pipeline::encode::SymbolEncoder;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A payload that encoded successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSymbol {
    /// 1-indexed position in the batch.
    pub position: usize,
    pub payload: String,
    /// PNG bytes.
    #[serde(skip)]
    pub png: Vec<u8>,
}

/// A payload the encoder rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFailure {
    /// 1-indexed position in the batch.
    pub position: usize,
    pub payload: String,
    pub reason: EncodeError,
}

/// Outcome for one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    Success(RenderedSymbol),
    Failure(RenderFailure),
}

impl RenderResult {
    pub fn position(&self) -> usize {
        match self {
            RenderResult::Success(s) => s.position,
            RenderResult::Failure(f) => f.position,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            RenderResult::Success(s) => &s.payload,
            RenderResult::Failure(f) => &f.payload,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderResult::Success(_))
    }

    pub fn as_success(&self) -> Option<&RenderedSymbol> {
        match self {
            RenderResult::Success(s) => Some(s),
            RenderResult::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&RenderFailure> {
        match self {
            RenderResult::Success(_) => None,
            RenderResult::Failure(f) => Some(f),
        }
    }
}

/// Every result of a batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub results: Vec<RenderResult>,
}

impl RenderOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &RenderedSymbol> {
        self.results.iter().filter_map(RenderResult::as_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RenderFailure> {
        self.results.iter().filter_map(RenderResult::as_failure)
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Encode every payload in `batch`.
///
/// Individual encoder failures never abort the batch. The only error is
/// [`BatchError::Cancelled`], returned when the config's cancel token fires
/// before every item has been attempted.
pub async fn render_batch(
    batch: &PayloadBatch,
    encoder: Arc<dyn SymbolEncoder>,
    config: &BatchConfig,
) -> Result<RenderOutcome, BatchError> {
    let total = batch.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let results = if config.concurrency <= 1 {
        render_sequential(batch, &encoder, config).await?
    } else {
        render_concurrent(batch, &encoder, config).await?
    };

    let outcome = RenderOutcome { results };
    let success_count = outcome.success_count();
    info!(
        "Rendered {}/{} payloads with {} ({} failed)",
        success_count,
        total,
        encoder.name(),
        total - success_count
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, success_count);
    }
    Ok(outcome)
}

async fn render_sequential(
    batch: &PayloadBatch,
    encoder: &Arc<dyn SymbolEncoder>,
    config: &BatchConfig,
) -> Result<Vec<RenderResult>, BatchError> {
    let total = batch.len();
    let mut results = Vec::with_capacity(total);

    for (idx, payload) in batch.iter().enumerate() {
        if config.is_cancelled() {
            warn!("Cancelled after {}/{} payloads", results.len(), total);
            return Err(BatchError::Cancelled {
                completed: results.len(),
                total,
            });
        }
        let encoder = Arc::clone(encoder);
        let result = render_item(encoder, idx + 1, total, payload.clone(), config).await;
        results.push(result);
    }

    Ok(results)
}

async fn render_concurrent(
    batch: &PayloadBatch,
    encoder: &Arc<dyn SymbolEncoder>,
    config: &BatchConfig,
) -> Result<Vec<RenderResult>, BatchError> {
    let total = batch.len();
    let mut slots: Vec<Option<RenderResult>> = vec![None; total];

    let mut pending = stream::iter(batch.iter().cloned().enumerate().map(|(idx, payload)| {
        let encoder = Arc::clone(encoder);
        let config = config.clone();
        async move {
            if config.is_cancelled() {
                return (idx, None);
            }
            let result = render_item(encoder, idx + 1, total, payload, &config).await;
            (idx, Some(result))
        }
    }))
    .buffer_unordered(config.concurrency);

    while let Some((idx, result)) = pending.next().await {
        slots[idx] = result;
    }

    let completed = slots.iter().filter(|s| s.is_some()).count();
    if completed < total {
        warn!("Cancelled after {}/{} payloads", completed, total);
        return Err(BatchError::Cancelled { completed, total });
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Encode one payload on the blocking pool and fire its progress events.
pub(crate) async fn render_item(
    encoder: Arc<dyn SymbolEncoder>,
    position: usize,
    total: usize,
    payload: Payload,
    config: &BatchConfig,
) -> RenderResult {
    if let Some(ref cb) = config.progress_callback {
        cb.on_item_start(position, total);
    }

    let format = config.format;
    let style = config.style.clone();
    let value = payload.into_string();
    let input = value.clone();
    let encoded = tokio::task::spawn_blocking(move || encoder.encode(&input, format, &style))
        .await
        .unwrap_or_else(|e| Err(EncodeError::Panicked(panic_message(e))));

    match encoded {
        Ok(png) => {
            debug!("#{} '{}' → {} bytes", position, value, png.len());
            if let Some(ref cb) = config.progress_callback {
                cb.on_item_complete(position, total, png.len());
            }
            RenderResult::Success(RenderedSymbol {
                position,
                payload: value,
                png,
            })
        }
        Err(reason) => {
            warn!("#{} '{}' failed: {}", position, value, reason);
            if let Some(ref cb) = config.progress_callback {
                cb.on_item_error(position, total, &reason.to_string());
            }
            RenderResult::Failure(RenderFailure {
                position,
                payload: value,
                reason,
            })
        }
    }
}

fn panic_message(e: tokio::task::JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let panic = e.into_panic();
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
