//! Output types returned by the batch entry points.

use crate::config::SymbolFormat;
use crate::error::{BatchError, EncodeError};
use crate::pipeline::preview::PreviewImage;
use crate::pipeline::render::RenderFailure;
use serde::{Deserialize, Serialize};

/// Everything produced by one [`crate::run`] call.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// ZIP bytes containing one PNG per successful payload.
    pub archive: Vec<u8>,

    /// Archive entry names, in archive order.
    pub entries: Vec<String>,

    /// The first `preview_limit` successful images.
    pub preview: Vec<PreviewImage>,

    /// Number of canonical payloads in the batch.
    pub total_count: usize,

    /// Number of payloads the encoder rejected.
    pub failure_count: usize,

    /// One entry per rejected payload, in batch order.
    pub failures: Vec<ItemFailure>,

    pub stats: BatchStats,
}

/// A payload that did not make it into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// 1-indexed position in the canonical batch.
    pub position: usize,
    pub payload: String,
    pub reason: EncodeError,
}

impl From<&RenderFailure> for ItemFailure {
    fn from(f: &RenderFailure) -> Self {
        Self {
            position: f.position,
            payload: f.payload.clone(),
            reason: f.reason.clone(),
        }
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub format: SymbolFormat,
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub archive_bytes: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub archive_duration_ms: u64,
}

/// Serialisable summary of a run: everything except image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub stats: BatchStats,
    pub entries: Vec<String>,
    /// Payloads of the preview images.
    pub preview: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl BatchOutput {
    pub fn success_count(&self) -> usize {
        self.total_count - self.failure_count
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count > 0
    }

    /// Strict mode: any rejected payload becomes [`BatchError::PartialFailure`].
    pub fn into_result(self) -> Result<BatchOutput, BatchError> {
        if self.failure_count > 0 {
            return Err(BatchError::PartialFailure {
                success: self.success_count(),
                failed: self.failure_count,
                total: self.total_count,
            });
        }
        Ok(self)
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            stats: self.stats.clone(),
            entries: self.entries.clone(),
            preview: self.preview.iter().map(|p| p.payload.clone()).collect(),
            failures: self.failures.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(total: usize, failures: Vec<ItemFailure>) -> BatchOutput {
        BatchOutput {
            archive: Vec::new(),
            entries: Vec::new(),
            preview: vec![PreviewImage {
                payload: "A".into(),
                png: vec![1, 2, 3],
            }],
            total_count: total,
            failure_count: failures.len(),
            failures,
            stats: BatchStats::default(),
        }
    }

    fn failure(position: usize, payload: &str) -> ItemFailure {
        ItemFailure {
            position,
            payload: payload.into(),
            reason: EncodeError::InvalidLength {
                format: "EAN13".into(),
                expected: "12 or 13 digits".into(),
                actual: payload.len(),
            },
        }
    }

    #[test]
    fn into_result_passes_clean_output() {
        let out = output(3, vec![]).into_result().unwrap();
        assert_eq!(out.success_count(), 3);
    }

    #[test]
    fn into_result_rejects_partial_failure() {
        let err = output(3, vec![failure(2, "BAD")])
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::PartialFailure {
                success: 2,
                failed: 1,
                total: 3
            }
        ));
    }

    #[test]
    fn report_omits_image_bytes() {
        let out = output(2, vec![failure(2, "BAD")]);
        let json = serde_json::to_value(out.report()).unwrap();
        assert_eq!(json["preview"], serde_json::json!(["A"]));
        assert_eq!(json["failures"][0]["position"], 2);
        assert_eq!(json["stats"]["format"], "CODE128");
        assert!(!json.to_string().contains("png"));
    }
}
