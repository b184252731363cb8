//! Streaming API: emit each payload's result as soon as it is ready.
//!
//! Unlike the eager [`crate::batch::run`], which returns only after the
//! archive is built, [`render_stream`] yields `(index, RenderResult)` pairs
//! while the batch is still running. With `concurrency > 1` items arrive in
//! completion order; sort by index if order matters. No archive is built.

use crate::batch::resolve_encoder;
use crate::config::BatchConfig;
use crate::pipeline::canonicalize::{self, BatchInput};
use crate::pipeline::render::{self, RenderResult};
use futures::future;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of `(0-based index, result)` pairs.
pub type ItemStream = Pin<Box<dyn Stream<Item = (usize, RenderResult)> + Send>>;

/// Canonicalize `input` and encode it lazily as the stream is polled.
///
/// Progress callbacks fire as in [`crate::batch::run`]: `on_batch_start`
/// when the stream is created and `on_batch_complete` once the last item has
/// been yielded. Once the config's cancel token fires, items that have not
/// started are skipped, the stream ends early and `on_batch_complete` is not
/// called.
///
/// # Example
/// ```rust,no_run
/// use barcode_batch::{render_stream, BatchConfig, BatchInput};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let config = BatchConfig::builder().concurrency(4).build().unwrap();
/// let mut items = render_stream(&BatchInput::from("A\nB\nC"), &config);
/// while let Some((idx, result)) = items.next().await {
///     println!("#{idx} {} ok={}", result.payload(), result.is_success());
/// }
/// # }
/// ```
pub fn render_stream(input: &BatchInput, config: &BatchConfig) -> ItemStream {
    let payloads = canonicalize::canonicalize(input);
    let total = payloads.len();
    let encoder = resolve_encoder(config);
    let concurrency = config.concurrency.max(1);
    info!(
        "Starting streaming batch: {} payloads, concurrency {}",
        total, concurrency
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let tally = Arc::new(Tally::default());

    let finish = {
        let config = config.clone();
        let tally = Arc::clone(&tally);
        stream::once(async move {
            let rendered = tally.rendered.load(Ordering::SeqCst);
            if rendered == total {
                let success_count = tally.succeeded.load(Ordering::SeqCst);
                info!("Streamed {}/{} payloads", success_count, total);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_batch_complete(total, success_count);
                }
            }
            None::<(usize, RenderResult)>
        })
    };

    let config = config.clone();
    let items = stream::iter(payloads.into_iter().enumerate().map(move |(idx, payload)| {
        let encoder = Arc::clone(&encoder);
        let config = config.clone();
        let tally = Arc::clone(&tally);
        async move {
            if config.is_cancelled() {
                return None;
            }
            let result = render::render_item(encoder, idx + 1, total, payload, &config).await;
            tally.record(&result);
            Some((idx, result))
        }
    }));

    if concurrency == 1 {
        Box::pin(items.buffered(1).chain(finish).filter_map(future::ready))
    } else {
        let items = items.buffer_unordered(concurrency);
        Box::pin(items.chain(finish).filter_map(future::ready))
    }
}

/// Items rendered so far, and how many of them succeeded.
#[derive(Default)]
struct Tally {
    rendered: AtomicUsize,
    succeeded: AtomicUsize,
}

impl Tally {
    fn record(&self, result: &RenderResult) {
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        }
        self.rendered.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::config::{RenderStyle, SymbolFormat};
    use crate::error::EncodeError;
    use crate::pipeline::encode::SymbolEncoder;
    use crate::progress::BatchProgressCallback;
    use std::sync::Mutex;

    struct EchoEncoder;

    impl SymbolEncoder for EchoEncoder {
        fn encode(
            &self,
            payload: &str,
            _: SymbolFormat,
            _: &RenderStyle,
        ) -> Result<Vec<u8>, EncodeError> {
            if payload.starts_with("BAD") {
                return Err(EncodeError::Symbology {
                    format: "TEST".into(),
                    detail: "rejected".into(),
                });
            }
            Ok(payload.as_bytes().to_vec())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl BatchProgressCallback for Recorder {
        fn on_batch_start(&self, total: usize) {
            self.events.lock().unwrap().push(format!("start {total}"));
        }
        fn on_batch_complete(&self, total: usize, success_count: usize) {
            let event = format!("done {success_count}/{total}");
            self.events.lock().unwrap().push(event);
        }
    }

    fn config(concurrency: usize) -> BatchConfig {
        BatchConfig::builder()
            .encoder(Arc::new(EchoEncoder))
            .concurrency(concurrency)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn sequential_stream_is_in_batch_order() {
        let stream = render_stream(&BatchInput::from("A\nBAD\nC"), &config(1));
        let items: Vec<(usize, RenderResult)> = stream.collect().await;

        let indices: Vec<usize> = items.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(items[0].1.is_success());
        assert!(!items[1].1.is_success());
    }

    #[tokio::test]
    async fn concurrent_stream_yields_every_item() {
        let text: String = (0..20).map(|i| format!("P{i}\n")).collect();
        let stream = render_stream(&BatchInput::from(text), &config(5));
        let mut items: Vec<(usize, RenderResult)> = stream.collect().await;

        items.sort_by_key(|(i, _)| *i);
        assert_eq!(items.len(), 20);
        assert_eq!(items[7].1.payload(), "P7");
    }

    #[tokio::test]
    async fn cancelled_stream_ends_early() {
        let token = CancelToken::new();
        token.cancel();
        let config = BatchConfig::builder()
            .encoder(Arc::new(EchoEncoder))
            .cancel_token(token)
            .build()
            .unwrap();

        let stream = render_stream(&BatchInput::from("A\nB"), &config);
        let items: Vec<(usize, RenderResult)> = stream.collect().await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn drained_stream_reports_batch_complete() {
        for concurrency in [1, 4] {
            let recorder = Arc::new(Recorder::default());
            let config = BatchConfig::builder()
                .encoder(Arc::new(EchoEncoder))
                .concurrency(concurrency)
                .progress_callback(recorder.clone())
                .build()
                .unwrap();

            let stream = render_stream(&BatchInput::from("A\nBAD\nC"), &config);
            let items: Vec<(usize, RenderResult)> = stream.collect().await;
            assert_eq!(items.len(), 3);

            let events = recorder.events.lock().unwrap().clone();
            assert_eq!(events, vec!["start 3", "done 2/3"]);
        }
    }

    #[tokio::test]
    async fn cancelled_stream_does_not_report_completion() {
        let token = CancelToken::new();
        token.cancel();
        let recorder = Arc::new(Recorder::default());
        let config = BatchConfig::builder()
            .encoder(Arc::new(EchoEncoder))
            .progress_callback(recorder.clone())
            .cancel_token(token)
            .build()
            .unwrap();

        let stream = render_stream(&BatchInput::from("A\nB"), &config);
        let items: Vec<(usize, RenderResult)> = stream.collect().await;
        assert!(items.is_empty());

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["start 2"]);
    }
}
