//! Single-flight completion queue.
//!
//! All completion calls go through one worker task that owns the pending
//! list. The worker pops the oldest entry, runs it against the provider,
//! forwards fragments to the entry's sink as they arrive, signals the
//! submitter, waits out the pacing delay and moves on. Because only the
//! worker ever calls the provider, at most one completion is in flight and
//! completion signals fire in submission order.
//!
//! There is no cancellation: dropping a [`Submission`] stops delivery to
//! that caller but the entry still runs to the end, so its result can
//! still land in the response cache.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::providers::CompletionProvider;
use crate::telemetry;
use crate::types::{CompletionEvent, CompletionRequest, CompletionStream};
use crate::{HuginnError, Result};

/// Default pause between two consecutive queue entries.
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Handle to the single-flight queue worker.
///
/// Dropping the handle closes the queue; entries already submitted are
/// still drained.
pub struct SingleFlightQueue {
    tx: mpsc::UnboundedSender<QueueEntry>,
    pending: Arc<AtomicUsize>,
}

struct QueueEntry {
    request: CompletionRequest,
    sink: mpsc::UnboundedSender<Result<CompletionEvent>>,
    done: oneshot::Sender<Result<String>>,
}

/// What a caller gets back from [`SingleFlightQueue::submit`].
pub struct Submission {
    /// Fragments of this entry, in arrival order, ending with `Done` or an
    /// error.
    pub events: CompletionStream,
    /// Resolves exactly once, with the assembled text or the terminal
    /// failure, after the last fragment has been sent to `events`.
    pub completion: Completion,
}

/// Completion signal of one queue entry.
pub struct Completion(oneshot::Receiver<Result<String>>);

impl Future for Completion {
    type Output = Result<String>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(HuginnError::QueueClosed)))
    }
}

impl SingleFlightQueue {
    /// Start the queue worker.
    ///
    /// When `cache` is set, every successful entry stores its assembled
    /// text under the request fingerprint before `Done` is delivered.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn spawn(
        provider: Arc<dyn CompletionProvider>,
        cache: Option<Arc<ResponseCache>>,
        pacing: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            provider,
            cache,
            pacing,
            pending: pending.clone(),
        };
        tokio::spawn(worker.run(rx));
        Self { tx, pending }
    }

    /// Append a request to the tail of the queue.
    ///
    /// Never starts a second execution; the worker picks the entry up once
    /// everything submitted before it has completed.
    pub fn submit(&self, request: CompletionRequest) -> Result<Submission> {
        // Unbounded so that a slow reader cannot stall the entries behind it.
        let (sink, events) = mpsc::unbounded_channel();
        let (done, completion) = oneshot::channel();

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self
            .tx
            .send(QueueEntry {
                request,
                sink,
                done,
            })
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(HuginnError::QueueClosed);
        }

        metrics::counter!(telemetry::QUEUED_TOTAL).increment(1);
        info!(pending = self.pending(), "completion request queued");

        Ok(Submission {
            events: Box::pin(UnboundedReceiverStream::new(events)),
            completion: Completion(completion),
        })
    }

    /// Entries submitted but not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

struct Worker {
    provider: Arc<dyn CompletionProvider>,
    cache: Option<Arc<ResponseCache>>,
    pacing: Duration,
    pending: Arc<AtomicUsize>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<QueueEntry>) {
        while let Some(QueueEntry {
            request,
            sink,
            done,
        }) = rx.recv().await
        {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            let started = Instant::now();

            let outcome = self.execute(&request, &sink).await;
            // Closes the caller's event stream.
            drop(sink);

            let status = if outcome.is_ok() { "ok" } else { "error" };
            metrics::counter!(telemetry::COMPLETIONS_TOTAL,
                "provider" => self.provider.name().to_owned(),
                "status" => status,
            )
            .increment(1);
            metrics::histogram!(telemetry::COMPLETION_DURATION_SECONDS,
                "provider" => self.provider.name().to_owned(),
            )
            .record(started.elapsed().as_secs_f64());

            match &outcome {
                Ok(text) => debug!(chars = text.len(), "completion finished"),
                Err(e) => warn!(error = %e, "completion failed"),
            }
            // The submitter may have gone away; the entry still counts as done.
            let _ = done.send(outcome);

            tokio::time::sleep(self.pacing).await;
        }
        debug!("completion queue closed");
    }

    /// Run one entry to its end, mirroring every item into `sink`.
    async fn execute(
        &self,
        request: &CompletionRequest,
        sink: &mpsc::UnboundedSender<Result<CompletionEvent>>,
    ) -> Result<String> {
        let mut stream = match self.provider.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = sink.send(Err(e.clone()));
                return Err(e);
            }
        };

        let mut text = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(CompletionEvent::Content(fragment)) => {
                    text.push_str(&fragment);
                    let _ = sink.send(Ok(CompletionEvent::Content(fragment)));
                }
                Ok(CompletionEvent::Done) => {
                    if let Some(cache) = &self.cache {
                        if !text.is_empty() {
                            cache.store(request.fingerprint(), text.clone()).await;
                        }
                    }
                    let _ = sink.send(Ok(CompletionEvent::Done));
                    return Ok(text);
                }
                Err(e) => {
                    let _ = sink.send(Err(e.clone()));
                    return Err(e);
                }
            }
        }

        let e = HuginnError::Stream("provider stream ended without completion marker".to_string());
        let _ = sink.send(Err(e.clone()));
        Err(e)
    }
}
