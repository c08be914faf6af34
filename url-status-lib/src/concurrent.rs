//! The worker pool that drives a checking run.
//!
//! A fixed number of tokio tasks share one [`WorkSource`], one
//! [`StatusChecker`] and one [`ResultSink`]. Each task loops
//! pull → check → write → maybe flush until the source runs dry. The pool
//! size is the only admission control: at most `concurrency` requests are
//! ever in flight.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::checker::StatusChecker;
use crate::error::UrlStatusError;
use crate::sink::ResultSink;
use crate::source::WorkSource;
use crate::types::{CheckConfig, Progress, RunSummary};

/// Runs a fixed number of concurrent workers to completion.
///
/// # Example
///
/// ```rust,no_run
/// use url_status_lib::{CheckConfig, OutputFormat, ResultSink, StatusChecker, WorkSource, WorkerPool};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CheckConfig::default();
///     let source = WorkSource::open("urls.txt").await?;
///     let sink = ResultSink::new(tokio::io::stdout(), OutputFormat::Csv);
///     let checker = StatusChecker::from_config(&config)?;
///
///     let summary = WorkerPool::from_config(&config).run(source, checker, sink).await?;
///     eprintln!("checked {} URLs", summary.checked);
///     Ok(())
/// }
/// ```
pub struct WorkerPool {
    concurrency: usize,
    progress: Arc<Progress>,
}

impl WorkerPool {
    /// Create a pool of `concurrency` workers (at least one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: Arc::new(Progress::default()),
        }
    }

    /// Create a pool sized from `config`.
    pub fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.concurrency)
    }

    /// Report live counts into an externally owned [`Progress`].
    pub fn with_progress(mut self, progress: Arc<Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Check every URL from `source`, writing one record per URL to `sink`.
    ///
    /// Resolves once every worker has exited and the sink has received its
    /// final flush.
    ///
    /// # Errors
    ///
    /// A fatal failure (unreadable input, unwritable output, a crashed
    /// worker) stops all workers from taking new URLs. URLs still waiting
    /// on a rate gate are dropped without a request. Requests already in
    /// flight finish, the sink gets a best-effort close, and the first
    /// fatal error is returned. Per-URL failures are never errors here;
    /// they are records.
    pub async fn run<R, W>(
        &self,
        source: WorkSource<R>,
        checker: StatusChecker,
        sink: ResultSink<W>,
    ) -> Result<RunSummary, UrlStatusError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let start = Instant::now();
        let source = Arc::new(source);
        let sink = Arc::new(sink);
        let halt = Halt::new();

        tracing::info!(
            concurrency = self.concurrency,
            rate_limits = checker.limits().len(),
            "starting workers"
        );

        let handles: Vec<_> = (0..self.concurrency)
            .map(|id| {
                let worker = Worker {
                    id,
                    source: Arc::clone(&source),
                    checker: checker.clone(),
                    sink: Arc::clone(&sink),
                    progress: Arc::clone(&self.progress),
                    halt: halt.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut first_error = None;
        for (id, outcome) in futures::future::join_all(handles).await.into_iter().enumerate() {
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(join_error) => {
                    UrlStatusError::worker(format!("worker {} did not finish: {}", id, join_error))
                }
            };
            tracing::warn!(worker = id, error = %error, "worker stopped with a fatal error");
            first_error.get_or_insert(error);
        }

        if let Some(error) = first_error {
            if let Err(close_error) = sink.close().await {
                tracing::warn!(error = %close_error, "could not flush output after failure");
            }
            return Err(error);
        }

        sink.close().await?;

        let summary = RunSummary::from_progress(&self.progress, start.elapsed());
        tracing::info!(
            checked = summary.checked,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.duration.as_millis() as u64,
            "all workers finished"
        );
        Ok(summary)
    }
}

/// Pool-wide stop signal. Raised once, seen by every worker, including
/// one that is asleep on a rate gate.
#[derive(Clone)]
struct Halt(Arc<watch::Sender<bool>>);

impl Halt {
    fn new() -> Self {
        Self(Arc::new(watch::channel(false).0))
    }

    fn raise(&self) {
        self.0.send_replace(true);
    }

    fn is_raised(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal has been raised.
    async fn raised(&self) {
        let mut rx = self.0.subscribe();
        while !*rx.borrow_and_update() {
            // The sender lives as long as `self`
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// One worker's share of the pool.
struct Worker<R, W> {
    id: usize,
    source: Arc<WorkSource<R>>,
    checker: StatusChecker,
    sink: Arc<ResultSink<W>>,
    progress: Arc<Progress>,
    halt: Halt,
}

impl<R, W> Worker<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn run(self) -> Result<(), UrlStatusError> {
        let result = self.work().await;
        if result.is_err() {
            self.halt.raise();
        }
        result
    }

    async fn work(&self) -> Result<(), UrlStatusError> {
        while !self.halt.is_raised() {
            let Some(url) = self.source.next().await? else {
                tracing::trace!(worker = self.id, "input exhausted");
                return Ok(());
            };

            let Some(result) = self.checker.check_unless(&url, self.halt.raised()).await else {
                break;
            };
            self.sink.write(&result).await?;
            self.progress.record(&result);
            self.sink.maybe_flush().await?;
        }

        tracing::trace!(worker = self.id, "halted");
        Ok(())
    }
}
