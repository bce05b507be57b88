//! The load driver: issues a fixed amount of GET requests against a target
//! with bounded concurrency and measures the total elapsed time.

use std::time::{Duration, SystemTime};

use rama::{
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    http::Uri,
    rt::Executor,
    telemetry::tracing,
};
use tokio::{sync::mpsc, time::Instant};

use crate::client::{HttpTransport, WebClientConfig, new_web_client};

mod dispatcher;
mod outcome;

pub use self::{
    dispatcher::{WorkItem, run_worker_pool},
    outcome::{Counters, DriverReport, Outcome, Reporter, RequestOutcome, RequestResultEvent},
};

/// Capacity of the work queue between the producer and the workers.
///
/// Deliberately narrow, keeping the producer in near lock-step with the workers.
pub const WORK_QUEUE_CAPACITY: usize = 2;

/// Upper bound for the capacity of the outcome channel between workers and aggregator.
pub const MAX_OUTCOME_QUEUE_CAPACITY: usize = 64 * 1024;

/// Interval at which [`Reporter::on_tick`] is called.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration of a single driver run, immutable once created.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL, each request goes to `{base_url}/{index}`.
    pub base_url: String,
    pub request_count: usize,
    pub transport: HttpTransport,
    /// Amount of workers, at least 1.
    pub concurrency: usize,
    /// Deadline per request, `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl DriverConfig {
    pub fn work_item(&self, index: usize) -> WorkItem {
        WorkItem {
            index,
            uri: format!("{}/{index}", self.base_url),
        }
    }

    fn validate(&self) -> Result<(), BoxError> {
        let first_uri = self.work_item(0).uri;
        let uri: Uri = first_uri
            .parse()
            .context("parse target url")
            .with_context_debug_field("url", || self.base_url.clone())?;

        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(BoxError::from("target url requires a scheme and host")
                .context_field("url", self.base_url.clone()));
        }

        Ok(())
    }
}

/// Run the driver to completion.
///
/// Requests are sent in increasing index order but, as multiple workers consume
/// the queue concurrently, may reach the target out of order.
pub async fn run<R: Reporter>(
    exec: Executor,
    cfg: DriverConfig,
    reporter: R,
) -> Result<DriverReport, BoxError> {
    run_until(exec, cfg, reporter, std::future::pending::<()>()).await
}

/// Same as [`run`], but stops producing work items once `shutdown` resolves.
///
/// Requests already taken by a worker still complete,
/// the returned report only covers the requests which were sent.
pub async fn run_until<R, F>(
    exec: Executor,
    cfg: DriverConfig,
    reporter: R,
    shutdown: F,
) -> Result<DriverReport, BoxError>
where
    R: Reporter,
    F: Future,
{
    cfg.validate()?;

    let concurrency = cfg.concurrency.max(1);
    let client = new_web_client(
        exec.clone(),
        WebClientConfig {
            transport: cfg.transport,
            max_in_flight: concurrency,
        },
    )
    .context("create driver web client")?;

    tracing::info!(
        url = %cfg.base_url,
        request_count = cfg.request_count,
        transport = ?cfg.transport,
        %concurrency,
        request_timeout = ?cfg.request_timeout,
        "driver config ready",
    );

    let (queue_tx, queue_rx) = mpsc::channel(WORK_QUEUE_CAPACITY);
    let (outcome_tx, outcome_rx) = mpsc::channel(outcome_queue_capacity(concurrency));

    let start = Instant::now();
    let aggregator = exec.spawn_task(aggregate_outcomes(start, reporter, outcome_rx));

    let produce = async {
        let mut shutdown = std::pin::pin!(shutdown);
        for index in 0..cfg.request_count {
            tokio::select! {
                biased;

                _ = shutdown.as_mut() => {
                    tracing::warn!(%index, "shutdown initiated: stop producing work items");
                    break;
                }
                result = queue_tx.send(cfg.work_item(index)) => {
                    if result.is_err() {
                        tracing::error!(%index, "work queue closed before all items were sent");
                        break;
                    }
                }
            }
        }
        // closing the queue is the only termination signal for the workers
        drop(queue_tx);
        tracing::debug!("all work items sent: work queue closed");
    };

    tokio::join!(
        produce,
        run_worker_pool(
            &exec,
            client,
            queue_rx,
            concurrency,
            cfg.request_timeout,
            outcome_tx,
        ),
    );

    let elapsed = start.elapsed();

    let (mut reporter, counters) = aggregator.await.context("join outcome aggregator")?;
    let report = DriverReport { elapsed, counters };
    reporter.finish(&report);

    tracing::info!(
        ?elapsed,
        total = counters.total,
        ok = counters.ok,
        failed = counters.failed(),
        "driver run finished",
    );

    Ok(report)
}

fn outcome_queue_capacity(concurrency: usize) -> usize {
    concurrency
        .saturating_mul(8)
        .clamp(1, MAX_OUTCOME_QUEUE_CAPACITY)
}

async fn aggregate_outcomes<R: Reporter>(
    start: Instant,
    mut reporter: R,
    mut outcome_rx: mpsc::Receiver<RequestOutcome>,
) -> (R, Counters) {
    let mut counters = Counters::default();
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_outcome = outcome_rx.recv() => {
                let Some(RequestOutcome { index, latency, outcome }) = maybe_outcome else {
                    tracing::debug!("exit outcome aggregator: all workers done");
                    return (reporter, counters);
                };

                counters.apply(outcome);
                reporter.on_result(&RequestResultEvent {
                    ts: SystemTime::now(),
                    elapsed: start.elapsed(),
                    index,
                    latency,
                    outcome,
                });
            }
            _ = ticker.tick() => {
                reporter.on_tick(start.elapsed());
            }
        }
    }
}
