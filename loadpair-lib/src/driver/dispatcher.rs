use std::{sync::Arc, time::Duration};

use rama::{
    Service as _,
    error::{BoxError, ErrorContext as _},
    http::body::util::BodyExt as _,
    rt::Executor,
    telemetry::tracing,
};
use tokio::{
    sync::{Mutex, mpsc},
    time::Instant,
};

use super::{Outcome, RequestOutcome};
use crate::client::WebClient;

/// A fully formed request URI, consumed exactly once by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub index: usize,
    pub uri: String,
}

/// Run `concurrency` workers which pull [`WorkItem`]s from `queue`
/// until it is closed and drained, and wait until all of them exited.
///
/// Every consumed item results in exactly one [`RequestOutcome`] sent to `outcomes`.
/// Failed requests are never retried.
pub async fn run_worker_pool(
    exec: &Executor,
    client: WebClient,
    queue: mpsc::Receiver<WorkItem>,
    concurrency: usize,
    request_timeout: Option<Duration>,
    outcomes: mpsc::Sender<RequestOutcome>,
) {
    let concurrency = concurrency.max(1);
    let queue = Arc::new(Mutex::new(queue));

    let handles: Vec<_> = (0..concurrency)
        .map(|id| {
            exec.spawn_task(worker(
                id,
                client.clone(),
                queue.clone(),
                request_timeout,
                outcomes.clone(),
            ))
        })
        .collect();

    // only the workers keep the outcome channel alive from here on
    drop(outcomes);

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!("dispatcher worker failed to complete: {err}");
        }
    }

    tracing::debug!(%concurrency, "all dispatcher workers exited");
}

async fn worker(
    id: usize,
    client: WebClient,
    queue: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    request_timeout: Option<Duration>,
    outcomes: mpsc::Sender<RequestOutcome>,
) {
    loop {
        let maybe_item = queue.lock().await.recv().await;
        let Some(WorkItem { index, uri }) = maybe_item else {
            tracing::trace!(worker = id, "work queue closed: exit");
            return;
        };

        let start = Instant::now();
        let outcome = dispatch(&client, &uri, request_timeout).await;
        let latency = start.elapsed();

        tracing::trace!(worker = id, %index, %uri, ?outcome, ?latency, "request dispatched");

        if let Err(err) = outcomes
            .send(RequestOutcome {
                index,
                latency,
                outcome,
            })
            .await
        {
            tracing::debug!(worker = id, "failed to send request outcome: {err}");
        }
    }
}

async fn dispatch(client: &WebClient, uri: &str, request_timeout: Option<Duration>) -> Outcome {
    let result = match request_timeout {
        Some(deadline) => match tokio::time::timeout(deadline, get_and_drain(client, uri)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%uri, ?deadline, "request timed out");
                return Outcome::Timeout;
            }
        },
        None => get_and_drain(client, uri).await,
    };

    match result {
        Ok(status) => Outcome::Response { status },
        Err(err) => {
            tracing::debug!(%uri, "request failed: {err}");
            Outcome::NetworkError
        }
    }
}

/// GET `uri` and read the full body so the connection can be reused.
async fn get_and_drain(client: &WebClient, uri: &str) -> Result<u16, BoxError> {
    let req = client.new_get_request(uri)?;
    let resp = client.serve(req).await?;
    let status = resp.status().as_u16();
    let _ = resp
        .into_body()
        .collect()
        .await
        .context("drain response body")?;
    Ok(status)
}
