use std::convert::Infallible;

use rama::{
    Service,
    http::{Request, Response, service::web::response::IntoResponse},
    telemetry::tracing,
};

use super::ResponderConfigStore;

/// Answers every request, regardless of method or path,
/// with the configured body after the configured latency.
///
/// Each request takes its own snapshot of the config,
/// and waits independently of other in-flight requests.
#[derive(Debug, Clone)]
pub struct MockResponder {
    store: ResponderConfigStore,
}

impl MockResponder {
    pub fn new(store: ResponderConfigStore) -> Self {
        Self { store }
    }
}

impl Service<Request> for MockResponder {
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let cfg = self.store.snapshot();

        tracing::debug!(
            http.request.method = %req.method(),
            url.path = %req.uri().path(),
            latency_ms = cfg.duration,
            "mock request received",
        );

        let latency = cfg.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        Ok(cfg.response.clone().into_response())
    }
}
