//! centralized (web) client creation for the load driver
//!
//! A single client is created per driver run and shared (cloned)
//! by all dispatcher workers. Targets are expected to use self-signed
//! certificates, so server certificate verification is disabled
//! for both transports.

use std::sync::Arc;

use rama::{
    Service,
    error::{BoxError, ErrorContext as _},
    http::{
        Body, Method, Request, Response, Version,
        client::{EasyHttpWebClient, HttpPooledConnectorConfig},
    },
    net::tls::client::ServerVerifyMode,
    rt::Executor,
    service::BoxService,
    telemetry::tracing,
    tls::boring::client::TlsConnectorDataBuilder,
};

/// Minimum size of the [`HttpTransport::Http1`] connection pool.
///
/// The pool bounds the total amount of connections it holds,
/// active and idle together, to `max(max_in_flight, MAX_IDLE_CONNECTIONS_PER_HOST)`.
/// Idle connections are not capped per host separately.
pub const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// HTTP transport used by the driver to reach the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpTransport {
    /// One request in flight per connection,
    /// idle connections are kept alive and reused.
    #[default]
    Http1,
    /// Many requests multiplexed as streams over a shared connection per host.
    Http2,
}

impl HttpTransport {
    pub fn from_multiplexed(multiplexed: bool) -> Self {
        if multiplexed { Self::Http2 } else { Self::Http1 }
    }

    /// The HTTP version requests are issued with.
    pub fn version(self) -> Version {
        match self {
            Self::Http1 => Version::HTTP_11,
            Self::Http2 => Version::HTTP_2,
        }
    }

    fn tls_connector_config(self) -> TlsConnectorDataBuilder {
        let builder = match self {
            Self::Http1 => TlsConnectorDataBuilder::new_http_1(),
            Self::Http2 => TlsConnectorDataBuilder::new_http_2(),
        };
        builder.with_server_verify_mode(ServerVerifyMode::Disable)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WebClientConfig {
    pub transport: HttpTransport,
    /// Upper bound of requests the caller keeps in flight at once.
    pub max_in_flight: usize,
}

/// Shared web client of the load driver.
///
/// Cheap to clone; all clones share the same connection pool.
#[derive(Clone)]
pub struct WebClient {
    inner: BoxService<Request, Response, BoxError>,
    transport: HttpTransport,
}

impl std::fmt::Debug for WebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebClient")
            .field("transport", &self.transport)
            .finish()
    }
}

impl WebClient {
    #[inline(always)]
    pub fn transport(&self) -> HttpTransport {
        self.transport
    }

    /// Create a body-less GET request for `uri`,
    /// using the HTTP version matching the client's transport.
    pub fn new_get_request(&self, uri: &str) -> Result<Request, BoxError> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .version(self.transport.version())
            .body(Body::empty())
            .context("build GET request")
            .with_context_debug_field("uri", || uri.to_owned())
    }
}

impl Service<Request> for WebClient {
    type Output = Response;
    type Error = BoxError;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        self.inner.serve(req).await
    }
}

/// Create the web client used by all dispatcher workers of a driver run.
pub fn new_web_client(exec: Executor, cfg: WebClientConfig) -> Result<WebClient, BoxError> {
    let WebClientConfig {
        transport,
        max_in_flight,
    } = cfg;
    let max_in_flight = max_in_flight.max(1);

    let tls_config = Some(Arc::new(transport.tls_connector_config()));

    let connector = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(tls_config)
        .with_default_http_connector(exec);

    let inner = match transport {
        HttpTransport::Http1 => connector
            .try_with_connection_pool(http1_pool_config(max_in_flight))
            .context("create keep-alive connection pool for http/1.1 web client")?
            .build_client()
            .boxed(),
        HttpTransport::Http2 => connector
            .try_with_default_connection_pool()
            .context("create connection pool for h2 web client")?
            .build_client()
            .boxed(),
    };

    tracing::debug!(?transport, %max_in_flight, "web client created");

    Ok(WebClient { inner, transport })
}

/// Every in-flight request owns a connection.
fn http1_pool_config(max_in_flight: usize) -> HttpPooledConnectorConfig {
    HttpPooledConnectorConfig {
        max_active: max_in_flight,
        max_total: max_in_flight.max(MAX_IDLE_CONNECTIONS_PER_HOST),
        ..Default::default()
    }
}
