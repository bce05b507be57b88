use std::{convert::Infallible, path::Path, sync::Arc, time::Duration};

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _, ErrorExt as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue, Request, Response,
        header::CONNECTION,
        layer::{
            required_header::AddRequiredResponseHeadersLayer,
            set_header::SetResponseHeaderLayer, trace::TraceLayer,
        },
        server::HttpServer,
    },
    layer::TimeoutLayer,
    net::{address::SocketAddress, socket::Interface},
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
    tls::boring::server::TlsAcceptorLayer,
};

use loadpair_lib::utils::env::network_service_identifier;

/// Settings shared by all listeners of a process, fixed at startup.
#[derive(Clone)]
pub struct ListenerConfig {
    /// Keep connections open between requests.
    /// When disabled every response carries `Connection: close`.
    pub keep_alive: bool,
    /// Serve HTTPS only when set, plain HTTP otherwise.
    pub tls_acceptor: Option<TlsAcceptorLayer>,
    /// Upper bound for the lifetime of a single accepted connection,
    /// unbounded when `None`.
    pub connection_timeout: Option<Duration>,
}

/// Bind `bind`, publish the bound address under `<data>/<name>.addr.txt`
/// and serve `svc` until the guard is cancelled.
pub async fn run_http_listener<S>(
    data: &Path,
    name: &str,
    bind: Interface,
    guard: ShutdownGuard,
    cfg: ListenerConfig,
    svc: S,
) -> Result<(), BoxError>
where
    S: Service<Request, Output = Response, Error = Infallible>,
{
    let ListenerConfig {
        keep_alive,
        tls_acceptor,
        connection_timeout,
    } = cfg;

    let http_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(network_service_identifier())),
        (!keep_alive)
            .then(|| SetResponseHeaderLayer::overriding(CONNECTION, HeaderValue::from_static("close"))),
    )
        .into_layer(svc);

    let exec = Executor::graceful(guard);
    let http_server = HttpServer::auto(exec.clone()).service(Arc::new(http_svc));

    let tcp_listener = TcpListener::bind(bind, exec)
        .await
        .context("bind http listener")
        .context_field("name", name.to_owned())?;

    let addr = tcp_listener
        .local_addr()
        .context("get bound address for http listener")
        .context_field("name", name.to_owned())?;

    tracing::info!(
        %keep_alive,
        secure = tls_acceptor.is_some(),
        ?connection_timeout,
        "{name} listener bound to: {addr}",
    );
    write_server_socket_address_as_file(data, name, addr.into()).await?;

    match (tls_acceptor, connection_timeout) {
        (Some(tls_acceptor), Some(timeout)) => {
            let tcp_svc =
                TimeoutLayer::new(timeout).into_layer(tls_acceptor.into_layer(http_server));
            tcp_listener.serve(tcp_svc).await;
        }
        (Some(tls_acceptor), None) => {
            tcp_listener.serve(tls_acceptor.into_layer(http_server)).await;
        }
        (None, Some(timeout)) => {
            tcp_listener
                .serve(TimeoutLayer::new(timeout).into_layer(http_server))
                .await;
        }
        (None, None) => {
            tcp_listener.serve(http_server).await;
        }
    }

    tracing::debug!("{name} listener stopped");
    Ok(())
}

async fn write_server_socket_address_as_file(
    dir: &Path,
    name: &str,
    addr: SocketAddress,
) -> Result<(), BoxError> {
    let path = dir.join(format!("{name}.addr.txt"));
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("write server's socket address to file")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.to_owned())
}
