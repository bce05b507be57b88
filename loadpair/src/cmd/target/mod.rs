use std::{path::PathBuf, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    net::socket::Interface,
    telemetry::tracing,
};

use clap::Args;
use loadpair_lib::{
    target::{AdminService, MockResponder, ResponderConfig, ResponderConfigStore},
    tls::{TlsConfig, new_tls_acceptor_layer},
};

use crate::server::{ListenerConfig, run_http_listener};

#[derive(Debug, Clone, Args)]
/// run the mock target and its admin api
pub struct TargetCommand {
    /// network interface to bind the mock responder to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "0.0.0.0:8080"
    )]
    bind: Interface,

    /// network interface to bind the admin api to
    #[arg(long = "admin-bind", value_name = "INTERFACE", default_value = "0.0.0.0:8081")]
    admin_bind: Interface,

    /// close connections after each response
    #[arg(long, default_value_t = false)]
    disable_keep_alive: bool,

    /// serve HTTPS instead of plain HTTP on both listeners,
    /// using a self-signed certificate unless --ssl-cert and --ssl-key are given
    #[arg(long, default_value_t = false)]
    secure: bool,

    /// PEM encoded certificate (chain) used with --secure
    #[arg(long, value_name = "PATH")]
    ssl_cert: Option<PathBuf>,

    /// PEM encoded private key used with --secure
    #[arg(long, value_name = "PATH")]
    ssl_key: Option<PathBuf>,

    /// initial latency of every mock response
    #[arg(long, value_name = "MS", default_value_t = 32)]
    duration: u64,

    /// initial body of every mock response
    #[arg(long, value_name = "STRING", default_value = "")]
    response: String,

    /// upper bound for the lifetime of an accepted connection (<= 0.0 = no limit)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.)]
    connection_timeout: f64,
}

impl TargetCommand {
    fn tls_config(&self) -> Result<Option<TlsConfig>, BoxError> {
        if !self.secure {
            if self.ssl_cert.is_some() || self.ssl_key.is_some() {
                tracing::warn!("--ssl-cert/--ssl-key are ignored without --secure");
            }
            return Ok(None);
        }
        TlsConfig::try_from_paths(self.ssl_cert.clone(), self.ssl_key.clone()).map(Some)
    }

    fn connection_timeout(&self) -> Option<Duration> {
        (self.connection_timeout > 0.).then(|| Duration::from_secs_f64(self.connection_timeout))
    }

    fn initial_config(&self) -> ResponderConfig {
        ResponderConfig::new(self.duration, self.response.clone())
    }
}

pub async fn exec(data: PathBuf, guard: ShutdownGuard, args: TargetCommand) -> Result<(), BoxError> {
    tokio::fs::create_dir_all(&data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || data.clone())?;
    tracing::debug!(path = ?data, "data directory ready to be used");

    let tls_acceptor = match args.tls_config().context("prepare tls config")? {
        Some(tls_config) => Some(
            new_tls_acceptor_layer(&tls_config)
                .await
                .context("prepare TLS acceptor")?,
        ),
        None => None,
    };

    let listener_cfg = ListenerConfig {
        keep_alive: !args.disable_keep_alive,
        tls_acceptor,
        connection_timeout: args.connection_timeout(),
    };

    let initial = args.initial_config();
    tracing::info!(
        duration = initial.duration,
        response_len = initial.response.len(),
        "responder config ready",
    );
    let store = ResponderConfigStore::new(initial);

    // either listener failing ends the command, the other one is stopped by the shutdown
    tokio::try_join!(
        run_http_listener(
            &data,
            "admin",
            args.admin_bind,
            guard.clone(),
            listener_cfg.clone(),
            AdminService::new(store.clone()),
        ),
        run_http_listener(
            &data,
            "target",
            args.bind,
            guard,
            listener_cfg,
            MockResponder::new(store),
        ),
    )?;

    Ok(())
}
