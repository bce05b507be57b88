use std::time::Duration;

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    rt::Executor,
    telemetry::tracing,
};

use clap::Args;
use loadpair_lib::{
    client::HttpTransport,
    driver::{self, DriverConfig, REPORT_INTERVAL, Reporter},
    utils::env,
};

pub mod reporter;

use self::reporter::{HumanReporter, JsonlReporter};

#[derive(Debug, Clone, Args)]
/// send GET requests against a target with bounded concurrency
pub struct DriveCommand {
    /// base url of the target, each request goes to `<URL>/<index>`
    #[arg(long, value_name = "URL", default_value = "")]
    url: String,

    /// amount of requests to send
    #[arg(long, value_name = "N", default_value_t = 1)]
    requests: usize,

    /// issue all requests as HTTP/2, multiplexed over a shared connection
    #[arg(long, default_value_t = false)]
    http2: bool,

    /// amount of requests in flight at once (0 = derive from available cores)
    #[arg(long, value_name = "N", default_value_t = 1)]
    concurrency: usize,

    /// deadline per request (<= 0.0 = no timeout)
    #[arg(long, value_name = "SECONDS", default_value_t = 30.)]
    timeout: f64,

    /// report json instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl DriveCommand {
    fn driver_config(&self) -> DriverConfig {
        let concurrency = if self.concurrency == 0 {
            env::default_concurrency()
        } else {
            self.concurrency
        };

        DriverConfig {
            base_url: self.url.clone(),
            request_count: self.requests,
            transport: HttpTransport::from_multiplexed(self.http2),
            concurrency,
            request_timeout: (self.timeout > 0.).then(|| Duration::from_secs_f64(self.timeout)),
        }
    }
}

pub async fn exec(guard: ShutdownGuard, args: DriveCommand) -> Result<(), BoxError> {
    let cfg = args.driver_config();

    let reporter: Box<dyn Reporter> = if args.json {
        const EMIT_EVENTS: bool = true;
        Box::new(JsonlReporter::new(REPORT_INTERVAL, EMIT_EVENTS))
    } else {
        Box::new(HumanReporter::new(REPORT_INTERVAL))
    };

    let cancelled = guard.clone_weak().into_cancelled();
    let report = driver::run_until(Executor::graceful(guard), cfg, reporter, cancelled)
        .await
        .context("run load driver")?;

    tracing::debug!(
        elapsed = %humantime::format_duration(report.elapsed),
        "drive command finished",
    );

    Ok(())
}
