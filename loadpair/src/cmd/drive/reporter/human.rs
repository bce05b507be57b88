use std::time::Duration;

use loadpair_lib::driver::{DriverReport, Reporter, RequestResultEvent};

use super::Progress;

pub struct HumanReporter {
    interval: Duration,
    progress: Progress,
}

impl HumanReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            progress: Progress::default(),
        }
    }
}

impl Reporter for HumanReporter {
    fn on_result(&mut self, ev: &RequestResultEvent) {
        self.progress.apply(ev);
    }

    fn on_tick(&mut self, now: Duration) {
        let Some(rps) = self.progress.tick(now, self.interval) else {
            return;
        };

        let interval = &self.progress.interval;
        let total = &self.progress.total;
        println!(
            "t={:.1}s idx={} rps={:.1} ok={} http_fail={} network_fail={} timeout={} total_ok={} total_fail={}",
            now.as_secs_f64(),
            self.progress.last_index.unwrap_or_default(),
            rps,
            interval.ok,
            interval.http_fail,
            interval.network_fail,
            interval.timeout,
            total.ok,
            total.failed(),
        );

        self.progress.reset_interval();
    }

    fn finish(&mut self, report: &DriverReport) {
        let DriverReport { elapsed, counters } = report;
        println!(
            " - Execution time {} (ok={} http_fail={} network_fail={} timeout={} total={})",
            humantime::format_duration(*elapsed),
            counters.ok,
            counters.http_fail,
            counters.network_fail,
            counters.timeout,
            counters.total,
        );
    }
}
