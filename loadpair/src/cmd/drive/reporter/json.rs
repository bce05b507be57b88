use std::time::Duration;

use loadpair_lib::driver::{Counters, DriverReport, Reporter, RequestResultEvent};

use super::Progress;

pub struct JsonlReporter {
    interval: Duration,
    progress: Progress,
    emit_events: bool,
}

impl JsonlReporter {
    pub fn new(interval: Duration, emit_events: bool) -> Self {
        Self {
            interval,
            progress: Progress::default(),
            emit_events,
        }
    }
}

fn counters_json(c: &Counters) -> serde_json::Value {
    serde_json::json!({
        "total": c.total,
        "ok": c.ok,
        "http_fail": c.http_fail,
        "network_fail": c.network_fail,
        "timeout": c.timeout,
    })
}

impl Reporter for JsonlReporter {
    fn on_result(&mut self, ev: &RequestResultEvent) {
        self.progress.apply(ev);

        if self.emit_events {
            let line = serde_json::json!({
                "type": "event",
                "t_ms": ev.elapsed.as_millis(),
                "index": ev.index,
                "latency_ms": ev.latency.as_millis(),
                "ok": ev.outcome.is_ok(),
                "status": ev.outcome.status(),
                "outcome": ev.outcome.as_str(),
            });
            println!("{line}");
        }
    }

    fn on_tick(&mut self, now: Duration) {
        let Some(rps) = self.progress.tick(now, self.interval) else {
            return;
        };

        let line = serde_json::json!({
            "type": "summary",
            "t_ms": now.as_millis(),
            "index": self.progress.last_index,
            "interval_ms": self.interval.as_millis(),
            "rps": rps,
            "interval": counters_json(&self.progress.interval),
            "total": counters_json(&self.progress.total),
        });
        println!("{line}");

        self.progress.reset_interval();
    }

    fn finish(&mut self, report: &DriverReport) {
        let line = serde_json::json!({
            "type": "final",
            "elapsed_ms": report.elapsed.as_millis(),
            "elapsed": humantime::format_duration(report.elapsed).to_string(),
            "total": counters_json(&report.counters),
        });
        println!("{line}");
    }
}
