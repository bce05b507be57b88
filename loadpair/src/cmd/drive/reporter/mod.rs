//! Progress and summary reporters of the `drive` command,
//! writing to stdout.

#![allow(clippy::print_stdout)]

use std::time::Duration;

use loadpair_lib::driver::{Counters, RequestResultEvent};

mod human;
mod json;

pub use self::{human::HumanReporter, json::JsonlReporter};

/// Counts of the current tick interval and of the run so far.
#[derive(Debug, Default)]
struct Progress {
    interval: Counters,
    total: Counters,
    last_index: Option<usize>,
    last_tick: Duration,
}

impl Progress {
    fn apply(&mut self, ev: &RequestResultEvent) {
        self.interval.apply(ev.outcome);
        self.total.apply(ev.outcome);
        self.last_index = Some(ev.index);
    }

    /// Returns the requests per second of the finished interval,
    /// or `None` if `interval` did not pass yet since the previous tick.
    fn tick(&mut self, now: Duration, interval: Duration) -> Option<f64> {
        let elapsed = now.saturating_sub(self.last_tick);
        if elapsed < interval {
            return None;
        }
        self.last_tick = now;

        let secs = elapsed.as_secs_f64();
        Some(if secs == 0. {
            0.
        } else {
            self.interval.total as f64 / secs
        })
    }

    fn reset_interval(&mut self) {
        self.interval = Counters::default();
    }
}
