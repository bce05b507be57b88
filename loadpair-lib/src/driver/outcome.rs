use std::time::{Duration, SystemTime};

/// What happened to a single dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response was received and its body fully drained.
    Response { status: u16 },
    /// Connecting, sending or draining failed.
    NetworkError,
    /// The per-request deadline expired first.
    Timeout,
}

impl Outcome {
    /// Responses with a status in `200..400` count as ok.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Response { status } if (200..400).contains(status))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status } => Some(*status),
            Self::NetworkError | Self::Timeout => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Response { .. } if self.is_ok() => "ok",
            Self::Response { .. } => "http_status",
            Self::NetworkError => "network",
            Self::Timeout => "timeout",
        }
    }
}

/// Emitted by a dispatcher worker for every consumed work item.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub index: usize,
    pub latency: Duration,
    pub outcome: Outcome,
}

/// [`RequestOutcome`] enriched by the aggregator with run timing.
#[derive(Debug, Clone)]
pub struct RequestResultEvent {
    pub ts: SystemTime,
    /// Time since the driver started sending work.
    pub elapsed: Duration,
    pub index: usize,
    pub latency: Duration,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: u64,
    pub ok: u64,
    pub http_fail: u64,
    pub network_fail: u64,
    pub timeout: u64,
}

impl Counters {
    pub fn apply(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Response { .. } if outcome.is_ok() => self.ok += 1,
            Outcome::Response { .. } => self.http_fail += 1,
            Outcome::NetworkError => self.network_fail += 1,
            Outcome::Timeout => self.timeout += 1,
        }
    }

    pub fn failed(&self) -> u64 {
        self.total - self.ok
    }
}

/// Final result of a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverReport {
    /// Wall-clock time from sending the first work item
    /// until the last worker exited.
    pub elapsed: Duration,
    pub counters: Counters,
}

/// Observer of a driver run, e.g. to print progress.
pub trait Reporter: Send + 'static {
    fn on_result(&mut self, ev: &RequestResultEvent);
    fn on_tick(&mut self, now: Duration);
    fn finish(&mut self, report: &DriverReport);
}

/// Reporter which ignores everything.
impl Reporter for () {
    fn on_result(&mut self, _ev: &RequestResultEvent) {}
    fn on_tick(&mut self, _now: Duration) {}
    fn finish(&mut self, _report: &DriverReport) {}
}

impl Reporter for Box<dyn Reporter> {
    fn on_result(&mut self, ev: &RequestResultEvent) {
        (**self).on_result(ev)
    }

    fn on_tick(&mut self, now: Duration) {
        (**self).on_tick(now)
    }

    fn finish(&mut self, report: &DriverReport) {
        (**self).finish(report)
    }
}
