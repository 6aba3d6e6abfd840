use std::sync::Arc;
use std::time::{Duration, Instant};

use url::Url;

use super::collector::result_channel;
use crate::config::app_config::AppConfig;
use crate::config::model::FailurePolicy;
use crate::http_probe::prelude::*;
use crate::http_probe::report;
use crate::trace::prelude::Timeline;

/// Mean phase durations of one run.
///
/// `samples` is the number of timelines the means were taken over. When it is
/// zero there was no data and every mean is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateResult {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    pub tls_handshake: Duration,
    pub ttfb: Duration,
    pub took: Duration,
    pub samples: usize,
    pub failures: usize,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Running per-phase sums.
#[derive(Debug, Clone, Default)]
pub struct PhaseTotals {
    dns: Duration,
    connect: Duration,
    connection: Duration,
    ttfb: Duration,
    count: usize,
}

impl PhaseTotals {
    pub fn add(&mut self, timeline: &Timeline) {
        self.dns += timeline.dns_elapsed;
        self.connect += timeline.connect_elapsed;
        self.connection += timeline.connection_elapsed;
        self.ttfb += timeline.ttfb_elapsed;
        self.count += 1;
    }

    /// Divide the sums by the number of timelines added.
    pub fn finalize(&self, failures: usize, took: Duration) -> AggregateResult {
        let mean = |total: Duration| mean_of(total, self.count);

        AggregateResult {
            dns_lookup: mean(self.dns),
            tcp_connect: mean(self.connect),
            tls_handshake: mean(self.connection),
            ttfb: mean(self.ttfb),
            took,
            samples: self.count,
            failures,
        }
    }
}

/// `total / count`, zero when nothing was counted.
fn mean_of(total: Duration, count: usize) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(count) => total / count,
        Err(_) => {
            let nanos = total.as_nanos() / count as u128;
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        }
    }
}

/// Fans out the probes, drains their outcomes and averages the phases.
pub struct Aggregator {
    client: Arc<ProbeClient>,
    url: Url,
    probes: usize,
    failure_policy: FailurePolicy,
}

impl Aggregator {
    pub fn new(config: &AppConfig, client: Arc<ProbeClient>, probes: usize) -> Self {
        Self {
            client,
            url: config.url.clone(),
            probes,
            failure_policy: config.failure_policy,
        }
    }

    /// Run every probe concurrently and aggregate the results.
    ///
    /// `took` is measured from `started`. A failed probe aborts the run under
    /// `FailurePolicy::Abort`; request construction errors always do.
    pub async fn run(self, started: Instant) -> Result<AggregateResult, ProbeError> {
        let (sender, mut collector) = result_channel(self.probes);

        for _ in 0..self.probes {
            tokio::spawn(run_probe(
                self.client.clone(),
                self.url.clone(),
                sender.clone(),
            ));
        }
        drop(sender);

        let mut totals = PhaseTotals::default();
        let mut failures = 0;

        while let Some(outcome) = collector.next().await {
            match outcome.error {
                None => totals.add(&outcome.timeline),
                Some(err)
                    if err.is_request_error() || self.failure_policy == FailurePolicy::Abort =>
                {
                    return Err(err);
                }
                Some(err) => {
                    failures += 1;
                    log::warn!("excluding failed probe: {}", report(&err));
                }
            }
        }

        debug_assert!(collector.is_closed());
        log::debug!(
            "drained {} of {} probes ({} failed)",
            collector.received(),
            self.probes,
            failures
        );

        Ok(totals.finalize(failures, started.elapsed()))
    }
}
