//! the control core: admission, transport driving, and completion harvesting
use std::time::{Duration, Instant};

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::config::{EngineConfig, Mode};
use crate::cursor::WordCursor;
use crate::error::StrikeFuzzError;
use crate::filters::FilterSet;
use crate::pool::{ContextPool, ResponseStats};
use crate::progress::{ProgressTracker, DEFAULT_WINDOW};
use crate::reporter::Reporter;
use crate::strategies::{self, Strategy};
use crate::template::FuzzTemplate;
use crate::transport::{RawResponse, Transport};

/// upper bound on one wait-for-activity call; the loop always regains
/// control within this interval, even with zero ready sockets
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// cadence of the periodic status line
const STATUS_INTERVAL: Duration = Duration::from_millis(500);

// what one in-flight request resolves to: its pool slot, wall time spent,
// and the transport's verdict
type Completion = (usize, Duration, Result<RawResponse, StrikeFuzzError>);

/// single-threaded cooperative fuzzing engine
///
/// "concurrency" here is the number of simultaneously in-flight requests
/// multiplexed by the transport, all driven from one control loop; every
/// piece of shared state (pool, progress counters, rate window) is touched
/// exclusively by that loop, so no synchronization primitives appear
/// anywhere in the engine
pub struct Engine {
    config: EngineConfig,
    strategy: Box<dyn Strategy>,
    template: FuzzTemplate,
    pool: ContextPool,
    filters: FilterSet,
    progress: ProgressTracker,
    transport: Transport,
    reporter: Reporter,
    value_slots: usize,
    exhausted: bool,
}

impl Engine {
    /// assemble the engine from its parsed configuration
    ///
    /// placeholder/word-list count mismatches are repaired here: missing
    /// cursors are padded with the one-word dummy list and extra cursors are
    /// dropped, each with a visible warning, so the iteration arithmetic
    /// downstream never changes
    ///
    /// # Errors
    ///
    /// fails only when the transport multiplexer can't be created; that is
    /// fatal, the engine couldn't make any progress at all
    #[instrument(skip_all, level = "trace")]
    pub fn new(
        config: EngineConfig,
        template: FuzzTemplate,
        mut cursors: Vec<WordCursor>,
        filters: FilterSet,
    ) -> Result<Self, StrikeFuzzError> {
        // at least one value slot is kept so a marker-free template still
        // produces a single request
        let value_slots = template.total_placeholders().max(1);

        if config.mode != Mode::Singular {
            if cursors.len() < value_slots {
                warn!(
                    placeholders = value_slots,
                    wordlists = cursors.len(),
                    "fewer word-lists than placeholders; padding with the one-word dummy list"
                );

                cursors.resize_with(value_slots, WordCursor::dummy);
            } else if cursors.len() > value_slots {
                warn!(
                    placeholders = value_slots,
                    wordlists = cursors.len(),
                    "more word-lists than placeholders; ignoring the extras"
                );

                cursors.truncate(value_slots);
            }
        }

        let strategy = strategies::build(config.mode, cursors);
        let progress = ProgressTracker::new(strategy.cardinality(), DEFAULT_WINDOW);
        let transport = Transport::new(config.timeout)?;
        let pool = ContextPool::new(config.concurrency);

        Ok(Self {
            config,
            strategy,
            template,
            pool,
            filters,
            progress,
            transport,
            reporter: Reporter::new(false),
            value_slots,
            exhausted: false,
        })
    }

    /// replace the default reporter, e.g. to silence the status line
    pub fn set_reporter(&mut self, reporter: Reporter) {
        self.reporter = reporter;
    }

    /// run the fuzzing epoch to completion
    ///
    /// each tick admits new requests while a context is free, the strategy
    /// has more combinations, and the measured rate sits below the ceiling;
    /// then waits (bounded) for socket activity and drains every completion
    /// that is ready. the loop ends when the strategy is exhausted and zero
    /// contexts remain in use
    ///
    /// # Errors
    ///
    /// transport errors on individual requests are recorded and reported,
    /// never returned; this only propagates failures of the loop machinery
    /// itself
    #[instrument(skip_all, fields(mode = self.strategy.name()), level = "trace")]
    pub async fn run(&mut self) -> Result<(), StrikeFuzzError> {
        let mut in_flight: FuturesUnordered<LocalBoxFuture<'static, Completion>> =
            FuturesUnordered::new();

        let mut last_status = Instant::now();

        info!(
            mode = self.strategy.name(),
            planned = self.progress.total_requests(),
            concurrency = self.pool.capacity(),
            rate_ceiling = self.config.rate,
            "starting fuzzing run"
        );

        loop {
            // (a) admit while a context is free, words remain, and the
            // measured rate is below the ceiling
            while !self.exhausted && !self.rate_limited() {
                let Some(slot) = self.pool.claim() else {
                    break;
                };

                let mut values = vec![Vec::new(); self.value_slots];

                if self.strategy.load_next(&mut values) {
                    self.exhausted = true;
                    self.pool.release(slot);
                    break;
                }

                let resolved = self.template.instantiate(&values);
                self.pool.get_mut(slot).set_values(values);

                let transport = self.transport.clone();

                in_flight.push(
                    async move {
                        let started = Instant::now();
                        let result = transport.send(&resolved).await;
                        (slot, started.elapsed(), result)
                    }
                    .boxed_local(),
                );

                // pacing only; correctness never depends on this sleep
                if let Some((low, high)) = self.config.delay {
                    tokio::time::sleep(pick_delay(low, high)).await;
                }
            }

            if self.exhausted && in_flight.is_empty() {
                break;
            }

            // (b) drive the in-flight requests, bounded so the loop regains
            // control even when nothing is ready, then (c) drain every
            // completion that has already resolved
            match tokio::time::timeout(POLL_TIMEOUT, in_flight.next()).await {
                Ok(Some(completion)) => {
                    self.complete(completion);

                    while let Some(Some(completion)) = in_flight.next().now_or_never() {
                        self.complete(completion);
                    }
                }
                Ok(None) => {
                    // nothing in flight; we're here because the rate ceiling
                    // is holding admissions back
                    tokio::time::sleep(POLL_TIMEOUT).await;
                }
                Err(_) => {} // poll timeout expired with sockets still pending
            }

            if last_status.elapsed() >= STATUS_INTERVAL {
                self.reporter.progress(&self.progress);
                last_status = Instant::now();
            }
        }

        self.reporter.finish(&self.progress);

        info!(
            completed = self.progress.completed(),
            errors = self.progress.errors(),
            "fuzzing run finished"
        );

        Ok(())
    }

    // record stats, classify, report, update progress, recycle the slot
    fn complete(&mut self, (slot, elapsed, result): Completion) {
        let stats = match result {
            Ok(raw) => ResponseStats::from_response(
                raw.status_code,
                &raw.body,
                u64::try_from(raw.elapsed.as_millis()).unwrap_or(u64::MAX),
            ),
            Err(error) => {
                warn!(%error, "request failed at the transport level");

                ResponseStats::from_transport_error(
                    error.to_string(),
                    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                )
            }
        };

        let is_error = stats.transport_error.is_some();

        self.pool.get_mut(slot).set_stats(stats);

        let context = self.pool.get(slot);

        if self.filters.evaluate(context.stats()) {
            self.reporter.report(context.values(), context.stats());
        }

        self.progress.record_completion(is_error);
        self.pool.release(slot);
    }

    fn rate_limited(&self) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let ceiling = self.config.rate as f64;

        self.config.rate > 0 && self.progress.rate() >= ceiling
    }

    /// progress counters for this run
    #[must_use]
    pub const fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// the request context pool
    #[must_use]
    pub const fn pool(&self) -> &ContextPool {
        &self.pool
    }
}

/// fixed delay when the bounds agree, uniform-random within them otherwise
fn pick_delay(low: Duration, high: Duration) -> Duration {
    if low == high {
        return low;
    }

    let micros = rand::thread_rng().gen_range(low.as_micros()..=high.as_micros());

    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn quiet_engine(
        config: EngineConfig,
        template: FuzzTemplate,
        cursors: Vec<WordCursor>,
        filters: FilterSet,
    ) -> Engine {
        let mut engine = Engine::new(config, template, cursors, filters).unwrap();
        engine.set_reporter(Reporter::new(true));
        engine
    }

    fn config_with(mode: Mode, concurrency: usize) -> EngineConfig {
        EngineConfig {
            concurrency,
            rate: 0,
            timeout: Some(Duration::from_secs(5)),
            delay: None,
            mode,
            marker: "FUZZ".to_string(),
        }
    }

    fn cursor_of(words: &[&str]) -> WordCursor {
        WordCursor::new(words.join("\n").into_bytes())
    }

    /// a full epoch against a live server: every word is sent exactly once,
    /// the default filter keeps only the hit, and the pool drains completely
    #[tokio::test]
    async fn full_run_sends_every_combination_once() {
        let server = MockServer::start_async().await;

        let found = server
            .mock_async(|when, then| {
                when.method(GET).path("/admin");
                then.status(200).body("secret panel\n");
            })
            .await;

        let template = FuzzTemplate::new(&server.url("/FUZZ"), "FUZZ");
        let cursors = vec![cursor_of(&["admin", "backup", "login"])];
        let filters = FilterSet::from_rules(Vec::new(), false);

        let mut engine = quiet_engine(config_with(Mode::Clusterbomb, 2), template, cursors, filters);

        engine.run().await.unwrap();

        found.assert_async().await; // exactly one request hit /admin

        assert_eq!(engine.progress().completed(), 3);
        assert_eq!(engine.progress().errors(), 0);
        assert_eq!(engine.pool().in_use(), 0);
        assert!((engine.progress().percentage() - 100.0).abs() < f64::EPSILON);
    }

    /// clusterbomb over two lists covers the full product against the server
    #[tokio::test]
    async fn clusterbomb_covers_the_product() {
        let server = MockServer::start_async().await;

        let any = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let template = FuzzTemplate::new(&server.url("/FUZZ/FUZZ"), "FUZZ");
        let cursors = vec![cursor_of(&["a", "b"]), cursor_of(&["1", "2", "3"])];
        let filters = FilterSet::from_rules(Vec::new(), true);

        let mut engine = quiet_engine(config_with(Mode::Clusterbomb, 4), template, cursors, filters);

        engine.run().await.unwrap();

        assert_eq!(any.hits_async().await, 6);
        assert_eq!(engine.progress().completed(), 6);
    }

    /// transport-level failures never abort the run; they are counted and
    /// the epoch still finishes
    #[tokio::test]
    async fn transport_errors_are_counted_not_fatal() {
        // nothing listens on port 1; every request is refused
        let template = FuzzTemplate::new("http://127.0.0.1:1/FUZZ", "FUZZ");
        let cursors = vec![cursor_of(&["a", "b"])];
        let filters = FilterSet::from_rules(Vec::new(), false);

        let mut engine = quiet_engine(config_with(Mode::Clusterbomb, 2), template, cursors, filters);

        engine.run().await.unwrap();

        assert_eq!(engine.progress().completed(), 2);
        assert_eq!(engine.progress().errors(), 2);
        assert_eq!(engine.pool().in_use(), 0);
    }

    /// a low requests/second ceiling holds admissions back without ever
    /// stalling the epoch: every word is still sent, the pool drains, and
    /// the run takes visibly longer than an unthrottled one (which finishes
    /// in milliseconds against a local mock)
    #[tokio::test]
    async fn rate_ceiling_throttles_admissions_but_the_epoch_completes() {
        let server = MockServer::start_async().await;

        let any = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200);
            })
            .await;

        let template = FuzzTemplate::new(&server.url("/FUZZ"), "FUZZ");
        let cursors = vec![cursor_of(&["a", "b", "c", "d", "e", "f"])];
        let filters = FilterSet::from_rules(Vec::new(), true);

        let mut config = config_with(Mode::Clusterbomb, 2);
        config.rate = 2; // two requests per second

        let mut engine = quiet_engine(config, template, cursors, filters);

        let started = Instant::now();
        engine.run().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(any.hits_async().await, 6);
        assert_eq!(engine.progress().completed(), 6);
        assert_eq!(engine.progress().errors(), 0);
        assert_eq!(engine.pool().in_use(), 0);

        // after the first burst of two completions the measured rate sits at
        // or above the ceiling until at least a full second has passed, so
        // six requests cannot finish at mock-server speed
        assert!(
            elapsed >= Duration::from_millis(900),
            "rate ceiling did not slow the run: {elapsed:?}"
        );
    }

    /// missing cursors are padded with the dummy list; the planned total
    /// reflects the repaired registry
    #[test]
    fn cursor_shortfall_is_padded_with_dummies() {
        let template = FuzzTemplate::new("http://example.com/FUZZ/FUZZ", "FUZZ");
        let cursors = vec![cursor_of(&["a", "b", "c"])];
        let filters = FilterSet::from_rules(Vec::new(), false);

        let engine = Engine::new(config_with(Mode::Clusterbomb, 1), template, cursors, filters)
            .unwrap();

        // 3 words x 1 dummy word
        assert_eq!(engine.progress().total_requests(), 3);
    }

    /// extra cursors beyond the placeholder count are ignored
    #[test]
    fn extra_cursors_are_ignored() {
        let template = FuzzTemplate::new("http://example.com/FUZZ", "FUZZ");
        let cursors = vec![cursor_of(&["a", "b"]), cursor_of(&["x", "y", "z"])];
        let filters = FilterSet::from_rules(Vec::new(), false);

        let engine = Engine::new(config_with(Mode::Pitchfork, 1), template, cursors, filters)
            .unwrap();

        assert_eq!(engine.progress().total_requests(), 2);
    }

    /// a marker-free template still plans a single request
    #[test]
    fn static_template_plans_one_request() {
        let template = FuzzTemplate::new("http://example.com/health", "FUZZ");
        let filters = FilterSet::from_rules(Vec::new(), false);

        let engine =
            Engine::new(config_with(Mode::Clusterbomb, 1), template, Vec::new(), filters).unwrap();

        assert_eq!(engine.progress().total_requests(), 1);
    }
}
