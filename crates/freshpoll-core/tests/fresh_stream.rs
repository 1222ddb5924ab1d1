//! Integration tests for the fresh value stream.
//!
//! Every test runs on a paused tokio clock, so ticks, retries, and fetch
//! latency advance virtual time deterministically and the anchored wall
//! clock follows along.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use freshpoll_core::{
    AnchoredClock, Clock, FetchError, FreshValueStream, FreshValues, PollerConfig, PollerSettings,
    RetryPolicy, WindowSize, current_segment,
};
use futures::StreamExt;

/// One scripted fetch: resolve with `result` after `delay`.
#[derive(Clone)]
struct Step {
    delay: Duration,
    result: Result<i64, FetchError>,
}

fn ok(value: i64) -> Step {
    Step {
        delay: Duration::ZERO,
        result: Ok(value),
    }
}

fn slow(delay_secs: u64, value: i64) -> Step {
    Step {
        delay: Duration::from_secs(delay_secs),
        result: Ok(value),
    }
}

fn failure() -> Step {
    Step {
        delay: Duration::ZERO,
        result: Err(FetchError::transport("connection refused")),
    }
}

type BoxedFetch = Pin<Box<dyn Future<Output = Result<i64, FetchError>> + Send>>;

/// Replays steps in order, then repeats `fallback` forever.
struct Script {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
}

impl Script {
    fn new(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> impl Future<Output = Result<i64, FetchError>> + Send + use<> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        async move {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            step.result
        }
    }

    fn fetcher(self: &Arc<Self>) -> impl Fn() -> BoxedFetch + Send + Sync + use<> {
        let script = self.clone();
        move || -> BoxedFetch { Box::pin(script.next()) }
    }
}

fn settings(window_secs: u64, max_attempts: u32, delay_secs: u64) -> PollerSettings {
    PollerSettings {
        window: WindowSize::try_from_secs(window_secs).unwrap(),
        retry: RetryPolicy::new(max_attempts, Duration::from_secs(delay_secs)).unwrap(),
        buffer: 16,
    }
}

/// Next emitted value together with the wall-clock second it arrived at.
async fn next_at(values: &mut FreshValues<i64>, clock: &AnchoredClock) -> (i64, i64) {
    let value = values.next().await.expect("stream ended");
    (value, clock.now().timestamp())
}

async fn assert_silent_for(values: &mut FreshValues<i64>, secs: u64) {
    let result = tokio::time::timeout(Duration::from_secs(secs), values.next()).await;
    assert!(result.is_err(), "unexpected emission: {:?}", result);
}

#[tokio::test(start_paused = true)]
async fn test_one_emission_per_boundary_with_increasing_values() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let counter = Arc::new(AtomicUsize::new(0));
    let calls = counter.clone();
    let fetcher = move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) as i64;
        async move { Ok::<_, FetchError>(n) }
    };

    let stream = FreshValueStream::new(fetcher, clock.clone(), settings(600, 20, 30), 0);
    let mut values = stream.observe();

    let mut emissions = Vec::new();
    for _ in 0..7 {
        emissions.push(next_at(&mut values, &clock).await);
    }

    assert_eq!(
        emissions,
        vec![
            (0, 0),
            (1, 600),
            (2, 1200),
            (3, 1800),
            (4, 2400),
            (5, 3000),
            (6, 3600),
        ]
    );
    assert_silent_for(&mut values, 599).await;
    assert_eq!(counter.load(Ordering::SeqCst), 7);
}

#[tokio::test(start_paused = true)]
async fn test_mid_window_activation_aligns_to_boundary() {
    let clock = Arc::new(AnchoredClock::at_epoch(355, 550_000_000).unwrap());
    let window = WindowSize::TEN_MINUTES;
    let reader = clock.clone();
    let fetcher = move || {
        let segment = i64::from(current_segment(reader.now(), window));
        async move { Ok::<_, FetchError>(segment) }
    };

    let stream = FreshValueStream::new(fetcher, clock.clone(), settings(600, 20, 30), -1);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (-1, 355));
    assert_eq!(next_at(&mut values, &clock).await, (0, 355));
    assert_eq!(next_at(&mut values, &clock).await, (1, 600));
    assert_eq!(next_at(&mut values, &clock).await, (2, 1200));
}

#[tokio::test(start_paused = true)]
async fn test_stale_results_keep_cached_value() {
    let clock = Arc::new(AnchoredClock::at_epoch(1200, 0).unwrap());
    let script = Script::new(vec![], ok(1));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 3, 10), 1);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (1, 1200));
    assert_silent_for(&mut values, 599).await;
    assert_eq!(script.calls(), 3);

    // The next tick retries from a fresh budget and still holds the cache.
    assert_silent_for(&mut values, 100).await;
    assert_eq!(script.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_value_after_stale_retries() {
    let clock = Arc::new(AnchoredClock::at_epoch(1200, 0).unwrap());
    let script = Script::new(vec![ok(1), ok(1), ok(2)], ok(2));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 20, 30), 1);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (1, 1200));
    assert_eq!(next_at(&mut values, &clock).await, (2, 1260));
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failures_fall_back_then_recover() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let script = Script::new(vec![failure(), failure(), failure()], ok(1));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 3, 30), 0);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (0, 0));
    assert_eq!(next_at(&mut values, &clock).await, (1, 600));
    assert_eq!(script.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_new_tick_preempts_slow_fetch() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let script = Script::new(vec![slow(1000, 100), ok(1), ok(2)], ok(2));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 20, 30), 0);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (0, 0));
    assert_eq!(next_at(&mut values, &clock).await, (1, 600));
    assert_eq!(next_at(&mut values, &clock).await, (2, 1200));
    assert_silent_for(&mut values, 1000).await;
}

#[tokio::test(start_paused = true)]
async fn test_new_tick_preempts_pending_retries() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    // Window 60s with a 50s retry delay: only two attempts fit before the
    // next tick cancels the cycle.
    let script = Script::new(vec![failure(), failure()], ok(1));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(60, 20, 50), 0);
    let mut values = stream.observe();

    assert_eq!(next_at(&mut values, &clock).await, (0, 0));
    assert_eq!(next_at(&mut values, &clock).await, (1, 60));
    assert_eq!(script.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_consumer_stops_polling() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let script = Script::new(vec![], ok(5));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 20, 30), 0);
    let mut values = stream.observe();
    assert_eq!(next_at(&mut values, &clock).await, (0, 0));
    drop(values);

    tokio::time::sleep(Duration::from_secs(1)).await;
    let calls_at_detach = script.calls();
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert!(calls_at_detach <= 1);
    assert_eq!(script.calls(), calls_at_detach);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_ends_stream() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let script = Script::new(vec![], ok(0));

    let stream =
        FreshValueStream::new(script.fetcher(), clock.clone(), settings(600, 20, 30), 0);
    let mut values = stream.observe();
    assert_eq!(values.next_value().await, Some(0));

    values.cancel();
    assert!(values.is_cancelled());
    assert_eq!(values.next_value().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_attachments_do_not_share_cache() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let window = WindowSize::TEN_MINUTES;
    let reader = clock.clone();
    let fetcher = move || {
        let segment = i64::from(current_segment(reader.now(), window));
        async move { Ok::<_, FetchError>(segment) }
    };

    let stream = FreshValueStream::new(fetcher, clock.clone(), settings(600, 20, 30), -1);
    let mut first = stream.observe();

    assert_eq!(next_at(&mut first, &clock).await, (-1, 0));
    assert_eq!(next_at(&mut first, &clock).await, (0, 0));
    assert_eq!(next_at(&mut first, &clock).await, (1, 600));

    let mut second = stream.observe();
    assert_eq!(next_at(&mut second, &clock).await, (-1, 600));
    assert_eq!(next_at(&mut second, &clock).await, (1, 600));
}

#[tokio::test(start_paused = true)]
async fn test_from_config_uses_configured_window() {
    let clock = Arc::new(AnchoredClock::at_epoch(0, 0).unwrap());
    let mut config = PollerConfig::default();
    config.window.secs = Some(300);
    let window = WindowSize::try_from_secs(300).unwrap();
    let reader = clock.clone();
    let fetcher = move || {
        let segment = i64::from(current_segment(reader.now(), window));
        async move { Ok::<_, FetchError>(segment) }
    };

    let stream = FreshValueStream::from_config(fetcher, clock.clone(), &config, 0).unwrap();
    assert_eq!(stream.settings().window.secs(), 300);

    let mut values = stream.observe();
    assert_eq!(next_at(&mut values, &clock).await, (0, 0));
    assert_eq!(next_at(&mut values, &clock).await, (1, 300));
    assert_eq!(next_at(&mut values, &clock).await, (2, 600));
}
