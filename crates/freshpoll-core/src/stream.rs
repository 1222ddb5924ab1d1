//! The consumer-facing fresh value stream.
//!
//! Every call to [`FreshValueStream::observe`] spawns one poll task that owns
//! all per-attachment state: the cache, the last emitted value, and the
//! generation of the active fetch cycle. Ticks, fetch completions, and
//! retries are all processed on that task, so the state needs no lock.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::errors::PollerError;
use crate::fetch::{Fetcher, SegmentStamped};
use crate::gate::FreshnessGate;
use crate::retry::{CycleOutcome, RetryCycle};
use crate::settings::PollerSettings;
use crate::ticker::AlignedTicker;

/// Outcome of one cycle, stamped with the tick generation that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<V> {
    pub generation: u64,
    pub outcome: CycleOutcome<V>,
}

type ActiveCycle<V> = Pin<Box<dyn Future<Output = Resolution<V>> + Send>>;

/// State owned by a single attachment.
#[derive(Debug)]
pub struct PollState<V> {
    cache: V,
    last_emitted: Option<V>,
    generation: u64,
}

impl<V: Clone + PartialEq> PollState<V> {
    pub fn new(cache: V) -> Self {
        Self {
            cache,
            last_emitted: None,
            generation: 0,
        }
    }

    pub fn cache(&self) -> &V {
        &self.cache
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The value a consumer sees on attach.
    pub fn seed(&mut self) -> Option<V> {
        let cache = self.cache.clone();
        self.admit(cache)
    }

    /// Start a new generation; anything resolved for an older one is ignored.
    pub fn begin_tick(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Fold a resolved cycle into the state and return the value to emit, if any.
    ///
    /// Only fresh outcomes write the cache. Exhausted outcomes resolve to the
    /// cache as it stands.
    pub fn apply(&mut self, resolution: Resolution<V>) -> Option<V> {
        if resolution.generation != self.generation {
            debug!(
                event = "core.stream.resolution_dropped",
                resolved_generation = resolution.generation,
                current_generation = self.generation,
            );
            return None;
        }

        let value = match resolution.outcome {
            CycleOutcome::Fresh { value, .. } => {
                self.cache = value.clone();
                value
            }
            CycleOutcome::Exhausted { .. } => self.cache.clone(),
        };
        self.admit(value)
    }

    fn admit(&mut self, value: V) -> Option<V> {
        if self.last_emitted.as_ref() == Some(&value) {
            return None;
        }
        self.last_emitted = Some(value.clone());
        Some(value)
    }
}

/// Live, deduplicated view of the freshest upstream value.
pub struct FreshValueStream<F: Fetcher> {
    fetcher: Arc<F>,
    clock: Arc<dyn Clock>,
    settings: PollerSettings,
    initial: F::Value,
}

impl<F> FreshValueStream<F>
where
    F: Fetcher,
    F::Value: SegmentStamped + Clone + PartialEq + fmt::Debug + Sync,
{
    /// `initial` seeds the cache of every attachment until a fresh value arrives.
    pub fn new(
        fetcher: F,
        clock: Arc<dyn Clock>,
        settings: PollerSettings,
        initial: F::Value,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            clock,
            settings,
            initial,
        }
    }

    pub fn from_config(
        fetcher: F,
        clock: Arc<dyn Clock>,
        config: &freshpoll_config::PollerConfig,
        initial: F::Value,
    ) -> Result<Self, PollerError> {
        let settings = PollerSettings::try_from(config)?;
        Ok(Self::new(fetcher, clock, settings, initial))
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Attach a consumer.
    ///
    /// The returned stream yields the cached value immediately, then each
    /// distinct resolved value. It never yields an error and only ends once
    /// it is cancelled. Must be called from within a tokio runtime.
    pub fn observe(&self) -> FreshValues<F::Value> {
        let (tx, rx) = mpsc::channel(self.settings.buffer);
        let token = CancellationToken::new();

        let task = PollTask {
            fetcher: self.fetcher.clone(),
            clock: self.clock.clone(),
            settings: self.settings,
            state: PollState::new(self.initial.clone()),
            tx,
            token: token.clone(),
        };
        tokio::spawn(task.run());

        FreshValues {
            receiver: rx,
            token: token.clone(),
            _guard: token.drop_guard(),
        }
    }
}

struct PollTask<F: Fetcher> {
    fetcher: Arc<F>,
    clock: Arc<dyn Clock>,
    settings: PollerSettings,
    state: PollState<F::Value>,
    tx: mpsc::Sender<F::Value>,
    token: CancellationToken,
}

impl<F> PollTask<F>
where
    F: Fetcher,
    F::Value: SegmentStamped + Clone + PartialEq + fmt::Debug + Sync,
{
    async fn run(mut self) {
        info!(
            event = "core.stream.attached",
            window_secs = self.settings.window.secs(),
            max_attempts = self.settings.retry.max_attempts(),
        );

        if let Some(seed) = self.state.seed()
            && !self.emit(seed).await
        {
            self.log_detached();
            return;
        }

        let mut ticker = AlignedTicker::new(self.clock.clone(), self.settings.window);
        let mut active: Option<ActiveCycle<F::Value>> = None;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                tick = ticker.tick() => {
                    let generation = self.state.begin_tick();
                    if active.is_some() {
                        info!(event = "core.stream.cycle_preempted", generation = generation - 1);
                    }
                    debug!(
                        event = "core.stream.tick",
                        sequence = tick.sequence,
                        kind = ?tick.kind,
                        at = %tick.at,
                        generation,
                    );
                    active = Some(self.start_cycle(generation));
                }
                resolution = next_resolution(&mut active) => {
                    active = None;
                    self.log_resolution(&resolution);
                    if let Some(value) = self.state.apply(resolution)
                        && !self.emit(value).await
                    {
                        break;
                    }
                }
            }
        }

        self.log_detached();
    }

    fn start_cycle(&self, generation: u64) -> ActiveCycle<F::Value> {
        let cycle = RetryCycle::new(
            self.fetcher.clone(),
            self.clock.clone(),
            FreshnessGate::new(self.settings.window),
            self.settings.retry,
        );
        Box::pin(async move {
            Resolution {
                generation,
                outcome: cycle.run().await,
            }
        })
    }

    /// Send a value downstream. Returns `false` once the consumer is gone.
    async fn emit(&self, value: F::Value) -> bool {
        debug!(event = "core.stream.emit", value = ?value);
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.tx.send(value) => sent.is_ok(),
        }
    }

    fn log_resolution(&self, resolution: &Resolution<F::Value>) {
        match &resolution.outcome {
            CycleOutcome::Fresh { value, attempts } => {
                info!(
                    event = "core.stream.cache_updated",
                    generation = resolution.generation,
                    attempts,
                    value = ?value,
                );
            }
            CycleOutcome::Exhausted { attempts, .. } => {
                info!(
                    event = "core.stream.fallback_to_cache",
                    generation = resolution.generation,
                    attempts,
                    cache = ?self.state.cache(),
                );
            }
        }
    }

    fn log_detached(&self) {
        info!(
            event = "core.stream.detached",
            generation = self.state.generation()
        );
    }
}

async fn next_resolution<V>(active: &mut Option<ActiveCycle<V>>) -> Resolution<V> {
    match active {
        Some(cycle) => cycle.await,
        None => std::future::pending().await,
    }
}

/// Consumer handle returned by [`FreshValueStream::observe`].
///
/// Dropping it detaches: the poll task stops, and any in-flight fetch or
/// pending retry is cancelled.
pub struct FreshValues<V> {
    receiver: mpsc::Receiver<V>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl<V> FreshValues<V> {
    /// Wait for the next distinct value.
    ///
    /// Returns `None` only after [`cancel`](Self::cancel) or runtime shutdown.
    pub async fn next_value(&mut self) -> Option<V> {
        self.receiver.recv().await
    }

    /// Detach without dropping the handle.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<V> Stream for FreshValues<V> {
    type Item = V;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<V>> {
        self.receiver.poll_recv(cx)
    }
}
