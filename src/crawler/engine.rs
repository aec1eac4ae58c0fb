//! Crawl engine - bounded-concurrency dispatch loop
//!
//! The engine owns the frontier and the stage chain. Each dispatched request runs
//! as a tokio task that performs the retry-wrapped fetch and parse, and reports
//! back over a channel. Only the controller loop pops the frontier, pushes new
//! requests, updates the counters and invokes stages.

use crate::config::{validate_crawler_settings, CrawlerSettings};
use crate::crawler::frontier::Frontier;
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::crawler::stats::{CrawlStats, StatsSnapshot};
use crate::crawler::Source;
use crate::model::{FetchRequest, ParseYield};
use crate::pipeline::{ChainOutcome, Stage, StageChain};
use crate::state::EngineState;
use crate::{ConfigError, FetchError, ParseError, SumiError};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinSet};

/// Message from a fetch task to the controller
#[derive(Debug)]
enum TaskEvent {
    /// A fetch attempt is about to be made
    AttemptStarted,

    /// The source returned a response
    ResponseReceived,

    /// The parse stream produced a value
    Yielded(ParseYield),
}

/// How a fetch task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Completed,
    Abandoned,
}

/// Failure of a single attempt
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// State shared between an engine and its handles
#[derive(Debug)]
struct EngineShared {
    state: AtomicU8,
    stop_requested: AtomicBool,
    stats: CrawlStats,
}

impl EngineShared {
    fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state.to_u8(), Ordering::SeqCst);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

/// Cloneable view of a running engine
///
/// Lets other tasks (or the source itself) stop a run and observe its progress.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    /// Requests that the current run stop dispatching
    ///
    /// In-flight tasks are not cancelled. The run drains them, closes the stages
    /// and returns normally. A stop issued before `crawl` starts is cleared by it.
    pub fn stop(&self) {
        if !self.shared.stop_requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested");
        }
    }

    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// Snapshot of the counters of the current or last run
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

/// The crawl orchestrator
pub struct Engine {
    settings: CrawlerSettings,
    retry: RetryPolicy,
    chain: StageChain,
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("chain", &self.chain)
            .field("state", &self.shared.state())
            .finish()
    }
}

impl Engine {
    /// Creates an engine from validated settings and an ordered list of stages
    ///
    /// # Arguments
    ///
    /// * `settings` - Concurrency limit, per-attempt delay, jitter and retry limit
    /// * `stages` - Record stages, invoked in the given order
    ///
    /// # Returns
    ///
    /// * `Ok(Engine)` - An idle engine
    /// * `Err(ConfigError)` - Settings out of range, or duplicate or empty stage names
    pub fn new(settings: CrawlerSettings, stages: Vec<Box<dyn Stage>>) -> Result<Self, ConfigError> {
        validate_crawler_settings(&settings)?;
        let chain = StageChain::new(stages)?;

        Ok(Self {
            retry: RetryPolicy::from_settings(&settings),
            settings,
            chain,
            shared: Arc::new(EngineShared {
                state: AtomicU8::new(EngineState::Idle.to_u8()),
                stop_requested: AtomicBool::new(false),
                stats: CrawlStats::new(),
            }),
        })
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Runs one crawl of `source` to completion
    ///
    /// Per-request failures never end the run; a stage failure does, after the
    /// opened stages are closed and the source's `closed` hook has run.
    ///
    /// # Arguments
    ///
    /// * `source` - Supplies the seed requests, fetches and parses responses
    ///
    /// # Returns
    ///
    /// * `Ok(StatsSnapshot)` - Final statistics of the run
    /// * `Err(SumiError)` - The engine was already running, or a stage failed
    pub async fn crawl<S: Source>(&mut self, source: Arc<S>) -> Result<StatsSnapshot, SumiError> {
        self.begin()?;
        tracing::info!(
            "Starting crawl of '{}' (concurrency {}, retry limit {})",
            source.name(),
            self.settings.concurrency_limit,
            self.settings.retry_limit
        );
        let start_time = std::time::Instant::now();

        let outcome = self.drive(&source).await;
        if let Err(e) = &outcome {
            tracing::error!("Crawl of '{}' failed: {}", source.name(), e);
        }

        self.enter_draining();
        let close_result = self.chain.close(source.as_ref()).await;
        source.closed().await;
        let stop_result = self.transition(EngineState::Stopped);

        let stats = self.shared.stats.snapshot();
        tracing::info!(
            "Crawl of '{}' finished in {:?}: {} sent, {} received, {} accepted, {} dropped, {} abandoned",
            source.name(),
            start_time.elapsed(),
            stats.requests_sent,
            stats.responses_received,
            stats.records_accepted,
            stats.records_dropped,
            stats.requests_abandoned
        );

        outcome?;
        close_result?;
        stop_result?;
        Ok(stats)
    }

    fn begin(&mut self) -> Result<(), SumiError> {
        let state = self.shared.state();
        if state.is_active() {
            return Err(SumiError::AlreadyRunning);
        }
        if state == EngineState::Stopped {
            self.transition(EngineState::Idle)?;
        }

        self.shared.stats.reset();
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        self.transition(EngineState::Running)
    }

    fn transition(&self, next: EngineState) -> Result<(), SumiError> {
        let current = self.shared.state();
        if !current.can_transition_to(next) {
            return Err(SumiError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        tracing::debug!("Engine state {} -> {}", current, next);
        self.shared.set_state(next);
        Ok(())
    }

    fn enter_draining(&self) {
        if self.shared.state() == EngineState::Running {
            tracing::debug!("Engine state running -> draining");
            self.shared.set_state(EngineState::Draining);
        }
    }

    fn accepts_new_requests(&self) -> bool {
        self.shared.state().accepts_dispatch() && !self.shared.stop_requested()
    }

    /// Opens the stages, seeds the frontier and runs the dispatch loop
    async fn drive<S: Source>(&mut self, source: &Arc<S>) -> Result<(), SumiError> {
        self.chain.open(source.as_ref()).await?;

        let mut frontier = Frontier::new();
        frontier.extend(source.initial_requests());
        tracing::info!("Seeded frontier with {} requests", frontier.len());

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut in_flight = JoinSet::new();

        let result = self
            .run_loop(source, &mut frontier, &mut in_flight, &events_tx, &mut events_rx)
            .await;

        if result.is_err() {
            in_flight.shutdown().await;
        }
        tracing::debug!("Frontier received {} requests in total", frontier.total_pushed());
        if !frontier.is_empty() {
            tracing::info!("{} queued requests were not dispatched", frontier.len());
        }
        result
    }

    async fn run_loop<S: Source>(
        &mut self,
        source: &Arc<S>,
        frontier: &mut Frontier,
        in_flight: &mut JoinSet<TaskOutcome>,
        events_tx: &UnboundedSender<TaskEvent>,
        events_rx: &mut UnboundedReceiver<TaskEvent>,
    ) -> Result<(), SumiError> {
        loop {
            self.dispatch(source, frontier, in_flight, events_tx)?;
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(event) = events_rx.recv() => {
                    self.handle_event(event, source, frontier).await?;
                }

                Some(joined) = in_flight.join_next() => {
                    self.reap(joined);
                    // A finished task's events were all sent before it returned
                    while let Ok(event) = events_rx.try_recv() {
                        self.handle_event(event, source, frontier).await?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Starts tasks until the concurrency limit is reached or the frontier is empty
    fn dispatch<S: Source>(
        &self,
        source: &Arc<S>,
        frontier: &mut Frontier,
        in_flight: &mut JoinSet<TaskOutcome>,
        events_tx: &UnboundedSender<TaskEvent>,
    ) -> Result<(), SumiError> {
        if self.shared.stop_requested() {
            self.enter_draining();
        }
        if !self.shared.state().accepts_dispatch() {
            return Ok(());
        }

        let limit = self.settings.concurrency_limit;
        while in_flight.len() < limit {
            let request = match frontier.pop() {
                Some(request) => request,
                None => break,
            };

            tracing::debug!("Dispatching {} {}", request.method(), request.url());
            in_flight.spawn(run_request(
                Arc::clone(source),
                request,
                self.retry.clone(),
                events_tx.clone(),
            ));
        }

        if in_flight.len() > limit {
            return Err(SumiError::InvariantViolation(format!(
                "{} tasks in flight with a concurrency limit of {}",
                in_flight.len(),
                limit
            )));
        }
        Ok(())
    }

    async fn handle_event<S: Source>(
        &mut self,
        event: TaskEvent,
        source: &Arc<S>,
        frontier: &mut Frontier,
    ) -> Result<(), SumiError> {
        match event {
            TaskEvent::AttemptStarted => self.shared.stats.increment_requests_sent(),
            TaskEvent::ResponseReceived => self.shared.stats.increment_responses_received(),
            TaskEvent::Yielded(ParseYield::Record(record)) => {
                match self.chain.process(record, source.as_ref()).await? {
                    ChainOutcome::Accepted(_) => self.shared.stats.increment_records_accepted(),
                    ChainOutcome::Dropped { .. } => self.shared.stats.increment_records_dropped(),
                }
            }
            TaskEvent::Yielded(ParseYield::Request(request)) => {
                if self.accepts_new_requests() {
                    frontier.push(request);
                } else {
                    tracing::debug!("Discarding {} discovered while draining", request.url());
                }
            }
        }
        Ok(())
    }

    fn reap(&self, joined: Result<TaskOutcome, JoinError>) {
        match joined {
            Ok(TaskOutcome::Completed) => {}
            Ok(TaskOutcome::Abandoned) => self.shared.stats.increment_requests_abandoned(),
            Err(e) if e.is_panic() => {
                tracing::error!("Fetch task panicked: {}", e);
                self.shared.stats.increment_requests_abandoned();
            }
            Err(e) => tracing::debug!("Fetch task cancelled: {}", e),
        }
    }
}

/// Retry-wrapped fetch and parse of one request
async fn run_request<S: Source>(
    source: Arc<S>,
    request: FetchRequest,
    retry: RetryPolicy,
    events: UnboundedSender<TaskEvent>,
) -> TaskOutcome {
    let mut attempt: u32 = 1;
    loop {
        let delay = retry.attempt_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // The receiver only disappears once the run has failed and tasks are aborted
        let _ = events.send(TaskEvent::AttemptStarted);

        match attempt_once(source.as_ref(), &request, &events).await {
            Ok(()) => return TaskOutcome::Completed,
            Err(e) => match retry.decide(attempt) {
                RetryDecision::Retry { next_attempt } => {
                    tracing::warn!(
                        "Attempt {} for {} failed: {}; retrying",
                        attempt,
                        request.url(),
                        e
                    );
                    attempt = next_attempt;
                }
                RetryDecision::GiveUp { attempts } => {
                    tracing::error!(
                        "Giving up on {} after {} attempts: {}",
                        request.url(),
                        attempts,
                        e
                    );
                    return TaskOutcome::Abandoned;
                }
            },
        }
    }
}

async fn attempt_once<S: Source>(
    source: &S,
    request: &FetchRequest,
    events: &UnboundedSender<TaskEvent>,
) -> Result<(), AttemptError> {
    let response = source.fetch(request).await?;
    let _ = events.send(TaskEvent::ResponseReceived);

    let mut yields = source.parse(response);
    while let Some(item) = yields.next().await {
        let _ = events.send(TaskEvent::Yielded(item?));
    }
    Ok(())
}
