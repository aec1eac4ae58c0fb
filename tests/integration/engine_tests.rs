//! Integration tests for the crawl engine
//!
//! These tests drive the engine with a scripted in-memory source so that
//! failures, link graphs and timing are fully controlled.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sumi_crawl::crawler::{ParseStream, Source};
use sumi_crawl::pipeline::StageResult;
use sumi_crawl::{
    CrawlerSettings, Engine, EngineHandle, EngineState, FetchError, FetchRequest, FetchResponse,
    ParseError, ParseYield, Record, Stage, StageError, StatsSnapshot, SumiError,
};

const ALWAYS: u32 = u32::MAX;

fn url(name: &str) -> String {
    format!("http://test.local/{}", name)
}

fn page_name(request: &FetchRequest) -> String {
    request.url().path().trim_start_matches('/').to_string()
}

fn settings(concurrency_limit: usize, retry_limit: u32) -> CrawlerSettings {
    CrawlerSettings {
        concurrency_limit,
        delay_seconds: 0.0,
        delay_jitter_fraction: 0.0,
        retry_limit,
    }
}

/// Behavior of the scripted source, keyed by page name
#[derive(Default)]
struct Script {
    seeds: Vec<&'static str>,
    fetch_failures: HashMap<&'static str, u32>,
    parse_failures: HashMap<&'static str, u32>,
    links: HashMap<&'static str, Vec<&'static str>>,
    records_per_page: HashMap<&'static str, usize>,
    panics: HashSet<&'static str>,
    fetch_delay: Duration,
    stop_at: Option<&'static str>,
}

struct ScriptedSource {
    script: Script,
    fetch_failures: Mutex<HashMap<String, u32>>,
    parse_failures: Mutex<HashMap<String, u32>>,
    fetches: Mutex<Vec<String>>,
    records_yielded: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed_calls: AtomicUsize,
    handle: Mutex<Option<EngineHandle>>,
    states_seen: Mutex<Vec<EngineState>>,
}

impl ScriptedSource {
    fn new(script: Script) -> Arc<Self> {
        let owned = |map: &HashMap<&'static str, u32>| {
            map.iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>()
        };

        Arc::new(Self {
            fetch_failures: Mutex::new(owned(&script.fetch_failures)),
            parse_failures: Mutex::new(owned(&script.parse_failures)),
            script,
            fetches: Mutex::new(Vec::new()),
            records_yielded: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed_calls: AtomicUsize::new(0),
            handle: Mutex::new(None),
            states_seen: Mutex::new(Vec::new()),
        })
    }

    fn attach(&self, handle: EngineHandle) {
        *self.handle.lock().unwrap() = Some(handle);
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn fetch_count(&self, name: &str) -> usize {
        self.fetches().iter().filter(|n| *n == name).count()
    }

    fn closed_calls(&self) -> usize {
        self.closed_calls.load(Ordering::SeqCst)
    }

    /// Returns true if this attempt should fail, consuming one scripted failure
    fn take_failure(map: &Mutex<HashMap<String, u32>>, name: &str) -> bool {
        let mut map = map.lock().unwrap();
        match map.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != ALWAYS {
                    *remaining -= 1;
                }
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn initial_requests(&self) -> Vec<FetchRequest> {
        self.script
            .seeds
            .iter()
            .map(|name| FetchRequest::get(&url(name)).unwrap())
            .collect()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let name = page_name(request);
        self.fetches.lock().unwrap().push(name.clone());

        let handle = self.handle.lock().unwrap().clone();
        if let Some(handle) = handle {
            self.states_seen.lock().unwrap().push(handle.state());
            if self.script.stop_at == Some(name.as_str()) {
                handle.stop();
            }
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.script.fetch_delay.is_zero() {
            tokio::time::sleep(self.script.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.script.panics.contains(name.as_str()) {
            panic!("scripted panic for {}", name);
        }
        if Self::take_failure(&self.fetch_failures, &name) {
            return Err(FetchError::other(request.url().as_str(), "scripted failure"));
        }

        Ok(FetchResponse::ok(request.clone(), name))
    }

    fn parse<'a>(&'a self, response: FetchResponse) -> ParseStream<'a> {
        let name = page_name(&response.request);
        let count = self
            .script
            .records_per_page
            .get(name.as_str())
            .copied()
            .unwrap_or(1);

        let mut items: Vec<Result<ParseYield, ParseError>> = (0..count)
            .map(|index| {
                Ok(ParseYield::Record(
                    Record::new()
                        .with_field("url", response.url.as_str())
                        .with_field("index", index as u64),
                ))
            })
            .collect();

        if Self::take_failure(&self.parse_failures, &name) {
            items.truncate(1);
            items.push(Err(ParseError::malformed(response.url.as_str(), "scripted")));
        } else if let Some(links) = self.script.links.get(name.as_str()) {
            for link in links {
                items.push(Ok(ParseYield::Request(FetchRequest::get(&url(link)).unwrap())));
            }
        }

        let yielded = &self.records_yielded;
        stream::iter(items)
            .inspect(move |item| {
                if matches!(item, Ok(ParseYield::Record(_))) {
                    yielded.fetch_add(1, Ordering::SeqCst);
                }
            })
            .boxed()
    }

    async fn closed(&self) {
        self.closed_calls.fetch_add(1, Ordering::SeqCst);
    }
}

type Log = Arc<Mutex<Vec<String>>>;
type ProcessFn = Box<dyn FnMut(Record) -> StageResult<Option<Record>> + Send + Sync>;

/// Stage whose `process` behavior is a closure
struct FnStage {
    name: String,
    log: Log,
    process: ProcessFn,
    fail_open: bool,
    fail_close: bool,
}

impl FnStage {
    fn new(
        name: &str,
        log: &Log,
        process: impl FnMut(Record) -> StageResult<Option<Record>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            process: Box::new(process),
            fail_open: false,
            fail_close: false,
        }
    }

    fn accept_all(name: &str, log: &Log) -> Self {
        Self::new(name, log, |record| Ok(Some(record)))
    }
}

#[async_trait]
impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self, _source: &dyn Source) -> StageResult<()> {
        self.log.lock().unwrap().push(format!("open:{}", self.name));
        if self.fail_open {
            return Err(StageError::failed(&self.name, "open failed"));
        }
        Ok(())
    }

    async fn process(&mut self, record: Record, _source: &dyn Source) -> StageResult<Option<Record>> {
        (self.process)(record)
    }

    async fn close(&mut self, _source: &dyn Source) -> StageResult<()> {
        self.log.lock().unwrap().push(format!("close:{}", self.name));
        if self.fail_close {
            return Err(StageError::failed(&self.name, "close failed"));
        }
        Ok(())
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_retry_scenario_counts_every_attempt() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2", "R3"],
        fetch_failures: HashMap::from([("R2", 1)]),
        ..Default::default()
    });
    let log = Log::default();
    let mut engine = Engine::new(
        settings(2, 1),
        vec![Box::new(FnStage::accept_all("accept", &log))],
    )
    .unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(
        stats,
        StatsSnapshot {
            requests_sent: 4,
            responses_received: 3,
            records_accepted: 3,
            records_dropped: 0,
            requests_abandoned: 0,
        }
    );
    assert_eq!(source.fetch_count("R2"), 2);
}

#[tokio::test]
async fn test_dropping_stage_scenario() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2", "R3"],
        fetch_failures: HashMap::from([("R2", 1)]),
        ..Default::default()
    });
    let log = Log::default();
    let dropper = FnStage::new("drop-r2", &log, |record| {
        if record.get_str("url").unwrap_or_default().contains("R2") {
            Ok(None)
        } else {
            Ok(Some(record))
        }
    });
    let mut engine = Engine::new(settings(2, 1), vec![Box::new(dropper)]).unwrap();

    let stats = engine.crawl(source).await.unwrap();

    assert_eq!(stats.requests_sent, 4);
    assert_eq!(stats.responses_received, 3);
    assert_eq!(stats.records_accepted, 2);
    assert_eq!(stats.records_dropped, 1);
}

#[tokio::test]
async fn test_concurrency_bound_is_respected() {
    let seeds = vec![
        "P0", "P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10", "P11",
    ];
    let source = ScriptedSource::new(Script {
        seeds,
        fetch_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(3, 0), Vec::new()).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    let max = source.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "max in flight was {}", max);
    assert!(max >= 2, "requests were never concurrent");
    assert_eq!(stats.responses_received, 12);
}

#[tokio::test]
async fn test_delay_applies_before_every_attempt() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1"],
        fetch_failures: HashMap::from([("R1", 2)]),
        ..Default::default()
    });
    let mut config = settings(1, 3);
    config.delay_seconds = 0.02;
    let mut engine = Engine::new(config, Vec::new()).unwrap();

    let started = Instant::now();
    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetch_count("R1"), 3);
    assert_eq!(stats.requests_sent, 3);
    assert_eq!(stats.responses_received, 1);
    assert_eq!(stats.requests_abandoned, 0);
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_abandoned_request_does_not_halt_run() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["BAD", "GOOD"],
        fetch_failures: HashMap::from([("BAD", ALWAYS)]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(2, 2), Vec::new()).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetch_count("BAD"), 3);
    assert_eq!(source.fetch_count("GOOD"), 1);
    assert_eq!(stats.requests_abandoned, 1);
    assert_eq!(stats.responses_received, 1);
    assert_eq!(stats.records_accepted, 1);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_every_request_failing_still_terminates() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["A", "B", "C"],
        fetch_failures: HashMap::from([("A", ALWAYS), ("B", ALWAYS), ("C", ALWAYS)]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(2, 0), Vec::new()).unwrap();

    let stats = engine.crawl(source).await.unwrap();

    assert_eq!(stats.requests_sent, 3);
    assert_eq!(stats.responses_received, 0);
    assert_eq!(stats.requests_abandoned, 3);
    assert_eq!(stats.records_total(), 0);
}

#[tokio::test]
async fn test_panicking_fetch_counts_as_abandoned() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["BOOM", "OK"],
        panics: HashSet::from(["BOOM"]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(2, 2), Vec::new()).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetch_count("BOOM"), 1);
    assert_eq!(stats.requests_abandoned, 1);
    assert_eq!(stats.records_accepted, 1);
}

#[tokio::test]
async fn test_parse_failure_retries_whole_request() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1"],
        parse_failures: HashMap::from([("R1", 1)]),
        records_per_page: HashMap::from([("R1", 2)]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(1, 1), Vec::new()).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    // One record from the failed attempt plus two from the retry
    assert_eq!(stats.requests_sent, 2);
    assert_eq!(stats.responses_received, 2);
    assert_eq!(stats.records_accepted, 3);
    assert_eq!(
        stats.records_total(),
        source.records_yielded.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_conservation_of_records() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["A", "B"],
        links: HashMap::from([("A", vec!["C", "D"]), ("B", vec!["E"]), ("D", vec!["F"])]),
        records_per_page: HashMap::from([("A", 3), ("B", 0), ("C", 5), ("D", 2), ("F", 4)]),
        fetch_failures: HashMap::from([("C", 1), ("E", ALWAYS)]),
        ..Default::default()
    });
    let log = Log::default();
    let mut counter = 0u32;
    let dropper = FnStage::new("every-other", &log, move |record| {
        counter += 1;
        Ok((counter % 2 == 0).then_some(record))
    });
    let mut engine = Engine::new(settings(3, 1), vec![Box::new(dropper)]).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    // A=3, B=0, C=5, D=2, E abandoned, F=4
    assert_eq!(source.records_yielded.load(Ordering::SeqCst), 14);
    assert_eq!(stats.records_total(), 14);
    assert_eq!(stats.records_accepted, 7);
    assert_eq!(stats.records_dropped, 7);
    assert_eq!(stats.requests_abandoned, 1);
}

#[tokio::test]
async fn test_chain_order_and_short_circuit() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["P1", "P2", "P3"],
        records_per_page: HashMap::from([("P1", 3), ("P2", 3), ("P3", 3)]),
        ..Default::default()
    });
    let log = Log::default();
    let reached_c: Arc<Mutex<Vec<Record>>> = Arc::default();
    let b_inputs_stamped = Arc::new(AtomicUsize::new(0));

    let a = FnStage::new("A", &log, |record| Ok(Some(record.with_field("stamp", "A"))));

    let stamped = Arc::clone(&b_inputs_stamped);
    let mut seen = 0u32;
    let b = FnStage::new("B", &log, move |record| {
        if record.get_str("stamp") == Some("A") {
            stamped.fetch_add(1, Ordering::SeqCst);
        }
        seen += 1;
        if seen % 3 == 0 {
            Ok(None)
        } else {
            Ok(Some(record.with_field("passed_b", true)))
        }
    });

    let sink = Arc::clone(&reached_c);
    let c = FnStage::new("C", &log, move |record| {
        sink.lock().unwrap().push(record.clone());
        Ok(Some(record))
    });

    let mut engine = Engine::new(
        settings(2, 0),
        vec![Box::new(a), Box::new(b), Box::new(c)],
    )
    .unwrap();

    let stats = engine.crawl(source).await.unwrap();

    assert_eq!(b_inputs_stamped.load(Ordering::SeqCst), 9);
    assert_eq!(stats.records_accepted, 6);
    assert_eq!(stats.records_dropped, 3);

    let reached = reached_c.lock().unwrap();
    assert_eq!(reached.len(), 6);
    assert!(reached
        .iter()
        .all(|r| r.get("passed_b") == Some(&serde_json::Value::Bool(true))));

    assert_eq!(
        entries(&log),
        vec!["open:A", "open:B", "open:C", "close:A", "close:B", "close:C"]
    );
}

#[tokio::test]
async fn test_fifo_dispatch_with_single_worker() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["S1", "S2", "S3", "S4", "S5"],
        ..Default::default()
    });
    let mut engine = Engine::new(settings(1, 0), Vec::new()).unwrap();

    engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetches(), vec!["S1", "S2", "S3", "S4", "S5"]);
}

#[tokio::test]
async fn test_discovered_requests_join_the_frontier_tail() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2"],
        links: HashMap::from([("R1", vec!["R3", "R4"]), ("R3", vec!["R5"])]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(1, 0), Vec::new()).unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetches(), vec!["R1", "R2", "R3", "R4", "R5"]);
    assert_eq!(stats.requests_sent, 5);
    assert_eq!(stats.records_accepted, 5);
}

#[tokio::test]
async fn test_duplicate_requests_are_not_deduplicated() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R1"],
        links: HashMap::from([("R1", vec!["R2"])]),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(1, 0), Vec::new()).unwrap();

    engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetches(), vec!["R1", "R1", "R2", "R2"]);
}

/// Source whose parent page yields a child request, then waits for the
/// child to be fetched before yielding its own record
#[derive(Default)]
struct EarlyYieldSource {
    fetches: Mutex<Vec<String>>,
    child_fetched: tokio::sync::Notify,
}

#[async_trait]
impl Source for EarlyYieldSource {
    fn name(&self) -> &str {
        "early-yield"
    }

    fn initial_requests(&self) -> Vec<FetchRequest> {
        vec![FetchRequest::get(&url("parent")).unwrap()]
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let name = page_name(request);
        self.fetches.lock().unwrap().push(name.clone());
        if name == "child" {
            self.child_fetched.notify_one();
        }
        Ok(FetchResponse::ok(request.clone(), name))
    }

    fn parse<'a>(&'a self, response: FetchResponse) -> ParseStream<'a> {
        if page_name(&response.request) != "parent" {
            return stream::empty().boxed();
        }

        let child = stream::once(async {
            Ok(ParseYield::Request(FetchRequest::get(&url("child")).unwrap()))
        });
        let record = stream::once(async move {
            let seen = tokio::time::timeout(Duration::from_secs(5), self.child_fetched.notified())
                .await
                .is_ok();
            Ok(ParseYield::Record(
                Record::new()
                    .with_field("url", response.url.as_str())
                    .with_field("child_fetched", seen),
            ))
        });
        child.chain(record).boxed()
    }
}

#[tokio::test]
async fn test_early_yielded_request_dispatched_before_parse_finishes() {
    let source = Arc::new(EarlyYieldSource::default());
    let records = Arc::new(Mutex::new(Vec::new()));
    let collected = Arc::clone(&records);
    let log = Log::default();
    let mut engine = Engine::new(
        settings(2, 0),
        vec![Box::new(FnStage::new("collect", &log, move |record| {
            collected.lock().unwrap().push(record.clone());
            Ok(Some(record))
        }))],
    )
    .unwrap();

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(*source.fetches.lock().unwrap(), vec!["parent", "child"]);
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("child_fetched"), Some(&serde_json::Value::Bool(true)));
    assert_eq!(stats.requests_sent, 2);
    assert_eq!(stats.records_accepted, 1);
}

#[tokio::test]
async fn test_stop_drains_without_new_dispatch() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2", "R3", "R4"],
        links: HashMap::from([("R2", vec!["R9"])]),
        stop_at: Some("R2"),
        ..Default::default()
    });
    let log = Log::default();
    let mut engine = Engine::new(
        settings(1, 0),
        vec![Box::new(FnStage::accept_all("accept", &log))],
    )
    .unwrap();
    let handle = engine.handle();
    source.attach(handle.clone());

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    assert_eq!(source.fetches(), vec!["R1", "R2"]);
    assert_eq!(stats.records_accepted, 2);
    assert_eq!(handle.stats(), stats);
    assert_eq!(handle.state(), EngineState::Stopped);
    assert!(source
        .states_seen
        .lock()
        .unwrap()
        .iter()
        .all(|s| *s == EngineState::Running));
    assert_eq!(entries(&log), vec!["open:accept", "close:accept"]);
    assert_eq!(source.closed_calls(), 1);
}

#[tokio::test]
async fn test_stop_lets_in_flight_requests_finish() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2", "R3", "R4", "R5"],
        stop_at: Some("R1"),
        fetch_delay: Duration::from_millis(20),
        ..Default::default()
    });
    let mut engine = Engine::new(settings(3, 0), Vec::new()).unwrap();
    source.attach(engine.handle());

    let stats = engine.crawl(Arc::clone(&source)).await.unwrap();

    // R1..R3 were dispatched together before the stop was observed
    let mut fetched = source.fetches();
    fetched.sort();
    assert_eq!(fetched, vec!["R1", "R2", "R3"]);
    assert_eq!(stats.responses_received, 3);
    assert_eq!(stats.records_accepted, 3);
}

#[tokio::test]
async fn test_open_failure_is_fatal_but_closes_opened_stages() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1"],
        ..Default::default()
    });
    let log = Log::default();
    let mut failing = FnStage::accept_all("B", &log);
    failing.fail_open = true;
    let mut engine = Engine::new(
        settings(1, 0),
        vec![
            Box::new(FnStage::accept_all("A", &log)),
            Box::new(failing),
            Box::new(FnStage::accept_all("C", &log)),
        ],
    )
    .unwrap();

    let result = engine.crawl(Arc::clone(&source)).await;

    assert!(matches!(result, Err(SumiError::Stage(StageError::Failed { ref stage, .. })) if stage == "B"));
    assert!(source.fetches().is_empty());
    assert_eq!(entries(&log), vec!["open:A", "open:B", "close:A"]);
    assert_eq!(source.closed_calls(), 1);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_process_failure_is_fatal() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2", "R3"],
        ..Default::default()
    });
    let log = Log::default();
    let exploding = FnStage::new("explode", &log, |_record| {
        Err(StageError::failed("explode", "cannot process"))
    });
    let mut engine = Engine::new(settings(1, 0), vec![Box::new(exploding)]).unwrap();

    let result = engine.crawl(Arc::clone(&source)).await;

    assert!(matches!(result, Err(SumiError::Stage(_))));
    assert_eq!(source.fetches(), vec!["R1"]);
    assert_eq!(entries(&log), vec!["open:explode", "close:explode"]);
    assert_eq!(source.closed_calls(), 1);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_close_failure_is_reported_after_full_run() {
    let source = ScriptedSource::new(Script {
        seeds: vec!["R1", "R2"],
        ..Default::default()
    });
    let log = Log::default();
    let mut failing = FnStage::accept_all("A", &log);
    failing.fail_close = true;
    let mut engine = Engine::new(
        settings(2, 0),
        vec![Box::new(failing), Box::new(FnStage::accept_all("B", &log))],
    )
    .unwrap();

    let result = engine.crawl(Arc::clone(&source)).await;

    assert!(matches!(result, Err(SumiError::Stage(_))));
    assert_eq!(engine.stats().records_accepted, 2);
    assert_eq!(entries(&log), vec!["open:A", "open:B", "close:A", "close:B"]);
    assert_eq!(source.closed_calls(), 1);
}

#[tokio::test]
async fn test_engine_reruns_with_fresh_stats() {
    let log = Log::default();
    let mut engine = Engine::new(
        settings(2, 0),
        vec![Box::new(FnStage::accept_all("accept", &log))],
    )
    .unwrap();

    let first = engine
        .crawl(ScriptedSource::new(Script {
            seeds: vec!["R1", "R2"],
            ..Default::default()
        }))
        .await
        .unwrap();
    let second = engine
        .crawl(ScriptedSource::new(Script {
            seeds: vec!["R1", "R2"],
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second.records_accepted, 2);
    assert_eq!(
        entries(&log),
        vec!["open:accept", "close:accept", "open:accept", "close:accept"]
    );
}

#[test]
fn test_duplicate_stage_names_rejected_at_construction() {
    let log = Log::default();
    let result = Engine::new(
        settings(1, 0),
        vec![
            Box::new(FnStage::accept_all("same", &log)),
            Box::new(FnStage::accept_all("same", &log)),
        ],
    );

    assert!(result.is_err());
}
