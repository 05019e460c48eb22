use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use super::*;
use crate::queue::QueueAction;
use crate::transport::TransportRequest;

/// One scripted reply.
struct Step {
    delay: Duration,
    result: Result<Response, TransportError>,
}

fn ok(delay_ms: u64, body: &str) -> Step {
    Step {
        delay: Duration::from_millis(delay_ms),
        result: Ok(Response {
            status: 200,
            body: body.as_bytes().to_vec(),
        }),
    }
}

fn transient() -> Step {
    Step {
        delay: Duration::ZERO,
        result: Err(TransportError::Transient {
            status: Some(503),
            reason: "unavailable".to_string(),
        }),
    }
}

fn client(status: u16) -> Step {
    Step {
        delay: Duration::ZERO,
        result: Err(TransportError::Client {
            status: Some(status),
            reason: format!("HTTP {status}"),
        }),
    }
}

/// Transport replaying per-URL scripts. URLs without (remaining) script
/// answer 200 immediately with the URL as body.
#[derive(Default)]
struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<TransportRequest>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.url == url).count()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<Result<Response, TransportError>> {
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|steps| steps.pop_front())
            .unwrap_or_else(|| ok(0, &request.url));
        let url = request.url.clone();
        self.log.lock().unwrap().push(format!("start {url}"));
        self.calls.lock().unwrap().push(request);
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            log.lock().unwrap().push(format!("end {url}"));
            step.result
        })
    }
}

fn queue(transport: &Arc<ScriptedTransport>, options: RequestQueueOptions) -> RequestQueue {
    RequestQueue::new(Arc::clone(transport) as Arc<dyn Transport>, options)
}

fn with_strategy(strategy: StrategyKind) -> RequestQueueOptions {
    RequestQueueOptions {
        strategy,
        ..RequestQueueOptions::default()
    }
}

#[test]
fn default_options() {
    let opts = RequestQueueOptions::default();
    assert_eq!(opts.strategy, StrategyKind::Priority);
    assert_eq!(opts.retry_timeout, Duration::from_millis(1000));
    assert_eq!(opts.max_retries, 300);
    assert_eq!(opts.queue_options().max_attempts, 300);
}

#[tokio::test(start_paused = true)]
async fn queue_length_rises_and_falls_with_parallel_gets() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .script("/a", vec![ok(0, "a")])
            .script("/b", vec![ok(20, "b")])
            .script("/c", vec![ok(30, "c")]),
    );
    let q = queue(&transport, with_strategy(StrategyKind::Parallel));

    let (tx, mut lengths) = mpsc::unbounded_channel();
    let listener = q.on_queue_length_change(move |len| {
        let _ = tx.send(len);
    });

    let a = q.get("/a");
    let b = q.get("/b");
    let c = q.get("/c");
    let (a, b, c) = tokio::join!(a, b, c);
    assert_eq!(a.unwrap().text(), "a");
    assert_eq!(b.unwrap().text(), "b");
    assert_eq!(c.unwrap().text(), "c");

    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(lengths.recv().await.unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3, 2, 1, 0]);
    assert!(q.is_empty());
    listener.abort();
}

#[tokio::test(start_paused = true)]
async fn priority_serializes_posts_but_lets_gets_through() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .script("/p1", vec![ok(30, "p1")])
            .script("/p2", vec![ok(10, "p2")])
            .script("/g", vec![ok(5, "g")]),
    );
    let q = queue(&transport, RequestQueueOptions::default());

    let p1 = q.post("/p1", json!({"n": 1}));
    let p2 = q.post("/p2", json!({"n": 2}));
    let g = q.get("/g");

    let order = Arc::new(Mutex::new(Vec::new()));
    let track = |name: &'static str, fut: PendingRequest| {
        let order = Arc::clone(&order);
        async move {
            let res = fut.await;
            order.lock().unwrap().push(name);
            res
        }
    };
    let (r1, r2, rg) = tokio::join!(track("p1", p1), track("p2", p2), track("g", g));
    assert!(r1.is_ok() && r2.is_ok() && rg.is_ok());
    assert_eq!(*order.lock().unwrap(), vec!["g", "p1", "p2"]);

    let log = transport.log();
    let pos = |line: &str| log.iter().position(|l| l == line).unwrap();
    assert!(pos("end /p1") < pos("start /p2"), "log: {log:?}");
    assert!(pos("start /g") < pos("end /p1"), "log: {log:?}");
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_after_the_timeout() {
    let transport = Arc::new(ScriptedTransport::default().script(
        "/flaky",
        vec![transient(), transient(), transient(), ok(0, "done")],
    ));
    let q = queue(
        &transport,
        RequestQueueOptions {
            retry_timeout: Duration::from_millis(100),
            max_retries: 5,
            ..RequestQueueOptions::default()
        },
    );

    let started = tokio::time::Instant::now();
    let response = q.get("/flaky").await.unwrap();
    assert_eq!(response.text(), "done");
    assert_eq!(transport.calls_to("/flaky"), 4);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(q.is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_reject_and_remove_the_request() {
    let transport = Arc::new(
        ScriptedTransport::default().script("/down", (0..10).map(|_| transient()).collect()),
    );
    let q = queue(
        &transport,
        RequestQueueOptions {
            retry_timeout: Duration::from_millis(50),
            max_retries: 3,
            ..RequestQueueOptions::default()
        },
    );

    let err = q.get("/down").await.unwrap_err();
    assert_eq!(err, RequestError::MaxRetriesExceeded { attempts: 3 });
    assert_eq!(transport.calls_to("/down"), 3);
    assert_eq!(q.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_method_rejects_without_calling_the_transport() {
    let transport = Arc::new(ScriptedTransport::default());
    let q = queue(&transport, RequestQueueOptions::default());

    let err = q
        .request("UNKNOWN", "/x", None, RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, RequestError::UnsupportedMethod("UNKNOWN".to_string()));
    assert!(transport.calls().is_empty());
    assert!(q.is_empty());
}

#[tokio::test(start_paused = true)]
async fn client_errors_reject_immediately() {
    let transport = Arc::new(ScriptedTransport::default().script("/missing", vec![client(404)]));
    let q = queue(&transport, RequestQueueOptions::default());

    let err = q.delete("/missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, RequestError::Client { .. }));
    assert_eq!(transport.calls_to("/missing"), 1);
}

#[tokio::test(start_paused = true)]
async fn a_failed_request_does_not_affect_its_siblings() {
    let transport = Arc::new(
        ScriptedTransport::default()
            .script("/bad", vec![client(400)])
            .script("/good", vec![ok(10, "good")]),
    );
    let q = queue(&transport, with_strategy(StrategyKind::Sequential));

    let bad = q.get("/bad");
    let good = q.get("/good");
    assert!(bad.await.is_err());
    assert_eq!(good.await.unwrap().text(), "good");
}

#[tokio::test(start_paused = true)]
async fn defaults_are_merged_into_each_request() {
    let transport = Arc::new(ScriptedTransport::default());
    let q = queue(
        &transport,
        RequestQueueOptions {
            defaults: RequestOptions::default()
                .header("Accept", "application/json")
                .timeout(Duration::from_secs(3)),
            ..RequestQueueOptions::default()
        },
    );

    q.request(
        Method::Post,
        "/items",
        Some(json!({"name": "x"})),
        RequestOptions::default().header("X-Trace", "abc"),
    )
    .await
    .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, Method::Post);
    assert_eq!(call.data, Some(json!({"name": "x"})));
    assert_eq!(call.timeout, Some(Duration::from_secs(3)));
    assert_eq!(
        call.headers,
        vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("X-Trace".to_string(), "abc".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn filter_and_find_see_queued_requests() {
    let transport = Arc::new(ScriptedTransport::default().script("/slow", vec![ok(100, "slow")]));
    let q = queue(&transport, with_strategy(StrategyKind::Sequential));

    let slow = q.get("/slow");
    let first = q.post("/items", json!({"n": 1}));
    let second = q.post("/items", json!({"n": 2}));
    assert_eq!(q.len(), 3);

    let posts = q.filter(|entry| entry.method == Method::Post);
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, first.id());

    let found = q.find(&Method::Post, "/items", |data| data == Some(&json!({"n": 2})));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, second.id());
    assert!(q.find(&Method::Get, "/items", |_| true).is_empty());

    let status = q.status();
    assert_eq!(status.length, 3);

    slow.await.unwrap();
    first.await.unwrap();
    second.await.unwrap();
    assert!(q.is_empty());
}

#[tokio::test(start_paused = true)]
async fn subscribe_reports_actions() {
    let transport = Arc::new(ScriptedTransport::default().script("/bad", vec![client(409)]));
    let q = queue(&transport, RequestQueueOptions::default());
    let mut events = q.subscribe();

    let ok = q.get("/ok");
    let bad = q.post("/bad", json!(null));
    ok.await.unwrap();
    bad.await.unwrap_err();

    let mut actions = Vec::new();
    while let Ok(event) = events.try_recv() {
        actions.push((event.action, event.length));
    }
    assert_eq!(actions.len(), 4);
    assert_eq!(actions[0], (QueueAction::Added, 1));
    assert_eq!(actions[1], (QueueAction::Added, 2));
    let removals: Vec<QueueAction> = actions[2..].iter().map(|(action, _)| *action).collect();
    assert!(removals.contains(&QueueAction::Processed));
    assert!(removals.contains(&QueueAction::Failure));
    assert_eq!(actions[2].1, 1);
    assert_eq!(actions[3].1, 0);
}

#[tokio::test(start_paused = true)]
async fn length_listener_drains_once_the_queue_is_dropped() {
    let transport = Arc::new(ScriptedTransport::default().script("/b", vec![ok(10, "b")]));
    let q = queue(&transport, with_strategy(StrategyKind::Parallel));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = q.on_queue_length_change(move |len| sink.lock().unwrap().push(len));

    let a = q.get("/a");
    let b = q.get("/b");
    a.await.unwrap();
    b.await.unwrap();
    drop(q);

    tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .expect("listener ends after the queue is dropped")
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1, 0]);
}
