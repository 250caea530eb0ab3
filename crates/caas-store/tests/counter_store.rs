use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use caas_store::config::Config;
use caas_store::domain::statements::{CounterQuery, SchemaStatement, Statement};
use caas_store::error::{DbError, Error, ReadFailure};
use caas_store::retry::SimpleRetryPolicy;
use caas_store::store::memory::{InMemoryCluster, InMemorySession};
use caas_store::store::traits::{Attempt, CounterSession};
use caas_store::{CounterService, CounterStore, bootstrap};

const SERVICE_HOST: &str = "caas-test-0";
const FAULT_HOST: &str = "10.9.9.9:9042";

#[derive(Debug, Default, Clone)]
struct FaultPlan {
    increment_failures: u32,
    read_failures: u32,
    drop_read_rows: bool,
    increment_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

#[derive(Debug)]
struct FaultySession {
    inner: InMemorySession,
    plan: Mutex<FaultPlan>,
    seen: Mutex<Vec<CounterQuery>>,
}

impl FaultySession {
    fn seen(&self) -> Vec<CounterQuery> {
        self.seen.lock().expect("seen lock").clone()
    }

    fn take_fault(&self, query: CounterQuery) -> (bool, bool, Option<Duration>) {
        let mut plan = self.plan.lock().expect("plan lock");
        let budget = match query {
            CounterQuery::Increment => &mut plan.increment_failures,
            CounterQuery::Read => &mut plan.read_failures,
        };
        let fail = *budget > 0;
        if fail {
            *budget -= 1;
        }
        match query {
            CounterQuery::Increment => (fail, false, plan.increment_delay),
            CounterQuery::Read => (fail, plan.drop_read_rows, plan.read_delay),
        }
    }
}

#[async_trait]
impl CounterSession for FaultySession {
    async fn attempt(&self, statement: &Statement<'_>) -> Attempt {
        self.seen.lock().expect("seen lock").push(statement.query);
        let (fail, drop_rows, delay) = self.take_fault(statement.query);
        if statement.query == CounterQuery::Increment
            && let Some(delay) = delay
        {
            // The write lands before the reply is lost.
            let attempt = self.inner.attempt(statement).await;
            tokio::time::sleep(delay).await;
            return attempt;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Attempt {
                host: FAULT_HOST.to_string(),
                result: Err(DbError::Timeout("injected fault".to_string())),
            };
        }
        let mut attempt = self.inner.attempt(statement).await;
        if drop_rows {
            attempt.result = attempt.result.map(|_| Vec::new());
        }
        attempt
    }

    async fn execute_schema(&self, statement: &SchemaStatement<'_>) -> Result<(), DbError> {
        self.inner.execute_schema(statement).await
    }
}

fn nodes() -> Vec<String> {
    vec!["10.0.0.1:9042".to_string(), "10.0.0.2:9042".to_string()]
}

async fn setup(plan: FaultPlan, config: Config) -> (InMemoryCluster, CounterStore<FaultySession>) {
    let cluster = InMemoryCluster::new();
    let inner = bootstrap(&cluster, &nodes(), &config)
        .await
        .expect("bootstrap");
    let session = FaultySession {
        inner,
        plan: Mutex::new(plan),
        seen: Mutex::new(Vec::new()),
    };
    (cluster, CounterStore::new(session, SERVICE_HOST, config))
}

#[tokio::test]
async fn page_views_end_to_end() {
    let (cluster, store) = setup(FaultPlan::default(), Config::default()).await;
    assert_eq!(cluster.counter_value("caas", "page_views").expect("inspect cluster"), None);

    let first = store.increment_and_get("page_views").await.expect("first");
    assert_eq!(first.name, "page_views");
    assert_eq!(first.value, 1);
    assert_eq!(first.host, SERVICE_HOST);
    assert_eq!(first.db_stats.len(), 2);
    assert_eq!(first.db_stats[0].statement, CounterQuery::Increment.cql());
    assert_eq!(first.db_stats[1].statement, CounterQuery::Read.cql());
    assert_eq!(first.db_stats[0].attempts, 1);
    assert_eq!(first.db_stats[1].attempts, 1);
    assert_eq!(first.db_stats[0].rows, 0);
    assert_eq!(first.db_stats[1].rows, 1);
    assert_eq!(first.db_stats[0].host, "10.0.0.1:9042");
    assert_eq!(first.db_stats[1].host, "10.0.0.2:9042");
    assert!(first.db_stats.iter().all(|s| s.time_ms >= 0.0));

    let second = store.increment_and_get("page_views").await.expect("second");
    assert_eq!(second.value, 2);
    assert_eq!(second.db_stats.len(), 2);
}

#[tokio::test]
async fn sequential_increments_add_up() {
    let (cluster, store) = setup(FaultPlan::default(), Config::default()).await;
    let mut last = 0;
    for _ in 0..10 {
        last = store.increment_and_get("orders").await.expect("increment").value;
    }
    assert_eq!(last, 10);
    assert_eq!(cluster.counter_value("caas", "orders").expect("inspect cluster"), Some(10));
    assert_eq!(store.counters().requests.load(Ordering::Relaxed), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_commute() {
    let (cluster, store) = setup(FaultPlan::default(), Config::default()).await;
    store.increment_and_get("hits").await.expect("seed");
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.increment_and_get("hits").await.expect("increment").value
        }));
    }
    let mut observed = Vec::new();
    for h in handles {
        observed.push(h.await.expect("join"));
    }

    assert_eq!(cluster.counter_value("caas", "hits").expect("inspect cluster"), Some(17));
    assert!(observed.iter().all(|v| (2..=17).contains(v)));
    assert!(observed.contains(&17));
}

#[tokio::test]
async fn transient_increment_failures_log_every_attempt() {
    for k in 1..=5u32 {
        let plan = FaultPlan {
            increment_failures: k,
            ..FaultPlan::default()
        };
        let (_cluster, store) = setup(plan, Config::default()).await;
        let counter = store.increment_and_get("retried").await.expect("recovers");

        assert_eq!(counter.value, 1);
        let k = k as usize;
        assert_eq!(counter.db_stats.len(), k + 2);
        let increments = &counter.db_stats[..=k];
        assert!(increments
            .iter()
            .all(|s| s.statement == CounterQuery::Increment.cql()));
        for (i, stat) in increments.iter().enumerate() {
            assert_eq!(stat.attempts as usize, i + 1);
        }
        assert!(increments[..k].iter().all(|s| s.host == FAULT_HOST));
        assert_eq!(counter.db_stats[k + 1].statement, CounterQuery::Read.cql());
        assert_eq!(counter.db_stats[k + 1].attempts, 1);
    }
}

#[tokio::test]
async fn transient_read_failures_are_appended_after_increment() {
    let plan = FaultPlan {
        read_failures: 2,
        ..FaultPlan::default()
    };
    let (_cluster, store) = setup(plan, Config::default()).await;
    let counter = store.increment_and_get("reads").await.expect("recovers");

    assert_eq!(counter.value, 1);
    let attempts: Vec<u32> = counter.db_stats.iter().map(|s| s.attempts).collect();
    assert_eq!(attempts, vec![1, 1, 2, 3]);
    assert_eq!(counter.db_stats[3].rows, 1);
}

#[tokio::test]
async fn exhausted_increment_never_reads() {
    let plan = FaultPlan {
        increment_failures: 6,
        ..FaultPlan::default()
    };
    let (cluster, store) = setup(plan, Config::default()).await;
    let err = store
        .increment_and_get("doomed")
        .await
        .expect_err("retries exhausted");

    match &err {
        Error::Increment { name, source } => {
            assert_eq!(name, "doomed");
            assert_eq!(*source, DbError::Timeout("injected fault".to_string()));
        }
        other => panic!("expected increment error, got {other:?}"),
    }
    assert!(!err.increment_applied());
    assert_eq!(store.session().seen(), vec![CounterQuery::Increment; 6]);
    assert_eq!(cluster.counter_value("caas", "doomed").expect("inspect cluster"), None);
    assert_eq!(store.counters().increment_failures.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn exhausted_read_reports_applied_increment() {
    let plan = FaultPlan {
        read_failures: 6,
        ..FaultPlan::default()
    };
    let (cluster, store) = setup(plan, Config::default()).await;
    let err = store
        .increment_and_get("unconfirmed")
        .await
        .expect_err("read exhausted");

    assert!(matches!(
        err,
        Error::Read {
            source: ReadFailure::Db(DbError::Timeout(_)),
            ..
        }
    ));
    assert!(err.increment_applied());
    assert_eq!(cluster.counter_value("caas", "unconfirmed").expect("inspect cluster"), Some(1));
    assert_eq!(store.counters().read_failures.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn missing_row_is_a_read_error() {
    let plan = FaultPlan {
        drop_read_rows: true,
        ..FaultPlan::default()
    };
    let (cluster, store) = setup(plan, Config::default()).await;
    let err = store
        .increment_and_get("lagging")
        .await
        .expect_err("missing row");

    assert!(matches!(
        err,
        Error::Read {
            source: ReadFailure::MissingRow,
            ..
        }
    ));
    assert!(err.increment_applied());
    assert_eq!(cluster.counter_value("caas", "lagging").expect("inspect cluster"), Some(1));
}

#[tokio::test]
async fn empty_name_is_rejected_before_any_query() {
    let (_cluster, store) = setup(FaultPlan::default(), Config::default()).await;
    let err = store.increment_and_get("").await.expect_err("empty name");
    assert!(matches!(err, Error::InvalidName(_)));
    assert!(store.session().seen().is_empty());
}

#[tokio::test]
async fn read_deadline_is_distinct_from_retry_exhaustion() {
    let plan = FaultPlan {
        read_delay: Some(Duration::from_millis(500)),
        ..FaultPlan::default()
    };
    let config = Config {
        request_timeout: Some(Duration::from_millis(20)),
        ..Config::default()
    };
    let (cluster, store) = setup(plan, config).await;
    let err = store.increment_and_get("slow").await.expect_err("deadline");

    match &err {
        Error::Timeout { name, query, .. } => {
            assert_eq!(name, "slow");
            assert_eq!(*query, CounterQuery::Read);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.increment_applied());
    assert_eq!(cluster.counter_value("caas", "slow").expect("inspect cluster"), Some(1));
    assert_eq!(store.counters().timeouts.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn increment_deadline_reports_possibly_applied_write() {
    let plan = FaultPlan {
        increment_delay: Some(Duration::from_millis(300)),
        ..FaultPlan::default()
    };
    let config = Config {
        request_timeout: Some(Duration::from_millis(20)),
        ..Config::default()
    };
    let (cluster, store) = setup(plan, config).await;
    let err = store.increment_and_get("stalled").await.expect_err("deadline");

    match &err {
        Error::Timeout { name, query, .. } => {
            assert_eq!(name, "stalled");
            assert_eq!(*query, CounterQuery::Increment);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.increment_applied());
    assert_eq!(cluster.counter_value("caas", "stalled").expect("inspect cluster"), Some(1));
    assert_eq!(store.session().seen(), vec![CounterQuery::Increment]);
    assert_eq!(store.counters().timeouts.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn injected_retry_policy_replaces_default() {
    let plan = FaultPlan {
        increment_failures: 1,
        ..FaultPlan::default()
    };
    let (_cluster, store) = setup(plan, Config::default()).await;
    let store = store.with_retry_policy(Arc::new(SimpleRetryPolicy::new(0)));

    let err = store.increment_and_get("once").await.expect_err("no retries");
    assert!(matches!(err, Error::Increment { .. }));
    assert_eq!(store.session().seen(), vec![CounterQuery::Increment]);
}

#[tokio::test]
async fn counter_serializes_with_service_keys() {
    let (_cluster, store) = setup(FaultPlan::default(), Config::default()).await;
    let counter = store.increment_and_get("json").await.expect("increment");
    let json = serde_json::to_value(&counter).expect("serialize");

    assert_eq!(json["Name"], "json");
    assert_eq!(json["Value"], 1);
    assert_eq!(json["Host"], SERVICE_HOST);
    assert_eq!(json["DBStats"].as_array().map(Vec::len), Some(2));
}
