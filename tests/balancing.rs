//! End-to-end forwarding through the balancer.

use std::time::Duration;

use dns_balancer::load_balancer::FailurePolicy;

mod common;
use common::{send_query, test_config, wait_until, MockBackend, RunningBalancer};

const REPLY_WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_round_robin_alternates_backends() {
    let b1 = MockBackend::start("b1").await;
    let b2 = MockBackend::start("b2").await;
    let balancer = RunningBalancer::start(&test_config(&[&b1, &b2])).await;

    for i in 0..100 {
        let payload = format!("q{}", i);
        let reply = send_query(balancer.addr, payload.as_bytes(), REPLY_WAIT)
            .await
            .unwrap_or_else(|| panic!("no reply to query {}", i));

        let expected = if i % 2 == 0 { "b1" } else { "b2" };
        assert_eq!(reply, format!("{}:{}", expected, payload).into_bytes());
    }

    assert_eq!(b1.hits(), 50);
    assert_eq!(b2.hits(), 50);

    let stats: Vec<_> = balancer.pool.all_backends().iter().map(|b| b.stats()).collect();
    assert!(stats.iter().all(|s| s.total_requests == 50 && s.total_failures == 0));

    assert!(balancer.stop().await.is_clean());
}

#[tokio::test]
async fn test_backend_timeout_counts_failure() {
    let b1 = MockBackend::silent().await;
    let mut config = test_config(&[&b1]);
    config.timeouts.query_ms = 100;
    let balancer = RunningBalancer::start(&config).await;

    assert!(send_query(balancer.addr, b"q", Duration::from_millis(400)).await.is_none());

    let backend = balancer.pool.all_backends()[0].clone();
    assert!(wait_until(Duration::from_secs(2), || backend.stats().total_failures == 1).await);
    assert_eq!(backend.stats().total_requests, 1);
    // Forwarding failures never change health.
    assert!(backend.is_healthy());

    balancer.stop().await;
}

#[tokio::test]
async fn test_concurrent_clients_all_answered() {
    let b1 = MockBackend::start("b1").await;
    let b2 = MockBackend::start("b2").await;
    let balancer = RunningBalancer::start(&test_config(&[&b1, &b2])).await;

    let addr = balancer.addr;
    let tasks: Vec<_> = (0..20)
        .map(|i| tokio::spawn(async move { send_query(addr, format!("c{}", i).as_bytes(), REPLY_WAIT).await }))
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }
    assert_eq!(b1.hits() + b2.hits(), 20);

    balancer.stop().await;
}

/// Both backends get marked unhealthy by the first health round; the long
/// interval keeps them that way for the rest of the test.
async fn start_with_all_unhealthy(policy: FailurePolicy) -> (MockBackend, MockBackend, RunningBalancer) {
    let b1 = MockBackend::start("b1").await;
    let b2 = MockBackend::start("b2").await;
    b1.set_alive(false);
    b2.set_alive(false);

    let mut config = test_config(&[&b1, &b2]);
    config.fail_behavior = policy;
    config.health_check.enabled = true;
    config.health_check.interval_ms = 60_000;
    config.health_check.timeout_ms = 100;
    config.health_check.failure_threshold = 1;
    let balancer = RunningBalancer::start(&config).await;

    let pool = balancer.pool.clone();
    assert!(
        wait_until(Duration::from_secs(2), || pool.all_backends().iter().all(|b| !b.is_healthy())).await,
        "backends never marked unhealthy"
    );

    // They would answer now, but stay out of rotation until the next round.
    b1.set_alive(true);
    b2.set_alive(true);
    (b1, b2, balancer)
}

#[tokio::test]
async fn test_fail_closed_drops_query() {
    let (b1, b2, balancer) = start_with_all_unhealthy(FailurePolicy::Closed).await;
    let hits_before = b1.hits() + b2.hits();

    assert!(balancer.pool.select().is_none());
    assert!(send_query(balancer.addr, b"q", Duration::from_millis(300)).await.is_none());

    assert_eq!(b1.hits() + b2.hits(), hits_before);
    assert!(balancer
        .pool
        .all_backends()
        .iter()
        .all(|b| b.stats().total_requests == 0));

    balancer.stop().await;
}

#[tokio::test]
async fn test_fail_open_uses_first_backend() {
    let (_b1, _b2, balancer) = start_with_all_unhealthy(FailurePolicy::Open).await;

    let reply = send_query(balancer.addr, b"q", REPLY_WAIT).await;
    assert_eq!(reply, Some(b"b1:q".to_vec()));

    let backends = balancer.pool.all_backends();
    assert_eq!(backends[0].stats().total_requests, 1);
    assert_eq!(backends[1].stats().total_requests, 0);
    // Serving a query does not restore health.
    assert!(!backends[0].is_healthy());

    balancer.stop().await;
}
