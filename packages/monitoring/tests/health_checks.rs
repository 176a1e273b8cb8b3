// ABOUTME: Health checker classification against a mocked client deployment
// ABOUTME: Covers active, bad response, timeout, connection failure, and sample persistence

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backstage_monitoring::{
    HealthCheckResult, HealthChecker, HealthMonitor, HealthReason, HealthStatus, HealthStorage,
    ProjectCreateInput, ProjectStorage,
};
use backstage_storage::memory_pool;

fn checker(timeout_ms: u64) -> HealthChecker {
    HealthChecker::new(reqwest::Client::new(), Duration::from_millis(timeout_ms))
}

#[tokio::test]
async fn healthy_deployment_is_active_with_latency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = checker(3000)
        .check(Some(&server.uri()), &CancellationToken::new())
        .await;

    assert_eq!(result.status, HealthStatus::Active);
    assert_eq!(result.reason, None);
    assert!(result.latency_ms.is_some());
}

#[tokio::test]
async fn server_error_is_bad_response_with_latency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = checker(3000)
        .check(Some(&server.uri()), &CancellationToken::new())
        .await;

    assert_eq!(result.status, HealthStatus::Inactive);
    assert_eq!(result.reason, Some(HealthReason::BadResponse));
    assert!(result.latency_ms.is_some());
}

#[tokio::test]
async fn slow_deployment_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
        .mount(&server)
        .await;

    let result = checker(100)
        .check(Some(&server.uri()), &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        HealthCheckResult::inactive(HealthReason::Timeout, None)
    );
}

#[tokio::test]
async fn refused_connection_is_connection_failed() {
    // Bind and drop a listener to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = checker(1000)
        .check(
            Some(&format!("http://127.0.0.1:{}/", port)),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.reason, Some(HealthReason::ConnectionFailed));
    assert_eq!(result.latency_ms, None);
}

#[tokio::test]
async fn project_without_url_writes_exactly_one_sample() {
    let pool = memory_pool().await.unwrap();
    let project = ProjectStorage::new(pool.clone())
        .create_project(ProjectCreateInput {
            name: "Sin URL".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let monitor = HealthMonitor::new(checker(1000), HealthStorage::new(pool.clone()));

    let result = monitor
        .check_and_record(&project, &CancellationToken::new())
        .await;
    assert_eq!(result.reason, Some(HealthReason::NoUrl));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM project_health_checks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let history = monitor.storage().history(&project.id, 10).await.unwrap();
    assert_eq!(history[0].reason, Some(HealthReason::NoUrl));
    assert_eq!(history[0].latency_ms, None);
}

#[tokio::test]
async fn failed_persistence_still_returns_result() {
    let pool = memory_pool().await.unwrap();
    let project = ProjectStorage::new(pool.clone())
        .create_project(ProjectCreateInput {
            name: "Demo".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    sqlx::query("DROP TABLE project_health_checks")
        .execute(&pool)
        .await
        .unwrap();
    let monitor = HealthMonitor::new(checker(1000), HealthStorage::new(pool));

    let result = monitor
        .check_and_record(&project, &CancellationToken::new())
        .await;

    assert_eq!(result.reason, Some(HealthReason::NoUrl));
}
