//! Population phase against an instrumented server

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use cachecmp_harness::{populate, HarnessError, Keyspace, SutVariant};
use cachecmp_http::{HttpConfig, HttpError, ProbeClient};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Default)]
struct Gauge {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    served: AtomicU64,
    fail_key: Option<u64>,
}

async fn handle(Path(id): Path<u64>, State(gauge): State<Arc<Gauge>>) -> impl IntoResponse {
    gauge.served.fetch_add(1, Ordering::SeqCst);
    let now = gauge.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    gauge.max_in_flight.fetch_max(now, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(10)).await;
    gauge.in_flight.fetch_sub(1, Ordering::SeqCst);

    if gauge.fail_key == Some(id) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn start_server(gauge: Arc<Gauge>) -> SocketAddr {
    let app = Router::new()
        .route("/cache/{id}", get(handle))
        .with_state(gauge);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client() -> ProbeClient {
    ProbeClient::new(&HttpConfig::default(), "X-Cache").unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_never_exceeds_limit() {
    let gauge = Arc::new(Gauge::default());
    let addr = start_server(gauge.clone()).await;
    let variant = SutVariant::custom(format!("http://{}", addr)).with_populate_concurrency(4);
    let keyspace = Keyspace::new(40, "/cache").unwrap();

    let summary = populate(&client(), &variant, &keyspace).await.unwrap();

    assert_eq!(summary.keys, 40);
    assert_eq!(gauge.served.load(Ordering::SeqCst), 40);
    let max = gauge.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 4, "max in flight was {}", max);
    assert!(max >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_worker_is_sequential() {
    let gauge = Arc::new(Gauge::default());
    let addr = start_server(gauge.clone()).await;
    let variant = SutVariant::baseline(format!("http://{}", addr));
    let keyspace = Keyspace::new(10, "/cache").unwrap();

    populate(&client(), &variant, &keyspace).await.unwrap();

    assert_eq!(gauge.served.load(Ordering::SeqCst), 10);
    assert_eq!(gauge.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_non_success_aborts_and_stops_issuing() {
    let gauge = Arc::new(Gauge {
        fail_key: Some(5),
        ..Default::default()
    });
    let addr = start_server(gauge.clone()).await;
    let variant = SutVariant::baseline(format!("http://{}", addr));
    let keyspace = Keyspace::new(20, "/cache").unwrap();

    let err = populate(&client(), &variant, &keyspace).await.unwrap_err();

    match err {
        HarnessError::Populate { key, source } => {
            assert_eq!(key, 5);
            assert!(matches!(
                source,
                HttpError::UnexpectedStatus { status: 500, .. }
            ));
        }
        other => panic!("unexpected error: {}", other),
    }
    // Keys 0..=5 were issued; nothing after the failure
    assert_eq!(gauge.served.load(Ordering::SeqCst), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_siblings_drain_before_error() {
    let gauge = Arc::new(Gauge {
        fail_key: Some(0),
        ..Default::default()
    });
    let addr = start_server(gauge.clone()).await;
    let variant = SutVariant::custom(format!("http://{}", addr)).with_populate_concurrency(8);
    let keyspace = Keyspace::new(100, "/cache").unwrap();

    let err = populate(&client(), &variant, &keyspace).await.unwrap_err();
    assert!(matches!(err, HarnessError::Populate { key: 0, .. }));

    // Every request that was issued had finished by the time the error surfaced
    assert_eq!(gauge.in_flight.load(Ordering::SeqCst), 0);
    assert!(gauge.served.load(Ordering::SeqCst) < 100);
}

#[tokio::test]
async fn test_connection_refused_is_fatal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let variant = SutVariant::custom(format!("http://{}", addr)).with_populate_concurrency(2);
    let keyspace = Keyspace::new(5, "/cache").unwrap();

    let err = populate(&client(), &variant, &keyspace).await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Populate {
            source: HttpError::NetworkError(_),
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oversized_concurrency_is_clamped() {
    let gauge = Arc::new(Gauge::default());
    let addr = start_server(gauge.clone()).await;
    let variant =
        SutVariant::custom(format!("http://{}", addr)).with_populate_concurrency(usize::MAX);
    let keyspace = Keyspace::new(20, "/cache").unwrap();

    let summary = populate(&client(), &variant, &keyspace).await.unwrap();

    assert_eq!(summary.keys, 20);
    assert_eq!(gauge.served.load(Ordering::SeqCst), 20);
}
