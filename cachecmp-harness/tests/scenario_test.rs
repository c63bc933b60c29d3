//! Full runs against the in-process origin and caching proxy

use cachecmp_config::{CachecmpConfig, DeploymentConfig, SampleBudget, StoreConfig, VariantKind};
use cachecmp_harness::{Deployment, Harness, HarnessError};
use cachecmp_http::{HttpConfig, ProbeClient};

fn config(variant: VariantKind, keys: u64, concurrency: usize, reads: u64) -> CachecmpConfig {
    let mut config = CachecmpConfig::default();
    config.harness.keys = keys;
    config.harness.sample = SampleBudget::Iterations { count: reads };
    config.harness.seed = Some(7);
    config.sut.variant = variant;
    config.sut.populate_concurrency = Some(concurrency);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_small_sequential_run() {
    let report = Harness::new(config(VariantKind::Baseline, 10, 1, 100))
        .run()
        .await
        .unwrap();

    assert!(report.passed(), "{}", report);
    assert_eq!(report.variant.cache_status_header, "X-Nginx-Cache");
    assert_eq!(report.variant.populate_concurrency, 1);
    assert_eq!(report.populate.keys, 10);
    assert_eq!(report.origin_requests_after_populate, Some(10));
    assert_eq!(report.origin_requests_after_sample, Some(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_never_reach_origin() {
    let report = Harness::new(config(VariantKind::Custom, 100, 10, 1_000))
        .run()
        .await
        .unwrap();

    assert!(report.passed(), "{}", report);
    assert_eq!(report.sample.iterations, 1_000);
    assert_eq!(report.sample.hits, 1_000);
    assert_eq!(report.sample.violations, 0);
    assert_eq!(report.origin_requests_after_populate, Some(100));
    assert_eq!(report.origin_requests_during_sample(), Some(0));

    let store = report.proxy_store.unwrap();
    assert_eq!(store.entry_count, 100);
    assert_eq!(store.evictions, 0);
    assert_eq!(store.misses, 100);
    assert_eq!(store.hits, 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_undersized_store_surfaces_misses() {
    let mut config = config(VariantKind::Custom, 100, 10, 500);
    config.sut.deployment = DeploymentConfig::InProcess {
        bind_address: "127.0.0.1".to_string(),
        store: StoreConfig {
            capacity: Some(10),
            ..Default::default()
        },
    };

    let report = Harness::new(config).run().await.unwrap();

    assert!(!report.passed());
    assert!(report.sample.violations >= 1);
    assert_eq!(report.sample.missing_header, 0);
    assert!(report.origin_requests_during_sample().unwrap() >= 1);

    let store = report.proxy_store.unwrap();
    assert_eq!(store.entry_count, 10);
    assert!(store.evictions >= 90, "evictions: {}", store.evictions);
}

#[tokio::test]
async fn test_invalid_config_aborts_before_start() {
    let mut flooded = config(VariantKind::Custom, 10, 1, 10);
    flooded.sut.populate_concurrency = Some(usize::MAX);
    let err = Harness::new(flooded).run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Setup(_)));

    let mut oversubscribed = config(VariantKind::Custom, 10, 1, 10);
    oversubscribed.harness.worker_multiplier = usize::MAX;
    let err = Harness::new(oversubscribed).run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Setup(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unreachable_external_proxy_aborts() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = config(VariantKind::Baseline, 10, 1, 100);
    config.sut.deployment = DeploymentConfig::External {
        base_url: format!("http://{}", addr),
    };

    let err = Harness::new(config).run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Populate { key: 0, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_teardown_releases_servers() {
    let config = config(VariantKind::Custom, 1, 1, 1);
    let http = HttpConfig::default();
    let deployment = Deployment::start(&config.sut, &http).await.unwrap();
    let request = deployment.variant().request("/cache/0");
    let client = ProbeClient::new(&http, "X-Cache").unwrap();

    assert!(client.fetch_ok(&request).await.is_ok());
    assert_eq!(deployment.origin_hits(), Some(1));

    deployment.teardown().await;
    assert!(client.probe(&request).await.is_err());
}
