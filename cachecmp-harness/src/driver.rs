//! Run sequencing and reporting
//!
//! `start origin -> start proxy -> populate -> reset clock -> sample -> report`,
//! with owned servers torn down on every path.

use cachecmp_caching::CacheStats;
use cachecmp_config::CachecmpConfig;
use cachecmp_http::{HttpConfig, ProbeClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};
use crate::keyspace::Keyspace;
use crate::populate::{populate, PopulateSummary};
use crate::sampler::{default_workers, sample, SampleTally, SamplerOptions};
use crate::sut::{Deployment, SutVariant};

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub variant: SutVariant,
    pub populate: PopulateSummary,
    pub workers: usize,
    pub sample: SampleTally,
    pub sample_secs: f64,
    pub ops_per_sec: f64,
    /// Origin requests once population finished; only known for in-process runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_requests_after_populate: Option<u64>,
    /// Origin requests once sampling finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_requests_after_sample: Option<u64>,
    /// In-process proxy store counters once sampling finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_store: Option<CacheStats>,
}

impl BenchReport {
    /// Every sampled request was answered and was a hit
    pub fn passed(&self) -> bool {
        self.sample.violations == 0 && self.sample.transport_errors == 0
    }

    /// Requests that reached the origin while sampling, when observable
    pub fn origin_requests_during_sample(&self) -> Option<u64> {
        match (
            self.origin_requests_after_populate,
            self.origin_requests_after_sample,
        ) {
            (Some(before), Some(after)) => Some(after.saturating_sub(before)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 {} run {}", self.variant.kind, self.run_id)?;
        writeln!(
            f,
            "   Proxy: {} (Host: {}, header: {})",
            self.variant.base_url, self.variant.virtual_host, self.variant.cache_status_header
        )?;
        writeln!(
            f,
            "   Populate: {} keys in {:.2}s (concurrency {})",
            self.populate.keys,
            self.populate.elapsed.as_secs_f64(),
            self.variant.populate_concurrency
        )?;
        writeln!(
            f,
            "   Sample: {} requests in {:.2}s by {} workers",
            self.sample.iterations, self.sample_secs, self.workers
        )?;
        writeln!(f, "   Throughput: {:.0} ops/sec", self.ops_per_sec)?;
        writeln!(
            f,
            "   Hits: {}, violations: {} ({} missing header), transport errors: {}",
            self.sample.hits,
            self.sample.violations,
            self.sample.missing_header,
            self.sample.transport_errors
        )?;
        if let Some(during) = self.origin_requests_during_sample() {
            writeln!(f, "   Origin requests during sampling: {}", during)?;
        }
        if let Some(store) = &self.proxy_store {
            writeln!(
                f,
                "   Proxy store: {} entries, {} evictions, {:.1}% hit rate",
                store.entry_count,
                store.evictions,
                store.hit_rate() * 100.0
            )?;
        }
        write!(
            f,
            "   Result: {}",
            if self.passed() { "✅ PASS" } else { "❌ FAIL" }
        )
    }
}

/// Runs the full sequence for one configuration
pub struct Harness {
    config: CachecmpConfig,
}

impl Harness {
    pub fn new(config: CachecmpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CachecmpConfig {
        &self.config
    }

    /// Start the proxy, run both phases and tear down
    pub async fn run(&self) -> HarnessResult<BenchReport> {
        self.config
            .validate_all()
            .map_err(|e| HarnessError::Setup(format!("invalid configuration: {}", e)))?;

        let harness = &self.config.harness;
        let keyspace = Keyspace::new(harness.keys, harness.path_prefix.as_str())?;
        let http: HttpConfig = self.config.http.clone().into();

        let deployment = Deployment::start(&self.config.sut, &http).await?;
        let result = self.exercise(&deployment, &keyspace, &http).await;
        deployment.teardown().await;

        if let Err(ref e) = result {
            warn!("Run aborted: {}", e);
        }
        result
    }

    /// Run both phases against an already running proxy
    pub async fn exercise(
        &self,
        deployment: &Deployment,
        keyspace: &Keyspace,
        http: &HttpConfig,
    ) -> HarnessResult<BenchReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let variant = deployment.variant();
        let client = ProbeClient::new(http, &variant.cache_status_header)?;

        let populated = populate(&client, variant, keyspace).await?;
        let origin_requests_after_populate = deployment.origin_hits();

        // The measurement clock starts inside `sample`, after population
        let options = SamplerOptions {
            workers: default_workers(self.config.harness.worker_multiplier),
            budget: self.config.harness.sample,
            seed: self.config.harness.seed,
        };
        let outcome = sample(&client, variant, keyspace, &options).await?;
        let origin_requests_after_sample = deployment.origin_hits();
        let proxy_store = deployment.store_stats().await?;

        let report = BenchReport {
            run_id,
            started_at,
            variant: variant.clone(),
            populate: populated,
            workers: outcome.workers,
            ops_per_sec: outcome.ops_per_sec(),
            sample_secs: outcome.elapsed.as_secs_f64(),
            sample: outcome.tally,
            origin_requests_after_populate,
            origin_requests_after_sample,
            proxy_store,
        };
        info!(
            run_id = %report.run_id,
            passed = report.passed(),
            "Run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(sample: SampleTally) -> BenchReport {
        BenchReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            variant: SutVariant::custom("http://127.0.0.1:8080"),
            populate: PopulateSummary {
                keys: 10,
                elapsed: Duration::from_millis(5),
            },
            workers: 2,
            sample,
            sample_secs: 1.0,
            ops_per_sec: 10.0,
            origin_requests_after_populate: Some(10),
            origin_requests_after_sample: Some(12),
            proxy_store: None,
        }
    }

    #[test]
    fn test_pass_requires_clean_sample() {
        let clean = report(SampleTally {
            iterations: 10,
            hits: 10,
            ..Default::default()
        });
        assert!(clean.passed());

        let violated = report(SampleTally {
            iterations: 10,
            hits: 9,
            violations: 1,
            ..Default::default()
        });
        assert!(!violated.passed());

        let unreachable = report(SampleTally {
            iterations: 10,
            hits: 9,
            transport_errors: 1,
            ..Default::default()
        });
        assert!(!unreachable.passed());
    }

    #[test]
    fn test_origin_requests_during_sample() {
        let mut r = report(SampleTally::default());
        assert_eq!(r.origin_requests_during_sample(), Some(2));

        r.origin_requests_after_sample = None;
        assert_eq!(r.origin_requests_during_sample(), None);
    }

    #[test]
    fn test_display_includes_store_counters() {
        let mut r = report(SampleTally::default());
        assert!(!r.to_string().contains("Proxy store"));

        r.proxy_store = Some(CacheStats {
            hits: 3,
            misses: 1,
            puts: 10,
            evictions: 4,
            entry_count: 6,
        });
        let text = r.to_string();
        assert!(text.contains("6 entries, 4 evictions, 75.0% hit rate"), "{}", text);
    }

    #[test]
    fn test_report_serializes() {
        let json = report(SampleTally::default()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["variant"]["cache_status_header"], "X-Cache");
        assert_eq!(value["origin_requests_after_populate"], 10);
        assert!(value["run_id"].is_string());
    }
}
