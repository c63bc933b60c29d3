//! Measurement phase
//!
//! Parallel workers draw random keys and require every response to be a
//! cache hit. Workers share nothing but the budget; each keeps its own RNG and
//! its own tally, merged after all workers join.

use cachecmp_config::{SampleBudget, MAX_WORKER_MULTIPLIER};
use cachecmp_http::{CacheStatus, ProbeClient, RequestDescriptor};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::HarnessResult;
use crate::keyspace::Keyspace;
use crate::sut::SutVariant;

/// Sampler settings
#[derive(Debug, Clone)]
pub struct SamplerOptions {
    pub workers: usize,
    pub budget: SampleBudget,
    /// Seeds the per-worker RNGs; random when absent
    pub seed: Option<u64>,
}

/// Worker count for the available hardware parallelism
pub fn default_workers(multiplier: usize) -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    parallelism
        .saturating_mul(multiplier.min(MAX_WORKER_MULTIPLIER))
        .max(1)
}

/// Per-worker counters, summed after join
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleTally {
    /// Requests attempted
    pub iterations: u64,

    /// 2xx responses carrying the hit marker
    pub hits: u64,

    /// Responses that were not a 2xx cache hit
    pub violations: u64,

    /// Violations where the cache-status header was absent
    pub missing_header: u64,

    /// Requests that got no response
    pub transport_errors: u64,
}

impl SampleTally {
    pub fn merge(&mut self, other: &SampleTally) {
        self.iterations += other.iterations;
        self.hits += other.hits;
        self.violations += other.violations;
        self.missing_header += other.missing_header;
        self.transport_errors += other.transport_errors;
    }
}

/// Result of the measurement phase
#[derive(Debug, Clone, Serialize)]
pub struct SampleOutcome {
    pub workers: usize,
    pub tally: SampleTally,
    pub elapsed: Duration,
}

impl SampleOutcome {
    /// Completed iterations per second of measured time
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tally.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

/// One independent RNG per worker, derived from `seed` when given
fn worker_rngs(seed: Option<u64>, workers: usize) -> Vec<fastrand::Rng> {
    let mut seeds = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    (0..workers)
        .map(|_| fastrand::Rng::with_seed(seeds.u64(..)))
        .collect()
}

/// Shared stop condition
enum Budget {
    Iterations(AtomicU64),
    Deadline(Instant),
}

impl Budget {
    fn new(budget: SampleBudget, start: Instant) -> Self {
        match budget {
            SampleBudget::Iterations { count } => Budget::Iterations(AtomicU64::new(count)),
            SampleBudget::Duration { seconds } => Budget::Deadline(start + seconds),
        }
    }

    /// Claim one iteration; false once the budget is spent
    fn take(&self) -> bool {
        match self {
            Budget::Iterations(remaining) => remaining
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok(),
            Budget::Deadline(deadline) => Instant::now() < *deadline,
        }
    }
}

/// Run the measurement phase until the budget is spent
pub async fn sample(
    client: &ProbeClient,
    variant: &SutVariant,
    keyspace: &Keyspace,
    options: &SamplerOptions,
) -> HarnessResult<SampleOutcome> {
    let workers = options.workers.max(1);

    info!(
        "Sampling {} keys on {} with {} workers ({:?})",
        keyspace.size(),
        variant.base_url,
        workers,
        options.budget
    );

    let variant = Arc::new(variant.clone());
    let keyspace = Arc::new(keyspace.clone());
    let start = Instant::now();
    let budget = Arc::new(Budget::new(options.budget, start));

    let mut tasks = JoinSet::new();
    for (worker, rng) in worker_rngs(options.seed, workers).into_iter().enumerate() {
        tasks.spawn(run_worker(
            worker,
            rng,
            client.clone(),
            variant.clone(),
            keyspace.clone(),
            budget.clone(),
        ));
    }

    let mut tally = SampleTally::default();
    while let Some(joined) = tasks.join_next().await {
        tally.merge(&joined?);
    }
    let elapsed = start.elapsed();

    let outcome = SampleOutcome {
        workers,
        tally,
        elapsed,
    };
    info!(
        "Sampled {} requests in {:.2}s ({:.0} ops/sec, {} violations, {} transport errors)",
        outcome.tally.iterations,
        elapsed.as_secs_f64(),
        outcome.ops_per_sec(),
        outcome.tally.violations,
        outcome.tally.transport_errors
    );
    Ok(outcome)
}

async fn run_worker(
    worker: usize,
    mut rng: fastrand::Rng,
    client: ProbeClient,
    variant: Arc<SutVariant>,
    keyspace: Arc<Keyspace>,
    budget: Arc<Budget>,
) -> SampleTally {
    let mut tally = SampleTally::default();

    while budget.take() {
        let key = keyspace.random_key(&mut rng);
        let request = variant.request(&keyspace.path(key));
        tally.iterations += 1;

        match client.probe(&request).await {
            Ok(result) => {
                let status = result.cache_status();
                if result.is_success() && status.is_hit() {
                    tally.hits += 1;
                } else {
                    tally.violations += 1;
                    if status == CacheStatus::Missing {
                        tally.missing_header += 1;
                    }
                    report_violation(
                        worker,
                        &request,
                        client.cache_status_header(),
                        result.status,
                        &status,
                    );
                }
            }
            Err(e) => {
                tally.transport_errors += 1;
                warn!(worker, url = %request.url, "Request failed: {}", e);
            }
        }
    }

    debug!(worker, iterations = tally.iterations, "Worker finished");
    tally
}

fn report_violation(
    worker: usize,
    request: &RequestDescriptor,
    header: &str,
    status: u16,
    observed: &CacheStatus,
) {
    error!(
        worker,
        url = %request.url,
        headers = ?request.headers(),
        status,
        "Expected {} to be HIT, got {}",
        header,
        observed
    );
}
