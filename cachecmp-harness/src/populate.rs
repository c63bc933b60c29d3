//! Population phase
//!
//! Issues exactly one GET per key with at most `C` requests in flight. The
//! run only proceeds to sampling if every key was established.

use cachecmp_http::ProbeClient;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::keyspace::Keyspace;
use crate::sut::SutVariant;

/// Outcome of a successful population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulateSummary {
    /// Keys established
    pub keys: u64,

    /// Wall-clock time spent populating
    pub elapsed: Duration,
}

/// Establish every key of `keyspace` on the proxy described by `variant`.
///
/// A permit is taken before each task is spawned and released when the task
/// ends. After the first failure no further keys are issued, but tasks already
/// in flight run to completion before the first error is returned.
pub async fn populate(
    client: &ProbeClient,
    variant: &SutVariant,
    keyspace: &Keyspace,
) -> HarnessResult<PopulateSummary> {
    let concurrency = variant
        .populate_concurrency
        .clamp(1, Semaphore::MAX_PERMITS);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let failed = Arc::new(AtomicBool::new(false));
    let mut tasks = JoinSet::new();

    info!(
        "Populating {} keys on {} with concurrency {}",
        keyspace.size(),
        variant.base_url,
        concurrency
    );
    let start = Instant::now();

    for key in keyspace.keys() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| HarnessError::Setup(format!("population semaphore closed: {}", e)))?;

        if failed.load(Ordering::Acquire) {
            warn!("Not issuing key {} or later after a population failure", key);
            break;
        }

        let client = client.clone();
        let request = variant.request(&keyspace.path(key));
        let failed = failed.clone();
        tasks.spawn(async move {
            let result = client.fetch_ok(&request).await;
            if result.is_err() {
                failed.store(true, Ordering::Release);
            }
            drop(permit);
            result.map(|_| ()).map_err(|source| (key, source))
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err((key, source))) => HarnessError::Populate { key, source },
            Err(e) => HarnessError::Join(e),
        };

        if first_error.is_none() {
            error!("Population failed: {}", failure);
            first_error = Some(failure);
        } else {
            debug!("Further population failure: {}", failure);
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    let summary = PopulateSummary {
        keys: keyspace.size(),
        elapsed: start.elapsed(),
    };
    info!(
        "Populated {} keys in {:.2}s",
        summary.keys,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}
