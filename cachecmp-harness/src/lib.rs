//! Cache correctness harness
//!
//! A run establishes `N` keys on a caching proxy through a bounded worker
//! pool, then drives randomly keyed reads from parallel workers and checks
//! that every response was served from cache. See [`driver::Harness`] for the
//! full sequence.

pub mod driver;
pub mod error;
pub mod keyspace;
pub mod populate;
pub mod sampler;
pub mod sut;

pub use driver::{BenchReport, Harness};
pub use error::{HarnessError, HarnessResult};
pub use keyspace::Keyspace;
pub use populate::{populate, PopulateSummary};
pub use sampler::{default_workers, sample, SampleOutcome, SampleTally, SamplerOptions};
pub use sut::{Deployment, SutVariant};
