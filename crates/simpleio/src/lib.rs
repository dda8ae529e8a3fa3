//! Concurrent file I/O throughput benchmark.
//!
//! A [`Benchmark`] runs four phases in a fixed order against one file per worker: first write,
//! rewrite, first read and reread. Every phase submits one [`Job`] per worker to a fixed-size
//! [`WorkerPool`], waits for all of them, and reports per-worker and aggregate throughput.

mod benchmark;
mod config;
mod data;
mod job;
mod pool;
mod report;
mod result;

pub use self::{
    benchmark::{Benchmark, BenchmarkError},
    config::{BenchmarkConfig, ConfigError, DEFAULT_BLOCK_SIZE},
    data::DataSource,
    job::{Job, JobKind, JobStatus},
    pool::{PoolError, WorkerPool},
    report::{format_result_line, LineSink, TIMESTAMP_FORMAT},
    result::{JobResult, MergeError, Outcome, PhaseSummary},
};
