use std::{path::PathBuf, time::Instant};

use thiserror::Error;
use tracing::{event, instrument, Level};

use crate::{
    report::{detail_lines, summary_lines, timestamp},
    BenchmarkConfig, ConfigError, Job, JobKind, LineSink, PhaseSummary, PoolError, WorkerPool,
};

/// Benchmark orchestrator.
///
/// Owns the worker pool and the per-worker file paths, and runs the phases one after another.
/// Every phase is a barrier, no job of the next phase is created before every worker of the
/// current phase has returned.
pub struct Benchmark {
    config: BenchmarkConfig,
    paths: Vec<PathBuf>,
    pool: Option<WorkerPool>,
    output: Box<dyn LineSink>,
    detail: Option<Box<dyn LineSink>>,
}

impl Benchmark {
    /// Create a benchmark writing its report to `output`.
    pub fn new(config: BenchmarkConfig, output: Box<dyn LineSink>) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            paths: Vec::new(),
            pool: None,
            output,
            detail: None,
        })
    }

    /// Also write per-worker results to a secondary sink.
    pub fn with_detail(mut self, detail: Box<dyn LineSink>) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Worker file paths, empty until `prepare` is called.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Run the full benchmark: prepare, all phases in order, then clean up.
    pub fn start(&mut self) -> Result<Vec<PhaseSummary>, BenchmarkError> {
        self.prepare()?;

        let mut summaries = Vec::with_capacity(JobKind::ALL.len());
        for kind in JobKind::ALL {
            summaries.push(self.run_phase(kind)?);
        }

        self.cleanup();

        Ok(summaries)
    }

    /// Generate the worker file paths and start the worker pool.
    ///
    /// Calling this again keeps the existing paths and pool.
    pub fn prepare(&mut self) -> Result<(), BenchmarkError> {
        if self.paths.is_empty() {
            self.paths = (0..self.config.workers())
                .map(|index| self.config.worker_path(index))
                .collect();
        }

        if self.pool.is_none() {
            let pool = WorkerPool::new(self.config.workers())?;
            self.pool = Some(pool);
        }

        Ok(())
    }

    /// Run one job of `kind` on every worker, wait for all of them, and report the result.
    #[instrument("phase", skip(self))]
    pub fn run_phase(&mut self, kind: JobKind) -> Result<PhaseSummary, BenchmarkError> {
        let pool = self.pool.as_ref().ok_or(BenchmarkError::NotPrepared)?;

        let tasks: Vec<_> = self
            .paths
            .iter()
            .map(|path| {
                let mut job = Job::new(
                    kind,
                    path.clone(),
                    self.config.file_size(),
                    self.config.block_size(),
                );
                move || job.run()
            })
            .collect();
        let count = tasks.len();

        event!(Level::INFO, workers = count, "phase started");
        emit(
            &mut *self.output,
            &format!("Benchmark {} started at {}", kind, timestamp()),
        );

        let start = Instant::now();
        let results = match pool.invoke_all(tasks) {
            Ok(results) => results,
            Err(error) => {
                event!(Level::WARN, %error, "phase did not run on the worker pool");
                vec![None; count]
            }
        };
        let wall_time = start.elapsed();

        event!(Level::INFO, ?wall_time, "phase completed");
        emit(
            &mut *self.output,
            &format!(
                "Benchmark {} completed at {} in {:.6}s",
                kind,
                timestamp(),
                wall_time.as_secs_f64()
            ),
        );

        let summary = PhaseSummary::collect(kind, results, wall_time);
        self.report(&summary);

        Ok(summary)
    }

    /// Shut down the worker pool, waiting for the workers to exit.
    ///
    /// Phases run after this fail with `BenchmarkError::NotPrepared` until `prepare` is called
    /// again.
    pub fn cleanup(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
            event!(Level::DEBUG, "worker pool shut down");
        }
    }

    fn report(&mut self, summary: &PhaseSummary) {
        if let Some(detail) = self.detail.as_mut() {
            for line in detail_lines(summary, &self.paths) {
                emit(&mut **detail, &line);
            }
        }

        for line in summary_lines(summary) {
            emit(&mut *self.output, &line);
        }
    }
}

fn emit(sink: &mut dyn LineSink, line: &str) {
    if let Err(error) = sink.write_line(line) {
        event!(Level::WARN, %error, "failed to write report line");
    }
}

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("invalid benchmark configuration")]
    Config(#[from] ConfigError),
    #[error("failed to run worker pool")]
    Pool(#[from] PoolError),
    #[error("benchmark is not prepared, no worker pool is running")]
    NotPrepared,
}

