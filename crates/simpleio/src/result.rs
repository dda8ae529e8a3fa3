use std::time::Duration;

use thiserror::Error;

use crate::JobKind;

/// Terminal status of a finished job.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Outcome {
    Ok,
    Failed,
}

/// Outcome of one job: how many bytes it moved and how long the transfer loop took.
#[derive(Debug, Clone)]
pub struct JobResult {
    kind: JobKind,
    outcome: Outcome,
    byte_count: u64,
    exec_time: Duration,
    error: Option<String>,
}

impl JobResult {
    pub fn ok(kind: JobKind, byte_count: u64, exec_time: Duration) -> Self {
        Self {
            kind,
            outcome: Outcome::Ok,
            byte_count,
            exec_time,
            error: None,
        }
    }

    pub fn failed(
        kind: JobKind,
        byte_count: u64,
        exec_time: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            outcome: Outcome::Failed,
            byte_count,
            exec_time,
            error: Some(error.into()),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub fn exec_time(&self) -> Duration {
        self.exec_time
    }

    /// Message of the I/O error that failed the job, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Bytes per second over the recorded execution time.
    pub fn throughput(&self) -> f64 {
        bytes_per_second(self.byte_count, self.exec_time)
    }

    /// Fold another successful result of the same kind into this one.
    ///
    /// Byte counts and execution times are summed. The summed time is not a wall-clock time, it's
    /// used to derive the average per worker.
    pub fn merge(&mut self, other: &JobResult) -> Result<(), MergeError> {
        if self.kind != other.kind {
            return Err(MergeError::KindMismatch {
                left: self.kind,
                right: other.kind,
            });
        }

        if !self.is_ok() || !other.is_ok() {
            return Err(MergeError::NotOk);
        }

        self.byte_count += other.byte_count;
        self.exec_time += other.exec_time;

        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MergeError {
    #[error("failed to merge results, kinds differ ({left} and {right})")]
    KindMismatch { left: JobKind, right: JobKind },
    #[error("failed to merge results, only successful results can be merged")]
    NotOk,
}

/// Statistics of one completed phase across all workers.
#[derive(Debug, Clone)]
pub struct PhaseSummary {
    kind: JobKind,
    total: usize,
    ok_count: usize,
    merged: Option<JobResult>,
    wall_time: Duration,
    results: Vec<Option<JobResult>>,
}

impl PhaseSummary {
    /// Aggregate the per-worker results of a phase.
    ///
    /// `results` holds one slot per worker, `None` where the worker never returned a result.
    /// Only successful results contribute to the statistics.
    pub fn collect(kind: JobKind, results: Vec<Option<JobResult>>, wall_time: Duration) -> Self {
        let mut ok_count = 0;
        let mut merged: Option<JobResult> = None;

        for result in results.iter().flatten().filter(|r| r.is_ok()) {
            match &mut merged {
                Some(merged) => {
                    if merged.merge(result).is_err() {
                        continue;
                    }
                }
                None => merged = Some(result.clone()),
            }
            ok_count += 1;
        }

        Self {
            kind,
            total: results.len(),
            ok_count,
            merged,
            wall_time,
            results,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Number of workers that took part in the phase.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of workers whose job completed with `Outcome::Ok`.
    pub fn ok_count(&self) -> usize {
        self.ok_count
    }

    /// Wall-clock time of the whole phase, from submission until the last worker returned.
    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    pub fn results(&self) -> &[Option<JobResult>] {
        &self.results
    }

    /// Summed bytes of all successful workers.
    pub fn byte_count(&self) -> u64 {
        self.merged.as_ref().map_or(0, JobResult::byte_count)
    }

    /// Summed per-worker execution time of all successful workers.
    pub fn exec_time(&self) -> Duration {
        self.merged.as_ref().map_or(Duration::ZERO, JobResult::exec_time)
    }

    /// Bytes and execution time of a typical worker, `None` if no worker succeeded.
    pub fn average(&self) -> Option<(u64, Duration)> {
        let merged = self.merged.as_ref()?;
        let count = self.ok_count as u64;

        let bytes = merged.byte_count() / count;
        let nanos = merged.exec_time().as_nanos() / count as u128;
        let time = Duration::from_nanos(nanos as u64);

        Some((bytes, time))
    }

    /// Single-stream throughput, summed bytes over summed per-worker time.
    pub fn average_throughput(&self) -> Option<f64> {
        self.merged.as_ref().map(JobResult::throughput)
    }

    /// Combined throughput of all workers, summed bytes over the phase wall-clock time.
    pub fn aggregate_throughput(&self) -> Option<f64> {
        self.merged
            .as_ref()
            .map(|merged| bytes_per_second(merged.byte_count(), self.wall_time))
    }
}

pub(crate) fn bytes_per_second(bytes: u64, time: Duration) -> f64 {
    let secs = time.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }

    bytes as f64 / secs
}
