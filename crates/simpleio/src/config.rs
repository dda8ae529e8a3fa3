use std::path::{Path, PathBuf};

use thiserror::Error;

/// Size of the block moved per I/O call, 1 MiB.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Parameters of one benchmark run.
///
/// Values are expected to be validated already by whatever produced them, `validate` only guards
/// the invariants the engine itself depends on.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    target_dir: PathBuf,
    name: String,
    file_size: u64,
    workers: usize,
    block_size: usize,
}

impl BenchmarkConfig {
    pub fn new(target_dir: impl Into<PathBuf>, name: impl Into<String>, file_size: u64) -> Self {
        Self {
            target_dir: target_dir.into(),
            name: name.into(),
            file_size,
            workers: 1,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes written and read per worker file.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Path of the file owned by the worker at `index`, `<target_dir>/<name><index>.dat`.
    pub fn worker_path(&self, index: usize) -> PathBuf {
        self.target_dir.join(format!("{}{}.dat", self.name, index))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }

        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration, at least one worker is required")]
    NoWorkers,
    #[error("invalid configuration, block size must be larger than zero")]
    ZeroBlockSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_paths_are_stable_per_index() {
        let config = BenchmarkConfig::new("/tmp/bench", "run", 0).with_workers(2);

        assert_eq!(config.worker_path(0), PathBuf::from("/tmp/bench/run0.dat"));
        assert_eq!(config.worker_path(1), PathBuf::from("/tmp/bench/run1.dat"));
        assert_eq!(config.worker_path(1), config.worker_path(1));
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        let config = BenchmarkConfig::new("/tmp", "run", 10);
        assert_eq!(config.validate(), Ok(()));

        let no_workers = config.clone().with_workers(0);
        assert_eq!(no_workers.validate(), Err(ConfigError::NoWorkers));

        let no_block = config.with_block_size(0);
        assert_eq!(no_block.validate(), Err(ConfigError::ZeroBlockSize));
    }
}
