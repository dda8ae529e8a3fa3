use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::{Context, Error};
use clap::Parser;
use simpleio::BenchmarkConfig;

const MIB: u64 = 1024 * 1024;

/// Measure file I/O throughput with concurrent writers and readers.
///
/// Runs a first write, a rewrite, a first read and a reread phase against one file per thread,
/// and reports average and aggregate throughput per phase.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory to create the benchmark files in, should be empty.
    #[arg(short = 'd', long = "dir", value_name = "PATH")]
    pub target_dir: PathBuf,

    /// Size of every benchmark file, in MiB.
    #[arg(short = 's', long = "size", value_name = "MIB")]
    pub file_size: u64,

    /// Benchmark name, used as the prefix of the benchmark files.
    #[arg(short = 'b', long = "name", value_name = "NAME")]
    pub name: String,

    /// Number of concurrent I/O threads.
    #[arg(short = 't', long = "threads", value_name = "COUNT", default_value = "1")]
    pub threads: NonZeroUsize,

    /// File to write per-thread results to.
    #[arg(short = 'l', long = "log", value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Size of a single read or write call, in KiB.
    #[arg(long = "block-size", value_name = "KIB", default_value = "1024")]
    pub block_size: NonZeroUsize,
}

impl CliArgs {
    pub fn to_config(&self) -> Result<BenchmarkConfig, Error> {
        let file_size = self
            .file_size
            .checked_mul(MIB)
            .context("file size is too large")?;
        let block_size = self
            .block_size
            .get()
            .checked_mul(1024)
            .context("block size is too large")?;

        let config = BenchmarkConfig::new(&self.target_dir, &self.name, file_size)
            .with_workers(self.threads.get())
            .with_block_size(block_size);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn args_are_well_formed() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn size_is_given_in_mib() {
        let args = CliArgs::parse_from(["simpleio", "-d", "/tmp/bench", "-s", "4", "-b", "run"]);
        let config = args.to_config().unwrap();

        assert_eq!(config.file_size(), 4 * MIB);
        assert_eq!(config.workers(), 1);
        assert_eq!(config.block_size(), 1024 * 1024);
        assert_eq!(config.worker_path(0), PathBuf::from("/tmp/bench/run0.dat"));
        assert!(args.log.is_none());
    }

    #[test]
    fn zero_threads_are_rejected() {
        let result =
            CliArgs::try_parse_from(["simpleio", "-d", "/tmp", "-s", "1", "-b", "x", "-t", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn oversized_file_is_rejected() {
        let size = u64::MAX.to_string();
        let args =
            CliArgs::parse_from(["simpleio", "-d", "/tmp", "-s", size.as_str(), "-b", "x"]);
        assert!(args.to_config().is_err());
    }
}
