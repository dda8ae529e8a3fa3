use std::{
    fmt::{self, Display},
    fs::{File, OpenOptions},
    io::{self, ErrorKind, Read, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::{event, instrument, Level};

use crate::{DataSource, JobResult};

/// The I/O pattern a phase exercises.
///
/// Phases always run in the order of `JobKind::ALL`, later kinds rely on the file the first write
/// created.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub enum JobKind {
    /// Create or truncate the file, then write it in full.
    FirstWrite,
    /// Overwrite the existing file in place, without growing it.
    Rewrite,
    /// Read the file produced by the first write.
    FirstRead,
    /// Read the same file again.
    Reread,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::FirstWrite,
        JobKind::Rewrite,
        JobKind::FirstRead,
        JobKind::Reread,
    ];

    pub fn is_write(self) -> bool {
        matches!(self, JobKind::FirstWrite | JobKind::Rewrite)
    }

    fn open(self, path: &Path) -> io::Result<File> {
        match self {
            JobKind::FirstWrite => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
            JobKind::Rewrite => OpenOptions::new().write(true).open(path),
            JobKind::FirstRead | JobKind::Reread => File::open(path),
        }
    }
}

impl Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::FirstWrite => "FirstWrite",
            JobKind::Rewrite => "Rewrite",
            JobKind::FirstRead => "FirstRead",
            JobKind::Reread => "Reread",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a job, `Pending -> Running -> Ok | Failed`.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum JobStatus {
    Pending,
    Running,
    Ok,
    Failed,
}

/// One I/O operation against one file, run to completion on the calling thread.
///
/// Jobs are created fresh for every phase and never reused.
pub struct Job {
    path: PathBuf,
    kind: JobKind,
    total_bytes: u64,
    source: DataSource,
    status: JobStatus,
}

impl Job {
    /// Create a job with the data source matching its kind, random data for writes and a
    /// discard buffer for reads.
    pub fn new(kind: JobKind, path: PathBuf, total_bytes: u64, block_size: usize) -> Self {
        let source = if kind.is_write() {
            DataSource::random(block_size)
        } else {
            DataSource::empty(block_size)
        };

        Self::with_source(kind, path, total_bytes, source)
    }

    pub fn with_source(kind: JobKind, path: PathBuf, total_bytes: u64, source: DataSource) -> Self {
        Self {
            path,
            kind,
            total_bytes,
            source,
            status: JobStatus::Pending,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Run the job, moving one block at a time until the target byte count is reached.
    ///
    /// I/O errors never escape, they end the job with a failed result carrying the bytes moved
    /// before the error. A read hitting end of file early is a normal, successful completion.
    #[instrument("job", skip_all, fields(kind = %self.kind, path = %self.path.display()))]
    pub fn run(&mut self) -> JobResult {
        self.status = JobStatus::Running;
        event!(Level::DEBUG, total = self.total_bytes, "running job");

        let mut file = match self.kind.open(&self.path) {
            Ok(file) => file,
            Err(error) => {
                event!(Level::WARN, %error, "failed to open file");
                self.status = JobStatus::Failed;
                return JobResult::failed(self.kind, 0, Duration::ZERO, error.to_string());
            }
        };

        let mut transferred = 0;
        let start = Instant::now();
        let result = self.transfer(&mut file, &mut transferred);
        let exec_time = start.elapsed();

        // Closing can't fail a transfer that already went through
        drop(file);

        match result {
            Ok(()) => {
                event!(Level::DEBUG, transferred, "job completed");
                self.status = JobStatus::Ok;
                JobResult::ok(self.kind, transferred, exec_time)
            }
            Err(error) => {
                event!(Level::WARN, %error, transferred, "job failed during transfer");
                self.status = JobStatus::Failed;
                JobResult::failed(self.kind, transferred, exec_time, error.to_string())
            }
        }
    }

    fn transfer(&mut self, file: &mut File, transferred: &mut u64) -> io::Result<()> {
        let block_size = self.source.block_size() as u64;

        // An empty block can never make progress
        if block_size == 0 && self.total_bytes > 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "block size must be larger than zero",
            ));
        }

        while *transferred < self.total_bytes {
            let size = (self.total_bytes - *transferred).min(block_size) as usize;
            let before = *transferred;

            if self.kind.is_write() {
                write_block(file, self.source.next_block(size), transferred)?;
            } else {
                read_block(file, self.source.next_block_mut(size), transferred)?;
            }

            // Short read, the file ended before the target size
            if *transferred - before < size as u64 {
                break;
            }
        }

        Ok(())
    }
}

/// Write the whole block, counting bytes as they go out.
fn write_block(file: &mut File, mut buf: &[u8], transferred: &mut u64) -> io::Result<()> {
    while !buf.is_empty() {
        match file.write(buf) {
            Ok(0) => return Err(ErrorKind::WriteZero.into()),
            Ok(n) => {
                *transferred += n as u64;
                buf = &buf[n..];
            }
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }

    Ok(())
}

/// Fill the block, stopping early only at end of file.
fn read_block(file: &mut File, mut buf: &mut [u8], transferred: &mut u64) -> io::Result<()> {
    while !buf.is_empty() {
        match file.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                *transferred += n as u64;
                let tmp = buf;
                buf = &mut tmp[n..];
            }
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }

    Ok(())
}
