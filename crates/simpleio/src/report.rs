use std::{io, path::PathBuf, time::Duration};

use chrono::Local;

use crate::{result::bytes_per_second, JobKind, Outcome, PhaseSummary};

const MIB: f64 = 1024.0 * 1024.0;

/// Format of the wall-clock stamps on phase start and completion lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Destination for human-readable report lines.
pub trait LineSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

impl<W> LineSink for W
where
    W: io::Write,
{
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self, "{}", line)?;
        self.flush()
    }
}

/// Format one result as `<kind>: status=.. bytes=.. time=..s throughput=.. MiB/s`.
pub fn format_result_line(
    kind: JobKind,
    outcome: Outcome,
    byte_count: u64,
    time: Duration,
) -> String {
    let status = match outcome {
        Outcome::Ok => "OK",
        Outcome::Failed => "FAILED",
    };
    let throughput = bytes_per_second(byte_count, time) / MIB;

    format!(
        "{}: status={} bytes={} time={:.6}s throughput={:.2} MiB/s",
        kind,
        status,
        byte_count,
        time.as_secs_f64(),
        throughput
    )
}

/// Current local time, formatted with `TIMESTAMP_FORMAT`.
pub(crate) fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Lines of the phase summary, ending with the average and aggregate results if any worker
/// succeeded.
pub(crate) fn summary_lines(summary: &PhaseSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Thread status: {} out of {} completed normally.",
        summary.ok_count(),
        summary.total()
    )];

    let Some((bytes, time)) = summary.average() else {
        return lines;
    };

    // Averaged bytes over averaged time keeps the summed ratio
    lines.push("Average Result:".to_string());
    lines.push(format_result_line(summary.kind(), Outcome::Ok, bytes, time));

    lines.push("Aggregated Result:".to_string());
    lines.push(format_result_line(
        summary.kind(),
        Outcome::Ok,
        summary.byte_count(),
        summary.wall_time(),
    ));

    lines
}

/// Per-worker detail lines, for the secondary sink.
pub(crate) fn detail_lines(summary: &PhaseSummary, paths: &[PathBuf]) -> Vec<String> {
    let mut lines = vec!["Per Thread Result:".to_string()];

    for (index, slot) in summary.results().iter().enumerate() {
        let path = paths
            .get(index)
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let line = match slot {
            Some(result) => {
                let mut line = format!(
                    "worker {} {}: {}",
                    index,
                    path,
                    format_result_line(
                        result.kind(),
                        result.outcome(),
                        result.byte_count(),
                        result.exec_time()
                    )
                );
                if let Some(error) = result.error() {
                    line.push_str(&format!(" error={}", error));
                }
                line
            }
            None => format!("worker {} {}: no result", index, path),
        };
        lines.push(line);
    }

    lines
}
