//! Result routing and persistence.
//!
//! The sink is the only writer of the two output partitions. Statuses route
//! as: `Available` to the valid file; `Taken` and `Undetermined` to the
//! non-valid file; challenge pages and errors are held back as anomalies for
//! the caller to report; `ForSale` is counted but persisted to neither file.

use crate::error::HandleCheckError;
use crate::types::{Anomaly, HandleResult, HandleStatus};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Counts and anomalies accumulated by a sink over one run.
#[derive(Debug, Clone, Default)]
pub struct SinkReport {
    /// Names written to the valid partition.
    pub available: usize,
    /// Names written to the non-valid partition as taken.
    pub taken: usize,
    /// Names written to the non-valid partition as undetermined.
    pub undetermined: usize,
    /// For-sale names (persisted to neither file).
    pub for_sale: usize,
    /// Challenge pages and unresolved errors.
    pub anomalies: Vec<Anomaly>,
}

impl SinkReport {
    /// Total results accepted, across both files and the anomaly list.
    pub fn total(&self) -> usize {
        self.available + self.taken + self.undetermined + self.for_sale + self.anomalies.len()
    }
}

/// Owns the two output partitions and routes classified results into them.
///
/// Writes happen at the batch drain barrier, one result at a time, so lines
/// never interleave. Both files are truncated on creation: a run starts its
/// partitions fresh, and partial output from an interrupted run is still
/// well-formed because every accepted name is written as one full line.
pub struct ResultSink {
    valid: BufWriter<File>,
    nonvalid: BufWriter<File>,
    valid_path: PathBuf,
    nonvalid_path: PathBuf,
    report: SinkReport,
}

impl ResultSink {
    /// Create a sink writing to the given partition paths.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        valid_path: P,
        nonvalid_path: Q,
    ) -> Result<Self, HandleCheckError> {
        let valid_path = valid_path.as_ref().to_path_buf();
        let nonvalid_path = nonvalid_path.as_ref().to_path_buf();

        let valid = File::create(&valid_path).map_err(|e| {
            HandleCheckError::file_error(valid_path.to_string_lossy(), e.to_string())
        })?;
        let nonvalid = File::create(&nonvalid_path).map_err(|e| {
            HandleCheckError::file_error(nonvalid_path.to_string_lossy(), e.to_string())
        })?;

        Ok(Self {
            valid: BufWriter::new(valid),
            nonvalid: BufWriter::new(nonvalid),
            valid_path,
            nonvalid_path,
            report: SinkReport::default(),
        })
    }

    /// Route one classified result to its partition (or the anomaly list).
    pub fn accept(&mut self, result: HandleResult) -> Result<(), HandleCheckError> {
        match &result.status {
            HandleStatus::Available => {
                writeln!(self.valid, "{}", result.name).map_err(|e| {
                    HandleCheckError::file_error(self.valid_path.to_string_lossy(), e.to_string())
                })?;
                self.report.available += 1;
            }
            HandleStatus::Taken => {
                writeln!(self.nonvalid, "{}", result.name).map_err(|e| {
                    HandleCheckError::file_error(self.nonvalid_path.to_string_lossy(), e.to_string())
                })?;
                self.report.taken += 1;
            }
            HandleStatus::Undetermined => {
                writeln!(self.nonvalid, "{}", result.name).map_err(|e| {
                    HandleCheckError::file_error(self.nonvalid_path.to_string_lossy(), e.to_string())
                })?;
                self.report.undetermined += 1;
            }
            HandleStatus::ForSale => {
                // Display-only state: callers may surface it, neither file
                // records it.
                self.report.for_sale += 1;
            }
            HandleStatus::CaptchaChallenge
            | HandleStatus::TransientError(_)
            | HandleStatus::FatalError(_) => {
                self.report.anomalies.push(Anomaly {
                    name: result.name,
                    status: result.status,
                });
            }
        }
        Ok(())
    }

    /// Flush buffered lines to disk without consuming the sink.
    ///
    /// Called at batch boundaries and on cancellation so that everything
    /// accepted so far survives an abrupt stop.
    pub fn flush(&mut self) -> Result<(), HandleCheckError> {
        self.valid.flush().map_err(|e| {
            HandleCheckError::file_error(self.valid_path.to_string_lossy(), e.to_string())
        })?;
        self.nonvalid.flush().map_err(|e| {
            HandleCheckError::file_error(self.nonvalid_path.to_string_lossy(), e.to_string())
        })?;
        Ok(())
    }

    /// Flush both partitions and return the accumulated report.
    pub fn finish(mut self) -> Result<SinkReport, HandleCheckError> {
        self.flush()?;
        Ok(self.report)
    }

    /// Counts accumulated so far.
    pub fn report(&self) -> &SinkReport {
        &self.report
    }

    /// Path of the valid partition.
    pub fn valid_path(&self) -> &Path {
        &self.valid_path
    }

    /// Path of the non-valid partition.
    pub fn nonvalid_path(&self) -> &Path {
        &self.nonvalid_path
    }
}
