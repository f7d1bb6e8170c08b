//! Durable side-channel for rejected records.
//!
//! Every record the validator refuses is written to a timestamped CSV file
//! for later human review. Each entry keeps the full original raw record
//! (all source fields, verbatim) alongside its provenance and the joined
//! violation reasons, so a reviewer can correct the row and resubmit it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::SinkResult;
use crate::models::Rejection;

/// Separator between violation reasons in the `violations` column.
const REASON_SEPARATOR: &str = "; ";

/// File-based invalid-records sink.
///
/// One file is written per pipeline run, named after the run's start time;
/// rerunning never overwrites an earlier run's rejects.
#[derive(Debug, Clone)]
pub struct InvalidRecordSink {
    dir: PathBuf,
}

impl InvalidRecordSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write all rejections of one run, tagged with their source file.
    ///
    /// Returns the path of the written file, or `None` when there was
    /// nothing to write (no file is created for a clean run).
    pub fn write(
        &self,
        entries: &[(String, Rejection)],
        run_started: DateTime<Utc>,
    ) -> SinkResult<Option<PathBuf>> {
        if entries.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "invalid_records_{}.csv",
            run_started.format("%Y%m%d_%H%M%S")
        ));

        let raw_headers = collect_raw_headers(entries);
        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["source_file", "line", "violations"];
        header.extend(raw_headers.iter().map(String::as_str));
        writer.write_record(&header)?;

        for (source_file, rejection) in entries {
            let mut row = vec![
                source_file.clone(),
                rejection.record.line.to_string(),
                rejection.reasons.join(REASON_SEPARATOR),
            ];
            for column in &raw_headers {
                row.push(rejection.record.get(column).unwrap_or("").to_string());
            }
            writer.write_record(&row)?;
        }

        writer.flush()?;
        info!(
            path = %path.display(),
            rejected = entries.len(),
            "wrote invalid records"
        );

        Ok(Some(path))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Union of every source field name seen across the rejections, in
/// first-seen order, so mixed-layout inputs still land in one file.
fn collect_raw_headers(entries: &[(String, Rejection)]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (_, rejection) in entries {
        for name in rejection.record.field_names() {
            if !headers.iter().any(|h| h == name) {
                headers.push(name.to_string());
            }
        }
    }
    headers
}
