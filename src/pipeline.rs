//! End-to-end pipeline orchestration.
//!
//! One run processes every record file in the data directory, end to end,
//! single-threaded and synchronous:
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐   ┌─────────┐
//! │  parse   │──▶│ validate  │──▶│  transform  │──▶│   load   │──▶│  views  │
//! │ (files)  │   │ (partition)│  │ (canonical) │   │ (chunks) │   │ (per    │
//! └──────────┘   └─────┬─────┘   └─────────────┘   └──────────┘   │ country)│
//!                      │ rejected                                 └─────────┘
//!                      ▼
//!              invalid-records sink
//! ```
//!
//! Rejected records leave the pipeline at the validator and are sunk for
//! human review; they never reach the transformer. Validation always runs
//! before transformation, which is why a transform failure is a defect
//! that aborts the run rather than a data problem.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult, ViewError};
use crate::mapping::{CanonicalField, ColumnMapper, CANONICAL_TABLE};
use crate::models::{CanonicalRecord, Rejection, RunContext, RunSummary};
use crate::parser::parse_file;
use crate::sink::InvalidRecordSink;
use crate::transform::transform_records;
use crate::validate::validate_records;
use crate::views::{generate_view_specs, render_view_sql};
use crate::warehouse::{load_records, WarehouseClient};

/// Default chunk size for warehouse writes.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory containing the raw record files.
    pub data_dir: PathBuf,
    /// Directory the invalid-records sink writes into.
    pub invalid_dir: PathBuf,
    /// Target warehouse table.
    pub table: String,
    /// Maximum records per warehouse write.
    pub chunk_size: usize,
    /// Countries to generate views for; when `None`, the distinct
    /// countries observed in the loaded records are used.
    pub countries: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            invalid_dir: PathBuf::from("data/invalid_records"),
            table: CANONICAL_TABLE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            countries: None,
        }
    }
}

/// Run the full pipeline: parse → validate → transform → load → views.
///
/// Per-record validation failures are expected and recorded; they never
/// abort the run. Transform defects and warehouse write failures do.
/// View generation failures are isolated per country and reported in the
/// summary.
pub fn run(config: &PipelineConfig, client: &mut dyn WarehouseClient) -> PipelineResult<RunSummary> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4().to_string();
    info!(run_id, data_dir = %config.data_dir.display(), "starting pipeline run");

    let mapper = ColumnMapper::new()?;
    let files = discover_input_files(config)?;

    let mut canonical: Vec<CanonicalRecord> = Vec::new();
    let mut rejections: Vec<(String, Rejection)> = Vec::new();

    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        info!(file = %file_name, "processing input file");

        let mut parsed = parse_file(path)?;

        let unmapped: Vec<&String> = parsed
            .headers
            .iter()
            .filter(|h| !h.is_empty() && mapper.lookup(h).is_none())
            .collect();
        if !unmapped.is_empty() {
            // Dropped from downstream processing by policy; visible here.
            warn!(file = %file_name, columns = ?unmapped, "dropping unmapped source columns");
        }

        backfill_country(&mut parsed.records, &parsed.headers, &mapper, &file_name);

        let report = validate_records(parsed.records, &mapper);
        info!(
            file = %file_name,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            "validated records"
        );

        let ctx = RunContext::new(started_at, file_name.clone());
        canonical.extend(transform_records(&report.accepted, &mapper, &ctx)?);
        rejections.extend(report.rejected.into_iter().map(|r| (file_name.clone(), r)));
    }

    let sink = InvalidRecordSink::new(&config.invalid_dir);
    let invalid_records_file = sink.write(&rejections, started_at)?;

    let load_report = load_records(client, &config.table, &canonical, config.chunk_size)?;
    info!(
        rows = load_report.rows_loaded,
        chunks = load_report.chunks_submitted,
        table = %config.table,
        "load complete"
    );

    let countries = match &config.countries {
        Some(configured) => configured.clone(),
        None => observed_countries(&canonical),
    };

    let (specs, mut view_failures) = generate_view_specs(&countries);
    let mut views_generated = 0;
    for spec in &specs {
        match client.execute(&render_view_sql(spec, &config.table)) {
            Ok(()) => {
                info!(view = %spec.view_name, country = %spec.country, "view generated");
                views_generated += 1;
            }
            // One bad view must not abort generation for the others.
            Err(err) => view_failures.push(ViewError::ExecutionFailed {
                country: spec.country.clone(),
                message: err.to_string(),
            }),
        }
    }
    for failure in &view_failures {
        error!(%failure, "view generation failed");
    }

    let summary = RunSummary {
        run_id,
        accepted: canonical.len(),
        rejected: rejections.len(),
        loaded: load_report.rows_loaded,
        chunks_submitted: load_report.chunks_submitted,
        views_generated,
        views_failed: view_failures.iter().map(failed_country).collect(),
        invalid_records_file: invalid_records_file.map(|p| p.display().to_string()),
    };
    info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        loaded = summary.loaded,
        views_generated = summary.views_generated,
        views_failed = summary.views_failed.len(),
        "pipeline run complete"
    );

    Ok(summary)
}

/// Record files in the data directory, in deterministic (sorted) order.
fn discover_input_files(config: &PipelineConfig) -> PipelineResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(&config.data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("csv") | Some("txt")
            )
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(PipelineError::NoInputFiles(
            config.data_dir.display().to_string(),
        ));
    }
    Ok(files)
}

/// When a file carries no country column, fall back to the 3-letter
/// country code conventionally prefixed to hospital feed file names.
fn backfill_country(
    records: &mut [crate::models::RawRecord],
    headers: &[String],
    mapper: &ColumnMapper,
    file_name: &str,
) {
    let has_country = headers
        .iter()
        .any(|h| mapper.lookup(h) == Some(CanonicalField::Country));
    if has_country {
        return;
    }

    let code: String = file_name
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if code.len() < 3 {
        return;
    }

    info!(file = %file_name, country = %code, "backfilled country from file name");
    for record in records {
        record.push("Country", code.clone());
    }
}

/// Distinct non-empty country values, in first-seen order.
fn observed_countries(records: &[CanonicalRecord]) -> Vec<String> {
    let mut countries: Vec<String> = Vec::new();
    for record in records {
        if let Some(country) = &record.country {
            if !countries.contains(country) {
                countries.push(country.clone());
            }
        }
    }
    countries
}

fn failed_country(failure: &ViewError) -> String {
    match failure {
        ViewError::EmptyName(country) => country.clone(),
        ViewError::NameCollision { country, .. } => country.clone(),
        ViewError::ExecutionFailed { country, .. } => country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::RecordingClient;
    use std::fs;

    fn write_file(dir: &std::path::Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn config(data_dir: &std::path::Path, invalid_dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: data_dir.to_path_buf(),
            invalid_dir: invalid_dir.to_path_buf(),
            chunk_size: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_run() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "USA.csv",
            "ID,Name,VaccinationDate,Country\n\
             C1,Jane,2024-01-01,US\n\
             C2,Bob,2024-01-02,US\n\
             ,NoId,2024-01-03,US\n\
             C4,Ann,2024-01-04,IND\n",
        );

        let mut client = RecordingClient::new();
        let summary = run(&config(data.path(), invalid.path()), &mut client).unwrap();

        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.loaded, 3);
        // chunk_size 2 → ⌈3/2⌉ chunks.
        assert_eq!(summary.chunks_submitted, 2);
        assert_eq!(summary.views_generated, 2);
        assert!(summary.views_failed.is_empty());
        assert!(summary.invalid_records_file.is_some());

        // Rows arrive in input order, stamped with provenance.
        let rows = client.rows();
        assert_eq!(rows[0].customer_id, "C1");
        assert_eq!(rows[2].customer_id, "C4");
        assert_eq!(rows[0].source_file, "USA.csv");

        // One view per distinct country, replace semantics.
        assert_eq!(client.statements.len(), 2);
        assert!(client.statements[0].starts_with("CREATE OR REPLACE VIEW VIEW_US"));
        assert!(client.statements[1].starts_with("CREATE OR REPLACE VIEW VIEW_IND"));
    }

    #[test]
    fn test_accepted_record_lands_only_in_its_country_view() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "records.csv",
            "ID,Name,VaccinationDate,Country\nC1,Jane,2024-01-01,US\n",
        );

        let mut client = RecordingClient::new();
        let summary = run(&config(data.path(), invalid.path()), &mut client).unwrap();

        assert_eq!(summary.views_generated, 1);
        assert_eq!(client.statements.len(), 1);
        assert!(client.statements[0].contains("WHERE country = 'US'"));
    }

    #[test]
    fn test_pipe_feed_end_to_end() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "hospital.txt",
            "|H|Customer_Name|Customer_Id|Open_Date|Last_Consulted_Date|Vaccination_Id|Dr_Name|State|Country|DOB|Is_Active\n\
             |D|Alex|123457|20101012|20121013|MVD|Paul|SA|USA|06031987|A\n",
        );

        let mut client = RecordingClient::new();
        let summary = run(&config(data.path(), invalid.path()), &mut client).unwrap();

        assert_eq!(summary.accepted, 1);
        let rows = client.rows();
        assert_eq!(rows[0].name, "Alex");
        assert_eq!(rows[0].country.as_deref(), Some("USA"));
        assert_eq!(rows[0].doctor_name.as_deref(), Some("Paul"));
    }

    #[test]
    fn test_country_backfilled_from_file_name() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "AUS_feed.csv",
            "ID,Name,VaccinationDate\nC1,Jane,2024-01-01\n",
        );

        let mut client = RecordingClient::new();
        run(&config(data.path(), invalid.path()), &mut client).unwrap();

        assert_eq!(client.rows()[0].country.as_deref(), Some("AUS"));
        assert!(client.statements[0].contains("VIEW_AUS"));
    }

    #[test]
    fn test_configured_countries_override_observed() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "USA.csv",
            "ID,Name,VaccinationDate,Country\nC1,Jane,2024-01-01,US\n",
        );

        let mut cfg = config(data.path(), invalid.path());
        cfg.countries = Some(vec!["IND".to_string(), "AU".to_string()]);

        let mut client = RecordingClient::new();
        let summary = run(&cfg, &mut client).unwrap();

        assert_eq!(summary.views_generated, 2);
        assert!(client.statements[0].contains("VIEW_IND"));
    }

    #[test]
    fn test_view_failure_isolated_per_country() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "USA.csv",
            "ID,Name,VaccinationDate,Country\nC1,Jane,2024-01-01,US\n",
        );

        let mut cfg = config(data.path(), invalid.path());
        cfg.countries = Some(vec!["  ".to_string(), "US".to_string()]);

        let mut client = RecordingClient::new();
        let summary = run(&cfg, &mut client).unwrap();

        assert_eq!(summary.views_generated, 1);
        assert_eq!(summary.views_failed, vec!["  ".to_string()]);
    }

    #[test]
    fn test_empty_data_dir_is_an_error() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();

        let mut client = RecordingClient::new();
        let err = run(&config(data.path(), invalid.path()), &mut client).unwrap_err();
        assert!(matches!(err, PipelineError::NoInputFiles(_)));
    }

    #[test]
    fn test_clean_run_writes_no_sink_file() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "USA.csv",
            "ID,Name,VaccinationDate,Country\nC1,Jane,2024-01-01,US\n",
        );

        let mut client = RecordingClient::new();
        let summary = run(&config(data.path(), invalid.path()), &mut client).unwrap();
        assert!(summary.invalid_records_file.is_none());
    }

    #[test]
    fn test_rejected_records_reach_the_sink() {
        let data = tempfile::tempdir().unwrap();
        let invalid = tempfile::tempdir().unwrap();
        write_file(
            data.path(),
            "USA.csv",
            "ID,Name,VaccinationDate,Country\n,Jane,2024-01-01,US\n",
        );

        let mut client = RecordingClient::new();
        let summary = run(&config(data.path(), invalid.path()), &mut client).unwrap();

        let sink_file = summary.invalid_records_file.unwrap();
        let content = fs::read_to_string(&sink_file).unwrap();
        assert!(content.contains("customer_id required"));
        assert!(content.contains("Jane"));
    }
}
