//! Warehouse client capability and the chunked loader.
//!
//! The core never manages connections, credentials or retries; it talks to
//! an abstract [`WarehouseClient`] with two operations: `execute` for SQL
//! statements and `write_rows` for bulk row writes. The loader owns the
//! chunking: it splits an ordered batch into consecutive chunks of at most
//! the configured size and submits them in order, one write per chunk,
//! each completed before the next is sent. That bounds peak write memory
//! to one chunk and keeps submission order equal to input order.
//!
//! Chunked writes are NOT transactional: a failure partway through leaves
//! the earlier chunks loaded. The loader does not retry; it reports
//! exactly how far it got so the caller can plan a resume.
//!
//! Two implementations ship with the crate:
//!
//! - [`ScriptClient`] renders every operation to numbered SQL files on
//!   disk, so the binary produces reviewable artifacts without a live
//!   warehouse connection;
//! - [`RecordingClient`] keeps everything in memory, for tests and for
//!   callers that drive a real connection themselves.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{LoadError, LoadResult};
use crate::mapping::CanonicalField;
use crate::models::CanonicalRecord;

// =============================================================================
// Client Capability
// =============================================================================

/// The warehouse capability consumed by the pipeline.
pub trait WarehouseClient {
    /// Execute one SQL statement (DDL or otherwise).
    fn execute(&mut self, sql: &str) -> LoadResult<()>;

    /// Persist one ordered chunk of canonical rows into `table`.
    fn write_rows(&mut self, table: &str, rows: &[CanonicalRecord]) -> LoadResult<()>;
}

// =============================================================================
// Chunked Loader
// =============================================================================

/// Outcome of a fully successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Chunks submitted (all succeeded).
    pub chunks_submitted: usize,
    /// Rows persisted; equals the input length.
    pub rows_loaded: usize,
}

/// Stream `records` to the warehouse in bounded-size chunks.
///
/// Issues ⌈N/K⌉ writes for N records and chunk size K, each at most K
/// records, whose concatenation in order reproduces the input exactly.
/// Chunk boundaries never split a record. On a chunk failure the error
/// carries the number of chunks and rows already persisted.
pub fn load_records(
    client: &mut dyn WarehouseClient,
    table: &str,
    records: &[CanonicalRecord],
    chunk_size: usize,
) -> LoadResult<LoadReport> {
    if chunk_size == 0 {
        return Err(LoadError::InvalidChunkSize(chunk_size));
    }

    let mut chunks_ok = 0;
    let mut rows_ok = 0;

    for (index, chunk) in records.chunks(chunk_size).enumerate() {
        if let Err(err) = client.write_rows(table, chunk) {
            return Err(LoadError::ChunkFailed {
                failed_chunk: index,
                chunks_ok,
                rows_ok,
                source: Box::new(err),
            });
        }
        chunks_ok += 1;
        rows_ok += chunk.len();
        info!(chunk = index, rows = chunk.len(), table, "wrote chunk");
    }

    Ok(LoadReport {
        chunks_submitted: chunks_ok,
        rows_loaded: rows_ok,
    })
}

// =============================================================================
// SQL Rendering
// =============================================================================

/// Render a chunk of canonical rows as one multi-row INSERT statement.
pub fn render_insert(table: &str, rows: &[CanonicalRecord]) -> String {
    let columns: Vec<&str> = CanonicalField::ALL
        .iter()
        .map(|f| f.column_name())
        .chain(["load_timestamp", "source_file"])
        .collect();

    let mut sql = format!("INSERT INTO {} ({})\nVALUES\n", table, columns.join(", "));
    let values: Vec<String> = rows.iter().map(render_row).collect();
    sql.push_str(&values.join(",\n"));
    sql.push(';');
    sql
}

fn render_row(record: &CanonicalRecord) -> String {
    let cells = [
        quote(&record.customer_id),
        quote(&record.name),
        quote(&record.open_date.to_string()),
        opt_date(&record.consultation_date),
        opt_str(&record.vaccination_id),
        opt_str(&record.doctor_name),
        opt_str(&record.state),
        opt_str(&record.country),
        opt_date(&record.date_of_birth),
        opt_str(&record.active_flag),
        quote(&record.load_timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
        quote(&record.source_file),
    ];
    format!("    ({})", cells.join(", "))
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn opt_str(value: &Option<String>) -> String {
    match value {
        Some(v) => quote(v),
        None => "NULL".to_string(),
    }
}

fn opt_date(value: &Option<chrono::NaiveDate>) -> String {
    match value {
        Some(d) => quote(&d.to_string()),
        None => "NULL".to_string(),
    }
}

// =============================================================================
// Script Client
// =============================================================================

/// Client that renders every operation to numbered SQL files.
///
/// Files carry a zero-padded sequence prefix so a lexical sort reproduces
/// submission order, the same convention the generated view scripts use.
#[derive(Debug)]
pub struct ScriptClient {
    dir: PathBuf,
    seq: usize,
}

impl ScriptClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_script(&mut self, kind: &str, sql: &str) -> LoadResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| LoadError::Warehouse(e.to_string()))?;
        let path = self.dir.join(format!("{:04}_{}.sql", self.seq, kind));
        std::fs::write(&path, sql).map_err(|e| LoadError::Warehouse(e.to_string()))?;
        self.seq += 1;
        Ok(())
    }
}

impl WarehouseClient for ScriptClient {
    fn execute(&mut self, sql: &str) -> LoadResult<()> {
        self.write_script("statement", sql)
    }

    fn write_rows(&mut self, table: &str, rows: &[CanonicalRecord]) -> LoadResult<()> {
        self.write_script("insert", &render_insert(table, rows))
    }
}

// =============================================================================
// Recording Client
// =============================================================================

/// In-memory client recording every operation, preserving order.
#[derive(Debug, Default)]
pub struct RecordingClient {
    /// SQL statements passed to `execute`, in order.
    pub statements: Vec<String>,
    /// Chunks passed to `write_rows`, in order.
    pub chunks: Vec<Vec<CanonicalRecord>>,
    /// When set, `write_rows` fails once it has accepted this many chunks.
    pub fail_after_chunks: Option<usize>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// All written rows, concatenated in submission order.
    pub fn rows(&self) -> Vec<&CanonicalRecord> {
        self.chunks.iter().flatten().collect()
    }
}

impl WarehouseClient for RecordingClient {
    fn execute(&mut self, sql: &str) -> LoadResult<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }

    fn write_rows(&mut self, _table: &str, rows: &[CanonicalRecord]) -> LoadResult<()> {
        if let Some(limit) = self.fail_after_chunks {
            if self.chunks.len() >= limit {
                return Err(LoadError::Warehouse("simulated write failure".into()));
            }
        }
        self.chunks.push(rows.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn record(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            customer_id: id.into(),
            name: "Jane".into(),
            open_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            consultation_date: None,
            vaccination_id: None,
            doctor_name: None,
            state: None,
            country: Some("US".into()),
            date_of_birth: None,
            active_flag: None,
            load_timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            source_file: "USA.csv".into(),
        }
    }

    fn batch(n: usize) -> Vec<CanonicalRecord> {
        (0..n).map(|i| record(&format!("C{}", i))).collect()
    }

    #[test]
    fn test_chunk_count_and_sizes() {
        let mut client = RecordingClient::new();
        let records = batch(10);

        let report = load_records(&mut client, "t", &records, 4).unwrap();

        // ⌈10/4⌉ = 3 chunks of sizes 4, 4, 2.
        assert_eq!(report.chunks_submitted, 3);
        assert_eq!(report.rows_loaded, 10);
        assert_eq!(client.chunks.len(), 3);
        assert_eq!(client.chunks[0].len(), 4);
        assert_eq!(client.chunks[2].len(), 2);
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let mut client = RecordingClient::new();
        let records = batch(7);

        load_records(&mut client, "t", &records, 3).unwrap();

        let written: Vec<_> = client.rows().into_iter().cloned().collect();
        assert_eq!(written, records);
    }

    #[test]
    fn test_exact_multiple_of_chunk_size() {
        let mut client = RecordingClient::new();
        let report = load_records(&mut client, "t", &batch(6), 3).unwrap();
        assert_eq!(report.chunks_submitted, 2);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let mut client = RecordingClient::new();
        let report = load_records(&mut client, "t", &[], 100).unwrap();
        assert_eq!(report.chunks_submitted, 0);
        assert_eq!(report.rows_loaded, 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut client = RecordingClient::new();
        let err = load_records(&mut client, "t", &batch(1), 0).unwrap_err();
        assert!(matches!(err, LoadError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_partial_failure_reports_progress() {
        let mut client = RecordingClient::new();
        client.fail_after_chunks = Some(2);

        let err = load_records(&mut client, "t", &batch(10), 4).unwrap_err();

        match err {
            LoadError::ChunkFailed {
                failed_chunk,
                chunks_ok,
                rows_ok,
                ..
            } => {
                assert_eq!(failed_chunk, 2);
                assert_eq!(chunks_ok, 2);
                assert_eq!(rows_ok, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The two earlier chunks stay loaded (non-transactional).
        assert_eq!(client.rows().len(), 8);
    }

    #[test]
    fn test_render_insert_literals() {
        let mut r = record("C1");
        r.name = "O'Brien".into();
        let sql = render_insert("intermediate_vaccination_records", &[r]);

        assert!(sql.starts_with("INSERT INTO intermediate_vaccination_records (customer_id, name, open_date"));
        assert!(sql.contains("'O''Brien'"));
        assert!(sql.contains("'2024-01-01'"));
        assert!(sql.contains("NULL"));
        assert!(sql.contains("'2024-06-01 08:30:00'"));
        assert!(sql.trim_end().ends_with(';'));
    }

    #[test]
    fn test_script_client_numbered_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut client = ScriptClient::new(tmp.path());

        client.write_rows("t", &batch(2)).unwrap();
        client.execute("CREATE OR REPLACE VIEW v AS SELECT 1;").unwrap();

        let mut names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0000_insert.sql", "0001_statement.sql"]);
    }
}
