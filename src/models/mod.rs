//! Domain models for the vaxload ETL pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RawRecord`] - one parsed source row, field order preserved
//! - [`CanonicalRecord`] - the warehouse-shaped record
//! - [`Rejection`] - a rejected record with its violation reasons
//! - [`RunContext`] - fixed per-run context (run start time, source file)
//! - [`RunSummary`] - run completion summary

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Raw Record
// =============================================================================

/// A single row from a source file, before mapping or validation.
///
/// Fields are kept in source order so rejected records can be written back
/// out exactly as they arrived. Values are untyped strings; an absent cell
/// is simply not present in `fields`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    /// (source field name, raw value) pairs in source order.
    pub fields: Vec<(String, String)>,
    /// 1-based line number in the source file.
    pub line: usize,
}

impl RawRecord {
    pub fn new(line: usize) -> Self {
        Self {
            fields: Vec::new(),
            line,
        }
    }

    /// Look up a raw value by source field name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Source field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }
}

// =============================================================================
// Canonical Record
// =============================================================================

/// The warehouse-shaped record all valid rows conform to.
///
/// `customer_id`, `name` and `open_date` are always present and non-empty;
/// every string field respects its declared maximum length; absent optional
/// fields are `None`, never empty strings, to preserve the warehouse's null
/// semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalRecord {
    pub customer_id: String,
    pub name: String,
    pub open_date: NaiveDate,
    pub consultation_date: Option<NaiveDate>,
    pub vaccination_id: Option<String>,
    pub doctor_name: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub active_flag: Option<String>,
    /// Stamped with the pipeline run's start time, stable across the run.
    pub load_timestamp: DateTime<Utc>,
    /// Identifier of the originating input file.
    pub source_file: String,
}

// =============================================================================
// Rejection
// =============================================================================

/// A record the validator refused, paired with everything wrong with it.
///
/// Rejections are immutable once produced and are never retried
/// automatically; they flow to the invalid-records sink for human review.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rejection {
    /// The original record, untouched, to support manual correction.
    pub record: RawRecord,
    /// Ordered, human-readable violation reasons. Never empty.
    pub reasons: Vec<String>,
}

// =============================================================================
// Run Context
// =============================================================================

/// Fixed context for one input file within a pipeline run.
///
/// The transformer is pure given the same input and the same context:
/// `started_at` is evaluated once per run, not per record.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Pipeline run start time; becomes every record's `load_timestamp`.
    pub started_at: DateTime<Utc>,
    /// Originating input identifier; becomes every record's `source_file`.
    pub source_file: String,
}

impl RunContext {
    pub fn new(started_at: DateTime<Utc>, source_file: impl Into<String>) -> Self {
        Self {
            started_at,
            source_file: source_file.into(),
        }
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// Completion summary for one pipeline run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunSummary {
    /// Unique id for this run.
    pub run_id: String,
    /// Records the validator accepted.
    pub accepted: usize,
    /// Records the validator rejected.
    pub rejected: usize,
    /// Rows actually persisted to the warehouse.
    pub loaded: usize,
    /// Chunks submitted to the warehouse client.
    pub chunks_submitted: usize,
    /// Views generated successfully.
    pub views_generated: usize,
    /// Views that failed, with their country values.
    pub views_failed: Vec<String>,
    /// Where the rejected records were written, if any were.
    pub invalid_records_file: Option<String>,
}
