//! Error types for the vaxload ETL pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - delimited-file parsing errors
//! - [`MappingError`] - column-mapping configuration errors
//! - [`TransformError`] - transformation defects
//! - [`SinkError`] - invalid-records sink errors
//! - [`LoadError`] - warehouse write errors
//! - [`ViewError`] - per-country view generation errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Delimited-file Parsing Errors
// =============================================================================

/// Errors during delimited-file parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode bytes under the detected encoding.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in input file")]
    NoHeaders,
}

// =============================================================================
// Column Mapping Errors
// =============================================================================

/// Errors in the static column-mapping configuration.
///
/// These are configuration-time invariants, checked eagerly before any
/// record is processed.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A required canonical field has no source column mapped to it.
    #[error("Column mapping does not cover required field: {0}")]
    RequiredFieldUncovered(String),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Transformation defects.
///
/// The transformer only ever sees records the validator accepted, so any
/// failure here is a validator/transformer rule mismatch, not bad input.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required field was absent on a supposedly-accepted record.
    #[error("Accepted record on line {line} is missing required field '{field}'")]
    MissingRequired { line: usize, field: &'static str },

    /// A date value that passed validation failed to coerce.
    #[error("Accepted record on line {line} has unparsable {field} value '{value}'")]
    DateCoercion {
        line: usize,
        field: &'static str,
        value: String,
    },
}

// =============================================================================
// Invalid-records Sink Errors
// =============================================================================

/// Errors writing to the invalid-records side-channel.
#[derive(Debug, Error)]
pub enum SinkError {
    /// IO error creating or writing the sink file.
    #[error("Sink IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("Sink CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Warehouse Load Errors
// =============================================================================

/// Errors from the warehouse client or the chunked loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The warehouse client rejected a write or statement.
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Chunk size must be a positive integer.
    #[error("Invalid chunk size: {0} (must be > 0)")]
    InvalidChunkSize(usize),

    /// A chunk write failed partway through a load.
    #[error("Chunk {failed_chunk} failed after {chunks_ok} chunk(s) ({rows_ok} row(s)) loaded: {source}")]
    ChunkFailed {
        failed_chunk: usize,
        chunks_ok: usize,
        rows_ok: usize,
        #[source]
        source: Box<LoadError>,
    },
}

// =============================================================================
// View Generation Errors
// =============================================================================

/// Per-country view generation errors.
///
/// These are isolated per country and collected; one bad country value
/// never aborts generation for the others.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ViewError {
    /// Country value normalizes to an empty view name.
    #[error("Country value '{0}' produces an empty view name")]
    EmptyName(String),

    /// Two country values normalize to the same view name.
    #[error("Country value '{country}' collides with existing view {view_name}")]
    NameCollision { country: String, view_name: String },

    /// The warehouse rejected the view DDL.
    #[error("Failed to execute view definition for '{country}': {message}")]
    ExecutionFailed { country: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::pipeline::run`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Mapping configuration error.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Transformation defect.
    #[error("Transform defect: {0}")]
    Transform(#[from] TransformError),

    /// Invalid-records sink error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Warehouse load error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No input files found in the data directory.
    #[error("No record files found in {0}")]
    NoInputFiles(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for warehouse load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // TransformError -> PipelineError
        let transform_err = TransformError::MissingRequired {
            line: 3,
            field: "customer_id",
        };
        let pipeline_err: PipelineError = transform_err.into();
        assert!(pipeline_err.to_string().contains("customer_id"));
    }

    #[test]
    fn test_chunk_failed_format() {
        let err = LoadError::ChunkFailed {
            failed_chunk: 2,
            chunks_ok: 2,
            rows_ok: 200,
            source: Box::new(LoadError::Warehouse("connection reset".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("Chunk 2"));
        assert!(msg.contains("200 row(s)"));
    }

    #[test]
    fn test_view_error_format() {
        let err = ViewError::NameCollision {
            country: "U.S.A.".into(),
            view_name: "VIEW_U_S_A".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("U.S.A."));
        assert!(msg.contains("VIEW_U_S_A"));
    }
}
