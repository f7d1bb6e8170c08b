//! # Vaxload - vaccination record validation, loading and view generation
//!
//! Vaxload ingests raw vaccination-record files from hospital feeds around
//! the world, validates and cleanses each record, loads the survivors into
//! a single intermediate warehouse table, and derives one read-optimized
//! view per country.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Record File │────▶│   Parser    │────▶│ Validate +  │────▶│   Chunked   │
//! │ (CSV/pipe)  │     │ (auto-enc)  │     │ Transform   │     │    Load     │
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └──────┬──────┘
//!                                                │ rejected          │
//!                                                ▼                   ▼
//!                                         invalid-records     per-country
//!                                            CSV sink            views
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vaxload::{pipeline, PipelineConfig, ScriptClient};
//!
//! fn main() {
//!     let mut client = ScriptClient::new("scripts/generated");
//!     let summary = pipeline::run(&PipelineConfig::default(), &mut client).unwrap();
//!     println!("Loaded {} records", summary.loaded);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (RawRecord, CanonicalRecord, RunSummary)
//! - [`parser`] - Delimited-file parsing with auto-detection
//! - [`mapping`] - Source-column to canonical-field mapping
//! - [`dates`] - Accepted date formats and the shared parse routine
//! - [`validate`] - Per-record validation and partitioning
//! - [`transform`] - Accepted record → canonical record
//! - [`sink`] - Invalid-records side-channel
//! - [`warehouse`] - Warehouse client trait and chunked loader
//! - [`views`] - Per-country view generation
//! - [`pipeline`] - End-to-end orchestration

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Canonical mapping and shared date handling
pub mod dates;
pub mod mapping;

// Validation and transformation
pub mod transform;
pub mod validate;

// Rejected-record side-channel
pub mod sink;

// Warehouse loading
pub mod warehouse;

// Per-country views
pub mod views;

// Orchestration
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, LoadError, LoadResult, MappingError, PipelineError, PipelineResult,
    SinkError, SinkResult, TransformError, TransformResult, ViewError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CanonicalRecord, RawRecord, Rejection, RunContext, RunSummary};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_content, parse_file,
    ParseResult,
};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{CanonicalField, ColumnMapper, CANONICAL_TABLE};

// =============================================================================
// Re-exports - Validation and Transformation
// =============================================================================

pub use transform::{transform_record, transform_records};
pub use validate::{validate_records, ValidationReport};

// =============================================================================
// Re-exports - Sink
// =============================================================================

pub use sink::InvalidRecordSink;

// =============================================================================
// Re-exports - Warehouse
// =============================================================================

pub use warehouse::{
    load_records, LoadReport, RecordingClient, ScriptClient, WarehouseClient,
};

// =============================================================================
// Re-exports - Views
// =============================================================================

pub use views::{
    generate_view_specs, render_view_sql, view_name, write_view_scripts, ViewSpec,
    STALENESS_WINDOW_DAYS,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{run as run_pipeline, PipelineConfig, DEFAULT_CHUNK_SIZE};
