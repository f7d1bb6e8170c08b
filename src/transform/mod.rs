//! Shape accepted raw records into canonical warehouse records.
//!
//! The transformer runs strictly after validation: it only ever sees
//! records the validator accepted, so every coercion here must succeed.
//! A failure is a validator/transformer rule mismatch - a defect, raised
//! loudly as [`TransformError`], never routed to the invalid-records sink.
//!
//! Given the same record and the same [`RunContext`] the output is
//! identical: `load_timestamp` comes from the run's start time, not from
//! a per-record clock read.

use chrono::NaiveDate;

use crate::dates::parse_date;
use crate::error::{TransformError, TransformResult};
use crate::mapping::{CanonicalField, ColumnMapper};
use crate::models::{CanonicalRecord, RawRecord, RunContext};

/// Transform one accepted record into exactly one canonical record.
pub fn transform_record(
    record: &RawRecord,
    mapper: &ColumnMapper,
    ctx: &RunContext,
) -> TransformResult<CanonicalRecord> {
    Ok(CanonicalRecord {
        customer_id: required_string(record, mapper, CanonicalField::CustomerId)?,
        name: required_string(record, mapper, CanonicalField::Name)?,
        open_date: required_date(record, mapper, CanonicalField::OpenDate)?,
        consultation_date: optional_date(record, mapper, CanonicalField::ConsultationDate)?,
        vaccination_id: optional_string(record, mapper, CanonicalField::VaccinationId),
        doctor_name: optional_string(record, mapper, CanonicalField::DoctorName),
        state: optional_string(record, mapper, CanonicalField::State),
        country: optional_string(record, mapper, CanonicalField::Country),
        date_of_birth: optional_date(record, mapper, CanonicalField::DateOfBirth)?,
        active_flag: optional_string(record, mapper, CanonicalField::ActiveFlag),
        load_timestamp: ctx.started_at,
        source_file: ctx.source_file.clone(),
    })
}

/// Transform a batch of accepted records under one fixed context.
pub fn transform_records(
    records: &[RawRecord],
    mapper: &ColumnMapper,
    ctx: &RunContext,
) -> TransformResult<Vec<CanonicalRecord>> {
    records
        .iter()
        .map(|record| transform_record(record, mapper, ctx))
        .collect()
}

fn required_string(
    record: &RawRecord,
    mapper: &ColumnMapper,
    field: CanonicalField,
) -> TransformResult<String> {
    mapper
        .canonical_value(record, field)
        .map(str::to_string)
        .ok_or(TransformError::MissingRequired {
            line: record.line,
            field: field.column_name(),
        })
}

fn required_date(
    record: &RawRecord,
    mapper: &ColumnMapper,
    field: CanonicalField,
) -> TransformResult<NaiveDate> {
    let value = mapper
        .canonical_value(record, field)
        .ok_or(TransformError::MissingRequired {
            line: record.line,
            field: field.column_name(),
        })?;
    coerce_date(record, field, value)
}

/// Absent optional fields become `None`, never empty strings.
fn optional_string(
    record: &RawRecord,
    mapper: &ColumnMapper,
    field: CanonicalField,
) -> Option<String> {
    mapper.canonical_value(record, field).map(str::to_string)
}

fn optional_date(
    record: &RawRecord,
    mapper: &ColumnMapper,
    field: CanonicalField,
) -> TransformResult<Option<NaiveDate>> {
    match mapper.canonical_value(record, field) {
        Some(value) => coerce_date(record, field, value).map(Some),
        None => Ok(None),
    }
}

fn coerce_date(
    record: &RawRecord,
    field: CanonicalField,
    value: &str,
) -> TransformResult<NaiveDate> {
    parse_date(value).map_err(|_| TransformError::DateCoercion {
        line: record.line,
        field: field.column_name(),
        value: value.to_string(),
    })
}
