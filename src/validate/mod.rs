//! Record validation: partition raw records into accepted and rejected.
//!
//! Every record runs through the full list of independent checks and all
//! violations are accumulated, so a rejected record reports everything
//! wrong with it at once. Any violation rejects the whole record; there is
//! no partial, field-level admission.
//!
//! Checks, in reporting order:
//!
//! 1. required fields present and non-empty (customer_id, name, open_date);
//! 2. non-empty date values parse under the accepted formats (unparsable
//!    values are violations, never silent nulls);
//! 3. string fields within their declared maximum length (never silently
//!    truncated - truncation would corrupt identifier/name semantics).
//!
//! customer_id uniqueness is deliberately NOT checked here; that is a
//! warehouse/table constraint, not record shape.

use crate::dates::parse_date;
use crate::mapping::{CanonicalField, ColumnMapper};
use crate::models::{RawRecord, Rejection};

/// Outcome of validating one batch: two disjoint, order-preserving
/// partitions of the input.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Accepted records, unchanged, in input order.
    pub accepted: Vec<RawRecord>,
    /// Rejected records with their ordered violation reasons, in input order.
    pub rejected: Vec<Rejection>,
}

/// Validate an ordered batch of raw records.
pub fn validate_records(records: Vec<RawRecord>, mapper: &ColumnMapper) -> ValidationReport {
    let mut report = ValidationReport::default();

    for record in records {
        let reasons = check_record(&record, mapper);
        if reasons.is_empty() {
            report.accepted.push(record);
        } else {
            report.rejected.push(Rejection { record, reasons });
        }
    }

    report
}

/// Run every check against one record, accumulating violations.
fn check_record(record: &RawRecord, mapper: &ColumnMapper) -> Vec<String> {
    let mut reasons = Vec::new();

    for field in CanonicalField::REQUIRED {
        if mapper.canonical_value(record, field).is_none() {
            reasons.push(format!("{} required", field.column_name()));
        }
    }

    for field in CanonicalField::ALL {
        let Some(value) = mapper.canonical_value(record, field) else {
            continue;
        };

        if field.is_date() {
            if let Err(err) = parse_date(value) {
                reasons.push(format!("{} '{}': {}", field.column_name(), value, err));
            }
        }

        if let Some(max) = field.max_len() {
            let len = value.chars().count();
            if len > max {
                reasons.push(format!(
                    "{} exceeds maximum length {} ({} chars)",
                    field.column_name(),
                    max,
                    len
                ));
            }
        }
    }

    reasons
}
