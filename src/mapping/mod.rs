//! Static column mapping from source headers to canonical warehouse fields.
//!
//! Source files arrive with many spellings for the same field ("ID",
//! "Unique ID", "Customer_Id", ...). This module holds the one fixed lookup
//! table that reshapes them into the canonical schema, plus the canonical
//! field table itself (types, length bounds, nullability).
//!
//! The mapping is configuration, not inference: it never changes at runtime.
//! Unmapped source columns are dropped from downstream processing by policy;
//! callers log them for observability but must not fail the batch.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::MappingError;
use crate::models::RawRecord;

/// Name of the intermediate warehouse table all valid records load into.
pub const CANONICAL_TABLE: &str = "intermediate_vaccination_records";

// =============================================================================
// Canonical Fields
// =============================================================================

/// A field of the canonical warehouse schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    CustomerId,
    Name,
    OpenDate,
    ConsultationDate,
    VaccinationId,
    DoctorName,
    State,
    Country,
    DateOfBirth,
    ActiveFlag,
}

impl CanonicalField {
    /// Every canonical field, in warehouse column order.
    pub const ALL: [CanonicalField; 10] = [
        Self::CustomerId,
        Self::Name,
        Self::OpenDate,
        Self::ConsultationDate,
        Self::VaccinationId,
        Self::DoctorName,
        Self::State,
        Self::Country,
        Self::DateOfBirth,
        Self::ActiveFlag,
    ];

    /// Fields that must be present and non-empty on every record.
    pub const REQUIRED: [CanonicalField; 3] = [Self::CustomerId, Self::Name, Self::OpenDate];

    /// Warehouse column name.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::CustomerId => "customer_id",
            Self::Name => "name",
            Self::OpenDate => "open_date",
            Self::ConsultationDate => "consultation_date",
            Self::VaccinationId => "vaccination_id",
            Self::DoctorName => "doctor_name",
            Self::State => "state",
            Self::Country => "country",
            Self::DateOfBirth => "date_of_birth",
            Self::ActiveFlag => "active_flag",
        }
    }

    /// Declared maximum length for string fields; `None` for date fields.
    pub fn max_len(self) -> Option<usize> {
        match self {
            Self::CustomerId | Self::VaccinationId => Some(50),
            Self::Name | Self::DoctorName => Some(255),
            Self::State | Self::Country => Some(100),
            Self::ActiveFlag => Some(10),
            Self::OpenDate | Self::ConsultationDate | Self::DateOfBirth => None,
        }
    }

    /// Whether the value must parse as a calendar date when present.
    pub fn is_date(self) -> bool {
        matches!(
            self,
            Self::OpenDate | Self::ConsultationDate | Self::DateOfBirth
        )
    }

    /// Whether the field must be present and non-empty.
    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

// =============================================================================
// Source → Canonical Lookup Table
// =============================================================================

/// The fixed source-header → canonical-field table.
///
/// Keys are trimmed source headers as they appear in the known input
/// formats (plain CSV exports and the pipe-delimited hospital feed).
static COLUMN_MAP: Lazy<HashMap<&'static str, CanonicalField>> = Lazy::new(|| {
    use CanonicalField::*;
    HashMap::from([
        // customer id
        ("ID", CustomerId),
        ("Unique ID", CustomerId),
        ("Customer_Id", CustomerId),
        ("Customer Id", CustomerId),
        // name
        ("Name", Name),
        ("Patient Name", Name),
        ("Customer_Name", Name),
        ("Customer Name", Name),
        // open (vaccination) date
        ("VaccinationDate", OpenDate),
        ("Date of Vaccination", OpenDate),
        ("Open_Date", OpenDate),
        ("Open Date", OpenDate),
        // consultation date
        ("Consultation Date", ConsultationDate),
        ("Last Consulted Date", ConsultationDate),
        ("Last_Consulted_Date", ConsultationDate),
        // vaccination id
        ("VaccinationType", VaccinationId),
        ("Vaccine Type", VaccinationId),
        ("Vaccination_Id", VaccinationId),
        // doctor
        ("Doctor Name", DoctorName),
        ("Doctor", DoctorName),
        ("Dr_Name", DoctorName),
        // state
        ("State/Province", State),
        ("State", State),
        // country
        ("Country Name", Country),
        ("Country", Country),
        // date of birth
        ("DOB", DateOfBirth),
        ("Date of Birth", DateOfBirth),
        // active flag
        ("Is_Active", ActiveFlag),
        ("Is Active", ActiveFlag),
        ("Active", ActiveFlag),
    ])
});

// =============================================================================
// Column Mapper
// =============================================================================

/// Pure lookup from source field identifiers to canonical field names.
///
/// Stateless; construct once per run via [`ColumnMapper::new`], which also
/// checks the configuration-time invariant that every required canonical
/// field has at least one source spelling.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMapper;

impl ColumnMapper {
    /// Build the mapper, verifying required-field coverage eagerly.
    ///
    /// If a required canonical field had no source mapping, validation would
    /// reject every record at runtime; that is a configuration defect, so it
    /// is surfaced here instead.
    pub fn new() -> Result<Self, MappingError> {
        for field in CanonicalField::REQUIRED {
            if !COLUMN_MAP.values().any(|&f| f == field) {
                return Err(MappingError::RequiredFieldUncovered(
                    field.column_name().to_string(),
                ));
            }
        }
        Ok(Self)
    }

    /// Canonical field for a source header, or `None` if unmapped.
    pub fn lookup(&self, source: &str) -> Option<CanonicalField> {
        COLUMN_MAP.get(source.trim()).copied()
    }

    /// First non-empty raw value for a canonical field.
    ///
    /// When several source columns map to the same canonical field (e.g.
    /// "DOB" and "Date of Birth"), the first one carrying a value wins,
    /// in source column order.
    pub fn canonical_value<'a>(
        &self,
        record: &'a RawRecord,
        field: CanonicalField,
    ) -> Option<&'a str> {
        record
            .fields
            .iter()
            .filter(|(name, _)| self.lookup(name) == Some(field))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Source field names in `record` that have no canonical mapping.
    ///
    /// These are dropped from downstream processing; the pipeline logs them
    /// so the drop is observable.
    pub fn unmapped<'a>(&self, record: &'a RawRecord) -> Vec<&'a str> {
        record
            .field_names()
            .filter(|name| self.lookup(name).is_none())
            .collect()
    }
}
