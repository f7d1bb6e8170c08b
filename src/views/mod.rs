//! Per-country view generation over the canonical table.
//!
//! Fan-out is a pure function from a set of country values to view
//! specifications; SQL text generation is a separate step so the two can
//! be tested independently. Each view scopes the canonical table to one
//! country and adds two computed columns:
//!
//! - `age`: years from date_of_birth to the current date (null when
//!   date_of_birth is null);
//! - `is_stale`: true when consultation_date is absent OR more than 30
//!   days old. Exactly 30 days old is NOT stale.
//!
//! The view also keeps only the most recent row per customer (ranked by
//! consultation_date descending). Definitions use CREATE OR REPLACE, so
//! regeneration is idempotent: rerunning overwrites rather than erroring
//! on "already exists". A malformed country value fails alone; the other
//! countries still generate.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ViewError;

/// Freshness window: consultations older than this many days are stale.
pub const STALENESS_WINDOW_DAYS: i64 = 30;

/// Specification of one country-scoped view, before SQL rendering.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ViewSpec {
    /// The country value as observed in the data.
    pub country: String,
    /// Deterministic view name derived from the country value.
    pub view_name: String,
}

/// Derive the view name for a country value.
///
/// Normalization: trim, uppercase, every non-alphanumeric run becomes a
/// single underscore, with a fixed `VIEW_` prefix. The convention must be
/// injective over realistic country sets; [`generate_view_specs`] guards
/// the remaining collision cases explicitly.
pub fn view_name(country: &str) -> Result<String, ViewError> {
    let mut normalized = String::new();
    for c in country.trim().to_uppercase().chars() {
        if c.is_ascii_alphanumeric() {
            normalized.push(c);
        } else if !normalized.is_empty() && !normalized.ends_with('_') {
            normalized.push('_');
        }
    }
    let normalized = normalized.trim_end_matches('_');

    if normalized.is_empty() {
        return Err(ViewError::EmptyName(country.to_string()));
    }
    Ok(format!("VIEW_{}", normalized))
}

/// Fan a set of country values out into view specifications.
///
/// Pure: no SQL, no side effects. Exact duplicate country values collapse
/// into one spec; a country whose name normalizes to nothing, or collides
/// with an earlier country's view name, becomes a per-country failure
/// without affecting the rest.
pub fn generate_view_specs(countries: &[String]) -> (Vec<ViewSpec>, Vec<ViewError>) {
    let mut specs: Vec<ViewSpec> = Vec::new();
    let mut failures = Vec::new();

    for country in countries {
        if specs.iter().any(|s| &s.country == country) {
            continue;
        }

        match view_name(country) {
            Ok(name) => {
                if let Some(existing) = specs.iter().find(|s| s.view_name == name) {
                    failures.push(ViewError::NameCollision {
                        country: country.clone(),
                        view_name: existing.view_name.clone(),
                    });
                } else {
                    specs.push(ViewSpec {
                        country: country.clone(),
                        view_name: name,
                    });
                }
            }
            Err(err) => failures.push(err),
        }
    }

    (specs, failures)
}

/// Render the CREATE OR REPLACE definition for one view spec.
pub fn render_view_sql(spec: &ViewSpec, table: &str) -> String {
    let country_literal = spec.country.replace('\'', "''");
    format!(
        "\
CREATE OR REPLACE VIEW {view} AS
WITH ranked_customers AS (
    SELECT
        customer_id,
        name,
        open_date,
        consultation_date,
        vaccination_id,
        doctor_name,
        state,
        country,
        date_of_birth,
        active_flag,
        load_timestamp,
        source_file,
        DATEDIFF(YEAR, date_of_birth, CURRENT_DATE) AS age,
        CASE
            WHEN consultation_date IS NULL
              OR DATEDIFF(DAY, consultation_date, CURRENT_DATE) > {window}
            THEN TRUE
            ELSE FALSE
        END AS is_stale,
        ROW_NUMBER() OVER (
            PARTITION BY customer_id
            ORDER BY consultation_date DESC
        ) AS row_num
    FROM {table}
    WHERE country = '{country}'
)
SELECT
    customer_id,
    name,
    open_date,
    consultation_date,
    vaccination_id,
    doctor_name,
    state,
    country,
    date_of_birth,
    active_flag,
    load_timestamp,
    source_file,
    age,
    is_stale
FROM ranked_customers
WHERE row_num = 1;
",
        view = spec.view_name,
        window = STALENESS_WINDOW_DAYS,
        table = table,
        country = country_literal,
    )
}

/// Write one `.sql` file per spec into `dir`, named after the view.
///
/// Returns the written paths in deterministic (sorted) order, the order
/// they should be executed in.
pub fn write_view_scripts(
    specs: &[ViewSpec],
    table: &str,
    dir: impl AsRef<Path>,
) -> std::io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::new();
    for spec in specs {
        let path = dir.join(format!("{}.sql", spec.view_name));
        std::fs::write(&path, render_view_sql(spec, table))?;
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CANONICAL_TABLE;

    fn countries(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_view_name_normalization() {
        assert_eq!(view_name("US").unwrap(), "VIEW_US");
        assert_eq!(view_name("New Zealand").unwrap(), "VIEW_NEW_ZEALAND");
        assert_eq!(view_name("  india ").unwrap(), "VIEW_INDIA");
        assert_eq!(view_name("Côte d'Ivoire").unwrap(), "VIEW_C_TE_D_IVOIRE");
    }

    #[test]
    fn test_view_name_deterministic() {
        assert_eq!(view_name("UK").unwrap(), view_name("UK").unwrap());
    }

    #[test]
    fn test_malformed_country_fails_alone() {
        let (specs, failures) = generate_view_specs(&countries(&["US", "  ", "IND"]));

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].view_name, "VIEW_US");
        assert_eq!(specs[1].view_name, "VIEW_IND");
        assert_eq!(failures, vec![ViewError::EmptyName("  ".to_string())]);
    }

    #[test]
    fn test_one_spec_per_distinct_country() {
        let (specs, failures) = generate_view_specs(&countries(&["US", "US", "IND"]));
        assert_eq!(specs.len(), 2);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_name_collision_guarded() {
        // Different values, same normalized name.
        let (specs, failures) = generate_view_specs(&countries(&["U.S.A", "U S A"]));

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].country, "U.S.A");
        assert_eq!(
            failures,
            vec![ViewError::NameCollision {
                country: "U S A".to_string(),
                view_name: "VIEW_U_S_A".to_string(),
            }]
        );
    }

    #[test]
    fn test_rendered_sql_shape() {
        let spec = ViewSpec {
            country: "US".into(),
            view_name: "VIEW_US".into(),
        };
        let sql = render_view_sql(&spec, CANONICAL_TABLE);

        // Replace semantics: regenerating overwrites, never duplicates.
        assert!(sql.starts_with("CREATE OR REPLACE VIEW VIEW_US AS"));
        assert!(sql.contains("FROM intermediate_vaccination_records"));
        assert!(sql.contains("WHERE country = 'US'"));
        assert!(sql.contains("DATEDIFF(YEAR, date_of_birth, CURRENT_DATE) AS age"));
        // Strictly greater than 30: a 30-day-old consultation is fresh.
        assert!(sql.contains("DATEDIFF(DAY, consultation_date, CURRENT_DATE) > 30"));
        assert!(sql.contains("consultation_date IS NULL"));
        assert!(sql.contains("WHERE row_num = 1"));
    }

    #[test]
    fn test_country_literal_escaped() {
        let spec = ViewSpec {
            country: "Côte d'Ivoire".into(),
            view_name: view_name("Côte d'Ivoire").unwrap(),
        };
        let sql = render_view_sql(&spec, CANONICAL_TABLE);
        assert!(sql.contains("WHERE country = 'Côte d''Ivoire'"));
    }

    #[test]
    fn test_written_scripts_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let (specs, _) = generate_view_specs(&countries(&["US", "IND", "AU"]));

        let paths = write_view_scripts(&specs, CANONICAL_TABLE, tmp.path()).unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["VIEW_AU.sql", "VIEW_IND.sql", "VIEW_US.sql"]);

        let content = std::fs::read_to_string(&paths[2]).unwrap();
        assert!(content.contains("CREATE OR REPLACE VIEW VIEW_US"));
    }
}
