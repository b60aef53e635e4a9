//! # Staff Roster CSV
//!
//! Parses a roster export into validated [`StaffDraft`]s. The file needs a
//! header row with a `name` column (any case). Optional columns:
//! `staff_type` (or `type`), `job_title` (or `role`, `title`),
//! `department`, `supervisor`, `hire_date`.
//!
//! Bad rows never abort the import: each is reported in
//! [`RosterParse::skipped`] with its line number and the reason.

use std::io::Read;

use crate::error::{CoreError, ValidationError};
use crate::validation::{StaffDraft, StaffInput};

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the file.
    pub line: u64,
    pub reason: String,
}

/// Outcome of parsing a roster file.
#[derive(Debug, Default)]
pub struct RosterParse {
    pub entries: Vec<StaffDraft>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default)]
struct Columns {
    name: usize,
    staff_type: Option<usize>,
    job_title: Option<usize>,
    department: Option<usize>,
    supervisor: Option<usize>,
    hire_date: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, CoreError> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |names: &[&str]| {
            normalized
                .iter()
                .position(|h| names.iter().any(|n| h == n))
        };
        let name = find(&["name", "staff name", "full name"]).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "Roster",
                reason: "missing a name column".to_string(),
            }
        })?;
        Ok(Self {
            name,
            staff_type: find(&["staff_type", "type"]),
            job_title: find(&["job_title", "role", "title"]),
            department: find(&["department"]),
            supervisor: find(&["supervisor"]),
            hire_date: find(&["hire_date"]),
        })
    }

    fn input(&self, record: &csv::StringRecord) -> StaffInput {
        let get = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);
        StaffInput {
            name: record.get(self.name).unwrap_or_default().to_string(),
            staff_type: get(self.staff_type),
            job_title: get(self.job_title),
            department: get(self.department),
            supervisor: get(self.supervisor),
            hire_date: get(self.hire_date),
        }
    }
}

/// Parse a roster CSV.
///
/// Fails only when the header row is unreadable or has no name column.
pub fn parse_roster<R: Read>(reader: R) -> Result<RosterParse, CoreError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::from_headers(csv.headers()?)?;

    let mut out = RosterParse::default();
    for (index, result) in csv.records().enumerate() {
        // Header is line 1.
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                out.skipped.push(SkippedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, |p| p.line());
        if record.iter().all(str::is_empty) {
            continue;
        }
        match columns.input(&record).validate() {
            Ok(draft) => out.entries.push(draft),
            Err(e) => out.skipped.push(SkippedRow {
                line,
                reason: e.to_string(),
            }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_column_any_case() {
        let csv = "Name\nJane Doe\n  John  Smith \n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        let names: Vec<_> = parsed.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Doe", "John Smith"]);
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn optional_columns_are_read() {
        let csv = "name,role,department,hire_date\nAda,RN,Nursing,2023-09-01\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        let ada = &parsed.entries[0];
        assert_eq!(ada.job_title.as_deref(), Some("RN"));
        assert_eq!(ada.department.as_deref(), Some("Nursing"));
        assert_eq!(ada.hire_date.unwrap().to_string(), "2023-09-01");
    }

    #[test]
    fn blank_names_are_skipped_with_line_numbers() {
        let csv = "name,department\nAda,Nursing\n,Kitchen\nBo,Kitchen\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 3);
        assert!(parsed.skipped[0].reason.contains("empty"));
    }

    #[test]
    fn invalid_hire_date_skips_row() {
        let csv = "name,hire_date\nAda,tomorrow\nBo,2024-01-02\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].name, "Bo");
        assert_eq!(parsed.skipped[0].line, 2);
    }

    #[test]
    fn byte_order_mark_in_header() {
        let csv = "\u{feff}name\nAda\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let csv = "email\nada@example.org\n";
        assert!(parse_roster(csv.as_bytes()).is_err());
    }

    #[test]
    fn fully_empty_lines_are_ignored() {
        let csv = "name,department\nAda,Nursing\n,\n";
        let parsed = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.skipped.is_empty());
    }
}
