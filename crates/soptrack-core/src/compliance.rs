//! # Compliance Aggregation
//!
//! A staff member is compliant with an SOP when they have acknowledged the
//! SOP's **current version** inside the [`ComplianceWindow`]. Only active
//! staff are eligible.
//!
//! The persistence layer loads three things: the SOPs, the active roster,
//! and the set of qualifying `(sop_id, staff_id)` pairs. Everything on the
//! dashboard is derived from those by [`ComplianceReport::build`]:
//!
//! ```text
//! rate(sop)      = |{staff : (sop, staff) ∈ pairs}| / |active staff|
//! rate(category) = Σ acknowledged(sop ∈ category) / (|sops ∈ category| · |active staff|)
//! rate(staff)    = |{sop : (sop, staff) ∈ pairs}| / |sops|
//! overall        = |pairs| / (|sops| · |active staff|)
//! ```
//!
//! A zero denominator yields a rate of 0.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::temporal::ComplianceWindow;

/// SOP identity needed for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SopRef {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub current_version: i64,
}

/// Active staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffRef {
    pub id: i64,
    pub name: String,
}

/// `acknowledged / eligible`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComplianceRate {
    pub acknowledged: u64,
    pub eligible: u64,
}

impl ComplianceRate {
    pub fn new(acknowledged: u64, eligible: u64) -> Self {
        Self {
            acknowledged,
            eligible,
        }
    }

    /// Fraction in `[0, 1]`; 0 when nothing is eligible.
    pub fn ratio(&self) -> f64 {
        if self.eligible == 0 {
            0.0
        } else {
            self.acknowledged as f64 / self.eligible as f64
        }
    }

    /// Percentage in `[0, 100]`.
    pub fn percent(&self) -> f64 {
        self.ratio() * 100.0
    }

    /// Whether every eligible acknowledgment is present.
    pub fn is_complete(&self) -> bool {
        self.acknowledged >= self.eligible
    }
}

/// Per-SOP line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct SopCompliance {
    pub sop: SopRef,
    pub rate: ComplianceRate,
    /// Names of active staff without a qualifying acknowledgment, sorted.
    pub missing: Vec<String>,
}

/// Per-category line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCompliance {
    pub category: String,
    pub sop_count: u64,
    pub rate: ComplianceRate,
}

/// Per-staff line of the report.
#[derive(Debug, Clone, Serialize)]
pub struct StaffCompletion {
    pub staff: StaffRef,
    pub rate: ComplianceRate,
}

/// Everything the compliance dashboard shows except recent activity.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub window: ComplianceWindow,
    pub staff_count: u64,
    pub sop_count: u64,
    pub overall: ComplianceRate,
    pub sops: Vec<SopCompliance>,
    pub categories: Vec<CategoryCompliance>,
    pub staff: Vec<StaffCompletion>,
}

impl ComplianceReport {
    /// Aggregate qualifying `(sop_id, staff_id)` pairs.
    ///
    /// Pairs naming an SOP or staff member absent from the inputs (an
    /// inactive person, a deleted document) are ignored. Output order
    /// follows the input order for SOPs and staff, and category name order
    /// for categories.
    pub fn build(
        window: ComplianceWindow,
        sops: Vec<SopRef>,
        staff: Vec<StaffRef>,
        pairs: &HashSet<(i64, i64)>,
    ) -> Self {
        let staff_count = staff.len() as u64;
        let sop_count = sops.len() as u64;

        let mut by_category: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        let mut total_acknowledged = 0u64;

        let sop_lines: Vec<SopCompliance> = sops
            .into_iter()
            .map(|sop| {
                let mut acknowledged = 0u64;
                let mut missing = Vec::new();
                for person in &staff {
                    if pairs.contains(&(sop.id, person.id)) {
                        acknowledged += 1;
                    } else {
                        missing.push(person.name.clone());
                    }
                }
                missing.sort();
                total_acknowledged += acknowledged;
                let entry = by_category.entry(sop.category.clone()).or_default();
                entry.0 += 1;
                entry.1 += acknowledged;
                SopCompliance {
                    rate: ComplianceRate::new(acknowledged, staff_count),
                    sop,
                    missing,
                }
            })
            .collect();

        let categories = by_category
            .into_iter()
            .map(|(category, (count, acknowledged))| CategoryCompliance {
                category,
                sop_count: count,
                rate: ComplianceRate::new(acknowledged, count * staff_count),
            })
            .collect();

        let staff_lines = staff
            .into_iter()
            .map(|person| {
                let acknowledged = sop_lines
                    .iter()
                    .filter(|line| pairs.contains(&(line.sop.id, person.id)))
                    .count() as u64;
                StaffCompletion {
                    rate: ComplianceRate::new(acknowledged, sop_count),
                    staff: person,
                }
            })
            .collect();

        Self {
            window,
            staff_count,
            sop_count,
            overall: ComplianceRate::new(total_acknowledged, sop_count * staff_count),
            sops: sop_lines,
            categories,
            staff: staff_lines,
        }
    }

    /// SOPs with at least one missing acknowledgment.
    pub fn overdue(&self) -> impl Iterator<Item = &SopCompliance> {
        self.sops.iter().filter(|line| !line.missing.is_empty())
    }

    /// Line for one SOP.
    pub fn sop(&self, sop_id: i64) -> Option<&SopCompliance> {
        self.sops.iter().find(|line| line.sop.id == sop_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn window() -> ComplianceWindow {
        ComplianceWindow {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: None,
        }
    }

    fn sop(id: i64, category: &str) -> SopRef {
        SopRef {
            id,
            title: format!("SOP {id}"),
            category: category.to_string(),
            current_version: 1,
        }
    }

    fn person(id: i64, name: &str) -> StaffRef {
        StaffRef {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn rate_with_zero_eligible_is_zero() {
        let r = ComplianceRate::new(0, 0);
        assert_eq!(r.ratio(), 0.0);
        assert_eq!(r.percent(), 0.0);
        assert!(r.is_complete());
    }

    #[test]
    fn per_sop_rate_is_acknowledged_over_eligible() {
        let sops = vec![sop(1, "Safety"), sop(2, "Safety")];
        let staff = vec![person(10, "Ann"), person(11, "Bob"), person(12, "Cy"), person(13, "Di")];
        let pairs: HashSet<_> = [(1, 10), (1, 11), (1, 12), (2, 10)].into_iter().collect();

        let report = ComplianceReport::build(window(), sops, staff, &pairs);

        let first = report.sop(1).unwrap();
        assert_eq!(first.rate, ComplianceRate::new(3, 4));
        assert_eq!(first.rate.percent(), 75.0);
        assert_eq!(first.missing, vec!["Di".to_string()]);

        let second = report.sop(2).unwrap();
        assert_eq!(second.rate.ratio(), 0.25);
        assert_eq!(second.missing, vec!["Bob", "Cy", "Di"]);
    }

    #[test]
    fn overall_category_and_staff_rates() {
        let sops = vec![sop(1, "Safety"), sop(2, "Medication"), sop(3, "Safety")];
        let staff = vec![person(10, "Ann"), person(11, "Bob")];
        let pairs: HashSet<_> = [(1, 10), (1, 11), (2, 10), (3, 11)].into_iter().collect();

        let report = ComplianceReport::build(window(), sops, staff, &pairs);

        assert_eq!(report.sop_count, 3);
        assert_eq!(report.staff_count, 2);
        assert_eq!(report.overall, ComplianceRate::new(4, 6));

        let names: Vec<_> = report.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Medication", "Safety"]);
        let safety = &report.categories[1];
        assert_eq!(safety.sop_count, 2);
        assert_eq!(safety.rate, ComplianceRate::new(3, 4));

        assert_eq!(report.staff[0].rate, ComplianceRate::new(2, 3));
        assert_eq!(report.staff[1].rate, ComplianceRate::new(2, 3));
        assert_eq!(report.overdue().count(), 2);
    }

    #[test]
    fn pairs_for_unknown_staff_are_ignored() {
        let sops = vec![sop(1, "Safety")];
        let staff = vec![person(10, "Ann")];
        // Staff 99 is inactive and therefore absent from the roster input.
        let pairs: HashSet<_> = [(1, 10), (1, 99)].into_iter().collect();

        let report = ComplianceReport::build(window(), sops, staff, &pairs);
        assert_eq!(report.sop(1).unwrap().rate, ComplianceRate::new(1, 1));
        assert_eq!(report.overall, ComplianceRate::new(1, 1));
        assert_eq!(report.overdue().count(), 0);
    }

    #[test]
    fn empty_inputs() {
        let report = ComplianceReport::build(window(), vec![], vec![], &HashSet::new());
        assert_eq!(report.overall.percent(), 0.0);
        assert!(report.sops.is_empty());
        assert!(report.categories.is_empty());
        assert!(report.staff.is_empty());
    }
}
