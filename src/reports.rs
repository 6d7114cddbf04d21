//! Snapshot analytics over leave applications.
//!
//! Every figure is recomputed from the current snapshot on each request;
//! there is no incremental state to drift out of sync with the table.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::model::leave::LeaveStatus;

/// The slice of a leave row the aggregators care about.
#[derive(Debug, Clone)]
pub struct LeaveSnapshot {
    pub requester_id: u64,
    pub requester_name: String,
    pub leave_type: String,
    pub status: LeaveStatus,
    pub applied_on: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq, ToSchema)]
pub struct StatusSummary {
    #[schema(example = 12)]
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    #[schema(example = 25.0)]
    pub pending_pct: f64,
    pub approved_pct: f64,
    pub rejected_pct: f64,
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct MonthlyCount {
    #[schema(example = "2025-06")]
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct TypeCount {
    #[schema(example = "medical")]
    pub leave_type: String,
    pub count: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq, ToSchema)]
pub struct RequesterCount {
    pub requester_id: u64,
    #[schema(example = "Jordan Rivera")]
    pub requester_name: String,
    pub count: u64,
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        // Empty snapshot renders as 0%, not NaN.
        return 0.0;
    }
    (part as f64 / total as f64) * 100.0
}

pub fn status_summary(snapshot: &[LeaveSnapshot]) -> StatusSummary {
    let total = snapshot.len() as u64;
    let count =
        |s: LeaveStatus| snapshot.iter().filter(|l| l.status == s).count() as u64;

    let (pending, approved, rejected) = (
        count(LeaveStatus::Pending),
        count(LeaveStatus::Approved),
        count(LeaveStatus::Rejected),
    );

    StatusSummary {
        total,
        pending,
        approved,
        rejected,
        pending_pct: pct(pending, total),
        approved_pct: pct(approved, total),
        rejected_pct: pct(rejected, total),
    }
}

/// Applications per calendar month of `applied_on`, oldest month first.
pub fn monthly_counts(snapshot: &[LeaveSnapshot]) -> Vec<MonthlyCount> {
    let mut by_month: HashMap<(i32, u32), u64> = HashMap::new();
    for leave in snapshot {
        let key = (leave.applied_on.year(), leave.applied_on.month());
        *by_month.entry(key).or_default() += 1;
    }

    let mut months: Vec<_> = by_month.into_iter().collect();
    months.sort_by_key(|((year, month), _)| (*year, *month));
    months
        .into_iter()
        .map(|((year, month), count)| MonthlyCount {
            month: format!("{year:04}-{month:02}"),
            count,
        })
        .collect()
}

/// Applications per leave_type, largest bucket first, ties by name.
pub fn type_counts(snapshot: &[LeaveSnapshot]) -> Vec<TypeCount> {
    let mut by_type: HashMap<&str, u64> = HashMap::new();
    for leave in snapshot {
        *by_type.entry(leave.leave_type.as_str()).or_default() += 1;
    }

    let mut types: Vec<_> = by_type
        .into_iter()
        .map(|(leave_type, count)| TypeCount {
            leave_type: leave_type.to_owned(),
            count,
        })
        .collect();
    types.sort_by(|a, b| b.count.cmp(&a.count).then(a.leave_type.cmp(&b.leave_type)));
    types
}

/// Top `limit` requesters by application count, ties by requester id.
pub fn top_requesters(snapshot: &[LeaveSnapshot], limit: usize) -> Vec<RequesterCount> {
    let mut by_requester: HashMap<u64, (String, u64)> = HashMap::new();
    for leave in snapshot {
        let entry = by_requester
            .entry(leave.requester_id)
            .or_insert_with(|| (leave.requester_name.clone(), 0));
        entry.1 += 1;
    }

    let mut requesters: Vec<_> = by_requester
        .into_iter()
        .map(|(requester_id, (requester_name, count))| RequesterCount {
            requester_id,
            requester_name,
            count,
        })
        .collect();
    requesters.sort_by(|a, b| b.count.cmp(&a.count).then(a.requester_id.cmp(&b.requester_id)));
    requesters.truncate(limit);
    requesters
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn leave(
        requester_id: u64,
        name: &str,
        leave_type: &str,
        status: LeaveStatus,
        y: i32,
        m: u32,
    ) -> LeaveSnapshot {
        LeaveSnapshot {
            requester_id,
            requester_name: name.to_owned(),
            leave_type: leave_type.to_owned(),
            status,
            applied_on: Utc.with_ymd_and_hms(y, m, 15, 12, 0, 0).unwrap(),
        }
    }

    fn fixture() -> Vec<LeaveSnapshot> {
        vec![
            leave(1, "Asha", "medical", LeaveStatus::Approved, 2025, 5),
            leave(1, "Asha", "medical", LeaveStatus::Pending, 2025, 6),
            leave(1, "Asha", "personal", LeaveStatus::Rejected, 2025, 6),
            leave(2, "Ben", "personal", LeaveStatus::Approved, 2025, 6),
        ]
    }

    #[test]
    fn summary_counts_and_percentages() {
        let summary = status_summary(&fixture());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.approved, 2);
        assert_eq!(summary.rejected, 1);
        assert!((summary.approved_pct - 50.0).abs() < f64::EPSILON);
        assert!((summary.pending_pct - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_yields_zero_percentages() {
        let summary = status_summary(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.approved_pct, 0.0);
        assert_eq!(summary.pending_pct, 0.0);
        assert_eq!(summary.rejected_pct, 0.0);
    }

    #[test]
    fn monthly_counts_sorted_oldest_first() {
        let months = monthly_counts(&fixture());
        assert_eq!(
            months,
            vec![
                MonthlyCount {
                    month: "2025-05".into(),
                    count: 1
                },
                MonthlyCount {
                    month: "2025-06".into(),
                    count: 3
                },
            ]
        );
    }

    #[test]
    fn type_counts_largest_first() {
        let types = type_counts(&fixture());
        assert_eq!(types[0].count, 2);
        assert_eq!(types.len(), 2);
        // Equal counts fall back to name order.
        assert_eq!(types[0].leave_type, "medical");
        assert_eq!(types[1].leave_type, "personal");
    }

    #[test]
    fn top_requesters_truncates_to_limit() {
        let top = top_requesters(&fixture(), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].requester_id, 1);
        assert_eq!(top[0].count, 3);
    }
}
