use serde::Serialize;
use utoipa::ToSchema;

/// Accumulated result of a batch of independent transitions.
///
/// The batch is not atomic: items that already succeeded stay applied
/// when a later item fails, so `count` is the authoritative number of
/// rows actually transitioned.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    applied: u64,
    failures: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkReport {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = 3)]
    pub count: u64,
    #[schema(example = json!(null), value_type = Option<String>)]
    pub error: Option<String>,
}

impl BulkOutcome {
    pub fn record_success(&mut self) {
        self.applied += 1;
    }

    pub fn record_failure(&mut self, leave_id: u64, reason: impl std::fmt::Display) {
        self.failures.push(format!("leave {leave_id}: {reason}"));
    }

    pub fn into_report(self) -> BulkReport {
        let error = if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.join("; "))
        };
        BulkReport {
            success: self.applied > 0,
            count: self.applied,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_successes() {
        let mut outcome = BulkOutcome::default();
        for _ in 0..3 {
            outcome.record_success();
        }
        let report = outcome.into_report();
        assert!(report.success);
        assert_eq!(report.count, 3);
        assert!(report.error.is_none());
    }

    #[test]
    fn partial_failure_still_counts_successes() {
        let mut outcome = BulkOutcome::default();
        outcome.record_success();
        outcome.record_failure(9, "leave is already approved");
        outcome.record_success();

        let report = outcome.into_report();
        assert!(report.success);
        assert_eq!(report.count, 2);
        assert_eq!(
            report.error.as_deref(),
            Some("leave 9: leave is already approved")
        );
    }

    #[test]
    fn total_failure_is_not_success() {
        let mut outcome = BulkOutcome::default();
        outcome.record_failure(1, "not found");
        outcome.record_failure(2, "not found");

        let report = outcome.into_report();
        assert!(!report.success);
        assert_eq!(report.count, 0);
        assert_eq!(
            report.error.as_deref(),
            Some("leave 1: not found; leave 2: not found")
        );
    }

    #[test]
    fn empty_batch_reports_no_success() {
        let report = BulkOutcome::default().into_report();
        assert!(!report.success);
        assert_eq!(report.count, 0);
        assert!(report.error.is_none());
    }
}
