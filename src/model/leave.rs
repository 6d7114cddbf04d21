use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Status domain for a leave application. Nothing else is representable:
/// rows are read back through this enum, so an unexpected database value
/// fails the fetch instead of leaking into the workflow.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }

    /// True once the application has left `pending`.
    pub fn is_decided(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub requester_id: u64,
    #[schema(example = "Jordan Rivera")]
    pub requester_name: String,
    #[schema(example = "medical")]
    pub leave_type: String,
    #[schema(example = "Scheduled surgery")]
    pub reason: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub is_emergency: bool,
    #[schema(value_type = Option<String>)]
    pub attachment_url: Option<String>,
    #[schema(example = "pending", value_type = String)]
    pub status: String,
    pub reviewer_id: Option<u64>,
    pub reviewer_comments: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub applied_on: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub status_decided_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
    pub overridden_by_admin: bool,
    #[schema(example = "approved", value_type = Option<String>)]
    pub overridden_from: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub overridden_at: Option<DateTime<Utc>>,
}
