use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AuditEvent {
    #[schema(example = 1)]
    pub id: u64,
    pub actor_id: u64,
    #[schema(example = "leave.approved")]
    pub action: String,
    pub leave_id: Option<u64>,
    #[schema(example = "leave 17 approved by reviewer 3")]
    pub detail: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
