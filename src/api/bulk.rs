use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::api::review::apply_review;
use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveStatus;
use crate::workflow::bulk::{BulkOutcome, BulkReport};
use crate::workflow::review as review_rules;

#[derive(Deserialize, ToSchema)]
pub struct BulkStatusPayload {
    #[schema(example = json!([3, 7, 12]))]
    pub leave_ids: Vec<u64>,
    #[schema(example = "approved")]
    pub status: LeaveStatus,
    #[schema(example = "Semester break window")]
    pub comments: Option<String>,
}

/* =========================
Bulk approve/reject (Faculty/Admin)
========================= */
/// Applies the single-record transition to each id in turn. The batch
/// is deliberately sequential and non-atomic: items already applied
/// stay applied when a later item fails, and `count` in the response
/// is the number that actually went through.
#[utoipa::path(
    post,
    path = "/api/v1/leave/bulk-status",
    request_body(content = BulkStatusPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Batch processed (possibly partially)", body = BulkReport),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
pub async fn bulk_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkStatusPayload>,
) -> actix_web::Result<impl Responder> {
    if payload.leave_ids.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "leave_ids must not be empty"
        })));
    }

    if !payload.status.is_decided() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "status must be approved or rejected"
        })));
    }

    // Comments are mandatory for batch rejection, checked up front so an
    // invalid batch touches nothing.
    if let Err(refusal) =
        review_rules::require_comments_for_rejection(payload.status, payload.comments.as_deref())
    {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": refusal.to_string()
        })));
    }

    let mut outcome = BulkOutcome::default();

    for &leave_id in &payload.leave_ids {
        match apply_review(
            pool.get_ref(),
            leave_id,
            payload.status,
            payload.comments.as_deref(),
            &auth,
        )
        .await
        {
            Ok(()) => outcome.record_success(),
            Err(failure) => outcome.record_failure(leave_id, failure),
        }
    }

    let report = outcome.into_report();

    info!(
        actor = auth.user_id,
        requested = payload.leave_ids.len(),
        applied = report.count,
        "Bulk status change processed"
    );

    Ok(HttpResponse::Ok().json(report))
}
