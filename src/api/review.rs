use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveStatus;
use crate::utils::events;
use crate::workflow::review::{self, Actor, LeaveState, ReviewError, Transition};

#[derive(Deserialize, ToSchema)]
pub struct ReviewPayload {
    #[schema(example = "Overlaps with examination week")]
    pub comments: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct OverridePayload {
    #[schema(example = "rejected")]
    pub status: LeaveStatus,
    #[schema(example = "Policy violation surfaced after approval")]
    pub comments: Option<String>,
}

/// Why a single-record transition did not happen. Bulk concatenates
/// these per item; the single-record handlers map them to HTTP codes.
#[derive(Debug, Display)]
pub enum TransitionFailure {
    #[display(fmt = "leave not found")]
    NotFound,
    #[display(fmt = "{}", _0)]
    Refused(ReviewError),
    #[display(fmt = "leave was already processed by another reviewer")]
    Conflict,
    #[display(fmt = "internal error")]
    Db,
}

impl TransitionFailure {
    fn into_response(self) -> HttpResponse {
        let body = serde_json::json!({ "message": self.to_string() });
        match self {
            TransitionFailure::NotFound => HttpResponse::NotFound().json(body),
            TransitionFailure::Refused(ReviewError::Unauthorized(_)) => {
                HttpResponse::Forbidden().json(body)
            }
            TransitionFailure::Refused(_) => HttpResponse::Conflict().json(body),
            TransitionFailure::Conflict => HttpResponse::BadRequest().json(body),
            TransitionFailure::Db => HttpResponse::InternalServerError().json(body),
        }
    }
}

struct LeaveRow {
    requester_id: u64,
    leave_type: String,
    state: LeaveState,
}

async fn fetch_state(pool: &MySqlPool, leave_id: u64) -> Result<LeaveRow, TransitionFailure> {
    let row = sqlx::query_as::<_, (u64, String, String, Option<DateTime<Utc>>)>(
        r#"
        SELECT requester_id, leave_type, status, status_decided_at
        FROM leaves
        WHERE id = ?
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave state");
        TransitionFailure::Db
    })?;

    let (requester_id, leave_type, status, status_decided_at) =
        row.ok_or(TransitionFailure::NotFound)?;

    let status = LeaveStatus::from_str(&status).map_err(|_| {
        tracing::error!(leave_id, %status, "Leave row carries an unknown status");
        TransitionFailure::Db
    })?;

    Ok(LeaveRow {
        requester_id,
        leave_type,
        state: LeaveState {
            status,
            status_decided_at,
        },
    })
}

async fn persist(
    pool: &MySqlPool,
    leave_id: u64,
    expected: LeaveStatus,
    transition: &Transition,
) -> Result<(), TransitionFailure> {
    // The WHERE status guard is the whole concurrency story: a reviewer
    // who lost the race affects zero rows and is told so.
    let result = match &transition.override_meta {
        None => {
            sqlx::query(
                r#"
                UPDATE leaves
                SET status = ?, reviewer_id = ?, reviewer_comments = ?,
                    status_decided_at = ?, updated_at = NOW()
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(transition.new_status.as_str())
            .bind(transition.reviewer_id)
            .bind(&transition.comments)
            .bind(transition.status_decided_at)
            .bind(leave_id)
            .bind(expected.as_str())
            .execute(pool)
            .await
        }
        Some(meta) => {
            sqlx::query(
                r#"
                UPDATE leaves
                SET status = ?, reviewer_id = ?, reviewer_comments = ?,
                    overridden_by_admin = TRUE, overridden_from = ?,
                    overridden_at = ?, updated_at = NOW()
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(transition.new_status.as_str())
            .bind(transition.reviewer_id)
            .bind(&transition.comments)
            .bind(meta.overridden_from.as_str())
            .bind(meta.overridden_at)
            .bind(leave_id)
            .bind(expected.as_str())
            .execute(pool)
            .await
        }
    };

    let result = result.map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to persist transition");
        TransitionFailure::Db
    })?;

    if result.rows_affected() == 0 {
        return Err(TransitionFailure::Conflict);
    }

    Ok(())
}

async fn record_outcome(
    pool: &MySqlPool,
    leave_id: u64,
    row: &LeaveRow,
    transition: &Transition,
    actor: &AuthUser,
) {
    let (action, verb) = match (&transition.override_meta, transition.new_status) {
        (Some(_), status) => ("leave.overridden", format!("overridden to {status}")),
        (None, LeaveStatus::Approved) => ("leave.approved", "approved".to_string()),
        (None, _) => ("leave.rejected", "rejected".to_string()),
    };

    events::record_audit(
        pool,
        actor.user_id,
        action,
        Some(leave_id),
        &format!("leave {leave_id} {verb} by {} ({})", actor.full_name, actor.role.as_str()),
    )
    .await;

    events::notify_user(
        pool,
        row.requester_id,
        Some(leave_id),
        &format!("Your {} leave was {verb} by {}", row.leave_type, actor.full_name),
    )
    .await;
}

/// Shared single-record transition used by the approve/reject/override
/// endpoints and by the bulk runner.
pub(crate) async fn apply_review(
    pool: &MySqlPool,
    leave_id: u64,
    target: LeaveStatus,
    comments: Option<&str>,
    actor: &AuthUser,
) -> Result<(), TransitionFailure> {
    let row = fetch_state(pool, leave_id).await?;
    let actor_ctx = Actor {
        id: actor.user_id,
        role: actor.role,
    };

    let transition = review::review(&row.state, target, comments, actor_ctx, Utc::now())
        .map_err(TransitionFailure::Refused)?;

    persist(pool, leave_id, row.state.status, &transition).await?;
    record_outcome(pool, leave_id, &row, &transition, actor).await;
    Ok(())
}

async fn apply_override(
    pool: &MySqlPool,
    leave_id: u64,
    target: LeaveStatus,
    comments: Option<&str>,
    actor: &AuthUser,
) -> Result<(), TransitionFailure> {
    let row = fetch_state(pool, leave_id).await?;
    let actor_ctx = Actor {
        id: actor.user_id,
        role: actor.role,
    };

    let transition =
        review::override_decision(&row.state, target, comments, actor_ctx, Utc::now())
            .map_err(TransitionFailure::Refused)?;

    persist(pool, leave_id, row.state.status, &transition).await?;
    record_outcome(pool, leave_id, &row, &transition, actor).await;
    Ok(())
}

/* =========================
Approve leave (Faculty/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to approve")
    ),
    request_body(content = ReviewPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Transition refused")
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    match apply_review(
        pool.get_ref(),
        leave_id,
        LeaveStatus::Approved,
        payload.comments.as_deref(),
        &auth,
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Leave approved"
        }))),
        Err(failure) => Ok(failure.into_response()),
    }
}

/* =========================
Reject leave (Faculty/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to reject")
    ),
    request_body(content = ReviewPayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Transition refused (comments required)")
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    match apply_review(
        pool.get_ref(),
        leave_id,
        LeaveStatus::Rejected,
        payload.comments.as_deref(),
        &auth,
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Leave rejected"
        }))),
        Err(failure) => Ok(failure.into_response()),
    }
}

/* =========================
Same-day override (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/override",
    params(
        ("leave_id" = u64, Path, description = "ID of the decided leave to override")
    ),
    request_body(content = OverridePayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Decision overridden", body = Object, example = json!({
            "message": "Decision overridden"
        })),
        (status = 400, description = "Leave already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave application not found"),
        (status = 409, description = "Outside the same-day window")
    ),
    security(("bearer_auth" = [])),
    tag = "Review"
)]
pub async fn override_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<OverridePayload>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    match apply_override(
        pool.get_ref(),
        leave_id,
        payload.status,
        payload.comments.as_deref(),
        &auth,
    )
    .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Decision overridden"
        }))),
        Err(failure) => Ok(failure.into_response()),
    }
}
