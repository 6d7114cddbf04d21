use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveStatus;
use crate::reports::{self, LeaveSnapshot};
use crate::workflow::policy::Action;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TopRequestersQuery {
    #[schema(example = 5)]
    pub limit: Option<usize>,
}

/// Pull the full snapshot the aggregators run over. Reports are always
/// recomputed from scratch; there is no cached aggregate to invalidate.
async fn fetch_snapshot(pool: &MySqlPool) -> actix_web::Result<Vec<LeaveSnapshot>> {
    let rows = sqlx::query_as::<_, (u64, String, String, String, DateTime<Utc>)>(
        r#"
        SELECT requester_id, requester_name, leave_type, status, applied_on
        FROM leaves
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch report snapshot");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    rows.into_iter()
        .map(|(requester_id, requester_name, leave_type, status, applied_on)| {
            let status = LeaveStatus::from_str(&status).map_err(|_| {
                tracing::error!(%status, "Leave row carries an unknown status");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
            Ok(LeaveSnapshot {
                requester_id,
                requester_name,
                leave_type,
                status,
                applied_on,
            })
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/summary",
    responses(
        (status = 200, description = "Status counts and percentages", body = Object, example = json!({
            "total": 12, "pending": 3, "approved": 7, "rejected": 2,
            "pending_pct": 25.0, "approved_pct": 58.33, "rejected_pct": 16.67
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn summary(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require(Action::ViewReports)?;

    let snapshot = fetch_snapshot(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(reports::status_summary(&snapshot)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/monthly",
    responses(
        (status = 200, description = "Applications per calendar month", body = Object, example = json!([
            { "month": "2025-05", "count": 4 },
            { "month": "2025-06", "count": 9 }
        ])),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn monthly(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require(Action::ViewReports)?;

    let snapshot = fetch_snapshot(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(reports::monthly_counts(&snapshot)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/types",
    responses(
        (status = 200, description = "Applications per leave type", body = Object, example = json!([
            { "leave_type": "medical", "count": 6 },
            { "leave_type": "personal", "count": 4 }
        ])),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn types(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require(Action::ViewReports)?;

    let snapshot = fetch_snapshot(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(reports::type_counts(&snapshot)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/top-requesters",
    params(TopRequestersQuery),
    responses(
        (status = 200, description = "Requesters with the most applications", body = Object, example = json!([
            { "requester_id": 42, "requester_name": "Jordan Rivera", "count": 5 }
        ])),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn top_requesters(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TopRequestersQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Action::ViewReports)?;

    let limit = query.limit.unwrap_or(5).min(50);
    let snapshot = fetch_snapshot(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(reports::top_requesters(&snapshot, limit)))
}
