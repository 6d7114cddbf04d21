use crate::auth::auth::AuthUser;
use crate::model::leave::LeaveApplication;
use crate::utils::{events, pagination};
use crate::workflow::policy::Action;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "medical")]
    pub leave_type: String,
    #[schema(example = "Scheduled surgery on the 6th")]
    pub reason: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_emergency: bool,
    #[schema(value_type = Option<String>)]
    pub attachment_url: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 42)]
    /// Filter by requester ID
    pub requester_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = "medical")]
    /// Filter by leave type
    pub leave_type: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveApplication>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Pre-submission validation, run before anything touches the database.
pub fn validate_submission(payload: &CreateLeave) -> Result<(), &'static str> {
    if payload.leave_type.trim().is_empty() {
        return Err("leave_type must not be empty");
    }
    if payload.reason.trim().is_empty() {
        return Err("reason must not be empty");
    }
    if payload.start_date > payload.end_date {
        return Err("start_date cannot be after end_date");
    }
    Ok(())
}

/* =========================
Submit leave application
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave application payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave application submitted",
         body = Object,
         example = json!({
            "message": "Leave application submitted",
            "status": "pending"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    auth.require(Action::SubmitLeave)?;

    if let Err(msg) = validate_submission(&payload) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": msg
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leaves
            (requester_id, requester_name, leave_type, reason,
             start_date, end_date, is_emergency, attachment_url, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(auth.user_id)
    .bind(&auth.full_name)
    .bind(payload.leave_type.trim())
    .bind(payload.reason.trim())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.is_emergency)
    .bind(&payload.attachment_url)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, requester_id = auth.user_id, "Failed to create leave");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let leave_id = result.last_insert_id();

    events::record_audit(
        pool.get_ref(),
        auth.user_id,
        "leave.submitted",
        Some(leave_id),
        &format!(
            "{} applied for {} leave {} to {}",
            auth.full_name, payload.leave_type.trim(), payload.start_date, payload.end_date
        ),
    )
    .await;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave application submitted",
        "id": leave_id,
        "status": "pending"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave application to fetch")
    ),
    responses(
        (status = 200, description = "Leave application found", body = LeaveApplication),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave application not found", body = Object, example = json!({
            "message": "Leave application not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = sqlx::query_as::<_, LeaveApplication>(
        r#"
        SELECT *
        FROM leaves
        WHERE id = ?
        "#,
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let leave = match leave {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Leave application not found"
            })));
        }
    };

    // Requesters see their own applications; reviewers see all.
    if leave.requester_id != auth.user_id {
        auth.require(Action::ReviewLeave)?;
    }

    Ok(HttpResponse::Ok().json(leave))
}

/// for listing leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let (page, per_page, offset) = pagination::page_window(query.page, query.per_page, 10);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    // Students only ever see their own rows; the requester_id filter
    // is a reviewer convenience.
    if auth.require(Action::ReviewLeave).is_err() {
        where_sql.push_str(" AND requester_id = ?");
        args.push(FilterValue::U64(auth.user_id));
    } else if let Some(requester_id) = query.requester_id {
        where_sql.push_str(" AND requester_id = ?");
        args.push(FilterValue::U64(requester_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    if let Some(leave_type) = query.leave_type.as_deref() {
        where_sql.push_str(" AND leave_type = ?");
        args.push(FilterValue::Str(leave_type));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leaves{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count leaves");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT *
        FROM leaves
        {}
        ORDER BY applied_on DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveApplication>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(start: (i32, u32, u32), end: (i32, u32, u32)) -> CreateLeave {
        CreateLeave {
            leave_type: "medical".into(),
            reason: "checkup".into(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            is_emergency: false,
            attachment_url: None,
        }
    }

    #[test]
    fn accepts_ordered_dates() {
        assert!(validate_submission(&payload((2025, 5, 8), (2025, 5, 10))).is_ok());
    }

    #[test]
    fn single_day_leave_is_valid() {
        assert!(validate_submission(&payload((2025, 5, 8), (2025, 5, 8))).is_ok());
    }

    #[test]
    fn rejects_reversed_dates() {
        let err = validate_submission(&payload((2025, 5, 10), (2025, 5, 8))).unwrap_err();
        assert_eq!(err, "start_date cannot be after end_date");
    }

    #[test]
    fn rejects_blank_fields() {
        let mut p = payload((2025, 5, 8), (2025, 5, 10));
        p.leave_type = "  ".into();
        assert!(validate_submission(&p).is_err());

        let mut p = payload((2025, 5, 8), (2025, 5, 10));
        p.reason = "".into();
        assert!(validate_submission(&p).is_err());
    }
}
