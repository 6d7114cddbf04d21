use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::model::audit::AuditEvent;
use crate::utils::pagination;
use crate::workflow::policy::Action;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AuditQuery {
    /// Filter by leave id
    pub leave_id: Option<u64>,
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 25)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AuditListResponse {
    pub data: Vec<AuditEvent>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 25)]
    pub per_page: u32,
    #[schema(example = 40)]
    pub total: i64,
}

/// Admin-only trail of every mutating action, newest first
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    params(AuditQuery),
    responses(
        (status = 200, description = "Paginated audit trail", body = AuditListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Audit"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AuditQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Action::ViewAuditLog)?;

    let (page, per_page, offset) = pagination::page_window(query.page, query.per_page, 25);

    let mut where_sql = String::from(" WHERE 1=1");
    if query.leave_id.is_some() {
        where_sql.push_str(" AND leave_id = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM audit_log{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(leave_id) = query.leave_id {
        count_q = count_q.bind(leave_id);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to count audit records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT *
        FROM audit_log
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, AuditEvent>(&data_sql);
    if let Some(leave_id) = query.leave_id {
        data_q = data_q.bind(leave_id);
    }

    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch audit records");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AuditListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
