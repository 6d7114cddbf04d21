use crate::api::audit::{AuditListResponse, AuditQuery};
use crate::api::bulk::BulkStatusPayload;
use crate::api::leave::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::notification::{NotificationListResponse, NotificationQuery};
use crate::api::reports::TopRequestersQuery;
use crate::api::review::{OverridePayload, ReviewPayload};
use crate::model::audit::AuditEvent;
use crate::model::leave::{LeaveApplication, LeaveStatus};
use crate::model::notification::Notification;
use crate::reports::{MonthlyCount, RequesterCount, StatusSummary, TypeCount};
use crate::workflow::bulk::BulkReport;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LeaveDesk API",
        version = "1.0.0",
        description = r#"
## Student/Faculty Leave Management

This API powers a campus **leave management** service: students and faculty
submit leave applications, reviewers decide them, and admins can reverse a
decision on the day it was made.

### Key features
- **Leave submission** with date-order validation
- **Review workflow**: pending → approved/rejected with reviewer comments
- **Same-day override**: admin-only reversal of a prior decision
- **Bulk operations**: non-atomic batch approve/reject with per-item errors
- **Reports**: status breakdowns, monthly series, top requesters
- **Notifications & audit trail** for every action

### Security
Endpoints under the API prefix require **JWT Bearer authentication**.
Roles: **admin**, **faculty**, **student**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::create_leave,

        crate::api::review::approve_leave,
        crate::api::review::reject_leave,
        crate::api::review::override_leave,
        crate::api::bulk::bulk_status,

        crate::api::reports::summary,
        crate::api::reports::monthly,
        crate::api::reports::types,
        crate::api::reports::top_requesters,

        crate::api::notification::list,
        crate::api::notification::unread_count,
        crate::api::notification::mark_read,

        crate::api::audit::list,

        crate::auth::handlers::me,
        crate::auth::handlers::change_password,
    ),
    components(
        schemas(
            LeaveStatus,
            LeaveApplication,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            ReviewPayload,
            OverridePayload,
            BulkStatusPayload,
            BulkReport,
            StatusSummary,
            MonthlyCount,
            TypeCount,
            RequesterCount,
            TopRequestersQuery,
            Notification,
            NotificationQuery,
            NotificationListResponse,
            AuditEvent,
            AuditQuery,
            AuditListResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Session APIs"),
        (name = "Leave", description = "Leave submission and listing APIs"),
        (name = "Review", description = "Review, override and bulk decision APIs"),
        (name = "Reports", description = "Snapshot analytics APIs"),
        (name = "Notifications", description = "Per-user notification APIs"),
        (name = "Audit", description = "Admin audit trail APIs"),
    )
)]
pub struct ApiDoc;

pub struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
