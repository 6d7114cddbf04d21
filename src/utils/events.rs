use sqlx::MySqlPool;
use tracing::error;

/// Append an audit record. Audit writes are best-effort: the triggering
/// action has already committed, so a failed append is logged, not
/// bubbled back to the user.
pub async fn record_audit(
    pool: &MySqlPool,
    actor_id: u64,
    action: &str,
    leave_id: Option<u64>,
    detail: &str,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_log (actor_id, action, leave_id, detail)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(actor_id)
    .bind(action)
    .bind(leave_id)
    .bind(detail)
    .execute(pool)
    .await;

    if let Err(e) = result {
        error!(error = %e, actor_id, action, ?leave_id, "Failed to append audit record");
    }
}

/// Queue a human-readable notification for a user. Best-effort for the
/// same reason as [`record_audit`].
pub async fn notify_user(pool: &MySqlPool, user_id: u64, leave_id: Option<u64>, message: &str) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, leave_id, message)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(leave_id)
    .bind(message)
    .execute(pool)
    .await;

    if let Err(e) = result {
        error!(error = %e, user_id, ?leave_id, "Failed to queue notification");
    }
}
