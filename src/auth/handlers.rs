use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    models::{BootstrapAdminReqDto, ChangePasswordReqDto, LoginReqDto, RegisterReqDto, TokenType, UserSql},
    model::role::Role,
    utils::email_cache,
    utils::email_filter,
    utils::events,
};
use actix_web::rt::time::timeout;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Inserts a new student account and keeps the availability structures warm.
async fn insert_user(
    email: &str,
    password: &str,
    full_name: &str,
    pool: &MySqlPool,
) -> Result<(), HttpResponse> {
    let hashed = match hash_password(password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            return Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })));
        }
    };

    let result = sqlx::query(
        r#"INSERT INTO users (email, password, full_name, role_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(email)
    .bind(hashed)
    .bind(full_name)
    .bind(Role::Student as u8)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            email_filter::insert(email);
            email_cache::mark_taken(email).await;
            Ok(())
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code() == Some("23000".into()) {
                    return Err(HttpResponse::Conflict().json(json!({
                        "error": "Email already registered"
                    })));
                }
            }

            error!(error = %e, "Failed to insert user");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })))
        }
    }
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // 1. Cuckoo filter: fast negative. "Not present" is definitive.
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2. Moka cache: fast positive.
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3. Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Student sign-up handler
pub async fn register(user: web::Json<RegisterReqDto>, pool: web::Data<MySqlPool>) -> impl Responder {
    let email = user.email.trim().to_lowercase();
    let full_name = user.full_name.trim();
    let password = &user.password;

    if email.is_empty() || password.is_empty() || full_name.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Email, password and full name must not be empty"
        }));
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({
            "error": "Email already registered"
        }));
    }

    match insert_user(&email, password, full_name, pool.get_ref()).await {
        Ok(_) => HttpResponse::Created().json(json!({
            "message": "Account created successfully"
        })),
        Err(err_resp) => err_resp,
    }
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

/// Race a login step against the configured deadline. Login is the only
/// flow with a hard time bound; a slow database reads as a failed login
/// rather than a hung request.
async fn bounded<T, F>(config: &Config, step: &'static str, fut: F) -> Result<T, HttpResponse>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_secs(config.login_timeout_secs), fut).await {
        Ok(v) => Ok(v),
        Err(_) => {
            error!(step, "Login step timed out");
            Err(HttpResponse::ServiceUnavailable().json(json!({
                "error": "Login timed out, please retry"
            })))
        }
    }
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().body("Email or password required");
    }

    debug!("Fetching user from database");

    let fetch = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password, full_name, role_id
        FROM users
        WHERE email = ? AND is_active = TRUE
        "#,
    )
    .bind(user.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref());

    let db_user = match bounded(&config, "fetch_user", fetch).await {
        Ok(Ok(Some(u))) => {
            debug!(user_id = u.id, "User found");
            u
        }
        Ok(Ok(None)) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Ok(Err(e)) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
        Err(resp) => return resp,
    };

    debug!("Verifying password");

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Generating tokens");

    let access_token = match generate_access_token(
        db_user.id,
        db_user.email.clone(),
        db_user.full_name.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (refresh_token, refresh_claims) = match generate_refresh_token(
        db_user.id,
        db_user.email.clone(),
        db_user.full_name.clone(),
        db_user.role_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Failed to sign refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");

    let store = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref());

    match bounded(&config, "store_refresh_token", store).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Failed to store refresh token");
            return HttpResponse::InternalServerError().finish();
        }
        Err(resp) => return resp,
    }

    debug!("Updating last_login_at");

    let touch = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref());

    match bounded(&config, "update_last_login", touch).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Failed to update last_login_at");
            // intentionally not failing login
        }
        // timeout already logged by bounded; also non-fatal
        Err(_) => {}
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    let record = match sqlx::query_as::<_, (u64, u64, bool)>(
        r#"
        SELECT id, user_id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // Rotation: the presented refresh token is spent either way.
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let (new_refresh_token, new_claims) = match generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.full_name.clone(),
        claims.role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Failed to sign refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    let access_token = match generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.full_name.clone(),
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    // success even if token didn't exist
    HttpResponse::NoContent().finish()
}

/// Session retrieval: who am I, and what can I do.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current session", body = Object, example = json!({
            "user_id": 42,
            "email": "jordan@campus.edu",
            "full_name": "Jordan Rivera",
            "role": "student"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "user_id": auth.user_id,
        "email": auth.email,
        "full_name": auth.full_name,
        "role": auth.role.as_str(),
    }))
}

/// Authenticated password change. Revokes all outstanding refresh
/// tokens so stolen sessions die with the old password.
#[utoipa::path(
    post,
    path = "/api/v1/password",
    responses(
        (status = 200, description = "Password changed", body = Object, example = json!({
            "message": "Password updated"
        })),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Current password incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ChangePasswordReqDto>,
) -> impl Responder {
    if payload.new_password.len() < 8 {
        return HttpResponse::BadRequest().json(json!({
            "error": "New password must be at least 8 characters"
        }));
    }

    let stored: Option<String> =
        match sqlx::query_scalar("SELECT password FROM users WHERE id = ?")
            .bind(auth.user_id)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, user_id = auth.user_id, "Failed to fetch password hash");
                return HttpResponse::InternalServerError().finish();
            }
        };

    let Some(stored) = stored else {
        return HttpResponse::Unauthorized().finish();
    };

    if verify_password(&payload.current_password, &stored).is_err() {
        return HttpResponse::Unauthorized().json(json!({
            "error": "Current password incorrect"
        }));
    }

    let hashed = match hash_password(&payload.new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, user_id = auth.user_id, "Failed to update password");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ?")
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, user_id = auth.user_id, "Failed to revoke refresh tokens");
        // password already changed; report success anyway
    }

    info!(user_id = auth.user_id, "Password changed");

    HttpResponse::Ok().json(json!({
        "message": "Password updated"
    }))
}

/// Provision the admin identity from the pre-seeded credential table.
/// Mirrors the original deployment's privileged bootstrap function:
/// credentials are validated against `admin_credentials`, then an
/// active admin user row is created (or re-activated).
pub async fn bootstrap_admin(
    payload: web::Json<BootstrapAdminReqDto>,
    pool: web::Data<MySqlPool>,
) -> impl Responder {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || payload.password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Email and password required"
        }));
    }

    let stored: Option<String> =
        match sqlx::query_scalar("SELECT password FROM admin_credentials WHERE email = ?")
            .bind(&email)
            .fetch_optional(pool.get_ref())
            .await
        {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Failed to read admin credentials");
                return HttpResponse::InternalServerError().finish();
            }
        };

    let Some(stored) = stored else {
        info!("Bootstrap refused: unknown admin email");
        return HttpResponse::Unauthorized().json(json!({ "success": false }));
    };

    if verify_password(&payload.password, &stored).is_err() {
        info!("Bootstrap refused: bad admin password");
        return HttpResponse::Unauthorized().json(json!({ "success": false }));
    }

    let hashed = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Password hashing failed");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, full_name, role_id, is_active)
        VALUES (?, ?, 'Administrator', ?, TRUE)
        ON DUPLICATE KEY UPDATE role_id = VALUES(role_id), is_active = TRUE
        "#,
    )
    .bind(&email)
    .bind(hashed)
    .bind(Role::Admin as u8)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        error!(error = %e, "Failed to provision admin user");
        return HttpResponse::InternalServerError().json(json!({ "success": false }));
    }

    // last_insert_id is 0 when the row already existed, so resolve it.
    let admin_id: u64 = match sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Failed to resolve provisioned admin id");
            return HttpResponse::InternalServerError().json(json!({ "success": false }));
        }
    };

    email_filter::insert(&email);
    email_cache::mark_taken(&email).await;

    events::record_audit(
        pool.get_ref(),
        admin_id,
        "admin.bootstrapped",
        None,
        &format!("admin identity provisioned for {email}"),
    )
    .await;

    info!(%email, "Admin identity provisioned");

    HttpResponse::Ok().json(json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    fn config_with_timeout(secs: u64) -> Config {
        Config {
            database_url: "mysql://unused".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            refresh_token_ttl: 604_800,
            login_timeout_secs: secs,
            rate_login_per_min: 60,
            rate_register_per_min: 30,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
        }
    }

    #[actix_web::test]
    async fn bounded_returns_value_when_step_completes() {
        let config = config_with_timeout(5);
        let result = bounded(&config, "fast_step", async { 42u8 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[actix_web::test]
    async fn bounded_cuts_off_a_stalled_step() {
        let config = config_with_timeout(0);
        // A step that never resolves must not hold the login past the
        // deadline; every awaited login query goes through this guard,
        // including the non-fatal last_login_at touch.
        let result = bounded(&config, "stalled_step", std::future::pending::<()>()).await;
        let resp = result.unwrap_err();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
