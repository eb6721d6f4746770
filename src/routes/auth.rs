use axum::{
    extract::{Json as JsonExtract, State},
    response::{IntoResponse, Json},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde_json::json;

use crate::{
    AppState,
    auth::{self, LoginRequest, SignupRequest},
    auth_middleware::{self, CachedUser},
    erp_api::{ErpError, SignupPayload},
    error::{AppError, AppResult},
};

const LOGIN_FAILED: &str = "เข้าสู่ระบบไม่สำเร็จ";
const SIGNUP_FAILED: &str = "สมัครสมาชิกไม่สำเร็จ";

// ERP status failures keep the ERP's own message; transport failures stay 502.
fn rejected(error: ErpError, fallback: &str) -> AppError {
    if let ErpError::Status { status, body, .. } = &error {
        if (400..500).contains(status) {
            return AppError::Unauthorized(auth::error_message(body, fallback));
        }
    }
    AppError::Upstream(error)
}

// Handler for POST /api/login
pub async fn handle_login(
    State(app_state): State<AppState>,
    jar: PrivateCookieJar,
    JsonExtract(form): JsonExtract<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Err(AppError::BadRequest("กรุณากรอกอีเมลและรหัสผ่าน".into()));
    }

    let payload = app_state
        .erp
        .login(email, &form.password)
        .await
        .map_err(|e| rejected(e, LOGIN_FAILED))?;
    let profile = auth::parse_login(&payload, email).map_err(AppError::Unauthorized)?;

    tracing::info!(user_id = ?profile.user_id, cached_admin = profile.is_admin, "Login succeeded");
    let jar = auth_middleware::store_profile(jar, &profile);
    Ok((jar, Json(json!({ "success": true, "profile": profile }))))
}

// Handler for POST /api/signup
pub async fn handle_signup(
    State(app_state): State<AppState>,
    JsonExtract(form): JsonExtract<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    auth::validate_signup(&form).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let payload = SignupPayload {
        email: form.email.trim(),
        full_name: form.full_name.trim(),
        password: &form.password,
        phone: form.phone.trim(),
    };
    let response = app_state
        .erp
        .signup(&payload)
        .await
        .map_err(|e| rejected(e, SIGNUP_FAILED))?;

    tracing::info!(email = payload.email, "Signup accepted by ERP");
    Ok(Json(json!({ "success": true, "message": response.get("message") })))
}

// Handler for POST /api/logout
pub async fn handle_logout(jar: PrivateCookieJar, CachedUser(cached): CachedUser) -> impl IntoResponse {
    tracing::info!(user_id = ?cached.user_id, "Logout");
    (auth_middleware::clear_profile(jar), Json(json!({ "success": true })))
}
