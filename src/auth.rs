// Login and signup request shaping on top of the ERP's own auth endpoints

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::CachedProfile;
use crate::normalize::{coerce_text, first_defined, is_truthy};

const NAME_FIELDS: &[&str] = &["full_name", "display_name", "name"];
const USER_FIELDS: &[&str] = &["user", "user_id", "email"];
const ADMIN_FIELDS: &[&str] = &["is_admin", "admin"];
const ERROR_FIELDS: &[&str] = &["error", "exception", "exc", "message", "_server_messages", "raw"];

const PHONE_MIN_DIGITS: usize = 9;
const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    pub phone: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignupError {
    #[error("กรุณากรอก {0}")]
    MissingField(&'static str),

    #[error("เบอร์โทรศัพท์ต้องเป็นตัวเลข 9-15 หลัก")]
    InvalidPhone,

    #[error("รหัสผ่านไม่ตรงกัน")]
    PasswordMismatch,
}

pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

/// Client-side checks; nothing is sent to the ERP if these fail.
pub fn validate_signup(request: &SignupRequest) -> Result<(), SignupError> {
    for (label, value) in [
        ("email", &request.email),
        ("full_name", &request.full_name),
        ("password", &request.password),
    ] {
        if value.trim().is_empty() {
            return Err(SignupError::MissingField(label));
        }
    }
    if !is_valid_phone(&request.phone) {
        return Err(SignupError::InvalidPhone);
    }
    if let Some(confirm) = &request.confirm_password {
        if confirm != &request.password {
            return Err(SignupError::PasswordMismatch);
        }
    }
    Ok(())
}

fn message_body(payload: &Value) -> Option<&serde_json::Map<String, Value>> {
    match payload.get("message") {
        Some(Value::Object(inner)) => Some(inner),
        _ => payload.as_object(),
    }
}

// Frappe packs messages as a JSON string holding a list of JSON strings.
fn server_messages(encoded: &str) -> Option<String> {
    let list: Vec<String> = serde_json::from_str(encoded).ok()?;
    let messages: Vec<String> = list
        .iter()
        .map(|item| match serde_json::from_str::<Value>(item) {
            Ok(Value::Object(map)) => map
                .get("message")
                .and_then(coerce_text)
                .unwrap_or_else(|| item.clone()),
            _ => item.clone(),
        })
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

/// Best human-readable error out of an ERP error body.
pub fn error_message(payload: &Value, fallback: &str) -> String {
    let Some(body) = payload.as_object() else {
        return coerce_text(payload).unwrap_or_else(|| fallback.to_string());
    };
    ERROR_FIELDS
        .iter()
        .filter_map(|key| body.get(*key).map(|value| (*key, value)))
        .find_map(|(key, value)| match (key, value) {
            ("_server_messages", Value::String(encoded)) => server_messages(encoded),
            (_, Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            (_, Value::Object(inner)) => inner.get("message").and_then(coerce_text),
            _ => None,
        })
        .unwrap_or_else(|| fallback.to_string())
}

fn reports_failure(payload: &Value) -> bool {
    ["error", "exception", "exc"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .any(|value| !value.is_null() && value != &Value::Bool(false) && value != "")
}

/// Interprets a successful ERP login response as the profile cached in cookies.
pub fn parse_login(payload: &Value, email: &str) -> Result<CachedProfile, String> {
    if reports_failure(payload) {
        return Err(error_message(payload, "เข้าสู่ระบบไม่สำเร็จ"));
    }

    let body = message_body(payload);
    let field = |keys: &[&str]| {
        body.and_then(|b| first_defined(b, keys))
            .or_else(|| payload.as_object().and_then(|p| first_defined(p, keys)))
    };

    let display_name = field(NAME_FIELDS).and_then(coerce_text);
    let user_id = field(USER_FIELDS)
        .and_then(coerce_text)
        .unwrap_or_else(|| email.to_string());
    let is_admin = field(ADMIN_FIELDS).is_some_and(is_truthy);

    Ok(CachedProfile {
        user_id: Some(user_id),
        display_name,
        email: Some(email.to_string()),
        is_admin,
    })
}
