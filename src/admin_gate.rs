//! Admin access gate.
//!
//! Roles are resolved from the ERP on every check. The cached cookie profile
//! only feeds the pre-paint; access is decided by `GateState` alone.

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use crate::erp_api::{ErpClient, ErpError, is_forbidden};
use crate::models::CachedProfile;
use crate::normalize::{is_truthy, text_field};

pub const MSG_NO_USER: &str = "ไม่พบผู้ใช้ (กรุณาเข้าสู่ระบบ)";
pub const MSG_FORBIDDEN: &str = "คุณไม่มีสิทธิ์เข้าถึงหน้านี้ (403)";
pub const MSG_NOT_ADMIN: &str = "บัญชีของคุณไม่มีสิทธิ์เข้าถึงหน้าแอดมิน";

static ADMIN_ROLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["administrator", "system manager", "admin"].into_iter().collect());

const ADMIN_FLAGS: &[&str] = &["is_admin", "admin"];
const NAME_FIELDS: &[&str] = &["full_name", "display_name", "name"];
const EMAIL_FIELDS: &[&str] = &["email", "user"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminProfile {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Checking,
    Denied { reason: String },
    Allowed { profile: AdminProfile },
}

impl GateState {
    pub fn denied(reason: impl Into<String>) -> Self {
        GateState::Denied {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GateState::Allowed { .. })
    }
}

// `{ message: {...} }` wrappers are unwrapped; anything else is read as-is.
fn user_info_body(payload: &Value) -> &Value {
    match payload.get("message") {
        Some(inner @ (Value::Object(_) | Value::Array(_))) => inner,
        _ => payload,
    }
}

fn role_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["role", "name"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

/// Lower-cased role names from any of the shapes the ERP has used:
/// a bare array, `roles: [..]` of strings or objects, or a single `role`.
pub fn extract_roles(payload: &Value) -> Vec<String> {
    let body = user_info_body(payload);
    let items: Vec<Value> = match body {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match (map.get("roles"), map.get("role")) {
            (Some(Value::Array(items)), _) => items.clone(),
            (Some(Value::String(single)), _) | (None, Some(Value::String(single))) => {
                vec![Value::String(single.clone())]
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .iter()
        .filter_map(role_name)
        .map(|role| role.trim().to_lowercase())
        .filter(|role| !role.is_empty())
        .collect()
}

fn admin_flag(payload: &Value) -> bool {
    let body = user_info_body(payload);
    ADMIN_FLAGS
        .iter()
        .filter_map(|key| body.get(*key))
        .any(is_truthy)
}

/// Pure decision over a successful role lookup.
pub fn decide(user_id: &str, payload: &Value, admin_account: &str) -> GateState {
    let roles = extract_roles(payload);
    let by_role = roles.iter().any(|role| ADMIN_ROLES.contains(role.as_str()));
    let by_flag = admin_flag(payload);
    let by_account = user_id == admin_account;

    if !(by_role || by_flag || by_account) {
        tracing::info!(user_id, ?roles, "Admin gate denied: no admin role");
        return GateState::denied(MSG_NOT_ADMIN);
    }

    let (display_name, email) = match user_info_body(payload) {
        Value::Object(map) => (text_field(map, NAME_FIELDS), text_field(map, EMAIL_FIELDS)),
        _ => (String::new(), String::new()),
    };
    tracing::info!(user_id, by_role, by_flag, by_account, "Admin gate allowed");
    GateState::Allowed {
        profile: AdminProfile {
            user_id: user_id.to_string(),
            display_name: if display_name.is_empty() { user_id.to_string() } else { display_name },
            email,
            roles,
        },
    }
}

pub fn denial_for_error(error: &ErpError) -> GateState {
    match error {
        ErpError::Status { status, .. } if is_forbidden(*status) => GateState::denied(MSG_FORBIDDEN),
        ErpError::Status { status, .. } => {
            GateState::denied(format!("ตรวจสอบสิทธิ์ไม่สำเร็จ (HTTP {status})"))
        }
        ErpError::Transport(e) => GateState::denied(format!("ตรวจสอบสิทธิ์ไม่สำเร็จ: {e}")),
    }
}

#[derive(Clone)]
pub struct AdminGate {
    client: ErpClient,
    min_delay: Duration,
}

impl AdminGate {
    pub fn new(client: ErpClient, min_delay: Duration) -> Self {
        Self { client, min_delay }
    }

    /// Resolves the gate immediately, with no minimum delay. Used to guard
    /// admin API calls where there is no page to paint.
    pub async fn resolve(&self, user_id: Option<&str>) -> GateState {
        let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) else {
            tracing::info!("Admin gate denied: no cached user id");
            return GateState::denied(MSG_NO_USER);
        };
        match self.client.user_info(user_id).await {
            Ok(payload) => decide(user_id, &payload, &self.client.settings().admin_account),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Role lookup failed");
                denial_for_error(&e)
            }
        }
    }

    /// Resolves the gate, releasing the result no sooner than the minimum
    /// delay: total time is max(lookup, delay), never their sum.
    pub async fn check(&self, user_id: Option<&str>) -> GateState {
        let (state, ()) = tokio::join!(self.resolve(user_id), tokio::time::sleep(self.min_delay));
        state
    }
}

/// Two-phase admin session: cached profile first, then the authoritative gate
/// result, which always replaces whatever the cache claimed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSession {
    pub cached: CachedProfile,
    pub gate: GateState,
}

impl AdminSession {
    pub fn optimistic(cached: CachedProfile) -> Self {
        Self {
            cached,
            gate: GateState::Checking,
        }
    }

    pub fn confirm(mut self, gate: GateState) -> Self {
        self.gate = gate;
        self
    }

    // Only the verified gate grants access; the cached admin flag never does.
    pub fn is_admin(&self) -> bool {
        self.gate.is_allowed()
    }

    pub fn display_name(&self) -> String {
        match &self.gate {
            GateState::Allowed { profile } => profile.display_name.clone(),
            _ => self.cached.display_name.clone().unwrap_or_default(),
        }
    }
}
