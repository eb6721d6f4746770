use axum::{
    RequestPartsExt, async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use anyhow::Context;
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use tracing::{info, warn};

use crate::AppState;
use crate::admin_gate::{AdminProfile, GateState, MSG_NO_USER};
use crate::error::AppError;
use crate::models::CachedProfile;
use crate::normalize::is_truthy;

pub const USER_COOKIE: &str = "vrent_user";
pub const NAME_COOKIE: &str = "vrent_name";
pub const ADMIN_COOKIE: &str = "vrent_admin";
pub const EMAIL_COOKIE: &str = "vrent_email";

const PROFILE_COOKIES: [&str; 4] = [USER_COOKIE, NAME_COOKIE, ADMIN_COOKIE, EMAIL_COOKIE];

/// Key for the encrypted profile cookies. An empty secret gets a random key,
/// which logs everyone out on restart.
pub fn cookie_key(secret: &str) -> anyhow::Result<Key> {
    if secret.is_empty() {
        warn!("APP_COOKIE_SECRET is not set; profile cookies will not survive a restart");
        return Ok(Key::generate());
    }
    Key::try_from(secret.as_bytes()).context("cookie_secret must be at least 64 bytes")
}

fn cookie_text(jar: &PrivateCookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads the cached profile out of the cookie jar. Cookies that fail to decrypt read as absent.
pub fn profile_from_jar(jar: &PrivateCookieJar) -> CachedProfile {
    CachedProfile {
        user_id: cookie_text(jar, USER_COOKIE),
        display_name: cookie_text(jar, NAME_COOKIE),
        email: cookie_text(jar, EMAIL_COOKIE),
        is_admin: cookie_text(jar, ADMIN_COOKIE)
            .is_some_and(|v| is_truthy(&serde_json::Value::String(v))),
    }
}

fn profile_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .build()
}

// An expired, empty cookie. Emitted even when the request never carried the cookie.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}

pub fn store_profile(jar: PrivateCookieJar, profile: &CachedProfile) -> PrivateCookieJar {
    let entries = [
        (USER_COOKIE, profile.user_id.clone()),
        (NAME_COOKIE, profile.display_name.clone()),
        (EMAIL_COOKIE, profile.email.clone()),
        (ADMIN_COOKIE, Some(if profile.is_admin { "1" } else { "0" }.to_string())),
    ];
    entries.into_iter().fold(jar, |jar, (name, value)| match value {
        Some(value) => jar.add(profile_cookie(name, value)),
        None => jar.add(removal_cookie(name)),
    })
}

pub fn clear_profile(jar: PrivateCookieJar) -> PrivateCookieJar {
    PROFILE_COOKIES
        .into_iter()
        .fold(jar, |jar, name| jar.add(removal_cookie(name)))
}

// Cached profile from cookies. Never rejects; an anonymous or tampered cookie gets an empty profile.
#[derive(Debug, Clone)]
pub struct CachedUser(pub CachedProfile);

#[async_trait]
impl<S> FromRequestParts<S> for CachedUser
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = match parts.extract_with_state::<PrivateCookieJar, S>(state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        Ok(CachedUser(profile_from_jar(&jar)))
    }
}

// A user the admin gate has just confirmed against the ERP.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AdminProfile);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CachedUser(cached) = parts.extract_with_state::<CachedUser, S>(state).await?;
        let app_state = AppState::from_ref(state);

        match app_state.gate.resolve(cached.user_id.as_deref()).await {
            GateState::Allowed { profile } => {
                info!(user_id = %profile.user_id, "Admin request authorized");
                Ok(AdminUser(profile))
            }
            GateState::Denied { reason } if reason == MSG_NO_USER => Err(AppError::Unauthorized(reason)),
            GateState::Denied { reason } => {
                warn!(user_id = ?cached.user_id, "Admin request denied");
                Err(AppError::Forbidden(reason))
            }
            GateState::Checking => Err(AppError::InternalServerError(anyhow::anyhow!(
                "admin gate returned without a decision"
            ))),
        }
    }
}
