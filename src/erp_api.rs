// Functions to interact with the ERP backend (vehicle search, login, roles, listings)

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

use crate::config::Settings;
use crate::listings::ListingKind;
use crate::models::Vehicle;
use crate::query::SearchQuery;

const EXCERPT_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum ErpError {
    #[error("network error talking to ERP: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ERP responded with HTTP {status}: {excerpt}")]
    Status {
        status: u16,
        excerpt: String,
        // Soft-parsed error body, kept so callers can pull out a message
        body: Value,
    },
}

impl ErpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ErpError::Status { status, .. } => Some(*status),
            ErpError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

// Result of a vehicle search after defensive parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPayload {
    pub vehicles: Vec<Vehicle>,
    // Raw body text when a 2xx body was not JSON
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupPayload<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub password: &'a str,
    pub phone: &'a str,
}

/// Parses a body as JSON, or wraps the raw text as `{ "raw": text }`.
pub fn soft_parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

pub fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Pulls a record list out of `{ message: [...] }`, `{ message: { <entity>: [...] } }`
/// or a bare array. Anything else is an empty list.
pub fn extract_list(payload: &Value, entity: Option<&str>) -> Vec<Value> {
    let message = payload.get("message");
    if let Some(Value::Array(items)) = message {
        return items.clone();
    }
    if let (Some(Value::Object(inner)), Some(entity)) = (message, entity) {
        if let Some(Value::Array(items)) = inner.get(entity) {
            return items.clone();
        }
    }
    match payload {
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

// Builds the shared reqwest client used for every ERP call.
// No cookie store: the client serves every visitor, so ERP sessions must not stick to it.
pub fn build_http_client(settings: &Settings) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("vrent-storefront/", env!("CARGO_PKG_VERSION")))
        .timeout(settings.request_timeout())
        .build()
}

#[derive(Clone)]
pub struct ErpClient {
    http: Arc<Client>,
    settings: Arc<Settings>,
}

impl ErpClient {
    pub fn new(http: Arc<Client>, settings: Arc<Settings>) -> Self {
        Self { http, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // Reads the body, maps non-2xx to ErpError::Status and soft-parses the rest.
    // The second element carries the raw text when the body was not JSON.
    async fn read_body(response: reqwest::Response) -> Result<(Value, Option<String>), ErpError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, body = %excerpt(&text), "ERP returned an error status");
            return Err(ErpError::Status {
                status: status.as_u16(),
                excerpt: excerpt(&text),
                body: soft_parse(&text),
            });
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(payload) => Ok((payload, None)),
            Err(e) => {
                tracing::warn!(error = %e, body = %excerpt(&text), "ERP body was not JSON, keeping raw text");
                Ok((json!({ "raw": text.as_str() }), Some(text)))
            }
        }
    }

    pub async fn search_vehicles(&self, query: &SearchQuery) -> Result<SearchPayload, ErpError> {
        let url = self.settings.erp_url(&self.settings.search_path);
        tracing::debug!(url = %url, query = ?query, "Posting vehicle search");

        let response = self.http.post(&url).json(query).send().await?;
        let (payload, raw) = Self::read_body(response).await?;

        let vehicles: Vec<Vehicle> = extract_list(&payload, None)
            .into_iter()
            .filter_map(Vehicle::from_value)
            .collect();

        tracing::info!(count = vehicles.len(), soft_parsed = raw.is_some(), "Vehicle search returned");
        Ok(SearchPayload { vehicles, raw })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Value, ErpError> {
        let url = self.settings.erp_url(&self.settings.login_path);
        tracing::info!(email, "Forwarding login to ERP");
        let response = self
            .http
            .post(&url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::read_body(response).await.map(|(payload, _)| payload)
    }

    pub async fn signup(&self, payload: &SignupPayload<'_>) -> Result<Value, ErpError> {
        let url = self.settings.erp_url(&self.settings.signup_path);
        tracing::info!(email = payload.email, "Forwarding signup to ERP");
        let response = self.http.post(&url).json(payload).send().await?;
        Self::read_body(response).await.map(|(payload, _)| payload)
    }

    /// Role/user lookup. Status codes are preserved in `ErpError::Status` so the
    /// admin gate can tell a 403 apart from other failures.
    pub async fn user_info(&self, user_id: &str) -> Result<Value, ErpError> {
        let url = self.settings.erp_url(&self.settings.user_info_path);
        let response = self
            .http
            .get(&url)
            .query(&[("user", user_id)])
            .send()
            .await?;
        Self::read_body(response).await.map(|(payload, _)| payload)
    }

    pub async fn list(&self, kind: ListingKind) -> Result<Vec<Value>, ErpError> {
        let url = self.settings.erp_url(kind.path(&self.settings));
        let response = self.http.get(&url).send().await?;
        let (payload, _) = Self::read_body(response).await?;
        let records = extract_list(&payload, Some(kind.entity()));
        tracing::info!(entity = kind.entity(), count = records.len(), "Fetched admin listing");
        Ok(records)
    }
}

pub fn is_forbidden(status: u16) -> bool {
    status == StatusCode::FORBIDDEN.as_u16()
}
