use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use reqwest::Client;
use std::sync::Arc;

pub mod admin_gate;
pub mod auth;
pub mod auth_middleware;
pub mod booking;
pub mod config;
pub mod dashboard;
pub mod erp_api;
pub mod error;
pub mod filter;
pub mod listings;
pub mod models;
pub mod normalize;
pub mod query;
pub mod routes;
pub mod search;

use crate::admin_gate::AdminGate;
use crate::config::Settings;
use crate::erp_api::ErpClient;
use crate::search::SearchSessions;

// Define the application state struct
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub erp: ErpClient,
    pub searches: Arc<SearchSessions>,
    pub gate: AdminGate,
    pub cookie_key: Key,
}

impl AppState {
    /// Wires every shared component around one HTTP client.
    pub fn new(settings: Arc<Settings>, http_client: Arc<Client>) -> anyhow::Result<Self> {
        let cookie_key = auth_middleware::cookie_key(&settings.cookie_secret)?;
        let erp = ErpClient::new(http_client, settings.clone());
        let gate = AdminGate::new(erp.clone(), settings.admin_gate_min_delay());
        Ok(Self {
            searches: Arc::new(SearchSessions::new(erp.clone(), settings.max_search_consumers)),
            settings,
            erp,
            gate,
            cookie_key,
        })
    }

    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let http_client = erp_api::build_http_client(&settings)?;
        Self::new(Arc::new(settings), Arc::new(http_client))
    }
}
