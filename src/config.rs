// Storefront configuration.
// Defaults come from `Settings::default()`, then an optional config.toml, then APP_* env vars.

use anyhow::Result;
use chrono::{FixedOffset, Offset, Utc};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server_address: String,

    // ERP backend origin, e.g. https://erp.example.com (trailing slashes are ignored)
    pub erp_base_url: String,
    pub search_path: String,
    pub login_path: String,
    pub signup_path: String,
    pub user_info_path: String,
    pub vehicles_path: String,
    pub bookings_path: String,
    pub deliveries_path: String,

    // Shown when a vehicle record carries no usable image
    pub placeholder_image: String,

    // Storefront local timezone, minutes east of UTC (Bangkok by default)
    pub timezone_offset_minutes: i32,

    // Minimum time the admin gate stays in "checking" before releasing a result
    pub admin_gate_min_delay_ms: u64,
    pub request_timeout_secs: u64,

    // Well-known ERP administrator account; always allowed through the gate
    pub admin_account: String,

    // Encrypts the profile cookies; at least 64 bytes. Empty means a random key per process.
    pub cookie_secret: String,

    // Consumers tracked for search cancellation at once; extra ones search untracked
    pub max_search_consumers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:3000".to_string(),
            erp_base_url: "http://localhost:8000".to_string(),
            search_path: "/api/method/vrent.api.search_vehicles".to_string(),
            login_path: "/api/method/vrent.api.login".to_string(),
            signup_path: "/api/method/vrent.api.signup".to_string(),
            user_info_path: "/api/method/vrent.api.get_user_info".to_string(),
            vehicles_path: "/api/method/vrent.api.list_vehicles".to_string(),
            bookings_path: "/api/method/vrent.api.list_bookings".to_string(),
            deliveries_path: "/api/method/vrent.api.list_deliveries".to_string(),
            placeholder_image: "/static/images/car-placeholder.svg".to_string(),
            timezone_offset_minutes: 7 * 60,
            admin_gate_min_delay_ms: 600,
            request_timeout_secs: 15,
            admin_account: "Administrator".to_string(),
            cookie_secret: String::new(),
            max_search_consumers: 10_000,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let builder = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Load from environment variables (e.g., APP_ERP_BASE_URL)
            .add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"));

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Settings pointing at a specific ERP origin; everything else default.
    pub fn with_erp(erp_base_url: impl Into<String>) -> Self {
        Self {
            erp_base_url: erp_base_url.into(),
            ..Self::default()
        }
    }

    /// ERP origin with trailing slashes stripped.
    pub fn erp_origin(&self) -> &str {
        self.erp_base_url.trim_end_matches('/')
    }

    pub fn erp_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.erp_origin(), path)
        } else {
            format!("{}/{}", self.erp_origin(), path)
        }
    }

    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn admin_gate_min_delay(&self) -> Duration {
        Duration::from_millis(self.admin_gate_min_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erp_origin_strips_trailing_slashes() {
        let settings = Settings::with_erp("https://erp.example.com//");
        assert_eq!(settings.erp_origin(), "https://erp.example.com");
        assert_eq!(
            settings.erp_url("/api/method/ping"),
            "https://erp.example.com/api/method/ping"
        );
        assert_eq!(settings.erp_url("files/x"), "https://erp.example.com/files/x");
    }

    #[test]
    fn timezone_defaults_to_bangkok() {
        let settings = Settings::default();
        assert_eq!(settings.timezone().local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let settings = Settings {
            timezone_offset_minutes: 100_000,
            ..Settings::default()
        };
        assert_eq!(settings.timezone().local_minus_utc(), 0);
    }
}
