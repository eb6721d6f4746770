// Data structures shared between the ERP client, the search pipeline and the routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalize;

// A vehicle record exactly as the ERP returned it.
// Field names drift between backend versions, so attributes are only read through `normalize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vehicle(pub Map<String, Value>);

impl Vehicle {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }
}

// Booking intent captured by the search form (already composed into instants).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BookingIntent {
    pub pickup_at: String,
    pub return_at: String,
    pub passengers: u32,
    pub promo: String,
    pub vehicle_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SeatBucket {
    #[serde(rename = "<=5")]
    UpToFive,
    #[serde(rename = "6-7")]
    SixToSeven,
    #[serde(rename = "8+")]
    EightPlus,
}

impl SeatBucket {
    pub fn code(self) -> &'static str {
        match self {
            SeatBucket::UpToFive => "<=5",
            SeatBucket::SixToSeven => "6-7",
            SeatBucket::EightPlus => "8+",
        }
    }

    // Vehicles with no recorded seats (<= 0) never fall into a bucket.
    pub fn contains(self, seats: i64) -> bool {
        match self {
            SeatBucket::UpToFive => (1..=5).contains(&seats),
            SeatBucket::SixToSeven => (6..=7).contains(&seats),
            SeatBucket::EightPlus => seats >= 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionFilter {
    Auto,
    Manual,
}

impl TransmissionFilter {
    pub fn code(self) -> &'static str {
        match self {
            TransmissionFilter::Auto => "auto",
            TransmissionFilter::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PopularOptions {
    pub free_cancel: bool,
    pub instant_confirm: bool,
    pub delivery: bool,
}

// Filter panel state. Owned by the caller; `reset` restores the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterState {
    pub seat_bucket: Option<SeatBucket>,
    pub transmission: Option<TransmissionFilter>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub popular: PopularOptions,
    pub search: String,
}

impl FilterState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    // Lower-cased trimmed free-text query, if any.
    pub fn search_term(&self) -> Option<String> {
        let term = self.search.trim().to_lowercase();
        (!term.is_empty()).then_some(term)
    }
}

// Body of POST /api/vehicles
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchRequest {
    pub intent: BookingIntent,
    pub filters: FilterState,
}

// What the storefront renders for one search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCard {
    pub key: String,
    pub name: String,
    pub brand: String,
    pub seats: i64,
    pub transmission: String,
    pub price_per_day: f64,
    pub image_url: String,
    pub available: bool,
}

impl VehicleCard {
    pub fn from_vehicle(vehicle: &Vehicle, origin: &str, placeholder: &str) -> Self {
        Self {
            key: normalize::key(vehicle),
            name: normalize::display_name(vehicle),
            brand: normalize::brand(vehicle),
            seats: normalize::seats(vehicle),
            transmission: normalize::transmission(vehicle),
            price_per_day: normalize::daily_price(vehicle),
            image_url: normalize::image_url(vehicle, origin, placeholder),
            available: normalize::is_available(vehicle),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub count: usize,
    pub vehicles: Vec<VehicleCard>,
    // Raw body text when the ERP answered 2xx with something that was not JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

// Profile cached in cookies after login; pre-paint only, never used for access decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_buckets_cover_expected_ranges() {
        assert!(SeatBucket::UpToFive.contains(1));
        assert!(SeatBucket::UpToFive.contains(5));
        assert!(!SeatBucket::UpToFive.contains(0));
        assert!(!SeatBucket::UpToFive.contains(6));
        assert!(SeatBucket::SixToSeven.contains(7));
        assert!(!SeatBucket::SixToSeven.contains(8));
        assert!(SeatBucket::EightPlus.contains(12));
        assert!(!SeatBucket::EightPlus.contains(-1));
    }

    #[test]
    fn filter_state_deserializes_bucket_codes() {
        let filters: FilterState =
            serde_json::from_str(r#"{"seat_bucket":"6-7","transmission":"manual","search":" Civic "}"#)
                .unwrap();
        assert_eq!(filters.seat_bucket, Some(SeatBucket::SixToSeven));
        assert_eq!(filters.transmission, Some(TransmissionFilter::Manual));
        assert_eq!(filters.search_term().as_deref(), Some("civic"));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut filters = FilterState {
            seat_bucket: Some(SeatBucket::EightPlus),
            min_price: Some(500.0),
            search: "van".into(),
            ..FilterState::default()
        };
        assert!(filters.is_active());
        filters.reset();
        assert!(!filters.is_active());
        assert_eq!(filters.search_term(), None);
    }
}
