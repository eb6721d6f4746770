//! Outbound search request body.
//!
//! `build_query` is a pure function of the booking intent and the filter
//! panel, so rebuilding from equal inputs yields an equal query.

use serde::Serialize;

use crate::models::{BookingIntent, FilterState};

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub pickup_at: String,
    pub return_at: String,
    pub passengers: u32,
    pub promo: String,
    pub vehicle_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_bucket: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,

    #[serde(skip_serializing_if = "is_false")]
    pub free_cancel: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub instant_confirm: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub delivery: bool,
}

pub fn build_query(intent: &BookingIntent, filters: &FilterState) -> SearchQuery {
    SearchQuery {
        pickup_at: intent.pickup_at.clone(),
        return_at: intent.return_at.clone(),
        passengers: intent.passengers,
        promo: intent.promo.trim().to_string(),
        vehicle_type: intent.vehicle_type.clone().unwrap_or_default(),
        seat_bucket: filters.seat_bucket.map(|bucket| bucket.code()),
        trans: filters.transmission.map(|t| t.code()),
        min_price: filters.min_price.filter(|p| p.is_finite()),
        max_price: filters.max_price.filter(|p| p.is_finite()),
        free_cancel: filters.popular.free_cancel,
        instant_confirm: filters.popular.instant_confirm,
        delivery: filters.popular.delivery,
    }
}
