//! Client-side filter pipeline.
//!
//! The backend receives the same filters through the search query, but its
//! answer is not trusted: this pass is authoritative for what gets displayed.

use crate::models::{FilterState, TransmissionFilter, Vehicle};
use crate::normalize;

fn matches_search(vehicle: &Vehicle, term: &str) -> bool {
    let brand = normalize::brand(vehicle);
    let model = normalize::model(vehicle);
    // Users often type brand and model with no separator ("toyotayaris").
    let glued = format!("{brand}{model}");
    let title = normalize::title(vehicle);
    let description = normalize::description(vehicle);
    let fields = [&brand, &model, &glued, &title, &description];
    fields.iter().any(|field| field.to_lowercase().contains(term))
}

fn matches_transmission(vehicle: &Vehicle, wanted: TransmissionFilter) -> bool {
    let value = normalize::transmission(vehicle);
    if value.is_empty() {
        return true;
    }
    match wanted {
        TransmissionFilter::Auto => {
            value.contains("auto") || value == "at" || value.contains("อัตโนมัติ")
        }
        TransmissionFilter::Manual => {
            value.contains("manual") || value == "mt" || value.contains("ธรรมดา")
        }
    }
}

fn matches_price(vehicle: &Vehicle, min: Option<f64>, max: Option<f64>) -> bool {
    let price = normalize::daily_price(vehicle);
    min.is_none_or(|min| price >= min) && max.is_none_or(|max| price <= max)
}

/// Whether a single vehicle survives every stage of the pipeline.
pub fn keep(vehicle: &Vehicle, filters: &FilterState, term: Option<&str>) -> bool {
    if !normalize::is_available(vehicle) {
        return false;
    }
    if let Some(term) = term {
        if !matches_search(vehicle, term) {
            return false;
        }
    }
    if let Some(bucket) = filters.seat_bucket {
        if !bucket.contains(normalize::seats(vehicle)) {
            return false;
        }
    }
    if let Some(wanted) = filters.transmission {
        if !matches_transmission(vehicle, wanted) {
            return false;
        }
    }
    matches_price(vehicle, filters.min_price, filters.max_price)
}

/// Availability, free text, seat bucket, transmission, then price range.
pub fn apply(vehicles: &[Vehicle], filters: &FilterState) -> Vec<Vehicle> {
    let term = filters.search_term();
    let kept: Vec<Vehicle> = vehicles
        .iter()
        .filter(|vehicle| keep(vehicle, filters, term.as_deref()))
        .cloned()
        .collect();
    tracing::debug!(input = vehicles.len(), output = kept.len(), "Filter pipeline applied");
    kept
}
