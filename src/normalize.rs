//! Field normalization for loosely-typed vehicle records.
//!
//! The ERP backend has renamed most vehicle attributes at least once, so a
//! record may carry `seats`, `seat_count` or `capacity` for the same value.
//! Every read of a vehicle attribute goes through this module; the candidate
//! key lists below are the only place those alternate names are spelled out.

use serde_json::{Map, Value};

use crate::models::Vehicle;

const KEY_FIELDS: &[&str] = &["license_plate", "plate", "name"];
const SEAT_FIELDS: &[&str] = &[
    "seats",
    "seat",
    "seat_count",
    "seating_capacity",
    "number_of_seats",
    "capacity",
];
const TRANSMISSION_FIELDS: &[&str] = &["transmission", "gear", "gear_type", "trans"];
const PRICE_FIELDS: &[&str] = &["price_per_day", "daily_rate", "rate", "price"];
const STATUS_FIELDS: &[&str] = &["status", "vehicle_status", "availability"];
const AVAILABLE_FLAGS: &[&str] = &["available", "is_available"];
const OCCUPIED_FLAGS: &[&str] = &["rented", "is_rented", "busy", "is_busy"];
const IMAGE_FIELDS: &[&str] = &["image", "image_url", "main_image", "thumbnail", "photo"];
const IMAGE_LIST_FIELD: &str = "images";
const BRAND_FIELDS: &[&str] = &["brand", "make"];
const MODEL_FIELDS: &[&str] = &["model", "vehicle_name", "name"];
const TITLE_FIELDS: &[&str] = &["title", "display_name"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "details"];

const STATUS_AVAILABLE: &str = "available";
const STATUS_AVAILABLE_TH: &str = "ว่าง";

/// First candidate key whose value is present and not `null`.
pub(crate) fn first_defined<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Numeric coercion: JSON numbers pass through, numeric strings are parsed.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Scalar rendered as text; objects and arrays have no text form.
pub(crate) fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose boolean as the ERP sends it: `true`, `1`, `"true"`, `"1"`, `"yes"`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n == 1.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

pub(crate) fn text_field(record: &Map<String, Value>, keys: &[&str]) -> String {
    first_defined(record, keys)
        .and_then(coerce_text)
        .unwrap_or_default()
}

pub fn seats(vehicle: &Vehicle) -> i64 {
    first_defined(&vehicle.0, SEAT_FIELDS)
        .and_then(coerce_number)
        .map_or(0, |n| n.trunc() as i64)
}

pub fn transmission(vehicle: &Vehicle) -> String {
    first_defined(&vehicle.0, TRANSMISSION_FIELDS)
        .and_then(coerce_text)
        .map(|t| t.trim().to_lowercase())
        .unwrap_or_default()
}

pub fn daily_price(vehicle: &Vehicle) -> f64 {
    first_defined(&vehicle.0, PRICE_FIELDS)
        .and_then(coerce_number)
        .unwrap_or(0.0)
}

/// Whether the vehicle can be offered. Unknown status counts as available.
pub fn is_available(vehicle: &Vehicle) -> bool {
    let status = first_defined(&vehicle.0, STATUS_FIELDS)
        .and_then(coerce_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if let Some(status) = status {
        return status.eq_ignore_ascii_case(STATUS_AVAILABLE) || status == STATUS_AVAILABLE_TH;
    }

    if let Some(flag) = first_defined(&vehicle.0, AVAILABLE_FLAGS) {
        return is_truthy(flag);
    }
    if let Some(flag) = first_defined(&vehicle.0, OCCUPIED_FLAGS) {
        return !is_truthy(flag);
    }
    true
}

fn non_empty_str(value: &Value) -> Option<&str> {
    let s = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("url").and_then(Value::as_str)?,
        _ => return None,
    };
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn raw_image(record: &Map<String, Value>) -> Option<&str> {
    IMAGE_FIELDS
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(non_empty_str)
        .or_else(|| {
            record
                .get(IMAGE_LIST_FIELD)
                .and_then(Value::as_array)
                .and_then(|images| images.first())
                .and_then(non_empty_str)
        })
}

/// Resolves an image reference against the ERP origin.
pub fn resolve_image_url(raw: Option<&str>, origin: &str, placeholder: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return placeholder.to_string();
    };

    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else if raw.starts_with("//") {
        format!("https:{raw}")
    } else if raw.starts_with('/') {
        format!("{origin}{raw}")
    } else {
        format!("{origin}/{raw}")
    }
}

pub fn image_url(vehicle: &Vehicle, origin: &str, placeholder: &str) -> String {
    resolve_image_url(raw_image(&vehicle.0), origin, placeholder)
}

pub fn key(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, KEY_FIELDS)
}

pub fn brand(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, BRAND_FIELDS)
}

pub fn model(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, MODEL_FIELDS)
}

pub fn title(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, TITLE_FIELDS)
}

pub fn status(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, STATUS_FIELDS)
}

pub fn description(vehicle: &Vehicle) -> String {
    text_field(&vehicle.0, DESCRIPTION_FIELDS)
}

/// Card heading: explicit title, else "brand model", else the key.
pub fn display_name(vehicle: &Vehicle) -> String {
    let title = title(vehicle);
    if !title.trim().is_empty() {
        return title;
    }
    let joined = format!("{} {}", brand(vehicle), model(vehicle));
    let joined = joined.trim();
    if joined.is_empty() {
        key(vehicle)
    } else {
        joined.to_string()
    }
}
