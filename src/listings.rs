//! Admin listings: raw ERP records shaped into table rows.
//!
//! Vehicles reuse the storefront normalizer; bookings and deliveries keep
//! their own candidate key lists here.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::models::Vehicle;
use crate::normalize::{self, coerce_number, first_defined, text_field};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Vehicles,
    Bookings,
    Deliveries,
}

impl ListingKind {
    pub fn entity(self) -> &'static str {
        match self {
            ListingKind::Vehicles => "vehicles",
            ListingKind::Bookings => "bookings",
            ListingKind::Deliveries => "deliveries",
        }
    }

    pub fn path(self, settings: &Settings) -> &str {
        match self {
            ListingKind::Vehicles => &settings.vehicles_path,
            ListingKind::Bookings => &settings.bookings_path,
            ListingKind::Deliveries => &settings.deliveries_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRow {
    pub plate: String,
    pub name: String,
    pub brand: String,
    pub seats: i64,
    pub transmission: String,
    pub price_per_day: f64,
    pub available: bool,
    pub status: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRow {
    pub id: String,
    pub customer: String,
    pub vehicle: String,
    pub pickup_at: String,
    pub return_at: String,
    pub status: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRow {
    pub id: String,
    pub booking: String,
    pub vehicle: String,
    pub address: String,
    pub scheduled_at: String,
    pub driver: String,
    pub status: String,
}

const BOOKING_ID: &[&str] = &["name", "booking_id", "id"];
const BOOKING_CUSTOMER: &[&str] = &["customer_name", "customer", "full_name", "email"];
const BOOKING_VEHICLE: &[&str] = &["vehicle", "license_plate", "car", "vehicle_name"];
const BOOKING_PICKUP: &[&str] = &["pickup_datetime", "pickup_at", "start_date", "from_date"];
const BOOKING_RETURN: &[&str] = &["return_datetime", "return_at", "end_date", "to_date"];
const BOOKING_STATUS: &[&str] = &["status", "booking_status", "docstatus"];
const BOOKING_TOTAL: &[&str] = &["grand_total", "total", "total_amount", "amount"];

const DELIVERY_ID: &[&str] = &["name", "delivery_id", "id"];
const DELIVERY_BOOKING: &[&str] = &["booking", "rental", "reference"];
const DELIVERY_VEHICLE: &[&str] = &["vehicle", "license_plate", "car"];
const DELIVERY_ADDRESS: &[&str] = &["address", "delivery_address", "location"];
const DELIVERY_SCHEDULED: &[&str] = &["scheduled_at", "delivery_datetime", "delivery_date"];
const DELIVERY_DRIVER: &[&str] = &["driver", "driver_name", "assigned_to"];
const DELIVERY_STATUS: &[&str] = &["status", "delivery_status"];

pub fn vehicle_row(vehicle: &Vehicle, origin: &str, placeholder: &str) -> VehicleRow {
    VehicleRow {
        plate: normalize::key(vehicle),
        name: normalize::display_name(vehicle),
        brand: normalize::brand(vehicle),
        seats: normalize::seats(vehicle),
        transmission: normalize::transmission(vehicle),
        price_per_day: normalize::daily_price(vehicle),
        available: normalize::is_available(vehicle),
        status: normalize::status(vehicle),
        image_url: normalize::image_url(vehicle, origin, placeholder),
    }
}

pub fn booking_row(record: &Map<String, Value>) -> BookingRow {
    BookingRow {
        id: text_field(record, BOOKING_ID),
        customer: text_field(record, BOOKING_CUSTOMER),
        vehicle: text_field(record, BOOKING_VEHICLE),
        pickup_at: text_field(record, BOOKING_PICKUP),
        return_at: text_field(record, BOOKING_RETURN),
        status: text_field(record, BOOKING_STATUS),
        total: first_defined(record, BOOKING_TOTAL)
            .and_then(coerce_number)
            .unwrap_or(0.0),
    }
}

pub fn delivery_row(record: &Map<String, Value>) -> DeliveryRow {
    DeliveryRow {
        id: text_field(record, DELIVERY_ID),
        booking: text_field(record, DELIVERY_BOOKING),
        vehicle: text_field(record, DELIVERY_VEHICLE),
        address: text_field(record, DELIVERY_ADDRESS),
        scheduled_at: text_field(record, DELIVERY_SCHEDULED),
        driver: text_field(record, DELIVERY_DRIVER),
        status: text_field(record, DELIVERY_STATUS),
    }
}

pub fn vehicle_rows(records: Vec<Value>, settings: &Settings) -> Vec<VehicleRow> {
    records
        .into_iter()
        .filter_map(Vehicle::from_value)
        .map(|v| vehicle_row(&v, settings.erp_origin(), &settings.placeholder_image))
        .collect()
}

pub fn booking_rows(records: &[Value]) -> Vec<BookingRow> {
    records.iter().filter_map(Value::as_object).map(booking_row).collect()
}

pub fn delivery_rows(records: &[Value]) -> Vec<DeliveryRow> {
    records.iter().filter_map(Value::as_object).map(delivery_row).collect()
}
