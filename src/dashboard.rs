// Admin dashboard: independent reports fetched concurrently, each allowed to fail on its own.

use serde::Serialize;
use serde_json::Value;

use crate::erp_api::{ErpClient, ErpError};
use crate::listings::{self, BookingRow, DeliveryRow, ListingKind, VehicleRow};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub vehicles: Vec<VehicleRow>,
    pub bookings: Vec<BookingRow>,
    pub deliveries: Vec<DeliveryRow>,
    pub summary: DashboardSummary,
    // Sections that failed to load and are shown empty
    pub failed_sections: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub vehicles_total: usize,
    pub vehicles_available: usize,
    pub bookings_total: usize,
    pub booking_revenue: f64,
    pub deliveries_total: usize,
    pub deliveries_pending: usize,
}

fn is_finished(status: &str) -> bool {
    matches!(
        status.trim().to_lowercase().as_str(),
        "delivered" | "completed" | "done" | "cancelled" | "ส่งแล้ว"
    )
}

pub fn summarize(vehicles: &[VehicleRow], bookings: &[BookingRow], deliveries: &[DeliveryRow]) -> DashboardSummary {
    DashboardSummary {
        vehicles_total: vehicles.len(),
        vehicles_available: vehicles.iter().filter(|v| v.available).count(),
        bookings_total: bookings.len(),
        booking_revenue: bookings.iter().map(|b| b.total).sum(),
        deliveries_total: deliveries.len(),
        deliveries_pending: deliveries.iter().filter(|d| !is_finished(&d.status)).count(),
    }
}

// A failed section becomes an empty list and is remembered by name.
fn section(
    result: Result<Vec<Value>, ErpError>,
    kind: ListingKind,
    failed: &mut Vec<&'static str>,
) -> Vec<Value> {
    match result {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(section = kind.entity(), error = %e, "Dashboard section failed, showing it empty");
            failed.push(kind.entity());
            Vec::new()
        }
    }
}

pub async fn load(client: &ErpClient) -> Dashboard {
    let (vehicles, bookings, deliveries) = futures::join!(
        client.list(ListingKind::Vehicles),
        client.list(ListingKind::Bookings),
        client.list(ListingKind::Deliveries),
    );

    let mut failed_sections = Vec::new();
    let vehicles = section(vehicles, ListingKind::Vehicles, &mut failed_sections);
    let bookings = section(bookings, ListingKind::Bookings, &mut failed_sections);
    let deliveries = section(deliveries, ListingKind::Deliveries, &mut failed_sections);

    let vehicles = listings::vehicle_rows(vehicles, client.settings());
    let bookings = listings::booking_rows(&bookings);
    let deliveries = listings::delivery_rows(&deliveries);
    let summary = summarize(&vehicles, &bookings, &deliveries);

    tracing::info!(
        vehicles = summary.vehicles_total,
        bookings = summary.bookings_total,
        deliveries = summary.deliveries_total,
        failed = failed_sections.len(),
        "Dashboard loaded"
    );

    Dashboard {
        vehicles,
        bookings,
        deliveries,
        summary,
        failed_sections,
    }
}
