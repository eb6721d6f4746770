// Admin API: gate status, back-office listings and the dashboard

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::{
    AppState,
    admin_gate::AdminSession,
    auth_middleware::{AdminUser, CachedUser},
    dashboard,
    error::AppResult,
    listings::{self, ListingKind},
};

// Always answers 200; a denial is a gate state, not an HTTP error.
pub async fn gate_status(
    State(app_state): State<AppState>,
    CachedUser(cached): CachedUser,
) -> impl IntoResponse {
    let session = AdminSession::optimistic(cached);
    let gate = app_state.gate.check(session.cached.user_id.as_deref()).await;
    Json(session.confirm(gate))
}

pub async fn list_vehicles(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!(user_id = %admin.user_id, "[HANDLER] /api/admin/vehicles");
    let records = app_state.erp.list(ListingKind::Vehicles).await?;
    Ok(Json(listings::vehicle_rows(records, &app_state.settings)))
}

pub async fn list_bookings(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!(user_id = %admin.user_id, "[HANDLER] /api/admin/bookings");
    let records = app_state.erp.list(ListingKind::Bookings).await?;
    Ok(Json(listings::booking_rows(&records)))
}

pub async fn list_deliveries(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<impl IntoResponse> {
    tracing::info!(user_id = %admin.user_id, "[HANDLER] /api/admin/deliveries");
    let records = app_state.erp.list(ListingKind::Deliveries).await?;
    Ok(Json(listings::delivery_rows(&records)))
}

pub async fn get_dashboard(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> impl IntoResponse {
    tracing::info!(user_id = %admin.user_id, "[HANDLER] /api/admin/dashboard");
    Json(dashboard::load(&app_state.erp).await)
}
