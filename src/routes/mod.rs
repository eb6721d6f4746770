// Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

mod admin;
mod api;
mod auth;
mod static_pages;

pub use api::SEARCH_CONSUMER_HEADER;

pub fn create_router(app_state: AppState) -> Router {
    let admin_router = Router::new()
        .route("/gate", get(admin::gate_status))
        .route("/vehicles", get(admin::list_vehicles))
        .route("/bookings", get(admin::list_bookings))
        .route("/deliveries", get(admin::list_deliveries))
        .route("/dashboard", get(admin::get_dashboard));

    let api_router = Router::new()
        .route("/vehicles", post(api::search_vehicles))
        .route("/booking/quote", post(api::booking_quote))
        .route("/login", post(auth::handle_login))
        .route("/signup", post(auth::handle_signup))
        .route("/logout", post(auth::handle_logout))
        .nest("/admin", admin_router);

    Router::new()
        .route("/", get(static_pages::landing_page))
        .route("/booking/summary", get(static_pages::booking_summary))
        .route("/admin", get(static_pages::admin_page))
        .nest("/api", api_router)
        .with_state(app_state)
}
