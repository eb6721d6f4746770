// Handlers for the storefront API: vehicle search and booking quotes

use axum::{
    extract::{Json as JsonExtract, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    booking::{self, BookingDraft, CarSelection},
    error::{AppError, AppResult},
    filter,
    models::{SearchRequest, SearchResponse, VehicleCard},
    query,
    search::{SearchOutcome, SearchState},
};

pub const SEARCH_CONSUMER_HEADER: &str = "x-search-consumer";

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub draft: BookingDraft,
    #[serde(default)]
    pub car: Option<CarSelection>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub pickup_at: String,
    pub return_at: String,
    pub days: i64,
    pub total: Option<f64>,
    pub summary_url: Option<String>,
    // True when the return date was moved to the day after pickup
    pub return_adjusted: bool,
    pub draft: BookingDraft,
}

pub async fn search_vehicles(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    JsonExtract(request): JsonExtract<SearchRequest>,
) -> AppResult<Response> {
    let consumer = headers
        .get(SEARCH_CONSUMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    tracing::info!(consumer = ?consumer, filters_active = request.filters.is_active(), "[HANDLER] /api/vehicles");

    let search_query = query::build_query(&request.intent, &request.filters);
    let lease = app_state.searches.lease(consumer.as_deref());
    let outcome = lease.session().submit(search_query).await;
    drop(lease);

    let (vehicles, raw) = match outcome {
        SearchOutcome::Superseded => {
            tracing::info!(consumer = ?consumer, "Search superseded by a newer query");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        SearchOutcome::Completed(SearchState::Ready { vehicles, raw }) => (vehicles, raw),
        SearchOutcome::Completed(SearchState::Failed(failure)) => {
            return Err(AppError::SearchFailed(failure));
        }
        SearchOutcome::Completed(other) => {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "search finished in unexpected state {other:?}"
            )));
        }
    };

    let settings = &app_state.settings;
    let cards: Vec<VehicleCard> = filter::apply(&vehicles, &request.filters)
        .iter()
        .map(|v| VehicleCard::from_vehicle(v, settings.erp_origin(), &settings.placeholder_image))
        .collect();
    tracing::info!(fetched = vehicles.len(), shown = cards.len(), "[HANDLER] /api/vehicles - done");

    Ok(Json(SearchResponse {
        count: cards.len(),
        vehicles: cards,
        raw,
    })
    .into_response())
}

pub async fn booking_quote(
    State(app_state): State<AppState>,
    JsonExtract(QuoteRequest { mut draft, car }): JsonExtract<QuoteRequest>,
) -> AppResult<impl IntoResponse> {
    let tz = app_state.settings.timezone();
    let return_adjusted = draft.normalize_window(&tz);
    let window = draft.validate(&tz)?;
    let days = window.days();

    let (total, summary_url) = match &car {
        Some(car) => (
            Some(booking::total_price(car.price_per_day, days, &draft.extras)),
            Some(booking::summary_url(car, &draft, &window)),
        ),
        None => (None, None),
    };
    tracing::info!(days, return_adjusted, car = ?car.as_ref().map(|c| &c.key), "[HANDLER] /api/booking/quote");

    Ok(Json(QuoteResponse {
        pickup_at: window.pickup_at.to_rfc3339(),
        return_at: window.return_at.to_rfc3339(),
        days,
        total,
        summary_url,
        return_adjusted,
        draft,
    }))
}
