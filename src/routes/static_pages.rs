use askama::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::{
    AppState,
    auth_middleware::CachedUser,
    booking::{CHILD_SEAT_PER_DAY, FULL_INSURANCE_PER_DAY, GPS_PER_DAY},
    error::AppError,
};

const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    display_name: String,
    signed_in: bool,
}

#[derive(Template)]
#[template(path = "summary.html")]
struct SummaryTemplate {
    car_name: String,
    price_per_day: f64,
    pickup_at: String,
    return_at: String,
    pickup_location: String,
    return_location: String,
    extras: Vec<(String, f64)>,
    days: i64,
    total: f64,
}

#[derive(Template)]
#[template(path = "admin.html")]
struct AdminTemplate {
    // Pre-paint only; the page asks /api/admin/gate before showing anything
    display_name: String,
}

// Query string written by `booking::summary_url`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryParams {
    pub car: String,
    pub name: String,
    pub price: f64,
    pub pickup_at: String,
    pub return_at: String,
    pub pickup_location: String,
    pub return_location: String,
    pub extras: String,
    pub days: i64,
    pub total: f64,
}

fn render(template: &impl Template, page: &str) -> Result<Html<String>, AppError> {
    match template.render() {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            tracing::error!("Failed to render {} template: {}", page, e);
            Err(AppError::InternalServerError(anyhow::Error::new(e)))
        }
    }
}

fn local_display(instant: &str, tz: &FixedOffset) -> String {
    DateTime::parse_from_rfc3339(instant)
        .map(|at| at.with_timezone(tz).format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|_| instant.to_string())
}

fn extra_lines(codes: &str) -> Vec<(String, f64)> {
    codes
        .split(',')
        .filter_map(|code| match code.trim() {
            "child_seat" => Some(("คาร์ซีทเด็ก".to_string(), CHILD_SEAT_PER_DAY)),
            "gps" => Some(("GPS".to_string(), GPS_PER_DAY)),
            "full_insurance" => Some(("ประกันภัยเต็มรูปแบบ".to_string(), FULL_INSURANCE_PER_DAY)),
            _ => None,
        })
        .collect()
}

pub async fn landing_page(CachedUser(cached): CachedUser) -> Result<impl IntoResponse, AppError> {
    let template = LandingTemplate {
        signed_in: cached.user_id.is_some(),
        display_name: cached.display_name.or(cached.email).unwrap_or_default(),
    };
    render(&template, "landing")
}

pub async fn booking_summary(
    State(app_state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.car.trim().is_empty() {
        return Err(AppError::BadRequest("ไม่พบข้อมูลรถที่เลือก".into()));
    }
    let tz = app_state.settings.timezone();
    let template = SummaryTemplate {
        car_name: if params.name.is_empty() { params.car.clone() } else { params.name.clone() },
        price_per_day: params.price,
        pickup_at: local_display(&params.pickup_at, &tz),
        return_at: local_display(&params.return_at, &tz),
        pickup_location: params.pickup_location,
        return_location: params.return_location,
        extras: extra_lines(&params.extras),
        days: params.days.max(1),
        total: params.total,
    };
    render(&template, "summary")
}

pub async fn admin_page(CachedUser(cached): CachedUser) -> Result<impl IntoResponse, AppError> {
    let template = AdminTemplate {
        display_name: cached.display_name.unwrap_or_default(),
    };
    render(&template, "admin")
}
