//! End-to-end handler tests: the axum router driven with `oneshot`, the ERP mocked by `wiremock`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vrent_storefront::admin_gate::{MSG_NO_USER, MSG_NOT_ADMIN};
use vrent_storefront::auth_middleware;
use vrent_storefront::config::Settings;
use vrent_storefront::models::CachedProfile;
use vrent_storefront::routes::SEARCH_CONSUMER_HEADER;
use vrent_storefront::{AppState, routes};

const COOKIE_SECRET: &str = "vrent-storefront-test-cookie-secret-0123456789abcdefghijklmnopqrstuvwxyz";

fn settings(server: &MockServer) -> Settings {
    Settings {
        admin_gate_min_delay_ms: 0,
        cookie_secret: COOKIE_SECRET.into(),
        ..Settings::with_erp(server.uri())
    }
}

fn app(server: &MockServer) -> Router {
    let state = AppState::from_settings(settings(server)).expect("failed to build app state");
    routes::create_router(state)
}

// Set-Cookie values of a response, replayed as a request Cookie header.
fn cookie_header(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

// Profile cookies as the server would have issued them at login.
fn session_cookie(user: &str) -> String {
    let profile = CachedProfile {
        user_id: Some(user.into()),
        display_name: Some("Ops".into()),
        email: Some(user.into()),
        is_admin: false,
    };
    let jar = PrivateCookieJar::new(Key::from(COOKIE_SECRET.as_bytes()));
    cookie_header(&auth_middleware::store_profile(jar, &profile).into_response())
}

fn search_as(consumer: &str, passengers: u32) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/vehicles")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SEARCH_CONSUMER_HEADER, consumer)
        .body(Body::from(json!({"intent": {"passengers": passengers}}).to_string()))
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_as(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::COOKIE, session_cookie(user));
    }
    builder.body(Body::empty()).expect("request")
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn mount_roles(server: &MockServer, user: &str, roles: Value) {
    Mock::given(method("GET"))
        .and(path(Settings::default().user_info_path))
        .and(query_param("user", user))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": { "roles": roles } })))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Vehicle search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vehicle_search_applies_filters_to_erp_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Settings::default().search_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": [
            {"license_plate": "A1", "brand": "Toyota", "model": "Yaris", "seats": 5, "transmission": "Auto", "price_per_day": 900},
            {"license_plate": "A2", "brand": "Honda", "model": "Civic", "seats": 5, "gear": "Manual", "rate": "1200"},
            {"license_plate": "A3", "brand": "Toyota", "model": "Commuter", "seats": 12, "transmission": "manual", "price": 2500, "status": "Rented"},
        ]})))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post_json(
            "/api/vehicles",
            json!({"intent": {"passengers": 2}, "filters": {"transmission": "manual"}}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["count"], 1, "A3 is rented, A1 is automatic");
    assert_eq!(body["vehicles"][0]["key"], "A2");
    assert_eq!(body["vehicles"][0]["price_per_day"], 1200.0);
}

#[tokio::test]
async fn vehicle_search_surfaces_erp_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Settings::default().search_path))
        .respond_with(ResponseTemplate::new(500).set_body_string("Traceback"))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post_json("/api/vehicles", json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["status"], 500);
}

#[tokio::test]
async fn newer_search_from_same_consumer_wins() {
    let server = MockServer::start().await;
    let search_path = Settings::default().search_path;
    Mock::given(method("POST"))
        .and(path(search_path.clone()))
        .and(body_partial_json(json!({"passengers": 1})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": [{"license_plate": "A1", "brand": "Toyota"}]}))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(search_path))
        .and(body_partial_json(json!({"passengers": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": [
            {"license_plate": "B1", "brand": "Honda"},
            {"license_plate": "B2", "brand": "Mazda"}
        ]})))
        .mount(&server)
        .await;

    let state = AppState::from_settings(settings(&server)).expect("failed to build app state");
    let searches = state.searches.clone();
    let app = routes::create_router(state);

    let older = tokio::spawn(app.clone().oneshot(search_as("tab-1", 1)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let newer = app.oneshot(search_as("tab-1", 2)).await.expect("response");

    let older = older.await.expect("older task").expect("response");
    assert_eq!(older.status(), StatusCode::NO_CONTENT);
    assert_eq!(newer.status(), StatusCode::OK);
    let body = json_body(newer).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["vehicles"][0]["key"], "B1");
    assert_eq!(body["vehicles"][1]["key"], "B2");
    assert!(searches.is_empty(), "finished consumers are released");
}

#[tokio::test]
async fn erp_session_of_one_visitor_is_not_reused_for_another() {
    let server = MockServer::start().await;
    let defaults = Settings::default();
    Mock::given(method("POST"))
        .and(path(defaults.login_path.clone()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=alice-session; Path=/")
                .set_body_json(json!({"message": {"full_name": "Alice", "user": "alice@vrent.co"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(defaults.search_path.clone()))
        .and(header_exists("cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": [{"license_plate": "LEAKED"}]})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(defaults.search_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": [{"license_plate": "P1"}]})))
        .mount(&server)
        .await;
    let app = app(&server);

    let login = app
        .clone()
        .oneshot(post_json("/api/login", json!({"email": "alice@vrent.co", "password": "pw"})))
        .await
        .expect("response");
    assert_eq!(login.status(), StatusCode::OK);

    let search = app.oneshot(post_json("/api/vehicles", json!({}))).await.expect("response");
    assert_eq!(search.status(), StatusCode::OK);
    let body = json_body(search).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["vehicles"][0]["key"], "P1");
}

// ---------------------------------------------------------------------------
// Booking quote
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quote_moves_return_forward_and_prices_extras() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(post_json(
            "/api/booking/quote",
            json!({
                "draft": {
                    "pickup_location": "Don Mueang",
                    "pickup_date": "2025-01-10", "pickup_time": "10:00",
                    "return_date": "2025-01-10", "return_time": "09:00",
                    "extras": {"gps": true}
                },
                "car": {"key": "A2", "name": "Honda Civic", "price_per_day": 1200.0}
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["return_adjusted"], true);
    assert_eq!(body["draft"]["return_date"], "2025-01-11");
    assert_eq!(body["days"], 1);
    assert_eq!(body["total"], 1300.0);
    assert_eq!(body["pickup_at"], "2025-01-10T03:00:00+00:00");
    assert!(body["summary_url"].as_str().unwrap().starts_with("/booking/summary?car=A2"));
}

#[tokio::test]
async fn quote_with_missing_fields_is_rejected() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(post_json("/api/booking/quote", json!({"draft": {"pickup_date": "2025-01-10"}})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = json_body(response).await["error"].as_str().unwrap().to_string();
    assert!(message.contains("pickup_location"));
}

// ---------------------------------------------------------------------------
// Login, signup, logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_sets_profile_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Settings::default().login_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"full_name": "Somchai", "user": "somchai@vrent.co", "is_admin": "1"}
        })))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post_json("/api/login", json!({"email": "somchai@vrent.co", "password": "pw"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = cookie_header(&response);
    for name in ["vrent_user=", "vrent_name=", "vrent_admin="] {
        assert!(cookies.contains(name), "missing {name} in {cookies}");
    }
    assert!(!cookies.contains("Somchai"), "profile values are encrypted");
    assert!(!cookies.contains("somchai@vrent.co"));

    // The issued cookies read back as the cached profile.
    let gate = json_body(
        app(&server)
            .oneshot(get_with_cookie("/api/admin/gate", &cookies))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(gate["cached"]["display_name"], "Somchai");
    assert_eq!(gate["cached"]["user_id"], "somchai@vrent.co");
    assert_eq!(gate["cached"]["is_admin"], true);
}

#[tokio::test]
async fn login_failure_returns_erp_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Settings::default().login_path))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Incorrect password"})))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post_json("/api/login", json!({"email": "a@vrent.co", "password": "bad"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Incorrect password");
}

#[tokio::test]
async fn invalid_signup_never_reaches_erp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(Settings::default().signup_path))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(post_json(
            "/api/signup",
            json!({
                "email": "a@vrent.co", "full_name": "A", "password": "pw123456",
                "confirm_password": "pw123456", "phone": "12345"
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_expires_profile_cookies() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/logout")
                .header(header::COOKIE, "vrent_user=a@vrent.co")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|c| c.starts_with("vrent_"))
        .count();
    assert_eq!(cleared, 4);
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gate_reports_denial_as_state() {
    let server = MockServer::start().await;
    mount_roles(&server, "guest@vrent.co", json!(["Customer"])).await;
    let app = app(&server);

    let anonymous = json_body(app.clone().oneshot(get_as("/api/admin/gate", None)).await.expect("response")).await;
    assert_eq!(anonymous["gate"], json!({"state": "denied", "reason": MSG_NO_USER}));

    let customer = json_body(
        app.oneshot(get_as("/api/admin/gate", Some("guest@vrent.co")))
            .await
            .expect("response"),
    )
    .await;
    assert_eq!(customer["gate"]["reason"], MSG_NOT_ADMIN);
    assert_eq!(customer["cached"]["display_name"], "Ops");
}

#[tokio::test]
async fn admin_listings_require_a_verified_admin() {
    let server = MockServer::start().await;
    mount_roles(&server, "guest@vrent.co", json!(["Customer"])).await;
    mount_roles(&server, "ops@vrent.co", json!([{"role": "Administrator"}])).await;
    Mock::given(method("GET"))
        .and(path(Settings::default().bookings_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": {"bookings": [
            {"name": "BK-1", "customer_name": "Anan", "grand_total": "3600"}
        ]}})))
        .mount(&server)
        .await;
    let app = app(&server);

    let anonymous = app.clone().oneshot(get_as("/api/admin/bookings", None)).await.expect("response");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let customer = app
        .clone()
        .oneshot(get_as("/api/admin/bookings", Some("guest@vrent.co")))
        .await
        .expect("response");
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);

    let admin = app
        .oneshot(get_as("/api/admin/bookings", Some("ops@vrent.co")))
        .await
        .expect("response");
    assert_eq!(admin.status(), StatusCode::OK);
    let rows = json_body(admin).await;
    assert_eq!(rows[0]["id"], "BK-1");
    assert_eq!(rows[0]["total"], 3600.0);
}

#[tokio::test]
async fn hand_written_profile_cookie_is_not_trusted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(Settings::default().user_info_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": {"roles": ["Administrator"]}})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(Settings::default().bookings_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": []})))
        .expect(0)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(get_with_cookie(
            "/api/admin/bookings",
            "vrent_user=Administrator; vrent_admin=1; vrent_name=Admin",
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], MSG_NO_USER);
}

#[tokio::test]
async fn dashboard_shows_failed_section_as_empty() {
    let server = MockServer::start().await;
    let defaults = Settings::default();
    mount_roles(&server, "ops@vrent.co", json!(["System Manager"])).await;
    Mock::given(method("GET"))
        .and(path(defaults.vehicles_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": [
            {"license_plate": "A1", "status": "Available"},
            {"license_plate": "A2", "status": "Rented"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(defaults.bookings_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": {"bookings": []}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(defaults.deliveries_path.clone()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(get_as("/api/admin/dashboard", Some("ops@vrent.co")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["summary"]["vehicles_total"], 2);
    assert_eq!(body["summary"]["vehicles_available"], 1);
    assert_eq!(body["deliveries"], json!([]));
    assert_eq!(body["failed_sections"], json!(["deliveries"]));
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_page_renders_selected_car() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(get_as(
            "/booking/summary?car=A2&name=Honda+Civic&price=1200&pickup_at=2025-01-10T03%3A00%3A00%2B00%3A00&return_at=2025-01-11T03%3A00%3A00%2B00%3A00&extras=gps&days=1&total=1300",
            None,
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("Honda Civic"));
    assert!(html.contains("10:00"), "pickup shown in local time");
}

#[tokio::test]
async fn landing_page_renders_for_anonymous_visitor() {
    let server = MockServer::start().await;
    let response = app(&server).oneshot(get_as("/", None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
