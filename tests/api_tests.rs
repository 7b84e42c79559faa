use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use gdash::config::Config;
use gdash::db::{NewWeatherLog, Store};
use gdash::domain::Role;
use gdash::services::{SeaOrmUserService, UserService};
use gdash::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const PASSWORD: &str = "Secret#123";

async fn spawn_app() -> (Router, Store, Config) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config.insights.enabled = false;

    let store = Store::new(&config.general.database_path)
        .await
        .expect("Failed to open store");
    let shared = SharedState::with_generator(config.clone(), store.clone(), None)
        .expect("Failed to build shared state");

    let state = gdash::api::create_app_state(Arc::new(shared), None);
    (gdash::api::router(state), store, config)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Registers an account and returns `(id, token)`.
async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {email}: {body}");

    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["access_token"].as_str().unwrap().to_string(),
    )
}

fn log_at(external_id: &str, hours: i64, temperature: f64) -> NewWeatherLog {
    NewWeatherLog {
        external_id: external_id.to_string(),
        fetched_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours),
        latitude: -23.55,
        longitude: -46.63,
        temperature,
        humidity: Some(60.0),
        precipitation_probability: Some(10.0),
        source: "OpenMeteo".to_string(),
    }
}

#[tokio::test]
async fn test_first_registration_becomes_admin() {
    let (app, _, _) = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/v1/auth/check-first-user", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isFirstUser"], true);

    let (_, admin_token) = register(&app, "Ada", "ada@example.com").await;
    let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let (_, user_token) = register(&app, "Bob", "bob@example.com").await;
    let (_, body) = send(&app, "GET", "/api/v1/auth/me", Some(&user_token), None).await;
    assert_eq!(body["data"]["role"], "user");

    let (_, body) = send(&app, "GET", "/api/v1/auth/check-first-user", None, None).await;
    assert_eq!(body["data"]["isFirstUser"], false);
}

#[tokio::test]
async fn test_login_and_registration_errors() {
    let (app, _, _) = spawn_app().await;
    register(&app, "Ada", "ada@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "Wrong#123" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ADA@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": "Ada 2", "email": "ada@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({ "name": "Weak", "email": "weak@example.com", "password": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _, _) = spawn_app().await;

    let (status, _) = send(&app, "GET", "/api/v1/weather/logs/filtered", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/v1/system/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_user_list_is_admin_only() {
    let (app, _, _) = spawn_app().await;
    let (_, admin_token) = register(&app, "Ada", "ada@example.com").await;
    let (_, user_token) = register(&app, "Bob", "bob@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/users", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Administrator access required");

    let (status, body) = send(&app, "GET", "/api/v1/users?page=1&limit=1", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);

    let (status, body) = send(&app, "GET", "/api/v1/users/name/Bob", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Bob");

    let (status, _) = send(&app, "GET", "/api/v1/users/name/Nobody", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/v1/users/role/user", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/api/v1/users/role/root", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_account_mutation_policy_over_http() {
    let (app, _, _) = spawn_app().await;
    let (admin_id, admin_token) = register(&app, "Ada", "ada@example.com").await;
    let (bob_id, bob_token) = register(&app, "Bob", "bob@example.com").await;
    let (carol_id, _) = register(&app, "Carol", "carol@example.com").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{carol_id}"),
        Some(&bob_token),
        Some(json!({ "name": "Hacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "insufficient privilege");

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/{carol_id}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You do not have permission to access this user.");

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/users/{bob_id}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "cannot delete own account");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{bob_id}"),
        Some(&bob_token),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "cannot change own role");

    // Even the current role may not be sent by a plain user
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{bob_id}"),
        Some(&bob_token),
        Some(json!({ "role": "user", "name": "Bobby" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "cannot change own role");

    let (_, body) = send(&app, "GET", "/api/v1/auth/me", Some(&bob_token), None).await;
    assert_eq!(body["data"]["name"], "Bob");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{bob_id}"),
        Some(&admin_token),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "cannot elevate a user to admin or admin-master via this path"
    );

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/v1/users/{bob_id}"),
        Some(&bob_token),
        Some(json!({ "name": "Robert" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Robert");
    assert_eq!(body["data"]["role"], "user");

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{admin_id}"), Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/users/{bob_id}"), Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "User deleted successfully");

    // A token outlives its account only until the next request
    let (status, _) = send(&app, "GET", "/api/v1/auth/me", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{bob_id}"), Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_master_granted_out_of_band() {
    let (app, store, config) = spawn_app().await;
    let (_, admin_token) = register(&app, "Ada", "ada@example.com").await;
    let (_, carol_token) = register(&app, "Carol", "carol@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/auth/register-admin",
        Some(&admin_token),
        Some(json!({ "name": "Second", "email": "second@example.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "admin");
    let second_id = body["data"]["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "DELETE", &format!("/api/v1/users/{second_id}"), Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "only admin-master may delete administrators");

    let users = SeaOrmUserService::new(store, config.security.clone());
    let promoted = users
        .set_role("carol@example.com", Role::AdminMaster)
        .await
        .unwrap();
    assert_eq!(promoted.role, Role::AdminMaster);

    // Carol's token still claims `user`; the stored role wins
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/users/{second_id}"), Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_validate_user_is_public() {
    let (app, _, _) = spawn_app().await;
    let (id, _) = register(&app, "Ada", "ada@example.com").await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/users/validate/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], true);

    let (status, body) = send(&app, "GET", "/api/v1/users/validate/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isValid"], false);
}

#[tokio::test]
async fn test_ingest_weather_log() {
    let (app, _, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    let payload = json!({
        "id": "2025-01-01T12:00:00Z-sp",
        "fetched_at": "2025-01-01T12:00:00Z",
        "latitude": -23.55,
        "longitude": -46.63,
        "temperature": 27.4,
        "humidity": 71.0,
        "precipitation_probability": 40.0,
        "station": "ignored"
    });

    let (status, body) = send(&app, "POST", "/api/v1/weather/logs", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["externalId"], "2025-01-01T12:00:00Z-sp");
    assert_eq!(body["data"]["source"], "OpenMeteo");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/v1/weather/logs", None, Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Weather log with this ID already exists");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/weather/logs",
        None,
        Some(json!({
            "externalId": "bad-lat",
            "fetchedAt": "2025-01-01T12:00:00Z",
            "latitude": 123.0,
            "longitude": 0.0,
            "temperature": 20.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &format!("/api/v1/weather/logs/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["temperature"], 27.4);

    let (status, _) = send(
        &app,
        "GET",
        "/api/v1/weather/logs/external/2025-01-01T12:00:00Z-sp",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/weather/logs/{}", uuid::Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_filtered_query_pages_matching_records() {
    let (app, store, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    for i in 0..25 {
        let temperature = 20.0 + f64::from(i % 11);
        store.add_weather_log(log_at(&format!("m-{i:02}"), i64::from(i) * 2, temperature)).await.unwrap();
    }
    for i in 0..6 {
        let temperature = if i % 2 == 0 { 19.9 } else { 30.1 };
        store.add_weather_log(log_at(&format!("x-{i}"), i64::from(i) * 2 + 1, temperature)).await.unwrap();
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/weather/logs/filtered?minTemp=20&maxTemp=30&page=2&limit=10",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = body["data"]["data"].as_array().unwrap();
    assert_eq!(data.len(), 10);
    assert_eq!(body["data"]["pagination"]["total"], 25);
    assert_eq!(body["data"]["pagination"]["page"], 2);
    assert_eq!(body["data"]["pagination"]["limit"], 10);
    assert_eq!(body["data"]["pagination"]["totalPages"], 3);

    // Newest first: page 2 holds the 11th to 20th newest matches
    let ids: Vec<&str> = data.iter().map(|r| r["externalId"].as_str().unwrap()).collect();
    let expected: Vec<String> = (5..15).rev().map(|i| format!("m-{i:02}")).collect();
    assert_eq!(ids, expected);

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/weather/logs/filtered?minTemp=20&maxTemp=30&page=3&limit=10",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"].as_array().unwrap().len(), 5);

    let (status, body) = send(&app, "GET", "/api/v1/weather/logs/filtered?page=10", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["data"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 31);

    let (status, body) = send(&app, "GET", "/api/v1/weather/logs", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 31);
}

#[tokio::test]
async fn test_filtered_query_rejects_bad_parameters() {
    let (app, _, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    for query in [
        "limit=101",
        "limit=0",
        "page=0",
        "minTemp=30&maxTemp=20",
        "startDate=yesterday",
        "startDate=2025-02-01&endDate=2025-01-01",
        "minTemp=NaN",
        "maxTemp=inf",
        "minHumidity=-inf&maxHumidity=50",
    ] {
        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/v1/weather/logs/filtered?{query}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_date_only_end_bound_covers_whole_day() {
    let (app, store, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    let last_moment = Utc.with_ymd_and_hms(2025, 1, 1, 23, 59, 59).unwrap()
        + Duration::microseconds(999_500);
    store
        .add_weather_log(NewWeatherLog {
            fetched_at: last_moment,
            ..log_at("late", 0, 22.0)
        })
        .await
        .unwrap();
    store.add_weather_log(log_at("next-day", 24, 22.0)).await.unwrap();

    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/weather/logs/filtered?startDate=2025-01-01&endDate=2025-01-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = body["data"]["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["externalId"], "late");
}

#[tokio::test]
async fn test_insights_without_data() {
    let (app, _, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    let (status, body) = send(&app, "GET", "/api/v1/weather/insights", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["totalRecords"], 0);
    assert_eq!(body["data"]["trends"]["temperatureTrend"], "stable");
    assert!(body["data"]["aiInsights"].is_null());
}

#[tokio::test]
async fn test_insights_over_stored_data() {
    let (app, store, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    for (i, temperature) in [20.0, 22.0, 30.0, 32.0].into_iter().enumerate() {
        let hours = i64::try_from(i).unwrap();
        store.add_weather_log(log_at(&format!("i-{i}"), hours, temperature)).await.unwrap();
    }

    let (status, body) = send(&app, "GET", "/api/v1/weather/insights", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["totalRecords"], 4);
    assert_eq!(body["data"]["summary"]["avgTemperature"], 26.0);
    assert_eq!(body["data"]["trends"]["temperatureTrend"], "increasing");
    assert!(body["data"]["aiInsights"].is_null());
}

#[tokio::test]
async fn test_export_csv_attachment() {
    let (app, store, _) = spawn_app().await;
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    store.add_weather_log(log_at("e-1", 0, 21.5)).await.unwrap();
    store.add_weather_log(log_at("e-2", 1, 35.0)).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/weather/export/csv?maxTemp=30")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"weather-data-"));
    assert!(disposition.ends_with(".csv\""));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ID,Fetched At"));
    assert!(lines[1].starts_with("e-1,"));

    let (status, _) = send(&app, "GET", "/api/v1/weather/export/pdf", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
