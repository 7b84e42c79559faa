use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthUser;
use super::validation::{
    parse_timestamp, validate_coordinates, validate_finite, validate_page_request, validate_range,
};
use super::{ApiError, ApiResponse, AppState};
use crate::db::NewWeatherLog;
use crate::domain::weather::{Page, WeatherFilter};
use crate::services::export::ExportFormat;
use crate::services::{WeatherError, WeatherInsights, WeatherLogDto};

const DEFAULT_SOURCE: &str = "OpenMeteo";

/// Body posted by the ingestion worker. Both its snake_case keys and the
/// camelCase spelling are accepted; unknown keys are ignored.
#[derive(Debug, Deserialize)]
pub struct CreateWeatherLogRequest {
    #[serde(alias = "externalId")]
    pub id: String,
    #[serde(alias = "fetchedAt")]
    pub fetched_at: String,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default, alias = "precipitationProbability")]
    pub precipitation_probability: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl WeatherQuery {
    fn filter(&self) -> Result<WeatherFilter, ApiError> {
        let start_date = self
            .start_date
            .as_deref()
            .map(|raw| parse_timestamp("startDate", raw, false))
            .transpose()?;
        let end_date = self
            .end_date
            .as_deref()
            .map(|raw| parse_timestamp("endDate", raw, true))
            .transpose()?;

        let finite = |field: &str, value: Option<f64>| {
            value.map(|v| validate_finite(field, v)).transpose()
        };
        let min_temp = finite("minTemp", self.min_temp)?;
        let max_temp = finite("maxTemp", self.max_temp)?;
        let min_humidity = finite("minHumidity", self.min_humidity)?;
        let max_humidity = finite("maxHumidity", self.max_humidity)?;

        validate_range("date", start_date, end_date)?;
        validate_range("temperature", min_temp, max_temp)?;
        validate_range("humidity", min_humidity, max_humidity)?;

        Ok(WeatherFilter {
            start_date,
            end_date,
            min_temp,
            max_temp,
            min_humidity,
            max_humidity,
        })
    }
}

impl CreateWeatherLogRequest {
    fn into_new_log(self) -> Result<NewWeatherLog, ApiError> {
        let external_id = self.id.trim();
        if external_id.is_empty() {
            return Err(ApiError::validation("id is required"));
        }

        validate_coordinates(self.latitude, self.longitude)?;

        Ok(NewWeatherLog {
            external_id: external_id.to_string(),
            fetched_at: parse_timestamp("fetched_at", &self.fetched_at, false)?,
            latitude: self.latitude,
            longitude: self.longitude,
            temperature: validate_finite("temperature", self.temperature)?,
            humidity: self
                .humidity
                .map(|h| validate_finite("humidity", h))
                .transpose()?,
            precipitation_probability: self
                .precipitation_probability
                .map(|p| validate_finite("precipitation_probability", p))
                .transpose()?,
            source: self
                .source
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        })
    }
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::NotFound => Self::not_found("Weather log"),
            WeatherError::Duplicate => Self::Conflict(err.to_string()),
            WeatherError::Validation(msg) => Self::validation(msg),
            WeatherError::Database(msg) => Self::DatabaseError(msg),
            WeatherError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// POST /weather/logs
/// Called by the ingestion worker; no authentication
pub async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWeatherLogRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WeatherLogDto>>), ApiError> {
    let log = state
        .weather_service()
        .ingest(payload.into_new_log()?)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(log))))
}

/// GET /weather/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<WeatherLogDto>>>, ApiError> {
    let logs = state.weather_service().list_all().await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// GET /weather/logs/filtered
pub async fn filtered_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<ApiResponse<Page<WeatherLogDto>>>, ApiError> {
    let request = validate_page_request(query.page, query.limit)?;
    let filter = query.filter()?;

    let page = state.weather_service().find(filter, request).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /weather/logs/{id}
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<WeatherLogDto>>, ApiError> {
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::validation(format!("Invalid weather log ID: {id}")))?;

    let log = state.weather_service().get(id).await?;
    Ok(Json(ApiResponse::success(log)))
}

/// GET /weather/logs/external/{external_id}
pub async fn get_log_by_external_id(
    State(state): State<Arc<AppState>>,
    Path(external_id): Path<String>,
) -> Result<Json<ApiResponse<WeatherLogDto>>, ApiError> {
    let log = state
        .weather_service()
        .get_by_external_id(&external_id)
        .await?;
    Ok(Json(ApiResponse::success(log)))
}

/// GET /weather/insights
pub async fn insights(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<ApiResponse<WeatherInsights>>, ApiError> {
    let range = query.filter()?;
    let filter = WeatherFilter::time_range(range.start_date, range.end_date);

    let insights = state.weather_service().insights(filter).await?;
    Ok(Json(ApiResponse::success(insights)))
}

/// GET /weather/export/{format}
pub async fn export(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(format): Path<String>,
    Query(query): Query<WeatherQuery>,
) -> Result<Response, ApiError> {
    let format = match format.as_str() {
        "csv" => ExportFormat::Csv,
        "xlsx" => ExportFormat::Xlsx,
        other => {
            return Err(ApiError::validation(format!(
                "Unsupported export format: {other}. Use csv or xlsx"
            )));
        }
    };

    let filter = query.filter()?;
    let file = state.weather_service().export(filter, format).await?;

    tracing::info!(user = %user.id, file = %file.file_name, bytes = file.bytes.len(), "Weather data exported");

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
