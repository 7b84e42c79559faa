//! Domain service for weather readings: ingestion, queries, exports and
//! insights.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{NewWeatherLog, WeatherLog};
use crate::domain::weather::{Page, PageRequest, WeatherFilter};
use crate::services::export::{ExportFile, ExportFormat};
use crate::services::insights::WeatherInsights;

/// Errors specific to weather operations.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather log not found")]
    NotFound,

    #[error("Weather log with this ID already exists")]
    Duplicate,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for WeatherError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for WeatherError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherLogDto {
    pub id: Uuid,
    pub external_id: String,
    pub fetched_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WeatherLog> for WeatherLogDto {
    fn from(model: WeatherLog) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            fetched_at: model.fetched_at,
            latitude: model.latitude,
            longitude: model.longitude,
            temperature: model.temperature,
            humidity: model.humidity,
            precipitation_probability: model.precipitation_probability,
            source: model.source,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Domain service trait for weather readings.
#[async_trait::async_trait]
pub trait WeatherService: Send + Sync {
    /// Stores a reading from the ingestion worker.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Duplicate`] if the external id is already
    /// stored; the existing reading is left untouched.
    async fn ingest(&self, log: NewWeatherLog) -> Result<WeatherLogDto, WeatherError>;

    /// Every reading, newest first.
    async fn list_all(&self) -> Result<Vec<WeatherLogDto>, WeatherError>;

    async fn find(
        &self,
        filter: WeatherFilter,
        request: PageRequest,
    ) -> Result<Page<WeatherLogDto>, WeatherError>;

    async fn get(&self, id: Uuid) -> Result<WeatherLogDto, WeatherError>;

    async fn get_by_external_id(&self, external_id: &str) -> Result<WeatherLogDto, WeatherError>;

    /// Statistics over the matching readings, with an LLM narrative when one
    /// can be produced in time. Generator failures never surface here.
    async fn insights(&self, filter: WeatherFilter) -> Result<WeatherInsights, WeatherError>;

    /// All matching readings rendered as a spreadsheet, without pagination.
    async fn export(
        &self,
        filter: WeatherFilter,
        format: ExportFormat,
    ) -> Result<ExportFile, WeatherError>;
}
