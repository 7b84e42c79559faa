use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use uuid::Uuid;

use crate::domain::weather::{PageRequest, WeatherFilter};
use crate::entities::{prelude::*, weather_logs};

/// A reading as delivered by the ingestion worker.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeatherLog {
    pub external_id: String,
    pub fetched_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub source: String,
}

pub struct WeatherRepository {
    conn: DatabaseConnection,
}

impl WeatherRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a reading. Never overwrites: a repeated `external_id` fails
    /// with a unique constraint violation.
    pub async fn create(&self, log: NewWeatherLog) -> Result<weather_logs::Model> {
        let now = Utc::now();
        let active = weather_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            external_id: Set(log.external_id),
            fetched_at: Set(log.fetched_at),
            latitude: Set(log.latitude),
            longitude: Set(log.longitude),
            temperature: Set(log.temperature),
            humidity: Set(log.humidity),
            precipitation_probability: Set(log.precipitation_probability),
            source: Set(log.source),
            created_at: Set(now),
            updated_at: Set(now),
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert weather log")
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<weather_logs::Model>> {
        WeatherLogs::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query weather log by ID")
    }

    pub async fn get_by_external_id(&self, external_id: &str) -> Result<Option<weather_logs::Model>> {
        WeatherLogs::find()
            .filter(weather_logs::Column::ExternalId.eq(external_id))
            .one(&self.conn)
            .await
            .context("Failed to query weather log by external ID")
    }

    /// One page of matching readings, newest first, plus the total number of
    /// matches.
    pub async fn find_filtered(
        &self,
        filter: &WeatherFilter,
        request: PageRequest,
    ) -> Result<(Vec<weather_logs::Model>, u64)> {
        let paginator = filtered_query(filter).paginate(&self.conn, request.limit);

        let total = paginator
            .num_items()
            .await
            .context("Failed to count weather logs")?;
        let items = paginator
            .fetch_page(request.page.saturating_sub(1))
            .await
            .context("Failed to fetch weather log page")?;

        Ok((items, total))
    }

    /// Every matching reading, newest first.
    pub async fn find_all_filtered(
        &self,
        filter: &WeatherFilter,
    ) -> Result<Vec<weather_logs::Model>> {
        filtered_query(filter)
            .all(&self.conn)
            .await
            .context("Failed to query weather logs")
    }
}

/// Rows with a NULL humidity never satisfy a humidity bound.
fn filtered_query(filter: &WeatherFilter) -> Select<WeatherLogs> {
    let mut query = WeatherLogs::find()
        .order_by_desc(weather_logs::Column::FetchedAt)
        .order_by_desc(weather_logs::Column::Id);

    if let Some(start) = filter.start_date {
        query = query.filter(weather_logs::Column::FetchedAt.gte(start));
    }

    if let Some(end) = filter.end_date {
        query = query.filter(weather_logs::Column::FetchedAt.lte(end));
    }

    if let Some(min) = filter.min_temp {
        query = query.filter(weather_logs::Column::Temperature.gte(min));
    }

    if let Some(max) = filter.max_temp {
        query = query.filter(weather_logs::Column::Temperature.lte(max));
    }

    if let Some(min) = filter.min_humidity {
        query = query.filter(weather_logs::Column::Humidity.gte(min));
    }

    if let Some(max) = filter.max_humidity {
        query = query.filter(weather_logs::Column::Humidity.lte(max));
    }

    query
}
