//! `SeaORM` implementation of the `WeatherService` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{NewWeatherLog, Store, is_unique_violation};
use crate::domain::weather::{Page, PageRequest, WeatherFilter};
use crate::services::export::{self, ExportFile, ExportFormat};
use crate::services::insights::{self, InsightGenerator, WeatherInsights};
use crate::services::weather_service::{WeatherError, WeatherLogDto, WeatherService};

pub struct SeaOrmWeatherService {
    store: Store,
    generator: Option<Arc<dyn InsightGenerator>>,
    generator_timeout: Duration,
}

impl SeaOrmWeatherService {
    /// `generator` is `None` when insights are disabled in the config.
    #[must_use]
    pub fn new(
        store: Store,
        generator: Option<Arc<dyn InsightGenerator>>,
        generator_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            generator_timeout,
        }
    }

    async fn enrich(&self, mut insights: WeatherInsights) -> WeatherInsights {
        let Some(generator) = &self.generator else {
            return insights;
        };

        match tokio::time::timeout(self.generator_timeout, generator.generate(&insights)).await {
            Ok(Ok(ai)) => {
                debug!("AI insights attached");
                insights.ai_insights = Some(ai);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Insight generation failed, returning numeric summary");
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.generator_timeout.as_secs(),
                    "Insight generation timed out, returning numeric summary"
                );
            }
        }

        insights
    }
}

#[async_trait]
impl WeatherService for SeaOrmWeatherService {
    async fn ingest(&self, log: NewWeatherLog) -> Result<WeatherLogDto, WeatherError> {
        let external_id = log.external_id.clone();

        match self.store.add_weather_log(log).await {
            Ok(model) => {
                info!(external_id = %model.external_id, "Weather log stored");
                Ok(model.into())
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(%external_id, "Duplicate weather log rejected");
                Err(WeatherError::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<WeatherLogDto>, WeatherError> {
        let logs = self
            .store
            .find_all_weather_logs(&WeatherFilter::default())
            .await?;
        Ok(logs.into_iter().map(WeatherLogDto::from).collect())
    }

    async fn find(
        &self,
        filter: WeatherFilter,
        request: PageRequest,
    ) -> Result<Page<WeatherLogDto>, WeatherError> {
        let (logs, total) = self.store.find_weather_logs(&filter, request).await?;
        Ok(Page::new(logs, total, request).map(WeatherLogDto::from))
    }

    async fn get(&self, id: Uuid) -> Result<WeatherLogDto, WeatherError> {
        self.store
            .get_weather_log(id)
            .await?
            .map(WeatherLogDto::from)
            .ok_or(WeatherError::NotFound)
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<WeatherLogDto, WeatherError> {
        self.store
            .get_weather_log_by_external_id(external_id)
            .await?
            .map(WeatherLogDto::from)
            .ok_or(WeatherError::NotFound)
    }

    async fn insights(&self, filter: WeatherFilter) -> Result<WeatherInsights, WeatherError> {
        let logs = self.store.find_all_weather_logs(&filter).await?;
        let summary = insights::aggregate(&logs);

        if !summary.has_data() {
            return Ok(summary);
        }

        Ok(self.enrich(summary).await)
    }

    async fn export(
        &self,
        filter: WeatherFilter,
        format: ExportFormat,
    ) -> Result<ExportFile, WeatherError> {
        let logs = self.store.find_all_weather_logs(&filter).await?;

        let bytes = tokio::task::spawn_blocking(move || export::render(format, &logs))
            .await
            .map_err(|e| WeatherError::Internal(format!("Export task panicked: {e}")))??;

        Ok(ExportFile {
            format,
            file_name: export::file_name(format, Utc::now().timestamp_millis()),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::insights::AiInsights;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recording {
        calls: AtomicUsize,
        reply: Option<AiInsights>,
        delay: Duration,
    }

    #[async_trait]
    impl InsightGenerator for Recording {
        async fn generate(&self, _: &WeatherInsights) -> anyhow::Result<AiInsights> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("quota exceeded"))
        }
    }

    fn generator(reply: Option<AiInsights>, delay: Duration) -> Arc<Recording> {
        Arc::new(Recording {
            calls: AtomicUsize::new(0),
            reply,
            delay,
        })
    }

    fn narrative() -> AiInsights {
        AiInsights {
            summary: "Mild and steady.".to_string(),
            trends: vec![],
            recommendations: vec!["Carry a light jacket".to_string()],
            alerts: vec![],
        }
    }

    async fn service_with(generator: Arc<Recording>, timeout: Duration) -> SeaOrmWeatherService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        SeaOrmWeatherService::new(store, Some(generator), timeout)
    }

    async fn seed(service: &SeaOrmWeatherService, count: i64) {
        let base = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        for i in 0..count {
            service
                .ingest(NewWeatherLog {
                    external_id: format!("log-{i}"),
                    fetched_at: base + ChronoDuration::hours(i),
                    latitude: 1.0,
                    longitude: 2.0,
                    temperature: 18.0,
                    humidity: Some(55.0),
                    precipitation_probability: Some(10.0),
                    source: "OpenMeteo".to_string(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn no_data_skips_the_generator() {
        let recorder = generator(Some(narrative()), Duration::ZERO);
        let service = service_with(recorder.clone(), Duration::from_secs(1)).await;

        let result = service.insights(WeatherFilter::default()).await.unwrap();

        assert_eq!(result.classification, insights::NO_DATA);
        assert_eq!(result.summary.avg_temperature, 0.0);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_generation_is_attached() {
        let recorder = generator(Some(narrative()), Duration::ZERO);
        let service = service_with(recorder.clone(), Duration::from_secs(1)).await;
        seed(&service, 3).await;

        let result = service.insights(WeatherFilter::default()).await.unwrap();

        assert_eq!(result.ai_insights, Some(narrative()));
        assert_eq!(result.summary.total_records, 3);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_falls_back_once() {
        let recorder = generator(None, Duration::ZERO);
        let service = service_with(recorder.clone(), Duration::from_secs(1)).await;
        seed(&service, 2).await;

        let result = service.insights(WeatherFilter::default()).await.unwrap();

        assert!(result.ai_insights.is_none());
        assert_eq!(result.classification, "mild");
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_generator_times_out() {
        let recorder = generator(Some(narrative()), Duration::from_secs(5));
        let service = service_with(recorder.clone(), Duration::from_millis(50)).await;
        seed(&service, 1).await;

        let result = service.insights(WeatherFilter::default()).await.unwrap();

        assert!(result.ai_insights.is_none());
        assert_eq!(result.summary.total_records, 1);
    }

    #[tokio::test]
    async fn duplicate_ingest_is_a_conflict() {
        let service = service_with(generator(None, Duration::ZERO), Duration::from_secs(1)).await;
        seed(&service, 1).await;

        let again = service
            .ingest(NewWeatherLog {
                external_id: "log-0".to_string(),
                fetched_at: Utc::now(),
                latitude: 0.0,
                longitude: 0.0,
                temperature: 40.0,
                humidity: None,
                precipitation_probability: None,
                source: "OpenMeteo".to_string(),
            })
            .await;

        assert!(matches!(again, Err(WeatherError::Duplicate)));
        let stored = service.get_by_external_id("log-0").await.unwrap();
        assert_eq!(stored.temperature, 18.0);
    }

    #[tokio::test]
    async fn export_ignores_pagination() {
        let service = service_with(generator(None, Duration::ZERO), Duration::from_secs(1)).await;
        seed(&service, 30).await;

        let file = service
            .export(WeatherFilter::default(), ExportFormat::Csv)
            .await
            .unwrap();

        let text = String::from_utf8(file.bytes).unwrap();
        assert_eq!(text.lines().count(), 31);
        assert!(file.file_name.starts_with("weather-data-"));
        assert!(file.file_name.ends_with(".csv"));
    }
}
