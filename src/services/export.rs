//! Spreadsheet renderings of weather readings.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rust_xlsxwriter::{Format, Workbook};

use crate::db::WeatherLog;

pub const HEADERS: [&str; 7] = [
    "ID",
    "Fetched At",
    "Latitude",
    "Longitude",
    "Temperature (°C)",
    "Humidity (%)",
    "Precipitation Probability (%)",
];

const SHEET_NAME: &str = "Weather Data";

const COLUMN_WIDTHS: [f64; 7] = [24.0, 26.0, 12.0, 12.0, 18.0, 14.0, 30.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// A rendered export ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// `weather-data-<unix millis>.<ext>`
#[must_use]
pub fn file_name(format: ExportFormat, millis: i64) -> String {
    format!("weather-data-{millis}.{}", format.extension())
}

pub fn render(format: ExportFormat, logs: &[WeatherLog]) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(logs),
        ExportFormat::Xlsx => to_xlsx(logs),
    }
}

fn fetched_at(log: &WeatherLog) -> String {
    log.fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn to_csv(logs: &[WeatherLog]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for log in logs {
        writer.write_record([
            log.external_id.clone(),
            fetched_at(log),
            log.latitude.to_string(),
            log.longitude.to_string(),
            log.temperature.to_string(),
            optional(log.humidity),
            optional(log.precipitation_probability),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {e}"))
}

pub fn to_xlsx(logs: &[WeatherLog]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = u16::try_from(col)?;
        sheet.set_column_width(col, width)?;
        sheet.write_string_with_format(0, col, *header, &bold)?;
    }

    for (index, log) in logs.iter().enumerate() {
        let row = u32::try_from(index + 1).context("Too many rows for a worksheet")?;

        sheet.write_string(row, 0, &log.external_id)?;
        sheet.write_string(row, 1, fetched_at(log))?;
        sheet.write_number(row, 2, log.latitude)?;
        sheet.write_number(row, 3, log.longitude)?;
        sheet.write_number(row, 4, log.temperature)?;
        if let Some(humidity) = log.humidity {
            sheet.write_number(row, 5, humidity)?;
        }
        if let Some(precipitation) = log.precipitation_probability {
            sheet.write_number(row, 6, precipitation)?;
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to build XLSX workbook")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn log(external_id: &str, humidity: Option<f64>) -> WeatherLog {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        WeatherLog {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            fetched_at: at,
            latitude: -23.55,
            longitude: -46.63,
            temperature: 21.5,
            humidity,
            precipitation_probability: None,
            source: "OpenMeteo".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn csv_has_header_and_empty_optionals() {
        let bytes = to_csv(&[log("a,1", Some(70.0)), log("b", None)]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "ID,Fetched At,Latitude,Longitude,Temperature (°C),Humidity (%),Precipitation Probability (%)"
        );
        assert_eq!(lines[1], "\"a,1\",2025-03-04T05:06:07.000Z,-23.55,-46.63,21.5,70,");
        assert_eq!(lines[2], "b,2025-03-04T05:06:07.000Z,-23.55,-46.63,21.5,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_of_nothing_is_just_the_header() {
        let text = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn xlsx_is_a_zip_archive() {
        let bytes = to_xlsx(&[log("a", None)]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name(ExportFormat::Csv, 42), "weather-data-42.csv");
        assert_eq!(file_name(ExportFormat::Xlsx, 7), "weather-data-7.xlsx");
    }
}
