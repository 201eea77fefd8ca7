//! Splitting an import window into cacheable CDS requests.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::region::BoundingBox;

/// Days between an ERA5-Land timestamp and its publication.
pub const PUBLICATION_LAG_DAYS: i64 = 5;

/// Spacing of the ERA5-Land grid in degrees.
pub const GRID_RESOLUTION: f64 = 0.1;

/// The last day expected to be published as of `today`.
pub fn latest_available(today: NaiveDate) -> NaiveDate {
    today - Duration::days(PUBLICATION_LAG_DAYS)
}

/// A run of days within one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthChunk {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl MonthChunk {
    /// Cache file name; identical requests map onto the same file.
    pub fn file_name(&self, prefix: &str, variables: &[String]) -> String {
        format!(
            "{}_{}_{}_{}.nc",
            prefix,
            variables.join("-"),
            self.first.format("%Y%m%d"),
            self.last.format("%Y%m%d")
        )
    }

    pub fn inputs(&self, variables: &[String], bbox: &BoundingBox) -> RetrieveInputs {
        RetrieveInputs {
            variable: variables.to_vec(),
            year: vec![self.first.format("%Y").to_string()],
            month: vec![self.first.format("%m").to_string()],
            day: (self.first.day()..=self.last.day())
                .map(|d| format!("{d:02}"))
                .collect(),
            time: (0..24).map(|h| format!("{h:02}:00")).collect(),
            area: bbox.area(),
            data_format: "netcdf",
            download_format: "unarchived",
        }
    }
}

/// Splits `start..=end` at month boundaries. Empty when `end < start`.
pub fn month_chunks(start: NaiveDate, end: NaiveDate) -> Vec<MonthChunk> {
    let mut chunks = Vec::new();
    let mut first = start;

    while first <= end {
        let month_end = last_day_of_month(first);
        let last = month_end.min(end);
        chunks.push(MonthChunk { first, last });
        first = month_end + Duration::days(1);
    }

    chunks
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        m => (date.year(), m + 1),
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Body of a CDS Retrieve API v1 execution request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrieveRequest {
    pub inputs: RetrieveInputs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrieveInputs {
    pub variable: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub day: Vec<String>,
    pub time: Vec<String>,
    pub area: [f64; 4],
    pub data_format: &'static str,
    pub download_format: &'static str,
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_split_window_by_month() {
        let chunks = month_chunks(date(2024, 12, 15), date(2025, 2, 10));

        assert_eq!(
            chunks,
            vec![
                MonthChunk {
                    first: date(2024, 12, 15),
                    last: date(2024, 12, 31)
                },
                MonthChunk {
                    first: date(2025, 1, 1),
                    last: date(2025, 1, 31)
                },
                MonthChunk {
                    first: date(2025, 2, 1),
                    last: date(2025, 2, 10)
                },
            ]
        );
    }

    #[test]
    fn should_handle_leap_february() {
        let chunks = month_chunks(date(2024, 2, 1), date(2024, 3, 1));

        assert_eq!(chunks[0].last, date(2024, 2, 29));
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn should_have_no_chunks_for_empty_window() {
        assert!(month_chunks(date(2025, 3, 2), date(2025, 3, 1)).is_empty());
    }

    #[test]
    fn should_name_cache_file_by_window() {
        let chunk = MonthChunk {
            first: date(2025, 1, 1),
            last: date(2025, 1, 31),
        };
        let name = chunk.file_name("era5_hourly", &["total_precipitation".to_string()]);

        assert_eq!(name, "era5_hourly_total_precipitation_20250101_20250131.nc");
    }

    #[test]
    fn should_build_retrieve_inputs() {
        let chunk = MonthChunk {
            first: date(2025, 2, 27),
            last: date(2025, 2, 28),
        };
        let bbox = BoundingBox {
            west: 29.0,
            south: -3.0,
            east: 31.0,
            north: -1.0,
        };
        let request = RetrieveRequest {
            inputs: chunk.inputs(&["2m_temperature".to_string()], &bbox),
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["inputs"]["year"], serde_json::json!(["2025"]));
        assert_eq!(json["inputs"]["month"], serde_json::json!(["02"]));
        assert_eq!(json["inputs"]["day"], serde_json::json!(["27", "28"]));
        assert_eq!(json["inputs"]["time"].as_array().unwrap().len(), 24);
        assert_eq!(json["inputs"]["area"], serde_json::json!([-1.0, 29.0, -3.0, 31.0]));
        assert_eq!(json["inputs"]["data_format"], "netcdf");
    }

    #[test]
    fn should_lag_publication() {
        assert_eq!(latest_available(date(2025, 3, 3)), date(2025, 2, 26));
    }
}
