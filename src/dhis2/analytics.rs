//! Reading the latest period with data out of `/api/analytics` responses.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Dhis2Error;

/// Relative periods covering the years searched for previous imports.
pub const YEARS_DIMENSION: &str = "THIS_YEAR;LAST_10_YEARS";

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
}

impl AnalyticsResponse {
    /// The greatest value in the `pe` column, if any row has one.
    pub fn latest_period(&self) -> Option<String> {
        let column = self.headers.iter().position(|h| h.name == "pe")?;

        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|pe| !pe.is_empty())
            .max()
            .cloned()
    }
}

/// The twelve monthly periods of a year, joined for a `pe:` dimension.
pub fn months_dimension(year: &str) -> String {
    (1..=12)
        .map(|m| format!("{year}{m:02}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// One `/api/analytics` lookup: the greatest period among `periods` that
/// has data for `data_element` at `level`.
#[async_trait]
pub trait AnalyticsQuery: Sync {
    async fn latest_in(
        &self,
        data_element: &str,
        periods: &str,
        level: u32,
    ) -> Result<Option<String>, Dhis2Error>;
}

/// The latest month with data, found by first narrowing down to a year.
///
/// When the year has data but no month does (yearly aggregates only), the
/// year itself is returned.
pub async fn latest_imported_period<Q: AnalyticsQuery>(
    query: &Q,
    data_element: &str,
    level: u32,
) -> Result<Option<String>, Dhis2Error> {
    let Some(year) = query.latest_in(data_element, YEARS_DIMENSION, level).await? else {
        return Ok(None);
    };
    debug!(year = %year, "Latest year with data");

    let month = query
        .latest_in(data_element, &months_dimension(&year), level)
        .await?;

    Ok(Some(month.unwrap_or(year)))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;

    /// Answers lookups from a table keyed by the `pe` dimension.
    struct TableQuery {
        answers: HashMap<String, String>,
        asked: Mutex<Vec<String>>,
    }

    impl TableQuery {
        fn new(answers: &[(&str, &str)]) -> Self {
            TableQuery {
                answers: answers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnalyticsQuery for TableQuery {
        async fn latest_in(
            &self,
            data_element: &str,
            periods: &str,
            level: u32,
        ) -> Result<Option<String>, Dhis2Error> {
            assert_eq!(data_element, "deUid");
            assert_eq!(level, 2);
            self.asked.lock().unwrap().push(periods.to_string());
            Ok(self.answers.get(periods).cloned())
        }
    }

    #[test]
    fn should_find_latest_period() {
        let response: AnalyticsResponse = serde_json::from_str(
            r#"{
                "headers": [{"name": "dx"}, {"name": "pe"}, {"name": "value"}],
                "rows": [["de", "202503", "1.2"], ["de", "202511", "0.4"], ["de", "202502", "9"]]
            }"#,
        )
        .unwrap();

        assert_eq!(response.latest_period(), Some("202511".to_string()));
    }

    #[test]
    fn should_have_no_period_without_rows() {
        let response: AnalyticsResponse =
            serde_json::from_str(r#"{"headers": [{"name": "pe"}], "rows": []}"#).unwrap();

        assert_eq!(response.latest_period(), None);
    }

    #[test]
    fn should_tolerate_missing_fields() {
        let response: AnalyticsResponse = serde_json::from_str("{}").unwrap();

        assert_eq!(response.latest_period(), None);
    }

    #[test]
    fn should_list_months_of_year() {
        let months = months_dimension("2025");

        assert!(months.starts_with("202501;202502"));
        assert!(months.ends_with("202512"));
        assert_eq!(months.split(';').count(), 12);
    }

    #[tokio::test]
    async fn should_find_nothing_without_any_year() {
        let query = TableQuery::new(&[]);

        let period = latest_imported_period(&query, "deUid", 2).await.unwrap();

        assert_eq!(period, None);
        assert_eq!(*query.asked.lock().unwrap(), vec![YEARS_DIMENSION.to_string()]);
    }

    #[tokio::test]
    async fn should_narrow_year_down_to_month() {
        let months = months_dimension("2024");
        let query = TableQuery::new(&[(YEARS_DIMENSION, "2024"), (months.as_str(), "202409")]);

        let period = latest_imported_period(&query, "deUid", 2).await.unwrap();

        assert_eq!(period, Some("202409".to_string()));
        assert_eq!(
            *query.asked.lock().unwrap(),
            vec![YEARS_DIMENSION.to_string(), months]
        );
    }

    #[tokio::test]
    async fn should_fall_back_to_year_without_months() {
        let query = TableQuery::new(&[(YEARS_DIMENSION, "2023")]);

        let period = latest_imported_period(&query, "deUid", 2).await.unwrap();

        assert_eq!(period, Some("2023".to_string()));
        assert_eq!(query.asked.lock().unwrap().len(), 2);
    }
}
