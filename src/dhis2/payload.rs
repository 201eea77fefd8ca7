//! Builds the body for `POST /api/dataValueSets`.

use serde::Serialize;

use crate::{period::daily_period, transform::AggregatedValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    pub data_element: String,
    pub org_unit: String,
    pub period: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValueSet {
    pub data_values: Vec<DataValue>,
}

impl DataValueSet {
    pub fn len(&self) -> usize {
        self.data_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_values.is_empty()
    }
}

/// Maps aggregated rows onto DHIS2 data values for one data element.
///
/// Rows without a finite value are left out. The second item is how many
/// rows were skipped.
pub fn build(rows: &[AggregatedValue], data_element: &str) -> (DataValueSet, usize) {
    let data_values: Vec<DataValue> = rows
        .iter()
        .filter(|row| row.value.is_finite())
        .map(|row| DataValue {
            data_element: data_element.to_string(),
            org_unit: row.org_unit.clone(),
            period: daily_period(row.date),
            value: row.value.to_string(),
        })
        .collect();

    let skipped = rows.len() - data_values.len();

    (DataValueSet { data_values }, skipped)
}

// -- Tests -------------------------------------------------------------------
