//! Save the aggregated values to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

use crate::transform::AggregatedValue;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn date32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn save_values(values: &[AggregatedValue], file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(file_path)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("org_unit", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        // Regions without covered cells carry no value
        Field::new("value", DataType::Float64, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let org_units: Vec<&str> = values.iter().map(|v| v.org_unit.as_str()).collect();
    let dates: Vec<i32> = values.iter().map(|v| date32(v.date)).collect();
    let readings: Vec<Option<f64>> = values
        .iter()
        .map(|v| v.value.is_finite().then_some(v.value))
        .collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(org_units)),
        Arc::new(Date32Array::from(dates)),
        Arc::new(Float64Array::from(readings)),
    ];

    let batch = RecordBatch::try_new(schema, columns)?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
