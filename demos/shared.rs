#![allow(dead_code)]

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use std::path::Path;
use std::sync::Arc;

/// Loads data from a given path and automatically detects the format (CSV or Parquet).
pub async fn load_data(path: &str) -> Result<DataFrame, datafusion::error::DataFusionError> {
    let ctx = SessionContext::new();

    let df = if Path::new(path)
        .extension()
        .map_or(false, |ext| ext == "parquet")
    {
        ctx.read_parquet(path, Default::default()).await?
    } else if Path::new(path)
        .extension()
        .map_or(false, |ext| ext == "csv")
    {
        ctx.read_csv(path, CsvReadOptions::new()).await?
    } else {
        return Err(datafusion::error::DataFusionError::Execution(
            "Unsupported file format. Please provide a CSV or Parquet file.".to_string(),
        ));
    };

    Ok(df)
}

/// A small customer table with missing incomes and a long tail of cities.
pub fn sample_data() -> Result<DataFrame, datafusion::error::DataFusionError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Utf8, false),
        Field::new("income", DataType::Float64, true),
        Field::new("age", DataType::Float64, true),
        Field::new("city", DataType::Utf8, true),
    ]));
    let ids: ArrayRef = Arc::new(StringArray::from(
        (1..=8).map(|i| format!("c{:03}", i)).collect::<Vec<_>>(),
    ));
    let income: ArrayRef = Arc::new(Float64Array::from(vec![
        Some(42.0),
        None,
        Some(58.5),
        Some(61.0),
        None,
        Some(39.0),
        Some(75.5),
        None,
    ]));
    let age: ArrayRef = Arc::new(Float64Array::from(vec![
        Some(34.0),
        Some(45.0),
        Some(29.0),
        None,
        Some(52.0),
        Some(41.0),
        Some(38.0),
        Some(27.0),
    ]));
    let city: ArrayRef = Arc::new(StringArray::from(vec![
        "lisbon", "lisbon", "porto", "lisbon", "porto", "faro", "braga", "porto",
    ]));
    let batch = RecordBatch::try_new(schema, vec![ids, income, age, city])?;
    SessionContext::new().read_batch(batch)
}

fn main() {}
