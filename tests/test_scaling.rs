use std::sync::Arc;

use approx::assert_abs_diff_eq;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::memory::MemTable;
use datafusion::prelude::*;

use tabular_transformers::exceptions::{TabularError, TabularResult};
use tabular_transformers::pipeline::{Estimator, Transform};
use tabular_transformers::transformers::scaling::StandardScaler;

/// Creates a DataFrame with:
///   - "x": Float64 [1, 2, 3]
///   - "k": Int64 constant [5, 5, 5]
///   - "y": Int64 [0, 0, 6]
async fn create_dataframe() -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float64, false),
        Field::new("k", DataType::Int64, false),
        Field::new("y", DataType::Int64, false),
    ]));
    let x: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0]));
    let k: ArrayRef = Arc::new(Int64Array::from(vec![5, 5, 5]));
    let y: ArrayRef = Arc::new(Int64Array::from(vec![0, 0, 6]));
    let batch = RecordBatch::try_new(schema.clone(), vec![x, k, y]).unwrap();

    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

async fn collect_floats(df: DataFrame, name: &str) -> TabularResult<Vec<f64>> {
    let batches = df.collect().await?;
    let schema = batches[0].schema();
    let batch = concat_batches(&schema, &batches)?;
    let array = batch
        .column(schema.index_of(name)?)
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("Expected Float64Array");
    Ok(array.values().to_vec())
}

#[tokio::test]
async fn test_standard_scaling_round_trip() -> TabularResult<()> {
    let df = create_dataframe().await;
    let fitted = StandardScaler::default().fit(&df).await?;
    assert_eq!(fitted.columns(), &["x", "k", "y"]);

    let transformed = fitted.transform(df.clone())?;
    let names: Vec<String> = transformed
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names, vec!["x", "k", "y"]);
    assert_eq!(transformed.clone().count().await?, 3);
    for field in transformed.schema().fields() {
        assert_eq!(field.data_type(), &DataType::Float64);
    }

    // Population standard deviation of [1, 2, 3] is sqrt(2/3).
    let std = (2.0_f64 / 3.0).sqrt();
    let x = collect_floats(transformed.clone(), "x").await?;
    assert_abs_diff_eq!(x[0], -1.0 / std, epsilon = 1e-9);
    assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(x[2], 1.0 / std, epsilon = 1e-9);

    // A constant column is centered but not scaled.
    let k = collect_floats(transformed.clone(), "k").await?;
    assert_eq!(k, vec![0.0, 0.0, 0.0]);

    // Mean 2, population std sqrt(8).
    let y = collect_floats(transformed, "y").await?;
    assert_abs_diff_eq!(y[2], 4.0 / 8.0_f64.sqrt(), epsilon = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_scaling_without_mean() -> TabularResult<()> {
    let df = create_dataframe().await;
    let fitted = StandardScaler::new(false, true).fit(&df).await?;
    assert_eq!(fitted.means(), &[0.0, 0.0, 0.0]);

    let x = collect_floats(fitted.transform(df)?, "x").await?;
    let std = (2.0_f64 / 3.0).sqrt();
    assert_abs_diff_eq!(x[2], 3.0 / std, epsilon = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_centering_without_std() -> TabularResult<()> {
    let df = create_dataframe().await;
    let fitted = StandardScaler::new(true, false).fit(&df).await?;
    assert_eq!(fitted.scales(), &[1.0, 1.0, 1.0]);

    let x = collect_floats(fitted.transform(df)?, "x").await?;
    assert_eq!(x, vec![-1.0, 0.0, 1.0]);
    Ok(())
}

#[tokio::test]
async fn test_scaler_rejects_categorical_columns() -> TabularResult<()> {
    let schema = Arc::new(Schema::new(vec![Field::new("s", DataType::Utf8, false)]));
    let s: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
    let batch = RecordBatch::try_new(schema, vec![s])?;
    let df = SessionContext::new().read_batch(batch)?;

    let err = StandardScaler::default().fit(&df).await.unwrap_err();
    assert!(matches!(err, TabularError::InvalidParameter(_)));
    Ok(())
}

#[tokio::test]
async fn test_scaler_schema_mismatch() -> TabularResult<()> {
    let df = create_dataframe().await;
    let fitted = StandardScaler::default().fit(&df).await?;
    let narrowed = df.select(vec![col("x")])?;
    let err = fitted.transform(narrowed).unwrap_err();
    assert!(matches!(err, TabularError::MissingColumn(_)));
    Ok(())
}
