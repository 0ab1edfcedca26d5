//! ## Column Types and Schema Helpers
//!
//! This module maps Arrow data types onto the coarse [`SemanticType`] tags used for selecting
//! columns, and collects the schema helpers shared by the transformers:
//!
//! - column validation against a DataFrame's schema,
//! - fit-time schema snapshots ([`ColumnSpec`]),
//! - missing-value predicates (nulls, plus `NaN` for floating-point columns),
//! - reading single-row aggregate results back into Rust values.

use crate::exceptions::{TabularError, TabularResult};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{ident, lit, when, Expr};
use datafusion_functions::math;
use std::fmt;
use std::str::FromStr;

/// A coarse classification of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SemanticType {
    /// Integer, unsigned, floating-point and decimal columns.
    Numeric,
    /// String and dictionary-encoded columns.
    Categorical,
    /// Boolean columns.
    Boolean,
    /// Dates, times, timestamps, durations and intervals.
    Temporal,
}

impl SemanticType {
    /// Returns the tag of an Arrow data type, or `None` for types without one (binary, nested, null).
    pub fn of(data_type: &DataType) -> Option<Self> {
        match data_type {
            DataType::Boolean => Some(Self::Boolean),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Dictionary(_, _) => {
                Some(Self::Categorical)
            }
            dt if dt.is_numeric() => Some(Self::Numeric),
            dt if dt.is_temporal() => Some(Self::Temporal),
            _ => None,
        }
    }
}

impl FromStr for SemanticType {
    type Err = TabularError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" => Ok(Self::Numeric),
            "categorical" | "category" | "object" | "string" => Ok(Self::Categorical),
            "bool" | "boolean" => Ok(Self::Boolean),
            "temporal" | "datetime" => Ok(Self::Temporal),
            other => Err(TabularError::InvalidParameter(format!(
                "Unknown column type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Boolean => "boolean",
            Self::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

/// A column name together with the Arrow type it had when a transformer was fitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
}

/// Snapshot of the DataFrame's columns, in schema order.
pub(crate) fn schema_columns(df: &DataFrame) -> Vec<ColumnSpec> {
    df.schema()
        .fields()
        .iter()
        .map(|field| ColumnSpec {
            name: field.name().to_string(),
            data_type: field.data_type().clone(),
        })
        .collect()
}

/// Validates that every column in `target_cols` exists in the DataFrame.
/// Returns an error if any target column is missing.
pub(crate) fn validate_columns<S: AsRef<str>>(
    df: &DataFrame,
    target_cols: &[S],
) -> TabularResult<()> {
    let schema = df.schema();
    for col_name in target_cols {
        let col_name = col_name.as_ref();
        if schema.field_with_name(None, col_name).is_err() {
            return Err(TabularError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

/// Fails unless every column is numeric.
pub(crate) fn ensure_numeric(columns: &[ColumnSpec], transformer: &str) -> TabularResult<()> {
    for column in columns {
        if SemanticType::of(&column.data_type) != Some(SemanticType::Numeric) {
            return Err(TabularError::InvalidParameter(format!(
                "{} requires column '{}' to be numeric, found {}",
                transformer, column.name, column.data_type
            )));
        }
    }
    Ok(())
}

/// Floating-point types for which `NaN` is treated as missing.
pub(crate) fn is_float(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Float32 | DataType::Float64)
}

/// Boolean expression that is true where the cell of `name` is missing.
pub(crate) fn missing_predicate(name: &str, data_type: &DataType) -> Expr {
    if is_float(data_type) {
        ident(name)
            .is_null()
            .or(math::isnan().call(vec![ident(name)]))
    } else {
        ident(name).is_null()
    }
}

/// The column's values with `NaN` turned into null, so that aggregates skip them.
pub(crate) fn observed_value(name: &str, data_type: &DataType) -> TabularResult<Expr> {
    if is_float(data_type) {
        let null = ScalarValue::try_from(data_type)?;
        Ok(when(math::isnan().call(vec![ident(name)]), lit(null)).otherwise(ident(name))?)
    } else {
        Ok(ident(name))
    }
}

/// Runs an aggregate without grouping and returns the batch holding its single row.
pub(crate) async fn aggregate_row(
    df: &DataFrame,
    aggregates: Vec<Expr>,
) -> TabularResult<Option<RecordBatch>> {
    let batches = df.clone().aggregate(vec![], aggregates)?.collect().await?;
    Ok(batches.into_iter().find(|batch| batch.num_rows() > 0))
}

/// Reads the scalar in row `row` of column `index`.
pub(crate) fn scalar_at(batch: &RecordBatch, index: usize, row: usize) -> TabularResult<ScalarValue> {
    Ok(ScalarValue::try_from_array(batch.column(index), row)?)
}

/// Converts an integer aggregate result (e.g. `count`, `sum`) to `i64`; null becomes `None`.
pub(crate) fn scalar_to_i64(value: &ScalarValue) -> Option<i64> {
    match value {
        ScalarValue::Int64(v) => *v,
        ScalarValue::UInt64(v) => v.map(|v| v as i64),
        ScalarValue::Int32(v) => v.map(i64::from),
        _ => None,
    }
}

/// Converts a floating-point aggregate result (e.g. `avg`, `var_pop`) to `f64`; null becomes `None`.
pub(crate) fn scalar_to_f64(value: &ScalarValue) -> Option<f64> {
    match value {
        ScalarValue::Float64(v) => *v,
        ScalarValue::Float32(v) => v.map(f64::from),
        ScalarValue::Int64(v) => v.map(|v| v as f64),
        _ => None,
    }
}
