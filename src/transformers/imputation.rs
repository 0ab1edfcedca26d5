//! ## Transformers for missing values
//!
//! This module provides transformers that deal with missing values. A value is missing when it
//! is null, or `NaN` in a floating-point column.
//!
//! Currently, the following transformers are implemented:
//!
//! - **MissingThresholdIndicator**: Appends a binary `<column>_MISSING` indicator for every column
//!   whose fraction of missing values exceeded a threshold at fit time.
//! - **SimpleImputer**: Replaces missing values with a per-column statistic (mean, median, most
//!   frequent value) or a constant, then casts every column back to its fit-time type.
//!
//! Errors are returned as `TabularError` and results are wrapped in `TabularResult`.

use crate::exceptions::{TabularError, TabularResult};
use crate::pipeline::{Estimator, Transform};
use crate::schema::{
    aggregate_row, ensure_numeric, missing_predicate, observed_value, scalar_at, scalar_to_f64,
    scalar_to_i64, schema_columns, validate_columns, ColumnSpec, SemanticType,
};
use async_trait::async_trait;
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, count, median, sum};
use datafusion::prelude::DataFrame;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{cast, ident, lit, when, Expr};
use futures::future::try_join_all;
use tracing::debug;

/// Suffix appended to a column's name to form its missing-value indicator.
pub const MISSING_SUFFIX: &str = "_MISSING";

/// Fill label used by [`ImputeStrategy::Constant`] for non-numeric columns when no value is given.
pub const DEFAULT_FILL_LABEL: &str = "missing_value";

/// Arrow type of the indicator columns: a binary (0/1) categorical.
pub fn indicator_type() -> DataType {
    DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Int8))
}

/// Constructs `CASE WHEN <name is missing> THEN <fallback> ELSE <name> END`.
fn fill_missing_expr(name: &str, data_type: &DataType, fallback: Expr) -> TabularResult<Expr> {
    Ok(when(missing_predicate(name, data_type), fallback).otherwise(ident(name))?)
}

/// Looks up the current type of `name` in the DataFrame.
fn current_type(df: &DataFrame, name: &str) -> TabularResult<DataType> {
    df.schema()
        .field_with_name(None, name)
        .map(|field| field.data_type().clone())
        .map_err(|_| {
            TabularError::MissingColumn(format!("Column '{}' not found in DataFrame", name))
        })
}

/// Appends missing-value indicators for columns with too many missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingThresholdIndicator {
    threshold: f64,
}

impl MissingThresholdIndicator {
    /// Create an indicator for columns whose missing fraction is strictly above `threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[async_trait]
impl Estimator for MissingThresholdIndicator {
    type Fitted = FittedMissingThresholdIndicator;

    /// Computes every column's missing fraction in a single aggregate query.
    async fn fit(&self, df: &DataFrame) -> TabularResult<FittedMissingThresholdIndicator> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(TabularError::InvalidParameter(format!(
                "Missing-value threshold {} must be between 0 and 1",
                self.threshold
            )));
        }
        let columns = schema_columns(df);
        let mut aggregates = vec![count(lit(1)).alias("__rows")];
        for (i, column) in columns.iter().enumerate() {
            let is_missing = when(missing_predicate(&column.name, &column.data_type), lit(1_i64))
                .otherwise(lit(0_i64))?;
            aggregates.push(sum(is_missing).alias(format!("__missing_{}", i)));
        }

        let mut rows = 0_i64;
        let mut missing = vec![0_i64; columns.len()];
        if let Some(batch) = aggregate_row(df, aggregates).await? {
            rows = scalar_to_i64(&scalar_at(&batch, 0, 0)?).unwrap_or(0);
            for (i, slot) in missing.iter_mut().enumerate() {
                *slot = scalar_to_i64(&scalar_at(&batch, i + 1, 0)?).unwrap_or(0);
            }
        }

        let mut recorded = Vec::new();
        let mut fractions = Vec::new();
        if rows > 0 {
            for (column, missing_count) in columns.into_iter().zip(missing) {
                let fraction = missing_count as f64 / rows as f64;
                if fraction > self.threshold {
                    recorded.push(column);
                    fractions.push(fraction);
                }
            }
        }
        debug!(
            threshold = self.threshold,
            rows,
            columns = ?recorded.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "MissingThresholdIndicator fitted"
        );

        Ok(FittedMissingThresholdIndicator {
            columns: recorded,
            missing_fractions: fractions,
        })
    }

    fn is_stateful(&self) -> bool {
        true
    }
}

/// Learned state of a [`MissingThresholdIndicator`]: the columns that get an indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedMissingThresholdIndicator {
    columns: Vec<ColumnSpec>,
    missing_fractions: Vec<f64>,
}

impl FittedMissingThresholdIndicator {
    /// Columns whose missing fraction exceeded the threshold, in schema order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Missing fraction observed at fit time for each recorded column.
    pub fn missing_fractions(&self) -> &[f64] {
        &self.missing_fractions
    }

    /// Names of the indicator columns that `transform` appends.
    pub fn indicator_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| format!("{}{}", column.name, MISSING_SUFFIX))
            .collect()
    }
}

impl Transform for FittedMissingThresholdIndicator {
    /// Appends the indicators after all original columns. Original columns are untouched.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        if self.columns.is_empty() {
            return Ok(df);
        }
        let mut exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| ident(field.name()))
            .collect();
        for (column, indicator) in self.columns.iter().zip(self.indicator_names()) {
            if df.schema().field_with_name(None, &indicator).is_ok() {
                return Err(TabularError::InvalidParameter(format!(
                    "Indicator column '{}' already exists in DataFrame",
                    indicator
                )));
            }
            let data_type = current_type(&df, &column.name)?;
            let flag = when(missing_predicate(&column.name, &data_type), lit(1_i8))
                .otherwise(lit(0_i8))?;
            exprs.push(cast(flag, indicator_type()).alias(indicator));
        }
        df.select(exprs).map_err(TabularError::from)
    }
}

/// This enum defines the imputation strategy for the `SimpleImputer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeStrategy {
    /// Column mean; numeric columns only.
    Mean,
    /// Column median; numeric columns only.
    Median,
    /// Most frequent value; ties go to the smallest value.
    MostFrequent,
    /// A fixed fill value.
    Constant,
}

/// Replaces missing values column by column and preserves the fit-time column types.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    fill_value: Option<ScalarValue>,
}

impl SimpleImputer {
    /// Create a new imputer. `fill_value` is only used by [`ImputeStrategy::Constant`]; when it is
    /// `None`, numeric columns are filled with 0 and other columns with [`DEFAULT_FILL_LABEL`].
    pub fn new(strategy: ImputeStrategy, fill_value: Option<ScalarValue>) -> Self {
        Self {
            strategy,
            fill_value,
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    fn constant_for(&self, column: &ColumnSpec) -> ScalarValue {
        match &self.fill_value {
            Some(value) => value.clone(),
            None if SemanticType::of(&column.data_type) == Some(SemanticType::Numeric) => {
                ScalarValue::Int64(Some(0))
            }
            None => ScalarValue::Utf8(Some(DEFAULT_FILL_LABEL.to_string())),
        }
    }

    /// Mean or median of every column in one aggregate query.
    async fn statistics(
        &self,
        df: &DataFrame,
        columns: &[ColumnSpec],
    ) -> TabularResult<Vec<ScalarValue>> {
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let aggregates = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = cast(
                    observed_value(&column.name, &column.data_type)?,
                    DataType::Float64,
                );
                let statistic = match self.strategy {
                    ImputeStrategy::Median => median(value),
                    _ => avg(value),
                };
                Ok(statistic.alias(format!("__stat_{}", i)))
            })
            .collect::<TabularResult<Vec<Expr>>>()?;

        let batch = aggregate_row(df, aggregates).await?;
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = match &batch {
                    Some(batch) => scalar_to_f64(&scalar_at(batch, i, 0)?),
                    None => None,
                };
                value
                    .map(|v| ScalarValue::Float64(Some(v)))
                    .ok_or_else(|| no_observed_values(&column.name))
            })
            .collect()
    }
}

impl Default for SimpleImputer {
    fn default() -> Self {
        Self::new(ImputeStrategy::Mean, None)
    }
}

fn no_observed_values(name: &str) -> TabularError {
    TabularError::InvalidParameter(format!(
        "Column '{}' has no observed values to impute from",
        name
    ))
}

/// Most frequent non-missing value of a column, ties broken by the smallest value.
async fn most_frequent(df: &DataFrame, column: &ColumnSpec) -> TabularResult<ScalarValue> {
    let value = observed_value(&column.name, &column.data_type)?;
    let grouped = df
        .clone()
        .filter(value.clone().is_not_null())?
        .aggregate(vec![value.alias("value")], vec![count(lit(1)).alias("cnt")])?
        .sort(vec![ident("cnt").sort(false, false), ident("value").sort(true, false)])?
        .limit(0, Some(1))?;
    let batches = grouped.collect().await?;
    match batches.iter().find(|batch| batch.num_rows() > 0) {
        Some(batch) => scalar_at(batch, 0, 0),
        None => Err(no_observed_values(&column.name)),
    }
}

#[async_trait]
impl Estimator for SimpleImputer {
    type Fitted = FittedSimpleImputer;

    async fn fit(&self, df: &DataFrame) -> TabularResult<FittedSimpleImputer> {
        let columns = schema_columns(df);
        let fill_values = match self.strategy {
            ImputeStrategy::Mean | ImputeStrategy::Median => {
                ensure_numeric(&columns, "SimpleImputer")?;
                self.statistics(df, &columns).await?
            }
            ImputeStrategy::MostFrequent => {
                try_join_all(columns.iter().map(|column| most_frequent(df, column))).await?
            }
            ImputeStrategy::Constant => columns.iter().map(|c| self.constant_for(c)).collect(),
        };
        debug!(strategy = ?self.strategy, ?fill_values, "SimpleImputer fitted");

        Ok(FittedSimpleImputer {
            strategy: self.strategy,
            columns,
            fill_values,
        })
    }

    fn is_stateful(&self) -> bool {
        self.strategy != ImputeStrategy::Constant
    }
}

/// Learned state of a [`SimpleImputer`]: fit-time schema and one fill value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSimpleImputer {
    strategy: ImputeStrategy,
    columns: Vec<ColumnSpec>,
    fill_values: Vec<ScalarValue>,
}

impl FittedSimpleImputer {
    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Columns and types recorded at fit time.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// The value that replaces missing cells of `column`.
    pub fn fill_value(&self, column: &str) -> Option<&ScalarValue> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.fill_values[i])
    }
}

impl Transform for FittedSimpleImputer {
    /// Outputs exactly the fit-time columns, each cast back to its recorded type.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        validate_columns(&df, &names)?;
        let exprs = self
            .columns
            .iter()
            .zip(&self.fill_values)
            .map(|(column, fill)| {
                let data_type = current_type(&df, &column.name)?;
                let filled = fill_missing_expr(&column.name, &data_type, lit(fill.clone()))?;
                Ok(cast(filled, column.data_type.clone()).alias(&column.name))
            })
            .collect::<TabularResult<Vec<Expr>>>()?;
        df.select(exprs).map_err(TabularError::from)
    }
}
