//! ## Feature Selection Transformers
//!
//! This module provides transformers that keep or remove whole columns.
//!
//! ### Available Transformers
//!
//! - [`ColumnDropper`]: Removes a fixed list of columns.
//! - [`ColumnSelectorByType`]: Keeps only the columns whose [`SemanticType`] is in a given set.
//! - [`VarianceThreshold`]: Keeps the numeric columns whose population variance reaches a threshold.
//!
//! The first two are stateless: fitting returns the configuration itself. `VarianceThreshold`
//! learns the per-column variances and the selected subset at fit time.
//!
//! Errors are returned as [`TabularError`], and results are wrapped in [`TabularResult`].

use crate::exceptions::{TabularError, TabularResult};
use crate::pipeline::{Estimator, Transform};
use crate::schema::{
    aggregate_row, ensure_numeric, observed_value, scalar_at, scalar_to_f64, schema_columns,
    validate_columns, ColumnSpec, SemanticType,
};
use async_trait::async_trait;
use datafusion::arrow::datatypes::DataType;
use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::var_pop;
use datafusion_expr::{cast, ident, Expr};
use std::collections::BTreeSet;
use tracing::debug;

/// Removes the specified columns from the DataFrame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDropper {
    columns: Vec<String>,
}

impl ColumnDropper {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[async_trait]
impl Estimator for ColumnDropper {
    type Fitted = ColumnDropper;

    async fn fit(&self, _df: &DataFrame) -> TabularResult<ColumnDropper> {
        Ok(self.clone())
    }

    fn is_stateful(&self) -> bool {
        false
    }
}

impl Transform for ColumnDropper {
    /// Fails with [`TabularError::MissingColumn`] if any configured column is absent.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        let keep_exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|field| !self.columns.contains(field.name()))
            .map(|field| ident(field.name()))
            .collect();
        df.select(keep_exprs).map_err(TabularError::from)
    }
}

/// Keeps the columns whose semantic type is one of the configured tags, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelectorByType {
    types: BTreeSet<SemanticType>,
}

impl ColumnSelectorByType {
    pub fn new(types: impl IntoIterator<Item = SemanticType>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }

    /// Builds a selector from type names such as `"numeric"` or `"category"`.
    pub fn from_names(names: &[&str]) -> TabularResult<Self> {
        let types = names
            .iter()
            .map(|name| name.parse::<SemanticType>())
            .collect::<TabularResult<BTreeSet<_>>>()?;
        Ok(Self { types })
    }

    pub fn types(&self) -> &BTreeSet<SemanticType> {
        &self.types
    }
}

#[async_trait]
impl Estimator for ColumnSelectorByType {
    type Fitted = ColumnSelectorByType;

    async fn fit(&self, _df: &DataFrame) -> TabularResult<ColumnSelectorByType> {
        Ok(self.clone())
    }

    fn is_stateful(&self) -> bool {
        false
    }
}

impl Transform for ColumnSelectorByType {
    /// Returns an empty-column DataFrame when nothing matches.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        let keep_exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|field| {
                SemanticType::of(field.data_type()).is_some_and(|tag| self.types.contains(&tag))
            })
            .map(|field| ident(field.name()))
            .collect();
        df.select(keep_exprs).map_err(TabularError::from)
    }
}

/// Removes numeric features whose population variance is below a threshold.
///
/// A column is kept when its variance is greater than or equal to the threshold. The same
/// variance drives both the selection and the output column names.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceThreshold {
    threshold: f64,
}

impl VarianceThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for VarianceThreshold {
    /// Threshold 0: constant columns are kept, so only columns without observed values are removed.
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[async_trait]
impl Estimator for VarianceThreshold {
    type Fitted = FittedVarianceThreshold;

    async fn fit(&self, df: &DataFrame) -> TabularResult<FittedVarianceThreshold> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(TabularError::InvalidParameter(format!(
                "Variance threshold {} must be a finite non-negative number",
                self.threshold
            )));
        }
        let input_columns = schema_columns(df);
        if input_columns.is_empty() {
            return Err(TabularError::InvalidParameter(
                "VarianceThreshold requires at least one column".to_string(),
            ));
        }
        ensure_numeric(&input_columns, "VarianceThreshold")?;

        let aggregates = input_columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = observed_value(&column.name, &column.data_type)?;
                Ok(var_pop(cast(value, DataType::Float64)).alias(format!("__var_{}", i)))
            })
            .collect::<TabularResult<Vec<Expr>>>()?;

        let mut variances = Vec::with_capacity(input_columns.len());
        if let Some(batch) = aggregate_row(df, aggregates).await? {
            for i in 0..input_columns.len() {
                variances.push(scalar_to_f64(&scalar_at(&batch, i, 0)?));
            }
        } else {
            variances.resize(input_columns.len(), None);
        }

        let selected: Vec<String> = input_columns
            .iter()
            .zip(&variances)
            .filter(|(_, variance)| variance.is_some_and(|v| v >= self.threshold))
            .map(|(column, _)| column.name.clone())
            .collect();
        if selected.is_empty() {
            return Err(TabularError::InvalidParameter(format!(
                "No feature meets the variance threshold {}",
                self.threshold
            )));
        }
        debug!(
            threshold = self.threshold,
            ?selected,
            "VarianceThreshold selected {} of {} columns",
            selected.len(),
            input_columns.len()
        );

        Ok(FittedVarianceThreshold {
            input_columns,
            variances,
            selected,
        })
    }

    fn is_stateful(&self) -> bool {
        true
    }
}

/// Learned state of a [`VarianceThreshold`].
#[derive(Debug, Clone, PartialEq)]
pub struct FittedVarianceThreshold {
    input_columns: Vec<ColumnSpec>,
    variances: Vec<Option<f64>>,
    selected: Vec<String>,
}

impl FittedVarianceThreshold {
    /// Columns seen at fit time, in order.
    pub fn input_columns(&self) -> &[ColumnSpec] {
        &self.input_columns
    }

    /// Population variance per input column; `None` for columns without observed values.
    pub fn variances(&self) -> &[Option<f64>] {
        &self.variances
    }

    /// Names of the kept columns, in input order.
    pub fn selected_columns(&self) -> &[String] {
        &self.selected
    }
}

impl Transform for FittedVarianceThreshold {
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        let expected: Vec<&str> = self.input_columns.iter().map(|c| c.name.as_str()).collect();
        validate_columns(&df, &expected)?;
        let exprs: Vec<Expr> = self.selected.iter().map(|name| ident(name)).collect();
        df.select(exprs).map_err(TabularError::from)
    }
}
