//! ## Scaling Transformers
//!
//! This module provides [`StandardScaler`], which centers numeric columns on their mean and
//! divides them by their population standard deviation. Both statistics are learned in a
//! single aggregate query at fit time; transform only adds arithmetic to the logical plan.
//!
//! Output columns are `Float64` and keep the names and order seen at fit time.

use crate::exceptions::{TabularError, TabularResult};
use crate::pipeline::{Estimator, Transform};
use crate::schema::{
    aggregate_row, ensure_numeric, observed_value, scalar_at, scalar_to_f64, schema_columns,
    validate_columns,
};
use async_trait::async_trait;
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{avg, stddev_pop};
use datafusion::prelude::DataFrame;
use datafusion_expr::{cast, ident, lit, Expr};
use tracing::debug;

/// Standardizes numeric features: `(x - mean) / std`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
}

impl StandardScaler {
    /// `with_mean` centers the data; `with_std` scales it to unit variance.
    pub fn new(with_mean: bool, with_std: bool) -> Self {
        Self {
            with_mean,
            with_std,
        }
    }

    pub fn with_mean(&self) -> bool {
        self.with_mean
    }

    pub fn with_std(&self) -> bool {
        self.with_std
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// A zero or undefined deviation leaves the column unscaled.
fn scale_from_std(std: Option<f64>) -> f64 {
    match std {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => 1.0,
    }
}

#[async_trait]
impl Estimator for StandardScaler {
    type Fitted = FittedStandardScaler;

    async fn fit(&self, df: &DataFrame) -> TabularResult<FittedStandardScaler> {
        let columns = schema_columns(df);
        ensure_numeric(&columns, "StandardScaler")?;

        let mut means = vec![0.0; columns.len()];
        let mut scales = vec![1.0; columns.len()];
        if !columns.is_empty() {
            let mut aggregates = Vec::with_capacity(columns.len() * 2);
            for (i, column) in columns.iter().enumerate() {
                let value = cast(
                    observed_value(&column.name, &column.data_type)?,
                    DataType::Float64,
                );
                aggregates.push(avg(value.clone()).alias(format!("__mean_{}", i)));
                aggregates.push(stddev_pop(value).alias(format!("__std_{}", i)));
            }
            if let Some(batch) = aggregate_row(df, aggregates).await? {
                for i in 0..columns.len() {
                    if self.with_mean {
                        means[i] = scalar_to_f64(&scalar_at(&batch, 2 * i, 0)?).unwrap_or(0.0);
                    }
                    if self.with_std {
                        scales[i] = scale_from_std(scalar_to_f64(&scalar_at(&batch, 2 * i + 1, 0)?));
                    }
                }
            }
        }
        debug!(?means, ?scales, "StandardScaler fitted");

        Ok(FittedStandardScaler {
            columns: columns.into_iter().map(|c| c.name).collect(),
            means,
            scales,
        })
    }

    fn is_stateful(&self) -> bool {
        self.with_mean || self.with_std
    }
}

/// Learned state of a [`StandardScaler`]: one offset and one scale per fit-time column.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedStandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl FittedStandardScaler {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Offsets subtracted per column (0 when centering is disabled).
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Divisors per column (1 when scaling is disabled or the deviation is zero).
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

impl Transform for FittedStandardScaler {
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        validate_columns(&df, &self.columns)?;
        let exprs: Vec<Expr> = self
            .columns
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(name, (&mean, &scale))| {
                ((cast(ident(name), DataType::Float64) - lit(mean)) / lit(scale)).alias(name)
            })
            .collect();
        df.select(exprs).map_err(TabularError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_from_std() {
        assert_eq!(scale_from_std(Some(2.0)), 2.0);
        assert_eq!(scale_from_std(Some(0.0)), 1.0);
        assert_eq!(scale_from_std(None), 1.0);
        assert_eq!(scale_from_std(Some(f64::NAN)), 1.0);
    }

    #[test]
    fn test_default_centers_and_scales() {
        let scaler = StandardScaler::default();
        assert!(scaler.with_mean());
        assert!(scaler.with_std());
        assert!(scaler.is_stateful());
        assert!(!StandardScaler::new(false, false).is_stateful());
    }
}
