//! ## Fit/Transform Contract
//!
//! This module defines the two-phase contract shared by every transformer in the crate.
//!
//! ### Overview
//!
//! - [`Estimator`] is the fitting phase: `fit` reads a reference DataFrame and returns an
//!   immutable fitted value. Configuration lives on the estimator, learned state lives on the
//!   fitted value, and nothing is assigned after the fact.
//! - [`Transform`] is the application phase: it extends a DataFrame's logical plan with the
//!   learned parameters without triggering execution.
//! - [`Transformer`] is a dyn-compatible view of the same contract for pipeline orchestrators
//!   that keep heterogeneous steps in one collection. [`Step`] adapts any estimator to it.
//!
//! Sequencing steps, splitting training and inference data and persisting fitted state are the
//! orchestrator's job; this crate only provides the contract.

use crate::exceptions::{TabularError, TabularResult};
use async_trait::async_trait;
use datafusion::prelude::*;

/// Application phase of a transformer: applies previously learned parameters.
pub trait Transform {
    /// Transform the input DataFrame, returning a new DataFrame with the transformation applied.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    ///
    /// # Returns
    ///
    /// * `TabularResult<DataFrame>` - The transformed DataFrame or an error if the DataFrame does
    ///   not match the fitted schema.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame>;
}

/// Fitting phase of a transformer: learns parameters from a reference DataFrame.
#[async_trait]
pub trait Estimator: Send + Sync {
    /// The immutable learned state produced by [`Estimator::fit`].
    type Fitted: Transform + Send + Sync;

    /// Learn the transformer's parameters from `df`.
    ///
    /// # Arguments
    ///
    /// * `df` - The reference DataFrame.
    ///
    /// # Returns
    ///
    /// * `TabularResult<Self::Fitted>` - The fitted transformer, or an error if fitting fails.
    async fn fit(&self, df: &DataFrame) -> TabularResult<Self::Fitted>;

    /// Fit on `df` and transform it with the result.
    async fn fit_transform(&self, df: DataFrame) -> TabularResult<(Self::Fitted, DataFrame)> {
        let fitted = self.fit(&df).await?;
        let transformed = fitted.transform(df)?;
        Ok((fitted, transformed))
    }

    /// Returns true if `fit` learns anything from the data.
    fn is_stateful(&self) -> bool;
}

/// Dyn-compatible transformer interface for pipeline orchestrators.
///
/// Unlike [`Estimator`], fitting mutates the transformer in place, so a collection of
/// `Box<dyn Transformer + Send + Sync>` can be fitted and applied step by step.
#[async_trait]
pub trait Transformer {
    /// Fit the transformer given a DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> TabularResult<()>;

    /// Transform the input DataFrame. Fails with [`TabularError::FitNotCalled`] before `fit`.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame>;

    /// Returns true if the transformer is stateful (i.e. its fit learns from the data).
    fn is_stateful(&self) -> bool;
}

/// Adapts an [`Estimator`] to the [`Transformer`] interface by holding its fitted state.
pub struct Step<E: Estimator> {
    estimator: E,
    fitted: Option<E::Fitted>,
}

impl<E: Estimator + 'static> Step<E> {
    /// Wrap an unfitted estimator.
    pub fn new(estimator: E) -> Self {
        Self {
            estimator,
            fitted: None,
        }
    }

    /// Wrap an estimator and box it for a heterogeneous step list.
    pub fn boxed(estimator: E) -> Box<dyn Transformer + Send + Sync> {
        Box::new(Self::new(estimator))
    }

    /// The wrapped estimator's configuration.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// The fitted state, if `fit` has been called.
    pub fn fitted(&self) -> Option<&E::Fitted> {
        self.fitted.as_ref()
    }
}

#[async_trait]
impl<E: Estimator + 'static> Transformer for Step<E> {
    async fn fit(&mut self, df: &DataFrame) -> TabularResult<()> {
        self.fitted = Some(self.estimator.fit(df).await?);
        Ok(())
    }

    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        match &self.fitted {
            Some(fitted) => fitted.transform(df),
            None => Err(TabularError::FitNotCalled),
        }
    }

    fn is_stateful(&self) -> bool {
        self.estimator.is_stateful()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::{ArrayRef, Int64Array};
    use datafusion::arrow::datatypes::{DataType, Field, Schema};
    use datafusion::arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    /// Appends a constant column holding the row count seen at fit time.
    struct RowCounter;

    struct FittedRowCounter {
        rows: i64,
    }

    impl Transform for FittedRowCounter {
        fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
            Ok(df.with_column("rows", lit(self.rows))?)
        }
    }

    #[async_trait]
    impl Estimator for RowCounter {
        type Fitted = FittedRowCounter;

        async fn fit(&self, df: &DataFrame) -> TabularResult<FittedRowCounter> {
            let rows = df.clone().count().await? as i64;
            Ok(FittedRowCounter { rows })
        }

        fn is_stateful(&self) -> bool {
            true
        }
    }

    fn create_dataframe() -> DataFrame {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)]));
        let x: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3]));
        let batch = RecordBatch::try_new(schema, vec![x]).unwrap();
        SessionContext::new().read_batch(batch).unwrap()
    }

    #[tokio::test]
    async fn test_step_transform_before_fit() {
        let step = Step::new(RowCounter);
        let err = step.transform(create_dataframe()).unwrap_err();
        assert!(matches!(err, TabularError::FitNotCalled));
        assert!(step.fitted().is_none());
    }

    #[tokio::test]
    async fn test_step_fit_then_transform() -> TabularResult<()> {
        let mut step = Step::boxed(RowCounter);
        assert!(step.is_stateful());
        let df = create_dataframe();
        step.fit(&df).await?;
        let out = step.transform(df)?;
        assert_eq!(out.schema().fields().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_fit_transform_returns_state_and_data() -> TabularResult<()> {
        let (fitted, out) = RowCounter.fit_transform(create_dataframe()).await?;
        assert_eq!(fitted.rows, 3);
        assert_eq!(out.count().await?, 3);
        Ok(())
    }
}
