//! # Categorical Encoding Transformers
//!
//! This module provides [`RareCategoriesMerger`], which groups infrequent categories of
//! categorical columns under a single replacement label.
//!
//! A category is rare when it occurs at most `threshold` times in the training DataFrame. Rare
//! categories of a column are merged only when there are at least two of them: a lone rare
//! category has nothing to be merged with and is kept as-is. Merged columns keep their Arrow type.
//!
//! The merger exposes the same API as the other transformers: a constructor, an asynchronous
//! `fit` that learns the retained categories of every column, and a `transform` that replaces
//! every value outside the retained set. Errors from underlying DataFusion operations are
//! wrapped in [`TabularError`].

use crate::exceptions::{TabularError, TabularResult};
use crate::pipeline::{Estimator, Transform};
use crate::schema::validate_columns;
use async_trait::async_trait;
use datafusion::arrow::array::{Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::count;
use datafusion::prelude::DataFrame;
use datafusion_expr::{cast, ident, lit, when, Expr};
use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Label that replaces merged rare categories unless configured otherwise.
pub const DEFAULT_RARE_VALUE: &str = "rare_value";

/// Extract a mapping (category -> count) for a given column by aggregating counts.
/// Values are compared as strings; missing values are not counted as a category.
async fn extract_count_mapping(
    df: &DataFrame,
    col_name: &str,
) -> TabularResult<BTreeMap<String, i64>> {
    let grouped = df
        .clone()
        .aggregate(
            vec![cast(ident(col_name), DataType::Utf8).alias("category")],
            vec![count(lit(1)).alias("cnt")],
        )
        .map_err(TabularError::from)?;
    let batches = grouped.collect().await.map_err(TabularError::from)?;
    let mut map = BTreeMap::new();
    for batch in batches {
        let cat_array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                TabularError::DataFusionError(datafusion::error::DataFusionError::Plan(format!(
                    "Expected Utf8 array for column {}",
                    col_name
                )))
            })?;
        let cnt_array = batch
            .column(1)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                TabularError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    "Expected Int64 array".into(),
                ))
            })?;
        for i in 0..batch.num_rows() {
            if !cat_array.is_null(i) {
                map.insert(cat_array.value(i).to_string(), cnt_array.value(i));
            }
        }
    }
    Ok(map)
}

/// Decides which categories of one column survive the merge.
///
/// Categories with a count above `threshold` are frequent. When fewer than two categories are
/// rare, every category is retained.
pub fn retained_categories(counts: &BTreeMap<String, i64>, threshold: u64) -> BTreeSet<String> {
    let frequent: BTreeSet<String> = counts
        .iter()
        .filter(|(_, cnt)| u64::try_from(**cnt).is_ok_and(|cnt| cnt > threshold))
        .map(|(category, _)| category.clone())
        .collect();
    let rare = counts.len() - frequent.len();
    if rare >= 2 {
        frequent
    } else {
        counts.keys().cloned().collect()
    }
}

/// Groups categories occurring at most `threshold` times into a single replacement label,
/// provided a column has at least two such categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RareCategoriesMerger {
    threshold: u64,
    replace_value: String,
    columns: Option<Vec<String>>,
}

impl RareCategoriesMerger {
    /// Create a merger for every string-valued categorical column, replacing with [`DEFAULT_RARE_VALUE`].
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            replace_value: DEFAULT_RARE_VALUE.to_string(),
            columns: None,
        }
    }

    /// Use `replace_value` as the label for merged categories. It is not checked against the
    /// retained categories.
    pub fn with_replace_value(mut self, replace_value: impl Into<String>) -> Self {
        self.replace_value = replace_value.into();
        self
    }

    /// Restrict the merger to the given columns instead of all string-valued categorical columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn replace_value(&self) -> &str {
        &self.replace_value
    }

    /// Resolves the columns to fit: the configured ones, or every column that can hold labels.
    fn target_columns(&self, df: &DataFrame) -> TabularResult<Vec<String>> {
        let schema = df.schema();
        match &self.columns {
            Some(columns) => {
                validate_columns(df, columns)?;
                for name in columns {
                    let field = schema.field_with_name(None, name)?;
                    if !holds_labels(field.data_type()) {
                        return Err(TabularError::InvalidParameter(format!(
                            "RareCategoriesMerger requires column '{}' to hold string categories, found {}",
                            name,
                            field.data_type()
                        )));
                    }
                }
                Ok(columns.clone())
            }
            None => Ok(schema
                .fields()
                .iter()
                .filter(|field| holds_labels(field.data_type()))
                .map(|field| field.name().to_string())
                .collect()),
        }
    }
}

/// Categorical types that can store the replacement label: strings, and dictionaries of strings.
/// Dictionaries of other values (e.g. missing-value indicators) are left alone.
fn holds_labels(data_type: &DataType) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, value) => holds_labels(value),
        _ => false,
    }
}

#[async_trait]
impl Estimator for RareCategoriesMerger {
    type Fitted = FittedRareCategoriesMerger;

    /// Counts categories of every target column; the per-column queries run together.
    async fn fit(&self, df: &DataFrame) -> TabularResult<FittedRareCategoriesMerger> {
        let columns = self.target_columns(df)?;
        let counts =
            try_join_all(columns.iter().map(|name| extract_count_mapping(df, name))).await?;

        let mut retained = BTreeMap::new();
        for (name, counts) in columns.into_iter().zip(counts) {
            let keep = retained_categories(&counts, self.threshold);
            debug!(
                column = %name,
                categories = counts.len(),
                retained = keep.len(),
                "RareCategoriesMerger fitted column"
            );
            retained.insert(name, keep);
        }

        Ok(FittedRareCategoriesMerger {
            retained,
            replace_value: self.replace_value.clone(),
        })
    }

    fn is_stateful(&self) -> bool {
        true
    }
}

/// Learned state of a [`RareCategoriesMerger`]: the retained categories of every fitted column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedRareCategoriesMerger {
    retained: BTreeMap<String, BTreeSet<String>>,
    replace_value: String,
}

impl FittedRareCategoriesMerger {
    /// Mapping from column name to the categories that pass through unchanged.
    pub fn retained(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.retained
    }

    pub fn replace_value(&self) -> &str {
        &self.replace_value
    }

    /// `CASE WHEN <value> IN (retained) OR <value> IS NULL THEN <value> ELSE <replace> END`,
    /// compared as Utf8 and cast back to the column's own type.
    fn merge_expr(
        &self,
        name: &str,
        data_type: &DataType,
        categories: &BTreeSet<String>,
    ) -> TabularResult<Expr> {
        let value = cast(ident(name), DataType::Utf8);
        let keep = if categories.is_empty() {
            value.clone().is_null()
        } else {
            let list = categories.iter().map(|c| lit(c.clone())).collect();
            value.clone().in_list(list, false).or(value.clone().is_null())
        };
        let merged = when(keep, value).otherwise(lit(self.replace_value.clone()))?;
        Ok(cast(merged, data_type.clone()).alias(name))
    }
}

impl Transform for FittedRareCategoriesMerger {
    /// Replaces values outside each column's retained set; other columns pass through.
    fn transform(&self, df: DataFrame) -> TabularResult<DataFrame> {
        let fitted: Vec<&String> = self.retained.keys().collect();
        validate_columns(&df, &fitted)?;
        let exprs = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                match self.retained.get(name) {
                    Some(categories) => self.merge_expr(name, field.data_type(), categories),
                    None => Ok(ident(name)),
                }
            })
            .collect::<TabularResult<Vec<Expr>>>()?;
        df.select(exprs).map_err(TabularError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_two_rare_categories_are_merged() {
        let keep = retained_categories(&counts(&[("A", 3), ("B", 1), ("C", 1)]), 1);
        assert_eq!(keep, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_single_rare_category_is_kept() {
        let keep = retained_categories(&counts(&[("A", 4), ("B", 1)]), 1);
        assert_eq!(keep, BTreeSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_threshold_boundary_is_rare() {
        // Count equal to the threshold is rare.
        let keep = retained_categories(&counts(&[("A", 5), ("B", 2), ("C", 2)]), 2);
        assert_eq!(keep, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_all_categories_rare() {
        let keep = retained_categories(&counts(&[("A", 1), ("B", 1)]), 3);
        assert!(keep.is_empty());
    }

    #[test]
    fn test_no_categories() {
        assert!(retained_categories(&BTreeMap::new(), 1).is_empty());
    }
}
