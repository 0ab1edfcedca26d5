//! # Transformer Implementations
//!
//! The submodules contain the transformer implementations, grouped by the kind of feature
//! engineering they perform. Every transformer implements [`crate::pipeline::Estimator`], and its
//! fitted value implements [`crate::pipeline::Transform`].

pub mod categorical_encoding;
pub mod feature_selection;
pub mod imputation;
pub mod scaling;

pub use categorical_encoding::{FittedRareCategoriesMerger, RareCategoriesMerger};
pub use feature_selection::{
    ColumnDropper, ColumnSelectorByType, FittedVarianceThreshold, VarianceThreshold,
};
pub use imputation::{
    FittedMissingThresholdIndicator, FittedSimpleImputer, ImputeStrategy,
    MissingThresholdIndicator, SimpleImputer,
};
pub use scaling::{FittedStandardScaler, StandardScaler};
