//! # Tabular Transformers
//!
//! Fit/transform feature-engineering transformers for Apache DataFusion `DataFrame`s.
//!
//! Every transformer follows the same two-phase contract defined in [`pipeline`]:
//! an asynchronous `fit` learns an immutable fitted value from a reference DataFrame, and
//! `transform` on that fitted value extends any DataFrame with the same schema lazily.
//!
//! - [`transformers::feature_selection`]: column dropping, selection by type, variance filtering.
//! - [`transformers::imputation`]: missing-value indicators and simple imputation.
//! - [`transformers::categorical_encoding`]: rare-category merging.
//! - [`transformers::scaling`]: standard scaling.
//! - [`metrics`]: the recall-product scoring function.

pub mod exceptions;
mod logging;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod transformers;
