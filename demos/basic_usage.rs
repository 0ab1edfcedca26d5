// Run `cargo run --example basic_usage` to execute this example on built-in sample data,
// or `cargo run --example basic_usage -- <file.csv|file.parquet>` to use your own data.

use std::error::Error;

use tabular_transformers::metrics::recall_recall_product_score;
use tabular_transformers::pipeline::{Estimator, Transform};
use tabular_transformers::schema::SemanticType;
use tabular_transformers::transformers::{
    ColumnDropper, ColumnSelectorByType, MissingThresholdIndicator, RareCategoriesMerger,
    SimpleImputer, StandardScaler,
};

mod shared;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let input_df = match std::env::args().nth(1) {
        Some(path) => shared::load_data(&path).await?,
        None => shared::sample_data()?,
    };
    input_df.clone().limit(0, Some(5))?.show().await?;

    // Drop identifiers, then flag sparse columns before anything is imputed.
    let dropper = ColumnDropper::new(vec!["customer_id".to_string()]);
    let (_, df) = dropper.fit_transform(input_df).await?;
    let (indicator, df) = MissingThresholdIndicator::new(0.2).fit_transform(df).await?;
    println!("Missing indicators: {:?}", indicator.indicator_names());

    // Numeric branch: impute with the mean, then standardize.
    let numeric = ColumnSelectorByType::new([SemanticType::Numeric]).transform(df.clone())?;
    let (_, numeric) = SimpleImputer::default().fit_transform(numeric).await?;
    let (scaler, numeric) = StandardScaler::default().fit_transform(numeric).await?;
    println!("Scaler means: {:?}", scaler.means());
    numeric.show().await?;

    // Categorical branch: merge the long tail of rare categories.
    let categorical = ColumnSelectorByType::new([SemanticType::Categorical]).transform(df)?;
    let (merger, categorical) = RareCategoriesMerger::new(1).fit_transform(categorical).await?;
    println!("Retained categories: {:?}", merger.retained());
    categorical.show().await?;

    let y_true = [1, 0, 1, 1, 0, 0, 1, 0];
    let y_pred = [1, 0, 0, 1, 0, 1, 1, 0];
    println!(
        "Recall product score: {:.3}",
        recall_recall_product_score(&y_true, &y_pred)?
    );

    Ok(())
}
