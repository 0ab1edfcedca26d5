//! ## Scoring Functions
//!
//! Binary-classification metrics for model selection. Labels are `0` or `1`; anything else is
//! rejected with [`TabularError::InvalidLabel`].

use crate::exceptions::{TabularError, TabularResult};
use tracing::warn;

fn validate_labels(y_true: &[i64], y_pred: &[i64]) -> TabularResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(TabularError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    for (name, labels) in [("y_true", y_true), ("y_pred", y_pred)] {
        if let Some((i, label)) = labels.iter().enumerate().find(|(_, &l)| l != 0 && l != 1) {
            return Err(TabularError::InvalidLabel(format!(
                "{} contains {} at position {}; labels must be 0 or 1",
                name, label, i
            )));
        }
    }
    Ok(())
}

/// Fraction of the `pos_label` samples in `y_true` that `y_pred` also labels `pos_label`.
///
/// Returns 0.0 when `y_true` has no `pos_label` samples.
pub fn recall_score(y_true: &[i64], y_pred: &[i64], pos_label: i64) -> TabularResult<f64> {
    validate_labels(y_true, y_pred)?;
    if pos_label != 0 && pos_label != 1 {
        return Err(TabularError::InvalidLabel(format!(
            "pos_label {} must be 0 or 1",
            pos_label
        )));
    }
    let (true_positives, positives) = y_true
        .iter()
        .zip(y_pred)
        .filter(|(&t, _)| t == pos_label)
        .fold((0_usize, 0_usize), |(tp, p), (_, &pred)| {
            (tp + usize::from(pred == pos_label), p + 1)
        });
    if positives == 0 {
        warn!(pos_label, "Recall is ill-defined without true samples of the class; using 0.0");
        return Ok(0.0);
    }
    Ok(true_positives as f64 / positives as f64)
}

/// Product of the recall on the positive class and the recall on the negative class.
///
/// The negative-class recall is the recall of the inverted label vectors, so the score is high
/// only when both classes are recovered.
pub fn recall_recall_product_score(y_true: &[i64], y_pred: &[i64]) -> TabularResult<f64> {
    let positive = recall_score(y_true, y_pred, 1)?;
    let inverted_true: Vec<i64> = y_true.iter().map(|&y| 1 - y).collect();
    let inverted_pred: Vec<i64> = y_pred.iter().map(|&y| 1 - y).collect();
    let negative = recall_score(&inverted_true, &inverted_pred, 1)?;
    Ok(positive * negative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_recall_score_positive_class() {
        let y_true = [1, 1, 1, 0, 0];
        let y_pred = [1, 0, 1, 0, 1];
        assert_abs_diff_eq!(recall_score(&y_true, &y_pred, 1).unwrap(), 2.0 / 3.0);
        assert_abs_diff_eq!(recall_score(&y_true, &y_pred, 0).unwrap(), 0.5);
    }

    #[test]
    fn test_recall_product() {
        let y_true = [1, 1, 1, 0, 0];
        let y_pred = [1, 0, 1, 0, 1];
        let score = recall_recall_product_score(&y_true, &y_pred).unwrap();
        assert_abs_diff_eq!(score, 2.0 / 3.0 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_perfect_and_constant_predictions() {
        let y_true = [0, 1, 0, 1];
        assert_abs_diff_eq!(recall_recall_product_score(&y_true, &y_true).unwrap(), 1.0);
        // Predicting a single class recovers none of the other.
        assert_abs_diff_eq!(recall_recall_product_score(&y_true, &[1, 1, 1, 1]).unwrap(), 0.0);
    }

    #[test]
    fn test_no_positive_samples() {
        assert_abs_diff_eq!(recall_score(&[0, 0], &[0, 1], 1).unwrap(), 0.0);
    }

    #[test]
    fn test_non_binary_labels() {
        let err = recall_recall_product_score(&[0, 2, 1], &[0, 1, 1]).unwrap_err();
        assert!(matches!(err, TabularError::InvalidLabel(_)));
        let err = recall_score(&[0, 1], &[0, -1], 1).unwrap_err();
        assert!(format!("{}", err).contains("y_pred"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = recall_recall_product_score(&[0, 1, 1], &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            TabularError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
