//! Cross-entropy helpers.
//!
//! Both classifiers train against cross-entropy over softmax probabilities.
//! Probabilities are floored at [`PROB_FLOOR`] before taking the log so a
//! fully confident wrong answer yields a large finite loss instead of
//! infinity.

/// Floor applied to probabilities before taking the log.
pub const PROB_FLOOR: f32 = 1e-15;

/// Cross-entropy of a probability vector against a target vector.
///
/// Only indices with `target[i] > 0` contribute, which handles one-hot and
/// soft targets uniformly:
///
/// - `loss = Σ_i -ln(max(probs[i], PROB_FLOOR)) * target[i]`
///
/// Shape contract: `probs.len() == target.len()`.
pub fn cross_entropy(probs: &[f32], target: &[f32]) -> f32 {
    assert_eq!(
        probs.len(),
        target.len(),
        "probs len {} does not match target len {}",
        probs.len(),
        target.len()
    );

    let mut loss = 0.0_f32;
    for (&p, &t) in probs.iter().zip(target) {
        if t > 0.0 {
            loss -= p.max(PROB_FLOOR).ln() * t;
        }
    }
    loss
}

/// Cross-entropy against a single class index: `-ln(max(probs[class], PROB_FLOOR))`.
///
/// Panics if `class >= probs.len()`.
pub fn cross_entropy_class(probs: &[f32], class: usize) -> f32 {
    -probs[class].max(PROB_FLOOR).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_prediction_has_zero_loss() {
        let probs = [0.0_f32, 1.0, 0.0];
        let target = [0.0_f32, 1.0, 0.0];
        assert_eq!(cross_entropy(&probs, &target), 0.0);
        assert_eq!(cross_entropy_class(&probs, 1), 0.0);
    }

    #[test]
    fn zero_probability_is_floored_to_a_finite_loss() {
        let probs = [1.0_f32, 0.0];
        let loss = cross_entropy_class(&probs, 1);
        assert!(loss.is_finite());
        assert!((loss - (-PROB_FLOOR.ln())).abs() < 1e-3);
    }

    #[test]
    fn soft_targets_weight_their_terms() {
        let probs = [0.5_f32, 0.5];
        let target = [0.5_f32, 0.5];
        let expected = -(0.5_f32.ln()) * 0.5 - (0.5_f32.ln()) * 0.5;
        assert!((cross_entropy(&probs, &target) - expected).abs() < 1e-6);
    }

    #[test]
    fn one_hot_matches_class_form() {
        let probs = [0.2_f32, 0.3, 0.5];
        let target = [0.0_f32, 0.0, 1.0];
        let a = cross_entropy(&probs, &target);
        let b = cross_entropy_class(&probs, 2);
        assert!((a - b).abs() < 1e-6);
    }
}
