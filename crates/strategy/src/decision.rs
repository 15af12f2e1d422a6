use common::models::Action;

use crate::inference::InferenceError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionConfig {
    /// Logits are divided by this before the softmax; below 1 sharpens.
    pub temperature: f32,
    /// Confidences under this floor are mapped linearly into `[floor, 1]`.
    pub confidence_floor: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            confidence_floor: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub class: usize,
    pub action: Action,
    pub probabilities: Vec<f64>,
    /// Probability of the winning class before rescaling.
    pub raw_confidence: f64,
    pub confidence: f64,
}

impl Decision {
    pub fn from_logits(logits: &[f32], config: &DecisionConfig) -> Result<Self, InferenceError> {
        if !(config.temperature > 0.0) {
            return Err(InferenceError::InvalidOutput(format!(
                "temperature must be positive, got {}",
                config.temperature
            )));
        }
        if logits.is_empty() || logits.iter().any(|l| !l.is_finite()) {
            return Err(InferenceError::InvalidOutput(format!(
                "model produced unusable logits {:?}",
                logits
            )));
        }

        let probabilities = softmax(logits, config.temperature);
        let class = argmax(&probabilities);
        let raw_confidence = probabilities[class];

        Ok(Self {
            class,
            action: Action::from_class(class),
            confidence: rescale_confidence(raw_confidence, config.confidence_floor),
            raw_confidence,
            probabilities,
        })
    }
}

/// Temperature-scaled, max-shifted softmax.
pub fn softmax(logits: &[f32], temperature: f32) -> Vec<f64> {
    let scaled: Vec<f64> = logits
        .iter()
        .map(|&l| l as f64 / temperature as f64)
        .collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// `floor + (p / floor) * (1 - floor)`, clamped at 1, for `p < floor`;
/// `p` unchanged otherwise.
pub fn rescale_confidence(p: f64, floor: f64) -> f64 {
    if p < floor {
        (floor + (p / floor) * (1.0 - floor)).min(1.0)
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_applies_temperature() {
        let probs = softmax(&[0.0, (2.0_f32).ln() / 2.0], 0.5);
        // exp(ln 2) = 2 → [1/3, 2/3]
        assert!((probs[0] - 1.0 / 3.0).abs() < 1e-6);
        assert!((probs[1] - 2.0 / 3.0).abs() < 1e-6);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 1000.0, -1000.0], 0.5);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert_eq!(probs[2], 0.0);
    }

    #[test]
    fn test_class_to_action_mapping() {
        let config = DecisionConfig::default();
        let sell = Decision::from_logits(&[3.0, 0.0, 0.0], &config).unwrap();
        let hold = Decision::from_logits(&[0.0, 3.0, 0.0], &config).unwrap();
        let buy = Decision::from_logits(&[0.0, 0.0, 3.0], &config).unwrap();

        assert_eq!(sell.action, Action::Sell);
        assert_eq!(hold.action, Action::Hold);
        assert_eq!(buy.action, Action::Buy);
        assert_eq!(buy.action.signal(), 1);
    }

    #[test]
    fn test_ties_pick_the_first_class() {
        let decision = Decision::from_logits(&[1.0, 1.0, 1.0], &DecisionConfig::default()).unwrap();

        assert_eq!(decision.class, 0);
        assert_eq!(decision.action, Action::Sell);
        // 1/3 → 0.8 + (1/3 / 0.8) * 0.2
        assert!((decision.raw_confidence - 1.0 / 3.0).abs() < 1e-12);
        assert!((decision.confidence - (0.8 + (1.0 / 3.0) / 0.8 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_rescale_confidence() {
        assert_eq!(rescale_confidence(0.9, 0.8), 0.9);
        assert_eq!(rescale_confidence(0.8, 0.8), 0.8);
        assert!((rescale_confidence(0.4, 0.8) - 0.9).abs() < 1e-12);
        assert!((rescale_confidence(0.0, 0.8) - 0.8).abs() < 1e-12);
        // Just under the floor lands just under 1.0.
        let near = rescale_confidence(0.799, 0.8);
        assert!(near < 1.0 && near > 0.99);
    }

    #[test]
    fn test_confident_prediction_is_not_rescaled() {
        let decision = Decision::from_logits(&[0.0, 0.0, 5.0], &DecisionConfig::default()).unwrap();

        assert!(decision.raw_confidence >= 0.8);
        assert_eq!(decision.confidence, decision.raw_confidence);
    }

    #[test]
    fn test_rejects_bad_logits_and_temperature() {
        assert!(Decision::from_logits(&[], &DecisionConfig::default()).is_err());
        assert!(Decision::from_logits(&[f32::NAN, 0.0, 0.0], &DecisionConfig::default()).is_err());

        let config = DecisionConfig {
            temperature: 0.0,
            ..Default::default()
        };
        assert!(Decision::from_logits(&[0.0, 1.0, 0.0], &config).is_err());
    }
}
