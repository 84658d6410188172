use crate::error::AppError;
use crate::vectorizer::SparseRow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Iteration cap for gradient descent.
pub const MAX_ITERATIONS: usize = 2000;

const LEARNING_RATE: f64 = 0.5;
const TOLERANCE: f64 = 1e-6;

/// Binary logistic regression over the vectorizer's feature space.
///
/// Trained with class-balanced sample weights to offset label imbalance.
/// Deterministic given identical input order. Immutable after fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub iterations_run: usize,
    pub training_samples: u64,
}

impl LogisticRegression {
    pub fn fit(rows: &[SparseRow], labels: &[u8], dim: usize) -> Result<Self, AppError> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(AppError::Training(format!(
                "feature rows and labels must be non-empty and equal length ({} vs {})",
                rows.len(),
                labels.len()
            )));
        }

        let n = rows.len() as f64;
        let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
        let negatives = n - positives;
        if positives == 0.0 || negatives == 0.0 {
            return Err(AppError::Training(
                "both classes must be present in the training set".to_string(),
            ));
        }

        // Balanced weighting: n_samples / (n_classes * class_count)
        let weight_pos = n / (2.0 * positives);
        let weight_neg = n / (2.0 * negatives);

        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;
        let mut iterations_run = 0;

        for iteration in 0..MAX_ITERATIONS {
            let mut grad_weights = vec![0.0; dim];
            let mut grad_bias = 0.0;

            for (row, &label) in rows.iter().zip(labels) {
                let target = label as f64;
                let sample_weight = if label == 1 { weight_pos } else { weight_neg };
                let predicted = sigmoid(dot(row, &weights) + bias);
                let residual = (predicted - target) * sample_weight;

                for &(idx, value) in row {
                    grad_weights[idx] += residual * value;
                }
                grad_bias += residual;
            }

            let mut max_step = 0.0f64;
            for (weight, gradient) in weights.iter_mut().zip(&grad_weights) {
                let step = LEARNING_RATE * gradient / n;
                *weight -= step;
                max_step = max_step.max(step.abs());
            }
            let bias_step = LEARNING_RATE * grad_bias / n;
            bias -= bias_step;
            max_step = max_step.max(bias_step.abs());

            iterations_run = iteration + 1;
            if max_step < TOLERANCE {
                break;
            }
        }

        info!(
            "Fitted logistic regression: {} features, {} samples, {} iterations",
            dim,
            rows.len(),
            iterations_run
        );

        Ok(LogisticRegression {
            weights,
            bias,
            iterations_run,
            training_samples: rows.len() as u64,
        })
    }

    /// P(phishing) for one sparse feature row.
    pub fn predict_proba(&self, row: &SparseRow) -> f64 {
        sigmoid(dot(row, &self.weights) + self.bias)
    }

    pub fn load_from_file(path: &str) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let model: LogisticRegression = serde_json::from_str(&content)?;
        debug!(
            "Loaded model from {}: {} features, {} samples",
            path,
            model.weights.len(),
            model.training_samples
        );
        Ok(model)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), AppError> {
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        debug!(
            "Saved model to {}: {} features, {} samples",
            path,
            self.weights.len(),
            self.training_samples
        );
        Ok(())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(row: &SparseRow, weights: &[f64]) -> f64 {
    row.iter()
        .map(|&(idx, value)| weights.get(idx).copied().unwrap_or(0.0) * value)
        .sum()
}
