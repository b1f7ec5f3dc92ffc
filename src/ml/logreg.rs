// SPDX-License-Identifier: AGPL-3.0-or-later
//! Multinomial (softmax) logistic regression.
//!
//! Batch gradient descent on the weighted cross-entropy with an L2
//! penalty. Inputs are expected imputed and standardized (see
//! [`crate::ml::prep`]); with balanced class weights the rare dry/wet
//! classes are not drowned out by the normal majority. Fitting is
//! fully deterministic — no RNG, no shuffling.

use crate::error::{Error, Result};
use crate::ml::prep::balanced_class_weights;

/// Hyperparameters for the logistic-regression trainer.
#[derive(Debug, Clone)]
pub struct LogRegConfig {
    /// Gradient-descent iterations.
    pub max_iter: usize,
    /// Step size.
    pub learning_rate: f64,
    /// L2 penalty on weights (bias excluded).
    pub l2: f64,
    /// Use balanced class weights.
    pub balanced: bool,
}

impl Default for LogRegConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            learning_rate: 0.1,
            l2: 1e-4,
            balanced: true,
        }
    }
}

/// A fitted softmax classifier.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Per-class weight vectors, bias last (`n_classes × (n_features + 1)`).
    weights: Vec<Vec<f64>>,
    n_features: usize,
}

fn softmax_into(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    for s in scores.iter_mut() {
        *s /= sum;
    }
}

impl LogisticRegression {
    /// Fit on imputed, scaled feature rows.
    ///
    /// # Errors
    ///
    /// Returns `Err` on empty or ragged input.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, cfg: &LogRegConfig) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(Error::InvalidInput(
                "logistic regression needs matching, nonempty x and y".into(),
            ));
        }
        let d = x[0].len();
        if x.iter().any(|r| r.len() != d) {
            return Err(Error::InvalidInput("ragged feature rows".into()));
        }

        let sample_w: Vec<f64> = if cfg.balanced {
            let cw = balanced_class_weights(y, n_classes);
            y.iter().map(|&c| cw[c]).collect()
        } else {
            vec![1.0; y.len()]
        };
        let w_total: f64 = sample_w.iter().sum();

        let mut weights = vec![vec![0.0_f64; d + 1]; n_classes];
        let mut probs = vec![0.0_f64; n_classes];
        let mut grad = vec![vec![0.0_f64; d + 1]; n_classes];

        for _ in 0..cfg.max_iter {
            for g in &mut grad {
                g.iter_mut().for_each(|v| *v = 0.0);
            }
            for ((xi, &yi), &wi) in x.iter().zip(y).zip(&sample_w) {
                for (k, wk) in weights.iter().enumerate() {
                    let mut s = wk[d];
                    for (a, b) in wk[..d].iter().zip(xi) {
                        s += a * b;
                    }
                    probs[k] = s;
                }
                softmax_into(&mut probs);
                for (k, gk) in grad.iter_mut().enumerate() {
                    let err = wi * (probs[k] - f64::from(u8::from(k == yi)));
                    for (g, &xv) in gk[..d].iter_mut().zip(xi) {
                        *g += err * xv;
                    }
                    gk[d] += err;
                }
            }
            for (wk, gk) in weights.iter_mut().zip(&grad) {
                for (j, (w, g)) in wk.iter_mut().zip(gk).enumerate() {
                    let penalty = if j < d { cfg.l2 * *w } else { 0.0 };
                    *w -= cfg.learning_rate * (g / w_total + penalty);
                }
            }
        }

        Ok(Self {
            weights,
            n_features: d,
        })
    }

    /// Per-class probabilities for one row.
    #[must_use]
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let d = self.n_features;
        let mut scores: Vec<f64> = self
            .weights
            .iter()
            .map(|wk| {
                let mut s = wk[d];
                for (a, b) in wk[..d].iter().zip(features) {
                    s += a * b;
                }
                s
            })
            .collect();
        softmax_into(&mut scores);
        scores
    }

    /// Most probable class for one row.
    #[must_use]
    pub fn predict(&self, features: &[f64]) -> usize {
        self.predict_proba(features)
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map_or(0, |(k, _)| k)
    }

    /// Class predictions for many rows.
    #[must_use]
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<usize> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Expected number of features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}
