// SPDX-License-Identifier: AGPL-3.0-or-later
//! Model-agnostic Shapley attributions for one class probability.
//!
//! Monte-Carlo permutation estimator: for each explained row, features
//! are revealed one at a time in a random order on top of a background
//! row, and each feature is credited with the change in the model's
//! class probability at its reveal. Averaged over permutations and
//! background draws this converges on the Shapley value of the
//! probability game.
//!
//! The stage is read-only with respect to the model — it only calls
//! `predict_proba`, it never refits.

use crate::error::{Error, Result};
use crate::ml::gbm::GbmModel;
use crate::rng::Lcg64;

/// Sampling parameters for the attribution stage.
#[derive(Debug, Clone)]
pub struct ExplainConfig {
    /// Cap on explained rows per class.
    pub per_class: usize,
    /// Background reference rows drawn from the explained sample.
    pub background: usize,
    /// Random permutations per explained row.
    pub permutations: usize,
    /// Class whose probability is attributed (0 = dry).
    pub class_index: usize,
    /// PRNG seed.
    pub seed: u64,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            per_class: 700,
            background: 300,
            permutations: 64,
            class_index: 0,
            seed: 42,
        }
    }
}

/// Class-balanced sample of row indices, capped per class.
///
/// Classes are visited in order, so dry rows come first; within a
/// class the subset is drawn without replacement from the seeded PRNG.
#[must_use]
pub fn balanced_sample(y: &[usize], n_classes: usize, cap: usize, rng: &mut Lcg64) -> Vec<usize> {
    let mut out = Vec::new();
    for class in 0..n_classes {
        let members: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == class)
            .map(|(i, _)| i)
            .collect();
        let picked = rng.sample_indices(members.len(), cap.min(members.len()));
        out.extend(picked.into_iter().map(|p| members[p]));
    }
    out
}

/// Shapley attribution matrix: one row per explained sample, one
/// column per feature, for the probability of `class_index`.
///
/// # Errors
///
/// Returns `Err` when the background is empty or feature counts
/// disagree with the model.
pub fn shapley_attributions(
    model: &GbmModel,
    rows: &[Vec<f64>],
    background: &[Vec<f64>],
    cfg: &ExplainConfig,
) -> Result<Vec<Vec<f64>>> {
    if background.is_empty() {
        return Err(Error::InvalidInput(
            "shapley estimation needs a nonempty background".into(),
        ));
    }
    if cfg.class_index >= model.n_classes {
        return Err(Error::InvalidInput(format!(
            "class index {} out of range for {} classes",
            cfg.class_index, model.n_classes
        )));
    }
    let d = model.n_features;
    if rows.iter().chain(background).any(|r| r.len() != d) {
        return Err(Error::InvalidInput(
            "feature count differs from the model's".into(),
        ));
    }

    let mut rng = Lcg64::new(cfg.seed);
    let mut out = Vec::with_capacity(rows.len());
    let mut order: Vec<usize> = (0..d).collect();

    for row in rows {
        let mut phi = vec![0.0_f64; d];
        for _ in 0..cfg.permutations {
            let base = &background[rng.next_index(background.len())];
            rng.shuffle(&mut order);

            let mut hybrid = base.clone();
            let mut prev = model.predict_proba(&hybrid)[cfg.class_index];
            for &f in &order {
                hybrid[f] = row[f];
                let next = model.predict_proba(&hybrid)[cfg.class_index];
                phi[f] += next - prev;
                prev = next;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        for p in &mut phi {
            *p /= cfg.permutations as f64;
        }
        out.push(phi);
    }
    Ok(out)
}

/// Global importance: mean absolute attribution per feature.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_abs_attribution(attributions: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = attributions.first() else {
        return Vec::new();
    };
    let mut out = vec![0.0; first.len()];
    for row in attributions {
        for (acc, v) in out.iter_mut().zip(row) {
            *acc += v.abs();
        }
    }
    for acc in &mut out {
        *acc /= attributions.len() as f64;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ml::gbm::GbmConfig;

    fn fitted_model() -> (GbmModel, Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let j = f64::from(i % 8) * 0.02;
            x.push(vec![-1.0 + j, 0.5]);
            y.push(0);
            x.push(vec![1.0 + j, 0.5]);
            y.push(1);
        }
        let cfg = GbmConfig {
            n_rounds: 30,
            max_depth: 3,
            min_child_weight: 1.0,
            eval_every: 0,
            early_stopping_rounds: 0,
            ..GbmConfig::default()
        };
        let model = GbmModel::fit(&x, &y, &[], &[], 2, &["f0", "f1"], &cfg).unwrap();
        (model, x, y)
    }

    #[test]
    fn balanced_sample_caps_each_class() {
        let y = vec![0, 0, 0, 0, 1, 1, 2];
        let mut rng = Lcg64::new(42);
        let sample = balanced_sample(&y, 3, 2, &mut rng);
        assert_eq!(sample.len(), 5); // 2 + 2 + 1
        assert_eq!(sample.iter().filter(|&&i| y[i] == 0).count(), 2);
        assert_eq!(sample.iter().filter(|&&i| y[i] == 2).count(), 1);
    }

    #[test]
    fn attributions_sum_to_probability_difference() {
        let (model, x, _) = fitted_model();
        let rows = vec![x[0].clone()];
        let background = vec![x[1].clone()];
        let cfg = ExplainConfig {
            permutations: 16,
            ..ExplainConfig::default()
        };
        let attr = shapley_attributions(&model, &rows, &background, &cfg).unwrap();
        // With a single background row, efficiency is exact per
        // permutation: Σφ = f(x) − f(background).
        let fx = model.predict_proba(&rows[0])[0];
        let fb = model.predict_proba(&background[0])[0];
        let total: f64 = attr[0].iter().sum();
        assert!((total - (fx - fb)).abs() < 1e-9);
    }

    #[test]
    fn informative_feature_dominates_attribution() {
        let (model, x, y) = fitted_model();
        let mut rng = Lcg64::new(42);
        let idx = balanced_sample(&y, 2, 10, &mut rng);
        let rows: Vec<Vec<f64>> = idx.iter().map(|&i| x[i].clone()).collect();
        let background: Vec<Vec<f64>> = rows.iter().take(5).cloned().collect();
        let cfg = ExplainConfig {
            permutations: 16,
            ..ExplainConfig::default()
        };
        let attr = shapley_attributions(&model, &rows, &background, &cfg).unwrap();
        let imp = mean_abs_attribution(&attr);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn fixed_seed_reproduces_attributions() {
        let (model, x, _) = fitted_model();
        let rows = vec![x[0].clone(), x[3].clone()];
        let background = vec![x[1].clone(), x[2].clone()];
        let cfg = ExplainConfig {
            permutations: 8,
            ..ExplainConfig::default()
        };
        let a = shapley_attributions(&model, &rows, &background, &cfg).unwrap();
        let b = shapley_attributions(&model, &rows, &background, &cfg).unwrap();
        for (ra, rb) in a.iter().zip(&b) {
            for (va, vb) in ra.iter().zip(rb) {
                assert_eq!(va.to_bits(), vb.to_bits());
            }
        }
    }

    #[test]
    fn empty_background_is_error() {
        let (model, x, _) = fitted_model();
        let cfg = ExplainConfig::default();
        assert!(shapley_attributions(&model, &[x[0].clone()], &[], &cfg).is_err());
    }
}
