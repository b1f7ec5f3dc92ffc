// SPDX-License-Identifier: AGPL-3.0-or-later
//! Random forest — bootstrap-aggregated CART ensemble.
//!
//! Each tree trains on a bootstrap resample with √d feature
//! subsampling per split; prediction is a majority vote. Class weights
//! are recomputed per bootstrap (`balanced_subsample`) so the rare
//! dry/wet classes keep their pull inside every resample. All
//! randomness comes from one seed.

use crate::error::{Error, Result};
use crate::ml::prep::balanced_class_weights;
use crate::ml::tree::{DecisionTree, TreeConfig};
use crate::rng::Lcg64;

/// Hyperparameters for the forest trainer.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of trees.
    pub n_estimators: usize,
    /// Per-tree growth limits.
    pub tree: TreeConfig,
    /// Recompute balanced class weights per bootstrap.
    pub balanced_subsample: bool,
    /// PRNG seed.
    pub seed: u64,
    /// Print a progress line every this many trees (0 = silent).
    pub progress_every: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            tree: TreeConfig {
                max_depth: 24,
                min_samples_leaf: 4,
            },
            balanced_subsample: true,
            seed: 42,
            progress_every: 100,
        }
    }
}

/// A fitted random-forest classifier.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_classes: usize,
    n_features: usize,
    importances: Vec<f64>,
}

/// Prediction with vote details.
#[derive(Debug, Clone)]
pub struct ForestPrediction {
    /// Winning class.
    pub class: usize,
    /// Vote count per class.
    pub votes: Vec<usize>,
    /// Fraction of trees voting for the winner.
    pub confidence: f64,
}

/// Integer square root for the √d feature-subsample rule.
fn isqrt(n: usize) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let mut r = (n as f64).sqrt() as usize;
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    while r * r > n {
        r -= 1;
    }
    r
}

impl RandomForest {
    /// Fit the forest on imputed feature rows.
    ///
    /// # Errors
    ///
    /// Returns `Err` on empty input or a failed tree fit.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, cfg: &ForestConfig) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(Error::InvalidInput(
                "forest needs matching, nonempty x and y".into(),
            ));
        }
        let n = x.len();
        let d = x[0].len();
        let max_features = isqrt(d).max(1);
        let mut rng = Lcg64::new(cfg.seed);
        let mut importances = vec![0.0; d];
        let global_weights = balanced_class_weights(y, n_classes);

        let mut trees = Vec::with_capacity(cfg.n_estimators);
        for t in 0..cfg.n_estimators {
            let mut indices: Vec<usize> = (0..n).map(|_| rng.next_index(n)).collect();
            let weights: Vec<f64> = if cfg.balanced_subsample {
                let boot_y: Vec<usize> = indices.iter().map(|&i| y[i]).collect();
                let cw = balanced_class_weights(&boot_y, n_classes);
                y.iter().map(|&c| cw[c]).collect()
            } else {
                y.iter().map(|&c| global_weights[c]).collect()
            };
            let tree = DecisionTree::fit(
                x,
                y,
                &weights,
                &mut indices,
                n_classes,
                &cfg.tree,
                max_features,
                &mut rng,
                &mut importances,
            )?;
            trees.push(tree);
            if cfg.progress_every > 0 && (t + 1) % cfg.progress_every == 0 {
                println!("  trained {}/{} trees", t + 1, cfg.n_estimators);
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        Ok(Self {
            trees,
            n_classes,
            n_features: d,
            importances,
        })
    }

    /// Predict one sample with vote details.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_with_votes(&self, features: &[f64]) -> ForestPrediction {
        let mut votes = vec![0_usize; self.n_classes];
        for tree in &self.trees {
            let p = tree.predict(features);
            if p < self.n_classes {
                votes[p] += 1;
            }
        }
        let (class, &max_votes) = votes
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .unwrap_or((0, &0));
        let confidence = if self.trees.is_empty() {
            0.0
        } else {
            max_votes as f64 / self.trees.len() as f64
        };
        ForestPrediction {
            class,
            votes,
            confidence,
        }
    }

    /// Predict one sample (majority vote).
    #[must_use]
    pub fn predict(&self, features: &[f64]) -> usize {
        self.predict_with_votes(features).class
    }

    /// Predict many samples.
    #[must_use]
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<usize> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Normalized mean-impurity-decrease importance per feature.
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Number of trees.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Expected number of features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}
