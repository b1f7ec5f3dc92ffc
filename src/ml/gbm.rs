// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gradient-boosted trees — multiclass softmax objective.
//!
//! One regression tree per class per round, fit to second-order
//! gradient/hessian statistics with an L2-regularized leaf weight.
//! Missing feature values are handled natively: every split learns a
//! default direction from the training gain, so boosted trees consume
//! un-imputed rows.
//!
//! # Design
//!
//! Array-based trees with child indices, `value <= threshold` left.
//! Rounds are sequential (each tree corrects the running score), the
//! validation multiclass log-loss drives early stopping, and prediction
//! uses the trees through the best round only. The whole forest
//! serializes to JSON for the explainability stage, which must never
//! refit.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ml::metrics::multi_log_loss;
use crate::rng::Lcg64;

/// Hyperparameters for the boosting trainer.
#[derive(Debug, Clone)]
pub struct GbmConfig {
    /// Shrinkage applied to every tree's contribution.
    pub eta: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    /// Row-subsample fraction per round.
    pub subsample: f64,
    /// Feature-subsample fraction per tree.
    pub colsample_bytree: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// L1 regularization on leaf weights.
    pub alpha: f64,
    /// Maximum boosting rounds.
    pub n_rounds: usize,
    /// Stop after this many rounds without validation improvement
    /// (0 disables early stopping).
    pub early_stopping_rounds: usize,
    /// PRNG seed.
    pub seed: u64,
    /// Print train/val log-loss every this many rounds (0 = silent).
    pub eval_every: usize,
}

impl Default for GbmConfig {
    fn default() -> Self {
        Self {
            eta: 0.05,
            max_depth: 8,
            min_child_weight: 5.0,
            subsample: 0.9,
            colsample_bytree: 0.9,
            lambda: 1.0,
            alpha: 0.0,
            n_rounds: 2000,
            early_stopping_rounds: 50,
            seed: 42,
            eval_every: 50,
        }
    }
}

/// Node in a boosting regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmNode {
    /// Feature index (`-2` for leaves).
    pub feature: i32,
    /// Split threshold; `value <= threshold` goes left.
    pub threshold: f64,
    /// Left child index (`-1` for leaves).
    pub left: i32,
    /// Right child index (`-1` for leaves).
    pub right: i32,
    /// Route missing values to the left child.
    pub default_left: bool,
    /// Leaf weight (0 for split nodes).
    pub value: f64,
    /// Split gain (0 for leaves); feeds gain-based importance.
    pub gain: f64,
}

/// One regression tree in the boosted ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmTree {
    nodes: Vec<GbmNode>,
}

impl GbmTree {
    /// Predict the residual for one sample; `NaN` features follow the
    /// learned default direction.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0_usize;
        loop {
            let node = &self.nodes[idx];
            if node.feature < 0 {
                return node.value;
            }
            let v = features
                .get(node.feature as usize)
                .copied()
                .unwrap_or(f64::NAN);
            let go_left = if v.is_nan() {
                node.default_left
            } else {
                v <= node.threshold
            };
            idx = if go_left {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Serialized boosted-forest artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbmModel {
    /// Number of target classes.
    pub n_classes: usize,
    /// Expected number of features.
    pub n_features: usize,
    /// Shrinkage used in training.
    pub eta: f64,
    /// Best round (0-based); prediction sums trees through it.
    pub best_iteration: usize,
    /// Per-class margin offsets (zero for the softmax objective).
    pub init_scores: Vec<f64>,
    /// `trees[round][class]`.
    pub trees: Vec<Vec<GbmTree>>,
    /// Feature names, for importance reports and artifact provenance.
    pub feature_names: Vec<String>,
}

struct SplitStats {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    cfg: &'a GbmConfig,
    features: &'a [usize],
    nodes: Vec<GbmNode>,
}

impl TreeBuilder<'_> {
    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        let a = self.cfg.alpha;
        let g = if g > a {
            g - a
        } else if g < -a {
            g + a
        } else {
            0.0
        };
        -g / (h + self.cfg.lambda)
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        let a = self.cfg.alpha;
        let g = if g > a {
            g - a
        } else if g < -a {
            g + a
        } else {
            0.0
        };
        g * g / (h + self.cfg.lambda)
    }

    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<SplitStats> {
        let parent_score = self.score(g_total, h_total);
        let mut best: Option<SplitStats> = None;
        let mut present: Vec<(f64, f64, f64)> = Vec::with_capacity(rows.len());

        for &f in self.features {
            present.clear();
            let mut g_miss = 0.0;
            let mut h_miss = 0.0;
            for &i in rows {
                let v = self.x[i][f];
                if v.is_nan() {
                    g_miss += self.grad[i];
                    h_miss += self.hess[i];
                } else {
                    present.push((v, self.grad[i], self.hess[i]));
                }
            }
            if present.len() < 2 {
                continue;
            }
            present.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for pos in 1..present.len() {
                let (prev_v, pg, ph) = present[pos - 1];
                g_left += pg;
                h_left += ph;
                let cur_v = present[pos].0;
                if cur_v == prev_v {
                    continue;
                }
                let g_right = g_total - g_miss - g_left;
                let h_right = h_total - h_miss - h_left;
                // missing rows may ride either branch
                for default_left in [true, false] {
                    let (gl, hl, gr, hr) = if default_left {
                        (g_left + g_miss, h_left + h_miss, g_right, h_right)
                    } else {
                        (g_left, h_left, g_right + g_miss, h_right + h_miss)
                    };
                    if hl < self.cfg.min_child_weight || hr < self.cfg.min_child_weight {
                        continue;
                    }
                    let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent_score);
                    if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                        best = Some(SplitStats {
                            feature: f,
                            threshold: (prev_v + cur_v) / 2.0,
                            default_left,
                            gain,
                        });
                    }
                }
            }
        }
        best
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn build(&mut self, rows: &[usize], depth: usize) -> i32 {
        let g_total: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h_total: f64 = rows.iter().map(|&i| self.hess[i]).sum();

        let split = if depth >= self.cfg.max_depth {
            None
        } else {
            self.best_split(rows, g_total, h_total)
        };

        let Some(split) = split else {
            let idx = self.nodes.len();
            self.nodes.push(GbmNode {
                feature: -2,
                threshold: 0.0,
                left: -1,
                right: -1,
                default_left: true,
                value: self.leaf_weight(g_total, h_total),
                gain: 0.0,
            });
            return idx as i32;
        };

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for &i in rows {
            let v = self.x[i][split.feature];
            let go_left = if v.is_nan() {
                split.default_left
            } else {
                v <= split.threshold
            };
            if go_left {
                left_rows.push(i);
            } else {
                right_rows.push(i);
            }
        }

        let idx = self.nodes.len();
        self.nodes.push(GbmNode {
            feature: split.feature as i32,
            threshold: split.threshold,
            left: -1,
            right: -1,
            default_left: split.default_left,
            value: 0.0,
            gain: split.gain,
        });
        let left = self.build(&left_rows, depth + 1);
        let right = self.build(&right_rows, depth + 1);
        self.nodes[idx].left = left;
        self.nodes[idx].right = right;
        idx as i32
    }
}

fn softmax_row(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.iter().map(|&e| e / sum).collect()
}

impl GbmModel {
    /// Fit a boosted forest with early stopping on validation log-loss.
    ///
    /// An empty validation set disables early stopping and keeps every
    /// round.
    ///
    /// # Errors
    ///
    /// Returns `Err` on empty or inconsistent training input.
    #[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
    pub fn fit(
        x_train: &[Vec<f64>],
        y_train: &[usize],
        x_val: &[Vec<f64>],
        y_val: &[usize],
        n_classes: usize,
        feature_names: &[&str],
        cfg: &GbmConfig,
    ) -> Result<Self> {
        if x_train.is_empty() || x_train.len() != y_train.len() {
            return Err(Error::InvalidInput(
                "gbm needs matching, nonempty x and y".into(),
            ));
        }
        let n = x_train.len();
        let d = x_train[0].len();
        let mut rng = Lcg64::new(cfg.seed);

        let mut score_train = vec![0.0_f64; n * n_classes];
        let mut score_val = vec![0.0_f64; x_val.len() * n_classes];

        let mut trees: Vec<Vec<GbmTree>> = Vec::new();
        let mut best_loss = f64::INFINITY;
        let mut best_round = 0_usize;

        let n_sub = ((n as f64) * cfg.subsample).round().max(1.0) as usize;
        let n_cols = ((d as f64) * cfg.colsample_bytree)
            .round()
            .clamp(1.0, d as f64) as usize;

        let mut grad = vec![0.0_f64; n];
        let mut hess = vec![0.0_f64; n];

        for round in 0..cfg.n_rounds {
            let probs: Vec<Vec<f64>> = (0..n)
                .map(|i| softmax_row(&score_train[i * n_classes..(i + 1) * n_classes]))
                .collect();

            let rows = rng.sample_indices(n, n_sub);
            let mut round_trees = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                for i in 0..n {
                    let p = probs[i][class];
                    let target = f64::from(u8::from(y_train[i] == class));
                    grad[i] = p - target;
                    hess[i] = (p * (1.0 - p)).max(1e-16);
                }
                let features = rng.sample_indices(d, n_cols);
                let mut builder = TreeBuilder {
                    x: x_train,
                    grad: &grad,
                    hess: &hess,
                    cfg,
                    features: &features,
                    nodes: Vec::new(),
                };
                builder.build(&rows, 0);
                let tree = GbmTree {
                    nodes: builder.nodes,
                };
                for (i, xi) in x_train.iter().enumerate() {
                    score_train[i * n_classes + class] += cfg.eta * tree.predict(xi);
                }
                for (i, xi) in x_val.iter().enumerate() {
                    score_val[i * n_classes + class] += cfg.eta * tree.predict(xi);
                }
                round_trees.push(tree);
            }
            trees.push(round_trees);

            let train_loss = {
                let p: Vec<Vec<f64>> = (0..n)
                    .map(|i| softmax_row(&score_train[i * n_classes..(i + 1) * n_classes]))
                    .collect();
                multi_log_loss(&p, y_train)
            };
            let val_loss = if x_val.is_empty() {
                train_loss
            } else {
                let p: Vec<Vec<f64>> = (0..x_val.len())
                    .map(|i| softmax_row(&score_val[i * n_classes..(i + 1) * n_classes]))
                    .collect();
                multi_log_loss(&p, y_val)
            };

            if val_loss < best_loss {
                best_loss = val_loss;
                best_round = round;
            }
            if cfg.eval_every > 0 && round % cfg.eval_every == 0 {
                println!("[{round}]  train-mlogloss:{train_loss:.5}  val-mlogloss:{val_loss:.5}");
            }
            if !x_val.is_empty()
                && cfg.early_stopping_rounds > 0
                && round - best_round >= cfg.early_stopping_rounds
            {
                println!(
                    "early stopping at round {round} (best {best_round}, val-mlogloss {best_loss:.5})"
                );
                break;
            }
        }

        if x_val.is_empty() {
            best_round = trees.len().saturating_sub(1);
        }
        trees.truncate(best_round + 1);

        Ok(Self {
            n_classes,
            n_features: d,
            eta: cfg.eta,
            best_iteration: best_round,
            init_scores: vec![0.0; n_classes],
            trees,
            feature_names: feature_names.iter().map(ToString::to_string).collect(),
        })
    }

    /// Per-class probabilities for one row.
    #[must_use]
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut scores = self.init_scores.clone();
        for round in &self.trees {
            for (class, tree) in round.iter().enumerate() {
                scores[class] += self.eta * tree.predict(features);
            }
        }
        softmax_row(&scores)
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

    /// Total split gain per feature across the kept trees.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn gain_importance(&self) -> Vec<f64> {
        let mut imp = vec![0.0; self.n_features];
        for round in &self.trees {
            for tree in round {
                for node in &tree.nodes {
                    if node.feature >= 0 {
                        imp[node.feature as usize] += node.gain;
                    }
                }
            }
        }
        imp
    }

    /// Number of boosting rounds kept in the artifact.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    /// Serialize to JSON atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns `Err` on I/O or serialization failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);
        {
            let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
            let mut w = BufWriter::new(file);
            serde_json::to_writer(&mut w, self)?;
            w.flush().map_err(|e| Error::io(&tmp, e))?;
        }
        fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
    }

    /// Load a serialized model.
    ///
    /// # Errors
    ///
    /// Returns `Err` on I/O failure, malformed JSON, or an artifact
    /// with inconsistent shape.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let model: Self = serde_json::from_reader(BufReader::new(file))?;
        if model.n_classes == 0 || model.init_scores.len() != model.n_classes {
            return Err(Error::Model(format!(
                "{}: inconsistent class count",
                path.display()
            )));
        }
        if model.trees.iter().any(|r| r.len() != model.n_classes) {
            return Err(Error::Model(format!(
                "{}: round with wrong tree count",
                path.display()
            )));
        }
        Ok(model)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet_cfg() -> GbmConfig {
        GbmConfig {
            n_rounds: 40,
            max_depth: 3,
            min_child_weight: 1.0,
            eval_every: 0,
            early_stopping_rounds: 0,
            ..GbmConfig::default()
        }
    }

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let j = f64::from(i % 6) * 0.03;
            x.push(vec![-1.5 + j, 0.0]);
            y.push(0);
            x.push(vec![0.0 + j, 1.0]);
            y.push(1);
            x.push(vec![1.5 + j, 0.0]);
            y.push(2);
        }
        (x, y)
    }

    #[test]
    fn learns_three_blobs() {
        let (x, y) = blobs();
        let model =
            GbmModel::fit(&x, &y, &[], &[], 3, &["f0", "f1"], &quiet_cfg()).unwrap();
        assert_eq!(model.predict(&[-1.5, 0.0]), 0);
        assert_eq!(model.predict(&[0.0, 1.0]), 1);
        assert_eq!(model.predict(&[1.5, 0.0]), 2);
        let p = model.predict_proba(&[1.5, 0.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn handles_missing_values_natively() {
        // feature 0 separates classes; some rows miss it entirely
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40_u32 {
            let v = if i % 10 == 0 {
                f64::NAN
            } else {
                f64::from(i % 2) * 4.0 - 2.0
            };
            x.push(vec![v, f64::from(i % 2)]);
            y.push(i as usize % 2);
        }
        let model = GbmModel::fit(&x, &y, &[], &[], 2, &["f0", "f1"], &quiet_cfg()).unwrap();
        // fully-missing probe still routes through default directions
        let p = model.predict_proba(&[f64::NAN, f64::NAN]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(model.predict(&[-2.0, 0.0]), 0);
        assert_eq!(model.predict(&[2.0, 1.0]), 1);
    }

    #[test]
    fn early_stopping_truncates_rounds() {
        let (x, y) = blobs();
        let cfg = GbmConfig {
            n_rounds: 200,
            early_stopping_rounds: 5,
            eval_every: 0,
            max_depth: 3,
            min_child_weight: 1.0,
            ..GbmConfig::default()
        };
        let model = GbmModel::fit(&x, &y, &x, &y, 3, &["f0", "f1"], &cfg).unwrap();
        assert!(model.n_rounds() <= 200);
        assert_eq!(model.n_rounds(), model.best_iteration + 1);
    }

    #[test]
    fn gain_importance_favors_informative_feature() {
        let (x, y) = blobs();
        let model = GbmModel::fit(&x, &y, &[], &[], 3, &["f0", "f1"], &quiet_cfg()).unwrap();
        let imp = model.gain_importance();
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn save_load_round_trip_preserves_predictions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let (x, y) = blobs();
        let model = GbmModel::fit(&x, &y, &[], &[], 3, &["f0", "f1"], &quiet_cfg()).unwrap();
        model.save(&path).unwrap();
        let back = GbmModel::load(&path).unwrap();
        for xi in &x {
            let a = model.predict_proba(xi);
            let b = back.predict_proba(xi);
            for (pa, pb) in a.iter().zip(&b) {
                assert_eq!(pa.to_bits(), pb.to_bits());
            }
        }
    }

    #[test]
    fn fixed_seed_reproduces_model() {
        let (x, y) = blobs();
        let a = GbmModel::fit(&x, &y, &[], &[], 3, &["f0", "f1"], &quiet_cfg()).unwrap();
        let b = GbmModel::fit(&x, &y, &[], &[], 3, &["f0", "f1"], &quiet_cfg()).unwrap();
        let probe: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![f64::from(i) * 0.3 - 1.5, 0.5])
            .collect();
        assert_eq!(a.predict_batch(&probe), b.predict_batch(&probe));
    }
}
