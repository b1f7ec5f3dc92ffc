// SPDX-License-Identifier: AGPL-3.0-or-later
//! Array-based CART classifier — training and inference.
//!
//! Nodes live in a flat `Vec` with child indices; `feature < 0` marks a
//! leaf, and samples with `value <= threshold` go left. Splits maximize
//! the weighted Gini impurity decrease over a per-node random feature
//! subset, which is what the forest needs; a single tree gets the full
//! feature set.
//!
//! Training inputs must be imputed — missing values are handled
//! upstream (median imputation) or by the boosting trees, which learn a
//! default direction instead.

use crate::error::{Error, Result};
use crate::rng::Lcg64;

/// Stopping rules for tree growth.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Maximum depth (root at depth 0).
    pub max_depth: usize,
    /// Minimum training rows per leaf.
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 24,
            min_samples_leaf: 4,
        }
    }
}

/// A node in the decision tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Feature index to split on (`-2` for leaf nodes).
    pub feature: i32,
    /// Split threshold (features <= threshold go left).
    pub threshold: f64,
    /// Index of left child (`-1` for leaf).
    pub left: i32,
    /// Index of right child (`-1` for leaf).
    pub right: i32,
    /// Predicted class for leaf nodes.
    pub prediction: Option<usize>,
}

impl TreeNode {
    /// Returns `true` if this node is a leaf.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.feature < 0
    }
}

/// A decision-tree classifier.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    cfg: &'a TreeConfig,
    max_features: usize,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
}

impl Builder<'_> {
    fn weighted_counts(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += self.weights[i];
        }
        counts
    }

    fn gini(counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        1.0 - counts.iter().map(|&c| (c / total) * (c / total)).sum::<f64>()
    }

    fn majority(counts: &[f64]) -> usize {
        counts
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map_or(0, |(c, _)| c)
    }

    fn leaf(&mut self, counts: &[f64]) -> i32 {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            feature: -2,
            threshold: -2.0,
            left: -1,
            right: -1,
            prediction: Some(Self::majority(counts)),
        });
        i32::try_from(idx).unwrap_or(i32::MAX)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn build(&mut self, indices: &mut Vec<usize>, depth: usize, rng: &mut Lcg64) -> i32 {
        let counts = self.weighted_counts(indices);
        let total: f64 = counts.iter().sum();
        let parent_gini = Self::gini(&counts, total);
        let pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        if depth >= self.cfg.max_depth
            || indices.len() < 2 * self.cfg.min_samples_leaf
            || pure
        {
            return self.leaf(&counts);
        }

        let d = self.x[0].len();
        let candidates = rng.sample_indices(d, self.max_features);

        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, gain)
        let mut sortable: Vec<(f64, usize)> = Vec::with_capacity(indices.len());
        for &f in &candidates {
            sortable.clear();
            sortable.extend(indices.iter().map(|&i| (self.x[i][f], i)));
            sortable.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0.0; self.n_classes];
            let mut left_w = 0.0;
            for pos in 1..sortable.len() {
                let (prev_v, prev_i) = sortable[pos - 1];
                left_counts[self.y[prev_i]] += self.weights[prev_i];
                left_w += self.weights[prev_i];
                let cur_v = sortable[pos].0;
                if cur_v == prev_v {
                    continue;
                }
                if pos < self.cfg.min_samples_leaf
                    || sortable.len() - pos < self.cfg.min_samples_leaf
                {
                    continue;
                }
                let right_w = total - left_w;
                if left_w <= 0.0 || right_w <= 0.0 {
                    continue;
                }
                let right_counts: Vec<f64> = counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(&t, &l)| t - l)
                    .collect();
                let gain = parent_gini
                    - (left_w / total) * Self::gini(&left_counts, left_w)
                    - (right_w / total) * Self::gini(&right_counts, right_w);
                if gain > best.map_or(1e-12, |(_, _, g)| g) {
                    best = Some((f, (prev_v + cur_v) / 2.0, gain));
                }
            }
        }

        let Some((feature, threshold, gain)) = best else {
            return self.leaf(&counts);
        };
        self.importances[feature] += total * gain;

        let (mut left_idx, mut right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][feature] <= threshold);

        let node = self.nodes.len();
        self.nodes.push(TreeNode {
            feature: feature as i32,
            threshold,
            left: -1,
            right: -1,
            prediction: None,
        });
        let left = self.build(&mut left_idx, depth + 1, rng);
        let right = self.build(&mut right_idx, depth + 1, rng);
        self.nodes[node].left = left;
        self.nodes[node].right = right;
        node as i32
    }
}

impl DecisionTree {
    /// Fit a tree on the rows named by `indices` (repeats act as
    /// bootstrap weights), with per-row class weights.
    ///
    /// `importances` accumulates the weighted impurity decrease per
    /// feature across this tree's splits.
    ///
    /// # Errors
    ///
    /// Returns `Err` on empty or inconsistent inputs.
    #[allow(clippy::too_many_arguments)]
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        weights: &[f64],
        indices: &mut Vec<usize>,
        n_classes: usize,
        cfg: &TreeConfig,
        max_features: usize,
        rng: &mut Lcg64,
        importances: &mut [f64],
    ) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() || x.len() != weights.len() {
            return Err(Error::InvalidInput(
                "tree needs matching, nonempty x, y and weights".into(),
            ));
        }
        if indices.is_empty() {
            return Err(Error::InvalidInput("tree needs at least one row".into()));
        }
        let d = x[0].len();
        let mut builder = Builder {
            x,
            y,
            weights,
            n_classes,
            cfg,
            max_features: max_features.clamp(1, d),
            nodes: Vec::new(),
            importances: vec![0.0; d],
        };
        builder.build(indices, 0, rng);
        for (acc, imp) in importances.iter_mut().zip(&builder.importances) {
            *acc += imp;
        }
        Ok(Self {
            nodes: builder.nodes,
            n_features: d,
        })
    }

    /// Classify a single sample.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn predict(&self, features: &[f64]) -> usize {
        let mut idx = 0_usize;
        loop {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                return node.prediction.unwrap_or(0);
            }
            let v = features.get(node.feature as usize).copied().unwrap_or(0.0);
            idx = if v <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Classify multiple samples.
    #[must_use]
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Vec<usize> {
        samples.iter().map(|s| self.predict(s)).collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Expected number of features.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fit_simple(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> DecisionTree {
        let weights = vec![1.0; y.len()];
        let mut indices: Vec<usize> = (0..y.len()).collect();
        let mut imp = vec![0.0; x[0].len()];
        DecisionTree::fit(
            x,
            y,
            &weights,
            &mut indices,
            n_classes,
            &TreeConfig {
                max_depth: 5,
                min_samples_leaf: 1,
            },
            x[0].len(),
            &mut Lcg64::new(42),
            &mut imp,
        )
        .unwrap()
    }

    #[test]
    fn learns_a_single_threshold() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![f64::from(i), 0.0])
            .collect();
        let y: Vec<usize> = (0..20).map(|i| usize::from(i >= 10)).collect();
        let tree = fit_simple(&x, &y, 2);
        assert_eq!(tree.predict(&[3.0, 0.0]), 0);
        assert_eq!(tree.predict(&[15.0, 0.0]), 1);
        // split lands between 9 and 10; 9.5 goes left
        assert_eq!(tree.predict(&[9.5, 0.0]), 0);
    }

    #[test]
    fn learns_three_classes_on_two_features() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..15 {
            let j = f64::from(i % 5) * 0.05;
            x.push(vec![0.0 + j, 0.0]);
            y.push(0);
            x.push(vec![1.0 + j, 0.0]);
            y.push(1);
            x.push(vec![0.5 + j, 1.0]);
            y.push(2);
        }
        let tree = fit_simple(&x, &y, 3);
        assert_eq!(tree.predict(&[0.05, 0.0]), 0);
        assert_eq!(tree.predict(&[1.05, 0.0]), 1);
        assert_eq!(tree.predict(&[0.55, 1.0]), 2);
        assert!(tree.n_leaves() >= 3);
    }

    #[test]
    fn pure_node_stops_growing() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let y = vec![1; 10];
        let tree = fit_simple(&x, &y, 3);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[4.0]), 1);
    }

    #[test]
    fn importance_lands_on_the_informative_feature() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            // feature 1 is informative, feature 0 is constant
            x.push(vec![1.0, f64::from(i)]);
            y.push(usize::from(i >= 20));
        }
        let weights = vec![1.0; y.len()];
        let mut indices: Vec<usize> = (0..y.len()).collect();
        let mut imp = vec![0.0; 2];
        let _ = DecisionTree::fit(
            &x,
            &y,
            &weights,
            &mut indices,
            2,
            &TreeConfig::default(),
            2,
            &mut Lcg64::new(42),
            &mut imp,
        )
        .unwrap();
        assert_eq!(imp[0], 0.0);
        assert!(imp[1] > 0.0);
    }

    #[test]
    fn class_weights_override_majority() {
        // 1 heavy row of class 0 vs 3 light rows of class 1,
        // indistinguishable features — leaf follows the weight.
        let x = vec![vec![0.0]; 4];
        let y = vec![0, 1, 1, 1];
        let weights = vec![10.0, 1.0, 1.0, 1.0];
        let mut indices: Vec<usize> = (0..4).collect();
        let mut imp = vec![0.0; 1];
        let tree = DecisionTree::fit(
            &x,
            &y,
            &weights,
            &mut indices,
            2,
            &TreeConfig::default(),
            1,
            &mut Lcg64::new(1),
            &mut imp,
        )
        .unwrap();
        assert_eq!(tree.predict(&[0.0]), 0);
    }
}
