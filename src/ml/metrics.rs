// SPDX-License-Identifier: AGPL-3.0-or-later
//! Classification metrics: per-class report, confusion matrix,
//! multiclass log-loss.
//!
//! The text report mirrors the familiar precision/recall/F1 table
//! (three decimal digits, accuracy plus macro and weighted averages)
//! so metrics files diff cleanly across model families.

use std::fmt::Write as _;

/// Counts of (true class, predicted class) pairs.
///
/// `cm[t][p]` = rows of true class `t` predicted as `p`.
#[must_use]
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut cm = vec![vec![0_usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        cm[t][p] += 1;
    }
    cm
}

/// Row-normalize a confusion matrix (fractions of each true class).
///
/// Empty rows normalize to all zeros.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize_rows(cm: &[Vec<usize>]) -> Vec<Vec<f64>> {
    cm.iter()
        .map(|row| {
            let total: usize = row.iter().sum();
            row.iter()
                .map(|&c| {
                    if total == 0 {
                        0.0
                    } else {
                        c as f64 / total as f64
                    }
                })
                .collect()
        })
        .collect()
}

/// Per-class precision/recall/F1 plus support.
#[derive(Debug, Clone)]
pub struct ClassScores {
    /// Precision per class.
    pub precision: Vec<f64>,
    /// Recall per class.
    pub recall: Vec<f64>,
    /// F1 per class.
    pub f1: Vec<f64>,
    /// True-class row counts.
    pub support: Vec<usize>,
}

/// Compute per-class scores from a confusion matrix.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn class_scores(cm: &[Vec<usize>]) -> ClassScores {
    let k = cm.len();
    let mut precision = vec![0.0; k];
    let mut recall = vec![0.0; k];
    let mut f1 = vec![0.0; k];
    let mut support = vec![0_usize; k];
    for c in 0..k {
        let tp = cm[c][c];
        let pred_c: usize = (0..k).map(|t| cm[t][c]).sum();
        let true_c: usize = cm[c].iter().sum();
        support[c] = true_c;
        precision[c] = if pred_c == 0 {
            0.0
        } else {
            tp as f64 / pred_c as f64
        };
        recall[c] = if true_c == 0 {
            0.0
        } else {
            tp as f64 / true_c as f64
        };
        f1[c] = if precision[c] + recall[c] == 0.0 {
            0.0
        } else {
            2.0 * precision[c] * recall[c] / (precision[c] + recall[c])
        };
    }
    ClassScores {
        precision,
        recall,
        f1,
        support,
    }
}

/// Render the classification-report text table.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::missing_panics_doc)]
pub fn classification_report(y_true: &[usize], y_pred: &[usize], names: &[&str]) -> String {
    let k = names.len();
    let cm = confusion_matrix(y_true, y_pred, k);
    let scores = class_scores(&cm);
    let total: usize = scores.support.iter().sum();
    let correct: usize = (0..k).map(|c| cm[c][c]).sum();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    };

    let width = names
        .iter()
        .map(|n| n.len())
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$}  precision    recall  f1-score   support",
        "",
    );
    out.push('\n');
    for (c, name) in names.iter().enumerate() {
        let _ = writeln!(
            out,
            "{name:>width$}      {:.3}     {:.3}     {:.3}  {:>8}",
            scores.precision[c], scores.recall[c], scores.f1[c], scores.support[c],
        );
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "{:>width$}                          {accuracy:.3}  {total:>8}",
        "accuracy",
    );

    let macro_p = scores.precision.iter().sum::<f64>() / k as f64;
    let macro_r = scores.recall.iter().sum::<f64>() / k as f64;
    let macro_f = scores.f1.iter().sum::<f64>() / k as f64;
    let _ = writeln!(
        out,
        "{:>width$}      {macro_p:.3}     {macro_r:.3}     {macro_f:.3}  {total:>8}",
        "macro avg",
    );

    let wsum = |v: &[f64]| -> f64 {
        v.iter()
            .zip(&scores.support)
            .map(|(&x, &s)| x * s as f64)
            .sum::<f64>()
            / if total == 0 { 1.0 } else { total as f64 }
    };
    let _ = writeln!(
        out,
        "{:>width$}      {:.3}     {:.3}     {:.3}  {total:>8}",
        "weighted avg",
        wsum(&scores.precision),
        wsum(&scores.recall),
        wsum(&scores.f1),
    );
    out
}

/// Multiclass log-loss with probability clipping.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn multi_log_loss(probs: &[Vec<f64>], y_true: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (p, &c) in probs.iter().zip(y_true) {
        let pc = p[c].clamp(1e-15, 1.0 - 1e-15);
        total -= pc.ln();
    }
    total / y_true.len() as f64
}
