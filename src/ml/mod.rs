// SPDX-License-Identifier: AGPL-3.0-or-later
//! Baseline classifiers for the drought labels.
//!
//! Three model families share one contract: a fixed chronological
//! train/validation/test split (no shuffling across the boundary),
//! class labels re-encoded dry→0, normal→1, wet→2, and a per-class
//! precision/recall/F1 report plus a row-normalized confusion matrix
//! over the ordered classes {dry, normal, wet}.

pub mod forest;
pub mod gbm;
pub mod logreg;
pub mod metrics;
pub mod prep;
pub mod tree;

/// Ordered class names used by every report and plot.
pub const CLASS_NAMES: [&str; 3] = ["dry", "normal", "wet"];

/// Class labels as reported (matching the stored −1/0/+1 values).
pub const CLASS_TAGS: [&str; 3] = ["dry(-1)", "normal(0)", "wet(1)"];

/// Number of target classes.
pub const N_CLASSES: usize = 3;

/// Encode a stored label (−1/0/+1) as a model class index (0/1/2).
#[must_use]
pub const fn encode_label(label: i8) -> usize {
    match label {
        -1 => 0,
        0 => 1,
        _ => 2,
    }
}

/// Decode a model class index back to the stored label value.
#[must_use]
pub const fn decode_label(class: usize) -> i8 {
    match class {
        0 => -1,
        1 => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_encoding_round_trips() {
        for label in [-1_i8, 0, 1] {
            assert_eq!(decode_label(encode_label(label)), label);
        }
        assert_eq!(encode_label(-1), 0);
        assert_eq!(encode_label(1), 2);
    }
}
