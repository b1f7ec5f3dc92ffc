// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 5b — random-forest baseline on the full dataset.
//!
//! Same chronological split as the other trainers; median imputation
//! only (trees need no scaling). Reports test metrics, the normalized
//! confusion matrix, and mean-impurity-decrease feature importance.

use std::path::Path;

use dryspring::dataset::FEATURES;
use dryspring::error::Result;
use dryspring::io::{self, table};
use dryspring::ml::forest::{ForestConfig, RandomForest};
use dryspring::ml::metrics;
use dryspring::ml::prep::{self, MedianImputer, SplitConfig};
use dryspring::ml::{CLASS_NAMES, CLASS_TAGS, N_CLASSES};
use dryspring::paths;
use dryspring::plot;

fn run() -> Result<()> {
    let rows = table::read_dataset(Path::new(paths::DATASET_FILE))?;
    let mut split = prep::split(&rows, &SplitConfig::default());
    println!(
        "Train rows: {}  Val rows: {}  Test rows: {}",
        split.train.len(),
        split.val.len(),
        split.test.len()
    );

    let imputer = MedianImputer::fit(&split.train.x);
    imputer.transform(&mut split.train.x);
    imputer.transform(&mut split.val.x);
    imputer.transform(&mut split.test.x);

    let cfg = ForestConfig::default();
    println!(
        "Fitting random forest ({} trees, depth {})...",
        cfg.n_estimators, cfg.tree.max_depth
    );
    let model = RandomForest::fit(&split.train.x, &split.train.y, N_CLASSES, &cfg)?;

    let y_pred = model.predict_batch(&split.test.x);
    let report = metrics::classification_report(&split.test.y, &y_pred, &CLASS_TAGS);
    println!("{report}");

    let out_dir = Path::new(paths::OUT_DIR);
    let metrics_path = out_dir.join("rf_full_metrics.txt");
    io::write_text_atomic(&metrics_path, &report)?;
    println!("Wrote: {}", metrics_path.display());

    let cm = metrics::confusion_matrix(&split.test.y, &y_pred, N_CLASSES);
    let cm_path = out_dir.join("rf_full_cm.png");
    plot::confusion_heatmap(
        &cm_path,
        &metrics::normalize_rows(&cm),
        &CLASS_NAMES,
        "Random forest — normalized confusion matrix",
    )?;
    println!("Wrote: {}", cm_path.display());

    // importance, largest first
    let mut ranked: Vec<(usize, f64)> = model
        .importances()
        .iter()
        .copied()
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let names: Vec<&str> = ranked.iter().map(|&(i, _)| FEATURES[i]).collect();
    let values: Vec<f64> = ranked.iter().map(|&(_, v)| v).collect();
    let fi_path = out_dir.join("rf_full_feature_importance.png");
    plot::barh(
        &fi_path,
        &names,
        &values,
        "Random forest — feature importance",
        "mean impurity decrease",
    )?;
    println!("Wrote: {}", fi_path.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
