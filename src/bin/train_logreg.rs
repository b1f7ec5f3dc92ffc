// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 5a — baseline multinomial logistic regression.
//!
//! Chronological split, train-median imputation, train-moment scaling,
//! balanced class weights. Reports test metrics and the normalized
//! confusion matrix.

use std::path::Path;

use dryspring::error::Result;
use dryspring::io::{self, table};
use dryspring::ml::logreg::{LogRegConfig, LogisticRegression};
use dryspring::ml::metrics;
use dryspring::ml::prep::{self, MedianImputer, SplitConfig, Standardizer};
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

    let scaler = Standardizer::fit(&split.train.x);
    scaler.transform(&mut split.train.x);
    scaler.transform(&mut split.val.x);
    scaler.transform(&mut split.test.x);

    println!("Fitting multinomial logistic regression...");
    let model = LogisticRegression::fit(
        &split.train.x,
        &split.train.y,
        N_CLASSES,
        &LogRegConfig::default(),
    )?;

    let y_pred = model.predict_batch(&split.test.x);
    let report = metrics::classification_report(&split.test.y, &y_pred, &CLASS_TAGS);
    println!("{report}");

    let out_dir = Path::new(paths::OUT_DIR);
    let metrics_path = out_dir.join("baseline_logreg_metrics.txt");
    io::write_text_atomic(&metrics_path, &report)?;
    println!("Wrote: {}", metrics_path.display());

    let cm = metrics::confusion_matrix(&split.test.y, &y_pred, N_CLASSES);
    let cm_path = out_dir.join("baseline_logreg_cm.png");
    plot::confusion_heatmap(
        &cm_path,
        &metrics::normalize_rows(&cm),
        &CLASS_NAMES,
        "Baseline logistic regression — normalized confusion matrix",
    )?;
    println!("Wrote: {}", cm_path.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
