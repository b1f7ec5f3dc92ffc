// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 5c — gradient-boosted trees with early stopping.
//!
//! Missing values ride the learned default directions, so the rows go
//! in un-imputed. The validation partition drives early stopping; the
//! serialized artifact feeds the explainability stage.

use std::path::Path;

use dryspring::dataset::FEATURES;
use dryspring::error::Result;
use dryspring::io::{self, table};
use dryspring::ml::gbm::{GbmConfig, GbmModel};
use dryspring::ml::metrics;
use dryspring::ml::prep::{self, SplitConfig};
use dryspring::ml::{CLASS_NAMES, CLASS_TAGS, N_CLASSES};
use dryspring::paths;
use dryspring::plot;

fn run() -> Result<()> {
    let rows = table::read_dataset(Path::new(paths::DATASET_FILE))?;
    let split = prep::split(&rows, &SplitConfig::default());
    println!(
        "Train rows: {}  Val rows: {}  Test rows: {}",
        split.train.len(),
        split.val.len(),
        split.test.len()
    );

    println!("Training gradient-boosted trees...");
    let model = GbmModel::fit(
        &split.train.x,
        &split.train.y,
        &split.val.x,
        &split.val.y,
        N_CLASSES,
        &FEATURES,
        &GbmConfig::default(),
    )?;
    println!("Best iteration: {}", model.best_iteration);

    let y_pred = model.predict_batch(&split.test.x);
    let report = metrics::classification_report(&split.test.y, &y_pred, &CLASS_TAGS);
    println!("{report}");

    let out_dir = Path::new(paths::OUT_DIR);
    let metrics_path = out_dir.join("gbm_baseline_metrics.txt");
    io::write_text_atomic(&metrics_path, &report)?;
    println!("Wrote: {}", metrics_path.display());

    let cm = metrics::confusion_matrix(&split.test.y, &y_pred, N_CLASSES);
    let cm_path = out_dir.join("gbm_baseline_cm.png");
    plot::confusion_heatmap(
        &cm_path,
        &metrics::normalize_rows(&cm),
        &CLASS_NAMES,
        "Boosted trees — normalized confusion matrix",
    )?;
    println!("Wrote: {}", cm_path.display());

    let mut ranked: Vec<(usize, f64)> = model
        .gain_importance()
        .into_iter()
        .enumerate()
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let names: Vec<&str> = ranked.iter().map(|&(i, _)| FEATURES[i]).collect();
    let values: Vec<f64> = ranked.iter().map(|&(_, v)| v).collect();
    let fi_path = out_dir.join("gbm_baseline_feature_importance.png");
    plot::barh(
        &fi_path,
        &names,
        &values,
        "Boosted trees — feature importance",
        "total split gain",
    )?;
    println!("Wrote: {}", fi_path.display());

    let model_path = out_dir.join("gbm_baseline_model.json");
    model.save(&model_path)?;
    println!("Wrote model: {}", model_path.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
