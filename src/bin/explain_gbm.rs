// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 6 — Shapley attribution for the dry-class probability.
//!
//! Loads the boosted-tree artifact (never refits), draws a
//! class-balanced sample from the test partition, and estimates
//! per-feature attributions by permutation sampling against a
//! background subset. Renders the global bar, the beeswarm summary,
//! and the `pr_anom` dependence view.

use std::path::Path;

use dryspring::dataset::FEATURES;
use dryspring::error::Result;
use dryspring::explain::{self, ExplainConfig};
use dryspring::io::table;
use dryspring::ml::gbm::GbmModel;
use dryspring::ml::prep::{self, SplitConfig};
use dryspring::ml::N_CLASSES;
use dryspring::paths;
use dryspring::plot;
use dryspring::rng::Lcg64;

fn run() -> Result<()> {
    let cfg = ExplainConfig::default();
    let out_dir = Path::new(paths::OUT_DIR);

    println!("Loading dataset...");
    let rows = table::read_dataset(Path::new(paths::DATASET_FILE))?;
    let split = prep::split(&rows, &SplitConfig::default());
    println!("Test rows: {}", split.test.len());

    let model_path = out_dir.join("gbm_baseline_model.json");
    println!("Loading model from: {}", model_path.display());
    let model = GbmModel::load(&model_path)?;

    let mut rng = Lcg64::new(cfg.seed);
    let picked = explain::balanced_sample(&split.test.y, N_CLASSES, cfg.per_class, &mut rng);
    let sample: Vec<Vec<f64>> = picked.iter().map(|&i| split.test.x[i].clone()).collect();
    let background: Vec<Vec<f64>> = sample.iter().take(cfg.background).cloned().collect();
    println!(
        "Attribution sample: {} rows, background: {} rows",
        sample.len(),
        background.len()
    );

    println!("Computing attributions (this can take a few minutes)...");
    let attributions = explain::shapley_attributions(&model, &sample, &background, &cfg)?;

    // global ranked importance
    let mean_abs = explain::mean_abs_attribution(&attributions);
    let mut ranked: Vec<(usize, f64)> = mean_abs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let names: Vec<&str> = ranked.iter().map(|&(i, _)| FEATURES[i]).collect();
    let values: Vec<f64> = ranked.iter().map(|&(_, v)| v).collect();
    let bar_path = out_dir.join("gbm_shap_summary_bar_dry.png");
    plot::barh(
        &bar_path,
        &names,
        &values,
        "Global attribution to dry probability",
        "mean |attribution|",
    )?;
    println!("Wrote: {}", bar_path.display());

    let beeswarm_path = out_dir.join("gbm_shap_summary_beeswarm_dry.png");
    plot::shap_beeswarm(
        &beeswarm_path,
        &attributions,
        &sample,
        &FEATURES,
        "Attribution summary — dry probability",
    )?;
    println!("Wrote: {}", beeswarm_path.display());

    // dependence view for pr_anom
    let anom_idx = FEATURES
        .iter()
        .position(|&f| f == "pr_anom")
        .unwrap_or(1);
    let xs: Vec<f64> = sample.iter().map(|r| r[anom_idx]).collect();
    let ys: Vec<f64> = attributions.iter().map(|r| r[anom_idx]).collect();
    let dep_path = out_dir.join("gbm_shap_dependence_pr_anom_dry.png");
    plot::dependence_scatter(
        &dep_path,
        &xs,
        &ys,
        "pr_anom",
        "Dependence — pr_anom effect on dry probability",
    )?;
    println!("Wrote: {}", dep_path.display());
    println!("Done.");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
