// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 3 — percentile thresholds and drought labels.
//!
//! Computes per-month 20th/80th percentile thresholds over the
//! baseline, classifies every observation in the target window, and
//! persists the thresholds next to the labels for provenance.

use std::path::Path;

use dryspring::error::Result;
use dryspring::io::dsg::{self, GridVar};
use dryspring::labels::{self, LabelConfig};
use dryspring::paths;

fn run() -> Result<()> {
    let cfg = LabelConfig::default();
    let data = dsg::read_dsg(Path::new(paths::PR_FILE))?;
    let pr = data.to_grid(paths::var::PR)?;
    println!(
        "Loaded {}: time {} x lat {} x lon {}",
        paths::PR_FILE,
        pr.n_times(),
        pr.n_lats(),
        pr.n_lons()
    );

    let thresholds = labels::monthly_thresholds(&pr, &cfg);
    let label_grid = labels::classify(&pr, &thresholds, &cfg)?;

    let out = Path::new(paths::LABELS_FILE);
    dsg::write_dsg(
        out,
        &label_grid.times,
        &label_grid.lats,
        &label_grid.lons,
        &[
            GridVar::series(paths::var::LABEL, &label_grid),
            GridVar::calendar(paths::var::P20, &thresholds.p_low),
            GridVar::calendar(paths::var::P80, &thresholds.p_high),
        ],
    )?;

    let (dry, normal, wet) = labels::count_labels(&label_grid);
    println!("Wrote: {}", out.display());
    println!("Counts (all grid-cells x months): dry {dry}, normal {normal}, wet {wet}");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
