// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 4 — assemble the model-ready tabular dataset.
//!
//! Joins precipitation, anomalies, lag features and labels into the
//! fixed-column CSV every trainer consumes.

use std::path::Path;

use dryspring::climo;
use dryspring::dataset;
use dryspring::error::{Error, Result};
use dryspring::io::{dsg, table};
use dryspring::paths;

fn run() -> Result<()> {
    let pr = dsg::read_dsg(Path::new(paths::PR_FILE))?.to_grid(paths::var::PR)?;
    let anom = dsg::read_dsg(Path::new(paths::ANOM_FILE))?.to_grid(paths::var::PR_ANOM)?;
    let labels = dsg::read_dsg(Path::new(paths::LABELS_FILE))?.to_grid(paths::var::LABEL)?;

    // The anomaly and label files cover the target window; align the
    // series to the same span before joining.
    let (Some(&first), Some(&last)) = (anom.times.first(), anom.times.last()) else {
        return Err(Error::MissingInput("anomaly file has no time steps".into()));
    };
    let pr = climo::subset_time(&pr, first, last);

    let rows = dataset::assemble(&pr, &anom, &labels)?;
    let out = Path::new(paths::DATASET_FILE);
    table::write_dataset(out, &rows)?;
    println!(
        "Wrote: {} (rows={}, cols={})",
        out.display(),
        rows.len(),
        dataset::COLUMNS.len()
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
