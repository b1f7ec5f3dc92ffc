// SPDX-License-Identifier: AGPL-3.0-or-later
//! Diagnostic — monthly dry/normal/wet area fractions.
//!
//! Fractions are over cells with a defined label that month; the table
//! goes to CSV and the series to a stacked-area chart.

use std::path::Path;

use dryspring::error::{Error, Result};
use dryspring::io::{dsg, table};
use dryspring::labels::{DRY, NORMAL, WET};
use dryspring::paths;
use dryspring::plot;
use dryspring::timeax::YearMonth;

#[allow(clippy::cast_precision_loss)]
fn run() -> Result<()> {
    let labels = dsg::read_dsg(Path::new(paths::LABELS_FILE))?.to_grid(paths::var::LABEL)?;
    if labels.n_times() == 0 {
        return Err(Error::MissingInput("labels file has no time steps".into()));
    }

    let mut rows: Vec<(YearMonth, f64, f64, f64)> = Vec::with_capacity(labels.n_times());
    for (t, &ym) in labels.times.iter().enumerate() {
        let mut dry = 0_usize;
        let mut normal = 0_usize;
        let mut wet = 0_usize;
        let mut valid = 0_usize;
        for &v in labels.step(t) {
            if v.is_nan() {
                continue;
            }
            valid += 1;
            if v == DRY {
                dry += 1;
            } else if v == WET {
                wet += 1;
            } else if v == NORMAL {
                normal += 1;
            }
        }
        let frac = |c: usize| {
            if valid == 0 {
                0.0
            } else {
                c as f64 / valid as f64
            }
        };
        rows.push((ym, frac(dry), frac(normal), frac(wet)));
    }

    let out_dir = Path::new(paths::OUT_DIR);
    let csv_path = out_dir.join("drought_shares.csv");
    table::write_shares(&csv_path, &rows)?;
    println!("Wrote: {}", csv_path.display());

    let times: Vec<YearMonth> = rows.iter().map(|r| r.0).collect();
    let dry: Vec<f64> = rows.iter().map(|r| r.1).collect();
    let normal: Vec<f64> = rows.iter().map(|r| r.2).collect();
    let wet: Vec<f64> = rows.iter().map(|r| r.3).collect();
    let png_path = out_dir.join("drought_shares_stacked.png");
    plot::stacked_shares(
        &png_path,
        &times,
        &dry,
        &normal,
        &wet,
        "Central Valley monthly drought-class shares",
    )?;
    println!("Wrote: {}", png_path.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
