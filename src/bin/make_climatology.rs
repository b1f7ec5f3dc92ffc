// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 2 — monthly climatology and anomalies.
//!
//! Climatology is the per-calendar-month mean over 1991–2020 only;
//! anomalies cover the full 1991–2025 target window against that
//! reference.

use std::path::Path;

use dryspring::climo::{self, ClimoConfig};
use dryspring::error::Result;
use dryspring::io::dsg::{self, GridVar};
use dryspring::paths;

fn run() -> Result<()> {
    let cfg = ClimoConfig::default();
    let data = dsg::read_dsg(Path::new(paths::PR_FILE))?;
    let pr = data.to_grid(paths::var::PR)?;
    println!(
        "Loaded {}: time {} x lat {} x lon {}",
        paths::PR_FILE,
        pr.n_times(),
        pr.n_lats(),
        pr.n_lons()
    );

    let clim = climo::monthly_climatology(&pr, cfg.baseline_start, cfg.baseline_end);
    let clim_out = Path::new(paths::CLIM_FILE);
    dsg::write_dsg(
        clim_out,
        &[],
        &clim.lats,
        &clim.lons,
        &[GridVar::calendar(paths::var::PR_CLIM, &clim)],
    )?;
    println!("Wrote: {}", clim_out.display());

    let anom = climo::anomalies(&pr, &clim, cfg.target_start, cfg.target_end)?;
    let anom_out = Path::new(paths::ANOM_FILE);
    dsg::write_series(anom_out, paths::var::PR_ANOM, &anom)?;
    println!("Wrote: {}", anom_out.display());
    if let (Some(first), Some(last)) = (anom.times.first(), anom.times.last()) {
        println!("  time span: {first} → {last}");
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
