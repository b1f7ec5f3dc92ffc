// SPDX-License-Identifier: AGPL-3.0-or-later
//! Diagnostic — drought-class map for one month (`YYYY-MM` argument).
//!
//! ```text
//! plot_drought_map 2014-01
//! ```
//!
//! Defaults to 2014-01. A month outside the labels file exits with the
//! available range.

use std::path::Path;

use dryspring::error::{Error, Result};
use dryspring::io::dsg;
use dryspring::paths;
use dryspring::plot;
use dryspring::timeax::YearMonth;

const DEFAULT_MONTH: &str = "2014-01";

fn run() -> Result<()> {
    let arg = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_MONTH.into());
    let ym = YearMonth::parse(&arg)?;

    let labels = dsg::read_dsg(Path::new(paths::LABELS_FILE))?.to_grid(paths::var::LABEL)?;
    let Some(t) = labels.time_index(ym) else {
        let (Some(first), Some(last)) = (labels.times.first(), labels.times.last()) else {
            return Err(Error::MissingInput("labels file has no time steps".into()));
        };
        return Err(Error::MissingInput(format!(
            "month {ym} not found. Available range: {first} .. {last}"
        )));
    };

    let out = Path::new(paths::OUT_DIR).join(format!("drought_map_{ym}.png"));
    plot::drought_map(
        &out,
        labels.step(t),
        &labels.lats,
        &labels.lons,
        &format!("Central Valley drought classes — {ym}"),
    )?;
    println!("Wrote: {}", out.display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
