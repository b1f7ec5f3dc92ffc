// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stage 1 — clip raw monthly grids to the Central Valley box.
//!
//! Reads every raw `.dsg` under the input directory, resolves the
//! precipitation variable per file, clips to the bounding box, and
//! writes one compressed regional series named `pr`.

use std::path::Path;

use dryspring::clip::{self, ClipConfig};
use dryspring::error::Result;
use dryspring::io::dsg;
use dryspring::paths;

fn run() -> Result<()> {
    let cfg = ClipConfig::default();
    let files = clip::discover_raw_files(Path::new(paths::RAW_DIR))?;
    println!("Found {} raw monthly files", files.len());

    let grid = clip::clip_and_stack(&files, &cfg)?;
    let out = Path::new(paths::PR_FILE);
    dsg::write_series(out, paths::var::PR, &grid)?;

    println!("Wrote: {}", out.display());
    println!(
        "Dims: time {} x lat {} x lon {}",
        grid.n_times(),
        grid.n_lats(),
        grid.n_lons()
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
