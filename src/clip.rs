// SPDX-License-Identifier: AGPL-3.0-or-later
//! Spatial clipper — raw monthly grids to one regional time series.
//!
//! Discovers per-month raw files, resolves the precipitation variable by
//! an explicit name heuristic, restricts to the configured bounding box
//! (handling both ascending and descending latitude axes), and stacks
//! the months into a single series sorted by time.
//!
//! Variable resolution is deliberately strict: a file with no
//! precipitation-like variable is an error naming the candidates, never
//! a silent first-variable fallback.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::io::dsg::{self, DsgData};
use crate::timeax::YearMonth;

/// Bounding box for the clip stage.
#[derive(Debug, Clone)]
pub struct ClipConfig {
    /// Southern edge (degrees north).
    pub lat_min: f64,
    /// Northern edge (degrees north).
    pub lat_max: f64,
    /// Western edge (degrees east, −180..180 convention).
    pub lon_min: f64,
    /// Eastern edge (degrees east).
    pub lon_max: f64,
}

impl Default for ClipConfig {
    /// California Central Valley.
    fn default() -> Self {
        Self {
            lat_min: 35.4,
            lat_max: 40.6,
            lon_min: -122.5,
            lon_max: -119.0,
        }
    }
}

/// Pick the precipitation variable out of `names`.
///
/// Case-insensitive prefix match on `precip` or `pr`.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] listing the candidates when nothing
/// matches — a file without a recognizable precipitation variable is
/// not usable input.
pub fn resolve_precip_var<'a>(names: &[&'a str]) -> Result<&'a str> {
    names
        .iter()
        .find(|n| {
            let lower = n.to_ascii_lowercase();
            lower.starts_with("precip") || lower.starts_with("pr")
        })
        .copied()
        .ok_or_else(|| {
            Error::MissingInput(format!(
                "no precipitation-like variable among {names:?} (expected a name starting with 'pr' or 'precip')"
            ))
        })
}

/// Sorted list of raw monthly files under `dir`.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] when the directory holds no `.dsg`
/// files (or does not exist).
pub fn discover_raw_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|x| x.to_str()) == Some("dsg"))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(Error::MissingInput(format!(
            "no input files found in {}",
            dir.display()
        )));
    }
    Ok(files)
}

/// Indices of `coords` lying within `[min, max]`, preserving the axis
/// direction (a descending latitude axis stays descending).
fn indices_within(coords: &[f64], min: f64, max: f64) -> Vec<usize> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| c >= lo && c <= hi)
        .map(|(i, _)| i)
        .collect()
}

/// Clip one grid to the bounding box.
///
/// # Errors
///
/// Returns `Err` when the box selects no cells.
pub fn clip_grid(grid: &Grid, cfg: &ClipConfig) -> Result<Grid> {
    let lat_idx = indices_within(&grid.lats, cfg.lat_min, cfg.lat_max);
    let lon_idx = indices_within(&grid.lons, cfg.lon_min, cfg.lon_max);
    if lat_idx.is_empty() || lon_idx.is_empty() {
        return Err(Error::InvalidInput(format!(
            "bounding box lat {}..{} lon {}..{} selects no cells",
            cfg.lat_min, cfg.lat_max, cfg.lon_min, cfg.lon_max
        )));
    }

    let lats: Vec<f64> = lat_idx.iter().map(|&i| grid.lats[i]).collect();
    let lons: Vec<f64> = lon_idx.iter().map(|&j| grid.lons[j]).collect();
    let mut data = Vec::with_capacity(grid.n_times() * lats.len() * lons.len());
    for t in 0..grid.n_times() {
        for &i in &lat_idx {
            for &j in &lon_idx {
                data.push(grid.at(t, i, j));
            }
        }
    }
    Grid::new(grid.times.clone(), lats, lons, data)
}

/// Read raw files, clip each, and stack into one series sorted by time.
///
/// Every file must resolve a precipitation variable and, after
/// clipping, agree on the spatial axes with the first file.
///
/// # Errors
///
/// Propagates read, resolution, and axis-mismatch errors.
pub fn clip_and_stack(files: &[PathBuf], cfg: &ClipConfig) -> Result<Grid> {
    let mut steps: Vec<(YearMonth, Vec<f64>)> = Vec::new();
    let mut axes: Option<(Vec<f64>, Vec<f64>)> = None;

    for path in files {
        let raw: DsgData = dsg::read_dsg(path)?;
        let names = raw.var_names();
        let var = resolve_precip_var(&names)?.to_owned();
        let clipped = clip_grid(&raw.to_grid(&var)?, cfg)?;

        match &axes {
            None => axes = Some((clipped.lats.clone(), clipped.lons.clone())),
            Some((lats, lons)) => {
                if *lats != clipped.lats || *lons != clipped.lons {
                    return Err(Error::AxisMismatch(format!(
                        "{}: clipped axes differ from earlier files",
                        path.display()
                    )));
                }
            }
        }
        for (t, &ym) in clipped.times.iter().enumerate() {
            steps.push((ym, clipped.step(t).to_vec()));
        }
    }

    steps.sort_by_key(|(ym, _)| *ym);
    let (lats, lons) = axes.ok_or_else(|| Error::MissingInput("no raw files given".into()))?;
    let times: Vec<YearMonth> = steps.iter().map(|(ym, _)| *ym).collect();
    let data: Vec<f64> = steps.into_iter().flat_map(|(_, s)| s).collect();
    Grid::new(times, lats, lons, data)
}
