// SPDX-License-Identifier: AGPL-3.0-or-later
//! Monthly climatology and standardized anomalies.
//!
//! The climatology is the per-calendar-month mean over the fixed
//! baseline window only; anomalies subtract the month-matched
//! climatology from every observation in the (longer) target window,
//! so months outside the baseline are still referenced against it.

use crate::error::Result;
use crate::grid::{Grid, MonthlyField};
use crate::timeax::YearMonth;

/// Baseline and target windows for the climatology stage.
#[derive(Debug, Clone)]
pub struct ClimoConfig {
    /// First month of the baseline window (inclusive).
    pub baseline_start: YearMonth,
    /// Last month of the baseline window (inclusive).
    pub baseline_end: YearMonth,
    /// First month of the target window (inclusive).
    pub target_start: YearMonth,
    /// Last month of the target window (inclusive).
    pub target_end: YearMonth,
}

impl Default for ClimoConfig {
    /// Baseline 1991–2020, target 1991–2025.
    fn default() -> Self {
        Self {
            baseline_start: YearMonth { year: 1991, month: 1 },
            baseline_end: YearMonth { year: 2020, month: 12 },
            target_start: YearMonth { year: 1991, month: 1 },
            target_end: YearMonth { year: 2025, month: 12 },
        }
    }
}

/// Restrict a grid to the months in `[start, end]`.
///
/// Months outside the stored axis are simply absent from the result —
/// slicing past the data is not an error (the original pipeline slices
/// "through end of 2025; extra months are ignored").
#[must_use]
pub fn subset_time(grid: &Grid, start: YearMonth, end: YearMonth) -> Grid {
    let keep: Vec<usize> = grid
        .times
        .iter()
        .enumerate()
        .filter(|(_, &ym)| ym >= start && ym <= end)
        .map(|(t, _)| t)
        .collect();
    let times: Vec<YearMonth> = keep.iter().map(|&t| grid.times[t]).collect();
    let mut out = Grid::filled_missing(times, grid.lats.clone(), grid.lons.clone());
    for (new_t, &t) in keep.iter().enumerate() {
        for i in 0..grid.n_lats() {
            for j in 0..grid.n_lons() {
                out.set(new_t, i, j, grid.at(t, i, j));
            }
        }
    }
    out
}

/// Per-calendar-month mean over the baseline window, missing-skipping.
///
/// Cell-months with zero valid baseline samples stay missing.
#[must_use]
pub fn monthly_climatology(grid: &Grid, start: YearMonth, end: YearMonth) -> MonthlyField {
    let cells = grid.cells_per_step();
    let mut sums = vec![0.0_f64; 12 * cells];
    let mut counts = vec![0_u32; 12 * cells];

    for (t, &ym) in grid.times.iter().enumerate() {
        if ym < start || ym > end {
            continue;
        }
        let slab = (ym.month as usize - 1) * cells;
        for (c, &v) in grid.step(t).iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            sums[slab + c] += v;
            counts[slab + c] += 1;
        }
    }

    let mut out = MonthlyField::filled_missing(grid.lats.clone(), grid.lons.clone());
    let n_lons = grid.n_lons();
    for (k, (&s, &n)) in sums.iter().zip(&counts).enumerate() {
        if n == 0 {
            continue;
        }
        let month = u32::try_from(k / cells).unwrap_or(0) + 1;
        let cell = k % cells;
        out.set(month, cell / n_lons, cell % n_lons, s / f64::from(n));
    }
    out
}

/// Anomalies over `[start, end]`: observation − climatology(month).
///
/// Missing observations and undefined climatology cells both yield
/// missing anomalies.
///
/// # Errors
///
/// Returns `Err` when the climatology's spatial axes differ from the
/// grid's.
pub fn anomalies(
    grid: &Grid,
    clim: &MonthlyField,
    start: YearMonth,
    end: YearMonth,
) -> Result<Grid> {
    let target = subset_time(grid, start, end);
    // The climatology must come from this grid's spatial axes; a
    // mismatch means mixed-up inputs.
    if target.lats != clim.lats || target.lons != clim.lons {
        return Err(crate::error::Error::AxisMismatch(
            "climatology spatial axes differ from the series".into(),
        ));
    }

    let mut out = Grid::filled_missing(target.times.clone(), target.lats.clone(), target.lons.clone());
    for (t, &ym) in target.times.iter().enumerate() {
        for i in 0..target.n_lats() {
            for j in 0..target.n_lons() {
                let v = target.at(t, i, j);
                let c = clim.at(ym.month, i, j);
                out.set(t, i, j, v - c);
            }
        }
    }
    Ok(out)
}
