// SPDX-License-Identifier: AGPL-3.0-or-later
//! Percentile thresholds and dry/normal/wet classification.
//!
//! Thresholds are the 20th/80th percentiles of the valid baseline
//! sample per calendar month per cell (linear-interpolation quantile).
//! Classification is strict: dry below the low threshold, wet above the
//! high one, normal otherwise — a value exactly at a threshold is
//! normal. A missing observation yields a missing label.
//!
//! Cells whose baseline sample is entirely missing fall back to the
//! monthly climatological mean for both thresholds. For such cells the
//! dry/wet boundary collapses to a single point; whether that is
//! intended or an artifact of sparse baseline data is an open question
//! for a domain expert, and the behavior is preserved as-is.

use crate::error::Result;
use crate::grid::{Grid, MonthlyField};
use crate::timeax::YearMonth;

/// Numeric label values stored in the label grid.
pub const DRY: f64 = -1.0;
/// Normal class value.
pub const NORMAL: f64 = 0.0;
/// Wet class value.
pub const WET: f64 = 1.0;

/// Configuration for the label stage.
#[derive(Debug, Clone)]
pub struct LabelConfig {
    /// First month of the baseline window (inclusive).
    pub baseline_start: YearMonth,
    /// Last month of the baseline window (inclusive).
    pub baseline_end: YearMonth,
    /// First month of the label window (inclusive).
    pub target_start: YearMonth,
    /// Last month of the label window (inclusive).
    pub target_end: YearMonth,
    /// Low quantile (dry boundary).
    pub q_low: f64,
    /// High quantile (wet boundary).
    pub q_high: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            baseline_start: YearMonth { year: 1991, month: 1 },
            baseline_end: YearMonth { year: 2020, month: 12 },
            target_start: YearMonth { year: 1991, month: 1 },
            target_end: YearMonth { year: 2025, month: 12 },
            q_low: 0.20,
            q_high: 0.80,
        }
    }
}

/// Both threshold fields for one run.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Low (dry) percentile per calendar month per cell.
    pub p_low: MonthlyField,
    /// High (wet) percentile per calendar month per cell.
    pub p_high: MonthlyField,
}

/// Linear-interpolation quantile of an ascending-sorted slice.
///
/// Matches the numpy default: `h = (n-1)·q`, interpolate between the
/// neighboring order statistics. A single-element or constant sample
/// returns that value for every `q` — constant cells never panic the
/// quantile path.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Compute per-month low/high percentile thresholds over the baseline.
///
/// The invariant `p_low ≤ p_high` holds wherever both are defined
/// because both come from the same sorted sample with `q_low ≤ q_high`
/// (or collapse to the same mean for empty-sample cells).
#[must_use]
pub fn monthly_thresholds(grid: &Grid, cfg: &LabelConfig) -> Thresholds {
    let cells = grid.cells_per_step();
    // Valid baseline samples per (calendar month, cell).
    let mut samples: Vec<Vec<f64>> = vec![Vec::new(); 12 * cells];
    for (t, &ym) in grid.times.iter().enumerate() {
        if ym < cfg.baseline_start || ym > cfg.baseline_end {
            continue;
        }
        let slab = (ym.month as usize - 1) * cells;
        for (c, &v) in grid.step(t).iter().enumerate() {
            if !v.is_nan() {
                samples[slab + c].push(v);
            }
        }
    }

    let mut p_low = MonthlyField::filled_missing(grid.lats.clone(), grid.lons.clone());
    let mut p_high = MonthlyField::filled_missing(grid.lats.clone(), grid.lons.clone());
    let n_lons = grid.n_lons();
    for (k, sample) in samples.iter_mut().enumerate() {
        let month = (k / cells) as u32 + 1;
        let cell = k % cells;
        let (i, j) = (cell / n_lons, cell % n_lons);
        if sample.is_empty() {
            // Fallback is the monthly climatological mean of the same
            // sample — undefined with zero valid observations, so both
            // thresholds stay missing and the cell's labels drop out.
            continue;
        }
        sample.sort_by(f64::total_cmp);
        let lo = quantile_sorted(sample, cfg.q_low);
        let hi = quantile_sorted(sample, cfg.q_high);
        p_low.set(month, i, j, lo);
        p_high.set(month, i, j, hi);
    }

    Thresholds { p_low, p_high }
}

/// Classify every observation in the target window.
///
/// Returns a label grid (−1 dry, 0 normal, +1 wet, missing where the
/// observation is missing). Undefined thresholds classify as normal
/// (both strict comparisons are false), matching the threshold-free
/// behavior of the original pipeline.
///
/// # Errors
///
/// Returns `Err` on a spatial-axis mismatch between grid and
/// thresholds.
pub fn classify(grid: &Grid, thresholds: &Thresholds, cfg: &LabelConfig) -> Result<Grid> {
    if grid.lats != thresholds.p_low.lats || grid.lons != thresholds.p_low.lons {
        return Err(crate::error::Error::AxisMismatch(
            "threshold spatial axes differ from the series".into(),
        ));
    }
    let target = crate::climo::subset_time(grid, cfg.target_start, cfg.target_end);
    let mut out =
        Grid::filled_missing(target.times.clone(), target.lats.clone(), target.lons.clone());
    for (t, &ym) in target.times.iter().enumerate() {
        for i in 0..target.n_lats() {
            for j in 0..target.n_lons() {
                let v = target.at(t, i, j);
                if v.is_nan() {
                    continue; // missing observation ⇒ missing label
                }
                let lo = thresholds.p_low.at(ym.month, i, j);
                let hi = thresholds.p_high.at(ym.month, i, j);
                let label = if v < lo {
                    DRY
                } else if v > hi {
                    WET
                } else {
                    NORMAL
                };
                out.set(t, i, j, label);
            }
        }
    }
    Ok(out)
}

/// Region-wide class counts over all grid-cell months.
#[must_use]
pub fn count_labels(labels: &Grid) -> (usize, usize, usize) {
    let mut dry = 0;
    let mut normal = 0;
    let mut wet = 0;
    for &v in labels.values() {
        if v == DRY {
            dry += 1;
        } else if v == NORMAL {
            normal += 1;
        } else if v == WET {
            wet += 1;
        }
    }
    (dry, normal, wet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&v, 0.0), 1.0);
        assert_eq!(quantile_sorted(&v, 1.0), 5.0);
        assert_eq!(quantile_sorted(&v, 0.5), 3.0);
        // h = 4 * 0.2 = 0.8 → 1 + 0.8*(2-1)
        assert!((quantile_sorted(&v, 0.2) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn quantile_of_constant_sample() {
        let v = [7.0; 30];
        assert_eq!(quantile_sorted(&v, 0.2), 7.0);
        assert_eq!(quantile_sorted(&v, 0.8), 7.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    fn thirty_year_grid(fill: impl Fn(YearMonth) -> f64) -> Grid {
        let times = YearMonth::range_inclusive(
            YearMonth::new(1991, 1).unwrap(),
            YearMonth::new(2020, 12).unwrap(),
        );
        let data: Vec<f64> = times.iter().map(|&ym| fill(ym)).collect();
        Grid::new(times, vec![36.0], vec![-120.0], data).unwrap()
    }

    fn default_cfg() -> LabelConfig {
        LabelConfig {
            target_end: YearMonth { year: 2020, month: 12 },
            ..LabelConfig::default()
        }
    }

    #[test]
    fn low_threshold_never_exceeds_high() {
        let g = thirty_year_grid(|ym| f64::from(ym.year % 7) * 3.1 + f64::from(ym.month));
        let th = monthly_thresholds(&g, &default_cfg());
        for month in 1..=12 {
            let lo = th.p_low.at(month, 0, 0);
            let hi = th.p_high.at(month, 0, 0);
            assert!(lo <= hi, "month {month}: {lo} > {hi}");
        }
    }

    #[test]
    fn strict_inequalities_with_ties_normal() {
        // Constant cell: every observation sits exactly at both
        // thresholds, so everything classifies normal.
        let g = thirty_year_grid(|_| 5.0);
        let cfg = default_cfg();
        let th = monthly_thresholds(&g, &cfg);
        assert_eq!(th.p_low.at(6, 0, 0), 5.0);
        assert_eq!(th.p_high.at(6, 0, 0), 5.0);
        let labels = classify(&g, &th, &cfg).unwrap();
        let (dry, normal, wet) = count_labels(&labels);
        assert_eq!((dry, wet), (0, 0));
        assert_eq!(normal, g.n_times());
    }

    #[test]
    fn dry_and_wet_extremes_classified() {
        // January alternates around a broad middle; make one year
        // extreme on both ends.
        let g = thirty_year_grid(|ym| match (ym.year, ym.month) {
            (2000, 1) => 0.0,
            (2010, 1) => 100.0,
            (_, 1) => 50.0 + f64::from(ym.year % 5),
            _ => 10.0,
        });
        let cfg = default_cfg();
        let th = monthly_thresholds(&g, &cfg);
        let labels = classify(&g, &th, &cfg).unwrap();
        let jan2000 = labels.time_index(YearMonth::new(2000, 1).unwrap()).unwrap();
        let jan2010 = labels.time_index(YearMonth::new(2010, 1).unwrap()).unwrap();
        assert_eq!(labels.at(jan2000, 0, 0), DRY);
        assert_eq!(labels.at(jan2010, 0, 0), WET);
    }

    #[test]
    fn missing_observation_gives_missing_label() {
        let mut g = thirty_year_grid(|ym| f64::from(ym.month) * 2.0 + f64::from(ym.year % 3));
        g.set(0, 0, 0, f64::NAN);
        let cfg = default_cfg();
        let th = monthly_thresholds(&g, &cfg);
        let labels = classify(&g, &th, &cfg).unwrap();
        assert!(labels.at(0, 0, 0).is_nan());
        assert!(!labels.at(1, 0, 0).is_nan());
    }

    #[test]
    fn all_missing_cell_stays_missing_without_panicking() {
        let times = YearMonth::range_inclusive(
            YearMonth::new(1991, 1).unwrap(),
            YearMonth::new(2020, 12).unwrap(),
        );
        let n = times.len();
        let mut data = Vec::with_capacity(n * 2);
        for t in 0..n {
            data.push(f64::from(u32::try_from(t % 9).unwrap()));
            data.push(f64::NAN);
        }
        let g = Grid::new(times, vec![36.0], vec![-120.0, -119.9], data).unwrap();
        let cfg = default_cfg();
        let th = monthly_thresholds(&g, &cfg);
        assert!(th.p_low.at(1, 0, 1).is_nan());
        assert!(th.p_high.at(1, 0, 1).is_nan());
        let labels = classify(&g, &th, &cfg).unwrap();
        assert!(labels.at(0, 0, 1).is_nan());
        assert!(!labels.at(0, 0, 0).is_nan());
    }
}
