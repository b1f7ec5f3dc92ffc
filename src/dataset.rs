// SPDX-License-Identifier: AGPL-3.0-or-later
//! Model-ready tabular dataset from the gridded products.
//!
//! Joins precipitation, anomalies, 1- and 3-month lagged anomalies and
//! labels into flat rows with cyclic month encoding. Column order is a
//! fixed contract — every trainer indexes it by name — and row order is
//! time-major, then latitude, then longitude, so re-running on
//! identical inputs reproduces the file byte for byte.

use crate::error::Result;
use crate::grid::Grid;
use crate::timeax::YearMonth;

/// Column names, in file order.
pub const COLUMNS: [&str; 12] = [
    "time",
    "year",
    "month",
    "month_sin",
    "month_cos",
    "latitude",
    "longitude",
    "pr",
    "pr_anom",
    "anom_lag1",
    "anom_lag3",
    "drought_label",
];

/// Feature columns consumed by every model.
pub const FEATURES: [&str; 6] = [
    "pr",
    "pr_anom",
    "anom_lag1",
    "anom_lag3",
    "month_sin",
    "month_cos",
];

/// One flattened (time, lat, lon) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    /// Observation month.
    pub time: YearMonth,
    /// Calendar year (split key).
    pub year: i32,
    /// Calendar month 1–12.
    pub month: u32,
    /// sin(2π·month/12).
    pub month_sin: f64,
    /// cos(2π·month/12).
    pub month_cos: f64,
    /// Cell latitude.
    pub latitude: f64,
    /// Cell longitude.
    pub longitude: f64,
    /// Precipitation (`NaN` = missing).
    pub pr: f64,
    /// Precipitation anomaly (`NaN` = missing).
    pub pr_anom: f64,
    /// Anomaly lagged one month (`NaN` = missing).
    pub anom_lag1: f64,
    /// Anomaly lagged three months (`NaN` = missing).
    pub anom_lag3: f64,
    /// Target class: −1 dry, 0 normal, +1 wet.
    pub drought_label: i8,
}

impl DatasetRow {
    /// Feature vector in [`FEATURES`] order, `NaN` for missing.
    #[must_use]
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.pr,
            self.pr_anom,
            self.anom_lag1,
            self.anom_lag3,
            self.month_sin,
            self.month_cos,
        ]
    }
}

/// Cyclic month encoding with period 12.
///
/// Keeps December and January adjacent for magnitude-sensitive models.
#[must_use]
pub fn cyclic_month(month: u32) -> (f64, f64) {
    let angle = 2.0 * std::f64::consts::PI * f64::from(month) / 12.0;
    (angle.sin(), angle.cos())
}

/// Shift a grid `lag` steps forward along time (value at `t` becomes
/// the value observed at `t - lag`; the first `lag` steps are missing).
#[must_use]
pub fn lag_time(grid: &Grid, lag: usize) -> Grid {
    let mut out = Grid::filled_missing(grid.times.clone(), grid.lats.clone(), grid.lons.clone());
    for t in lag..grid.n_times() {
        for i in 0..grid.n_lats() {
            for j in 0..grid.n_lons() {
                out.set(t, i, j, grid.at(t - lag, i, j));
            }
        }
    }
    out
}

/// Assemble dataset rows from aligned grids.
///
/// Rows with a missing label (masked cells) are dropped; missing
/// feature values are kept as `NaN`.
///
/// # Errors
///
/// Returns `Err` when anomaly or label axes differ from the
/// precipitation grid's.
pub fn assemble(pr: &Grid, anom: &Grid, labels: &Grid) -> Result<Vec<DatasetRow>> {
    pr.check_same_axes(anom, "anomaly")?;
    pr.check_same_axes(labels, "label")?;

    let lag1 = lag_time(anom, 1);
    let lag3 = lag_time(anom, 3);

    let mut rows = Vec::new();
    for (t, &ym) in pr.times.iter().enumerate() {
        let (month_sin, month_cos) = cyclic_month(ym.month);
        for i in 0..pr.n_lats() {
            for j in 0..pr.n_lons() {
                let label = labels.at(t, i, j);
                if label.is_nan() {
                    continue;
                }
                #[allow(clippy::cast_possible_truncation)]
                rows.push(DatasetRow {
                    time: ym,
                    year: ym.year,
                    month: ym.month,
                    month_sin,
                    month_cos,
                    latitude: pr.lats[i],
                    longitude: pr.lons[j],
                    pr: pr.at(t, i, j),
                    pr_anom: anom.at(t, i, j),
                    anom_lag1: lag1.at(t, i, j),
                    anom_lag3: lag3.at(t, i, j),
                    drought_label: label as i8,
                });
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_encoding_lies_on_the_unit_circle() {
        for month in 1..=12 {
            let (s, c) = cyclic_month(month);
            assert!((s * s + c * c - 1.0).abs() < 1e-12, "month {month}");
        }
    }

    #[test]
    fn cyclic_encoding_keeps_december_next_to_january() {
        let (s12, c12) = cyclic_month(12);
        let (s1, c1) = cyclic_month(1);
        let (s6, c6) = cyclic_month(6);
        let dec_jan = ((s12 - s1).powi(2) + (c12 - c1).powi(2)).sqrt();
        let dec_jun = ((s12 - s6).powi(2) + (c12 - c6).powi(2)).sqrt();
        assert!(dec_jan < dec_jun);
    }

    fn tiny_inputs() -> (Grid, Grid, Grid) {
        let times = YearMonth::range_inclusive(
            YearMonth::new(2000, 1).unwrap(),
            YearMonth::new(2000, 6).unwrap(),
        );
        let pr_data: Vec<f64> = (0..6).map(|t| f64::from(t) * 2.0).collect();
        let anom_data: Vec<f64> = (0..6).map(|t| f64::from(t) - 2.5).collect();
        let lab_data = vec![0.0, -1.0, 0.0, 1.0, f64::NAN, 0.0];
        let lats = vec![36.0];
        let lons = vec![-120.0];
        (
            Grid::new(times.clone(), lats.clone(), lons.clone(), pr_data).unwrap(),
            Grid::new(times.clone(), lats.clone(), lons.clone(), anom_data).unwrap(),
            Grid::new(times, lats, lons, lab_data).unwrap(),
        )
    }

    #[test]
    fn lags_shift_along_time_per_cell() {
        let (_, anom, _) = tiny_inputs();
        let lag1 = lag_time(&anom, 1);
        assert!(lag1.at(0, 0, 0).is_nan());
        assert_eq!(lag1.at(1, 0, 0), anom.at(0, 0, 0));
        let lag3 = lag_time(&anom, 3);
        assert!(lag3.at(2, 0, 0).is_nan());
        assert_eq!(lag3.at(5, 0, 0), anom.at(2, 0, 0));
    }

    #[test]
    fn assemble_drops_missing_labels_only() {
        let (pr, anom, labels) = tiny_inputs();
        let rows = assemble(&pr, &anom, &labels).unwrap();
        // 6 months, one cell, one missing label
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.time != YearMonth::new(2000, 5).unwrap()));
        // first row has missing lags but is kept
        assert!(rows[0].anom_lag1.is_nan());
        assert!(rows[0].anom_lag3.is_nan());
        assert_eq!(rows[1].drought_label, -1);
    }

    #[test]
    fn assemble_rejects_misaligned_axes() {
        let (pr, anom, labels) = tiny_inputs();
        let shifted = Grid::new(
            labels.times.clone(),
            vec![37.0],
            labels.lons.clone(),
            labels.values().to_vec(),
        )
        .unwrap();
        assert!(assemble(&pr, &anom, &shifted).is_err());
    }

    #[test]
    fn assemble_is_deterministic() {
        let (pr, anom, labels) = tiny_inputs();
        let a = assemble(&pr, &anom, &labels).unwrap();
        let b = assemble(&pr, &anom, &labels).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.time, y.time);
            assert_eq!(x.pr.to_bits(), y.pr.to_bits());
        }
    }
}
