// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gridded monthly time series and calendar-month fields.
//!
//! Dense row-major `(time, lat, lon)` storage in a flat `Vec<f64>` for
//! contiguous access; `NaN` encodes missing cells. Companion arrays
//! (precipitation, anomaly, label) must share identical axes before any
//! cell-wise combination — [`Grid::check_same_axes`] enforces that and
//! an axis disagreement is an error, never a silent broadcast.

use crate::error::{Error, Result};
use crate::timeax::YearMonth;

/// A `(time, lat, lon)` array of monthly values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Monthly time axis, ascending.
    pub times: Vec<YearMonth>,
    /// Latitude coordinates (ascending or descending, as stored).
    pub lats: Vec<f64>,
    /// Longitude coordinates, ascending.
    pub lons: Vec<f64>,
    data: Vec<f64>,
}

impl Grid {
    /// Build a grid from axes and a flat row-major payload.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the payload length is not
    /// `times.len() * lats.len() * lons.len()`.
    pub fn new(
        times: Vec<YearMonth>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expect = times.len() * lats.len() * lons.len();
        if data.len() != expect {
            return Err(Error::InvalidInput(format!(
                "grid payload has {} values, axes imply {expect}",
                data.len()
            )));
        }
        Ok(Self {
            times,
            lats,
            lons,
            data,
        })
    }

    /// Grid with every cell missing.
    #[must_use]
    pub fn filled_missing(times: Vec<YearMonth>, lats: Vec<f64>, lons: Vec<f64>) -> Self {
        let n = times.len() * lats.len() * lons.len();
        Self {
            times,
            lats,
            lons,
            data: vec![f64::NAN; n],
        }
    }

    /// Number of time steps.
    #[must_use]
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Number of latitude rows.
    #[must_use]
    pub fn n_lats(&self) -> usize {
        self.lats.len()
    }

    /// Number of longitude columns.
    #[must_use]
    pub fn n_lons(&self) -> usize {
        self.lons.len()
    }

    /// Cells per time step.
    #[must_use]
    pub fn cells_per_step(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    #[inline]
    fn offset(&self, t: usize, i: usize, j: usize) -> usize {
        (t * self.lats.len() + i) * self.lons.len() + j
    }

    /// Value at `(time index, lat index, lon index)`; `NaN` = missing.
    #[inline]
    #[must_use]
    pub fn at(&self, t: usize, i: usize, j: usize) -> f64 {
        self.data[self.offset(t, i, j)]
    }

    /// Overwrite the value at `(t, i, j)`.
    #[inline]
    pub fn set(&mut self, t: usize, i: usize, j: usize, value: f64) {
        let k = self.offset(t, i, j);
        self.data[k] = value;
    }

    /// Full flat payload, row-major `(time, lat, lon)`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// One time step as a `(lat, lon)` slice.
    #[must_use]
    pub fn step(&self, t: usize) -> &[f64] {
        let per = self.cells_per_step();
        &self.data[t * per..(t + 1) * per]
    }

    /// Position of a month on the time axis.
    #[must_use]
    pub fn time_index(&self, ym: YearMonth) -> Option<usize> {
        self.times.iter().position(|&t| t == ym)
    }

    /// Check that `other` shares this grid's time/lat/lon axes exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AxisMismatch`] naming the offending axis.
    pub fn check_same_axes(&self, other: &Self, what: &str) -> Result<()> {
        if self.times != other.times {
            return Err(Error::AxisMismatch(format!("{what}: time axes differ")));
        }
        if !coords_equal(&self.lats, &other.lats) {
            return Err(Error::AxisMismatch(format!("{what}: latitude axes differ")));
        }
        if !coords_equal(&self.lons, &other.lons) {
            return Err(Error::AxisMismatch(format!("{what}: longitude axes differ")));
        }
        Ok(())
    }
}

/// A `(calendar month, lat, lon)` field — exactly 12 month slabs.
///
/// Holds climatologies and percentile thresholds. Immutable once
/// written to disk; stages re-reading one must never modify it.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyField {
    /// Latitude coordinates, matching the source grid.
    pub lats: Vec<f64>,
    /// Longitude coordinates, matching the source grid.
    pub lons: Vec<f64>,
    data: Vec<f64>,
}

impl MonthlyField {
    /// Build a field from axes and a flat `12 * n_lat * n_lon` payload.
    ///
    /// # Errors
    ///
    /// Returns `Err` on a payload/axis length mismatch.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>, data: Vec<f64>) -> Result<Self> {
        let expect = 12 * lats.len() * lons.len();
        if data.len() != expect {
            return Err(Error::InvalidInput(format!(
                "monthly field has {} values, axes imply {expect}",
                data.len()
            )));
        }
        Ok(Self { lats, lons, data })
    }

    /// Field with every cell missing.
    #[must_use]
    pub fn filled_missing(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        let n = 12 * lats.len() * lons.len();
        Self {
            lats,
            lons,
            data: vec![f64::NAN; n],
        }
    }

    #[inline]
    fn offset(&self, month: u32, i: usize, j: usize) -> usize {
        ((month as usize - 1) * self.lats.len() + i) * self.lons.len() + j
    }

    /// Value for calendar `month` (1–12) at `(lat index, lon index)`.
    #[inline]
    #[must_use]
    pub fn at(&self, month: u32, i: usize, j: usize) -> f64 {
        self.data[self.offset(month, i, j)]
    }

    /// Overwrite the value for calendar `month` at `(i, j)`.
    #[inline]
    pub fn set(&mut self, month: u32, i: usize, j: usize, value: f64) {
        let k = self.offset(month, i, j);
        self.data[k] = value;
    }

    /// Full flat payload, row-major `(month, lat, lon)`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.data
    }
}

/// Bit-exact coordinate comparison (coordinates are copied, not
/// recomputed, so equality is the correct check — `NaN` never appears
/// on an axis).
fn coords_equal(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months(n: usize) -> Vec<YearMonth> {
        let mut out = Vec::with_capacity(n);
        let mut cur = YearMonth::new(2000, 1).unwrap();
        for _ in 0..n {
            out.push(cur);
            cur = cur.succ();
        }
        out
    }

    #[test]
    fn row_major_layout() {
        let mut g = Grid::filled_missing(months(2), vec![10.0, 11.0], vec![20.0, 21.0, 22.0]);
        g.set(1, 0, 2, 5.0);
        // offset = (1*2 + 0)*3 + 2 = 8
        assert_eq!(g.values()[8].to_bits(), 5.0_f64.to_bits());
        assert_eq!(g.at(1, 0, 2), 5.0);
    }

    #[test]
    fn payload_length_checked() {
        let r = Grid::new(months(2), vec![10.0], vec![20.0], vec![0.0; 3]);
        assert!(r.is_err());
    }

    #[test]
    fn step_slices_one_time() {
        let data: Vec<f64> = (0..12).map(f64::from).collect();
        let g = Grid::new(months(3), vec![0.0, 1.0], vec![0.0, 1.0], data).unwrap();
        assert_eq!(g.step(1), &[4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn axis_mismatch_detected() {
        let a = Grid::filled_missing(months(2), vec![10.0], vec![20.0]);
        let b = Grid::filled_missing(months(3), vec![10.0], vec![20.0]);
        let err = a.check_same_axes(&b, "label").unwrap_err();
        assert!(err.to_string().contains("time axes differ"));

        let c = Grid::filled_missing(months(2), vec![10.5], vec![20.0]);
        assert!(a.check_same_axes(&c, "label").is_err());
    }

    #[test]
    fn monthly_field_indexing() {
        let mut f = MonthlyField::filled_missing(vec![0.0, 1.0], vec![0.0]);
        f.set(12, 1, 0, 3.5);
        assert_eq!(f.at(12, 1, 0), 3.5);
        assert!(f.at(1, 0, 0).is_nan());
        assert_eq!(f.values().len(), 24);
    }

    #[test]
    fn time_index_lookup() {
        let g = Grid::filled_missing(months(4), vec![0.0], vec![0.0]);
        assert_eq!(g.time_index(YearMonth::new(2000, 3).unwrap()), Some(2));
        assert_eq!(g.time_index(YearMonth::new(1999, 12).unwrap()), None);
    }
}
