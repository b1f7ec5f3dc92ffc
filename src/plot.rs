// SPDX-License-Identifier: AGPL-3.0-or-later
//! Diagnostic charts rendered to PNG.
//!
//! Confusion-matrix heatmaps, importance bars, Shapley summaries, the
//! categorical drought map, and the stacked class-share series. All
//! figures are static rasters for the outputs directory; cosmetics are
//! deliberately plain.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::timeax::YearMonth;

/// Dry class color (matches the map palette).
pub const DRY_COLOR: RGBColor = RGBColor(0xd7, 0x30, 0x27);
/// Normal class color.
pub const NORMAL_COLOR: RGBColor = RGBColor(0xfd, 0xae, 0x61);
/// Wet class color.
pub const WET_COLOR: RGBColor = RGBColor(0x1a, 0x98, 0x50);

fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Blend from white toward a dark blue with `t` in `[0, 1]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blues(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t) as u8;
    RGBColor(lerp(255.0, 8.0), lerp(255.0, 48.0), lerp(255.0, 107.0))
}

/// Blend blue → red for beeswarm feature-value coloring.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn coolwarm(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t) as u8;
    RGBColor(lerp(59.0, 180.0), lerp(76.0, 4.0), lerp(192.0, 38.0))
}

/// Render a row-normalized confusion matrix as a heatmap.
///
/// # Errors
///
/// Returns `Err` on a rendering failure.
#[allow(clippy::cast_precision_loss)]
pub fn confusion_heatmap(
    path: &Path,
    cm: &[Vec<f64>],
    class_names: &[&str],
    title: &str,
) -> Result<()> {
    let n = cm.len();
    let root = BitMapBackend::new(path, (640, 560)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..n as f64, 0.0..n as f64)
        .map_err(plot_err)?;

    let x_names: Vec<String> = class_names.iter().map(ToString::to_string).collect();
    let y_names = x_names.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&move |v| {
            x_names
                .get(v.floor() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_label_formatter(&move |v| {
            y_names
                .get(v.floor() as usize)
                .cloned()
                .unwrap_or_default()
        })
        .x_desc("predicted")
        .y_desc("true")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series((0..n).flat_map(move |t| {
            (0..n).map(move |p| {
                Rectangle::new(
                    [(p as f64, t as f64), (p as f64 + 1.0, t as f64 + 1.0)],
                    blues(cm[t][p]).filled(),
                )
            })
        }))
        .map_err(plot_err)?;

    chart
        .draw_series((0..n).flat_map(move |t| {
            (0..n).map(move |p| {
                let v = cm[t][p];
                let color = if v > 0.5 { &WHITE } else { &BLACK };
                Text::new(
                    format!("{v:.2}"),
                    (p as f64 + 0.42, t as f64 + 0.5),
                    ("sans-serif", 18).into_font().color(color),
                )
            })
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Horizontal bar chart (importances), values left-to-right, first
/// name at the top.
///
/// # Errors
///
/// Returns `Err` on a rendering failure.
#[allow(clippy::cast_precision_loss)]
pub fn barh(path: &Path, names: &[&str], values: &[f64], title: &str, x_desc: &str) -> Result<()> {
    let n = names.len();
    let max = values.iter().copied().fold(0.0_f64, f64::max).max(1e-12);
    let root = BitMapBackend::new(path, (720, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(110)
        .build_cartesian_2d(0.0..max * 1.1, 0.0..n as f64)
        .map_err(plot_err)?;

    let labels: Vec<String> = names.iter().map(ToString::to_string).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&move |v| {
            // first name at the top of the axis
            let slot = v.floor() as usize;
            if slot < n {
                labels[n - 1 - slot].clone()
            } else {
                String::new()
            }
        })
        .x_desc(x_desc)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, &v)| {
            let y = (n - 1 - i) as f64;
            Rectangle::new([(0.0, y + 0.15), (v, y + 0.85)], BLUE.mix(0.6).filled())
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Beeswarm-style Shapley summary: one horizontal band per feature,
/// points at their attribution with feature-value coloring.
///
/// # Errors
///
/// Returns `Err` on a rendering failure.
#[allow(clippy::cast_precision_loss)]
pub fn shap_beeswarm(
    path: &Path,
    attributions: &[Vec<f64>],
    feature_values: &[Vec<f64>],
    names: &[&str],
    title: &str,
) -> Result<()> {
    let d = names.len();
    let span = attributions
        .iter()
        .flatten()
        .fold(0.0_f64, |m, &v| m.max(v.abs()))
        .max(1e-12);
    // per-feature min/max for color normalization
    let mut lo = vec![f64::INFINITY; d];
    let mut hi = vec![f64::NEG_INFINITY; d];
    for row in feature_values {
        for (f, &v) in row.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            lo[f] = lo[f].min(v);
            hi[f] = hi[f].max(v);
        }
    }

    let root = BitMapBackend::new(path, (760, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(110)
        .build_cartesian_2d(-span * 1.1..span * 1.1, 0.0..d as f64)
        .map_err(plot_err)?;

    let labels: Vec<String> = names.iter().map(ToString::to_string).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(d)
        .y_label_formatter(&move |v| {
            let slot = v.floor() as usize;
            if slot < d {
                labels[d - 1 - slot].clone()
            } else {
                String::new()
            }
        })
        .x_desc("attribution to class probability")
        .draw()
        .map_err(plot_err)?;

    let mut jitter = crate::rng::Lcg64::new(0);
    let mut points = Vec::new();
    for (row, vals) in attributions.iter().zip(feature_values) {
        for f in 0..d {
            let y = (d - 1 - f) as f64 + 0.5 + (jitter.next_f64() - 0.5) * 0.6;
            let t = if hi[f] > lo[f] && !vals[f].is_nan() {
                (vals[f] - lo[f]) / (hi[f] - lo[f])
            } else {
                0.5
            };
            points.push(Circle::new((row[f], y), 2, coolwarm(t).mix(0.7).filled()));
        }
    }
    chart.draw_series(points).map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Dependence scatter: feature value against its attribution.
///
/// # Errors
///
/// Returns `Err` on a rendering failure.
pub fn dependence_scatter(
    path: &Path,
    feature_vals: &[f64],
    attributions: &[f64],
    x_desc: &str,
    title: &str,
) -> Result<()> {
    let finite = |v: &&f64| v.is_finite();
    let x_lo = feature_vals.iter().filter(finite).copied().fold(f64::INFINITY, f64::min);
    let x_hi = feature_vals
        .iter()
        .filter(finite)
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let y_span = attributions
        .iter()
        .fold(0.0_f64, |m, &v| m.max(v.abs()))
        .max(1e-12);
    if !x_lo.is_finite() || !x_hi.is_finite() {
        return Err(Error::Plot("no finite feature values to plot".into()));
    }
    let pad = ((x_hi - x_lo) * 0.05).max(1e-12);

    let root = BitMapBackend::new(path, (720, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo - pad..x_hi + pad, -y_span * 1.1..y_span * 1.1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("attribution")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            feature_vals
                .iter()
                .zip(attributions)
                .filter(|(v, _)| v.is_finite())
                .map(|(&v, &a)| Circle::new((v, a), 2, BLUE.mix(0.5).filled())),
        )
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Categorical drought-class map for one month.
///
/// `step` is the `(lat, lon)` slab in row-major order; missing cells
/// render light gray. Latitude axis direction follows the coordinates.
///
/// # Errors
///
/// Returns `Err` on degenerate axes or a rendering failure.
pub fn drought_map(
    path: &Path,
    step: &[f64],
    lats: &[f64],
    lons: &[f64],
    title: &str,
) -> Result<()> {
    if lats.is_empty() || lons.is_empty() {
        return Err(Error::Plot("empty spatial axes".into()));
    }
    let lat_lo = lats.iter().copied().fold(f64::INFINITY, f64::min);
    let lat_hi = lats.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lon_lo = lons.iter().copied().fold(f64::INFINITY, f64::min);
    let lon_hi = lons.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let dlat = if lats.len() > 1 {
        (lat_hi - lat_lo) / (lats.len() - 1) as f64
    } else {
        1.0
    };
    let dlon = if lons.len() > 1 {
        (lon_hi - lon_lo) / (lons.len() - 1) as f64
    } else {
        1.0
    };

    let root = BitMapBackend::new(path, (640, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            lon_lo - dlon / 2.0..lon_hi + dlon / 2.0,
            lat_lo - dlat / 2.0..lat_hi + dlat / 2.0,
        )
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("longitude")
        .y_desc("latitude")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(lats.iter().enumerate().flat_map(move |(i, &lat)| {
            lons.iter().enumerate().map(move |(j, &lon)| {
                let v = step[i * lons.len() + j];
                let color = if v.is_nan() {
                    RGBColor(220, 220, 220)
                } else if v < 0.0 {
                    DRY_COLOR
                } else if v > 0.0 {
                    WET_COLOR
                } else {
                    NORMAL_COLOR
                };
                Rectangle::new(
                    [
                        (lon - dlon / 2.0, lat - dlat / 2.0),
                        (lon + dlon / 2.0, lat + dlat / 2.0),
                    ],
                    color.filled(),
                )
            })
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

/// Stacked-area chart of monthly class shares (dry at the bottom,
/// normal above it, wet on top).
///
/// # Errors
///
/// Returns `Err` on empty input or a rendering failure.
#[allow(clippy::cast_precision_loss)]
pub fn stacked_shares(
    path: &Path,
    times: &[YearMonth],
    dry: &[f64],
    normal: &[f64],
    wet: &[f64],
    title: &str,
) -> Result<()> {
    if times.is_empty() {
        return Err(Error::Plot("no share rows to plot".into()));
    }
    let n = times.len();
    let root = BitMapBackend::new(path, (1100, 400)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(n - 1).max(1) as f64, 0.0..1.0_f64)
        .map_err(plot_err)?;

    let tick_times = times.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&move |v| {
            tick_times
                .get(v.round() as usize)
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .y_desc("fraction of area")
        .draw()
        .map_err(plot_err)?;

    let cum2: Vec<f64> = dry.iter().zip(normal).map(|(&a, &b)| a + b).collect();
    let cum3: Vec<f64> = cum2.iter().zip(wet).map(|(&a, &b)| a + b).collect();

    // later series paint over earlier ones, leaving stacked bands
    chart
        .draw_series(AreaSeries::new(
            (0..n).map(|i| (i as f64, cum3[i])),
            0.0,
            WET_COLOR.mix(0.8),
        ))
        .map_err(plot_err)?
        .label("wet")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], WET_COLOR.filled()));
    chart
        .draw_series(AreaSeries::new(
            (0..n).map(|i| (i as f64, cum2[i])),
            0.0,
            NORMAL_COLOR.mix(0.9),
        ))
        .map_err(plot_err)?
        .label("normal")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], NORMAL_COLOR.filled()));
    chart
        .draw_series(AreaSeries::new(
            (0..n).map(|i| (i as f64, dry[i])),
            0.0,
            DRY_COLOR.mix(0.9),
        ))
        .map_err(plot_err)?
        .label("dry")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], DRY_COLOR.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Text rendering needs a system font; hosts without one skip the
    /// raster assertions instead of failing.
    fn rendered(result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                eprintln!("  [SKIP] rendering unavailable: {e}");
                false
            }
        }
    }

    #[test]
    fn blues_endpoints() {
        assert_eq!(blues(0.0), RGBColor(255, 255, 255));
        assert_eq!(blues(1.0), RGBColor(8, 48, 107));
    }

    #[test]
    fn confusion_heatmap_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cm.png");
        let cm = vec![
            vec![0.8, 0.1, 0.1],
            vec![0.2, 0.6, 0.2],
            vec![0.0, 0.3, 0.7],
        ];
        if rendered(confusion_heatmap(&path, &cm, &["dry", "normal", "wet"], "test")) {
            assert!(path.exists());
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn barh_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("imp.png");
        let r = barh(
            &path,
            &["pr_anom", "pr", "month_sin"],
            &[0.5, 0.3, 0.2],
            "importance",
            "gain",
        );
        if rendered(r) {
            assert!(path.exists());
        }
    }

    #[test]
    fn drought_map_handles_missing_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.png");
        let step = vec![-1.0, 0.0, 1.0, f64::NAN];
        if rendered(drought_map(
            &path,
            &step,
            &[36.0, 36.1],
            &[-120.0, -119.9],
            "2014-01",
        )) {
            assert!(path.exists());
        }
    }

    #[test]
    fn stacked_shares_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shares.png");
        let times = YearMonth::range_inclusive(
            YearMonth::new(2014, 1).unwrap(),
            YearMonth::new(2014, 6).unwrap(),
        );
        let dry = vec![0.2; 6];
        let normal = vec![0.6; 6];
        let wet = vec![0.2; 6];
        if rendered(stacked_shares(&path, &times, &dry, &normal, &wet, "shares")) {
            assert!(path.exists());
        }
    }

    #[test]
    fn empty_axes_are_errors() {
        let dir = TempDir::new().unwrap();
        assert!(drought_map(&dir.path().join("m.png"), &[], &[], &[], "t").is_err());
        assert!(stacked_shares(&dir.path().join("s.png"), &[], &[], &[], &[], "t").is_err());
    }
}
