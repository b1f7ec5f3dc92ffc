// SPDX-License-Identifier: AGPL-3.0-or-later
//! Sovereign `.dsg` ("drySpring grid") container — labeled
//! multi-dimensional arrays without a system NetCDF dependency.
//!
//! # Format
//!
//! ```text
//! dsgrid/1\n
//! {json header: months, lats, lons, variable declarations}\n
//! <one gzip stream: per-variable little-endian f64 payloads, concatenated>
//! ```
//!
//! Each variable is either a `time` array (`n_months * n_lat * n_lon`)
//! or a `calendar` array (`12 * n_lat * n_lon`), so a labels file can
//! carry the label series and its threshold provenance side by side.
//! `NaN` encodes missing. Payload length is validated against the
//! header on read; a truncated gzip stream is a format error, not a
//! short read.
//!
//! Writers go through a temp file and an atomic rename — a stage that
//! dies mid-write never leaves a half-written `.dsg` for the next
//! stage to consume.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Grid, MonthlyField};
use crate::timeax::YearMonth;

const MAGIC: &str = "dsgrid/1";

/// Gzip level for payloads (matches the original pipeline's complevel 4).
const GZIP_LEVEL: u32 = 4;

/// Which leading axis a stored variable uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// Leading axis is the monthly time axis from the header.
    Time,
    /// Leading axis is the 12 calendar months.
    Calendar,
}

#[derive(Debug, Serialize, Deserialize)]
struct VarDecl {
    name: String,
    axis: AxisKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    months: Vec<YearMonth>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    vars: Vec<VarDecl>,
}

/// One named variable with its leading-axis kind and flat payload.
#[derive(Debug, Clone)]
pub struct GridVar {
    /// Variable name as stored in the header.
    pub name: String,
    /// Leading axis of the payload.
    pub kind: AxisKind,
    /// Row-major payload, `NaN` = missing.
    pub data: Vec<f64>,
}

impl GridVar {
    /// Time-axis variable from a [`Grid`].
    #[must_use]
    pub fn series(name: impl Into<String>, grid: &Grid) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Time,
            data: grid.values().to_vec(),
        }
    }

    /// Calendar-axis variable from a [`MonthlyField`].
    #[must_use]
    pub fn calendar(name: impl Into<String>, field: &MonthlyField) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Calendar,
            data: field.values().to_vec(),
        }
    }
}

/// Parsed contents of a `.dsg` file.
#[derive(Debug)]
pub struct DsgData {
    /// Monthly time axis (empty for calendar-only files).
    pub months: Vec<YearMonth>,
    /// Latitude coordinates.
    pub lats: Vec<f64>,
    /// Longitude coordinates.
    pub lons: Vec<f64>,
    vars: Vec<GridVar>,
}

impl DsgData {
    /// Names of all stored variables, in file order.
    #[must_use]
    pub fn var_names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name.as_str()).collect()
    }

    /// Look up a variable by name.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&GridVar> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Extract a time-axis variable as a [`Grid`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the variable is absent or calendar-axis.
    pub fn to_grid(&self, name: &str) -> Result<Grid> {
        let var = self
            .var(name)
            .ok_or_else(|| Error::GridFormat(format!("variable {name:?} not in file")))?;
        if var.kind != AxisKind::Time {
            return Err(Error::GridFormat(format!(
                "variable {name:?} is calendar-axis, expected time-axis"
            )));
        }
        Grid::new(
            self.months.clone(),
            self.lats.clone(),
            self.lons.clone(),
            var.data.clone(),
        )
    }

    /// Extract a calendar-axis variable as a [`MonthlyField`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the variable is absent or time-axis.
    pub fn to_monthly(&self, name: &str) -> Result<MonthlyField> {
        let var = self
            .var(name)
            .ok_or_else(|| Error::GridFormat(format!("variable {name:?} not in file")))?;
        if var.kind != AxisKind::Calendar {
            return Err(Error::GridFormat(format!(
                "variable {name:?} is time-axis, expected calendar-axis"
            )));
        }
        MonthlyField::new(self.lats.clone(), self.lons.clone(), var.data.clone())
    }
}

/// Write a `.dsg` file atomically (temp file + rename).
///
/// # Errors
///
/// Returns `Err` on I/O failure or when a payload length disagrees
/// with the axes.
pub fn write_dsg(
    path: &Path,
    months: &[YearMonth],
    lats: &[f64],
    lons: &[f64],
    vars: &[GridVar],
) -> Result<()> {
    let cells = lats.len() * lons.len();
    for v in vars {
        let expect = match v.kind {
            AxisKind::Time => months.len() * cells,
            AxisKind::Calendar => 12 * cells,
        };
        if v.data.len() != expect {
            return Err(Error::InvalidInput(format!(
                "variable {:?} payload has {} values, axes imply {expect}",
                v.name,
                v.data.len()
            )));
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let header = Header {
        months: months.to_vec(),
        lats: lats.to_vec(),
        lons: lons.to_vec(),
        vars: vars
            .iter()
            .map(|v| VarDecl {
                name: v.name.clone(),
                axis: v.kind,
            })
            .collect(),
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut w = BufWriter::new(file);
        writeln!(w, "{MAGIC}").map_err(|e| Error::io(&tmp, e))?;
        let header_json = serde_json::to_string(&header)?;
        writeln!(w, "{header_json}").map_err(|e| Error::io(&tmp, e))?;

        let mut enc = GzEncoder::new(w, Compression::new(GZIP_LEVEL));
        for v in vars {
            for x in &v.data {
                enc.write_all(&x.to_le_bytes())
                    .map_err(|e| Error::io(&tmp, e))?;
            }
        }
        let mut w = enc.finish().map_err(|e| Error::io(&tmp, e))?;
        w.flush().map_err(|e| Error::io(&tmp, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

/// Convenience writer for a single time-axis variable.
///
/// # Errors
///
/// Propagates [`write_dsg`] failures.
pub fn write_series(path: &Path, name: &str, grid: &Grid) -> Result<()> {
    write_dsg(
        path,
        &grid.times,
        &grid.lats,
        &grid.lons,
        &[GridVar::series(name, grid)],
    )
}

/// Convenience writer for a single calendar-axis variable.
///
/// # Errors
///
/// Propagates [`write_dsg`] failures.
pub fn write_monthly(path: &Path, name: &str, field: &MonthlyField) -> Result<()> {
    write_dsg(
        path,
        &[],
        &field.lats,
        &field.lons,
        &[GridVar::calendar(name, field)],
    )
}

/// Read and validate a `.dsg` file.
///
/// # Errors
///
/// Returns `Err` on I/O failure, bad magic, a malformed header, or a
/// payload whose decompressed length disagrees with the header.
pub fn read_dsg(path: &Path) -> Result<DsgData> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut magic = String::new();
    reader
        .read_line(&mut magic)
        .map_err(|e| Error::io(path, e))?;
    if magic.trim_end() != MAGIC {
        return Err(Error::GridFormat(format!(
            "{}: bad magic {:?}",
            path.display(),
            magic.trim_end()
        )));
    }

    let mut header_line = String::new();
    reader
        .read_line(&mut header_line)
        .map_err(|e| Error::io(path, e))?;
    let header: Header = serde_json::from_str(header_line.trim_end())?;

    let cells = header.lats.len() * header.lons.len();
    let total: usize = header
        .vars
        .iter()
        .map(|v| match v.axis {
            AxisKind::Time => header.months.len() * cells,
            AxisKind::Calendar => 12 * cells,
        })
        .sum();

    let mut payload = Vec::with_capacity(total * 8);
    GzDecoder::new(reader)
        .read_to_end(&mut payload)
        .map_err(|e| Error::io(path, e))?;
    if payload.len() != total * 8 {
        return Err(Error::GridFormat(format!(
            "{}: payload is {} bytes, header implies {}",
            path.display(),
            payload.len(),
            total * 8
        )));
    }

    let mut values = payload
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]));

    let mut vars = Vec::with_capacity(header.vars.len());
    for decl in &header.vars {
        let n = match decl.axis {
            AxisKind::Time => header.months.len() * cells,
            AxisKind::Calendar => 12 * cells,
        };
        vars.push(GridVar {
            name: decl.name.clone(),
            kind: decl.axis,
            data: values.by_ref().take(n).collect(),
        });
    }

    Ok(DsgData {
        months: header.months,
        lats: header.lats,
        lons: header.lons,
        vars,
    })
}
