// SPDX-License-Identifier: AGPL-3.0-or-later
//! CSV I/O for the assembled dataset and derived tables.
//!
//! Missing feature values are empty fields; floats use Rust's shortest
//! round-trip formatting so a rewrite of identical rows is
//! byte-identical. Writers go through a temp file + atomic rename like
//! the grid writers.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::dataset::{DatasetRow, COLUMNS};
use crate::error::{Error, Result};
use crate::timeax::YearMonth;

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn fmt_opt(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Write dataset rows to CSV with the fixed column order.
///
/// # Errors
///
/// Returns `Err` on I/O or CSV failure.
pub fn write_dataset(path: &Path, rows: &[DatasetRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut w = csv::Writer::from_writer(BufWriter::new(file));
        w.write_record(COLUMNS)?;
        for r in rows {
            w.write_record(&[
                r.time.to_string(),
                r.year.to_string(),
                r.month.to_string(),
                fmt_opt(r.month_sin),
                fmt_opt(r.month_cos),
                fmt_opt(r.latitude),
                fmt_opt(r.longitude),
                fmt_opt(r.pr),
                fmt_opt(r.pr_anom),
                fmt_opt(r.anom_lag1),
                fmt_opt(r.anom_lag3),
                r.drought_label.to_string(),
            ])?;
        }
        w.flush().map_err(|e| Error::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

fn parse_opt(field: &str) -> f64 {
    if field.is_empty() {
        f64::NAN
    } else {
        field.parse().unwrap_or(f64::NAN)
    }
}

/// Read a dataset CSV produced by [`write_dataset`].
///
/// # Errors
///
/// Returns `Err` on I/O failure, a header that differs from the fixed
/// column contract, or an unparseable row.
pub fn read_dataset(path: &Path) -> Result<Vec<DatasetRow>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    if headers.iter().ne(COLUMNS.iter().copied()) {
        return Err(Error::GridFormat(format!(
            "{}: unexpected dataset columns {:?}",
            path.display(),
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |i: usize| record.get(i).unwrap_or("");
        let time = YearMonth::parse(get(0))?;
        let year: i32 = get(1)
            .parse()
            .map_err(|_| Error::GridFormat(format!("bad year field {:?}", get(1))))?;
        let month: u32 = get(2)
            .parse()
            .map_err(|_| Error::GridFormat(format!("bad month field {:?}", get(2))))?;
        let drought_label: i8 = get(11)
            .parse()
            .map_err(|_| Error::GridFormat(format!("bad label field {:?}", get(11))))?;
        rows.push(DatasetRow {
            time,
            year,
            month,
            month_sin: parse_opt(get(3)),
            month_cos: parse_opt(get(4)),
            latitude: parse_opt(get(5)),
            longitude: parse_opt(get(6)),
            pr: parse_opt(get(7)),
            pr_anom: parse_opt(get(8)),
            anom_lag1: parse_opt(get(9)),
            anom_lag3: parse_opt(get(10)),
            drought_label,
        });
    }
    Ok(rows)
}

/// Write the monthly class-share table (`time,dry,normal,wet`), six
/// decimal places per fraction.
///
/// # Errors
///
/// Returns `Err` on I/O or CSV failure.
pub fn write_shares(path: &Path, rows: &[(YearMonth, f64, f64, f64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
        let mut w = csv::Writer::from_writer(BufWriter::new(file));
        w.write_record(["time", "dry", "normal", "wet"])?;
        for (ym, dry, normal, wet) in rows {
            w.write_record(&[
                ym.to_string(),
                format!("{dry:.6}"),
                format!("{normal:.6}"),
                format!("{wet:.6}"),
            ])?;
        }
        w.flush().map_err(|e| Error::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_rows() -> Vec<DatasetRow> {
        let (s, c) = crate::dataset::cyclic_month(2);
        vec![
            DatasetRow {
                time: YearMonth::new(1991, 2).unwrap(),
                year: 1991,
                month: 2,
                month_sin: s,
                month_cos: c,
                latitude: 36.05,
                longitude: -120.45,
                pr: 12.5,
                pr_anom: -3.25,
                anom_lag1: f64::NAN,
                anom_lag3: f64::NAN,
                drought_label: -1,
            },
            DatasetRow {
                time: YearMonth::new(1991, 3).unwrap(),
                year: 1991,
                month: 3,
                month_sin: s,
                month_cos: c,
                latitude: 36.05,
                longitude: -120.45,
                pr: 40.0,
                pr_anom: 8.5,
                anom_lag1: -3.25,
                anom_lag3: f64::NAN,
                drought_label: 1,
            },
        ]
    }

    #[test]
    fn round_trip_preserves_rows_and_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataset.csv");
        let rows = sample_rows();
        write_dataset(&path, &rows).unwrap();
        let back = read_dataset(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].drought_label, -1);
        assert!(back[0].anom_lag1.is_nan());
        assert_eq!(back[1].anom_lag1, -3.25);
        assert_eq!(back[0].time, rows[0].time);
    }

    #[test]
    fn rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let rows = sample_rows();
        write_dataset(&a, &rows).unwrap();
        write_dataset(&b, &rows).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn header_contract_is_checked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        assert!(read_dataset(&path).is_err());
    }

    #[test]
    fn shares_fixed_precision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shares.csv");
        write_shares(
            &path,
            &[(YearMonth::new(2014, 1).unwrap(), 0.5, 0.25, 0.25)],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("2014-01,0.500000,0.250000,0.250000"));
    }
}
