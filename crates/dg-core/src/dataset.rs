//! Training table loader.
//!
//! CSV layout: label in the first column, then 784 pixel columns. An
//! optional header row is recognized by a non-numeric first field in the
//! first record. Blank lines are skipped. Every row goes through the
//! [`Label`] and [`Sample`] constructors, and any failure carries the
//! 1-based line number.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use dg_common::{Error, Label, Result, Sample, TrainingTable};

/// Read a training table from a CSV file.
pub fn load_training_csv(path: &Path) -> Result<TrainingTable> {
    let file = File::open(path)?;
    parse_training_csv(file)
}

/// Parse a training table from CSV text.
pub fn parse_training_csv<R: Read>(reader: R) -> Result<TrainingTable> {
    // Rows of the wrong width are reported by the sample constructor.
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut table = TrainingTable::new();
    let mut record = StringRecord::new();
    let mut first = true;

    while reader.read_record(&mut record).map_err(csv_error)? {
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        if std::mem::take(&mut first) && parse_number(&record[0]).is_none() {
            continue;
        }
        let fields: Vec<&str> = record.iter().collect();
        let (sample, label) =
            parse_row(&fields).map_err(|message| Error::Dataset { line, message })?;
        table.push(sample, label);
    }
    Ok(table)
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map_or(0, |p| p.line() as usize);
    if !err.is_io_error() {
        return Error::Dataset {
            line,
            message: err.to_string(),
        };
    }
    match err.into_kind() {
        csv::ErrorKind::Io(io) => Error::Io(io),
        other => Error::Dataset {
            line,
            message: format!("{other:?}"),
        },
    }
}

fn parse_row(fields: &[&str]) -> std::result::Result<(Sample, Label), String> {
    let (label_field, pixel_fields) = fields
        .split_first()
        .ok_or_else(|| "empty row".to_string())?;

    let label_value =
        parse_number(label_field).ok_or_else(|| format!("label {label_field:?} is not a number"))?;
    let label = Label::new(label_value).map_err(|e| e.to_string())?;

    let values = pixel_fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            parse_number(f).ok_or_else(|| format!("pixel {i} value {f:?} is not a number"))
        })
        .collect::<std::result::Result<Vec<i64>, String>>()?;
    let sample = Sample::from_values(&values).map_err(|e| e.to_string())?;
    Ok((sample, label))
}

/// Integers, or floats with no fractional part (`"12.0"`).
fn parse_number(field: &str) -> Option<i64> {
    if let Ok(v) = field.parse::<i64>() {
        return Some(v);
    }
    let v = field.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
