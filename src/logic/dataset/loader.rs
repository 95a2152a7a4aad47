//! CSV metric loader
//!
//! Header row required. Blank and `NaN` cells become 0.0; any other
//! unparseable cell in a selected column is an error.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::logic::error::{DetectorError, Result};
use crate::logic::features::{FeatureLayout, SampleBatch};

/// Rows read from a metric file
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    pub layout: FeatureLayout,
    pub rows: SampleBatch,
    /// Ground truth per row when a label column was requested
    pub labels: Option<Vec<bool>>,
}

impl MetricTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only the first `n` rows
    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
        if let Some(labels) = self.labels.as_mut() {
            labels.truncate(n);
        }
    }
}

/// Parse a metric cell; `None` means "not a number"
fn parse_cell(raw: &str) -> Option<f32> {
    let cell = raw.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Some(0.0);
    }
    cell.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "anomaly" => Some(true),
        "0" | "false" | "no" | "normal" | "" => Some(false),
        other => other.parse::<f32>().ok().map(|v| v != 0.0),
    }
}

fn open(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Load a metric table
///
/// `columns = None` selects every column whose first-row value is numeric,
/// except the label column.
pub fn load_csv(
    path: &Path,
    columns: Option<&[String]>,
    label_column: Option<&str>,
) -> Result<MetricTable> {
    let mut reader = open(path)?;
    let headers = reader.headers()?.clone();

    let label_idx = match label_column {
        Some(name) => Some(
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| {
                    DetectorError::InvalidData(format!("label column '{}' not found", name))
                })?,
        ),
        None => None,
    };

    let mut records = reader.records();
    let first = records.next().transpose()?;

    let selected: Vec<usize> = match columns {
        Some(names) => names
            .iter()
            .map(|name| {
                headers
                    .iter()
                    .position(|h| h == name.as_str())
                    .ok_or_else(|| {
                        DetectorError::InvalidData(format!("column '{}' not found", name))
                    })
            })
            .collect::<Result<_>>()?,
        // Infer numeric columns from the first row
        None => match &first {
            Some(record) => (0..headers.len())
                .filter(|&i| Some(i) != label_idx)
                .filter(|&i| record.get(i).and_then(parse_cell).is_some())
                .collect(),
            None => Vec::new(),
        },
    };

    if selected.is_empty() {
        return Err(DetectorError::InvalidData(format!(
            "no numeric columns in {}",
            path.display()
        )));
    }

    let layout = FeatureLayout::new(selected.iter().map(|&i| headers[i].to_string()));
    let mut rows = Vec::new();
    let mut labels = label_idx.map(|_| Vec::new());

    for (line, record) in first.into_iter().map(Ok).chain(records).enumerate() {
        let record = record?;
        let row = selected
            .iter()
            .map(|&i| {
                let raw = record.get(i).unwrap_or("");
                parse_cell(raw).ok_or_else(|| {
                    DetectorError::InvalidData(format!(
                        "row {} column '{}': '{}' is not numeric",
                        line,
                        &headers[i],
                        raw
                    ))
                })
            })
            .collect::<Result<Vec<f32>>>()?;
        rows.push(row);

        if let (Some(idx), Some(labels)) = (label_idx, labels.as_mut()) {
            let raw = record.get(idx).unwrap_or("");
            let label = parse_label(raw).ok_or_else(|| {
                DetectorError::InvalidData(format!("row {} label '{}' is not a boolean", line, raw))
            })?;
            labels.push(label);
        }
    }

    log::info!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        layout.dimensionality(),
        path.display()
    );

    Ok(MetricTable { layout, rows, labels })
}
