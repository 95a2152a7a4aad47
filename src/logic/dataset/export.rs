use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::logic::error::{DetectorError, Result};
use crate::logic::model::ScoreReport;

/// Additional per-row column written next to the scores (e.g. a raw metric
/// the plot overlays on the error curve)
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraColumn {
    pub name: String,
    pub values: Vec<f32>,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write the whole report as pretty JSON
pub fn export_json(report: &ScoreReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    log::info!("Exported {} scored rows to {}", report.records.len(), path.display());
    Ok(())
}

/// Write `index,reconstruction_error,is_anomaly,threshold[,extra]` rows
pub fn export_csv(report: &ScoreReport, path: &Path, extra: Option<&ExtraColumn>) -> Result<()> {
    if let Some(column) = extra {
        if column.values.len() != report.records.len() {
            return Err(DetectorError::InvalidData(format!(
                "extra column '{}' has {} values for {} rows",
                column.name,
                column.values.len(),
                report.records.len()
            )));
        }
    }

    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["index", "reconstruction_error", "is_anomaly", "threshold"];
    if let Some(column) = extra {
        header.push(column.name.as_str());
    }
    writer.write_record(&header)?;

    let threshold = report.threshold.to_string();
    for (i, record) in report.records.iter().enumerate() {
        let mut row = vec![
            record.index.to_string(),
            record.reconstruction_error.to_string(),
            record.is_anomaly.to_string(),
            threshold.clone(),
        ];
        if let Some(column) = extra {
            row.push(column.values[i].to_string());
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    log::info!("Exported {} scored rows to {}", report.records.len(), path.display());
    Ok(())
}
