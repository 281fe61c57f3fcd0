use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::indicators::IndicatorStore;

const FILE_STEM: &str = "econ_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated `.csv`
    Csv,
    /// Tab-separated `.prn`
    Prn,
}

impl ExportFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Prn => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Prn => "prn",
        }
    }
}

/// Writes every observation in `store` to `dir/econ_data.<ext>` and returns the path.
pub fn export(store: &IndicatorStore, format: ExportFormat, dir: &Path) -> Result<PathBuf, ExportError> {
    if store.is_empty() {
        return Err(ExportError::Empty);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", FILE_STEM, format.extension()));

    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .from_path(&path)?;

    writer.write_record(["date", "indicatorID", "value"])?;
    for row in store.rows() {
        writer.write_record([row.year.to_string(), row.code, row.value.to_string()])?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), "dataset exported");
    Ok(path)
}
