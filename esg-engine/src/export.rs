//! Report export
//!
//! The export document is the report wrapped with the selection and data
//! source it was computed from, written as pretty-printed JSON.

use chrono::{DateTime, Utc};
use esg_common::events::{Report, SelectionState};
use esg_common::time::{self, epoch_millis};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

/// Self-describing export of one report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub timestamp: DateTime<Utc>,
    pub data_source: String,
    pub selections: SelectionState,
    pub report: Arc<Report>,
}

impl ExportDocument {
    pub fn new(report: Arc<Report>) -> Self {
        Self {
            timestamp: time::now(),
            data_source: report.source_meta.source.clone(),
            selections: report.selection.clone(),
            report,
        }
    }

    /// Default file name: `esg-worldbank-analysis-{millis}.json`
    pub fn file_name(&self) -> String {
        format!("esg-worldbank-analysis-{}.json", epoch_millis(self.timestamp))
    }

    pub fn to_pretty_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            EngineError::Common(esg_common::Error::Internal(format!(
                "Serialize export failed: {}",
                e
            )))
        })
    }

    /// Write the document into `dir` under its default file name
    pub fn write_to_dir(&self, dir: &Path) -> EngineResult<PathBuf> {
        let path = dir.join(self.file_name());
        let json = self.to_pretty_json()?;
        std::fs::write(&path, json).map_err(|e| EngineError::Common(e.into()))?;
        Ok(path)
    }
}
