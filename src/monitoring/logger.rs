use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use crate::estimation::types::{Estimate, Query};

const HEADER: &str =
    "timestamp,location,property_type,area_sq_m,estimated_price,low,high,confidence,comparables";

/// Append-only CSV log of produced estimates
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        // Create CSV file with headers if it doesn't exist
        if !std::path::Path::new(&log_path).exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    pub fn path(&self) -> &str {
        &self.log_path
    }

    /// Log one estimate
    pub fn log_estimate(&self, query: &Query, estimate: &Estimate) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        let kind = query
            .property_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default();

        writeln!(
            file,
            "{},{},{},{:.1},{:.0},{:.0},{:.0},{},{}",
            Utc::now().to_rfc3339(),
            csv_field(&query.location),
            kind,
            query.area_sq_m,
            estimate.estimated_price,
            estimate.price_range.low,
            estimate.price_range.high,
            estimate.confidence,
            estimate.comparables.len()
        )?;

        Ok(())
    }

    /// Log a free-form event (no data, store failure)
    pub fn log_event(&self, event: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;

        writeln!(
            file,
            "{},EVENT,{},,,,,,",
            Utc::now().to_rfc3339(),
            csv_field(event)
        )?;

        Ok(())
    }
}

/// Quote fields that contain separators (Thai addresses often carry commas)
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
