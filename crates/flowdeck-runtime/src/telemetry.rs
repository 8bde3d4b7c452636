//! Telemetry Sink (spec §2, §4.10): local-only aggregate counters,
//! bounded to the last 1000 records, never transmitted over the
//! network. Persistence follows the same write-temp + rename discipline
//! as `config.rs` and `session_store.rs`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flowdeck_types::{PlatformOrigin, SessionId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

const MAX_RECORDS: usize = 1000;

/// Three reference commercial pricings (USD per million tokens, input
/// and output), used only to estimate what running the same work
/// through a hosted API would have cost (spec §4.10). These are
/// illustrative reference points, not live pricing -- the sink has no
/// network access to refresh them.
const REFERENCE_PRICINGS: [(f64, f64); 3] = [
    (3.00, 15.00),  // mid-tier hosted frontier model
    (0.25, 1.25),   // small hosted model
    (15.00, 75.00), // large hosted model
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub platform_origin: PlatformOrigin,
    pub success: bool,
    pub peak_memory_gb: f64,
    pub total_tokens: u64,
    pub disk_written_mb: f64,
    pub duration_seconds: f64,
    pub estimated_cost_saved: f64,
}

/// Inputs the caller already has in hand when a run finishes; the sink
/// only adds the timestamp and the derived cost estimate.
pub struct RunSummary {
    pub session_id: SessionId,
    pub platform_origin: PlatformOrigin,
    pub success: bool,
    pub peak_memory_gb: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub disk_written_mb: f64,
    pub duration_seconds: f64,
}

/// Mean, across `REFERENCE_PRICINGS`, of `(input*price_in +
/// output*price_out) / 1e6` in USD (spec §4.10).
pub fn estimated_cost_saved(prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let total: f64 = REFERENCE_PRICINGS
        .iter()
        .map(|(price_in, price_out)| {
            (prompt_tokens as f64 * price_in + completion_tokens as f64 * price_out) / 1_000_000.0
        })
        .sum();
    total / REFERENCE_PRICINGS.len() as f64
}

#[derive(Clone)]
pub struct TelemetrySink {
    path: PathBuf,
}

impl TelemetrySink {
    pub fn new(root: &Path) -> Self {
        Self { path: root.join("telemetry").join("stats.json") }
    }

    /// Appends one record, trimming the file back down to the most
    /// recent `MAX_RECORDS` entries (spec §4.10: "bounded to the last
    /// 1000 records").
    pub fn record(&self, summary: RunSummary) -> Result<()> {
        let mut records = self.read_all()?;
        records.push(TelemetryRecord {
            session_id: summary.session_id,
            timestamp: Utc::now(),
            platform_origin: summary.platform_origin,
            success: summary.success,
            peak_memory_gb: summary.peak_memory_gb,
            total_tokens: summary.prompt_tokens + summary.completion_tokens,
            disk_written_mb: summary.disk_written_mb,
            duration_seconds: summary.duration_seconds,
            estimated_cost_saved: estimated_cost_saved(summary.prompt_tokens, summary.completion_tokens),
        });

        if records.len() > MAX_RECORDS {
            let drop = records.len() - MAX_RECORDS;
            records.drain(0..drop);
        }

        self.write_all(&records)
    }

    pub fn read_all(&self) -> Result<Vec<TelemetryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn reset(&self) -> Result<()> {
        self.write_all(&[])
    }

    fn write_all(&self, records: &[TelemetryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_summary() -> RunSummary {
        RunSummary {
            session_id: SessionId::new(),
            platform_origin: PlatformOrigin::Cli,
            success: true,
            peak_memory_gb: 2.5,
            prompt_tokens: 4_000,
            completion_tokens: 1_200,
            disk_written_mb: 0.4,
            duration_seconds: 37.2,
        }
    }

    #[test]
    fn records_round_trip() {
        let dir = TempDir::new().unwrap();
        let sink = TelemetrySink::new(dir.path());
        sink.record(sample_summary()).unwrap();

        let records = sink.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_tokens, 5_200);
        assert!(records[0].estimated_cost_saved > 0.0);
    }

    #[test]
    fn history_is_bounded_to_max_records() {
        let dir = TempDir::new().unwrap();
        let sink = TelemetrySink::new(dir.path());
        for _ in 0..(MAX_RECORDS + 10) {
            sink.record(sample_summary()).unwrap();
        }
        assert_eq!(sink.read_all().unwrap().len(), MAX_RECORDS);
    }

    #[test]
    fn reset_clears_history() {
        let dir = TempDir::new().unwrap();
        let sink = TelemetrySink::new(dir.path());
        sink.record(sample_summary()).unwrap();
        sink.reset().unwrap();
        assert!(sink.read_all().unwrap().is_empty());
    }

    #[test]
    fn cost_estimate_is_zero_for_a_silent_run() {
        assert_eq!(estimated_cost_saved(0, 0), 0.0);
    }
}
