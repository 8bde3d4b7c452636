use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ModelRole;

/// Final quality verdict bucket (spec §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quality {
    Exceptional,
    Acceptable,
    NeedsImprovement,
}

impl Quality {
    /// Auto-assessment thresholds used when the synthesiser omits an
    /// explicit verdict (spec §4.5 point 4).
    pub fn from_average(avg: f64) -> Self {
        if avg >= 90.0 {
            Self::Exceptional
        } else if avg >= 70.0 {
            Self::Acceptable
        } else {
            Self::NeedsImprovement
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exceptional => "EXCEPTIONAL",
            Self::Acceptable => "ACCEPTABLE",
            Self::NeedsImprovement => "NEEDS_IMPROVEMENT",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single expert's scored analysis of the session (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertReport {
    pub role: ModelRole,
    pub prompt_adherence: u8,
    pub project_quality: u8,
    pub actions: u32,
    pub errors: u32,
    pub observations: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Why a configured expert produced no report (spec §4.5 point 1, §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertFailure {
    pub role: ModelRole,
    pub reason: String,
}

/// Aggregated per-expert scores and their arithmetic averages (spec §3,
/// §4.5 point 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    pub reports: Vec<ExpertReport>,
    pub failures: Vec<ExpertFailure>,
    pub avg_prompt_adherence: f64,
    pub avg_project_quality: f64,
}

impl Consensus {
    pub fn compute(reports: Vec<ExpertReport>, failures: Vec<ExpertFailure>) -> Self {
        let n = reports.len().max(1) as f64;
        let avg_prompt_adherence = if reports.is_empty() {
            0.0
        } else {
            reports.iter().map(|r| r.prompt_adherence as f64).sum::<f64>() / n
        };
        let avg_project_quality = if reports.is_empty() {
            0.0
        } else {
            reports.iter().map(|r| r.project_quality as f64).sum::<f64>() / n
        };
        Self {
            reports,
            failures,
            avg_prompt_adherence,
            avg_project_quality,
        }
    }

    /// Average of the two averages, the input to `Quality::from_average`.
    pub fn overall_average(&self) -> f64 {
        (self.avg_prompt_adherence + self.avg_project_quality) / 2.0
    }

    pub fn by_role(&self) -> HashMap<ModelRole, &ExpertReport> {
        self.reports.iter().map(|r| (r.role, r)).collect()
    }
}

/// The final synthesized verdict (spec §3, §4.5 point 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tldr {
    pub prompt_goal: String,
    pub implementation: String,
    pub expert_consensus: String,
    pub discoveries: Vec<String>,
    pub issues: String,
    pub quality: Quality,
    pub justification: String,
    pub recommendations: Vec<String>,
}
