use flowdeck_types::{FlowCode, Position};

use crate::error::Error;

/// One of the hardcoded canned analyses used in place of an LM call for
/// well-known operational failures (spec §4.7 point 3).
const CANNED_ANALYSES: &[(&str, &str)] = &[
    (
        "E010",
        "The local inference daemon could not be reached. Check that it is running and that \
         the configured URL is correct.",
    ),
    (
        "E011",
        "A configured model is not installed on the inference daemon. Pull the model or adjust \
         the tier mapping.",
    ),
];

/// One of the four verdicts a user may give when a run is suspended
/// (spec §4.7 point 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionVerdict {
    Retry,
    Skip,
    Abort,
    Investigate,
}

/// What to do with the frozen run once a verdict is chosen (spec §4.7
/// point 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStrategy {
    /// Re-execute the last step.
    ReExecute,
    /// Jump to the next legal process.
    SkipForward,
    /// Finalise the run without a TLDR.
    FinalizeWithoutTldr,
    /// Open an interactive loop that still respects navigation rules.
    Investigate,
}

impl SuspensionVerdict {
    pub const fn resume_strategy(self) -> ResumeStrategy {
        match self {
            Self::Retry => ResumeStrategy::ReExecute,
            Self::Skip => ResumeStrategy::SkipForward,
            Self::Abort => ResumeStrategy::FinalizeWithoutTldr,
            Self::Investigate => ResumeStrategy::Investigate,
        }
    }

    /// Whether applying this verdict advances the run's state. Only a
    /// successful advance clears the `X` suspension marker (spec §4.7
    /// point 5).
    pub const fn advances_state(self) -> bool {
        !matches!(self, Self::Abort)
    }
}

/// A frozen, user-facing description of why a run stopped (spec §4.7
/// points 1-3).
#[derive(Debug, Clone)]
pub struct SuspensionReport {
    pub code: &'static str,
    pub message: String,
    pub frozen_position: Position,
    pub flow_code: FlowCode,
    pub analysis: SuspensionAnalysis,
}

/// A structured root-cause analysis, either canned or LM-produced (spec
/// §4.7 point 3).
#[derive(Debug, Clone)]
pub struct SuspensionAnalysis {
    pub what_happened: String,
    pub root_cause: String,
    pub factors: Vec<String>,
    pub proposed_solutions: Vec<String>,
}

impl SuspensionAnalysis {
    fn canned(code: &'static str, message: &str) -> Self {
        Self {
            what_happened: message.to_string(),
            root_cause: "known operational failure".to_string(),
            factors: Vec::new(),
            proposed_solutions: Vec::new(),
        }
    }
}

/// Freezes a run on a non-recoverable error and builds the report shown
/// to the user (spec §4.7).
pub struct SuspensionHandler;

impl SuspensionHandler {
    pub fn new() -> Self {
        Self
    }

    /// Whether `code` has a hardcoded canned analysis (spec §4.7 point
    /// 3). Used by the orchestrator to decide whether a suspension needs
    /// an extra orchestrator-role LM call at all.
    pub fn is_canned(&self, code: &str) -> bool {
        CANNED_ANALYSES.iter().any(|(c, _)| *c == code)
    }

    /// Build a suspension report. Uses the canned analysis for
    /// well-known operational codes; callers needing an LM-synthesised
    /// analysis for anything else should supply it via
    /// `with_lm_analysis`.
    pub fn freeze(&self, error: &Error, position: Position, flow_code: FlowCode) -> SuspensionReport {
        let code = error.code();
        let analysis = CANNED_ANALYSES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(c, msg)| SuspensionAnalysis::canned(c, msg))
            .unwrap_or_else(|| SuspensionAnalysis {
                what_happened: error.to_string(),
                root_cause: "unclassified".to_string(),
                factors: Vec::new(),
                proposed_solutions: Vec::new(),
            });
        SuspensionReport {
            code,
            message: error.to_string(),
            frozen_position: position,
            flow_code,
            analysis,
        }
    }

    /// Replace a report's analysis with one synthesised by the
    /// orchestrator-role LM (spec §4.7 point 3: "else call the
    /// orchestrator-role LM to produce a structured analysis").
    pub fn with_lm_analysis(&self, mut report: SuspensionReport, analysis: SuspensionAnalysis) -> SuspensionReport {
        report.analysis = analysis;
        report
    }
}

impl Default for SuspensionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_types::StructuralCode;

    #[test]
    fn known_operational_code_uses_canned_analysis() {
        let handler = SuspensionHandler::new();
        let error = Error::Types(flowdeck_types::Error::operational(
            flowdeck_types::OperationalCode::OllamaUnavailable,
            "probe failed",
        ));
        let report = handler.freeze(&error, Position::START, FlowCode::empty());
        assert_eq!(report.code, "E010");
        assert_eq!(report.analysis.root_cause, "known operational failure");
    }

    #[test]
    fn unclassified_code_needs_lm_analysis() {
        let handler = SuspensionHandler::new();
        let error = Error::Types(flowdeck_types::Error::structural(
            StructuralCode::InvalidTransition,
            "bad jump",
        ));
        let report = handler.freeze(&error, Position::START, FlowCode::empty());
        assert_eq!(report.analysis.root_cause, "unclassified");
    }

    #[test]
    fn abort_does_not_advance_state() {
        assert!(!SuspensionVerdict::Abort.advances_state());
        assert!(SuspensionVerdict::Retry.advances_state());
    }
}
