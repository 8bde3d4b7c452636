//! Tolerant line-oriented parsers for the two grammars the Judge
//! Coordinator's LM calls are expected to answer in (spec §4.5 points
//! 1 and 3). Grounded on the teacher's own tolerant log parsers
//! (`providers/claude/parser.rs`, `providers/codex/parser.rs`): scan
//! line by line, match a `KEY:` prefix case-insensitively, accumulate
//! bullet items under whichever key introduced a list, and never fail
//! the whole parse over one malformed line.

use flowdeck_types::{ModelRole, Quality};

/// A per-expert report straight off the wire, before the `role` field
/// (which the caller knows, not the text) is attached.
#[derive(Debug, Clone, Default)]
pub struct RawExpertReport {
    pub prompt_adherence: Option<u8>,
    pub project_quality: Option<u8>,
    pub actions: Option<u32>,
    pub errors: Option<u32>,
    pub observations: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Observations,
    Recommendations,
}

/// Parse the expert-report grammar (spec §4.5 point 1): `PROMPT_ADHERENCE:
/// n`, `PROJECT_QUALITY: n`, `ACTIONS: n`, `ERRORS: n`, `OBSERVATIONS: -
/// …`, `RECOMMENDATIONS: - …`. Returns `Err` with a reason when the two
/// numeric scores required for consensus math are missing -- everything
/// else degrades gracefully to empty.
pub fn parse_expert_report(text: &str) -> Result<RawExpertReport, String> {
    let mut report = RawExpertReport::default();
    let mut section = Section::None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = key_value(line, "PROMPT_ADHERENCE") {
            report.prompt_adherence = value.trim().parse().ok();
            section = Section::None;
            continue;
        }
        if let Some(value) = key_value(line, "PROJECT_QUALITY") {
            report.project_quality = value.trim().parse().ok();
            section = Section::None;
            continue;
        }
        if let Some(value) = key_value(line, "ACTIONS") {
            report.actions = value.trim().parse().ok();
            section = Section::None;
            continue;
        }
        if let Some(value) = key_value(line, "ERRORS") {
            report.errors = value.trim().parse().ok();
            section = Section::None;
            continue;
        }
        if let Some(value) = key_value(line, "OBSERVATIONS") {
            section = Section::Observations;
            push_if_present(&mut report.observations, value);
            continue;
        }
        if let Some(value) = key_value(line, "RECOMMENDATIONS") {
            section = Section::Recommendations;
            push_if_present(&mut report.recommendations, value);
            continue;
        }

        if let Some(item) = strip_bullet(line) {
            match section {
                Section::Observations => report.observations.push(item.to_string()),
                Section::Recommendations => report.recommendations.push(item.to_string()),
                Section::None => {}
            }
        }
    }

    if report.prompt_adherence.is_none() && report.project_quality.is_none() {
        return Err("response carried neither PROMPT_ADHERENCE nor PROJECT_QUALITY".to_string());
    }

    Ok(report)
}

/// The fixed TLDR synthesis grammar (spec §4.5 point 3). Every field
/// falls back to an empty/default value so a ragged response still
/// yields a usable `Tldr` rather than an error -- the synthesis call has
/// no `Analysis.failures` slot to report into.
pub struct RawTldr {
    pub prompt_goal: String,
    pub implementation: String,
    pub expert_consensus: String,
    pub discoveries: Vec<String>,
    pub issues: String,
    pub quality: Option<Quality>,
    pub justification: String,
    pub recommendations: Vec<String>,
}

pub fn parse_tldr(text: &str) -> RawTldr {
    let mut prompt_goal = String::new();
    let mut implementation = String::new();
    let mut expert_consensus = String::new();
    let mut discoveries = Vec::new();
    let mut issues = String::new();
    let mut quality = None;
    let mut justification = String::new();
    let mut recommendations = Vec::new();

    #[derive(PartialEq)]
    enum Field {
        None,
        PromptGoal,
        Implementation,
        ExpertConsensus,
        Discoveries,
        Issues,
        Justification,
        Recommendations,
    }
    let mut field = Field::None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = key_value(line, "PROMPT GOAL") {
            field = Field::PromptGoal;
            prompt_goal = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "IMPLEMENTATION") {
            field = Field::Implementation;
            implementation = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "EXPERT CONSENSUS") {
            field = Field::ExpertConsensus;
            expert_consensus = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "DISCOVERIES") {
            field = Field::Discoveries;
            push_if_present(&mut discoveries, value);
            continue;
        }
        if let Some(value) = key_value(line, "ISSUES") {
            field = Field::Issues;
            issues = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "QUALITY ASSESSMENT") {
            field = Field::None;
            quality = parse_quality(value.trim());
            continue;
        }
        if let Some(value) = key_value(line, "JUSTIFICATION") {
            field = Field::Justification;
            justification = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "RECOMMENDATIONS") {
            field = Field::Recommendations;
            push_if_present(&mut recommendations, value);
            continue;
        }

        if let Some(item) = strip_numbered(line).or_else(|| strip_bullet(line)) {
            match field {
                Field::Discoveries => discoveries.push(item.to_string()),
                Field::Recommendations => recommendations.push(item.to_string()),
                _ => {}
            }
            continue;
        }

        // A continuation line for whichever free-text field is open --
        // the synthesiser sometimes wraps a sentence across lines.
        match field {
            Field::PromptGoal => append_line(&mut prompt_goal, line),
            Field::Implementation => append_line(&mut implementation, line),
            Field::ExpertConsensus => append_line(&mut expert_consensus, line),
            Field::Issues => append_line(&mut issues, line),
            Field::Justification => append_line(&mut justification, line),
            Field::None | Field::Discoveries | Field::Recommendations => {}
        }
    }

    RawTldr {
        prompt_goal,
        implementation,
        expert_consensus,
        discoveries,
        issues,
        quality,
        justification,
        recommendations,
    }
}

/// The structured suspension-analysis grammar (spec §4.7 point 3):
/// `WHAT_HAPPENED`, `ROOT_CAUSE`, `FACTORS`, `PROPOSED_SOLUTIONS`. Same
/// tolerant line scan as the other two grammars in this module.
pub struct RawSuspensionAnalysis {
    pub what_happened: String,
    pub root_cause: String,
    pub factors: Vec<String>,
    pub proposed_solutions: Vec<String>,
}

pub fn parse_suspension_analysis(text: &str) -> RawSuspensionAnalysis {
    let mut what_happened = String::new();
    let mut root_cause = String::new();
    let mut factors = Vec::new();
    let mut proposed_solutions = Vec::new();

    #[derive(PartialEq)]
    enum Field {
        None,
        WhatHappened,
        RootCause,
        Factors,
        ProposedSolutions,
    }
    let mut field = Field::None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(value) = key_value(line, "WHAT_HAPPENED") {
            field = Field::WhatHappened;
            what_happened = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "ROOT_CAUSE") {
            field = Field::RootCause;
            root_cause = value.trim().to_string();
            continue;
        }
        if let Some(value) = key_value(line, "FACTORS") {
            field = Field::Factors;
            push_if_present(&mut factors, value);
            continue;
        }
        if let Some(value) = key_value(line, "PROPOSED_SOLUTIONS") {
            field = Field::ProposedSolutions;
            push_if_present(&mut proposed_solutions, value);
            continue;
        }

        if let Some(item) = strip_numbered(line).or_else(|| strip_bullet(line)) {
            match field {
                Field::Factors => factors.push(item.to_string()),
                Field::ProposedSolutions => proposed_solutions.push(item.to_string()),
                _ => {}
            }
            continue;
        }

        match field {
            Field::WhatHappened => append_line(&mut what_happened, line),
            Field::RootCause => append_line(&mut root_cause, line),
            Field::None | Field::Factors | Field::ProposedSolutions => {}
        }
    }

    RawSuspensionAnalysis { what_happened, root_cause, factors, proposed_solutions }
}

fn append_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

fn parse_quality(value: &str) -> Option<Quality> {
    let normalized = value.to_ascii_uppercase();
    if normalized.contains("EXCEPTIONAL") {
        Some(Quality::Exceptional)
    } else if normalized.contains("ACCEPTABLE") {
        Some(Quality::Acceptable)
    } else if normalized.contains("NEEDS_IMPROVEMENT") || normalized.contains("NEEDS IMPROVEMENT") {
        Some(Quality::NeedsImprovement)
    } else {
        None
    }
}

/// `"KEY: rest"` -> `Some(rest)`, case-insensitive on `key`, tolerant of
/// the colon being followed by no space. Returns `None` if `line` does
/// not start with `key`.
fn key_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let prefix_len = key.len();
    if line.len() <= prefix_len {
        return None;
    }
    let (candidate, rest) = line.split_at(prefix_len);
    if !candidate.eq_ignore_ascii_case(key) {
        return None;
    }
    rest.strip_prefix(':').map(str::trim)
}

fn push_if_present(target: &mut Vec<String>, value: &str) {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        if let Some(item) = strip_bullet(trimmed).or(Some(trimmed)) {
            target.push(item.to_string());
        }
    }
}

/// Strip a leading `-`, `*` or `•` bullet marker (spec §4.5 point 3).
fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    None
}

/// Strip a leading `1.`, `2.`, … marker (spec §4.5 point 3:
/// "tolerant ... of numbered recommendations").
fn strip_numbered(line: &str) -> Option<&str> {
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let rest = &line[digits_end..];
    rest.strip_prefix('.').map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_expert_report() {
        let text = "\
PROMPT_ADHERENCE: 85
PROJECT_QUALITY: 90
ACTIONS: 4
ERRORS: 0
OBSERVATIONS:
- implementation matches the request
- tests were added
RECOMMENDATIONS:
- add a regression test for the edge case";

        let report = parse_expert_report(text).unwrap();
        assert_eq!(report.prompt_adherence, Some(85));
        assert_eq!(report.project_quality, Some(90));
        assert_eq!(report.observations.len(), 2);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn tolerates_mixed_bullet_characters() {
        let text = "PROMPT_ADHERENCE: 70\nPROJECT_QUALITY: 70\nOBSERVATIONS:\n* first\n• second\n- third";
        let report = parse_expert_report(text).unwrap();
        assert_eq!(report.observations, vec!["first", "second", "third"]);
    }

    #[test]
    fn missing_both_scores_is_a_parse_failure() {
        let text = "OBSERVATIONS:\n- something";
        assert!(parse_expert_report(text).is_err());
    }

    #[test]
    fn parses_tldr_with_numbered_recommendations() {
        let text = "\
PROMPT GOAL: add a function
IMPLEMENTATION: added util.add
EXPERT CONSENSUS: strong agreement
DISCOVERIES:
- existing helper was reusable
ISSUES: none
QUALITY ASSESSMENT: ACCEPTABLE
JUSTIFICATION: meets the requirements
RECOMMENDATIONS:
1. add a doc comment
2. add a benchmark";

        let tldr = parse_tldr(text);
        assert_eq!(tldr.prompt_goal, "add a function");
        assert_eq!(tldr.quality, Some(Quality::Acceptable));
        assert_eq!(tldr.recommendations, vec!["add a doc comment", "add a benchmark"]);
    }

    #[test]
    fn tldr_quality_is_none_when_assessment_is_missing() {
        let tldr = parse_tldr("PROMPT GOAL: x\nIMPLEMENTATION: y");
        assert!(tldr.quality.is_none());
    }

    #[test]
    fn parses_a_well_formed_suspension_analysis() {
        let text = "\
WHAT_HAPPENED: the step's tool call referenced a file outside the project
ROOT_CAUSE: the plan named a path that was never created
FACTORS:
- the brief did not list the file's real location
PROPOSED_SOLUTIONS:
1. re-run Knowledge.P2 to re-survey the tree
2. ask for clarification on the intended file name";

        let analysis = parse_suspension_analysis(text);
        assert_eq!(analysis.root_cause, "the plan named a path that was never created");
        assert_eq!(analysis.factors.len(), 1);
        assert_eq!(analysis.proposed_solutions.len(), 2);
    }
}
