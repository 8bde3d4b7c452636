use serde::{Deserialize, Serialize};

use crate::{Position, Process, Schedule};

/// Compact textual transcript of visited positions (spec §3): a prefix
/// `S<n>` for each schedule entry, followed by the digits of each process
/// visited, e.g. `S1P123S2P12`. A trailing `X` denotes suspension.
///
/// A `FlowCode` is a pure monoid over the history: appending a position is
/// the only way to grow one, and printing/parsing round-trip exactly
/// (spec §8, invariant 1). This type owns the printer; `flowdeck-engine`
/// owns the parser-facing legality checks so the two stay decoupled the
/// way the design notes (§9) ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowCode(String);

impl FlowCode {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.0.ends_with('X')
    }

    /// Drop a trailing suspension marker, if present (spec §4.7 point 5).
    pub fn clear_suspension(&mut self) {
        if self.is_suspended() {
            self.0.pop();
        }
    }

    pub fn mark_suspended(&mut self) {
        if !self.is_suspended() {
            self.0.push('X');
        }
    }

    /// Append the one character this transition contributes to the code.
    ///
    /// A move into a new schedule (the previous visited position, if any,
    /// had a different schedule than `next`) prepends `S<n>` before the
    /// process digit; a move within the same schedule just appends the
    /// process digit.
    pub fn push(&mut self, previous: Position, next: Position) {
        debug_assert!(!self.is_suspended(), "must clear suspension before appending");
        let entering_new_schedule = previous.schedule() != next.schedule();
        if entering_new_schedule {
            if let Some(schedule) = next.schedule() {
                self.0.push('S');
                self.0.push_str(&schedule.id().to_string());
            }
        }
        if let Some(process) = next.process() {
            self.0.push_str(&process.id().to_string());
        }
    }

    /// Parse the code back into the exact sequence of positions visited
    /// (spec §8, invariant 1 / invariant 2 of §3).
    pub fn positions(&self) -> Result<Vec<Position>, FlowCodeParseError> {
        let body = self.0.strip_suffix('X').unwrap_or(&self.0);
        let mut out = Vec::new();
        let mut chars = body.chars().peekable();
        let mut current_schedule: Option<Schedule> = None;

        while let Some(c) = chars.next() {
            match c {
                'S' => {
                    let mut digits = String::new();
                    while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
                        digits.push(chars.next().unwrap());
                    }
                    let id: u8 = digits
                        .parse()
                        .map_err(|_| FlowCodeParseError::MalformedSchedule(digits.clone()))?;
                    let schedule = Schedule::from_id(id)
                        .ok_or(FlowCodeParseError::UnknownSchedule(id))?;
                    current_schedule = Some(schedule);
                    // `S<n>` alone (no following process digit yet) is only
                    // valid as a trailing partial token, which never
                    // happens for a code built exclusively through `push`.
                }
                'P' => {
                    // Teacher-readable alternate spelling: `S1P123` — the
                    // `P` is punctuation, the digits after it are the
                    // process sequence for the schedule just opened.
                    let schedule = current_schedule
                        .ok_or(FlowCodeParseError::ProcessBeforeSchedule)?;
                    while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
                        let digit = chars.next().unwrap();
                        let id = digit
                            .to_digit(10)
                            .and_then(|d| u8::try_from(d).ok())
                            .ok_or(FlowCodeParseError::MalformedProcess(digit))?;
                        let process = Process::from_id(id)
                            .ok_or(FlowCodeParseError::UnknownProcess(id))?;
                        out.push(Position::new(schedule, process));
                    }
                }
                other => return Err(FlowCodeParseError::UnexpectedChar(other)),
            }
        }

        Ok(out)
    }
}

impl std::fmt::Display for FlowCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCodeParseError {
    MalformedSchedule(String),
    UnknownSchedule(u8),
    ProcessBeforeSchedule,
    MalformedProcess(char),
    UnknownProcess(u8),
    UnexpectedChar(char),
}

impl std::fmt::Display for FlowCodeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSchedule(s) => write!(f, "malformed schedule digits {s:?}"),
            Self::UnknownSchedule(id) => write!(f, "unknown schedule id {id}"),
            Self::ProcessBeforeSchedule => write!(f, "process digit before any schedule token"),
            Self::MalformedProcess(c) => write!(f, "malformed process digit {c:?}"),
            Self::UnknownProcess(id) => write!(f, "unknown process id {id}"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character {c:?} in flow code"),
        }
    }
}

impl std::error::Error for FlowCodeParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_code_has_no_positions() {
        let code = FlowCode::empty();
        assert_eq!(code.positions().unwrap(), vec![]);
    }

    #[test]
    fn round_trips_a_single_schedule() {
        let mut code = FlowCode::empty();
        let p1 = Position::new(Schedule::Knowledge, Process::P1);
        let p2 = Position::new(Schedule::Knowledge, Process::P2);
        let p3 = Position::new(Schedule::Knowledge, Process::P3);
        code.push(Position::START, p1);
        code.push(p1, p2);
        code.push(p2, p3);
        assert_eq!(code.as_str(), "S1P123");
        assert_eq!(code.positions().unwrap(), vec![p1, p2, p3]);
    }

    #[test]
    fn round_trips_across_schedules() {
        let mut code = FlowCode::empty();
        let s1p1 = Position::new(Schedule::Knowledge, Process::P1);
        let s1p2 = Position::new(Schedule::Knowledge, Process::P2);
        let s1p3 = Position::new(Schedule::Knowledge, Process::P3);
        let s2p1 = Position::new(Schedule::Plan, Process::P1);
        let s2p2 = Position::new(Schedule::Plan, Process::P2);
        code.push(Position::START, s1p1);
        code.push(s1p1, s1p2);
        code.push(s1p2, s1p3);
        code.push(s1p3, s2p1);
        code.push(s2p1, s2p2);
        assert_eq!(code.as_str(), "S1P123S2P12");
        assert_eq!(
            code.positions().unwrap(),
            vec![s1p1, s1p2, s1p3, s2p1, s2p2]
        );
    }

    #[test]
    fn retry_within_a_process_appends_the_same_digit() {
        let mut code = FlowCode::empty();
        let p1 = Position::new(Schedule::Knowledge, Process::P1);
        code.push(Position::START, p1);
        code.push(p1, p1);
        assert_eq!(code.as_str(), "S1P11");
        assert_eq!(code.positions().unwrap(), vec![p1, p1]);
    }

    #[test]
    fn suspension_marker_round_trips_by_being_stripped() {
        let mut code = FlowCode::empty();
        let p1 = Position::new(Schedule::Knowledge, Process::P1);
        code.push(Position::START, p1);
        code.mark_suspended();
        assert_eq!(code.as_str(), "S1P1X");
        assert_eq!(code.positions().unwrap(), vec![p1]);
        code.clear_suspension();
        assert_eq!(code.as_str(), "S1P1");
    }

    #[test]
    fn unknown_schedule_id_is_rejected() {
        let code = FlowCode(String::from("S9P1"));
        assert_eq!(
            code.positions().unwrap_err(),
            FlowCodeParseError::UnknownSchedule(9)
        );
    }
}
