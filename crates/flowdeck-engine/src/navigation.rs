use std::fmt;

use flowdeck_types::{Position, Process, Schedule};

/// Legal in-schedule successors of each process, expressed as the design
/// note in §9 prescribes: a table lookup, not a nest of conditionals.
const LEGAL_MOVES: [(Process, &[Process]); 3] = [
    (Process::P1, &[Process::P1, Process::P2]),
    (Process::P2, &[Process::P1, Process::P2, Process::P3]),
    (Process::P3, &[Process::P2, Process::P3]),
];

/// Why a requested transition was rejected (spec §4.6, §7 E001-E009).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationError {
    /// P1->P3, or any jump that skips a mandatory intermediate process.
    InvalidTransition,
    /// Target schedule has no such process id.
    UnknownProcess,
    /// A schedule already terminated was re-entered with no justification.
    ReopenWithoutJustification,
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition => write!(f, "illegal transition between processes"),
            Self::UnknownProcess => write!(f, "target process does not exist"),
            Self::ReopenWithoutJustification => {
                write!(f, "terminated schedule reopened without justification")
            }
        }
    }
}

impl std::error::Error for NavigationError {}

impl NavigationError {
    pub fn structural_code(self) -> flowdeck_types::StructuralCode {
        match self {
            Self::InvalidTransition => flowdeck_types::StructuralCode::InvalidTransition,
            Self::UnknownProcess => flowdeck_types::StructuralCode::InvalidTransition,
            Self::ReopenWithoutJustification => {
                flowdeck_types::StructuralCode::ReopenWithoutJustification
            }
        }
    }
}

/// Check whether moving from `from` to `to` is legal (spec §4.6).
///
/// `terminated_schedules` lists schedules already marked terminated; a
/// justified re-entry (explicitly allowed by the orchestrator-role
/// decision, see §4.6) bypasses the "reopen without justification" check
/// by way of `justified_reentry`.
pub fn legal_transition(
    from: Position,
    to: Position,
    terminated_schedules: &[Schedule],
    justified_reentry: bool,
) -> Result<(), NavigationError> {
    let to_schedule = to.schedule().ok_or(NavigationError::UnknownProcess)?;
    let to_process = to.process().ok_or(NavigationError::UnknownProcess)?;

    if from.is_start() {
        return if to_process == Process::P1 {
            Ok(())
        } else {
            Err(NavigationError::InvalidTransition)
        };
    }

    let from_schedule = from.schedule().ok_or(NavigationError::UnknownProcess)?;
    let from_process = from.process().ok_or(NavigationError::UnknownProcess)?;

    if to_schedule != from_schedule {
        // Cross-schedule moves are legal only as a P3 schedule-terminate
        // into a fresh schedule's P1 (§4.6 "Schedule-to-schedule").
        if from_process != Process::P3 || to_process != Process::P1 {
            return Err(NavigationError::InvalidTransition);
        }
        if terminated_schedules.contains(&to_schedule) && !justified_reentry {
            return Err(NavigationError::ReopenWithoutJustification);
        }
        return Ok(());
    }

    let moves: &[Process] = LEGAL_MOVES
        .iter()
        .find(|(p, _)| *p == from_process)
        .map(|(_, moves)| *moves)
        .unwrap_or(&[]);

    if moves.contains(&to_process) {
        Ok(())
    } else {
        Err(NavigationError::InvalidTransition)
    }
}

/// Whether completing `position` with outcome `ok` marks its schedule
/// terminated (spec §4.1 point 8: "If `current.process == 3` and the body
/// signalled 'schedule complete'").
pub fn is_schedule_terminating(position: Position, body_signalled_complete: bool) -> bool {
    position.process() == Some(Process::P3) && body_signalled_complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_types::{Position, Schedule};

    fn pos(s: Schedule, p: Process) -> Position {
        Position::new(s, p)
    }

    #[test]
    fn start_only_advances_to_p1() {
        assert!(legal_transition(Position::START, pos(Schedule::Knowledge, Process::P1), &[], false).is_ok());
        assert!(legal_transition(Position::START, pos(Schedule::Knowledge, Process::P2), &[], false).is_err());
    }

    #[test]
    fn p1_can_retry_or_advance() {
        let from = pos(Schedule::Knowledge, Process::P1);
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P1), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P2), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P3), &[], false).is_err());
    }

    #[test]
    fn p2_can_retreat_retry_or_advance() {
        let from = pos(Schedule::Knowledge, Process::P2);
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P1), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P2), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P3), &[], false).is_ok());
    }

    #[test]
    fn p3_cannot_skip_forward_within_schedule() {
        let from = pos(Schedule::Knowledge, Process::P3);
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P2), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P3), &[], false).is_ok());
        assert!(legal_transition(from, pos(Schedule::Knowledge, Process::P1), &[], false).is_err());
    }

    #[test]
    fn schedule_terminate_advances_to_next_schedule_p1() {
        let from = pos(Schedule::Knowledge, Process::P3);
        let to = pos(Schedule::Plan, Process::P1);
        assert!(legal_transition(from, to, &[], false).is_ok());
    }

    #[test]
    fn reopening_terminated_schedule_needs_justification() {
        let from = pos(Schedule::Plan, Process::P3);
        let to = pos(Schedule::Knowledge, Process::P1);
        let terminated = [Schedule::Knowledge];
        assert_eq!(
            legal_transition(from, to, &terminated, false),
            Err(NavigationError::ReopenWithoutJustification)
        );
        assert!(legal_transition(from, to, &terminated, true).is_ok());
    }

    #[test]
    fn p1_to_p3_is_illegal() {
        let from = pos(Schedule::Implement, Process::P1);
        let to = pos(Schedule::Implement, Process::P3);
        assert_eq!(
            legal_transition(from, to, &[], false),
            Err(NavigationError::InvalidTransition)
        );
    }
}
