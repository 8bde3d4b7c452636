use serde::{Deserialize, Serialize};

/// One of the five top-level phases a run moves through (spec §1, §3).
///
/// Ordered 1..5; the ordinal is meaningful (it's what `Position` sorts and
/// what the navigation table in `flowdeck-engine` indexes by), so this is a
/// fieldless enum with explicit discriminants rather than a bare `u8` —
/// callers get exhaustive matches instead of a silently-valid `6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Knowledge = 1,
    Plan = 2,
    Implement = 3,
    Scale = 4,
    Production = 5,
}

pub const SCHEDULE_COUNT: usize = 5;

impl Schedule {
    pub const ALL: [Schedule; SCHEDULE_COUNT] = [
        Schedule::Knowledge,
        Schedule::Plan,
        Schedule::Implement,
        Schedule::Scale,
        Schedule::Production,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Knowledge),
            2 => Some(Self::Plan),
            3 => Some(Self::Implement),
            4 => Some(Self::Scale),
            5 => Some(Self::Production),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Knowledge => "Knowledge",
            Self::Plan => "Plan",
            Self::Implement => "Implement",
            Self::Scale => "Scale",
            Self::Production => "Production",
        }
    }

    /// The default model role for this schedule (spec §4.3: "Knowledge ->
    /// researcher; ... otherwise role derived from intent, defaulting to
    /// coder").
    pub const fn default_role(self) -> crate::ModelRole {
        match self {
            Self::Knowledge => crate::ModelRole::Researcher,
            _ => crate::ModelRole::Coder,
        }
    }
}

/// One of the three ordered sub-phases inside a schedule (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    P1 = 1,
    P2 = 2,
    P3 = 3,
}

pub const PROCESSES_PER_SCHEDULE: usize = 3;

impl Process {
    pub const ALL: [Process; PROCESSES_PER_SCHEDULE] = [Process::P1, Process::P2, Process::P3];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::P1),
            2 => Some(Self::P2),
            3 => Some(Self::P3),
            _ => None,
        }
    }
}

/// Whether a process requires human consultation before it commits (spec
/// §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consultation {
    None,
    /// Invoked only when the process body flags ambiguity (Plan.P2).
    Optional,
    /// Always invoked after the step body (Implement.P3).
    Mandatory,
}

/// `(schedule, process)` pair identifying the orchestrator's current spot.
///
/// `(0, 0)` — spelled `Position::START` — is the sentinel "not yet started"
/// value from spec §3. It is otherwise an invalid `Schedule`/`Process`
/// pair by construction, which is why `Position` stores raw `u8`s instead
/// of `Option<Schedule>`/`Option<Process>`: the sentinel is a genuine third
/// state, not an absence, and the navigation table (`flowdeck-engine`)
/// treats it as row zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    schedule: u8,
    process: u8,
}

impl Position {
    pub const START: Self = Self {
        schedule: 0,
        process: 0,
    };

    pub fn new(schedule: Schedule, process: Process) -> Self {
        Self {
            schedule: schedule.id(),
            process: process.id(),
        }
    }

    pub fn is_start(self) -> bool {
        self == Self::START
    }

    pub fn schedule(self) -> Option<Schedule> {
        Schedule::from_id(self.schedule)
    }

    pub fn process(self) -> Option<Process> {
        Process::from_id(self.process)
    }

    /// Raw `(schedule_id, process_id)` pair, `(0, 0)` for `START`. Used by
    /// the navigation table, which indexes by these raw ordinals.
    pub fn raw(self) -> (u8, u8) {
        (self.schedule, self.process)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_start() {
            write!(f, "START")
        } else {
            write!(f, "S{}P{}", self.schedule, self.process)
        }
    }
}
