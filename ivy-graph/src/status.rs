//! The proof status lattice.
//!
//! Statuses form a total order from worst to best:
//! `unreachable < abandoned < error < fail < unknown < pending < scheduled
//! < running < pass`. The numeric discriminants below fix that order so
//! `Ord`/`PartialOrd` and the `min`/`max` combinators fall out of derives,
//! mirroring the way `raiko_tasks::TaskStatus` assigns ascending integer
//! codes to its own status enum and reduces a set of statuses with a
//! plain `min`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Status {
    Unreachable = 0,
    Abandoned = 1,
    Error = 2,
    Fail = 3,
    Unknown = 4,
    Pending = 5,
    Scheduled = 6,
    Running = 7,
    Pass = 8,
}

impl Status {
    pub const ALL: [Status; 9] = [
        Status::Unreachable,
        Status::Abandoned,
        Status::Error,
        Status::Fail,
        Status::Unknown,
        Status::Pending,
        Status::Scheduled,
        Status::Running,
        Status::Pass,
    ];

    pub fn rank(self) -> i32 {
        self as i32
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Pass | Status::Fail)
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            Status::Pass | Status::Fail | Status::Error | Status::Abandoned | Status::Unreachable
        )
    }

    pub fn from_str_code(s: &str) -> Option<Self> {
        Some(match s {
            "unreachable" => Status::Unreachable,
            "abandoned" => Status::Abandoned,
            "error" => Status::Error,
            "fail" => Status::Fail,
            "unknown" => Status::Unknown,
            "pending" => Status::Pending,
            "scheduled" => Status::Scheduled,
            "running" => Status::Running,
            "pass" => Status::Pass,
            _ => return None,
        })
    }

    pub fn as_str_code(self) -> &'static str {
        match self {
            Status::Unreachable => "unreachable",
            Status::Abandoned => "abandoned",
            Status::Error => "error",
            Status::Fail => "fail",
            Status::Unknown => "unknown",
            Status::Pending => "pending",
            Status::Scheduled => "scheduled",
            Status::Running => "running",
            Status::Pass => "pass",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_code())
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// AND-combination: the weakest (lowest-ranked) of the inputs, identity
/// `Pass`. Used when a vertex's status must hold only if every
/// predecessor's status holds (e.g. a proof depends on all of the
/// entities it asserts).
pub fn status_and(statuses: impl IntoIterator<Item = Status>) -> Status {
    statuses.into_iter().min().unwrap_or(Status::Pass)
}

/// OR-combination: the strongest (highest-ranked) of the inputs, identity
/// `Unreachable`. Used when a vertex's status is driven by whichever
/// predecessor has progressed furthest (e.g. a cross vertex copying the
/// best status seen so far).
pub fn status_or(statuses: impl IntoIterator<Item = Status>) -> Status {
    statuses.into_iter().max().unwrap_or(Status::Unreachable)
}

/// Fail-dominant OR: like [`status_or`], but any `Fail` among the inputs
/// wins outright even over `Pass`/`Running`/etc. This is the reduction
/// used to collapse several solvers' results for the same entity into a
/// single status: one solver disproving the property is conclusive
/// regardless of what the others report.
pub fn status_or_equivalent(statuses: impl IntoIterator<Item = Status>) -> Status {
    let mut best = Status::Unreachable;
    let mut saw_fail = false;
    for s in statuses {
        if s == Status::Fail {
            saw_fail = true;
        }
        if s > best {
            best = s;
        }
    }
    if saw_fail {
        Status::Fail
    } else {
        best
    }
}
