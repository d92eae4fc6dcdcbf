//! Work-session state machine.
//!
//! A work session is a timed focus or break interval. It starts `running`,
//! may bounce between `running` and `paused` any number of times, and ends
//! in exactly one of the terminal states `completed` or `interrupted`.
//!
//! ```text
//!            pause()              finish()
//!  running ---------> paused  ----------------+
//!     ^                 |                     v
//!     +---- resume() ---+        completed | interrupted
//!     |                                       ^
//!     +------------------ finish() -----------+
//! ```
//!
//! All transitions take `now` from the caller; nothing here reads the clock.
//! On error the state is left untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Timestamp;

// ---------------------------------------------------------------------------
// Status and type enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Interrupted,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Running,
        SessionStatus::Paused,
        SessionStatus::Completed,
        SessionStatus::Interrupted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Interrupted => "interrupted",
        }
    }

    /// `completed` and `interrupted` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Interrupted)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Internal(format!("Unknown session status '{s}'")))
    }
}

/// What kind of interval the session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub const ALL: [SessionType; 3] = [
        SessionType::Pomodoro,
        SessionType::ShortBreak,
        SessionType::LongBreak,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Pomodoro => "pomodoro",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Internal(format!("Unknown session type '{s}'")))
    }
}

/// The two ways a session can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishOutcome {
    Completed,
    Interrupted,
}

impl From<FinishOutcome> for SessionStatus {
    fn from(outcome: FinishOutcome) -> Self {
        match outcome {
            FinishOutcome::Completed => SessionStatus::Completed,
            FinishOutcome::Interrupted => SessionStatus::Interrupted,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The mutable timing fields of a work session.
///
/// Invariants maintained by every transition:
/// - `paused_at.is_some()` iff `status == Paused`
/// - `total_paused_seconds` never decreases
/// - `end_time.is_some()` iff `status.is_terminal()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    /// Declared length in minutes; replaced by the actual length on finish.
    pub duration_minutes: Option<i32>,
    pub total_paused_seconds: i64,
    pub paused_at: Option<Timestamp>,
}

impl SessionState {
    /// A freshly created session, running from `now`.
    pub fn start(now: Timestamp, duration_minutes: Option<i32>) -> Self {
        Self {
            status: SessionStatus::Running,
            start_time: now,
            end_time: None,
            duration_minutes,
            total_paused_seconds: 0,
            paused_at: None,
        }
    }

    /// `running -> paused`.
    pub fn pause(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.status != SessionStatus::Running {
            return Err(CoreError::InvalidState(format!(
                "Only running sessions can be paused (current status: {})",
                self.status
            )));
        }
        self.status = SessionStatus::Paused;
        self.paused_at = Some(now);
        Ok(())
    }

    /// `paused -> running`. Returns the number of seconds added to
    /// `total_paused_seconds`.
    pub fn resume(&mut self, now: Timestamp) -> Result<i64, CoreError> {
        let paused_at = match (self.status, self.paused_at) {
            (SessionStatus::Paused, Some(at)) => at,
            _ => {
                return Err(CoreError::InvalidState(format!(
                    "Only paused sessions can be resumed (current status: {})",
                    self.status
                )))
            }
        };
        let added = pause_gap_seconds(paused_at, now);
        self.total_paused_seconds += added;
        self.paused_at = None;
        self.status = SessionStatus::Running;
        Ok(added)
    }

    /// `running | paused -> completed | interrupted`.
    ///
    /// `end_time` defaults to `now`. The stored duration becomes `duration`
    /// when given, otherwise it is derived from `end_time - start_time`.
    /// An open pause is closed at `end_time` so `paused_at` stays cleared on
    /// every terminal row.
    pub fn finish(
        &mut self,
        outcome: FinishOutcome,
        end_time: Option<Timestamp>,
        duration: Option<i32>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "Session is already {}",
                self.status
            )));
        }
        let end = end_time.unwrap_or(now);

        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_seconds += pause_gap_seconds(paused_at, end);
        }
        self.status = outcome.into();
        self.end_time = Some(end);
        self.duration_minutes =
            Some(duration.unwrap_or_else(|| derived_duration_minutes(self.start_time, end)));
        Ok(())
    }

    /// Seconds of active (unpaused) time at `now`. For display only.
    ///
    /// Terminal sessions are measured up to their end time.
    pub fn elapsed_active_seconds(&self, now: Timestamp) -> i64 {
        let until = self.end_time.unwrap_or(now);
        let wall = (until - self.start_time).num_seconds();
        let open_pause = self
            .paused_at
            .map(|at| pause_gap_seconds(at, until))
            .unwrap_or(0);
        (wall - self.total_paused_seconds - open_pause).max(0)
    }
}

/// Whole seconds between a pause and its end, floored and clamped at zero
/// to tolerate clock skew.
fn pause_gap_seconds(paused_at: Timestamp, until: Timestamp) -> i64 {
    (until - paused_at).num_seconds().max(0)
}

/// Wall-clock minutes between start and end, floored, never negative.
///
/// Paused time is not subtracted.
pub fn derived_duration_minutes(start: Timestamp, end: Timestamp) -> i32 {
    let minutes = (end - start).num_minutes().max(0);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
