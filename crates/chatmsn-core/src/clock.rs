//! Wall-clock stamps and online durations used in chat notices.

use chrono::{DateTime, Local, NaiveTime, TimeDelta, Timelike};
use std::fmt;

/// Local time of day, rendered as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    /// Current local time.
    pub fn now() -> Self {
        Self::from(Local::now())
    }

    /// Builds a clock time from hour, minute and second.
    ///
    /// Returns `None` when any component is out of range.
    pub fn from_hms(hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, min, sec).map(Self)
    }
}

impl From<DateTime<Local>> for ClockTime {
    fn from(at: DateTime<Local>) -> Self {
        // Sub-second precision never reaches the wire.
        let time = at.time();
        Self(time.with_nanosecond(0).unwrap_or(time))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// How long a session stayed in the chat.
///
/// Rendered as whole minutes plus the remaining whole seconds,
/// e.g. `2 min 5 s`. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OnlineDuration {
    total_secs: u64,
}

impl OnlineDuration {
    /// Duration between `since` and `until`, clamped at zero when the
    /// clock went backwards.
    pub fn between(since: DateTime<Local>, until: DateTime<Local>) -> Self {
        Self::from(until.signed_duration_since(since))
    }

    /// Duration from `since` to now.
    pub fn since(since: DateTime<Local>) -> Self {
        Self::between(since, Local::now())
    }

    pub fn from_secs(total_secs: u64) -> Self {
        Self { total_secs }
    }

    pub fn minutes(&self) -> u64 {
        self.total_secs / 60
    }

    pub fn seconds(&self) -> u64 {
        self.total_secs % 60
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }
}

impl From<TimeDelta> for OnlineDuration {
    fn from(delta: TimeDelta) -> Self {
        let secs = delta.num_seconds();
        Self {
            total_secs: u64::try_from(secs).unwrap_or(0),
        }
    }
}

impl fmt::Display for OnlineDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min {} s", self.minutes(), self.seconds())
    }
}
