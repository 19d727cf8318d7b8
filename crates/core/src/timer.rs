//! Session clock: countdown for timed exams, stopwatch for untimed practice.

/// Result of delivering one tick to a `SessionTimer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time moved; nothing else happened.
    Running,
    /// This tick brought the countdown to zero. Reported exactly once.
    Expired,
    /// The countdown had already expired; the tick was dropped.
    Ignored,
}

/// One-second resolution clock owned by a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTimer {
    Countdown { duration: u32, remaining: u32 },
    Stopwatch { elapsed: u32 },
}

impl SessionTimer {
    /// Countdown for `duration_seconds`, or a stopwatch when it is zero.
    #[must_use]
    pub fn for_duration(duration_seconds: u32) -> Self {
        if duration_seconds == 0 {
            Self::stopwatch()
        } else {
            Self::Countdown {
                duration: duration_seconds,
                remaining: duration_seconds,
            }
        }
    }

    #[must_use]
    pub fn stopwatch() -> Self {
        Self::Stopwatch { elapsed: 0 }
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        match self {
            Self::Countdown { remaining, .. } => {
                if *remaining == 0 {
                    return TickOutcome::Ignored;
                }
                *remaining -= 1;
                if *remaining == 0 {
                    TickOutcome::Expired
                } else {
                    TickOutcome::Running
                }
            }
            Self::Stopwatch { elapsed } => {
                *elapsed = elapsed.saturating_add(1);
                TickOutcome::Running
            }
        }
    }

    #[must_use]
    pub fn is_countdown(&self) -> bool {
        matches!(self, Self::Countdown { .. })
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Countdown { remaining: 0, .. })
    }

    /// `None` for untimed runs.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        match self {
            Self::Countdown { remaining, .. } => Some(*remaining),
            Self::Stopwatch { .. } => None,
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        match self {
            Self::Countdown {
                duration,
                remaining,
            } => duration - remaining,
            Self::Stopwatch { elapsed } => *elapsed,
        }
    }
}

/// Format seconds as `mm:ss`, or `h:mm:ss` past an hour.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
