use serde::{Deserialize, Serialize};
use std::fmt;

pub const MINUTES_PER_DAY: i64 = 1440;

#[derive(Debug, Clone, Copy, Ord, Eq, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl ClockTime {
    /// Parses a raw "HHmm" wall-clock string. Colons and surrounding
    /// whitespace are stripped first; 4 digits read as HH+MM, 3 digits as
    /// H+MM, 1-2 digits as a bare hour. Out-of-range or non-numeric input
    /// yields None, never an error.
    pub fn parse(raw: &str) -> Option<ClockTime> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ':').collect();
        if cleaned.is_empty() || cleaned.len() > 4 || !cleaned.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let (hour, minute): (u32, u32) = match cleaned.len() {
            4 => (cleaned[..2].parse().ok()?, cleaned[2..].parse().ok()?),
            3 => (cleaned[..1].parse().ok()?, cleaned[1..].parse().ok()?),
            _ => (cleaned.parse().ok()?, 0),
        };
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(ClockTime {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    pub fn minutes_of_day(&self) -> i64 {
        self.hour as i64 * 60 + self.minute as i64
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// elapsed minutes from `from` to `to`, wrapping past midnight
pub fn elapsed_minutes(from: ClockTime, to: ClockTime) -> i64 {
    (to.minutes_of_day() - from.minutes_of_day()).rem_euclid(MINUTES_PER_DAY)
}

// signed actual-minus-scheduled delta, normalized into (-720, 720] so a
// near-midnight pair reads as a small delta rather than most of a day
pub fn signed_delta_minutes(actual: ClockTime, scheduled: ClockTime) -> i64 {
    let mut delta = actual.minutes_of_day() - scheduled.minutes_of_day();
    if delta > MINUTES_PER_DAY / 2 {
        delta -= MINUTES_PER_DAY;
    } else if delta <= -MINUTES_PER_DAY / 2 {
        delta += MINUTES_PER_DAY;
    }
    delta
}

/// Parses a Total Aircraft Time string ("H+MM", e.g. "1234+56") into total
/// minutes. Minutes must be exactly two digits below 60.
pub fn parse_tat(raw: &str) -> Option<i64> {
    let (hours, minutes) = raw.trim().split_once('+')?;
    if minutes.len() != 2 {
        return None;
    }
    let h: u32 = hours.parse().ok()?;
    let m: u32 = minutes.parse().ok()?;
    if m > 59 {
        return None;
    }
    Some(h as i64 * 60 + m as i64)
}

pub fn format_tat(total_minutes: i64) -> String {
    format!("{}+{:02}", total_minutes / 60, total_minutes % 60)
}
