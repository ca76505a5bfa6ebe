use crate::time::{ClockTime, elapsed_minutes, signed_delta_minutes};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LegStatus {
    #[default]
    Standby,
    Active,
    Completed,
    Skipped,
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LegStatus::Standby => "standby",
            LegStatus::Active => "active",
            LegStatus::Completed => "completed",
            LegStatus::Skipped => "skipped",
        };
        write!(f, "{}", label)
    }
}

/// How far a leg's flown block time strayed from the roster's figure.
#[derive(Debug, Clone, Copy, Default, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MismatchSeverity {
    #[default]
    None,
    Minor,
    Moderate,
    Significant,
}

/// One flown or planned segment. Raw times are "HHmm" strings with the empty
/// string meaning "not yet recorded"; the scheduled_* fields come from the
/// roster feed and are never written by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightLeg {
    pub departure: String,
    pub arrival: String,
    #[serde(default)]
    pub out_time: String,
    #[serde(default)]
    pub off_time: String,
    #[serde(default)]
    pub on_time: String,
    #[serde(default)]
    pub in_time: String,
    #[serde(default)]
    pub ground_ops_only: bool,
    #[serde(default)]
    pub deadhead: bool,
    #[serde(default)]
    pub deadhead_out: String,
    #[serde(default)]
    pub deadhead_in: String,
    #[serde(default)]
    pub deadhead_hours: f64,
    #[serde(default)]
    pub status: LegStatus,
    #[serde(default)]
    pub scheduled_out: Option<String>,
    #[serde(default)]
    pub scheduled_in: Option<String>,
    #[serde(default)]
    pub scheduled_block_minutes: Option<i64>,
    #[serde(default)]
    pub flight_date: Option<NaiveDate>,
    #[serde(default)]
    pub roster_source_id: Option<String>,
}

impl FlightLeg {
    // mismatch bands against the roster's block figure, in minutes
    const MISMATCH_MINOR_MIN: i64 = 5;
    const MISMATCH_MODERATE_MIN: i64 = 15;
    const MISMATCH_SIGNIFICANT_MIN: i64 = 30;

    pub fn new(departure: &str, arrival: &str) -> FlightLeg {
        FlightLeg {
            departure: departure.to_string(),
            arrival: arrival.to_string(),
            out_time: String::new(),
            off_time: String::new(),
            on_time: String::new(),
            in_time: String::new(),
            ground_ops_only: false,
            deadhead: false,
            deadhead_out: String::new(),
            deadhead_in: String::new(),
            deadhead_hours: 0.0,
            status: LegStatus::Standby,
            scheduled_out: None,
            scheduled_in: None,
            scheduled_block_minutes: None,
            flight_date: None,
            roster_source_id: None,
        }
    }

    pub fn out_clock(&self) -> Option<ClockTime> {
        ClockTime::parse(&self.out_time)
    }

    pub fn off_clock(&self) -> Option<ClockTime> {
        ClockTime::parse(&self.off_time)
    }

    pub fn on_clock(&self) -> Option<ClockTime> {
        ClockTime::parse(&self.on_time)
    }

    pub fn in_clock(&self) -> Option<ClockTime> {
        ClockTime::parse(&self.in_time)
    }

    pub fn scheduled_in_clock(&self) -> Option<ClockTime> {
        ClockTime::parse(self.scheduled_in.as_deref()?)
    }

    /// Completion rules by leg type: ground-ops needs OUT and IN, deadhead
    /// needs both deadhead times or logged hours, a regular leg needs all
    /// four of OUT/OFF/ON/IN. Partial times never count as complete.
    pub fn is_complete(&self) -> bool {
        if self.ground_ops_only {
            return !self.out_time.trim().is_empty() && !self.in_time.trim().is_empty();
        }
        if self.deadhead {
            return (!self.deadhead_out.trim().is_empty() && !self.deadhead_in.trim().is_empty())
                || self.deadhead_hours > 0.0;
        }
        [&self.out_time, &self.off_time, &self.on_time, &self.in_time]
            .iter()
            .all(|t| !t.trim().is_empty())
    }

    // OUT to IN, gate to gate
    pub fn block_minutes(&self) -> Option<i64> {
        Some(elapsed_minutes(self.out_clock()?, self.in_clock()?))
    }

    // OFF to ON, wheels up to wheels down
    pub fn flight_minutes(&self) -> Option<i64> {
        Some(elapsed_minutes(self.off_clock()?, self.on_clock()?))
    }

    pub fn in_time_variance_minutes(&self) -> Option<i64> {
        Some(signed_delta_minutes(
            self.in_clock()?,
            self.scheduled_in_clock()?,
        ))
    }

    pub fn block_time_mismatch(&self) -> MismatchSeverity {
        let (Some(actual), Some(scheduled)) = (self.block_minutes(), self.scheduled_block_minutes)
        else {
            return MismatchSeverity::None;
        };
        let diff = (actual - scheduled).abs();
        if diff <= Self::MISMATCH_MINOR_MIN {
            MismatchSeverity::None
        } else if diff <= Self::MISMATCH_MODERATE_MIN {
            MismatchSeverity::Minor
        } else if diff <= Self::MISMATCH_SIGNIFICANT_MIN {
            MismatchSeverity::Moderate
        } else {
            MismatchSeverity::Significant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_leg_needs_all_four_times() {
        let mut leg = FlightLeg::new("DEN", "ORD");
        leg.out_time = "0800".to_string();
        leg.off_time = "0815".to_string();
        leg.in_time = "0900".to_string();
        assert!(!leg.is_complete());

        leg.on_time = "0850".to_string();
        assert!(leg.is_complete());
    }

    #[test]
    fn test_ground_ops_leg_needs_out_and_in() {
        let mut leg = FlightLeg::new("DEN", "DEN");
        leg.ground_ops_only = true;
        leg.out_time = "0800".to_string();
        assert!(!leg.is_complete());

        leg.in_time = "0820".to_string();
        assert!(leg.is_complete());
    }

    #[test]
    fn test_deadhead_leg_times_or_hours() {
        let mut leg = FlightLeg::new("ORD", "EWR");
        leg.deadhead = true;
        assert!(!leg.is_complete());

        leg.deadhead_hours = 2.5;
        assert!(leg.is_complete());

        leg.deadhead_hours = 0.0;
        leg.deadhead_out = "1100".to_string();
        assert!(!leg.is_complete());
        leg.deadhead_in = "1330".to_string();
        assert!(leg.is_complete());
    }

    #[test]
    fn test_block_and_flight_minutes() {
        let mut leg = FlightLeg::new("DEN", "ORD");
        leg.out_time = "0655".to_string();
        leg.off_time = "0708".to_string();
        leg.on_time = "0910".to_string();
        leg.in_time = "0919".to_string();
        assert_eq!(Some(144), leg.block_minutes());
        assert_eq!(Some(122), leg.flight_minutes());
    }

    #[test]
    fn test_block_minutes_absent_without_times() {
        let leg = FlightLeg::new("DEN", "ORD");
        assert_eq!(None, leg.block_minutes());
        assert_eq!(None, leg.flight_minutes());
    }

    #[test]
    fn test_mismatch_bands() {
        let mut leg = FlightLeg::new("DEN", "ORD");
        leg.out_time = "0700".to_string();
        leg.in_time = "0900".to_string();

        leg.scheduled_block_minutes = Some(118);
        assert_eq!(MismatchSeverity::None, leg.block_time_mismatch());

        leg.scheduled_block_minutes = Some(110);
        assert_eq!(MismatchSeverity::Minor, leg.block_time_mismatch());

        leg.scheduled_block_minutes = Some(95);
        assert_eq!(MismatchSeverity::Moderate, leg.block_time_mismatch());

        leg.scheduled_block_minutes = Some(60);
        assert_eq!(MismatchSeverity::Significant, leg.block_time_mismatch());
    }

    #[test]
    fn test_mismatch_absent_without_roster_data() {
        let mut leg = FlightLeg::new("DEN", "ORD");
        leg.out_time = "0700".to_string();
        leg.in_time = "0900".to_string();
        assert_eq!(MismatchSeverity::None, leg.block_time_mismatch());
    }
}
