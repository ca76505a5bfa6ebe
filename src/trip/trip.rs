use crate::leg::{FlightLeg, LegStatus, MismatchSeverity};
use crate::logpage::Logpage;
use crate::time::ClockTime;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;

pub type TripId = Arc<str>;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripType {
    #[default]
    Operating,
    Deadhead,
    Simulator,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripStatus {
    #[default]
    Planning,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PilotRole {
    #[default]
    Captain,
    FirstOfficer,
    Solo,
    Jumpseater,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ScheduleStatus {
    OnSchedule,
    Ahead,
    Behind,
}

/// The aggregate root of the logbook model. Logpages are the sole owner of
/// legs; every flat-index operation translates through the logpage
/// partition, and the flattened order (logpage order, then in-page order) is
/// authoritative for "next leg" decisions.
///
/// Persisted through `TripRecord`, which carries both the logpages
/// representation and the legacy flat legs + tat_start projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TripRecord", into = "TripRecord")]
pub struct Trip {
    pub id: TripId,
    pub trip_number: String,
    pub aircraft: String,
    pub date: NaiveDate,
    pub crew: Vec<String>,
    pub notes: String,
    pub trip_type: TripType,
    pub deadhead_airline: Option<String>,
    pub deadhead_flight_number: Option<String>,
    logpages: Vec<Logpage>,
    pub status: TripStatus,
    pub role: PilotRole,
    pub receipt_count: u32,
    pub logbook_page_sent: bool,
    pub per_diem_start: Option<NaiveDateTime>,
    pub per_diem_end: Option<NaiveDateTime>,
    pub simulator_minutes: Option<i64>,
    pub roster_trip_id: Option<String>,
    pub duty_start_time: Option<NaiveDateTime>,
    pub duty_end_time: Option<NaiveDateTime>,
}

impl Trip {
    const PRE_DUTY_BUFFER_MIN: i64 = 60;
    const POST_DUTY_BUFFER_MIN: i64 = 15;
    const ON_SCHEDULE_BAND_MIN: i64 = 5;

    pub fn new(
        id: &str,
        trip_number: &str,
        aircraft: &str,
        date: NaiveDate,
        tat_start: &str,
    ) -> Trip {
        Trip {
            id: Arc::from(id),
            trip_number: trip_number.to_string(),
            aircraft: aircraft.to_string(),
            date,
            crew: Vec::new(),
            notes: String::new(),
            trip_type: TripType::Operating,
            deadhead_airline: None,
            deadhead_flight_number: None,
            logpages: vec![Logpage::new(1, tat_start)],
            status: TripStatus::Planning,
            role: PilotRole::Captain,
            receipt_count: 0,
            logbook_page_sent: false,
            per_diem_start: None,
            per_diem_end: None,
            simulator_minutes: None,
            roster_trip_id: None,
            duty_start_time: None,
            duty_end_time: None,
        }
    }

    pub fn load_all(path: &str) -> io::Result<Vec<Trip>> {
        let data = std::fs::read_to_string(path)?;
        let trips: Vec<Trip> = serde_json::from_str(&data)?;
        Ok(trips)
    }

    pub fn save_all(path: &str, trips: &[Trip]) -> io::Result<()> {
        let data = serde_json::to_string_pretty(trips)?;
        std::fs::write(path, data)
    }

    // ---- flattening & indexing ----

    pub fn legs(&self) -> impl Iterator<Item = &FlightLeg> {
        self.logpages.iter().flat_map(|p| p.legs.iter())
    }

    pub fn leg_count(&self) -> usize {
        self.logpages.iter().map(|p| p.legs.len()).sum()
    }

    pub fn leg(&self, flat_index: usize) -> Option<&FlightLeg> {
        let (page, leg) = self.locate(flat_index)?;
        Some(&self.logpages[page].legs[leg])
    }

    pub fn leg_mut(&mut self, flat_index: usize) -> Option<&mut FlightLeg> {
        let (page, leg) = self.locate(flat_index)?;
        Some(&mut self.logpages[page].legs[leg])
    }

    // flat position -> (logpage index, in-page index); None past the end
    fn locate(&self, flat_index: usize) -> Option<(usize, usize)> {
        let mut remaining = flat_index;
        for (page_idx, page) in self.logpages.iter().enumerate() {
            if remaining < page.legs.len() {
                return Some((page_idx, remaining));
            }
            remaining -= page.legs.len();
        }
        None
    }

    // ---- logpages ----

    pub fn logpages(&self) -> &[Logpage] {
        &self.logpages
    }

    pub fn has_multiple_logpages(&self) -> bool {
        self.logpages.len() > 1
    }

    pub fn active_logpage(&self) -> Option<&Logpage> {
        self.logpages.last()
    }

    pub fn active_logpage_mut(&mut self) -> Option<&mut Logpage> {
        self.logpages.last_mut()
    }

    /// Legs are only ever appended to the last page in sequence.
    pub fn append_leg(&mut self, leg: FlightLeg) {
        if let Some(page) = self.active_logpage_mut() {
            page.legs.push(leg);
        }
    }

    /// Closes out the current logpage with an optional mechanical note and
    /// opens a fresh one. The new TAT start is operator-entered, never
    /// derived from the previous page's TAT final.
    pub fn break_logpage(&mut self, new_tat: &str, mechanical_note: Option<&str>) {
        let next_number = self.logpages.len() as u32 + 1;
        if let Some(page) = self.active_logpage_mut() {
            page.mechanical_note = mechanical_note.map(|n| n.to_string());
        }
        self.logpages.push(Logpage::new(next_number, new_tat));
    }

    // ---- leg lifecycle ----

    /// Run once when a trip's legs are first established: first leg goes
    /// active, the rest stand by. No-op on a legless trip.
    pub fn initialize_leg_statuses(&mut self) {
        if self.leg_count() == 0 {
            return;
        }
        // flat order decides which leg goes active; the leading page may be
        // legless after a break
        let mut flat = 0;
        for page in self.logpages.iter_mut() {
            for leg in page.legs.iter_mut() {
                leg.status = if flat == 0 {
                    LegStatus::Active
                } else {
                    LegStatus::Standby
                };
                flat += 1;
            }
        }
        self.assert_invariants();
    }

    /// Called after any time-field edit on the leg at `flat_index`. Advances
    /// the active pointer only when the edited leg is active and now
    /// complete; otherwise leaves everything untouched, so redundant calls
    /// are harmless.
    pub fn check_and_advance_leg(&mut self, flat_index: usize) {
        let Some(leg) = self.leg(flat_index) else {
            eprintln!("check_and_advance_leg: no leg at flat index {flat_index}");
            return;
        };
        if leg.status == LegStatus::Active && leg.is_complete() {
            self.complete_active_leg(true);
        }
    }

    /// Completes the single active leg, if any, and optionally promotes the
    /// next standby leg.
    pub fn complete_active_leg(&mut self, activate_next: bool) {
        let Some(idx) = self.active_leg_index() else {
            return;
        };
        if let Some(leg) = self.leg_mut(idx) {
            leg.status = LegStatus::Completed;
        }
        if activate_next {
            self.activate_next_standby_leg();
        }
        self.assert_invariants();
    }

    /// Promotes the first standby leg in flattened order. No-op when none
    /// remain; callers read that as "no more legs queued". Also a no-op
    /// while another leg is still active, keeping the single-active
    /// invariant safe under redundant calls. Never creates legs.
    pub fn activate_next_standby_leg(&mut self) {
        if self.active_leg_index().is_some() {
            return;
        }
        let Some(idx) = self.next_standby_leg_index() else {
            return;
        };
        if let Some(leg) = self.leg_mut(idx) {
            leg.status = LegStatus::Active;
        }
        self.assert_invariants();
    }

    /// Forces the leg to skipped regardless of its current state.
    pub fn skip_leg(&mut self, flat_index: usize) {
        match self.leg_mut(flat_index) {
            Some(leg) => leg.status = LegStatus::Skipped,
            None => eprintln!("skip_leg: no leg at flat index {flat_index}"),
        }
        self.assert_invariants();
    }

    /// Direct override escape hatch. The caller owns the single-active
    /// invariant on this path, so no invariant check runs here.
    pub fn update_leg_status(&mut self, flat_index: usize, status: LegStatus) {
        match self.leg_mut(flat_index) {
            Some(leg) => leg.status = status,
            None => eprintln!("update_leg_status: no leg at flat index {flat_index}"),
        }
    }

    pub fn active_leg(&self) -> Option<&FlightLeg> {
        self.legs().find(|l| l.status == LegStatus::Active)
    }

    pub fn active_leg_index(&self) -> Option<usize> {
        self.legs().position(|l| l.status == LegStatus::Active)
    }

    pub fn next_standby_leg(&self) -> Option<&FlightLeg> {
        self.legs().find(|l| l.status == LegStatus::Standby)
    }

    pub fn next_standby_leg_index(&self) -> Option<usize> {
        self.legs().position(|l| l.status == LegStatus::Standby)
    }

    pub fn has_upcoming_legs(&self) -> bool {
        self.legs().any(|l| l.status == LegStatus::Standby)
    }

    pub fn completed_leg_count(&self) -> usize {
        self.legs()
            .filter(|l| l.status == LegStatus::Completed)
            .count()
    }

    pub fn remaining_leg_count(&self) -> usize {
        self.legs()
            .filter(|l| matches!(l.status, LegStatus::Active | LegStatus::Standby))
            .count()
    }

    pub fn skipped_leg_count(&self) -> usize {
        self.legs()
            .filter(|l| l.status == LegStatus::Skipped)
            .count()
    }

    pub fn leg_progress(&self) -> f64 {
        let total = self.leg_count();
        if total == 0 {
            return 0.0;
        }
        self.completed_leg_count() as f64 / total as f64
    }

    fn assert_invariants(&self) {
        let active = self
            .legs()
            .filter(|l| l.status == LegStatus::Active)
            .count();
        debug_assert!(active <= 1, "more than one active leg");

        // ignoring skipped legs, the flat order must read completed*,
        // active?, standby*
        let statuses: Vec<LegStatus> = self
            .legs()
            .map(|l| l.status)
            .filter(|s| *s != LegStatus::Skipped)
            .collect();
        let first_open = statuses
            .iter()
            .position(|s| *s != LegStatus::Completed)
            .unwrap_or(statuses.len());
        debug_assert!(
            statuses[first_open..]
                .iter()
                .all(|s| *s != LegStatus::Completed),
            "completed leg after an open leg"
        );
        debug_assert!(
            statuses[first_open..]
                .iter()
                .skip(1)
                .all(|s| *s == LegStatus::Standby),
            "active leg after a standby leg"
        );
    }

    // ---- duty time ----

    fn first_leg_out(&self) -> Option<ClockTime> {
        self.legs().next().and_then(|l| l.out_clock())
    }

    fn last_leg_in(&self) -> Option<ClockTime> {
        self.legs().last().and_then(|l| l.in_clock())
    }

    /// Heuristic for legs spanning midnight: an afternoon/evening first OUT
    /// paired with an early-morning last IN means the trip lands the next
    /// calendar day. Raw "HHmm" strings carry no date of their own.
    pub fn is_overnight(&self) -> bool {
        let (Some(first_out), Some(last_in)) = (self.first_leg_out(), self.last_leg_in()) else {
            return false;
        };
        first_out.hour >= 12 && last_in.hour < 12
    }

    pub fn effective_duty_start(&self) -> Option<NaiveDateTime> {
        if let Some(start) = self.duty_start_time {
            return Some(start);
        }
        let out = self.first_leg_out()?;
        let report = self.date.and_hms_opt(out.hour as u32, out.minute as u32, 0)?;
        Some(report - Duration::minutes(Self::PRE_DUTY_BUFFER_MIN))
    }

    /// Stored overrides are honored except on overnight trips, where the
    /// override is distrusted and always recomputed: persisted values from
    /// before the overnight-detection fix may carry the wrong date. Known
    /// wrinkle, kept on purpose.
    pub fn effective_duty_end(&self) -> Option<NaiveDateTime> {
        if !self.is_overnight() {
            if let Some(end) = self.duty_end_time {
                return Some(end);
            }
        }
        self.computed_duty_end()
    }

    fn computed_duty_end(&self) -> Option<NaiveDateTime> {
        let last = self.legs().last()?;
        let in_clock = last.in_clock()?;
        let base_date = match last.flight_date {
            Some(date) => date,
            None if self.is_overnight() => self.date.succ_opt()?,
            None => self.date,
        };
        let release = base_date.and_hms_opt(in_clock.hour as u32, in_clock.minute as u32, 0)?;
        Some(release + Duration::minutes(Self::POST_DUTY_BUFFER_MIN))
    }

    pub fn total_duty_hours(&self) -> f64 {
        let (Some(start), Some(end)) = (self.effective_duty_start(), self.effective_duty_end())
        else {
            return 0.0;
        };
        (end - start).num_minutes().max(0) as f64 / 60.0
    }

    // ---- schedule variance ----

    pub fn total_block_minutes(&self) -> i64 {
        self.legs().filter_map(|l| l.block_minutes()).sum()
    }

    pub fn total_flight_minutes(&self) -> i64 {
        self.legs().filter_map(|l| l.flight_minutes()).sum()
    }

    pub fn total_scheduled_block_minutes(&self) -> Option<i64> {
        let mut any = false;
        let total: i64 = self
            .legs()
            .filter_map(|l| l.scheduled_block_minutes)
            .inspect(|_| any = true)
            .sum();
        any.then_some(total)
    }

    pub fn total_block_time_variance_minutes(&self) -> Option<i64> {
        let scheduled = self.total_scheduled_block_minutes()?;
        let actual = self.total_block_minutes();
        if actual == 0 {
            return None;
        }
        Some(actual - scheduled)
    }

    /// Sum of each completed leg's actual-vs-scheduled IN delta. Legs still
    /// in progress do not count.
    pub fn overall_schedule_variance(&self) -> Option<i64> {
        let mut any = false;
        let total: i64 = self
            .legs()
            .filter(|l| l.status == LegStatus::Completed)
            .filter_map(|l| l.in_time_variance_minutes())
            .inspect(|_| any = true)
            .sum();
        any.then_some(total)
    }

    /// Three-way band around zero: GPS and roster timestamps are noisy, so
    /// anything within five minutes counts as on schedule.
    pub fn overall_schedule_status(&self) -> Option<ScheduleStatus> {
        let variance = self.overall_schedule_variance()?;
        Some(if variance.abs() <= Self::ON_SCHEDULE_BAND_MIN {
            ScheduleStatus::OnSchedule
        } else if variance < 0 {
            ScheduleStatus::Ahead
        } else {
            ScheduleStatus::Behind
        })
    }

    pub fn schedule_status_info(&self) -> Option<(ScheduleStatus, String)> {
        let variance = self.overall_schedule_variance()?;
        let status = self.overall_schedule_status()?;
        let text = match status {
            ScheduleStatus::OnSchedule => "on schedule".to_string(),
            ScheduleStatus::Ahead => format!("{}m ahead", variance.abs()),
            ScheduleStatus::Behind => format!("{}m behind", variance),
        };
        Some((status, text))
    }

    pub fn has_block_time_mismatch(&self) -> bool {
        self.legs()
            .any(|l| l.block_time_mismatch() != MismatchSeverity::None)
    }

    pub fn worst_mismatch_severity(&self) -> MismatchSeverity {
        self.legs()
            .map(|l| l.block_time_mismatch())
            .max()
            .unwrap_or(MismatchSeverity::None)
    }
}

/// Wire form of a trip. Carries both the current logpages representation and
/// the legacy flat legs + single tat_start projection; on save both are
/// written (the flat view derived from logpages, never drifting), on load
/// logpages win when present and non-empty.
#[derive(Serialize, Deserialize)]
struct TripRecord {
    id: TripId,
    #[serde(default)]
    trip_number: String,
    #[serde(default)]
    aircraft: String,
    date: NaiveDate,
    #[serde(default)]
    crew: Vec<String>,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    trip_type: TripType,
    #[serde(default)]
    deadhead_airline: Option<String>,
    #[serde(default)]
    deadhead_flight_number: Option<String>,
    #[serde(default)]
    logpages: Vec<Logpage>,
    #[serde(default)]
    legs: Vec<FlightLeg>,
    #[serde(default)]
    tat_start: Option<String>,
    #[serde(default)]
    status: TripStatus,
    #[serde(default)]
    role: PilotRole,
    #[serde(default)]
    receipt_count: u32,
    #[serde(default)]
    logbook_page_sent: bool,
    #[serde(default)]
    per_diem_start: Option<NaiveDateTime>,
    #[serde(default)]
    per_diem_end: Option<NaiveDateTime>,
    #[serde(default)]
    simulator_minutes: Option<i64>,
    #[serde(default)]
    roster_trip_id: Option<String>,
    #[serde(default)]
    duty_start_time: Option<NaiveDateTime>,
    #[serde(default)]
    duty_end_time: Option<NaiveDateTime>,
}

impl From<TripRecord> for Trip {
    fn from(rec: TripRecord) -> Trip {
        let logpages = if !rec.logpages.is_empty() {
            rec.logpages
        } else if !rec.legs.is_empty() {
            // legacy flat payload: adopt all legs as one implicit page
            let mut page = Logpage::new(1, rec.tat_start.as_deref().unwrap_or(""));
            page.legs = rec.legs;
            vec![page]
        } else {
            // legs live in an external record store; start empty, pending
            // population
            vec![Logpage::new(1, rec.tat_start.as_deref().unwrap_or(""))]
        };
        Trip {
            id: rec.id,
            trip_number: rec.trip_number,
            aircraft: rec.aircraft,
            date: rec.date,
            crew: rec.crew,
            notes: rec.notes,
            trip_type: rec.trip_type,
            deadhead_airline: rec.deadhead_airline,
            deadhead_flight_number: rec.deadhead_flight_number,
            logpages,
            status: rec.status,
            role: rec.role,
            receipt_count: rec.receipt_count,
            logbook_page_sent: rec.logbook_page_sent,
            per_diem_start: rec.per_diem_start,
            per_diem_end: rec.per_diem_end,
            simulator_minutes: rec.simulator_minutes,
            roster_trip_id: rec.roster_trip_id,
            duty_start_time: rec.duty_start_time,
            duty_end_time: rec.duty_end_time,
        }
    }
}

impl From<Trip> for TripRecord {
    fn from(trip: Trip) -> TripRecord {
        let legs = trip.legs().cloned().collect();
        let tat_start = trip.logpages.first().map(|p| p.tat_start.clone());
        TripRecord {
            id: trip.id,
            trip_number: trip.trip_number,
            aircraft: trip.aircraft,
            date: trip.date,
            crew: trip.crew,
            notes: trip.notes,
            trip_type: trip.trip_type,
            deadhead_airline: trip.deadhead_airline,
            deadhead_flight_number: trip.deadhead_flight_number,
            logpages: trip.logpages,
            legs,
            tat_start,
            status: trip.status,
            role: trip.role,
            receipt_count: trip.receipt_count,
            logbook_page_sent: trip.logbook_page_sent,
            per_diem_start: trip.per_diem_start,
            per_diem_end: trip.per_diem_end,
            simulator_minutes: trip.simulator_minutes,
            roster_trip_id: trip.roster_trip_id,
            duty_start_time: trip.duty_start_time,
            duty_end_time: trip.duty_end_time,
        }
    }
}
