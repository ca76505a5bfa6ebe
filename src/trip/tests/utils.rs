use crate::leg::FlightLeg;
use crate::trip::trip::Trip;
use chrono::NaiveDate;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn leg(
    departure: &str,
    arrival: &str,
    out: &str,
    off: &str,
    on: &str,
    in_: &str,
) -> FlightLeg {
    let mut leg = FlightLeg::new(departure, arrival);
    leg.out_time = out.to_string();
    leg.off_time = off.to_string();
    leg.on_time = on.to_string();
    leg.in_time = in_.to_string();
    leg
}

pub fn scheduled_leg(
    departure: &str,
    arrival: &str,
    scheduled_out: &str,
    scheduled_in: &str,
    scheduled_block_minutes: i64,
) -> FlightLeg {
    let mut leg = FlightLeg::new(departure, arrival);
    leg.scheduled_out = Some(scheduled_out.to_string());
    leg.scheduled_in = Some(scheduled_in.to_string());
    leg.scheduled_block_minutes = Some(scheduled_block_minutes);
    leg
}

pub fn bare_trip() -> Trip {
    Trip::new("TRIP_1", "U100", "N123AB", date(2025, 1, 10), "100+00")
}

// trip with statuses initialized: first leg active, the rest standby
pub fn trip_with_legs(legs: Vec<FlightLeg>) -> Trip {
    let mut trip = bare_trip();
    for leg in legs {
        trip.append_leg(leg);
    }
    trip.initialize_leg_statuses();
    trip
}
