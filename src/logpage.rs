use crate::leg::FlightLeg;
use crate::time::{format_tat, parse_tat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contiguous run of legs sharing one Total Aircraft Time start value.
/// A mechanical break in the aircraft's logbook starts a new page; flight
/// minutes before the break stop counting toward the new page's TAT base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logpage {
    pub page_number: u32,
    pub tat_start: String,
    pub legs: Vec<FlightLeg>,
    #[serde(default)]
    pub mechanical_note: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Logpage {
    pub fn new(page_number: u32, tat_start: &str) -> Logpage {
        Logpage {
            page_number,
            tat_start: tat_start.to_string(),
            legs: Vec::new(),
            mechanical_note: None,
            created_at: Utc::now(),
        }
    }

    pub fn flight_minutes(&self) -> i64 {
        self.legs.iter().filter_map(|l| l.flight_minutes()).sum()
    }

    /// TAT at the bottom of the page: the operator-entered start plus every
    /// flight minute flown on this page. None if the start string is
    /// malformed.
    pub fn tat_final(&self) -> Option<String> {
        parse_tat(&self.tat_start).map(|start| format_tat(start + self.flight_minutes()))
    }
}
