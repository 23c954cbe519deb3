use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(LocationId);

impl LocationId {
    /// San Francisco Enrollment Center.
    pub const DEFAULT: LocationId = LocationId(5446);
}

impl Default for LocationId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const SLOT_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// One available appointment as returned by the scheduler API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub location_id: LocationId,
    /// Local wall-clock start, e.g. `2023-12-19T10:30`.
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub active: bool,
    /// Minutes.
    pub duration: u32,
    pub remote_ind: bool,
}

impl Slot {
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        parse_slot_timestamp(&self.start_timestamp)
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        parse_slot_timestamp(&self.end_timestamp)
    }
}

fn parse_slot_timestamp(raw: &str) -> Option<NaiveDateTime> {
    SLOT_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw.trim(), format).ok())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "locationId": 5446,
            "startTimestamp": "2024-01-15T10:30",
            "endTimestamp": "2024-01-15T10:45",
            "active": true,
            "duration": 15,
            "remoteInd": false
        }"#
    }

    #[test]
    fn decodes_scheduler_slot_record() {
        let slot: Slot = serde_json::from_str(sample_json()).expect("slot");
        assert_eq!(slot.location_id, LocationId(5446));
        assert_eq!(slot.duration, 15);
        assert!(slot.active);
        assert!(!slot.remote_ind);
    }

    #[test]
    fn parses_minute_precision_timestamps() {
        let slot: Slot = serde_json::from_str(sample_json()).expect("slot");
        let start = slot.start_time().expect("start");
        assert_eq!(
            start.date(),
            NaiveDate::from_ymd_opt(2024, 1, 15).expect("date")
        );
        assert_eq!((start.hour(), start.minute()), (10, 30));
        assert_eq!(slot.end_time().expect("end").minute(), 45);
    }

    #[test]
    fn accepts_second_precision_and_rejects_garbage() {
        assert!(parse_slot_timestamp("2024-01-15T10:30:00").is_some());
        assert!(parse_slot_timestamp("tomorrow").is_none());
    }

    #[test]
    fn default_location_is_san_francisco() {
        assert_eq!(LocationId::default(), LocationId(5446));
        assert_eq!(LocationId::DEFAULT.to_string(), "5446");
    }
}
