use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Pending,
    Confirmed,
    Declined,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Pending => "PENDING",
            ShiftStatus::Confirmed => "CONFIRMED",
            ShiftStatus::Declined => "DECLINED",
        }
    }

    /// Whether a record may move from `self` to `target`.
    /// Only pending shifts are decided, and only into a decided state.
    pub fn can_transition_to(&self, target: ShiftStatus) -> bool {
        *self == ShiftStatus::Pending && target != ShiftStatus::Pending
    }
}

impl std::fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShiftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ShiftStatus::Pending),
            "CONFIRMED" => Ok(ShiftStatus::Confirmed),
            "DECLINED" => Ok(ShiftStatus::Declined),
            other => Err(format!("unknown shift status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "EN")]
    En,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::St => "ST",
            Role::En => "EN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ST" => Ok(Role::St),
            "EN" => Ok(Role::En),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// One caregiver shift as stored in the shift file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ShiftRecord {
    pub id: String,
    pub caregiver_name: String,
    pub role: Role,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ShiftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl ShiftRecord {
    pub fn is_pending(&self) -> bool {
        self.status == ShiftStatus::Pending
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// UTC calendar date of the shift start, as `YYYY-MM-DD`.
    pub fn start_date(&self) -> String {
        self.start_time.format("%Y-%m-%d").to_string()
    }

    /// Stamp a decided status onto the record. Callers check the transition first.
    pub(crate) fn apply_status(&mut self, status: ShiftStatus, actor: &str, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        self.updated_by = Some(actor.to_string());
    }
}

/// A filtered, sorted view of the collection plus its counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ShiftPage {
    pub data: Vec<ShiftRecord>,
    pub total: usize,
    pub filtered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ShiftRecord {
        serde_json::from_str(
            r#"{
                "id": "shift_001",
                "caregiver_name": "Alice Johnson",
                "role": "ST",
                "start_time": "2024-03-01T08:00:00Z",
                "end_time": "2024-03-01T16:00:00Z",
                "status": "PENDING",
                "created_at": "2024-02-20T10:00:00Z",
                "updated_at": "2024-02-20T10:00:00Z"
            }"#,
        )
        .expect("Failed to parse shift test JSON")
    }

    #[test]
    fn test_parse_shift_record() {
        let shift = sample();
        assert_eq!(shift.role, Role::St);
        assert_eq!(shift.status, ShiftStatus::Pending);
        assert!(shift.updated_by.is_none());
        assert_eq!(shift.duration(), Duration::hours(8));
        assert_eq!(shift.start_date(), "2024-03-01");
    }

    #[test]
    fn test_updated_by_omitted_when_absent() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("updated_by"));
    }

    #[test]
    fn test_status_transitions() {
        assert!(ShiftStatus::Pending.can_transition_to(ShiftStatus::Confirmed));
        assert!(ShiftStatus::Pending.can_transition_to(ShiftStatus::Declined));
        assert!(!ShiftStatus::Pending.can_transition_to(ShiftStatus::Pending));
        assert!(!ShiftStatus::Confirmed.can_transition_to(ShiftStatus::Confirmed));
        assert!(!ShiftStatus::Confirmed.can_transition_to(ShiftStatus::Declined));
        assert!(!ShiftStatus::Declined.can_transition_to(ShiftStatus::Confirmed));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("confirmed".parse::<ShiftStatus>(), Ok(ShiftStatus::Confirmed));
        assert_eq!(" DECLINED ".parse::<ShiftStatus>(), Ok(ShiftStatus::Declined));
        assert!("maybe".parse::<ShiftStatus>().is_err());
        assert_eq!("en".parse::<Role>(), Ok(Role::En));
        assert!("RN".parse::<Role>().is_err());
    }

    #[test]
    fn test_apply_status_stamps_actor() {
        let mut shift = sample();
        let now = Utc::now();
        shift.apply_status(ShiftStatus::Confirmed, "admin_7", now);
        assert_eq!(shift.status, ShiftStatus::Confirmed);
        assert_eq!(shift.updated_at, now);
        assert_eq!(shift.updated_by.as_deref(), Some("admin_7"));
    }
}
