use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Role, ShiftStatus};

/// Filter parameters for a shift read.
///
/// Every field is optional; an absent field and a blank one mean the same
/// thing. `normalized()` is the canonical view used for cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct QuerySpec {
    /// Case-insensitive substring of the caregiver name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ShiftStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Inclusive lower bound on the UTC start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the UTC start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
}

/// Date format for `date_from` / `date_to` parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caregiver(mut self, caregiver: impl Into<String>) -> Self {
        self.caregiver = Some(caregiver.into());
        self
    }

    pub fn with_status(mut self, status: ShiftStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Build a spec from loosely typed request parameters (e.g. a URL query).
    ///
    /// Unrecognized names and values that fail to parse are dropped, so a
    /// garbage `status=maybe` behaves exactly like no status filter.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut spec = Self::default();
        for (name, value) in params {
            match name {
                "caregiver" => spec.caregiver = Some(value.to_string()),
                "status" => spec.status = value.parse().ok(),
                "role" => spec.role = value.parse().ok(),
                "date_from" => spec.date_from = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok(),
                "date_to" => spec.date_to = NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok(),
                _ => {}
            }
        }
        spec
    }

    /// The trimmed caregiver filter, or `None` when blank.
    pub fn caregiver_filter(&self) -> Option<&str> {
        self.caregiver
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Present, non-blank fields keyed by name in lexicographic order.
    pub fn normalized(&self) -> BTreeMap<&'static str, String> {
        let mut fields = BTreeMap::new();
        if let Some(caregiver) = self.caregiver_filter() {
            fields.insert("caregiver", caregiver.to_lowercase());
        }
        if let Some(status) = self.status {
            fields.insert("status", status.as_str().to_string());
        }
        if let Some(role) = self.role {
            fields.insert("role", role.as_str().to_string());
        }
        if let Some(from) = self.date_from {
            fields.insert("date_from", from.format(DATE_FORMAT).to_string());
        }
        if let Some(to) = self.date_to {
            fields.insert("date_to", to.format(DATE_FORMAT).to_string());
        }
        fields
    }

    pub fn is_unfiltered(&self) -> bool {
        self.normalized().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_caregiver_is_absent() {
        let blank = QuerySpec::new().with_caregiver("   ");
        assert_eq!(blank.caregiver_filter(), None);
        assert!(blank.is_unfiltered());
        assert_eq!(blank.normalized(), QuerySpec::new().normalized());
    }

    #[test]
    fn test_normalized_trims_and_lowercases_caregiver() {
        let spec = QuerySpec::new().with_caregiver("  Alice ");
        assert_eq!(spec.normalized().get("caregiver").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_from_params_drops_unknown_and_invalid() {
        let spec = QuerySpec::from_params([
            ("caregiver", "bob"),
            ("status", "maybe"),
            ("role", "en"),
            ("date_from", "2024-03-01"),
            ("date_to", "not-a-date"),
            ("page", "2"),
        ]);
        assert_eq!(spec.caregiver.as_deref(), Some("bob"));
        assert_eq!(spec.status, None);
        assert_eq!(spec.role, Some(Role::En));
        assert_eq!(spec.date_from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(spec.date_to, None);
        let names: Vec<_> = spec.normalized().into_keys().collect();
        assert_eq!(names, vec!["caregiver", "date_from", "role"]);
    }
}
