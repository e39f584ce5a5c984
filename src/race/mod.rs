pub mod edit;
pub mod field;

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub use edit::{apply_edit, apply_edits, EditForm, RaceEdit};
pub use field::{FieldParseError, FieldValue, RaceField};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RaceId(pub i64);

impl Display for RaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RaceId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(RaceId)
    }
}

/// Hosted rows may carry `null` for optional columns; read those as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One electoral contest, in the row shape of the hosted `races` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Race {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RaceId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub district: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dem_performance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voter_registration: VoterRegistration,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fundraising: Fundraising,
    #[serde(default, deserialize_with = "null_as_default")]
    pub historical_results: Vec<HistoricalResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RegistrationShare {
    #[serde(default, deserialize_with = "null_as_default")]
    pub dem: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rep: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ind: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RegistrationTrendPoint {
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dem: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rep: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ind: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VoterRegistration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current: RegistrationShare,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trend: Vec<RegistrationTrendPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Fundraising {
    #[serde(default, deserialize_with = "null_as_default")]
    pub individual: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub party: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labor: f64,
    #[serde(default, rename = "issueOrgs", deserialize_with = "null_as_default")]
    pub issue_orgs: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pac: f64,
    /// Derived from the five components; never authoritative on its own.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub historical: Vec<FundraisingTrendPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct FundraisingTrendPoint {
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub individual: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub party: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labor: f64,
    #[serde(default, rename = "issueOrgs", deserialize_with = "null_as_default")]
    pub issue_orgs: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pac: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoricalResult {
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: f64,
}

impl Fundraising {
    pub fn component_sum(&self) -> f64 {
        self.individual + self.party + self.labor + self.issue_orgs + self.pac
    }

    pub fn with_recomputed_total(mut self) -> Self {
        self.total = self.component_sum();
        self
    }
}

impl FundraisingTrendPoint {
    pub fn component_sum(&self) -> f64 {
        self.individual + self.party + self.labor + self.issue_orgs + self.pac
    }
}

impl Race {
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            district: district.into(),
            ..Self::default()
        }
    }

    /// State and district concatenated without a separator, as searched by the list view.
    pub fn search_key(&self) -> String {
        format!("{}{}", self.state, self.district)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.state, self.district)
    }

    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    pub fn historical_results_desc(&self) -> Vec<HistoricalResult> {
        let mut out = self.historical_results.clone();
        out.sort_by(|a, b| b.year.cmp(&a.year));
        out
    }

    pub fn registration_trend_desc(&self) -> Vec<RegistrationTrendPoint> {
        let mut out = self.voter_registration.trend.clone();
        out.sort_by(|a, b| b.year.cmp(&a.year));
        out
    }

    pub fn fundraising_history_desc(&self) -> Vec<FundraisingTrendPoint> {
        let mut out = self.fundraising.historical.clone();
        out.sort_by(|a, b| b.year.cmp(&a.year));
        out
    }

    /// Years that occur more than once in any of the year-keyed arrays.
    pub fn duplicate_years(&self) -> Vec<i32> {
        let mut dupes = BTreeSet::new();
        let mut check = |years: Vec<i32>| {
            let mut seen = BTreeSet::new();
            for year in years {
                if !seen.insert(year) {
                    dupes.insert(year);
                }
            }
        };
        check(self.voter_registration.trend.iter().map(|p| p.year).collect());
        check(self.fundraising.historical.iter().map(|p| p.year).collect());
        check(self.historical_results.iter().map(|p| p.year).collect());
        dupes.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Fundraising, HistoricalResult, Race, RaceId};

    #[test]
    fn null_columns_decode_as_defaults() {
        let row = json!({
            "id": 3,
            "state": "TX",
            "district": "SD-10",
            "dem_performance": null,
            "voter_registration": { "current": null, "trend": null },
            "fundraising": { "labor": 300.0, "pac": null, "historical": null },
            "historical_results": null,
            "notes": null
        });
        let race: Race = serde_json::from_value(row).expect("nullable row should decode");
        assert_eq!(race.id, Some(RaceId(3)));
        assert_eq!(race.dem_performance, 0.0);
        assert!(race.voter_registration.trend.is_empty());
        assert_eq!(race.voter_registration.current.dem, 0.0);
        assert_eq!(race.fundraising.labor, 300.0);
        assert_eq!(race.fundraising.pac, 0.0);
        assert!(race.fundraising.historical.is_empty());
        assert!(race.historical_results.is_empty());
        assert_eq!(race.notes, None);

        let rows: Vec<Race> = serde_json::from_value(json!([
            { "id": 1, "state": "IL", "district": "HD-48", "fundraising": null },
            { "id": 2, "state": "WI", "district": "AD-3", "voter_registration": null }
        ]))
        .expect("list with null objects should decode");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fundraising, Fundraising::default());
    }

    #[test]
    fn deserializes_row_with_missing_fields_as_zero() {
        let row = json!({
            "id": 7,
            "state": "IL",
            "district": "HD-48",
            "fundraising": { "individual": 100.0, "issueOrgs": 25.5 }
        });
        let race: Race = serde_json::from_value(row).expect("row should decode");
        assert_eq!(race.id, Some(RaceId(7)));
        assert_eq!(race.dem_performance, 0.0);
        assert_eq!(race.voter_registration.current.dem, 0.0);
        assert_eq!(race.fundraising.issue_orgs, 25.5);
        assert!(race.historical_results.is_empty());
        assert!(race.notes.is_none());
    }

    #[test]
    fn serializes_issue_orgs_with_wire_name_and_omits_missing_id() {
        let race = Race::new("TX", "SD-10");
        let value = serde_json::to_value(&race).expect("race should encode");
        assert!(value.get("id").is_none());
        assert!(value["fundraising"].get("issueOrgs").is_some());
        assert!(value["fundraising"].get("issue_orgs").is_none());
    }

    #[test]
    fn recomputes_total_from_components() {
        let fundraising = Fundraising {
            individual: 45000.0,
            party: 15000.0,
            labor: 15000.0,
            issue_orgs: 8000.0,
            pac: 10000.0,
            total: 1.0,
            historical: Vec::new(),
        }
        .with_recomputed_total();
        assert_eq!(fundraising.total, 93000.0);
    }

    #[test]
    fn search_key_has_no_separator() {
        let race = Race::new("IL", "HD-48");
        assert_eq!(race.search_key(), "ILHD-48");
        assert_eq!(race.display_name(), "IL HD-48");
    }

    #[test]
    fn reports_duplicate_years_without_reordering() {
        let mut race = Race::new("IL", "HD-48");
        race.historical_results = vec![
            HistoricalResult { year: 2020, result: -16.3 },
            HistoricalResult { year: 2024, result: -12.5 },
            HistoricalResult { year: 2020, result: -15.0 },
        ];
        assert_eq!(race.duplicate_years(), vec![2020]);
        let desc = race.historical_results_desc();
        assert_eq!(desc[0].year, 2024);
        assert_eq!(race.historical_results[0].year, 2020);
    }
}
