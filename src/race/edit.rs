use serde::{Deserialize, Serialize};

use crate::race::field::{FieldParseError, FieldValue, RaceField};
use crate::race::{Fundraising, Race, RegistrationShare};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceEdit {
    pub field: RaceField,
    pub value: FieldValue,
}

impl RaceEdit {
    pub fn new(field: RaceField, value: FieldValue) -> Self {
        Self { field, value }
    }
}

pub fn apply_edit(race: &Race, edit: &RaceEdit) -> Race {
    edit.field.set(race, edit.value.clone())
}

pub fn apply_edits(race: &Race, edits: &[RaceEdit]) -> Race {
    edits
        .iter()
        .fold(race.clone(), |current, edit| apply_edit(&current, edit))
}

/// Current-value fields of a race as presented by the edit form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EditForm {
    pub state: String,
    pub district: String,
    pub dem_performance: f64,
    pub registration: RegistrationShare,
    pub individual: f64,
    pub party: f64,
    pub labor: f64,
    #[serde(rename = "issueOrgs", alias = "issue_orgs")]
    pub issue_orgs: f64,
    pub pac: f64,
    pub notes: String,
}

impl EditForm {
    pub fn from_race(race: &Race) -> Self {
        Self {
            state: race.state.clone(),
            district: race.district.clone(),
            dem_performance: race.dem_performance,
            registration: race.voter_registration.current,
            individual: race.fundraising.individual,
            party: race.fundraising.party,
            labor: race.fundraising.labor,
            issue_orgs: race.fundraising.issue_orgs,
            pac: race.fundraising.pac,
            notes: race.notes.clone().unwrap_or_default(),
        }
    }

    /// Applies raw input for one field. The total is derived and rejected.
    pub fn set(&mut self, field: RaceField, raw: &str) -> Result<(), FieldParseError> {
        let value = field.value_from_input(raw);
        match field {
            RaceField::State => self.state = value.into_text(),
            RaceField::District => self.district = value.into_text(),
            RaceField::Notes => self.notes = value.into_text(),
            RaceField::DemPerformance => self.dem_performance = value.as_number(),
            RaceField::RegistrationDem => self.registration.dem = value.as_number(),
            RaceField::RegistrationRep => self.registration.rep = value.as_number(),
            RaceField::RegistrationInd => self.registration.ind = value.as_number(),
            RaceField::FundraisingIndividual => self.individual = value.as_number(),
            RaceField::FundraisingParty => self.party = value.as_number(),
            RaceField::FundraisingLabor => self.labor = value.as_number(),
            RaceField::FundraisingIssueOrgs => self.issue_orgs = value.as_number(),
            RaceField::FundraisingPac => self.pac = value.as_number(),
            RaceField::FundraisingTotal => return Err(FieldParseError::Derived(field)),
        }
        Ok(())
    }

    /// Builds the saved record: current values replaced, history and id kept, total recomputed.
    pub fn apply_to(&self, race: &Race) -> Race {
        let fundraising = Fundraising {
            individual: self.individual,
            party: self.party,
            labor: self.labor,
            issue_orgs: self.issue_orgs,
            pac: self.pac,
            total: 0.0,
            historical: race.fundraising.historical.clone(),
        }
        .with_recomputed_total();

        let mut next = race.clone();
        next.state = self.state.clone();
        next.district = self.district.clone();
        next.dem_performance = self.dem_performance;
        next.voter_registration.current = self.registration;
        next.fundraising = fundraising;
        next.notes = Some(self.notes.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use crate::race::edit::{apply_edits, EditForm, RaceEdit};
    use crate::race::field::{FieldParseError, FieldValue, RaceField};
    use crate::race::{FundraisingTrendPoint, HistoricalResult, Race, RaceId};

    fn sample_race() -> Race {
        let mut race = Race::new("IL", "HD-48");
        race.id = Some(RaceId(3));
        race.fundraising.individual = 10.0;
        race.fundraising.total = 999_999.0;
        race.fundraising.historical = vec![FundraisingTrendPoint {
            year: 2022,
            individual: 40000.0,
            ..FundraisingTrendPoint::default()
        }];
        race.historical_results = vec![HistoricalResult {
            year: 2022,
            result: -14.8,
        }];
        race
    }

    #[test]
    fn form_json_fills_missing_fields_with_defaults() {
        let form: EditForm = serde_json::from_value(serde_json::json!({
            "state": "IL",
            "labor": 1000,
            "registration": { "dem": 35 }
        }))
        .expect("partial form should decode");
        assert_eq!(form.state, "IL");
        assert_eq!(form.labor, 1000.0);
        assert_eq!(form.registration.dem, 35.0);
        assert_eq!(form.pac, 0.0);
        assert_eq!(form.notes, "");
        assert_eq!(form.apply_to(&sample_race()).fundraising.total, 1000.0);
    }

    #[test]
    fn save_recomputes_total_regardless_of_stale_value() {
        let race = sample_race();
        let mut form = EditForm::from_race(&race);
        form.set(RaceField::FundraisingIndividual, "45000").unwrap();
        form.set(RaceField::FundraisingParty, "15000.25").unwrap();
        form.set(RaceField::FundraisingLabor, "15000").unwrap();
        form.set(RaceField::FundraisingIssueOrgs, "8000").unwrap();
        form.set(RaceField::FundraisingPac, "10000.5").unwrap();

        let saved = form.apply_to(&race);
        let f = &saved.fundraising;
        assert_eq!(f.total, f.individual + f.party + f.labor + f.issue_orgs + f.pac);
        assert_eq!(f.total, 93000.75);
    }

    #[test]
    fn save_preserves_history_and_identifier() {
        let race = sample_race();
        let mut form = EditForm::from_race(&race);
        form.set(RaceField::State, "WI").unwrap();
        form.set(RaceField::DemPerformance, "not a number").unwrap();

        let saved = form.apply_to(&race);
        assert_eq!(saved.id, Some(RaceId(3)));
        assert_eq!(saved.state, "WI");
        assert_eq!(saved.dem_performance, 0.0);
        assert_eq!(saved.fundraising.historical, race.fundraising.historical);
        assert_eq!(saved.historical_results, race.historical_results);
        assert_eq!(race.state, "IL");
    }

    #[test]
    fn total_is_not_editable() {
        let mut form = EditForm::default();
        assert_eq!(
            form.set(RaceField::FundraisingTotal, "5"),
            Err(FieldParseError::Derived(RaceField::FundraisingTotal))
        );
    }

    #[test]
    fn edits_fold_in_order() {
        let race = sample_race();
        let next = apply_edits(
            &race,
            &[
                RaceEdit::new(RaceField::District, FieldValue::Text("HD-49".into())),
                RaceEdit::new(RaceField::District, FieldValue::Text("HD-50".into())),
                RaceEdit::new(RaceField::RegistrationDem, FieldValue::Number(35.0)),
            ],
        );
        assert_eq!(next.district, "HD-50");
        assert_eq!(next.voter_registration.current.dem, 35.0);
        assert_eq!(race.district, "HD-48");
    }
}
