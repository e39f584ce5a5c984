use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::race::Race;

/// Scalar fields of a race that can be sorted on, mapped from a CSV column or edited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RaceField {
    State,
    District,
    DemPerformance,
    RegistrationDem,
    RegistrationRep,
    RegistrationInd,
    FundraisingIndividual,
    FundraisingParty,
    FundraisingLabor,
    FundraisingIssueOrgs,
    FundraisingPac,
    FundraisingTotal,
    Notes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => parse_lenient_f64(s),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl RaceField {
    pub const ALL: [RaceField; 13] = [
        RaceField::State,
        RaceField::District,
        RaceField::DemPerformance,
        RaceField::RegistrationDem,
        RaceField::RegistrationRep,
        RaceField::RegistrationInd,
        RaceField::FundraisingIndividual,
        RaceField::FundraisingParty,
        RaceField::FundraisingLabor,
        RaceField::FundraisingIssueOrgs,
        RaceField::FundraisingPac,
        RaceField::FundraisingTotal,
        RaceField::Notes,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::District => "district",
            Self::DemPerformance => "dem_performance",
            Self::RegistrationDem => "voter_registration.current.dem",
            Self::RegistrationRep => "voter_registration.current.rep",
            Self::RegistrationInd => "voter_registration.current.ind",
            Self::FundraisingIndividual => "fundraising.individual",
            Self::FundraisingParty => "fundraising.party",
            Self::FundraisingLabor => "fundraising.labor",
            Self::FundraisingIssueOrgs => "fundraising.issueOrgs",
            Self::FundraisingPac => "fundraising.pac",
            Self::FundraisingTotal => "fundraising.total",
            Self::Notes => "notes",
        }
    }

    /// Column label used by the field-label CSV template.
    pub fn label(&self) -> &'static str {
        match self {
            Self::State => "State",
            Self::District => "District",
            Self::DemPerformance => "Democratic Performance",
            Self::RegistrationDem => "Dem Registration",
            Self::RegistrationRep => "Rep Registration",
            Self::RegistrationInd => "Ind Registration",
            Self::FundraisingIndividual => "Individual $",
            Self::FundraisingParty => "Party $",
            Self::FundraisingLabor => "Labor $",
            Self::FundraisingIssueOrgs => "Issue Org $",
            Self::FundraisingPac => "PAC $",
            Self::FundraisingTotal => "Total $",
            Self::Notes => "Notes",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::State | Self::District | Self::Notes)
    }

    pub fn get(&self, race: &Race) -> FieldValue {
        let reg = &race.voter_registration.current;
        let money = &race.fundraising;
        match self {
            Self::State => FieldValue::Text(race.state.clone()),
            Self::District => FieldValue::Text(race.district.clone()),
            Self::Notes => FieldValue::Text(race.notes.clone().unwrap_or_default()),
            Self::DemPerformance => FieldValue::Number(race.dem_performance),
            Self::RegistrationDem => FieldValue::Number(reg.dem),
            Self::RegistrationRep => FieldValue::Number(reg.rep),
            Self::RegistrationInd => FieldValue::Number(reg.ind),
            Self::FundraisingIndividual => FieldValue::Number(money.individual),
            Self::FundraisingParty => FieldValue::Number(money.party),
            Self::FundraisingLabor => FieldValue::Number(money.labor),
            Self::FundraisingIssueOrgs => FieldValue::Number(money.issue_orgs),
            Self::FundraisingPac => FieldValue::Number(money.pac),
            Self::FundraisingTotal => FieldValue::Number(money.total),
        }
    }

    /// Returns a copy of `race` with this field replaced. Numeric fields coerce text with a 0 default.
    pub fn set(&self, race: &Race, value: FieldValue) -> Race {
        let mut next = race.clone();
        match self {
            Self::State => next.state = value.into_text(),
            Self::District => next.district = value.into_text(),
            Self::Notes => next.notes = Some(value.into_text()),
            Self::DemPerformance => next.dem_performance = value.as_number(),
            Self::RegistrationDem => next.voter_registration.current.dem = value.as_number(),
            Self::RegistrationRep => next.voter_registration.current.rep = value.as_number(),
            Self::RegistrationInd => next.voter_registration.current.ind = value.as_number(),
            Self::FundraisingIndividual => next.fundraising.individual = value.as_number(),
            Self::FundraisingParty => next.fundraising.party = value.as_number(),
            Self::FundraisingLabor => next.fundraising.labor = value.as_number(),
            Self::FundraisingIssueOrgs => next.fundraising.issue_orgs = value.as_number(),
            Self::FundraisingPac => next.fundraising.pac = value.as_number(),
            Self::FundraisingTotal => next.fundraising.total = value.as_number(),
        }
        next
    }

    /// Interprets raw form or cell text for this field.
    pub fn value_from_input(&self, raw: &str) -> FieldValue {
        if self.is_numeric() {
            FieldValue::Number(parse_lenient_f64(raw))
        } else {
            FieldValue::Text(raw.to_string())
        }
    }
}

impl Display for RaceField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FieldParseError {
    #[error("unknown race field: {0}")]
    Unknown(String),
    #[error("field {0} is derived and cannot be edited")]
    Derived(RaceField),
}

impl FromStr for RaceField {
    type Err = FieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(field) = Self::ALL.iter().find(|f| f.path() == trimmed) {
            return Ok(*field);
        }
        let normalized = trimmed.to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "state" => Self::State,
            "district" => Self::District,
            "performance" | "dem_performance" => Self::DemPerformance,
            "dem" | "dem_reg" | "registration_dem" => Self::RegistrationDem,
            "rep" | "rep_reg" | "registration_rep" => Self::RegistrationRep,
            "ind" | "ind_reg" | "registration_ind" => Self::RegistrationInd,
            "individual" => Self::FundraisingIndividual,
            "party" => Self::FundraisingParty,
            "labor" => Self::FundraisingLabor,
            "issueorgs" | "issue_orgs" | "fundraising.issueorgs" => Self::FundraisingIssueOrgs,
            "pac" => Self::FundraisingPac,
            "total" => Self::FundraisingTotal,
            "notes" => Self::Notes,
            _ => return Err(FieldParseError::Unknown(s.to_string())),
        };
        Ok(field)
    }
}

/// Best-effort float coercion: the longest numeric prefix after leading whitespace, 0 otherwise.
pub fn parse_lenient_f64(raw: &str) -> f64 {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse::<f64>().unwrap_or(0.0)
}
