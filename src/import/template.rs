use once_cell::sync::Lazy;
use serde::Serialize;

use crate::import::MappingStrategy;
use crate::race::RaceField;

/// Election cycles in template column order.
pub const CYCLES: [i32; 3] = [2024, 2022, 2020];
pub const CURRENT_CYCLE: i32 = 2024;
pub const TEMPLATE_FILE_NAME: &str = "race_database_template.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMetric {
    Performance,
    DemRegistration,
    RepRegistration,
    IndRegistration,
    Individual,
    Party,
    Labor,
    IssueOrgs,
    Pac,
}

impl CycleMetric {
    pub const ALL: [CycleMetric; 9] = [
        CycleMetric::Performance,
        CycleMetric::DemRegistration,
        CycleMetric::RepRegistration,
        CycleMetric::IndRegistration,
        CycleMetric::Individual,
        CycleMetric::Party,
        CycleMetric::Labor,
        CycleMetric::IssueOrgs,
        CycleMetric::Pac,
    ];

    fn key_suffix(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::DemRegistration => "dem_reg",
            Self::RepRegistration => "rep_reg",
            Self::IndRegistration => "ind_reg",
            Self::Individual => "individual",
            Self::Party => "party",
            Self::Labor => "labor",
            Self::IssueOrgs => "issueorgs",
            Self::Pac => "pac",
        }
    }

    fn label_suffix(&self) -> &'static str {
        match self {
            Self::Performance => "Performance",
            Self::DemRegistration => "Dem Registration",
            Self::RepRegistration => "Rep Registration",
            Self::IndRegistration => "Ind Registration",
            Self::Individual => "Individual $",
            Self::Party => "Party $",
            Self::Labor => "Labor $",
            Self::IssueOrgs => "Issue Org $",
            Self::Pac => "PAC $",
        }
    }

    /// Exact header text expected for this metric in `year`.
    pub fn label(&self, year: i32) -> String {
        format!("{year} {}", self.label_suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateColumn {
    pub key: String,
    pub label: String,
    pub example: String,
}

impl TemplateColumn {
    fn new(key: impl Into<String>, label: impl Into<String>, example: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            example: example.into(),
        }
    }
}

fn cycle_examples(year: i32) -> [&'static str; 9] {
    match year {
        2024 => ["-12.5", "35", "35", "30", "45000", "15000", "15000", "8000", "10000"],
        2022 => ["-14.8", "33", "37", "30", "40000", "12000", "13000", "7000", "9000"],
        _ => ["-16.3", "32", "38", "30", "35000", "10000", "12000", "6000", "8000"],
    }
}

static YEAR_KEYED_COLUMNS: Lazy<Vec<TemplateColumn>> = Lazy::new(|| {
    let mut columns = vec![
        TemplateColumn::new("state", "State", "IL"),
        TemplateColumn::new("district", "District", "HD-48"),
    ];
    for year in CYCLES {
        for (metric, example) in CycleMetric::ALL.iter().zip(cycle_examples(year)) {
            columns.push(TemplateColumn::new(
                format!("{year}_{}", metric.key_suffix()),
                metric.label(year),
                example,
            ));
        }
    }
    columns
});

static FIELD_LABEL_COLUMNS: Lazy<Vec<TemplateColumn>> = Lazy::new(|| {
    RaceField::ALL
        .iter()
        .filter(|field| **field != RaceField::FundraisingTotal)
        .map(|field| TemplateColumn::new(field.path(), field.label(), field_example(*field)))
        .collect()
});

fn field_example(field: RaceField) -> &'static str {
    match field {
        RaceField::State => "IL",
        RaceField::District => "HD-48",
        RaceField::DemPerformance => "-12.5",
        RaceField::RegistrationDem => "35",
        RaceField::RegistrationRep => "35",
        RaceField::RegistrationInd => "30",
        RaceField::FundraisingIndividual => "45000",
        RaceField::FundraisingParty => "15000",
        RaceField::FundraisingLabor => "15000",
        RaceField::FundraisingIssueOrgs => "8000",
        RaceField::FundraisingPac => "10000",
        RaceField::FundraisingTotal => "93000",
        RaceField::Notes => "",
    }
}

/// The shipped column contract: one column per metric per cycle.
pub fn year_keyed_columns() -> &'static [TemplateColumn] {
    &YEAR_KEYED_COLUMNS
}

/// Deprecated single-cycle contract keyed by field label.
pub fn field_label_columns() -> &'static [TemplateColumn] {
    &FIELD_LABEL_COLUMNS
}

pub fn columns_for(strategy: MappingStrategy) -> &'static [TemplateColumn] {
    match strategy {
        MappingStrategy::YearKeyed => year_keyed_columns(),
        MappingStrategy::FieldLabels => field_label_columns(),
    }
}

/// Header line and one example row, newline separated, no trailing newline.
pub fn render_template(strategy: MappingStrategy) -> String {
    let columns = columns_for(strategy);
    let headers = columns
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let examples = columns
        .iter()
        .map(|c| c.example.as_str())
        .collect::<Vec<_>>()
        .join(",");
    format!("{headers}\n{examples}")
}
