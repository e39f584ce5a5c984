use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::import::parser::CsvGrid;
use crate::import::template::{columns_for, CycleMetric, CURRENT_CYCLE, CYCLES};
use crate::import::ImportError;
use crate::race::field::parse_lenient_f64;
use crate::race::{
    Fundraising, FundraisingTrendPoint, HistoricalResult, Race, RaceField, RegistrationShare,
    RegistrationTrendPoint, VoterRegistration,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
    /// `{year} {metric}` columns for every cycle.
    #[default]
    YearKeyed,
    /// One column per field label, current values only. Kept for older exports.
    FieldLabels,
}

/// Looks up columns by exact, case-sensitive header text; the first occurrence wins.
#[derive(Debug, Clone, Copy)]
pub struct HeaderIndex<'a> {
    headers: &'a [String],
}

impl<'a> HeaderIndex<'a> {
    pub fn new(headers: &'a [String]) -> Self {
        Self { headers }
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == label)
    }

    pub fn cell<'r>(&self, row: &'r [String], label: &str) -> Option<&'r str> {
        self.position(label)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub records: Vec<Race>,
    pub warnings: Vec<String>,
}

struct RowReader<'a> {
    index: HeaderIndex<'a>,
    row: &'a [String],
    row_number: usize,
}

impl<'a> RowReader<'a> {
    fn text(&self, label: &str) -> String {
        self.index.cell(self.row, label).unwrap_or_default().to_string()
    }

    fn number(&self, label: &str) -> Result<f64, ImportError> {
        let raw = self.index.cell(self.row, label).unwrap_or_default();
        finite(parse_lenient_f64(raw), self.row_number, label, raw)
    }

    fn metric(&self, metric: CycleMetric, year: i32) -> Result<f64, ImportError> {
        self.number(&metric.label(year))
    }
}

fn finite(value: f64, row: usize, column: &str, raw: &str) -> Result<f64, ImportError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ImportError::Mapping {
            row,
            column: column.to_string(),
            detail: format!("value {raw:?} is not a finite number"),
        })
    }
}

/// Maps every data row to a race without an identifier. Any failure aborts the whole batch.
pub fn map_grid(grid: &CsvGrid, strategy: MappingStrategy) -> Result<Vec<Race>, ImportError> {
    let index = HeaderIndex::new(&grid.headers);
    let mut races = Vec::with_capacity(grid.rows.len());
    for (idx, row) in grid.rows.iter().enumerate() {
        let reader = RowReader {
            index,
            row,
            row_number: idx + 1,
        };
        let race = match strategy {
            MappingStrategy::YearKeyed => map_year_keyed(&reader),
            MappingStrategy::FieldLabels => map_field_labels(&reader),
        };
        match race {
            Ok(race) => races.push(race),
            Err(err) => {
                if let ImportError::Mapping { row, column, detail } = &err {
                    warn!("import mapping failed at row {row}, column {column:?}: {detail}");
                }
                return Err(err);
            }
        }
    }
    debug!("mapped {} rows with {strategy} strategy", races.len());
    Ok(races)
}

fn map_year_keyed(reader: &RowReader<'_>) -> Result<Race, ImportError> {
    let mut ascending = CYCLES;
    ascending.sort_unstable();

    let mut trend = Vec::with_capacity(ascending.len());
    let mut historical = Vec::with_capacity(ascending.len());
    let mut results = Vec::with_capacity(ascending.len());
    for year in ascending {
        trend.push(RegistrationTrendPoint {
            year,
            dem: reader.metric(CycleMetric::DemRegistration, year)?,
            rep: reader.metric(CycleMetric::RepRegistration, year)?,
            ind: reader.metric(CycleMetric::IndRegistration, year)?,
        });
        let mut point = FundraisingTrendPoint {
            year,
            individual: reader.metric(CycleMetric::Individual, year)?,
            party: reader.metric(CycleMetric::Party, year)?,
            labor: reader.metric(CycleMetric::Labor, year)?,
            issue_orgs: reader.metric(CycleMetric::IssueOrgs, year)?,
            pac: reader.metric(CycleMetric::Pac, year)?,
            total: None,
        };
        point.total = Some(point.component_sum());
        historical.push(point);
        results.push(HistoricalResult {
            year,
            result: reader.metric(CycleMetric::Performance, year)?,
        });
    }

    let current = historical
        .iter()
        .find(|p| p.year == CURRENT_CYCLE)
        .copied()
        .unwrap_or_default();
    let fundraising = Fundraising {
        individual: current.individual,
        party: current.party,
        labor: current.labor,
        issue_orgs: current.issue_orgs,
        pac: current.pac,
        total: 0.0,
        historical,
    }
    .with_recomputed_total();

    Ok(Race {
        id: None,
        state: reader.text("State"),
        district: reader.text("District"),
        dem_performance: reader.metric(CycleMetric::Performance, CURRENT_CYCLE)?,
        voter_registration: VoterRegistration {
            current: RegistrationShare {
                dem: reader.metric(CycleMetric::DemRegistration, CURRENT_CYCLE)?,
                rep: reader.metric(CycleMetric::RepRegistration, CURRENT_CYCLE)?,
                ind: reader.metric(CycleMetric::IndRegistration, CURRENT_CYCLE)?,
            },
            trend,
        },
        fundraising,
        historical_results: results,
        notes: Some(String::new()),
    })
}

fn map_field_labels(reader: &RowReader<'_>) -> Result<Race, ImportError> {
    let mut race = Race::default();
    for column in columns_for(MappingStrategy::FieldLabels) {
        let Ok(field) = column.key.parse::<RaceField>() else {
            continue;
        };
        let Some(raw) = reader.index.cell(reader.row, &column.label) else {
            continue;
        };
        let value = field.value_from_input(raw);
        if field.is_numeric() {
            finite(value.as_number(), reader.row_number, &column.label, raw)?;
        }
        race = field.set(&race, value);
    }
    race.fundraising = race.fundraising.with_recomputed_total();
    Ok(race)
}

/// Parsed rows, mapped records and non-fatal warnings, for review before inserting.
pub fn preview(grid: &CsvGrid, strategy: MappingStrategy) -> Result<ImportPreview, ImportError> {
    let records = map_grid(grid, strategy)?;
    let mut warnings = Vec::new();

    let index = HeaderIndex::new(&grid.headers);
    let missing = columns_for(strategy)
        .iter()
        .filter(|c| index.position(&c.label).is_none())
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        warnings.push(format!(
            "missing columns default to 0: {}",
            missing.join(", ")
        ));
    }
    for (idx, row) in grid.rows.iter().enumerate() {
        if row.len() != grid.headers.len() {
            warnings.push(format!(
                "row {} has {} cells, header has {}",
                idx + 1,
                row.len(),
                grid.headers.len()
            ));
        }
    }
    for (idx, race) in records.iter().enumerate() {
        let dupes = race.duplicate_years();
        if !dupes.is_empty() {
            warnings.push(format!("row {} repeats years {dupes:?}", idx + 1));
        }
    }
    for warning in &warnings {
        warn!("{warning}");
    }

    Ok(ImportPreview {
        headers: grid.headers.clone(),
        rows: grid.rows.clone(),
        records,
        warnings,
    })
}
