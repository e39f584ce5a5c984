use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use crate::import::ImportPreview;
use crate::listing::{SortDirection, SortState};
use crate::race::{Race, RaceField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailTab {
    #[default]
    Overview,
    Registration,
    Fundraising,
}

impl DetailTab {
    pub const ALL: [DetailTab; 3] = [
        DetailTab::Overview,
        DetailTab::Registration,
        DetailTab::Fundraising,
    ];
}

impl Display for DetailTab {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overview => write!(f, "Overview"),
            Self::Registration => write!(f, "Registration"),
            Self::Fundraising => write!(f, "Fundraising"),
        }
    }
}

impl FromStr for DetailTab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Self::Overview),
            "registration" => Ok(Self::Registration),
            "fundraising" => Ok(Self::Fundraising),
            _ => Err(anyhow!("unknown detail tab: {s}")),
        }
    }
}

/// `$45,000`, or `N/A` for zero.
pub fn format_currency(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() {
        return "N/A".to_string();
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(amount.abs()))
}

pub fn format_percentage(value: f64) -> String {
    format!("{value}%")
}

fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.3}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

fn header_with_arrow(label: &str, field: RaceField, sort: Option<SortState>) -> String {
    match sort {
        Some(state) if state.field == field => {
            let arrow = match state.direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            };
            format!("{label} {arrow}")
        }
        _ => label.to_string(),
    }
}

pub fn render_race_table(races: &[Race], sort: Option<SortState>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID".to_string(),
        header_with_arrow("State/District", RaceField::State, sort),
        header_with_arrow("Performance", RaceField::DemPerformance, sort),
        header_with_arrow("Dem Reg %", RaceField::RegistrationDem, sort),
        header_with_arrow("Labor $", RaceField::FundraisingLabor, sort),
        header_with_arrow("Total $", RaceField::FundraisingTotal, sort),
    ]);

    for race in races {
        let performance = format_percentage(race.dem_performance);
        let performance_cell = if race.dem_performance >= 0.0 {
            Cell::new(performance).fg(Color::Blue)
        } else {
            Cell::new(performance).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(
                race.id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(race.display_name()),
            performance_cell,
            Cell::new(format_percentage(race.voter_registration.current.dem)),
            Cell::new(format_currency(race.fundraising.labor)),
            Cell::new(format_currency(race.fundraising.total)),
        ]);
    }
    table.to_string()
}

pub fn render_race_detail(race: &Race, tab: DetailTab) -> String {
    let mut out = format!("{}\n", race.display_name());
    let tabs = DetailTab::ALL
        .iter()
        .map(|t| {
            if *t == tab {
                format!("[{t}]")
            } else {
                t.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(&tabs);
    out.push('\n');

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    match tab {
        DetailTab::Overview => {
            table.set_header(vec!["Year", "Dem Performance"]);
            for point in race.historical_results_desc() {
                table.add_row(vec![point.year.to_string(), format_percentage(point.result)]);
            }
            if race.historical_results.is_empty() {
                out.push_str("No historical performance data available\n");
            }
        }
        DetailTab::Registration => {
            table.set_header(vec!["Year", "Democratic", "Republican", "Independent"]);
            for point in race.registration_trend_desc() {
                table.add_row(vec![
                    point.year.to_string(),
                    format_percentage(point.dem),
                    format_percentage(point.rep),
                    format_percentage(point.ind),
                ]);
            }
            if race.voter_registration.trend.is_empty() {
                out.push_str("No registration trend data available\n");
            }
        }
        DetailTab::Fundraising => {
            table.set_header(vec![
                "Year",
                "Individual",
                "Party",
                "Labor",
                "Issue Orgs",
                "PAC",
                "Total",
            ]);
            for point in race.fundraising_history_desc() {
                table.add_row(vec![
                    point.year.to_string(),
                    format_currency(point.individual),
                    format_currency(point.party),
                    format_currency(point.labor),
                    format_currency(point.issue_orgs),
                    format_currency(point.pac),
                    format_currency(point.total.unwrap_or_else(|| point.component_sum())),
                ]);
            }
            if race.fundraising.historical.is_empty() {
                out.push_str("No fundraising history available\n");
            }
        }
    }
    out.push_str(&table.to_string());

    if let Some(notes) = race.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        out.push_str("\nNotes: ");
        out.push_str(notes);
    }
    out
}

pub fn render_import_preview(preview: &ImportPreview) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(preview.headers.clone());
    for row in &preview.rows {
        table.add_row(row.clone());
    }
    let mut out = table.to_string();
    out.push_str(&format!("\n{} rows ready to import", preview.records.len()));
    for warning in &preview.warnings {
        out.push_str(&format!("\nwarning: {warning}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::listing::{SortDirection, SortState};
    use crate::output::table::{
        format_currency, format_percentage, render_race_detail, render_race_table, DetailTab,
    };
    use crate::race::{HistoricalResult, Race, RaceField, RaceId};

    #[test]
    fn formats_currency_like_the_dashboard() {
        assert_eq!(format_currency(45000.0), "$45,000");
        assert_eq!(format_currency(1234567.5), "$1,234,567.5");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(0.0), "N/A");
        assert_eq!(format_currency(-1000.0), "-$1,000");
        assert_eq!(format_currency(-250.5), "-$250.5");
        assert_eq!(format_percentage(-12.5), "-12.5%");
        assert_eq!(format_percentage(35.0), "35%");
    }

    #[test]
    fn table_marks_active_sort_column() {
        let mut race = Race::new("IL", "HD-48");
        race.id = Some(RaceId(4));
        let rendered = render_race_table(
            &[race],
            Some(SortState::new(RaceField::FundraisingTotal, SortDirection::Desc)),
        );
        assert!(rendered.contains("Total $ ▼"));
        assert!(rendered.contains("IL HD-48"));
    }

    #[test]
    fn overview_lists_results_newest_first() {
        let mut race = Race::new("IL", "HD-48");
        race.historical_results = vec![
            HistoricalResult { year: 2020, result: -16.3 },
            HistoricalResult { year: 2024, result: -12.5 },
        ];
        let rendered = render_race_detail(&race, DetailTab::Overview);
        let newest = rendered.find("2024").expect("2024 row");
        let oldest = rendered.find("2020").expect("2020 row");
        assert!(newest < oldest);
        assert!(rendered.contains("[Overview]"));
    }

    #[test]
    fn empty_history_says_so() {
        let race = Race::new("IL", "HD-48");
        let rendered = render_race_detail(&race, DetailTab::Fundraising);
        assert!(rendered.contains("No fundraising history available"));
    }
}
