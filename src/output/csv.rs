use anyhow::Result;

use crate::import::template::{year_keyed_columns, CycleMetric};
use crate::import::{CURRENT_CYCLE, CYCLES};
use crate::race::{Race, RegistrationShare};

/// Exports races in the year-keyed template layout so the file imports back unchanged.
pub fn races_to_csv(races: &[Race]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(year_keyed_columns().iter().map(|c| c.label.as_str()))?;
    for race in races {
        let mut record = vec![race.state.clone(), race.district.clone()];
        for year in CYCLES {
            for metric in CycleMetric::ALL {
                record.push(cycle_value(race, metric, year).to_string());
            }
        }
        writer.write_record(&record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn cycle_value(race: &Race, metric: CycleMetric, year: i32) -> f64 {
    let current = year == CURRENT_CYCLE;
    match metric {
        CycleMetric::Performance => {
            if current {
                return race.dem_performance;
            }
            race.historical_results
                .iter()
                .find(|p| p.year == year)
                .map(|p| p.result)
                .unwrap_or_default()
        }
        CycleMetric::DemRegistration | CycleMetric::RepRegistration | CycleMetric::IndRegistration => {
            let share = if current {
                race.voter_registration.current
            } else {
                race.voter_registration
                    .trend
                    .iter()
                    .find(|p| p.year == year)
                    .map(|p| RegistrationShare {
                        dem: p.dem,
                        rep: p.rep,
                        ind: p.ind,
                    })
                    .unwrap_or_default()
            };
            match metric {
                CycleMetric::DemRegistration => share.dem,
                CycleMetric::RepRegistration => share.rep,
                _ => share.ind,
            }
        }
        _ => {
            let f = &race.fundraising;
            let point = if current {
                None
            } else {
                f.historical.iter().find(|p| p.year == year)
            };
            let (individual, party, labor, issue_orgs, pac) = match point {
                Some(p) => (p.individual, p.party, p.labor, p.issue_orgs, p.pac),
                None if current => (f.individual, f.party, f.labor, f.issue_orgs, f.pac),
                None => Default::default(),
            };
            match metric {
                CycleMetric::Individual => individual,
                CycleMetric::Party => party,
                CycleMetric::Labor => labor,
                CycleMetric::IssueOrgs => issue_orgs,
                _ => pac,
            }
        }
    }
}
