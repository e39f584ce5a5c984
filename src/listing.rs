use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::race::{FieldValue, Race, RaceField};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl Display for SortDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown sort direction: {0}")]
pub struct SortDirectionParseError(pub String);

impl FromStr for SortDirection {
    type Err = SortDirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(SortDirectionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: RaceField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: RaceField::State,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub fn new(field: RaceField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Column header click: same field flips direction, a new field starts ascending.
    pub fn select(self, field: RaceField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.toggled(),
            }
        } else {
            Self {
                field,
                direction: SortDirection::Asc,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub sort: SortState,
}

impl ListQuery {
    pub fn new(search: impl Into<String>, sort: SortState) -> Self {
        Self {
            search: search.into(),
            sort,
        }
    }

    pub fn apply(&self, races: &[Race]) -> Vec<Race> {
        let mut out = filter_races(races, &self.search);
        sort_races(&mut out, self.sort);
        out
    }
}

/// Case-insensitive substring match against state and district joined with no separator.
pub fn matches_search(race: &Race, term: &str) -> bool {
    race.search_key()
        .to_lowercase()
        .contains(&term.to_lowercase())
}

pub fn filter_races(races: &[Race], term: &str) -> Vec<Race> {
    races
        .iter()
        .filter(|race| matches_search(race, term))
        .cloned()
        .collect()
}

/// Stable sort over a total order: the field, then id, then the search key.
/// Descending reverses the whole comparator, so it is the exact reverse of ascending.
pub fn sort_races(races: &mut [Race], sort: SortState) {
    races.sort_by(|a, b| {
        let ordering = compare_values(&sort.field.get(a), &sort.field.get(b))
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| locale_compare(&a.search_key(), &b.search_key()));
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => locale_compare(&a.to_string(), &b.to_string()),
    }
}

/// Case-insensitive comparison with case as the tiebreak, close to a default-locale collation.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    // lowercase before uppercase on ties
    b.cmp(a)
}
