pub mod mapper;
pub mod parser;
pub mod template;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mapper::{map_grid, preview, HeaderIndex, ImportPreview, MappingStrategy};
pub use parser::{parse, parse_naive, parse_quoted, CsvDialect, CsvGrid};
pub use template::{render_template, TemplateColumn, CURRENT_CYCLE, CYCLES, TEMPLATE_FILE_NAME};

pub const GENERIC_IMPORT_ERROR: &str =
    "Error processing file. Please check the format and try again.";

#[derive(Debug, Error)]
pub enum ImportError {
    /// Detail is logged; the message shown to the user stays generic.
    #[error("Error processing file. Please check the format and try again.")]
    Mapping {
        row: usize,
        column: String,
        detail: String,
    },
    #[error("Error processing file. Please check the format and try again.")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ImportOptionParseError {
    pub kind: &'static str,
    pub value: String,
}

impl Display for CsvDialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Naive => write!(f, "naive"),
            Self::Quoted => write!(f, "quoted"),
        }
    }
}

impl FromStr for CsvDialect {
    type Err = ImportOptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" | "plain" => Ok(Self::Naive),
            "quoted" | "rfc4180" => Ok(Self::Quoted),
            _ => Err(ImportOptionParseError {
                kind: "csv dialect",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for MappingStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearKeyed => write!(f, "year_keyed"),
            Self::FieldLabels => write!(f, "field_labels"),
        }
    }
}

impl FromStr for MappingStrategy {
    type Err = ImportOptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "year_keyed" | "years" => Ok(Self::YearKeyed),
            "field_labels" | "labels" => Ok(Self::FieldLabels),
            _ => Err(ImportOptionParseError {
                kind: "mapping strategy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportOptions {
    #[serde(default)]
    pub dialect: CsvDialect,
    #[serde(default)]
    pub strategy: MappingStrategy,
}
