//! CSV roster import for bulk registration.
//!
//! Accepts the registrar's spreadsheet export with the columns `Name`, `Age`,
//! `Qualifying Score`, `Entrance Score`, `Preferences` (pipe-separated department
//! names), `Category`, and an optional `Registered On` date.

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::Category;
use super::service::RegistrationForm;

/// Errors raised while decoding a roster export.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: age '{value}' is not a valid age")]
    InvalidAge { row: usize, value: String },
    #[error("row {row}: {column} '{value}' is not a valid score")]
    InvalidScore {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: unknown category '{value}'")]
    UnknownCategory { row: usize, value: String },
    #[error("row {row}: no department preferences listed")]
    MissingPreferences { row: usize },
}

/// Decode a roster export into registration forms, preserving row order.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<RegistrationForm>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut forms = Vec::new();

    for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
        // Header is line 1, so the first data row is line 2.
        let row = index + 2;
        forms.push(record?.into_form(row)?);
    }

    Ok(forms)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Age")]
    age: String,
    #[serde(rename = "Qualifying Score")]
    qualifying_score: String,
    #[serde(rename = "Entrance Score")]
    entrance_score: String,
    #[serde(rename = "Preferences")]
    preferences: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(
        rename = "Registered On",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    registered_on: Option<String>,
}

impl RosterRow {
    fn into_form(self, row: usize) -> Result<RegistrationForm, RosterError> {
        let age = self
            .age
            .parse::<u8>()
            .map_err(|_| RosterError::InvalidAge {
                row,
                value: self.age.clone(),
            })?;

        let qualifying_score = parse_score(&self.qualifying_score, row, "qualifying score")?;
        let entrance_score = parse_score(&self.entrance_score, row, "entrance score")?;

        let preferences: Vec<String> = self
            .preferences
            .split('|')
            .map(str::trim)
            .filter(|preference| !preference.is_empty())
            .map(str::to_string)
            .collect();
        if preferences.is_empty() {
            return Err(RosterError::MissingPreferences { row });
        }

        let category =
            Category::parse(&self.category).ok_or_else(|| RosterError::UnknownCategory {
                row,
                value: self.category.clone(),
            })?;

        let registered_on = self
            .registered_on
            .as_deref()
            .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok());

        Ok(RegistrationForm {
            name: self.name,
            age,
            qualifying_score,
            entrance_score,
            preferences,
            category,
            registered_on,
        })
    }
}

fn parse_score(value: &str, row: usize, column: &'static str) -> Result<f32, RosterError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|score| score.is_finite())
        .ok_or_else(|| RosterError::InvalidScore {
            row,
            column,
            value: value.to_string(),
        })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
