//! Row types for the seven intermediate tables.
//!
//! These are the on-disk contract between the extractor and the loader:
//! one CSV file per type, header row included, serde field names matching
//! the header columns exactly. Synthetic ids are run-local, assigned densely
//! from 1 in row order after filtering.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row per distinct (iso3, name) pair observed in the primary source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub iso3: String,
}

impl CountryRecord {
    pub const FILE_NAME: &'static str = "countries.csv";
}

/// Cumulative case/death counts for one country on one date.
/// Present only when at least one of the two counts is non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovidCaseRecord {
    pub id: i64,
    pub country_iso: String,
    pub date: NaiveDate,
    #[serde(rename = "totalCases")]
    pub total_cases: Option<i64>,
    #[serde(rename = "totalDeaths")]
    pub total_deaths: Option<i64>,
}

impl CovidCaseRecord {
    pub const FILE_NAME: &'static str = "covid_cases.csv";
}

/// Cumulative vaccinated-people count for one country on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationStatsRecord {
    pub id: i64,
    pub country_iso: String,
    pub date: NaiveDate,
    #[serde(rename = "totalVaccinated")]
    pub total_vaccinated: i64,
}

impl VaccinationStatsRecord {
    pub const FILE_NAME: &'static str = "vaccination_stats.csv";
}

/// Country -> CovidCase foreign-key link, one row per case row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HasCaseRecord {
    pub country_iso: String,
    pub covidcase_id: i64,
}

impl HasCaseRecord {
    pub const FILE_NAME: &'static str = "has_case.csv";
}

/// Country -> VaccinationStats foreign-key link, one row per stats row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinatedOnRecord {
    pub country_iso: String,
    pub vaccstats_id: i64,
}

impl VaccinatedOnRecord {
    pub const FILE_NAME: &'static str = "vaccinated_on.csv";
}

/// One row per distinct vaccine name across the unified manufacturer data.
/// `first_global_use` is the earliest date any country is recorded using it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccineRecord {
    pub vaccine: String,
    pub first_global_use: NaiveDate,
    pub id: i64,
}

impl VaccineRecord {
    pub const FILE_NAME: &'static str = "vaccines.csv";
}

/// Country -> Vaccine usage edge, collapsed to the earliest date per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsesRecord {
    pub country_iso: String,
    pub vaccine: String,
    pub first_used: NaiveDate,
}

impl UsesRecord {
    pub const FILE_NAME: &'static str = "uses.csv";
}
