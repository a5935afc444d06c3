//! Remote source fetching and row parsing.
//!
//! Each source is a plain CSV fetched over GET. Any transport or parse
//! failure is fatal for the run; there is no retry here.

use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use covidgraph_common::CovidGraphError;

/// Row of the primary case/vaccination series.
///
/// The feed carries many more columns; deserialization is header-based, so
/// everything not listed here is ignored. Counts arrive as floats
/// (`"100.0"`) even though they are whole numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryRow {
    pub iso_code: String,
    pub location: String,
    pub date: Option<NaiveDate>,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub people_vaccinated: Option<f64>,
}

/// Row of the manufacturer-level vaccination series.
#[derive(Debug, Clone, Deserialize)]
pub struct ManufacturerRow {
    pub location: String,
    pub vaccine: String,
    pub date: Option<NaiveDate>,
}

/// Row of the country-specific override series. The `vaccine` field holds a
/// comma-separated list of the vaccine names in use on that date.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRow {
    pub date: Option<NaiveDate>,
    pub vaccine: Option<String>,
}

/// Shared HTTP client for all source fetches.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}

/// GET a CSV source and return its body. Non-2xx responses are errors.
pub async fn fetch_csv(client: &reqwest::Client, url: &str) -> Result<String, CovidGraphError> {
    info!(url, "Fetching source");

    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| CovidGraphError::Fetch(format!("GET {url}: {e}")))?
        .error_for_status()
        .map_err(|e| CovidGraphError::Fetch(format!("GET {url}: {e}")))?;

    let body = resp
        .text()
        .await
        .map_err(|e| CovidGraphError::Fetch(format!("GET {url}: {e}")))?;

    info!(url, bytes = body.len(), "Source fetched");
    Ok(body)
}

/// Parse a CSV body into typed rows, matching columns by header name.
pub fn parse_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, CovidGraphError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.map_err(|e| CovidGraphError::Parse(e.to_string()))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_rows_parse_by_header_and_ignore_extra_columns() {
        let body = "\
iso_code,continent,location,date,total_cases,new_cases,total_deaths,people_vaccinated
USA,North America,United States,2021-01-05,100.0,3.0,,
OWID_WRL,,World,2021-01-05,90000.0,,2000.0,5.0
";
        let rows: Vec<PrimaryRow> = parse_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].iso_code, "USA");
        assert_eq!(rows[0].location, "United States");
        assert_eq!(rows[0].date, Some(NaiveDate::from_ymd_opt(2021, 1, 5).unwrap()));
        assert_eq!(rows[0].total_cases, Some(100.0));
        assert_eq!(rows[0].total_deaths, None);
        assert_eq!(rows[0].people_vaccinated, None);
        assert_eq!(rows[1].total_deaths, Some(2000.0));
    }

    #[test]
    fn override_rows_keep_the_combined_vaccine_field_intact() {
        let body = "\
location,date,vaccine,source_url
Brazil,2021-03-01,\"Pfizer/BioNTech, Sinovac\",https://example.org
Brazil,2021-03-02,,https://example.org
";
        let rows: Vec<OverrideRow> = parse_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vaccine.as_deref(), Some("Pfizer/BioNTech, Sinovac"));
        assert_eq!(rows[1].vaccine, None);
    }

    #[test]
    fn malformed_rows_are_fatal() {
        let body = "\
location,vaccine,date
Chile,Pfizer/BioNTech,not-a-date
";
        let result: Result<Vec<ManufacturerRow>, _> = parse_rows(body);
        assert!(matches!(result, Err(CovidGraphError::Parse(_))));
    }
}
