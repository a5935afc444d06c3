//! Reshaping of raw source rows into the seven normalized tables.
//!
//! Everything here is pure: parsed rows in, table records out. Row-level
//! validity failures drop the row from the affected table only; country
//! names that cannot be resolved to an ISO code are collected and returned
//! so the caller can report them in one warning.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use covidgraph_common::tables::{
    CountryRecord, CovidCaseRecord, HasCaseRecord, UsesRecord, VaccinatedOnRecord,
    VaccinationStatsRecord, VaccineRecord,
};

use crate::sources::{ManufacturerRow, OverrideRow, PrimaryRow};

/// The full intermediate table set for one run.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub countries: Vec<CountryRecord>,
    pub covid_cases: Vec<CovidCaseRecord>,
    pub vaccination_stats: Vec<VaccinationStatsRecord>,
    pub has_case: Vec<HasCaseRecord>,
    pub vaccinated_on: Vec<VaccinatedOnRecord>,
    pub vaccines: Vec<VaccineRecord>,
    pub uses: Vec<UsesRecord>,
}

/// Derive all seven tables from the three parsed sources.
///
/// Returns the tables plus the sorted, deduplicated list of country names
/// from the unified manufacturer data that had no entry in the Country table.
pub fn build_tables(
    primary: Vec<PrimaryRow>,
    mut manufacturer: Vec<ManufacturerRow>,
    override_rows: Vec<OverrideRow>,
    override_location: &str,
) -> (Tables, Vec<String>) {
    let primary = filter_valid_iso(primary);

    let countries = build_countries(&primary);
    let covid_cases = build_covid_cases(&primary);
    let vaccination_stats = build_vaccination_stats(&primary);
    let has_case = build_has_case(&covid_cases);
    let vaccinated_on = build_vaccinated_on(&vaccination_stats);

    // Unify the override series with the global manufacturer series before
    // any grouping, so the higher-resolution source supplements that
    // country's aggregate rows.
    manufacturer.extend(explode_override(override_rows, override_location));

    let vaccines = build_vaccines(&manufacturer);
    let (uses, ignored) = build_uses(&manufacturer, &countries);

    (
        Tables {
            countries,
            covid_cases,
            vaccination_stats,
            has_case,
            vaccinated_on,
            vaccines,
            uses,
        },
        ignored,
    )
}

/// Keep only rows with a 3-character ISO code. Drops the feed's aggregate
/// rows (`OWID_WRL`, `OWID_EUR`, ...).
pub fn filter_valid_iso(rows: Vec<PrimaryRow>) -> Vec<PrimaryRow> {
    rows.into_iter()
        .filter(|r| r.iso_code.chars().count() == 3)
        .collect()
}

/// One row per distinct (iso_code, location) pair, in first-seen order.
pub fn build_countries(rows: &[PrimaryRow]) -> Vec<CountryRecord> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut countries = Vec::new();
    for row in rows {
        if seen.insert((row.iso_code.as_str(), row.location.as_str())) {
            countries.push(CountryRecord {
                id: countries.len() as i64 + 1,
                name: row.location.clone(),
                iso3: row.iso_code.clone(),
            });
        }
    }
    countries
}

/// A case row needs a date and at least one of the two counts.
pub fn build_covid_cases(rows: &[PrimaryRow]) -> Vec<CovidCaseRecord> {
    let mut cases = Vec::new();
    for row in rows {
        let Some(date) = row.date else { continue };
        if row.total_cases.is_none() && row.total_deaths.is_none() {
            continue;
        }
        cases.push(CovidCaseRecord {
            id: cases.len() as i64 + 1,
            country_iso: row.iso_code.clone(),
            date,
            total_cases: row.total_cases.map(|v| v as i64),
            total_deaths: row.total_deaths.map(|v| v as i64),
        });
    }
    cases
}

/// A stats row needs date and people_vaccinated; the count is truncated to
/// an integer so no fractional values survive to output.
pub fn build_vaccination_stats(rows: &[PrimaryRow]) -> Vec<VaccinationStatsRecord> {
    let mut stats = Vec::new();
    for row in rows {
        let (Some(date), Some(vaccinated)) = (row.date, row.people_vaccinated) else {
            continue;
        };
        stats.push(VaccinationStatsRecord {
            id: stats.len() as i64 + 1,
            country_iso: row.iso_code.clone(),
            date,
            total_vaccinated: vaccinated as i64,
        });
    }
    stats
}

pub fn build_has_case(cases: &[CovidCaseRecord]) -> Vec<HasCaseRecord> {
    cases
        .iter()
        .map(|c| HasCaseRecord {
            country_iso: c.country_iso.clone(),
            covidcase_id: c.id,
        })
        .collect()
}

pub fn build_vaccinated_on(stats: &[VaccinationStatsRecord]) -> Vec<VaccinatedOnRecord> {
    stats
        .iter()
        .map(|s| VaccinatedOnRecord {
            country_iso: s.country_iso.clone(),
            vaccstats_id: s.id,
        })
        .collect()
}

/// Split each override row's combined vaccine field into one
/// manufacturer-shaped row per vaccine name, tagged with the fixed country
/// label. Rows missing date or vaccine are dropped.
pub fn explode_override(rows: Vec<OverrideRow>, location: &str) -> Vec<ManufacturerRow> {
    let mut exploded = Vec::new();
    for row in rows {
        let (Some(date), Some(vaccine)) = (row.date, row.vaccine) else {
            continue;
        };
        for name in vaccine.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            exploded.push(ManufacturerRow {
                location: location.to_string(),
                vaccine: name.to_string(),
                date: Some(date),
            });
        }
    }
    exploded
}

/// One row per distinct vaccine name, first_global_use = earliest date any
/// country is recorded using it. Ids follow name order.
pub fn build_vaccines(unified: &[ManufacturerRow]) -> Vec<VaccineRecord> {
    let mut first_use: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for row in unified {
        let Some(date) = row.date else { continue };
        if row.vaccine.is_empty() {
            continue;
        }
        first_use
            .entry(row.vaccine.as_str())
            .and_modify(|d| *d = (*d).min(date))
            .or_insert(date);
    }

    first_use
        .into_iter()
        .enumerate()
        .map(|(i, (vaccine, first_global_use))| VaccineRecord {
            vaccine: vaccine.to_string(),
            first_global_use,
            id: i as i64 + 1,
        })
        .collect()
}

/// Collapse the unified manufacturer data to one row per (country, vaccine)
/// pair carrying the earliest date, resolving country names through the
/// Country table. Unresolvable names are returned sorted and deduplicated.
pub fn build_uses(
    unified: &[ManufacturerRow],
    countries: &[CountryRecord],
) -> (Vec<UsesRecord>, Vec<String>) {
    // Exact-match name -> iso3 lookup; a later duplicate name wins.
    let iso_by_name: HashMap<&str, &str> = countries
        .iter()
        .map(|c| (c.name.as_str(), c.iso3.as_str()))
        .collect();

    let mut first_used: BTreeMap<(&str, &str), NaiveDate> = BTreeMap::new();
    let mut ignored: BTreeSet<&str> = BTreeSet::new();

    for row in unified {
        let Some(iso3) = iso_by_name.get(row.location.as_str()).copied() else {
            ignored.insert(row.location.as_str());
            continue;
        };
        let Some(date) = row.date else { continue };
        if row.vaccine.is_empty() {
            continue;
        }
        first_used
            .entry((iso3, row.vaccine.as_str()))
            .and_modify(|d| *d = (*d).min(date))
            .or_insert(date);
    }

    let uses = first_used
        .into_iter()
        .map(|((country_iso, vaccine), first_used)| UsesRecord {
            country_iso: country_iso.to_string(),
            vaccine: vaccine.to_string(),
            first_used,
        })
        .collect();

    (uses, ignored.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn primary(
        iso: &str,
        location: &str,
        date_str: Option<&str>,
        cases: Option<f64>,
        deaths: Option<f64>,
        vaccinated: Option<f64>,
    ) -> PrimaryRow {
        PrimaryRow {
            iso_code: iso.to_string(),
            location: location.to_string(),
            date: date_str.map(date),
            total_cases: cases,
            total_deaths: deaths,
            people_vaccinated: vaccinated,
        }
    }

    fn manufacturer(location: &str, vaccine: &str, date_str: &str) -> ManufacturerRow {
        ManufacturerRow {
            location: location.to_string(),
            vaccine: vaccine.to_string(),
            date: Some(date(date_str)),
        }
    }

    #[test]
    fn iso_filter_drops_aggregate_rows() {
        let rows = filter_valid_iso(vec![
            primary("USA", "United States", Some("2021-01-05"), Some(1.0), None, None),
            primary("OWID_WRL", "World", Some("2021-01-05"), Some(9.0), None, None),
            primary("BR", "Brazil?", Some("2021-01-05"), Some(9.0), None, None),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iso_code, "USA");
    }

    #[test]
    fn countries_dedupe_pairs_in_first_seen_order_with_dense_ids() {
        let rows = vec![
            primary("USA", "United States", Some("2021-01-05"), None, None, None),
            primary("BRA", "Brazil", Some("2021-01-05"), None, None, None),
            primary("USA", "United States", Some("2021-01-06"), None, None, None),
        ];
        let countries = build_countries(&rows);
        assert_eq!(
            countries,
            vec![
                CountryRecord { id: 1, name: "United States".into(), iso3: "USA".into() },
                CountryRecord { id: 2, name: "Brazil".into(), iso3: "BRA".into() },
            ]
        );
    }

    #[test]
    fn case_row_needs_a_date_and_at_least_one_count() {
        let rows = vec![
            // Counts but no date: dropped.
            primary("USA", "United States", None, Some(5.0), Some(1.0), None),
            // Date but both counts null: dropped.
            primary("USA", "United States", Some("2021-01-04"), None, None, Some(7.0)),
            // Deaths only: kept, totalCases stays null.
            primary("USA", "United States", Some("2021-01-05"), None, Some(2.0), None),
            // Both counts: kept.
            primary("BRA", "Brazil", Some("2021-01-05"), Some(100.0), Some(3.0), None),
        ];
        let cases = build_covid_cases(&rows);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, 1);
        assert_eq!(cases[0].total_cases, None);
        assert_eq!(cases[0].total_deaths, Some(2));
        assert_eq!(cases[1].id, 2);
        assert_eq!(cases[1].country_iso, "BRA");
    }

    #[test]
    fn cases_only_row_feeds_countries_and_cases_but_not_stats() {
        let rows = vec![primary(
            "USA",
            "United States",
            Some("2021-01-05"),
            Some(100.0),
            None,
            None,
        )];
        assert_eq!(build_countries(&rows).len(), 1);
        let cases = build_covid_cases(&rows);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].total_cases, Some(100));
        assert_eq!(cases[0].total_deaths, None);
        assert!(build_vaccination_stats(&rows).is_empty());
    }

    #[test]
    fn stats_row_needs_date_and_count_and_truncates_to_integer() {
        let rows = vec![
            primary("USA", "United States", Some("2021-01-05"), None, None, Some(1234.0)),
            primary("USA", "United States", None, None, None, Some(99.0)),
            primary("BRA", "Brazil", Some("2021-01-05"), Some(5.0), None, None),
        ];
        let stats = build_vaccination_stats(&rows);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_vaccinated, 1234);
        assert_eq!(stats[0].id, 1);
    }

    #[test]
    fn relationship_rows_mirror_their_node_tables() {
        let rows = vec![
            primary("USA", "United States", Some("2021-01-05"), Some(1.0), None, Some(10.0)),
            primary("BRA", "Brazil", Some("2021-01-06"), Some(2.0), None, None),
        ];
        let cases = build_covid_cases(&rows);
        let stats = build_vaccination_stats(&rows);

        let has_case = build_has_case(&cases);
        assert_eq!(has_case.len(), 2);
        assert_eq!(has_case[1].country_iso, "BRA");
        assert_eq!(has_case[1].covidcase_id, 2);

        let vaccinated_on = build_vaccinated_on(&stats);
        assert_eq!(vaccinated_on.len(), 1);
        assert_eq!(vaccinated_on[0].vaccstats_id, 1);
    }

    #[test]
    fn override_rows_explode_into_one_row_per_vaccine() {
        let rows = vec![
            OverrideRow {
                date: Some(date("2021-03-01")),
                vaccine: Some("Pfizer, Sinovac".to_string()),
            },
            OverrideRow { date: Some(date("2021-03-02")), vaccine: None },
            OverrideRow { date: None, vaccine: Some("Pfizer".to_string()) },
        ];
        let exploded = explode_override(rows, "Brazil");
        assert_eq!(exploded.len(), 2);
        assert!(exploded.iter().all(|r| r.location == "Brazil"));
        assert_eq!(exploded[0].vaccine, "Pfizer");
        assert_eq!(exploded[1].vaccine, "Sinovac");
        assert_eq!(exploded[1].date, Some(date("2021-03-01")));
    }

    #[test]
    fn vaccines_take_the_minimum_date_across_all_countries() {
        let unified = vec![
            manufacturer("Chile", "Sinovac", "2021-02-10"),
            manufacturer("Brazil", "Sinovac", "2021-01-17"),
            manufacturer("Chile", "Pfizer/BioNTech", "2020-12-24"),
        ];
        let vaccines = build_vaccines(&unified);
        assert_eq!(
            vaccines,
            vec![
                VaccineRecord {
                    vaccine: "Pfizer/BioNTech".into(),
                    first_global_use: date("2020-12-24"),
                    id: 1,
                },
                VaccineRecord {
                    vaccine: "Sinovac".into(),
                    first_global_use: date("2021-01-17"),
                    id: 2,
                },
            ]
        );
    }

    #[test]
    fn uses_collapses_to_one_row_per_pair_with_min_date() {
        let countries = vec![
            CountryRecord { id: 1, name: "Chile".into(), iso3: "CHL".into() },
            CountryRecord { id: 2, name: "Brazil".into(), iso3: "BRA".into() },
        ];
        let unified = vec![
            manufacturer("Chile", "Sinovac", "2021-02-10"),
            manufacturer("Chile", "Sinovac", "2021-02-03"),
            manufacturer("Chile", "Sinovac", "2021-03-01"),
            manufacturer("Brazil", "Sinovac", "2021-01-17"),
        ];
        let (uses, ignored) = build_uses(&unified, &countries);
        assert!(ignored.is_empty());
        assert_eq!(
            uses,
            vec![
                UsesRecord {
                    country_iso: "BRA".into(),
                    vaccine: "Sinovac".into(),
                    first_used: date("2021-01-17"),
                },
                UsesRecord {
                    country_iso: "CHL".into(),
                    vaccine: "Sinovac".into(),
                    first_used: date("2021-02-03"),
                },
            ]
        );
    }

    #[test]
    fn unresolved_country_names_are_reported_sorted_and_deduplicated() {
        let countries = vec![CountryRecord {
            id: 1,
            name: "Chile".into(),
            iso3: "CHL".into(),
        }];
        let unified = vec![
            manufacturer("Wales", "Pfizer/BioNTech", "2021-01-01"),
            manufacturer("European Union", "Moderna", "2021-01-02"),
            manufacturer("Wales", "Moderna", "2021-01-03"),
            manufacturer("Chile", "Moderna", "2021-01-04"),
        ];
        let (uses, ignored) = build_uses(&unified, &countries);
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].country_iso, "CHL");
        assert_eq!(ignored, vec!["European Union".to_string(), "Wales".to_string()]);
    }

    #[test]
    fn build_tables_unifies_override_with_manufacturer_data() {
        let primary_rows = vec![
            primary("BRA", "Brazil", Some("2021-01-17"), Some(10.0), None, Some(5.0)),
            primary("CHL", "Chile", Some("2021-02-03"), Some(20.0), Some(1.0), None),
        ];
        let manufacturer_rows = vec![manufacturer("Chile", "Sinovac", "2021-02-03")];
        let override_rows = vec![OverrideRow {
            date: Some(date("2021-01-17")),
            vaccine: Some("Sinovac, Oxford/AstraZeneca".to_string()),
        }];

        let (tables, ignored) =
            build_tables(primary_rows, manufacturer_rows, override_rows, "Brazil");

        assert!(ignored.is_empty());
        assert_eq!(tables.countries.len(), 2);
        assert_eq!(tables.covid_cases.len(), 2);
        assert_eq!(tables.vaccination_stats.len(), 1);
        assert_eq!(tables.has_case.len(), 2);
        assert_eq!(tables.vaccinated_on.len(), 1);

        // Sinovac first use is the override's earlier Brazil date.
        let sinovac = tables.vaccines.iter().find(|v| v.vaccine == "Sinovac").unwrap();
        assert_eq!(sinovac.first_global_use, date("2021-01-17"));
        assert_eq!(tables.vaccines.len(), 2);

        // One uses row per (country, vaccine) pair.
        assert_eq!(tables.uses.len(), 3);
        assert!(tables
            .uses
            .iter()
            .any(|u| u.country_iso == "BRA" && u.vaccine == "Oxford/AstraZeneca"));
    }
}
