//! Persisting the intermediate tables to disk.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use covidgraph_common::tables::{
    CountryRecord, CovidCaseRecord, HasCaseRecord, UsesRecord, VaccinatedOnRecord,
    VaccinationStatsRecord, VaccineRecord,
};
use covidgraph_common::CovidGraphError;

use crate::transform::Tables;

/// Write one table as CSV with a header row.
pub fn write_table<T: Serialize>(
    dir: &Path,
    file_name: &str,
    rows: &[T],
) -> Result<(), CovidGraphError> {
    let path = dir.join(file_name);
    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| CovidGraphError::Io(format!("{}: {e}", path.display())))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| CovidGraphError::Io(format!("{}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| CovidGraphError::Io(format!("{}: {e}", path.display())))?;

    info!(file = file_name, rows = rows.len(), "Table written");
    Ok(())
}

/// Write the full table set into `dir`, creating it if absent.
pub fn write_all(dir: &Path, tables: &Tables) -> Result<(), CovidGraphError> {
    fs::create_dir_all(dir).map_err(|e| CovidGraphError::Io(format!("{}: {e}", dir.display())))?;

    write_table(dir, CountryRecord::FILE_NAME, &tables.countries)?;
    write_table(dir, CovidCaseRecord::FILE_NAME, &tables.covid_cases)?;
    write_table(dir, VaccinationStatsRecord::FILE_NAME, &tables.vaccination_stats)?;
    write_table(dir, HasCaseRecord::FILE_NAME, &tables.has_case)?;
    write_table(dir, VaccinatedOnRecord::FILE_NAME, &tables.vaccinated_on)?;
    write_table(dir, VaccineRecord::FILE_NAME, &tables.vaccines)?;
    write_table(dir, UsesRecord::FILE_NAME, &tables.uses)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covid_cases_serialize_with_contract_headers_and_empty_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![CovidCaseRecord {
            id: 1,
            country_iso: "USA".into(),
            date: "2021-01-05".parse().unwrap(),
            total_cases: Some(100),
            total_deaths: None,
        }];

        write_table(dir.path(), CovidCaseRecord::FILE_NAME, &rows).unwrap();

        let text = fs::read_to_string(dir.path().join(CovidCaseRecord::FILE_NAME)).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,country_iso,date,totalCases,totalDeaths"));
        assert_eq!(lines.next(), Some("1,USA,2021-01-05,100,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn write_all_emits_the_seven_table_files() {
        let dir = tempfile::tempdir().unwrap();
        write_all(dir.path(), &Tables::default()).unwrap();

        for file in [
            CountryRecord::FILE_NAME,
            CovidCaseRecord::FILE_NAME,
            VaccinationStatsRecord::FILE_NAME,
            HasCaseRecord::FILE_NAME,
            VaccinatedOnRecord::FILE_NAME,
            VaccineRecord::FILE_NAME,
            UsesRecord::FILE_NAME,
        ] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
    }
}
