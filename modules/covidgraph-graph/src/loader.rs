//! Batched, idempotent load of the intermediate tables into Neo4j.
//!
//! Every write is a MERGE keyed by the entity's natural key, so re-running
//! a partial or complete load converges to the same graph. Nodes are loaded
//! before relationships: an edge MERGE needs both endpoints to exist, and a
//! row whose endpoint MATCH finds nothing is skipped by Cypher semantics.

use std::path::Path;

use anyhow::{Context, Result};
use neo4rs::{query, BoltMap, BoltString, BoltType};
use serde::de::DeserializeOwned;
use tracing::info;

use covidgraph_common::tables::{
    CountryRecord, CovidCaseRecord, HasCaseRecord, UsesRecord, VaccinatedOnRecord,
    VaccinationStatsRecord, VaccineRecord,
};

use crate::GraphClient;

/// Rows per store round-trip.
pub const BATCH_SIZE: usize = 1000;

/// Load-side wrapper for the graph.
pub struct GraphLoader {
    client: GraphClient,
}

impl GraphLoader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Read the seven tables from `dir` and upsert them into the graph,
    /// all node types first, then the relationships.
    pub async fn load_dir(&self, dir: &Path) -> Result<()> {
        let countries: Vec<CountryRecord> = read_table(dir, CountryRecord::FILE_NAME)?;
        let covid_cases: Vec<CovidCaseRecord> = read_table(dir, CovidCaseRecord::FILE_NAME)?;
        let vaccination_stats: Vec<VaccinationStatsRecord> =
            read_table(dir, VaccinationStatsRecord::FILE_NAME)?;
        let has_case: Vec<HasCaseRecord> = read_table(dir, HasCaseRecord::FILE_NAME)?;
        let vaccinated_on: Vec<VaccinatedOnRecord> =
            read_table(dir, VaccinatedOnRecord::FILE_NAME)?;
        let vaccines: Vec<VaccineRecord> = read_table(dir, VaccineRecord::FILE_NAME)?;
        let uses: Vec<UsesRecord> = read_table(dir, UsesRecord::FILE_NAME)?;

        self.load_countries(&countries)
            .await
            .context("loading Country nodes")?;
        self.load_covid_cases(&covid_cases)
            .await
            .context("loading CovidCase nodes")?;
        self.load_vaccination_stats(&vaccination_stats)
            .await
            .context("loading VaccinationStats nodes")?;
        self.load_vaccines(&vaccines)
            .await
            .context("loading Vaccine nodes")?;

        self.load_has_case(&has_case)
            .await
            .context("loading HAS_CASE relationships")?;
        self.load_vaccinated_on(&vaccinated_on)
            .await
            .context("loading VACCINATED_ON relationships")?;
        self.load_uses(&uses)
            .await
            .context("loading USES relationships")?;

        info!("Graph load complete");
        Ok(())
    }

    pub async fn load_countries(&self, rows: &[CountryRecord]) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MERGE (c:Country {iso3: row.iso3})
             SET c.name = row.name, c.id = row.id",
            rows,
            country_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "Country nodes upserted");
        Ok(())
    }

    pub async fn load_covid_cases(&self, rows: &[CovidCaseRecord]) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MERGE (cc:CovidCase {id: row.id})
             SET cc.date = date(row.date),
                 cc.totalCases = CASE WHEN row.totalCases = '' THEN null ELSE toInteger(row.totalCases) END,
                 cc.totalDeaths = CASE WHEN row.totalDeaths = '' THEN null ELSE toInteger(row.totalDeaths) END",
            rows,
            covid_case_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "CovidCase nodes upserted");
        Ok(())
    }

    pub async fn load_vaccination_stats(
        &self,
        rows: &[VaccinationStatsRecord],
    ) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MERGE (vs:VaccinationStats {id: row.id})
             SET vs.date = date(row.date), vs.totalVaccinated = row.totalVaccinated",
            rows,
            vaccination_stats_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "VaccinationStats nodes upserted");
        Ok(())
    }

    pub async fn load_vaccines(&self, rows: &[VaccineRecord]) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MERGE (v:Vaccine {name: row.vaccine})
             SET v.id = row.id, v.first_global_use = date(row.first_global_use)",
            rows,
            vaccine_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "Vaccine nodes upserted");
        Ok(())
    }

    pub async fn load_has_case(&self, rows: &[HasCaseRecord]) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MATCH (c:Country {iso3: row.country_iso})
             MATCH (cc:CovidCase {id: row.covidcase_id})
             MERGE (c)-[:HAS_CASE]->(cc)",
            rows,
            has_case_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "HAS_CASE relationships upserted");
        Ok(())
    }

    pub async fn load_vaccinated_on(
        &self,
        rows: &[VaccinatedOnRecord],
    ) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MATCH (c:Country {iso3: row.country_iso})
             MATCH (vs:VaccinationStats {id: row.vaccstats_id})
             MERGE (c)-[:VACCINATED_ON]->(vs)",
            rows,
            vaccinated_on_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "VACCINATED_ON relationships upserted");
        Ok(())
    }

    pub async fn load_uses(&self, rows: &[UsesRecord]) -> Result<(), neo4rs::Error> {
        self.run_batched(
            "UNWIND $batch AS row
             MATCH (c:Country {iso3: row.country_iso})
             MATCH (v:Vaccine {name: row.vaccine})
             MERGE (c)-[r:USES]->(v)
             SET r.first_used = date(row.first_used)",
            rows,
            uses_to_bolt,
        )
        .await?;
        info!(rows = rows.len(), "USES relationships upserted");
        Ok(())
    }

    /// Run one UNWIND statement per fixed-size chunk of `rows`.
    async fn run_batched<T>(
        &self,
        cypher: &str,
        rows: &[T],
        to_bolt: fn(&T) -> BoltType,
    ) -> Result<(), neo4rs::Error> {
        for chunk in rows.chunks(BATCH_SIZE) {
            let batch: Vec<BoltType> = chunk.iter().map(to_bolt).collect();
            self.client
                .graph
                .run(query(cypher).param("batch", batch))
                .await?;
        }
        Ok(())
    }
}

/// Read one table CSV into typed records.
fn read_table<T: DeserializeOwned>(dir: &Path, file_name: &str) -> Result<Vec<T>> {
    let path = dir.join(file_name);
    let mut reader =
        csv::Reader::from_path(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.with_context(|| format!("reading {}", path.display()))?);
    }
    Ok(rows)
}

fn bolt_str(value: &str) -> BoltType {
    value.into()
}

fn bolt_int(value: i64) -> BoltType {
    value.into()
}

/// Nullable counts travel as strings with `''` standing in for null; the
/// Cypher side turns them back with a CASE + toInteger.
fn bolt_int_or_empty(value: Option<i64>) -> BoltType {
    match value {
        Some(v) => bolt_str(&v.to_string()),
        None => bolt_str(""),
    }
}

fn bolt_map(entries: Vec<(&str, BoltType)>) -> BoltType {
    BoltType::Map(BoltMap::from_iter(
        entries
            .into_iter()
            .map(|(k, v)| (BoltString::from(k), v)),
    ))
}

fn country_to_bolt(r: &CountryRecord) -> BoltType {
    bolt_map(vec![
        ("id", bolt_int(r.id)),
        ("name", bolt_str(&r.name)),
        ("iso3", bolt_str(&r.iso3)),
    ])
}

fn covid_case_to_bolt(r: &CovidCaseRecord) -> BoltType {
    bolt_map(vec![
        ("id", bolt_int(r.id)),
        ("date", bolt_str(&r.date.to_string())),
        ("totalCases", bolt_int_or_empty(r.total_cases)),
        ("totalDeaths", bolt_int_or_empty(r.total_deaths)),
    ])
}

fn vaccination_stats_to_bolt(r: &VaccinationStatsRecord) -> BoltType {
    bolt_map(vec![
        ("id", bolt_int(r.id)),
        ("date", bolt_str(&r.date.to_string())),
        ("totalVaccinated", bolt_int(r.total_vaccinated)),
    ])
}

fn vaccine_to_bolt(r: &VaccineRecord) -> BoltType {
    bolt_map(vec![
        ("vaccine", bolt_str(&r.vaccine)),
        ("first_global_use", bolt_str(&r.first_global_use.to_string())),
        ("id", bolt_int(r.id)),
    ])
}

fn has_case_to_bolt(r: &HasCaseRecord) -> BoltType {
    bolt_map(vec![
        ("country_iso", bolt_str(&r.country_iso)),
        ("covidcase_id", bolt_int(r.covidcase_id)),
    ])
}

fn vaccinated_on_to_bolt(r: &VaccinatedOnRecord) -> BoltType {
    bolt_map(vec![
        ("country_iso", bolt_str(&r.country_iso)),
        ("vaccstats_id", bolt_int(r.vaccstats_id)),
    ])
}

fn uses_to_bolt(r: &UsesRecord) -> BoltType {
    bolt_map(vec![
        ("country_iso", bolt_str(&r.country_iso)),
        ("vaccine", bolt_str(&r.vaccine)),
        ("first_used", bolt_str(&r.first_used.to_string())),
    ])
}
