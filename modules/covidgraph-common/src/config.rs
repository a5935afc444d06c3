use std::env;

/// Primary case/vaccination series (Our World in Data).
pub const DEFAULT_COVID_DATA_URL: &str =
    "https://covid.ourworldindata.org/data/owid-covid-data.csv";

/// Manufacturer-level vaccination series.
pub const DEFAULT_MANUFACTURER_DATA_URL: &str =
    "https://covid.ourworldindata.org/data/vaccinations/vaccinations-by-manufacturer.csv";

/// Country-specific manual-override series, merged into the manufacturer data.
pub const DEFAULT_OVERRIDE_DATA_URL: &str =
    "https://covid.ourworldindata.org/data/vaccinations/country_data/Brazil.csv";

/// Country label stamped on every exploded override row.
pub const DEFAULT_OVERRIDE_LOCATION: &str = "Brazil";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Intermediate table directory, shared by both stages
    pub data_dir: String,

    // Remote sources
    pub covid_data_url: String,
    pub manufacturer_data_url: String,
    pub override_data_url: String,
    pub override_location: String,
}

impl Config {
    /// Load configuration for the extractor. No Neo4j vars needed.
    pub fn etl_from_env() -> Self {
        Self {
            neo4j_uri: String::new(),
            neo4j_user: String::new(),
            neo4j_password: String::new(),
            data_dir: env_or("DATA_DIR", "data"),
            covid_data_url: env_or("COVID_DATA_URL", DEFAULT_COVID_DATA_URL),
            manufacturer_data_url: env_or(
                "MANUFACTURER_DATA_URL",
                DEFAULT_MANUFACTURER_DATA_URL,
            ),
            override_data_url: env_or("OVERRIDE_DATA_URL", DEFAULT_OVERRIDE_DATA_URL),
            override_location: env_or("OVERRIDE_LOCATION", DEFAULT_OVERRIDE_LOCATION),
        }
    }

    /// Load configuration for the loader.
    /// Panics with a clear message if required vars are missing.
    pub fn loader_from_env() -> Self {
        Self {
            neo4j_uri: required_env("NEO4J_URI"),
            neo4j_user: required_env("NEO4J_USER"),
            neo4j_password: required_env("NEO4J_PASSWORD"),
            data_dir: env_or("DATA_DIR", "data"),
            covid_data_url: String::new(),
            manufacturer_data_url: String::new(),
            override_data_url: String::new(),
            override_location: String::new(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
