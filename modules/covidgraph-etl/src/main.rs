use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use covidgraph_common::Config;
use covidgraph_etl::{output, sources, transform};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("covidgraph_etl=info".parse()?),
        )
        .init();

    info!("covidgraph extractor starting...");

    let config = Config::etl_from_env();
    let client = sources::http_client();

    let primary: Vec<sources::PrimaryRow> =
        sources::parse_rows(&sources::fetch_csv(&client, &config.covid_data_url).await?)?;
    let manufacturer: Vec<sources::ManufacturerRow> =
        sources::parse_rows(&sources::fetch_csv(&client, &config.manufacturer_data_url).await?)?;
    let override_rows: Vec<sources::OverrideRow> =
        sources::parse_rows(&sources::fetch_csv(&client, &config.override_data_url).await?)?;

    let (tables, ignored) = transform::build_tables(
        primary,
        manufacturer,
        override_rows,
        &config.override_location,
    );

    if !ignored.is_empty() {
        warn!(
            count = ignored.len(),
            names = ?ignored,
            "Entries ignored due to country matching failure"
        );
    }

    output::write_all(Path::new(&config.data_dir), &tables)?;

    info!(data_dir = config.data_dir.as_str(), "covidgraph extractor complete");
    Ok(())
}
