use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use covidgraph_common::Config;
use covidgraph_graph::{migrate::ensure_indexes, GraphClient, GraphLoader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("covidgraph_load=info".parse()?)
                .add_directive("covidgraph_graph=info".parse()?),
        )
        .init();

    info!("covidgraph loader starting...");

    let config = Config::loader_from_env();

    let client =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await?;

    ensure_indexes(&client).await?;

    let loader = GraphLoader::new(client);
    loader.load_dir(Path::new(&config.data_dir)).await?;

    info!("Data successfully loaded into Neo4j");
    Ok(())
}
