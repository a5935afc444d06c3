use neo4rs::query;
use tracing::info;

use crate::GraphClient;

/// Ensure lookup indexes exist on each node type's natural key.
/// `IF NOT EXISTS` makes this safe to run on every load.
pub async fn ensure_indexes(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS FOR (c:Country) ON (c.iso3)",
        "CREATE INDEX IF NOT EXISTS FOR (cc:CovidCase) ON (cc.id)",
        "CREATE INDEX IF NOT EXISTS FOR (vs:VaccinationStats) ON (vs.id)",
        "CREATE INDEX IF NOT EXISTS FOR (v:Vaccine) ON (v.name)",
    ];

    for idx in &indexes {
        g.run(query(idx)).await?;
    }
    info!("Natural-key indexes ensured");

    Ok(())
}
