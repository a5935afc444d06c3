use neo4rs::{ConfigBuilder, Graph};

/// Connection handle shared by the index migration and the batched loader.
///
/// This pipeline is a single sequential writer, so the pool is kept small;
/// batching does the throughput work, not connection parallelism.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Open a bolt connection to Neo4j.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .max_connections(4)
            .build()
            .unwrap();
        let graph = Graph::connect(config).await?;
        Ok(Self { graph })
    }

    /// Access the underlying neo4rs Graph, e.g. for ad-hoc queries in tests.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
