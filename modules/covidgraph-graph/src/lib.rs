pub mod client;
pub mod loader;
pub mod migrate;
#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use loader::GraphLoader;
pub use neo4rs::query;
