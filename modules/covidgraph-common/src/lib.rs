pub mod config;
pub mod error;
pub mod tables;

pub use config::Config;
pub use error::CovidGraphError;
pub use tables::*;
