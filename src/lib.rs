pub mod analytics;
pub mod config;
pub mod error;
pub mod history;
pub mod ingest;
pub mod process;
pub mod schema;

pub use config::IngestConfig;
pub use error::IngestError;
pub use ingest::{run_ingest, IngestSummary};
