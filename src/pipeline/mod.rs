pub mod export;
pub mod ingestion;
pub mod processing;
