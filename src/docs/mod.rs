pub mod ingest;
pub mod types;

pub use ingest::ingest_bytes;
pub use types::Document;
