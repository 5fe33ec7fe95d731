//! RFV customer segmentation over purchase logs.
//!
//! Given a transaction table (customer id, purchase date, purchase id,
//! total value), this crate derives per-customer Recency, Frequency and
//! Value metrics, classifies each metric into quartile bands, combines
//! the bands into a three-letter score and maps known scores to a
//! recommended marketing action. Everything runs as a single in-memory
//! batch per uploaded file.

pub mod cache;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod report;
pub mod rfv;

pub use cache::ResultCache;
pub use error::RfvError;
pub use models::{Band, ClassifiedCustomer, RfvTable, Transaction};
