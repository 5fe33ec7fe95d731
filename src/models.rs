use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the uploaded purchase log.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub customer_id: String,
    pub purchase_id: String,
    pub purchase_date: NaiveDate,
    pub total_value: f64,
}

#[derive(Debug, Clone)]
pub struct CustomerRecency {
    pub customer_id: String,
    /// Whole days between the dataset's newest purchase date and this
    /// customer's newest purchase date. Zero when they coincide.
    pub days_since_last_purchase: i64,
}

#[derive(Debug, Clone)]
pub struct CustomerFrequency {
    pub customer_id: String,
    pub purchase_count: u64,
}

#[derive(Debug, Clone)]
pub struct CustomerValue {
    pub customer_id: String,
    pub total_spent: f64,
}

/// Inner join of the three aggregates on customer id.
#[derive(Debug, Clone)]
pub struct RfvRecord {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: u64,
    pub value: f64,
}

/// Quartile letter for a single metric. `A` is always the best bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    A,
    B,
    C,
    D,
}

impl Band {
    pub fn as_char(self) -> char {
        match self {
            Band::A => 'A',
            Band::B => 'B',
            Band::C => 'C',
            Band::D => 'D',
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// 25th/50th/75th percentile thresholds for one metric.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Quartiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

/// Thresholds for all three metrics, computed once per run over the
/// full customer population.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuartileTable {
    pub recency: Quartiles,
    pub frequency: Quartiles,
    pub value: Quartiles,
}

#[derive(Debug, Clone)]
pub struct ClassifiedCustomer {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: u64,
    pub value: f64,
    pub r_band: Band,
    pub f_band: Band,
    pub v_band: Band,
    /// Three letters, fixed order R then F then V.
    pub rfv_score: String,
    /// Absent when the score has no entry in the action table.
    pub action: Option<String>,
}

/// Complete result of one segmentation run.
#[derive(Debug, Clone)]
pub struct RfvTable {
    /// Newest purchase date in the input, the reference for recency.
    pub reference_date: NaiveDate,
    pub quartiles: QuartileTable,
    /// One entry per customer, ordered by customer id.
    pub customers: Vec<ClassifiedCustomer>,
}
