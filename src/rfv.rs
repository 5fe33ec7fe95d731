use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::info;

use crate::error::RfvError;
use crate::models::{
    Band, ClassifiedCustomer, CustomerFrequency, CustomerRecency, CustomerValue, QuartileTable,
    Quartiles, RfvRecord, RfvTable, Transaction,
};

/// Marketing action per RFV score. Scores outside this table get no action.
pub const ACTION_TABLE: [(&str, &str); 4] = [
    (
        "AAA",
        "Send discount coupons and ask the customer to refer a friend.",
    ),
    (
        "DDD",
        "Churn: low spend and few purchases, take no action.",
    ),
    (
        "DAA",
        "Churn: high spend and many purchases, send discount coupons to win them back.",
    ),
    (
        "CAA",
        "Churn: high spend and many purchases, send discount coupons to win them back.",
    ),
];

/// Newest purchase date across the whole log. Recency is measured
/// against this, never against the wall clock, so reruns over the same
/// file always agree.
pub fn reference_date(transactions: &[Transaction]) -> Option<NaiveDate> {
    transactions.iter().map(|t| t.purchase_date).max()
}

pub fn compute_recency(transactions: &[Transaction]) -> Vec<CustomerRecency> {
    let Some(reference) = reference_date(transactions) else {
        return Vec::new();
    };

    let mut last_purchase: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for t in transactions {
        let entry = last_purchase
            .entry(t.customer_id.as_str())
            .or_insert(t.purchase_date);
        if t.purchase_date > *entry {
            *entry = t.purchase_date;
        }
    }

    last_purchase
        .into_iter()
        .map(|(customer_id, last)| CustomerRecency {
            customer_id: customer_id.to_string(),
            days_since_last_purchase: (reference - last).num_days(),
        })
        .collect()
}

/// Every row counts; purchase ids are not deduplicated.
pub fn compute_frequency(transactions: &[Transaction]) -> Vec<CustomerFrequency> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for t in transactions {
        *counts.entry(t.customer_id.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(customer_id, purchase_count)| CustomerFrequency {
            customer_id: customer_id.to_string(),
            purchase_count,
        })
        .collect()
}

/// Refund rows carry negative totals and simply reduce the sum.
pub fn compute_value(transactions: &[Transaction]) -> Vec<CustomerValue> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for t in transactions {
        *totals.entry(t.customer_id.as_str()).or_insert(0.0) += t.total_value;
    }

    totals
        .into_iter()
        .map(|(customer_id, total_spent)| CustomerValue {
            customer_id: customer_id.to_string(),
            total_spent,
        })
        .collect()
}

/// Inner join on customer id. A customer missing from any one aggregate
/// is dropped from the result, matching the source system's merge
/// semantics. Output is ordered by customer id.
pub fn join_rfv(
    recency: &[CustomerRecency],
    frequency: &[CustomerFrequency],
    value: &[CustomerValue],
) -> Vec<RfvRecord> {
    let counts: BTreeMap<&str, u64> = frequency
        .iter()
        .map(|f| (f.customer_id.as_str(), f.purchase_count))
        .collect();
    let totals: BTreeMap<&str, f64> = value
        .iter()
        .map(|v| (v.customer_id.as_str(), v.total_spent))
        .collect();

    let mut records: Vec<RfvRecord> = recency
        .iter()
        .filter_map(|r| {
            let frequency = counts.get(r.customer_id.as_str())?;
            let value = totals.get(r.customer_id.as_str())?;
            Some(RfvRecord {
                customer_id: r.customer_id.clone(),
                recency_days: r.days_since_last_purchase,
                frequency: *frequency,
                value: *value,
            })
        })
        .collect();

    records.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    records
}

// Linear interpolation between closest ranks, over pre-sorted values.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

fn quartiles_of(mut values: Vec<f64>) -> Quartiles {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Quartiles {
        q25: percentile(&values, 0.25),
        q50: percentile(&values, 0.50),
        q75: percentile(&values, 0.75),
    }
}

/// Computes the 25th/50th/75th percentile thresholds for each metric
/// over the full customer population.
pub fn compute_quartiles(records: &[RfvRecord]) -> Result<QuartileTable, RfvError> {
    if records.is_empty() {
        return Err(RfvError::EmptyInput);
    }

    Ok(QuartileTable {
        recency: quartiles_of(records.iter().map(|r| r.recency_days as f64).collect()),
        frequency: quartiles_of(records.iter().map(|r| r.frequency as f64).collect()),
        value: quartiles_of(records.iter().map(|r| r.value).collect()),
    })
}

/// Lower recency is better. Boundary values belong to the lower-ranked
/// bucket.
pub fn classify_recency(value: f64, quartiles: &Quartiles) -> Band {
    if value <= quartiles.q25 {
        Band::A
    } else if value <= quartiles.q50 {
        Band::B
    } else if value <= quartiles.q75 {
        Band::C
    } else {
        Band::D
    }
}

/// Higher frequency or value is better. Same ≤ boundary rule as
/// [`classify_recency`].
pub fn classify_freq_or_value(value: f64, quartiles: &Quartiles) -> Band {
    if value <= quartiles.q25 {
        Band::D
    } else if value <= quartiles.q50 {
        Band::C
    } else if value <= quartiles.q75 {
        Band::B
    } else {
        Band::A
    }
}

pub fn score(r: Band, f: Band, v: Band) -> String {
    format!("{r}{f}{v}")
}

pub fn map_action(score: &str) -> Option<&'static str> {
    ACTION_TABLE
        .iter()
        .find(|(code, _)| *code == score)
        .map(|(_, action)| *action)
}

/// Runs the full pipeline: aggregate, join, compute quartiles, classify
/// and score every customer, attach actions. Fails up front on empty
/// input; otherwise returns one row per customer present in all three
/// aggregates, ordered by customer id.
pub fn segment(transactions: &[Transaction]) -> Result<RfvTable, RfvError> {
    let Some(reference_date) = reference_date(transactions) else {
        return Err(RfvError::EmptyInput);
    };

    let recency = compute_recency(transactions);
    let frequency = compute_frequency(transactions);
    let value = compute_value(transactions);
    let records = join_rfv(&recency, &frequency, &value);
    let quartiles = compute_quartiles(&records)?;

    let customers = records
        .into_iter()
        .map(|record| {
            let r_band = classify_recency(record.recency_days as f64, &quartiles.recency);
            let f_band = classify_freq_or_value(record.frequency as f64, &quartiles.frequency);
            let v_band = classify_freq_or_value(record.value, &quartiles.value);
            let rfv_score = score(r_band, f_band, v_band);
            let action = map_action(&rfv_score).map(str::to_string);
            ClassifiedCustomer {
                customer_id: record.customer_id,
                recency_days: record.recency_days,
                frequency: record.frequency,
                value: record.value,
                r_band,
                f_band,
                v_band,
                rfv_score,
                action,
            }
        })
        .collect::<Vec<_>>();

    info!(
        customers = customers.len(),
        reference = %reference_date,
        "segmentation complete"
    );

    Ok(RfvTable {
        reference_date,
        quartiles,
        customers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(customer: &str, date: &str, purchase: &str, value: f64) -> Transaction {
        Transaction {
            customer_id: customer.to_string(),
            purchase_id: purchase.to_string(),
            purchase_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            total_value: value,
        }
    }

    fn worked_example() -> Vec<Transaction> {
        vec![
            tx("C1", "2023-01-01", "O1", 100.0),
            tx("C1", "2023-01-10", "O2", 50.0),
            tx("C2", "2023-01-05", "O3", 200.0),
        ]
    }

    #[test]
    fn recency_measured_from_dataset_max() {
        let recency = compute_recency(&worked_example());
        assert_eq!(recency.len(), 2);
        assert_eq!(recency[0].customer_id, "C1");
        assert_eq!(recency[0].days_since_last_purchase, 0);
        assert_eq!(recency[1].customer_id, "C2");
        assert_eq!(recency[1].days_since_last_purchase, 5);
    }

    #[test]
    fn frequency_counts_every_row() {
        let frequency = compute_frequency(&worked_example());
        assert_eq!(frequency[0].purchase_count, 2);
        assert_eq!(frequency[1].purchase_count, 1);
    }

    #[test]
    fn value_sums_per_customer() {
        let value = compute_value(&worked_example());
        assert_eq!(value[0].total_spent, 150.0);
        assert_eq!(value[1].total_spent, 200.0);
    }

    #[test]
    fn refunds_reduce_the_sum() {
        let transactions = vec![
            tx("C1", "2023-01-01", "O1", 100.0),
            tx("C1", "2023-01-02", "O2", -30.0),
        ];
        let value = compute_value(&transactions);
        assert_eq!(value[0].total_spent, 70.0);
    }

    #[test]
    fn join_drops_customers_missing_from_any_aggregate() {
        let transactions = worked_example();
        let recency = compute_recency(&transactions);
        let mut frequency = compute_frequency(&transactions);
        let value = compute_value(&transactions);

        // Simulate an external filter removing C2 from one aggregate.
        frequency.retain(|f| f.customer_id != "C2");

        let records = join_rfv(&recency, &frequency, &value);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customer_id, "C1");
    }

    #[test]
    fn percentiles_interpolate_between_ranks() {
        let records: Vec<RfvRecord> = (1..=4i64)
            .map(|i| RfvRecord {
                customer_id: format!("C{i}"),
                recency_days: i * 10,
                frequency: i as u64,
                value: i as f64 * 100.0,
            })
            .collect();

        let table = compute_quartiles(&records).unwrap();
        // Values 10,20,30,40: pos(0.25)=0.75 -> 10 + 0.75*10.
        assert!((table.recency.q25 - 17.5).abs() < 1e-9);
        assert!((table.recency.q50 - 25.0).abs() < 1e-9);
        assert!((table.recency.q75 - 32.5).abs() < 1e-9);
        assert!((table.value.q50 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn quartiles_reject_empty_population() {
        assert!(matches!(
            compute_quartiles(&[]),
            Err(RfvError::EmptyInput)
        ));
    }

    #[test]
    fn boundary_values_fall_in_the_lower_bucket() {
        let q = Quartiles {
            q25: 10.0,
            q50: 20.0,
            q75: 30.0,
        };
        assert_eq!(classify_recency(10.0, &q), Band::A);
        assert_eq!(classify_recency(20.0, &q), Band::B);
        assert_eq!(classify_recency(30.0, &q), Band::C);
        assert_eq!(classify_recency(30.1, &q), Band::D);

        assert_eq!(classify_freq_or_value(10.0, &q), Band::D);
        assert_eq!(classify_freq_or_value(20.0, &q), Band::C);
        assert_eq!(classify_freq_or_value(30.0, &q), Band::B);
        assert_eq!(classify_freq_or_value(30.1, &q), Band::A);
    }

    #[test]
    fn score_concatenates_in_rfv_order() {
        assert_eq!(score(Band::A, Band::B, Band::C), "ABC");
    }

    #[test]
    fn known_scores_map_to_actions() {
        assert!(map_action("AAA").unwrap().contains("refer a friend"));
        assert!(map_action("DDD").is_some());
        assert!(map_action("DAA").is_some());
        assert!(map_action("CAA").is_some());
        assert_eq!(map_action("BBB"), None);
    }

    #[test]
    fn segment_runs_end_to_end() {
        let table = segment(&worked_example()).unwrap();
        assert_eq!(
            table.reference_date,
            NaiveDate::from_ymd_opt(2023, 1, 10).unwrap()
        );
        assert_eq!(table.customers.len(), 2);

        for customer in &table.customers {
            assert!(customer.recency_days >= 0);
            assert!(customer.frequency >= 1);
            assert_eq!(customer.rfv_score.len(), 3);
            assert!(customer
                .rfv_score
                .chars()
                .all(|c| matches!(c, 'A'..='D')));
        }

        let c1 = &table.customers[0];
        assert_eq!(c1.customer_id, "C1");
        assert_eq!(c1.recency_days, 0);
        assert_eq!(c1.frequency, 2);
        assert_eq!(c1.value, 150.0);
    }

    #[test]
    fn segment_rejects_empty_input() {
        assert!(matches!(segment(&[]), Err(RfvError::EmptyInput)));
    }

    #[test]
    fn segment_is_idempotent() {
        let transactions = worked_example();
        let first = segment(&transactions).unwrap();
        let second = segment(&transactions).unwrap();

        assert_eq!(first.reference_date, second.reference_date);
        assert_eq!(first.customers.len(), second.customers.len());
        for (a, b) in first.customers.iter().zip(second.customers.iter()) {
            assert_eq!(a.customer_id, b.customer_id);
            assert_eq!(a.rfv_score, b.rfv_score);
            assert_eq!(a.value, b.value);
        }
    }
}
