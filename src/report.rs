use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{ClassifiedCustomer, RfvTable};

const NO_ACTION_LABEL: &str = "no action defined";

fn sorted_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// Customers per RFV score, count descending then code ascending.
pub fn segment_counts(table: &RfvTable) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for customer in &table.customers {
        *counts.entry(customer.rfv_score.clone()).or_insert(0) += 1;
    }
    sorted_counts(counts)
}

/// Customers per recommended action, including the unmapped bucket.
pub fn action_counts(table: &RfvTable) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for customer in &table.customers {
        let label = customer
            .action
            .clone()
            .unwrap_or_else(|| NO_ACTION_LABEL.to_string());
        *counts.entry(label).or_insert(0) += 1;
    }
    sorted_counts(counts)
}

/// Best customers: lowest recency, highest frequency, highest value.
/// Sorted by total value descending.
pub fn top_best_customers(table: &RfvTable, limit: usize) -> Vec<&ClassifiedCustomer> {
    let mut best: Vec<&ClassifiedCustomer> = table
        .customers
        .iter()
        .filter(|c| c.rfv_score == "AAA")
        .collect();
    best.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    best.truncate(limit);
    best
}

pub fn build_report(table: &RfvTable) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# RFV Segmentation Report");
    let _ = writeln!(
        output,
        "Reference date (newest purchase in the dataset): {}",
        table.reference_date
    );
    let _ = writeln!(output, "Customers segmented: {}", table.customers.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Quartile Thresholds");
    for (metric, quartiles) in [
        ("Recency (days)", &table.quartiles.recency),
        ("Frequency", &table.quartiles.frequency),
        ("Value", &table.quartiles.value),
    ] {
        let _ = writeln!(
            output,
            "- {}: q25 {:.2}, q50 {:.2}, q75 {:.2}",
            metric, quartiles.q25, quartiles.q50, quartiles.q75
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Customers per RFV Group");
    for (code, count) in segment_counts(table) {
        let _ = writeln!(output, "- {code}: {count} customers");
    }

    let best = top_best_customers(table, 10);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top AAA Customers by Value");
    if best.is_empty() {
        let _ = writeln!(output, "No customers scored AAA in this dataset.");
    } else {
        for customer in best {
            let _ = writeln!(
                output,
                "- {} spent {:.2} across {} purchases (last purchase {} days ago)",
                customer.customer_id, customer.value, customer.frequency, customer.recency_days
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Actions");
    for (action, count) in action_counts(table) {
        let _ = writeln!(output, "- {action}: {count} customers");
    }

    output
}
