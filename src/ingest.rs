use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::error::RfvError;
use crate::models::Transaction;

pub const CUSTOMER_ID_COLUMN: &str = "ID_cliente";
pub const PURCHASE_DATE_COLUMN: &str = "DiaCompra";
pub const PURCHASE_ID_COLUMN: &str = "CodigoCompra";
pub const TOTAL_VALUE_COLUMN: &str = "ValorTotal";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a purchase-log file from disk and validates it.
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>, RfvError> {
    let bytes = std::fs::read(path)?;
    parse_transactions(&bytes)
}

/// Parses raw CSV bytes into validated transactions.
///
/// Column names are fixed and must match exactly. Every row must carry a
/// parseable date and a numeric total; the first bad row fails the whole
/// run, nothing is aggregated from a malformed file. A file with headers
/// but zero data rows is rejected as empty.
pub fn parse_transactions(bytes: &[u8]) -> Result<Vec<Transaction>, RfvError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize, RfvError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| RfvError::MissingColumn(name.to_string()))
    };
    let customer_idx = column(CUSTOMER_ID_COLUMN)?;
    let date_idx = column(PURCHASE_DATE_COLUMN)?;
    let purchase_idx = column(PURCHASE_ID_COLUMN)?;
    let value_idx = column(TOTAL_VALUE_COLUMN)?;

    let mut transactions = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        // 1-based file line, counting the header row.
        let row = i + 2;

        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let raw_date = field(date_idx);
        let purchase_date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|_| RfvError::InvalidDate {
                row,
                value: raw_date.to_string(),
            })?;

        let raw_value = field(value_idx);
        let total_value: f64 = raw_value.parse().map_err(|_| RfvError::InvalidValue {
            row,
            value: raw_value.to_string(),
        })?;

        transactions.push(Transaction {
            customer_id: field(customer_idx).to_string(),
            purchase_id: field(purchase_idx).to_string(),
            purchase_date,
            total_value,
        });
    }

    if transactions.is_empty() {
        return Err(RfvError::EmptyInput);
    }

    info!("loaded {} transactions", transactions.len());
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const VALID_CSV: &str = "\
ID_cliente,DiaCompra,CodigoCompra,ValorTotal
C1,2023-01-01,O1,100
C1,2023-01-10,O2,50
C2,2023-01-05,O3,200
";

    #[test]
    fn parses_valid_file() {
        let transactions = parse_transactions(VALID_CSV.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].customer_id, "C1");
        assert_eq!(transactions[0].purchase_id, "O1");
        assert_eq!(
            transactions[0].purchase_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
        assert_eq!(transactions[2].total_value, 200.0);
    }

    #[test]
    fn rejects_missing_column() {
        let csv = "ID_cliente,DiaCompra,ValorTotal\nC1,2023-01-01,100\n";
        let err = parse_transactions(csv.as_bytes()).unwrap_err();
        match err {
            RfvError::MissingColumn(name) => assert_eq!(name, "CodigoCompra"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unparsable_date() {
        let csv = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,01/02/2023,O1,100\n";
        let err = parse_transactions(csv.as_bytes()).unwrap_err();
        match err {
            RfvError::InvalidDate { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "01/02/2023");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_non_numeric_value() {
        let csv = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2023-01-01,O1,abc\n";
        let err = parse_transactions(csv.as_bytes()).unwrap_err();
        match err {
            RfvError::InvalidValue { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_file() {
        let csv = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n";
        let err = parse_transactions(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RfvError::EmptyInput));
    }

    #[test]
    fn accepts_negative_values() {
        let csv = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\nC1,2023-01-01,O1,-25.5\n";
        let transactions = parse_transactions(csv.as_bytes()).unwrap();
        assert_eq!(transactions[0].total_value, -25.5);
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID_CSV.as_bytes()).unwrap();
        let transactions = load_transactions(file.path()).unwrap();
        assert_eq!(transactions.len(), 3);
    }
}
