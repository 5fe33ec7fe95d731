use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RfvError;
use crate::models::{Band, RfvTable};

/// One exported row. Field names match the download format of the
/// original analysis page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub customer_id: String,
    #[serde(rename = "Recencia")]
    pub recency_days: i64,
    #[serde(rename = "Frequencia")]
    pub frequency: u64,
    #[serde(rename = "Valor")]
    pub value: f64,
    #[serde(rename = "R_Quartile")]
    pub r_quartile: Band,
    #[serde(rename = "F_Quartile")]
    pub f_quartile: Band,
    #[serde(rename = "V_Quartile")]
    pub v_quartile: Band,
    #[serde(rename = "RFV_Score")]
    pub rfv_score: String,
    /// Empty in the file when the score maps to no action.
    pub recommended_action: Option<String>,
}

fn rows(table: &RfvTable) -> impl Iterator<Item = ExportRow> + '_ {
    table.customers.iter().map(|c| ExportRow {
        customer_id: c.customer_id.clone(),
        recency_days: c.recency_days,
        frequency: c.frequency,
        value: c.value,
        r_quartile: c.r_band,
        f_quartile: c.f_band,
        v_quartile: c.v_band,
        rfv_score: c.rfv_score.clone(),
        recommended_action: c.action.clone(),
    })
}

pub fn write_csv<W: io::Write>(table: &RfvTable, writer: W) -> Result<(), RfvError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows(table) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(table: &RfvTable) -> Result<Vec<u8>, RfvError> {
    let mut bytes = Vec::new();
    write_csv(table, &mut bytes)?;
    Ok(bytes)
}

pub fn write_csv_file(table: &RfvTable, path: &Path) -> Result<(), RfvError> {
    let file = std::fs::File::create(path)?;
    write_csv(table, file)?;
    info!(path = %path.display(), customers = table.customers.len(), "wrote classified table");
    Ok(())
}

/// Reads a previously exported table back in. The engine never consumes
/// this format itself; downstream tools and the round-trip check do.
pub fn read_classified<R: io::Read>(reader: R) -> Result<Vec<ExportRow>, RfvError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize::<ExportRow>() {
        rows.push(result?);
    }
    Ok(rows)
}
