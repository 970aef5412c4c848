//! Monthly aggregated sales feed reader.
//!
//! The feed is a JSON array of month blocks. Field names follow the
//! upstream contract (`anio` / `mes` / `ventas`) and are mapped here to
//! the internal [`MonthlySales`] shape.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use starlift_shared::{EtlError, EtlResult};
use tracing::warn;

use crate::normalize::MonthlySales;

/// One month block as published by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlyBlock {
    #[serde(rename = "anio")]
    pub year: i32,
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "ventas")]
    pub sales: Vec<MonthlySaleEntry>,
}

/// One aggregated item line inside a month block.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthlySaleEntry {
    pub item: String,
    #[serde(rename = "cantidad")]
    pub quantity: Decimal,
    #[serde(rename = "precio")]
    pub unit_price_usd: Decimal,
}

/// Reads and flattens the monthly feed from disk.
///
/// Blocks with an out-of-range month (outside 1..=12) are skipped with a
/// warning; a file that fails to parse at all is a source error.
///
/// # Errors
///
/// Returns [`EtlError::Source`] when the file cannot be read or is not
/// valid JSON for the expected contract.
pub fn read_monthly_feed(path: &Path) -> EtlResult<Vec<MonthlySales>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| EtlError::Source(format!("cannot read monthly feed {}: {e}", path.display())))?;
    let blocks: Vec<MonthlyBlock> = serde_json::from_str(&raw)
        .map_err(|e| EtlError::Source(format!("monthly feed {}: {e}", path.display())))?;
    Ok(flatten_blocks(blocks))
}

/// Flattens month blocks into per-item monthly sales rows.
pub fn flatten_blocks(blocks: Vec<MonthlyBlock>) -> Vec<MonthlySales> {
    let mut out = Vec::new();
    for block in blocks {
        if !(1..=12).contains(&block.month) {
            warn!(year = block.year, month = block.month, "skipping month block with invalid month");
            continue;
        }
        for entry in block.sales {
            out.push(MonthlySales {
                year: block.year,
                month: block.month,
                item_code: entry.item,
                quantity: entry.quantity,
                unit_price_usd: entry.unit_price_usd,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_upstream_field_names() {
        let json = r#"[
            {"anio": 2025, "mes": 1, "ventas": [
                {"item": "A001", "cantidad": 10, "precio": 50.0},
                {"item": "B002", "cantidad": 3.5, "precio": 12.25}
            ]},
            {"anio": 2025, "mes": 2, "ventas": [
                {"item": "A001", "cantidad": 7, "precio": 50.0}
            ]}
        ]"#;
        let blocks: Vec<MonthlyBlock> = serde_json::from_str(json).unwrap();
        let rows = flatten_blocks(blocks);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].year, 2025);
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[0].item_code, "A001");
        assert_eq!(rows[0].quantity, dec!(10));
        assert_eq!(rows[1].quantity, dec!(3.5));
        assert_eq!(rows[1].unit_price_usd, dec!(12.25));
        assert_eq!(rows[2].month, 2);
    }

    #[test]
    fn test_invalid_month_block_is_skipped() {
        let json = r#"[
            {"anio": 2025, "mes": 13, "ventas": [{"item": "X", "cantidad": 1, "precio": 1}]},
            {"anio": 2025, "mes": 3, "ventas": [{"item": "Y", "cantidad": 2, "precio": 2}]}
        ]"#;
        let blocks: Vec<MonthlyBlock> = serde_json::from_str(json).unwrap();
        let rows = flatten_blocks(blocks);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].item_code, "Y");
    }

    #[test]
    fn test_garbage_file_is_a_source_error() {
        let dir = std::env::temp_dir().join("starlift-aggregate-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_monthly_feed(&path),
            Err(EtlError::Source(_))
        ));
    }
}
