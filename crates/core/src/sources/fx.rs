//! FX rate workbook reader.
//!
//! The workbook carries tabular rows of (date, USD→local rate). Header
//! names are matched case- and space-insensitively and the legacy
//! `TipoCambio_USD_CRC` header is accepted. Malformed or out-of-range rows
//! are skipped with a warning, never fatal.

use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use starlift_shared::{EtlError, EtlResult};
use tracing::warn;

/// One FX rate observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FxRateRow {
    /// Observation date (time-dimension business key).
    pub date: NaiveDate,
    /// USD→local rate; always positive.
    pub rate: Decimal,
}

/// Parsed FX workbook: usable rows plus the count of skipped ones.
#[derive(Debug, Clone, Default)]
pub struct FxSheet {
    /// Valid rate rows in sheet order.
    pub rows: Vec<FxRateRow>,
    /// Rows skipped as malformed or out of range.
    pub skipped: usize,
}

/// Reads the FX workbook from disk.
///
/// Uses the named worksheet when `sheet` is given, otherwise the first one.
///
/// # Errors
///
/// Returns [`EtlError::Source`] when the file cannot be opened, the sheet
/// is missing, or no usable header row is found.
pub fn read_fx_workbook(path: &Path, sheet: Option<&str>) -> EtlResult<FxSheet> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| EtlError::Source(format!("cannot open FX workbook {}: {e}", path.display())))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| EtlError::Source(format!("worksheet '{name}': {e}")))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| EtlError::Source("FX workbook has no worksheets".into()))?
            .map_err(|e| EtlError::Source(format!("first worksheet: {e}")))?,
    };

    parse_fx_range(&range)
}

/// Parses a worksheet range into FX rows. Split out for testing.
///
/// # Errors
///
/// Returns [`EtlError::Source`] when the header row lacks a recognizable
/// date or rate column.
pub fn parse_fx_range(range: &Range<Data>) -> EtlResult<FxSheet> {
    let mut rows_iter = range.rows();
    let header = rows_iter
        .next()
        .ok_or_else(|| EtlError::Source("FX worksheet is empty".into()))?;

    let (date_col, rate_col) = locate_columns(header)?;

    let mut sheet = FxSheet::default();
    for row in rows_iter {
        match parse_row(row, date_col, rate_col) {
            Some(parsed) => sheet.rows.push(parsed),
            None => {
                // Fully blank rows at the tail are not worth a warning.
                if row.iter().any(|c| !matches!(c, Data::Empty)) {
                    warn!(?row, "skipping malformed FX rate row");
                    sheet.skipped += 1;
                }
            }
        }
    }
    Ok(sheet)
}

fn locate_columns(header: &[Data]) -> EtlResult<(usize, usize)> {
    let mut date_col = None;
    let mut rate_col = None;

    for (idx, cell) in header.iter().enumerate() {
        let Data::String(raw) = cell else { continue };
        let name = raw.trim().to_lowercase().replace(' ', "_");
        match name.as_str() {
            "date" | "fecha" => date_col = date_col.or(Some(idx)),
            "rate" | "fx_usd_local" | "tc_usd_crc" | "tipocambio_usd_crc" => {
                rate_col = rate_col.or(Some(idx));
            }
            _ if name.starts_with("tipocambio") || name.starts_with("tc_") => {
                rate_col = rate_col.or(Some(idx));
            }
            _ => {}
        }
    }

    match (date_col, rate_col) {
        (Some(d), Some(r)) => Ok((d, r)),
        _ => Err(EtlError::Source(
            "FX worksheet header has no recognizable date/rate columns".into(),
        )),
    }
}

fn parse_row(row: &[Data], date_col: usize, rate_col: usize) -> Option<FxRateRow> {
    let date = parse_date(row.get(date_col)?)?;
    let rate = parse_rate(row.get(rate_col)?)?;
    (rate > Decimal::ZERO).then_some(FxRateRow { date, rate })
}

fn parse_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.date()),
        Data::DateTimeIso(s) => s.get(..10).and_then(|d| d.parse().ok()),
        Data::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
                .ok()
        }
        _ => None,
    }
}

fn parse_rate(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Float(f) => Decimal::try_from(*f).ok(),
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn range_of(cells: Vec<Vec<Data>>) -> Range<Data> {
        let mut range = Range::new(
            (0, 0),
            (cells.len() as u32 - 1, cells[0].len() as u32 - 1),
        );
        for (r, row) in cells.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    #[test]
    fn test_parses_legacy_header_and_string_dates() {
        let range = range_of(vec![
            vec![
                Data::String("Fecha".into()),
                Data::String("TipoCambio_USD_CRC".into()),
            ],
            vec![Data::String("2025-01-10".into()), Data::Float(530.25)],
            vec![Data::String("11/01/2025".into()), Data::String("531.00".into())],
        ]);

        let sheet = parse_fx_range(&range).unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.skipped, 0);
        assert_eq!(
            sheet.rows[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
        assert_eq!(sheet.rows[0].rate, dec!(530.25));
        assert_eq!(
            sheet.rows[1].date,
            NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()
        );
        assert_eq!(sheet.rows[1].rate, dec!(531.00));
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() {
        let range = range_of(vec![
            vec![Data::String("date".into()), Data::String("rate".into())],
            vec![Data::String("not-a-date".into()), Data::Float(530.0)],
            vec![Data::String("2025-01-12".into()), Data::Float(-1.0)],
            vec![Data::String("2025-01-13".into()), Data::Float(532.5)],
            vec![Data::Empty, Data::Empty],
        ]);

        let sheet = parse_fx_range(&range).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].rate, dec!(532.5));
        // The blank tail row is ignored; the two bad rows are counted.
        assert_eq!(sheet.skipped, 2);
    }

    #[test]
    fn test_unrecognizable_header_is_an_error() {
        let range = range_of(vec![vec![
            Data::String("foo".into()),
            Data::String("bar".into()),
        ]]);
        assert!(matches!(
            parse_fx_range(&range),
            Err(EtlError::Source(_))
        ));
    }
}
