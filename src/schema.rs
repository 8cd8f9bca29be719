// Row shape layer
// Column layouts are validated once per file, then data rows are addressed
// by resolved index instead of per-row name lookups. A missing column is a
// format fault reported before any data row is scanned.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Column layout derived from a file's column-name header row.
#[derive(Debug)]
pub struct RowSchema {
    columns: Vec<String>,
}

impl RowSchema {
    pub fn from_header(header: &StringRecord) -> Self {
        RowSchema {
            columns: header.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Resolves a column name to its field index.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| anyhow!("column \"{name}\" not found in header"))
    }
}

/// Reads one field of a data row. Fields past the end of a ragged row read
/// as empty.
pub fn field<'r>(record: &'r StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("")
}

/// Parses a dollar amount, tolerating thousands-separator commas, stray
/// quote characters, and a `$` prefix. The decimal separator is always `.`.
pub fn parse_dollar(value: &str) -> Result<Decimal> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$'))
        .collect();
    Decimal::from_str(&cleaned).with_context(|| format!("invalid dollar amount: \"{value}\""))
}

/// `MM/DD/YYYY` — the date format used by the gain/loss exports.
pub fn parse_date_mdy(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%m/%d/%Y")
        .with_context(|| format!("invalid MM/DD/YYYY date: \"{value}\""))
}

/// `YYYY-MM-DD` — the date format used by the trade-activity exports.
pub fn parse_date_ymd(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid YYYY-MM-DD date: \"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn header(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn test_index_of_resolves_columns() {
        let schema = RowSchema::from_header(&header(&["Security", "Qty", "Term"]));
        assert_eq!(schema.index_of("Security").unwrap(), 0);
        assert_eq!(schema.index_of("Term").unwrap(), 2);
    }

    #[test]
    fn test_index_of_missing_column_names_the_column() {
        let schema = RowSchema::from_header(&header(&["Security", "Qty"]));
        let err = schema.index_of("Term").unwrap_err();
        assert!(err.to_string().contains("\"Term\""));
    }

    #[test]
    fn test_field_reads_past_end_as_empty() {
        let record = StringRecord::from(vec!["a", "b"]);
        assert_eq!(field(&record, 1), "b");
        assert_eq!(field(&record, 5), "");
    }

    #[test]
    fn test_parse_dollar_strips_thousands_separators() {
        assert_eq!(parse_dollar("1,234.56").unwrap(), dec!(1234.56));
    }

    #[test]
    fn test_parse_dollar_strips_quotes_and_dollar_sign() {
        assert_eq!(parse_dollar("\"2,500.50\"").unwrap(), dec!(2500.50));
        assert_eq!(parse_dollar("$0.00").unwrap(), dec!(0.00));
        assert_eq!(parse_dollar("-$855.94").unwrap(), dec!(-855.94));
    }

    #[test]
    fn test_parse_dollar_rejects_garbage() {
        let err = parse_dollar("n/a").unwrap_err();
        assert!(err.to_string().contains("invalid dollar amount"));
    }

    #[test]
    fn test_parse_date_mdy() {
        let date = parse_date_mdy("01/04/2010").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2010, 1, 4).unwrap());
        assert!(parse_date_mdy("2010-01-04").is_err());
    }

    #[test]
    fn test_parse_date_ymd() {
        let date = parse_date_ymd("2010-01-04").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2010, 1, 4).unwrap());
        assert!(parse_date_ymd("01/04/2010").is_err());
    }
}
