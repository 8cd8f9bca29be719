// TD Ameritrade gain/loss export
//
// The export provides already-reconciled transactions: each buy/sell pair
// comes in a single record, on a single line.
//
// Does not handle dividends, short sales, or partial lot sales.

use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::BrokerAdapter;
use crate::diagnostics::DiagnosticsSink;
use crate::schema::{field, parse_date_mdy, parse_dollar, RowSchema};
use crate::transaction::{EntryCode, Transaction};
use crate::txf::txf_date;

pub(super) const FIRST_LINE: &str = "Security,Trans type,Qty,Open date,Adj cost,\
Close date,Adj proceeds,Adj gain($),Adj gain(%),Term";

/// First field of the summary row that terminates the data section.
const TOTAL_SENTINEL: &str = "Total:";

/// Column indices resolved once from the header row.
struct Columns {
    security: usize,
    qty: usize,
    open_date: usize,
    adj_cost: usize,
    close_date: usize,
    adj_proceeds: usize,
    term: usize,
}

impl Columns {
    fn resolve(schema: &RowSchema) -> Result<Self> {
        Ok(Columns {
            security: schema.index_of("Security")?,
            qty: schema.index_of("Qty")?,
            open_date: schema.index_of("Open date")?,
            adj_cost: schema.index_of("Adj cost")?,
            close_date: schema.index_of("Close date")?,
            adj_proceeds: schema.index_of("Adj proceeds")?,
            term: schema.index_of("Term")?,
        })
    }
}

/// Extracts the ticker from the trailing parenthesized portion of the
/// security description, e.g. `"Apple Inc (AAPL)"` -> `AAPL`.
fn symbol(security: &str) -> Result<&str> {
    security
        .trim_end()
        .strip_suffix(')')
        .and_then(|s| s.rfind('(').map(|open| &s[open + 1..]))
        .ok_or_else(|| anyhow!("security symbol not found in: \"{security}\""))
}

#[derive(Debug)]
pub struct TdAmeritrade;

impl BrokerAdapter for TdAmeritrade {
    fn name(&self) -> &'static str {
        "TD Ameritrade"
    }

    fn detect(&self, first_line: &str) -> Option<bool> {
        Some(first_line == FIRST_LINE)
    }

    fn parse(
        &self,
        content: &str,
        tax_year: Option<i32>,
        diags: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<Transaction>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut records = reader.records();

        let header = match records.next() {
            Some(header) => header.context("failed to read header row")?,
            None => return Ok(Vec::new()),
        };
        let cols = Columns::resolve(&RowSchema::from_header(&header))?;

        let mut txn_list = Vec::new();
        for (index, record) in records.enumerate() {
            let line_num = index + 2;
            let record = record.with_context(|| format!("failed to read line {line_num}"))?;

            let security = field(&record, cols.security);
            if security == TOTAL_SENTINEL {
                // Summary line; the data section is over.
                break;
            }

            let qty = Decimal::from_str(field(&record, cols.qty).trim())
                .with_context(|| format!("invalid share count on line {line_num}"))?;
            let desc = format!("{} shares {}", qty, symbol(security)?);

            let buy_date = parse_date_mdy(field(&record, cols.open_date))
                .with_context(|| format!("line {line_num}"))?;
            let sell_date = parse_date_mdy(field(&record, cols.close_date))
                .with_context(|| format!("line {line_num}"))?;
            let cost_basis = parse_dollar(field(&record, cols.adj_cost))
                .with_context(|| format!("line {line_num}"))?;
            let sale_proceeds = parse_dollar(field(&record, cols.adj_proceeds))
                .with_context(|| format!("line {line_num}"))?;

            // The export labels each lot's term; trust it rather than
            // recomputing the holding period.
            let entry_code = if field(&record, cols.term) == "Short-term" {
                EntryCode::ShortTerm
            } else {
                EntryCode::LongTerm
            };

            let txn = Transaction {
                desc,
                buy_date: Some(buy_date),
                buy_date_display: txf_date(buy_date),
                sell_date: Some(sell_date),
                sell_date_display: txf_date(sell_date),
                cost_basis,
                sale_proceeds,
                adjustment: None,
                entry_code,
            };
            txn.validate()?;

            if let Some(year) = tax_year {
                if sell_date.year() != year {
                    diags.warn(&format!(
                        "ignoring txn \"{}\" (line {line_num}) as the sale is not from {year}",
                        txn.desc
                    ));
                    continue;
                }
            }

            txn_list.push(txn);
        }

        Ok(txn_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectedDiagnostics;
    use rust_decimal_macros::dec;

    fn sample() -> String {
        format!(
            "{FIRST_LINE}\n\
             \"Apple Inc (AAPL)\",Sell,100,01/04/2010,\"1,000.00\",01/05/2011,\"1,200.00\",200.00,20.00,Long-term\n\
             \"Vanguard Total Stock Market ETF (VTI)\",Sell,50,02/01/2012,500.00,03/01/2012,450.00,-50.00,-10.00,Short-term\n\
             Total:,,,,,,,,,\n\
             \"should never be read\",Sell,1,bad,bad,bad,bad,,,\n"
        )
    }

    #[test]
    fn test_detect_first_line() {
        assert_eq!(TdAmeritrade.detect(FIRST_LINE), Some(true));
        assert_eq!(TdAmeritrade.detect("Security,Qty"), Some(false));
    }

    #[test]
    fn test_parse_all_years() {
        let mut diags = CollectedDiagnostics::new();
        let txns = TdAmeritrade.parse(&sample(), None, &mut diags).unwrap();
        assert_eq!(txns.len(), 2);
        assert!(diags.is_empty());

        assert_eq!(txns[0].desc, "100 shares AAPL");
        assert_eq!(txns[0].buy_date_display, "01/04/2010");
        assert_eq!(txns[0].sell_date_display, "01/05/2011");
        assert_eq!(txns[0].cost_basis, dec!(1000.00));
        assert_eq!(txns[0].sale_proceeds, dec!(1200.00));
        assert_eq!(txns[0].adjustment, None);
        assert_eq!(txns[0].entry_code, EntryCode::LongTerm);

        assert_eq!(txns[1].desc, "50 shares VTI");
        assert_eq!(txns[1].entry_code, EntryCode::ShortTerm);
    }

    #[test]
    fn test_parse_stops_at_total_sentinel() {
        // The garbage row after Total: would fail to parse if it were
        // reached.
        let mut diags = CollectedDiagnostics::new();
        assert!(TdAmeritrade.parse(&sample(), None, &mut diags).is_ok());
    }

    #[test]
    fn test_year_filter_drops_other_years_with_a_warning() {
        let mut diags = CollectedDiagnostics::new();
        let txns = TdAmeritrade
            .parse(&sample(), Some(2011), &mut diags)
            .unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].desc, "100 shares AAPL");
        assert_eq!(diags.len(), 1);
        assert!(diags.warnings()[0].contains("50 shares VTI"));
        assert!(diags.warnings()[0].contains("not from 2011"));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let mut diags = CollectedDiagnostics::new();
        let first = TdAmeritrade.parse(&sample(), Some(2011), &mut diags).unwrap();
        let second = TdAmeritrade.parse(&sample(), Some(2011), &mut diags).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parsed_transactions_round_trip_through_the_serializer() {
        let mut diags = CollectedDiagnostics::new();
        let txns = TdAmeritrade.parse(&sample(), None, &mut diags).unwrap();
        let report_date = chrono::NaiveDate::from_ymd_opt(2012, 4, 15).unwrap();
        let lines = crate::txf::render(&txns, report_date);
        assert!(lines.contains(&"P100 shares AAPL".to_string()));
        assert!(lines.contains(&"D01/04/2010".to_string()));
        assert!(lines.contains(&"D01/05/2011".to_string()));
        assert!(lines.contains(&"$1000.00".to_string()));
        assert!(lines.contains(&"$1200.00".to_string()));
        // No adjustments were parsed, so no block carries a third dollar
        // line.
        let dollar_lines = lines.iter().filter(|line| line.starts_with('$')).count();
        assert_eq!(dollar_lines, txns.len() * 2);
    }

    #[test]
    fn test_missing_symbol_pattern_is_a_fault() {
        let content = format!(
            "{FIRST_LINE}\n\
             No Ticker Here,Sell,100,01/04/2010,1000.00,01/05/2011,1200.00,200.00,20.00,Long-term\n"
        );
        let mut diags = CollectedDiagnostics::new();
        let err = TdAmeritrade.parse(&content, None, &mut diags).unwrap_err();
        assert!(err.to_string().contains("symbol not found"));
    }

    #[test]
    fn test_sell_before_buy_is_a_fault() {
        let content = format!(
            "{FIRST_LINE}\n\
             \"Apple Inc (AAPL)\",Sell,100,01/05/2011,1000.00,01/04/2010,1200.00,200.00,20.00,Short-term\n"
        );
        let mut diags = CollectedDiagnostics::new();
        let err = TdAmeritrade.parse(&content, None, &mut diags).unwrap_err();
        assert!(err.to_string().contains("on or after buy date"));
    }

    #[test]
    fn test_missing_column_is_reported_before_any_row() {
        let content = "Security,Trans type,Open date\nsomething,Sell,01/04/2010\n";
        let mut diags = CollectedDiagnostics::new();
        let err = TdAmeritrade.parse(content, None, &mut diags).unwrap_err();
        assert!(err.to_string().contains("\"Qty\""));
    }
}
