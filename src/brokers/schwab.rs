// Charles Schwab 1099-B composite export
//
// The export provides already-reconciled transactions: each buy/sell pair
// comes in a single record, on a single line. Only lots carrying a wash
// sale disallowed amount are converted; the remaining lots need no
// adjustment and are covered by the broker's own 1099-B filing.
//
// Does not handle dividends, short sales, or partial lot sales.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use rust_decimal::Decimal;

use super::BrokerAdapter;
use crate::diagnostics::DiagnosticsSink;
use crate::schema::{field, parse_date_mdy, parse_dollar, RowSchema};
use crate::transaction::{EntryCode, Transaction};
use crate::txf::txf_date;

pub(super) const FIRST_LINE: &str = "Description of property (Example 100 sh. XYZ Co.),\
Date acquired,Date sold or disposed,Proceeds,Cost or other basis,\
Accrued market discount,Wash sale loss disallowed,\
Short-Term gain loss Long-term gain or loss Ordinary,Form 8949 Code,\
Check if proceeds from collectibles QOF,Federal income tax withheld,\
Check if noncovered security,Reported to IRS: Gross proceeds Net proceeds,\
Check if loss is not allowed based on amount in 1d,\
Profit or (loss) realized in 2020 on closed contracts,\
Unrealized profit or (loss) on open contracts-12/31/2019,\
Unrealized profit or (loss) on open contracts-12/31/2020,\
Aggregate profit or (loss) on contracts,Check if basis reported to IRS,\
Bartering,State name,State identification no,State Tax Withheld";

const DESCRIPTION_COLUMN: &str = "Description of property (Example 100 sh. XYZ Co.)";

/// Marker the export uses for aggregated lots without an exact date.
const VARIOUS: &str = "Various";

/// Label the export uses for short-term lots.
const SHORT_TERM_LABEL: &str = "Short Term";

/// Column indices resolved once from the header row.
struct Columns {
    description: usize,
    date_acquired: usize,
    date_sold: usize,
    proceeds: usize,
    cost_basis: usize,
    wash_sale: usize,
    term: usize,
}

impl Columns {
    fn resolve(schema: &RowSchema) -> Result<Self> {
        Ok(Columns {
            description: schema.index_of(DESCRIPTION_COLUMN)?,
            date_acquired: schema.index_of("Date acquired")?,
            date_sold: schema.index_of("Date sold or disposed")?,
            proceeds: schema.index_of("Proceeds")?,
            cost_basis: schema.index_of("Cost or other basis")?,
            wash_sale: schema.index_of("Wash sale loss disallowed")?,
            term: schema.index_of("Short-Term gain loss Long-term gain or loss Ordinary")?,
        })
    }
}

/// A source date cell: an exact date, or the `Various` marker.
enum SourceDate {
    Exact(NaiveDate),
    Various,
}

impl SourceDate {
    fn parse(value: &str) -> Result<Self> {
        if value.trim() == VARIOUS {
            Ok(SourceDate::Various)
        } else {
            Ok(SourceDate::Exact(parse_date_mdy(value)?))
        }
    }

    fn known(&self) -> Option<NaiveDate> {
        match self {
            SourceDate::Exact(date) => Some(*date),
            SourceDate::Various => None,
        }
    }

    fn display(&self) -> String {
        match self {
            SourceDate::Exact(date) => txf_date(*date),
            SourceDate::Various => VARIOUS.to_string(),
        }
    }

    /// Date used for the tax-year filter only; an aggregated lot falls
    /// back to a synthetic date inside the form year.
    fn filter_date(&self, fallback: NaiveDate) -> NaiveDate {
        self.known().unwrap_or(fallback)
    }
}

/// Wash-sale disallowed amount. `None` when the cell is empty or zero; a
/// present-but-zero amount counts as absent.
fn wash_sale_disallowed(value: &str) -> Result<Option<Decimal>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let amount = parse_dollar(value)?;
    Ok(if amount.is_zero() { None } else { Some(amount) })
}

/// Filter stand-in for a `Various` sale date: late in the form year, so
/// the tax-year filter sees the aggregated lot as inside it. Only the sale
/// year participates in filtering; the canonical record keeps the date
/// unknown.
fn various_sale_fallback() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 12, 30).expect("valid calendar date")
}

#[derive(Debug)]
pub struct Schwab;

impl BrokerAdapter for Schwab {
    fn name(&self) -> &'static str {
        "Charles Schwab"
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
        let sell_fallback = various_sale_fallback();

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

            let desc = field(&record, cols.description);
            if desc.is_empty() {
                // Summary line; the data section is over.
                break;
            }

            let adjustment = wash_sale_disallowed(field(&record, cols.wash_sale))
                .with_context(|| format!("line {line_num}"))?;
            let Some(adjustment) = adjustment else {
                // No disallowed loss to report for this lot.
                continue;
            };

            let buy_date = SourceDate::parse(field(&record, cols.date_acquired))
                .with_context(|| format!("line {line_num}"))?;
            let sell_date = SourceDate::parse(field(&record, cols.date_sold))
                .with_context(|| format!("line {line_num}"))?;
            let cost_basis = parse_dollar(field(&record, cols.cost_basis))
                .with_context(|| format!("line {line_num}"))?;
            let sale_proceeds = parse_dollar(field(&record, cols.proceeds))
                .with_context(|| format!("line {line_num}"))?;

            // Term comes from the export's own label column.
            let entry_code = if field(&record, cols.term) == SHORT_TERM_LABEL {
                EntryCode::ShortTermWithAdjustment
            } else {
                EntryCode::LongTerm
            };

            let txn = Transaction {
                desc: desc.to_string(),
                buy_date: buy_date.known(),
                buy_date_display: buy_date.display(),
                sell_date: sell_date.known(),
                sell_date_display: sell_date.display(),
                cost_basis,
                sale_proceeds,
                adjustment: Some(adjustment),
                entry_code,
            };
            txn.validate()?;

            if let Some(year) = tax_year {
                if sell_date.filter_date(sell_fallback).year() != year {
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
