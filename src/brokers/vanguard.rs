// Vanguard trade-activity export
//
// Buys and sells arrive as separate rows in chronological order, each sell
// closing the immediately preceding buy. The matcher keeps at most one
// open lot; an identity disagreement between a buy and its sell means the
// reconciliation assumption is broken, and the conversion aborts rather
// than emit silently wrong output.
//
// Does not handle dividends, short sales, or partial lot sales.

use anyhow::{ensure, Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;

use super::BrokerAdapter;
use crate::diagnostics::DiagnosticsSink;
use crate::schema::{field, parse_date_ymd, parse_dollar, RowSchema};
use crate::term::is_long_term;
use crate::transaction::{EntryCode, Transaction};
use crate::txf::txf_date;

pub(super) const FIRST_LINE: &str = "\"Trade Date\",\"Transaction Type\",\
\"Investment Name\",\"Symbol\",\"Shares\",\"Principal Amount\",\"Net Amount\"";

/// Column indices resolved once from the header row.
struct Columns {
    trade_date: usize,
    transaction_type: usize,
    investment_name: usize,
    symbol: usize,
    shares: usize,
    net_amount: usize,
}

impl Columns {
    fn resolve(schema: &RowSchema) -> Result<Self> {
        Ok(Columns {
            trade_date: schema.index_of("Trade Date")?,
            transaction_type: schema.index_of("Transaction Type")?,
            investment_name: schema.index_of("Investment Name")?,
            symbol: schema.index_of("Symbol")?,
            shares: schema.index_of("Shares")?,
            net_amount: schema.index_of("Net Amount")?,
        })
    }
}

/// An unmatched buy row awaiting its closing sell.
#[derive(Debug)]
struct OpenLot {
    shares: i64,
    symbol: String,
    investment_name: String,
    buy_date: NaiveDate,
    cost_basis: Decimal,
}

/// Share count normalized so a buy and its closing sell compare directly:
/// the export displays a sell's count negated.
fn num_shares(record: &StringRecord, cols: &Columns, sell: bool) -> Result<i64> {
    let shares: i64 = field(record, cols.shares)
        .trim()
        .parse()
        .with_context(|| format!("invalid share count: \"{}\"", field(record, cols.shares)))?;
    Ok(if sell { -shares } else { shares })
}

/// Net amount normalized into the unsigned cost/proceeds convention: the
/// export records a buy as a negative outflow.
fn net_amount(record: &StringRecord, cols: &Columns, buy: bool) -> Result<Decimal> {
    let amount = parse_dollar(field(record, cols.net_amount))?;
    Ok(if buy { -amount } else { amount })
}

#[derive(Debug)]
pub struct Vanguard;

impl BrokerAdapter for Vanguard {
    fn name(&self) -> &'static str {
        "Vanguard"
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
        let mut open_lot: Option<OpenLot> = None;
        for (index, record) in records.enumerate() {
            let line_num = index + 2;
            let record = record.with_context(|| format!("failed to read line {line_num}"))?;

            match field(&record, cols.transaction_type) {
                "Buy" => {
                    // Sells follow their buys, so a new buy opens the lot
                    // the next sell will close.
                    open_lot = Some(OpenLot {
                        shares: num_shares(&record, &cols, false)
                            .with_context(|| format!("line {line_num}"))?,
                        symbol: field(&record, cols.symbol).to_string(),
                        investment_name: field(&record, cols.investment_name).to_string(),
                        buy_date: parse_date_ymd(field(&record, cols.trade_date))
                            .with_context(|| format!("line {line_num}"))?,
                        cost_basis: net_amount(&record, &cols, true)
                            .with_context(|| format!("line {line_num}"))?,
                    });
                }
                "Sell" => {
                    let lot = open_lot.take().with_context(|| {
                        format!("sell row on line {line_num} has no open buy to close")
                    })?;
                    let shares = num_shares(&record, &cols, true)
                        .with_context(|| format!("line {line_num}"))?;
                    let symbol = field(&record, cols.symbol);
                    let investment_name = field(&record, cols.investment_name);

                    ensure!(
                        lot.shares == shares,
                        "share count mismatch closing {} {}: bought {}, sold {} (line {line_num})",
                        lot.shares,
                        lot.symbol,
                        lot.shares,
                        shares
                    );
                    ensure!(
                        lot.symbol == symbol,
                        "symbol mismatch closing lot: bought \"{}\", sold \"{symbol}\" (line {line_num})",
                        lot.symbol
                    );
                    ensure!(
                        lot.investment_name == investment_name,
                        "investment name mismatch closing lot: bought \"{}\", sold \"{investment_name}\" (line {line_num})",
                        lot.investment_name
                    );

                    let sell_date = parse_date_ymd(field(&record, cols.trade_date))
                        .with_context(|| format!("line {line_num}"))?;
                    let entry_code = if is_long_term(lot.buy_date, sell_date)? {
                        EntryCode::LongTerm
                    } else {
                        EntryCode::ShortTerm
                    };

                    let txn = Transaction {
                        desc: format!("{} shares {}", lot.shares, lot.symbol),
                        buy_date: Some(lot.buy_date),
                        buy_date_display: txf_date(lot.buy_date),
                        sell_date: Some(sell_date),
                        sell_date_display: txf_date(sell_date),
                        cost_basis: lot.cost_basis,
                        sale_proceeds: net_amount(&record, &cols, false)
                            .with_context(|| format!("line {line_num}"))?,
                        adjustment: None,
                        entry_code,
                    };
                    txn.validate()?;

                    // The lot is closed either way; the filter only
                    // decides whether it reaches the output.
                    if let Some(year) = tax_year {
                        if sell_date.year() != year {
                            diags.warn(&format!(
                                "ignoring txn \"{}\" as the sale is not from {year}",
                                txn.desc
                            ));
                            continue;
                        }
                    }

                    txn_list.push(txn);
                }
                // Other activity rows (sweeps, dividends, funding) are not
                // capital-gains events.
                _ => {}
            }
        }

        Ok(txn_list)
    }
}
