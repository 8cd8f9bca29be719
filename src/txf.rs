// TXF output rendering
// Fixed line-oriented record format; docs: http://turbotax.intuit.com/txf/

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::transaction::Transaction;

/// TXF format version literal.
const FORMAT_VERSION: &str = "V042";

/// Producer identifier emitted in the preamble.
const PROGRAM: &str = "csv2txf";

/// Record/section terminator line.
const TERMINATOR: &str = "^";

/// Renders a date in the TXF format, which is MM/DD/YYYY.
pub fn txf_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Currency line with exactly two fractional digits.
fn dollar_line(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Renders a transaction list plus the report date into TXF output lines.
///
/// The preamble carries the format version, the producer identifier, and
/// the report date; each transaction becomes one fixed record block, with
/// the adjustment line present only when the transaction carries one.
pub fn render(txn_list: &[Transaction], report_date: NaiveDate) -> Vec<String> {
    let mut lines = Vec::with_capacity(4 + txn_list.len() * 11);
    lines.push(FORMAT_VERSION.to_string());
    lines.push(format!("A{PROGRAM}"));
    lines.push(format!("D{}", txf_date(report_date)));
    lines.push(TERMINATOR.to_string());
    for txn in txn_list {
        lines.push("TD".to_string());
        lines.push(format!("N{}", txn.entry_code.code()));
        lines.push("C1".to_string());
        lines.push("L1".to_string());
        lines.push(format!("P{}", txn.desc));
        lines.push(format!("D{}", txn.buy_date_display));
        lines.push(format!("D{}", txn.sell_date_display));
        lines.push(dollar_line(txn.cost_basis));
        lines.push(dollar_line(txn.sale_proceeds));
        if let Some(adjustment) = txn.adjustment {
            lines.push(dollar_line(adjustment));
        }
        lines.push(TERMINATOR.to_string());
    }
    lines
}
