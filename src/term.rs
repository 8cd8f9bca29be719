// Holding-period classification
// Tax law draws the short/long-term line at "more than one year".

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};

/// Returns whether a holding qualifies as long-term, i.e. whether the sale
/// happened more than exactly one calendar year after the purchase.
///
/// The comparison is by calendar fields, not a fixed day count:
/// `sell - buy > 365 days` misses holdings that span a leap day, and
/// `> 366 days` misclassifies ordinary years. A sale exactly one year to
/// the day after the purchase is still short-term.
pub fn is_long_term(buy_date: NaiveDate, sell_date: NaiveDate) -> Result<bool> {
    if sell_date < buy_date {
        bail!("sell date ({sell_date}) before buy date ({buy_date})");
    }
    if sell_date.year() > buy_date.year() + 1 {
        return Ok(true);
    }
    Ok(sell_date.year() == buy_date.year() + 1
        && (sell_date.month() > buy_date.month()
            || (sell_date.month() == buy_date.month() && sell_date.day() > buy_date.day())))
}
