// Canonical transaction model
// Every broker adapter produces these; the TXF serializer consumes them.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENTRY CODES
// ============================================================================

/// TXF entry code: identifies which line of the tax form a transaction
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryCode {
    /// Short-term gain/loss, basis reported (Form 8949 Part I Box A)
    ShortTerm,
    /// Long-term gain/loss, basis reported (Form 8949 Part II Box A)
    LongTerm,
    /// Short-term gain/loss with an adjustment, e.g. a wash sale
    ShortTermWithAdjustment,
    /// Short-term, basis not reported to the IRS (Form 8949 Part I Box B)
    ShortTermBasisNotReported,
    /// Short-term, not reported on a 1099-B (Form 8949 Part I Box C)
    ShortTermNotReported,
    /// Long-term, basis not reported to the IRS (Form 8949 Part II Box B)
    LongTermBasisNotReported,
    /// Long-term, not reported on a 1099-B (Form 8949 Part II Box C)
    LongTermNotReported,
}

impl EntryCode {
    /// Numeric code emitted on the TXF `N` record line.
    pub fn code(&self) -> u32 {
        match self {
            EntryCode::ShortTerm => 321,
            EntryCode::LongTerm => 323,
            EntryCode::ShortTermWithAdjustment => 682,
            EntryCode::ShortTermBasisNotReported => 711,
            EntryCode::ShortTermNotReported => 712,
            EntryCode::LongTermBasisNotReported => 713,
            EntryCode::LongTermNotReported => 714,
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// One closed buy/sell lot, normalized out of a broker export.
///
/// Adapters build a transaction per completed source row (or matched
/// buy/sell row pair) and never mutate it after appending it to their
/// output list. Dates may be unknown when the source only reports the
/// `Various` marker for an aggregated lot; the display strings are always
/// populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Human-readable security/lot identifier.
    pub desc: String,

    /// Purchase date, when the source reports an exact one.
    pub buy_date: Option<NaiveDate>,

    /// Purchase date as rendered in the output (`MM/DD/YYYY` or `Various`).
    pub buy_date_display: String,

    /// Sale date, when the source reports an exact one.
    pub sell_date: Option<NaiveDate>,

    /// Sale date as rendered in the output (`MM/DD/YYYY` or `Various`).
    pub sell_date_display: String,

    /// Exact cost basis.
    pub cost_basis: Decimal,

    /// Exact sale proceeds.
    pub sale_proceeds: Decimal,

    /// Wash-sale disallowed loss or similar adjustment; absent unless the
    /// source reports a nonzero value.
    pub adjustment: Option<Decimal>,

    /// Tax-form line this lot belongs to.
    pub entry_code: EntryCode,
}

impl Transaction {
    /// Checks the model invariants. Adapters call this before appending a
    /// transaction to their output; a violation is a data-integrity fault,
    /// never silently corrected.
    pub fn validate(&self) -> Result<()> {
        if let (Some(buy), Some(sell)) = (self.buy_date, self.sell_date) {
            ensure!(
                sell >= buy,
                "sell date ({sell}) must be on or after buy date ({buy}) for \"{}\"",
                self.desc
            );
        }
        if let Some(adjustment) = self.adjustment {
            ensure!(
                !adjustment.is_zero(),
                "zero adjustment must be recorded as absent for \"{}\"",
                self.desc
            );
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "desc:{},buy:{},sell:{},costBasis:{:.2},saleProceeds:{:.2}",
            self.desc,
            self.buy_date_display,
            self.sell_date_display,
            self.cost_basis,
            self.sale_proceeds
        )?;
        if let Some(adjustment) = self.adjustment {
            write!(f, ",adjustment:{adjustment:.2}")?;
        }
        write!(f, ",entryCode:{}", self.entry_code.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample() -> Transaction {
        Transaction {
            desc: "100 shares XYZ".to_string(),
            buy_date: Some(date(2010, 1, 4)),
            buy_date_display: "01/04/2010".to_string(),
            sell_date: Some(date(2011, 1, 5)),
            sell_date_display: "01/05/2011".to_string(),
            cost_basis: dec!(1000.00),
            sale_proceeds: dec!(1200.00),
            adjustment: None,
            entry_code: EntryCode::LongTerm,
        }
    }

    #[test]
    fn test_entry_code_values() {
        assert_eq!(EntryCode::ShortTerm.code(), 321);
        assert_eq!(EntryCode::LongTerm.code(), 323);
        assert_eq!(EntryCode::ShortTermWithAdjustment.code(), 682);
        assert_eq!(EntryCode::ShortTermBasisNotReported.code(), 711);
        assert_eq!(EntryCode::ShortTermNotReported.code(), 712);
        assert_eq!(EntryCode::LongTermBasisNotReported.code(), 713);
        assert_eq!(EntryCode::LongTermNotReported.code(), 714);
    }

    #[test]
    fn test_validate_accepts_well_formed_transaction() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_sell_before_buy() {
        let mut txn = sample();
        txn.sell_date = Some(date(2009, 12, 31));
        let err = txn.validate().unwrap_err();
        assert!(err.to_string().contains("on or after buy date"));
    }

    #[test]
    fn test_validate_skips_date_order_when_either_date_is_unknown() {
        let mut txn = sample();
        txn.buy_date = None;
        txn.buy_date_display = "Various".to_string();
        txn.sell_date = Some(date(2009, 12, 31));
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_adjustment() {
        let mut txn = sample();
        txn.adjustment = Some(dec!(0.00));
        let err = txn.validate().unwrap_err();
        assert!(err.to_string().contains("zero adjustment"));
    }

    #[test]
    fn test_display_includes_adjustment_only_when_present() {
        let mut txn = sample();
        assert!(!txn.to_string().contains("adjustment"));
        txn.adjustment = Some(dec!(50.00));
        let rendered = txn.to_string();
        assert!(rendered.contains("adjustment:50.00"));
        assert!(rendered.contains("entryCode:323"));
    }
}
