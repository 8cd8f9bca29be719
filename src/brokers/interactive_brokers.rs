// Interactive Brokers Form 8949 worksheet
//
// The export groups data rows under nested Part/Box header rows that
// mirror the official form sections; data rows inherit the currently
// active section. Institutions pad the worksheet with boilerplate the
// parser need not understand, so unrecognized rows only warrant a
// warning.
//
// Does not handle dividends.

use anyhow::{Context, Result};
use chrono::Datelike;
use csv::{ReaderBuilder, StringRecord};

use super::BrokerAdapter;
use crate::diagnostics::DiagnosticsSink;
use crate::schema::{field, parse_date_mdy, parse_dollar};
use crate::transaction::{EntryCode, Transaction};

pub(super) const FIRST_LINE_PREFIX: &str = "Title,Worksheet for Form 8949,";

/// Field count of `Data` (and boilerplate `Header`/`Footer`) rows.
const DATA_FIELDS: usize = 9;

/// Form 8949 part: I = short-term, II = long-term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    I,
    II,
}

/// Form 8949 box within a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxCode {
    A,
    B,
    C,
}

/// Running section context established by `Part` and `Box` header rows.
#[derive(Debug, Default)]
struct SectionState {
    part: Option<Part>,
    box_code: Option<BoxCode>,
}

impl SectionState {
    /// Boxes only have meaning within a part, so any `Part` row clears
    /// the box even when the part value itself is unrecognized.
    fn clear_box(&mut self) {
        self.box_code = None;
    }

    fn enter_part(&mut self, part: Part) {
        self.part = Some(part);
    }

    fn enter_box(&mut self, box_code: BoxCode) {
        self.box_code = Some(box_code);
    }

    /// Entry code for data rows under the current (part, box) context.
    fn entry_code(&self) -> Option<EntryCode> {
        let code = match (self.part?, self.box_code?) {
            (Part::I, BoxCode::A) => EntryCode::ShortTerm,
            (Part::I, BoxCode::B) => EntryCode::ShortTermBasisNotReported,
            (Part::I, BoxCode::C) => EntryCode::ShortTermNotReported,
            (Part::II, BoxCode::A) => EntryCode::LongTerm,
            (Part::II, BoxCode::B) => EntryCode::LongTermBasisNotReported,
            (Part::II, BoxCode::C) => EntryCode::LongTermNotReported,
        };
        Some(code)
    }
}

/// Reconstructs a row for warning messages.
fn row_text(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(",")
}

#[derive(Debug)]
pub struct InteractiveBrokers;

impl BrokerAdapter for InteractiveBrokers {
    fn name(&self) -> &'static str {
        "Interactive Brokers"
    }

    fn detect(&self, first_line: &str) -> Option<bool> {
        Some(first_line.starts_with(FIRST_LINE_PREFIX))
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

        let mut txn_list = Vec::new();
        let mut state = SectionState::default();
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read record {}", index + 1))?;
            if index < 2 {
                // Title and column-name rows above the sections.
                continue;
            }

            let kind = field(&record, 0);
            if kind == "Part" && record.len() == 3 {
                state.clear_box();
                match field(&record, 1) {
                    "I" => state.enter_part(Part::I),
                    "II" => state.enter_part(Part::II),
                    _ => diags.warn(&format!("unknown part line: \"{}\"", row_text(&record))),
                }
            } else if kind == "Box" && record.len() == 3 {
                match field(&record, 1) {
                    "A" => state.enter_box(BoxCode::A),
                    "B" => state.enter_box(BoxCode::B),
                    "C" => state.enter_box(BoxCode::C),
                    _ => diags.warn(&format!("unknown box line: \"{}\"", row_text(&record))),
                }
            } else if kind == "Data" && record.len() == DATA_FIELDS {
                let Some(entry_code) = state.entry_code() else {
                    diags.warn(&format!(
                        "ignoring data row \"{}\": no active box context",
                        row_text(&record)
                    ));
                    continue;
                };

                let desc = field(&record, 1).to_string();
                let buy_date_display = field(&record, 3).to_string();
                let sell_date_display = field(&record, 4).to_string();
                let sale_proceeds = parse_dollar(field(&record, 5))
                    .with_context(|| format!("record {}", index + 1))?;
                let cost_basis = parse_dollar(field(&record, 6))
                    .with_context(|| format!("record {}", index + 1))?;
                let adjustment = match field(&record, 7).trim() {
                    "" => None,
                    raw => {
                        let amount =
                            parse_dollar(raw).with_context(|| format!("record {}", index + 1))?;
                        (!amount.is_zero()).then_some(amount)
                    }
                };

                // The worksheet's date strings are kept verbatim for
                // display; exact dates are recovered when they parse.
                let buy_date = parse_date_mdy(&buy_date_display).ok();
                let sell_date = parse_date_mdy(&sell_date_display).ok();

                let txn = Transaction {
                    desc,
                    buy_date,
                    buy_date_display,
                    sell_date,
                    sell_date_display,
                    cost_basis,
                    sale_proceeds,
                    adjustment,
                    entry_code,
                };
                txn.validate()?;

                // A sale the filter cannot positively date to another
                // year passes through.
                if let (Some(year), Some(sale)) = (tax_year, sell_date) {
                    if sale.year() != year {
                        diags.warn(&format!(
                            "ignoring txn \"{}\" as the sale is not from {year}",
                            txn.desc
                        ));
                        continue;
                    }
                }

                txn_list.push(txn);
            } else if !(kind == "Header" || kind == "Footer") || record.len() != DATA_FIELDS {
                diags.warn(&format!("unknown line: \"{}\"", row_text(&record)));
            }
        }

        Ok(txn_list)
    }
}
