// Broker adapter registry
//
// To add a new broker:
// 1) Implement `BrokerAdapter` for a unit struct. `parse` must accept all
//    sale years when `tax_year` is `None`.
// 2) If the export has a recognizable first line, override `detect`.
// 3) Register the adapter in `all_brokers` and `broker_for_name`.

mod interactive_brokers;
mod schwab;
mod tdameritrade;
mod vanguard;

pub use interactive_brokers::InteractiveBrokers;
pub use schwab::Schwab;
pub use tdameritrade::TdAmeritrade;
pub use vanguard::Vanguard;

use anyhow::{bail, Result};

use crate::diagnostics::DiagnosticsSink;
use crate::transaction::Transaction;

/// One brokerage export format.
///
/// `parse` is the required operation. `detect` is an optional capability:
/// the default `None` means the adapter cannot self-identify and must be
/// selected by name.
pub trait BrokerAdapter: std::fmt::Debug {
    /// Institution display name.
    fn name(&self) -> &'static str;

    /// First-line detection predicate. `None` = capability absent;
    /// `Some(matched)` = exact comparison against the adapter's fixed
    /// header literal.
    fn detect(&self, first_line: &str) -> Option<bool> {
        let _ = first_line;
        None
    }

    /// Scans the export's rows once, in source order, and emits canonical
    /// transactions. Rows whose sale year misses a specific `tax_year` are
    /// dropped with a warning; structural violations abort the parse.
    fn parse(
        &self,
        content: &str,
        tax_year: Option<i32>,
        diags: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<Transaction>>;
}

/// The registered adapters, in the fixed order detection runs.
pub fn all_brokers() -> Vec<Box<dyn BrokerAdapter>> {
    vec![
        Box::new(TdAmeritrade),
        Box::new(InteractiveBrokers),
        Box::new(Vanguard),
        Box::new(Schwab),
    ]
}

/// Explicit name -> adapter table, including historical aliases.
pub fn broker_for_name(name: &str) -> Option<Box<dyn BrokerAdapter>> {
    match name {
        "amtd" | "tdameritrade" => Some(Box::new(TdAmeritrade)),
        "ib" => Some(Box::new(InteractiveBrokers)),
        "vanguard" => Some(Box::new(Vanguard)),
        "schwab" => Some(Box::new(Schwab)),
        _ => None,
    }
}

/// Runs each adapter's detection predicate over the file's first line and
/// returns the first positive match.
pub fn detect_broker(content: &str) -> Option<Box<dyn BrokerAdapter>> {
    let first_line = content.lines().next().unwrap_or("");
    all_brokers()
        .into_iter()
        .find(|broker| broker.detect(first_line) == Some(true))
}

/// Resolves an adapter by explicit name, falling back to content
/// detection. Failing both is a configuration fault surfaced before any
/// parsing begins.
pub fn resolve_broker(name: Option<&str>, content: &str) -> Result<Box<dyn BrokerAdapter>> {
    if let Some(name) = name {
        if let Some(broker) = broker_for_name(name) {
            return Ok(broker);
        }
    }
    match detect_broker(content) {
        Some(broker) => Ok(broker),
        None => bail!(
            "invalid broker name: {}; the file matched no known export format",
            name.unwrap_or("(none)")
        ),
    }
}
