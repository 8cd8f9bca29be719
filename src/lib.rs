// csv2txf - Converts brokerage capital-gains exports to TXF
// Exposes all modules for use in the CLI and tests

pub mod brokers;
pub mod diagnostics;
pub mod schema;
pub mod term;
pub mod transaction;
pub mod txf;

// Re-export commonly used types
pub use brokers::{
    all_brokers, broker_for_name, detect_broker, resolve_broker, BrokerAdapter,
    InteractiveBrokers, Schwab, TdAmeritrade, Vanguard,
};
pub use diagnostics::{CollectedDiagnostics, DiagnosticsSink, LogSink};
pub use term::is_long_term;
pub use transaction::{EntryCode, Transaction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
