pub mod reconciliation;

pub use reconciliation::run_funding_reconciliation;
