//! Billing API abstractions (Aeza today).

pub mod port;
pub mod types;
