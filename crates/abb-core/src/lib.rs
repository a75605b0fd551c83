//! Core domain + application logic for the Aeza balance bot (Rust port).
//!
//! This crate is intentionally framework-agnostic. Telegram and the Aeza
//! billing API live behind ports (traits) implemented in adapter crates.

pub mod billing;
pub mod config;
pub mod detector;
pub mod domain;
pub mod errors;
pub mod fetcher;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod monitor;

pub use errors::{Error, Result};
