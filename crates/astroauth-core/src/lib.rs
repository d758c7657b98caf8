//! Core domain + application logic for the AstroAuth login bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram and the Supabase datastore
//! live behind ports (traits) implemented in adapter crates.

pub mod authorizer;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod records;
pub mod replies;

pub use errors::{Error, Result};
