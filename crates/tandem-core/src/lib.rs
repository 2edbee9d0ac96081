//! Core types, engines, and trait definitions for the Tandem partnership
//! store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod achievement;
pub mod answer;
pub mod cache;
pub mod error;
pub mod interaction;
pub mod notify;
pub mod orchestrator;
pub mod partnership;
pub mod question;
pub mod store;
pub mod streak;
pub mod user;

pub use error::{Error, Result};
