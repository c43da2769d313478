//! Tax Advisory Engine
//!
//! Estimates an individual's income tax under the old and new regimes from
//! raw bank transactions:
//! - Fetches recent transactions from the data store
//! - Extracts income and deductions through a language model, with bounded
//!   retry around the remote call
//! - Computes both regimes deterministically and recommends the cheaper one
//! - Estimates monthly savings from the same history on request
//!
//! PIPELINE:
//! FETCH → EXTRACT → COMPUTE → COMPOSE

pub mod advisor;
pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod gemini;
pub mod models;
pub mod regime;
pub mod retry;
pub mod savings;
pub mod store;

pub use error::Result;

// Re-export common types
pub use advisor::TaxAdvisor;
pub use models::*;
