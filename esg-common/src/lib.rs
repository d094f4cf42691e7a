//! # ESG Common Library
//!
//! Shared code for the ESG scoring engine:
//! - Error type and result alias
//! - Engine configuration loading (TOML + environment)
//! - Event vocabulary (`BusEvent`, `Topic`) and the `SelectionBus`
//! - Selection and report data types carried on the bus
//! - SSE helpers and time utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
