//! billing-seed core: parallel synthetic-data population for a billing
//! store (customers, services, purchases, payments).
//!
//! Data flow, one stage at a time:
//!   partition -> fan-out generation (rayon) -> bulk load (SQLite)
//!   -> reference fetch for the next stage.

pub mod config;
pub mod error;
pub mod executor;
pub mod generator;
pub mod loader;
pub mod name_generator;
pub mod partition;
pub mod pipeline;
pub mod rng;
pub mod sampler;
pub mod store;
pub mod types;
