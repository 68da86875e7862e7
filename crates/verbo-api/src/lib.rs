//! HTTP surface for the Verbo review scheduler.
//!
//! Handlers are generic over the [`verbo_srs::RecordStore`] backing the
//! engine, so the same router serves Postgres in production and the
//! in-memory store in tests.

pub mod config;
pub mod error;
pub mod jobs;
pub mod learner;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tracing;
pub mod validation;

pub use config::ApiConfig;
pub use state::ApiState;
