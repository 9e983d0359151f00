//! # docpilot HTTP Server Module
//!
//! Axum server exposing the query pipeline.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/metrics` - Pipeline counters
//! - `/api/schema` - Schema summary of the configured database
//! - `/api/plan` - Phase 1: generate and validate a plan
//! - `/api/query` - Phase 2: validate and execute a plan

pub mod config;
pub mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use routes::SESSION_HEADER;
pub use server::{build_router, spawn_idle_sweep, HttpServer};
