/// Donation Service Library
///
/// Backend for a food-donation marketplace. Donors post surplus food, receivers
/// request it, donors confirm one request per donation, and both sides leave
/// reviews or reports once the food has changed hands.
///
/// # Modules
///
/// - `models`: Donation, request, review, report and stats records plus input DTOs
/// - `store`: Transactional persistence traits with PostgreSQL and in-memory backends
/// - `services`: Lifecycle engine (all state transitions) and aggregation queries
/// - `handlers`: HTTP request handlers and route registration
/// - `middleware`: Gateway identity extraction and role checks
/// - `jobs`: Background expiry sweeper
/// - `error`: Error types and HTTP rendering
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors and the `/metrics` handler
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
