//! Customer Health Monitor Library
//!
//! Loads a customer dataset, asks a hosted language model to assess each
//! customer's health and churn risk, and turns the answers into dashboard view
//! models served over HTTP.
//!
//! # Modules
//!
//! - `analysis`: Messages API client and reply decoding.
//! - `batch`: Sequential batch analysis and summary metrics.
//! - `config`: Configuration management.
//! - `dashboard`: View models for gauges, badges, tables and charts.
//! - `dataset`: CSV customer dataset (read-only).
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `prompt`: Prompt rendering and code-fence stripping.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod prompt;
