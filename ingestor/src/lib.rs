//! HTTP ingestion of occupancy-sensor telemetry into PostgreSQL.
//!
//! `POST /api/send_telemetry` validates one JSON reading and writes it as one
//! row through a [`store::TelemetryStore`].

pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod store;
pub mod validate;
