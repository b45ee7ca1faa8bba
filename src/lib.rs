//! # reportq
//!
//! Background report generation for the waste-collection platform.
//!
//! Provides the report job lifecycle (submit, generate, poll, download),
//! a bounded worker pool, pluggable artifact storage, per-type content
//! builders, and OpenTelemetry observability.

pub mod builder;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod model;
pub mod service;
pub mod source;
pub mod storage;
pub mod store;
pub mod telemetry;
