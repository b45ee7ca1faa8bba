//! Core data model.
//!
//! A report job is one report-generation request together with its
//! lifecycle state.

pub mod job;
