//! AWS-oriented adapters and workflows for the big-data workshop setup.
//!
//! This crate owns runtime integration details (CloudFormation, S3 and HTTP
//! adapters, logging and configuration) and the sequential workflows built on
//! top of `workshop_core` primitives. Workflows only see the adapter traits,
//! so tests drive them with in-memory fakes.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod telemetry;

