//! Shared big-data workshop primitives.
//!
//! This crate owns deterministic behavior: partition key derivation, request
//! contracts, token cost arithmetic and prompt templating. It excludes AWS SDK,
//! HTTP and async runtime concerns, which live in `workshop_aws`.

pub mod contract;
pub mod prompts;
pub mod storage_keys;
pub mod token_costs;
