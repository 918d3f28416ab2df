//! Ecoloop Core — domain models, storage and gateway trait
//! definitions, and error types shared across all crates.

pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
