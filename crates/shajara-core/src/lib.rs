//! Shajara Core — domain models, repository trait definitions, and
//! error types shared across all crates.

pub mod error;
pub mod links;
pub mod models;
pub mod repository;
