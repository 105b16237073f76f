//! Domain models for Shajara.
//!
//! These are the core types shared across all crates. Enum wire values
//! keep the Arabic strings used by the platform's data.

pub mod member;
pub mod notification;
pub mod user;
