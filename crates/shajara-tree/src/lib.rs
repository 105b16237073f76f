//! Shajara Tree — the relationship consistency engine and account
//! flows.
//!
//! This crate provides:
//! - Member create/update/delete with bidirectional link reconciliation
//!   ([`members::MemberService`])
//! - Permission-filtered notification fan-out ([`notify::StoreNotifier`])
//! - Account status, welcome and password-reset flows
//!   ([`accounts::AccountService`])
//! - Email message construction ([`email::Mailer`] + templates)
//!
//! Everything is generic over the `shajara-core` repository traits, so
//! the crate carries no database dependency.

pub mod accounts;
pub mod config;
pub mod email;
pub mod error;
pub mod members;
pub mod notify;
pub mod reset;

pub use config::TreeConfig;
pub use error::{AccountError, MemberError};
pub use members::MemberService;
pub use notify::{MemberEvent, Notifier, PermissionFilter, StoreNotifier};
