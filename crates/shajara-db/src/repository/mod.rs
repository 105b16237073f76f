//! SurrealDB repository implementations.

mod member;
mod notification;
mod user;

pub use member::SurrealMemberRepository;
pub use notification::SurrealNotificationRepository;
pub use user::{SurrealUserRepository, verify_password};
