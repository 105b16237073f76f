//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The member repository accepts
//! a list of [`LinkWrite`]s alongside each mutation and must apply the
//! whole write set in one transaction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ShajaraResult;
use crate::links::LinkWrite;
use crate::models::{
    member::{FamilyBranch, Member, MemberFilter, MemberPatch, NewMember},
    notification::{CreateNotification, Notification},
    user::{CreateUser, PermissionAction, User, UserStatus},
};

/// Pagination parameters for list queries (1-based page numbers).
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

/// A paginated result set with the computed page count.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let total_pages = total.div_ceil(pagination.per_page.max(1));
        Self {
            items,
            total,
            total_pages,
            page: pagination.page,
            per_page: pagination.per_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            total_pages: self.total_pages,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub trait MemberRepository: Send + Sync {
    /// Insert a member record and apply all reciprocal link writes in
    /// one transaction.
    fn create(
        &self,
        record: NewMember,
        links: &[LinkWrite],
    ) -> impl Future<Output = ShajaraResult<Member>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShajaraResult<Member>> + Send;

    /// Fetch the subset of `ids` that exist. Order is unspecified.
    fn get_many(&self, ids: &[Uuid]) -> impl Future<Output = ShajaraResult<Vec<Member>>> + Send;

    /// Look up a member by its full-name uniqueness key, optionally
    /// excluding one id (for update-time checks).
    fn find_by_full_name(
        &self,
        full_name: &str,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = ShajaraResult<Option<Member>>> + Send;

    /// Find the lineage-head of a branch, if any.
    fn find_branch_head(
        &self,
        branch: FamilyBranch,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = ShajaraResult<Option<Member>>> + Send;

    /// Apply a field patch plus reciprocal link rewrites in one
    /// transaction, returning the updated record.
    fn update(
        &self,
        id: Uuid,
        patch: MemberPatch,
        links: &[LinkWrite],
    ) -> impl Future<Output = ShajaraResult<Member>> + Send;

    /// Delete a member, its linked user (if any), and apply the unlink
    /// writes, all in one transaction.
    fn delete_cascade(
        &self,
        id: Uuid,
        user_id: Option<Uuid>,
        links: &[LinkWrite],
    ) -> impl Future<Output = ShajaraResult<()>> + Send;

    fn list(
        &self,
        filter: &MemberFilter,
        pagination: Pagination,
    ) -> impl Future<Output = ShajaraResult<PaginatedResult<Member>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ShajaraResult<User>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ShajaraResult<User>> + Send;

    fn get_by_email(&self, email: &str) -> impl Future<Output = ShajaraResult<User>> + Send;

    /// All users holding the given capability on an entity type.
    fn find_with_permission(
        &self,
        entity: &str,
        action: PermissionAction,
    ) -> impl Future<Output = ShajaraResult<Vec<User>>> + Send;

    fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> impl Future<Output = ShajaraResult<User>> + Send;

    fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = ShajaraResult<()>> + Send;

    fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = ShajaraResult<Option<User>>> + Send;

    /// Replace the password (re-hashed) and clear any reset token.
    fn update_password(
        &self,
        id: Uuid,
        password: &str,
    ) -> impl Future<Output = ShajaraResult<()>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = ShajaraResult<()>> + Send;
}

pub trait NotificationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateNotification,
    ) -> impl Future<Output = ShajaraResult<Notification>> + Send;

    fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = ShajaraResult<PaginatedResult<Notification>>> + Send;

    fn mark_read(&self, id: Uuid) -> impl Future<Output = ShajaraResult<Notification>> + Send;
}
