//! SurrealDB implementation of [`UserRepository`].
//!
//! Passwords are hashed with Argon2id before storage. Creating a user
//! also flips the linked member's `is_user` flag and back-reference in
//! the same transaction; deleting a user clears them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use shajara_core::error::ShajaraResult;
use shajara_core::models::member::{FamilyBranch, FamilyRelationship};
use shajara_core::models::user::{CreateUser, PermissionAction, PermissionGrant, User, UserStatus};
use shajara_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

// OWASP-recommended Argon2id parameters: 19 MiB memory, 2 iterations,
// 1 lane.
const ARGON2_M_COST: u32 = 19_456;
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

fn argon2() -> Result<Argon2<'static>, DbError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
        .map_err(|e| DbError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a raw password against a stored Argon2id hash.
///
/// A malformed stored hash verifies as false rather than erroring, so
/// callers can treat the result as a plain authentication outcome.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, SurrealValue)]
struct GrantRow {
    entity: String,
    view: bool,
    create: bool,
    update: bool,
    delete: bool,
}

impl From<PermissionGrant> for GrantRow {
    fn from(g: PermissionGrant) -> Self {
        Self {
            entity: g.entity,
            view: g.view,
            create: g.create,
            update: g.update,
            delete: g.delete,
        }
    }
}

impl From<GrantRow> for PermissionGrant {
    fn from(r: GrantRow) -> Self {
        Self {
            entity: r.entity,
            view: r.view,
            create: r.create,
            update: r.update,
            delete: r.delete,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    tenant_id: String,
    member_id: String,
    email: String,
    password_hash: String,
    phone: String,
    roles: Vec<String>,
    family_branch: String,
    family_relationship: String,
    status: String,
    address: Option<String>,
    permissions: Vec<GrantRow>,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_uuid(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id)?,
            tenant_id: parse_uuid(&self.tenant_id)?,
            member_id: parse_uuid(&self.member_id)?,
            email: self.email,
            password_hash: self.password_hash,
            phone: self.phone,
            roles: self.roles,
            family_branch: FamilyBranch::parse(&self.family_branch).ok_or_else(|| {
                DbError::Decode(format!("unknown family branch: {}", self.family_branch))
            })?,
            family_relationship: FamilyRelationship::parse(&self.family_relationship).ok_or_else(
                || {
                    DbError::Decode(format!(
                        "unknown family relationship: {}",
                        self.family_relationship
                    ))
                },
            )?,
            status: UserStatus::parse(&self.status)
                .ok_or_else(|| DbError::Decode(format!("unknown user status: {}", self.status)))?,
            address: self.address,
            permissions: self.permissions.into_iter().map(Into::into).collect(),
            reset_token_hash: self.reset_token_hash,
            reset_token_expires_at: self.reset_token_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, * FROM ";

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<User, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(format!("{SELECT_USER}type::record('user', $id)"))
            .bind(("id", id_str.clone()))
            .await?;
        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;
        row.try_into_user()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> ShajaraResult<User> {
        let id = Uuid::new_v4();
        let password_hash = hash_password(&input.password)?;
        let permissions: Vec<GrantRow> = input.permissions.into_iter().map(Into::into).collect();

        // Record ids are server-generated UUIDs, safe to embed.
        let query = format!(
            "BEGIN TRANSACTION;\n\
             CREATE type::record('user', '{id}') SET \
             tenant_id = $tenant_id, member_id = $member_id, \
             email = $email, password_hash = $password_hash, \
             phone = $phone, roles = $roles, \
             family_branch = $family_branch, \
             family_relationship = $family_relationship, \
             status = $status, address = $address, \
             permissions = $permissions, \
             reset_token_hash = NONE, reset_token_expires_at = NONE;\n\
             UPDATE type::record('member', '{member_id}') SET \
             user_id = '{id}', is_user = true, \
             updated_at = time::now();\n\
             COMMIT TRANSACTION;",
            member_id = input.member_id,
        );

        self.db
            .query(query)
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("member_id", input.member_id.to_string()))
            .bind(("email", input.email))
            .bind(("password_hash", password_hash))
            .bind(("phone", input.phone))
            .bind(("roles", input.roles))
            .bind(("family_branch", input.family_branch.as_str().to_string()))
            .bind((
                "family_relationship",
                input.family_relationship.as_str().to_string(),
            ))
            .bind(("status", UserStatus::Pending.as_str().to_string()))
            .bind(("address", input.address))
            .bind(("permissions", permissions))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        Ok(self.fetch_by_id(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> ShajaraResult<User> {
        Ok(self.fetch_by_id(id).await?)
    }

    async fn get_by_email(&self, email: &str) -> ShajaraResult<User> {
        let mut result = self
            .db
            .query(format!("{SELECT_USER}user WHERE email = $email"))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "user".into(),
            id: email.to_string(),
        })?;
        Ok(row.try_into_user()?)
    }

    async fn find_with_permission(
        &self,
        entity: &str,
        action: PermissionAction,
    ) -> ShajaraResult<Vec<User>> {
        // The capability field name is one of four fixed identifiers,
        // never client input.
        let query = format!(
            "{SELECT_USER}user WHERE \
             count(permissions[WHERE entity = $entity \
             AND `{field}` = true]) > 0",
            field = action.as_field(),
        );

        let mut result = self
            .db
            .query(query)
            .bind(("entity", entity.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn update_status(&self, id: Uuid, status: UserStatus) -> ShajaraResult<User> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch_by_id(id).await?)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> ShajaraResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 reset_token_hash = $token_hash, \
                 reset_token_expires_at = $expires_at, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("token_hash", token_hash))
            .bind(("expires_at", expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> ShajaraResult<Option<User>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_USER}user WHERE reset_token_hash = $token_hash"
            ))
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(UserRow::try_into_user)
            .transpose()?)
    }

    async fn update_password(&self, id: Uuid, password: &str) -> ShajaraResult<()> {
        let password_hash = hash_password(password)?;

        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, \
                 reset_token_hash = NONE, \
                 reset_token_expires_at = NONE, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> ShajaraResult<()> {
        let user = self.fetch_by_id(id).await?;

        let query = format!(
            "BEGIN TRANSACTION;\n\
             UPDATE type::record('member', '{member_id}') SET \
             user_id = NONE, is_user = false, \
             updated_at = time::now();\n\
             DELETE type::record('user', '{id}');\n\
             COMMIT TRANSACTION;",
            member_id = user.member_id,
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        Ok(())
    }
}
