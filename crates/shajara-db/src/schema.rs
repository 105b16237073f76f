//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as their Arabic (or
//! lowercase English) wire strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Members (family tree nodes)
-- =======================================================================
DEFINE TABLE member SCHEMAFULL;
DEFINE FIELD user_id ON TABLE member TYPE option<string>;
DEFINE FIELD first_name ON TABLE member TYPE string;
DEFINE FIELD last_name ON TABLE member TYPE string;
DEFINE FIELD full_name ON TABLE member TYPE string;
DEFINE FIELD gender ON TABLE member TYPE string \
    ASSERT $value IN ['ذكر', 'أنثى'];
DEFINE FIELD family_branch ON TABLE member TYPE string \
    ASSERT $value IN ['الفرع الاول', 'الفرع الثاني', 'الفرع الثالث', \
    'الفرع الرابع', 'الفرع الخامس'];
DEFINE FIELD family_relationship ON TABLE member TYPE string \
    ASSERT $value IN ['ابن', 'ابنة', 'زوجة', 'زوج', 'حفيد', 'حفيدة', \
    'الجدالأعلى', 'أخرى'];
DEFINE FIELD birthday ON TABLE member TYPE option<datetime>;
DEFINE FIELD death_date ON TABLE member TYPE option<datetime>;
DEFINE FIELD summary ON TABLE member TYPE option<string>;
DEFINE FIELD image ON TABLE member TYPE string;
DEFINE FIELD is_user ON TABLE member TYPE bool DEFAULT false;
DEFINE FIELD husband ON TABLE member TYPE option<string>;
DEFINE FIELD wives ON TABLE member TYPE array DEFAULT [];
DEFINE FIELD wives.* ON TABLE member TYPE string;
DEFINE FIELD parents ON TABLE member TYPE object DEFAULT {};
DEFINE FIELD parents.father ON TABLE member TYPE option<string>;
DEFINE FIELD parents.mother ON TABLE member TYPE option<string>;
DEFINE FIELD children ON TABLE member TYPE array DEFAULT [];
DEFINE FIELD children.* ON TABLE member TYPE string;
DEFINE FIELD created_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_member_full_name ON TABLE member \
    COLUMNS full_name UNIQUE;
DEFINE INDEX idx_member_branch ON TABLE member COLUMNS family_branch;
DEFINE INDEX idx_member_relationship ON TABLE member \
    COLUMNS family_relationship;

-- =======================================================================
-- Users (platform accounts, linked 1:1 to a member)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD member_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD phone ON TABLE user TYPE string;
DEFINE FIELD roles ON TABLE user TYPE array DEFAULT [];
DEFINE FIELD roles.* ON TABLE user TYPE string;
DEFINE FIELD family_branch ON TABLE user TYPE string \
    ASSERT $value IN ['الفرع الاول', 'الفرع الثاني', 'الفرع الثالث', \
    'الفرع الرابع', 'الفرع الخامس'];
DEFINE FIELD family_relationship ON TABLE user TYPE string \
    ASSERT $value IN ['ابن', 'ابنة', 'زوجة', 'زوج', 'حفيد', 'حفيدة', \
    'الجدالأعلى', 'أخرى'];
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['قيد المراجعة', 'مقبول', 'مرفوض'];
DEFINE FIELD address ON TABLE user TYPE option<string>;
DEFINE FIELD permissions ON TABLE user TYPE array DEFAULT [];
DEFINE FIELD permissions.* ON TABLE user TYPE object FLEXIBLE;
DEFINE FIELD reset_token_hash ON TABLE user TYPE option<string>;
DEFINE FIELD reset_token_expires_at ON TABLE user \
    TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_member ON TABLE user COLUMNS member_id UNIQUE;
DEFINE INDEX idx_user_reset_token ON TABLE user \
    COLUMNS reset_token_hash;

-- =======================================================================
-- Notifications (in-app, per recipient)
-- =======================================================================
DEFINE TABLE notification SCHEMAFULL;
DEFINE FIELD recipient_id ON TABLE notification TYPE string;
DEFINE FIELD sender_id ON TABLE notification TYPE option<string>;
DEFINE FIELD message ON TABLE notification TYPE string;
DEFINE FIELD action ON TABLE notification TYPE string \
    ASSERT $value IN ['create', 'update', 'delete'];
DEFINE FIELD entity_type ON TABLE notification TYPE string;
DEFINE FIELD entity_id ON TABLE notification TYPE option<string>;
DEFINE FIELD priority ON TABLE notification TYPE string \
    ASSERT $value IN ['low', 'medium', 'high'];
DEFINE FIELD status ON TABLE notification TYPE string DEFAULT 'sent';
DEFINE FIELD read ON TABLE notification TYPE bool DEFAULT false;
DEFINE FIELD read_at ON TABLE notification TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE notification TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_notification_recipient ON TABLE notification \
    COLUMNS recipient_id, created_at;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
