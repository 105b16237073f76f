//! SurrealDB implementation of [`MemberRepository`].
//!
//! Every mutation renders its reciprocal [`LinkWrite`]s into the same
//! query as the primary record write and wraps the whole statement
//! list in `BEGIN TRANSACTION … COMMIT TRANSACTION`, so either all
//! denormalized back-references land or none do.
//!
//! Record ids embedded in link statements are always UUIDs generated
//! or parsed on our side, never raw client input; client-provided
//! strings go through bind parameters.

use chrono::{DateTime, Utc};
use shajara_core::error::ShajaraResult;
use shajara_core::links::LinkWrite;
use shajara_core::models::member::{
    FamilyBranch, FamilyRelationship, Gender, Member, MemberFilter, MemberPatch, NewMember,
    Parents,
};
use shajara_core::repository::{MemberRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct; all selects alias `meta::id(id)` as `record_id`.
#[derive(Debug, SurrealValue)]
struct MemberRow {
    record_id: String,
    user_id: Option<String>,
    first_name: String,
    last_name: String,
    full_name: String,
    gender: String,
    family_branch: String,
    family_relationship: String,
    birthday: Option<DateTime<Utc>>,
    death_date: Option<DateTime<Utc>>,
    summary: Option<String>,
    image: String,
    is_user: bool,
    husband: Option<String>,
    wives: Vec<String>,
    parents: ParentsRow,
    children: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ParentsRow {
    father: Option<String>,
    mother: Option<String>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))
}

fn parse_opt_uuid(s: &Option<String>) -> Result<Option<Uuid>, DbError> {
    s.as_deref().map(parse_uuid).transpose()
}

fn parse_uuids(values: Vec<String>) -> Result<Vec<Uuid>, DbError> {
    values.iter().map(|s| parse_uuid(s)).collect()
}

fn parse_gender(s: &str) -> Result<Gender, DbError> {
    Gender::parse(s).ok_or_else(|| DbError::Decode(format!("unknown gender: {s}")))
}

fn parse_branch(s: &str) -> Result<FamilyBranch, DbError> {
    FamilyBranch::parse(s).ok_or_else(|| DbError::Decode(format!("unknown family branch: {s}")))
}

fn parse_relationship(s: &str) -> Result<FamilyRelationship, DbError> {
    FamilyRelationship::parse(s)
        .ok_or_else(|| DbError::Decode(format!("unknown family relationship: {s}")))
}

impl MemberRow {
    fn try_into_member(self) -> Result<Member, DbError> {
        Ok(Member {
            id: parse_uuid(&self.record_id)?,
            user_id: parse_opt_uuid(&self.user_id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            full_name: self.full_name,
            gender: parse_gender(&self.gender)?,
            family_branch: parse_branch(&self.family_branch)?,
            family_relationship: parse_relationship(&self.family_relationship)?,
            birthday: self.birthday,
            death_date: self.death_date,
            summary: self.summary,
            image: self.image,
            is_user: self.is_user,
            husband: parse_opt_uuid(&self.husband)?,
            wives: parse_uuids(self.wives)?,
            parents: Parents {
                father: parse_opt_uuid(&self.parents.father)?,
                mother: parse_opt_uuid(&self.parents.mother)?,
            },
            children: parse_uuids(self.children)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// -----------------------------------------------------------------------
// SurrealQL rendering helpers
// -----------------------------------------------------------------------

fn member_ref(id: &Uuid) -> String {
    format!("type::record('member', '{id}')")
}

fn opt_lit(id: &Option<Uuid>) -> String {
    match id {
        Some(v) => format!("'{v}'"),
        None => "NONE".into(),
    }
}

fn array_lit(ids: &[Uuid]) -> String {
    let items = ids
        .iter()
        .map(|i| format!("'{i}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{items}]")
}

fn parents_lit(parents: &Parents) -> String {
    format!(
        "{{ father: {}, mother: {} }}",
        opt_lit(&parents.father),
        opt_lit(&parents.mother),
    )
}

/// Render one reciprocal-link write as an UPDATE statement.
///
/// Additions go through `array::union` so re-applying the same plan is
/// idempotent; removals use value subtraction.
fn link_statement(link: &LinkWrite) -> String {
    match link {
        LinkWrite::SetHusband { member, husband } => format!(
            "UPDATE {} SET husband = {}, updated_at = time::now();",
            member_ref(member),
            opt_lit(husband),
        ),
        LinkWrite::AddWife { member, wife } => format!(
            "UPDATE {} SET wives = array::union(wives, ['{wife}']), \
             updated_at = time::now();",
            member_ref(member),
        ),
        LinkWrite::RemoveWife { member, wife } => format!(
            "UPDATE {} SET wives -= '{wife}', updated_at = time::now();",
            member_ref(member),
        ),
        LinkWrite::SetParent {
            member,
            role,
            parent,
        } => format!(
            "UPDATE {} SET {} = {}, updated_at = time::now();",
            member_ref(member),
            role.field(),
            opt_lit(parent),
        ),
        LinkWrite::AddChild { member, child } => format!(
            "UPDATE {} SET children = array::union(children, ['{child}']), \
             updated_at = time::now();",
            member_ref(member),
        ),
        LinkWrite::RemoveChild { member, child } => format!(
            "UPDATE {} SET children -= '{child}', updated_at = time::now();",
            member_ref(member),
        ),
    }
}

/// SurrealDB implementation of the Member repository.
#[derive(Clone)]
pub struct SurrealMemberRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMemberRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn take_members(
        result: surrealdb::IndexedResults,
    ) -> Result<Vec<Member>, DbError> {
        let mut result = result;
        let rows: Vec<MemberRow> = result.take(0)?;
        rows.into_iter()
            .map(MemberRow::try_into_member)
            .collect::<Result<Vec<_>, DbError>>()
    }
}

impl<C: Connection> MemberRepository for SurrealMemberRepository<C> {
    async fn create(&self, record: NewMember, links: &[LinkWrite]) -> ShajaraResult<Member> {
        let id = record.id;

        let mut query = String::from("BEGIN TRANSACTION;\n");
        query.push_str(&format!(
            "CREATE type::record('member', '{id}') SET \
             user_id = NONE, \
             first_name = $first_name, last_name = $last_name, \
             full_name = $full_name, \
             gender = $gender, family_branch = $family_branch, \
             family_relationship = $family_relationship, \
             birthday = $birthday, death_date = $death_date, \
             summary = $summary, image = $image, is_user = false, \
             husband = {husband}, wives = {wives}, \
             parents = {parents}, children = {children};\n",
            husband = opt_lit(&record.husband),
            wives = array_lit(&record.wives),
            parents = parents_lit(&record.parents),
            children = array_lit(&record.children),
        ));
        for link in links {
            query.push_str(&link_statement(link));
            query.push('\n');
        }
        query.push_str("COMMIT TRANSACTION;");

        self.db
            .query(query)
            .bind(("first_name", record.first_name))
            .bind(("last_name", record.last_name))
            .bind(("full_name", record.full_name))
            .bind(("gender", record.gender.as_str().to_string()))
            .bind(("family_branch", record.family_branch.as_str().to_string()))
            .bind((
                "family_relationship",
                record.family_relationship.as_str().to_string(),
            ))
            .bind(("birthday", record.birthday))
            .bind(("death_date", record.death_date))
            .bind(("summary", record.summary))
            .bind(("image", record.image))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ShajaraResult<Member> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('member', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "member".into(),
            id: id_str,
        })?;

        Ok(row.try_into_member()?)
    }

    async fn get_many(&self, ids: &[Uuid]) -> ShajaraResult<Vec<Member>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM member \
                 WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        Ok(Self::take_members(result).await?)
    }

    async fn find_by_full_name(
        &self,
        full_name: &str,
        exclude: Option<Uuid>,
    ) -> ShajaraResult<Option<Member>> {
        let mut sql = String::from(
            "SELECT meta::id(id) AS record_id, * FROM member \
             WHERE full_name = $full_name",
        );
        if exclude.is_some() {
            sql.push_str(" AND meta::id(id) != $exclude");
        }

        let mut builder = self
            .db
            .query(sql)
            .bind(("full_name", full_name.to_string()));
        if let Some(exclude) = exclude {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let members = Self::take_members(result).await?;
        Ok(members.into_iter().next())
    }

    async fn find_branch_head(
        &self,
        branch: FamilyBranch,
        exclude: Option<Uuid>,
    ) -> ShajaraResult<Option<Member>> {
        let mut sql = String::from(
            "SELECT meta::id(id) AS record_id, * FROM member \
             WHERE family_branch = $branch \
             AND family_relationship = $head",
        );
        if exclude.is_some() {
            sql.push_str(" AND meta::id(id) != $exclude");
        }

        let mut builder = self
            .db
            .query(sql)
            .bind(("branch", branch.as_str().to_string()))
            .bind((
                "head",
                FamilyRelationship::LineageHead.as_str().to_string(),
            ));
        if let Some(exclude) = exclude {
            builder = builder.bind(("exclude", exclude.to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let members = Self::take_members(result).await?;
        Ok(members.into_iter().next())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: MemberPatch,
        links: &[LinkWrite],
    ) -> ShajaraResult<Member> {
        let mut sets: Vec<String> = vec![
            "first_name = $first_name".into(),
            "last_name = $last_name".into(),
            "full_name = $full_name".into(),
            "gender = $gender".into(),
            "family_branch = $family_branch".into(),
            "family_relationship = $family_relationship".into(),
        ];
        if patch.birthday.is_some() {
            sets.push("birthday = $birthday".into());
        }
        if patch.death_date.is_some() {
            sets.push("death_date = $death_date".into());
        }
        if patch.summary.is_some() {
            sets.push("summary = $summary".into());
        }
        if patch.image.is_some() {
            sets.push("image = $image".into());
        }
        if let Some(husband) = &patch.husband {
            sets.push(format!("husband = {}", opt_lit(husband)));
        }
        if let Some(wives) = &patch.wives {
            sets.push(format!("wives = {}", array_lit(wives)));
        }
        if let Some(parents) = &patch.parents {
            sets.push(format!("parents = {}", parents_lit(parents)));
        }
        if let Some(children) = &patch.children {
            sets.push(format!("children = {}", array_lit(children)));
        }
        sets.push("updated_at = time::now()".into());

        let mut query = String::from("BEGIN TRANSACTION;\n");
        query.push_str(&format!(
            "UPDATE type::record('member', '{id}') SET {};\n",
            sets.join(", "),
        ));
        for link in links {
            query.push_str(&link_statement(link));
            query.push('\n');
        }
        query.push_str("COMMIT TRANSACTION;");

        let mut builder = self
            .db
            .query(query)
            .bind(("first_name", patch.first_name))
            .bind(("last_name", patch.last_name))
            .bind(("full_name", patch.full_name))
            .bind(("gender", patch.gender.as_str().to_string()))
            .bind(("family_branch", patch.family_branch.as_str().to_string()))
            .bind((
                "family_relationship",
                patch.family_relationship.as_str().to_string(),
            ));
        if let Some(birthday) = patch.birthday {
            builder = builder.bind(("birthday", birthday));
        }
        if let Some(death_date) = patch.death_date {
            builder = builder.bind(("death_date", death_date));
        }
        if let Some(summary) = patch.summary {
            builder = builder.bind(("summary", summary));
        }
        if let Some(image) = patch.image {
            builder = builder.bind(("image", image));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn delete_cascade(
        &self,
        id: Uuid,
        user_id: Option<Uuid>,
        links: &[LinkWrite],
    ) -> ShajaraResult<()> {
        let mut query = String::from("BEGIN TRANSACTION;\n");
        for link in links {
            query.push_str(&link_statement(link));
            query.push('\n');
        }
        if let Some(user_id) = user_id {
            query.push_str(&format!("DELETE type::record('user', '{user_id}');\n"));
        }
        query.push_str(&format!("DELETE type::record('member', '{id}');\n"));
        query.push_str("COMMIT TRANSACTION;");

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: &MemberFilter,
        pagination: Pagination,
    ) -> ShajaraResult<PaginatedResult<Member>> {
        let mut conditions: Vec<&str> = Vec::new();
        if filter.family_branch.is_some() {
            conditions.push("family_branch = $branch");
        }
        if filter.family_relationship.is_some() {
            conditions.push("family_relationship = $relationship");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let count_sql =
            format!("SELECT count() AS total FROM member{where_clause} GROUP ALL");
        let mut count_builder = self.db.query(count_sql);
        if let Some(branch) = filter.family_branch {
            count_builder = count_builder.bind(("branch", branch.as_str().to_string()));
        }
        if let Some(relationship) = filter.family_relationship {
            count_builder =
                count_builder.bind(("relationship", relationship.as_str().to_string()));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let list_sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM member{where_clause} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset",
        );
        let mut builder = self
            .db
            .query(list_sql)
            .bind(("limit", pagination.per_page))
            .bind(("offset", pagination.offset()));
        if let Some(branch) = filter.family_branch {
            builder = builder.bind(("branch", branch.as_str().to_string()));
        }
        if let Some(relationship) = filter.family_relationship {
            builder = builder.bind(("relationship", relationship.as_str().to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let items = Self::take_members(result).await?;

        Ok(PaginatedResult::new(items, total, pagination))
    }
}
