//! Member domain model — a node in the family tree.
//!
//! Marriage and parentage links are stored denormalized in both
//! directions (husband↔wives, parents↔children); keeping the two
//! directions consistent is the job of `shajara-tree`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Binary gender as recorded in the genealogy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "ذكر")]
    Male,
    #[serde(rename = "أنثى")]
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "ذكر",
            Gender::Female => "أنثى",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ذكر" => Some(Gender::Male),
            "أنثى" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// One of the five lineage subdivisions partitioning members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyBranch {
    #[serde(rename = "الفرع الاول")]
    First,
    #[serde(rename = "الفرع الثاني")]
    Second,
    #[serde(rename = "الفرع الثالث")]
    Third,
    #[serde(rename = "الفرع الرابع")]
    Fourth,
    #[serde(rename = "الفرع الخامس")]
    Fifth,
}

impl FamilyBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyBranch::First => "الفرع الاول",
            FamilyBranch::Second => "الفرع الثاني",
            FamilyBranch::Third => "الفرع الثالث",
            FamilyBranch::Fourth => "الفرع الرابع",
            FamilyBranch::Fifth => "الفرع الخامس",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "الفرع الاول" => Some(FamilyBranch::First),
            "الفرع الثاني" => Some(FamilyBranch::Second),
            "الفرع الثالث" => Some(FamilyBranch::Third),
            "الفرع الرابع" => Some(FamilyBranch::Fourth),
            "الفرع الخامس" => Some(FamilyBranch::Fifth),
            _ => None,
        }
    }
}

/// Relationship role of a member within their branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyRelationship {
    #[serde(rename = "ابن")]
    Son,
    #[serde(rename = "ابنة")]
    Daughter,
    #[serde(rename = "زوجة")]
    Wife,
    #[serde(rename = "زوج")]
    Husband,
    #[serde(rename = "حفيد")]
    Grandson,
    #[serde(rename = "حفيدة")]
    Granddaughter,
    /// The single root/ancestor role per branch; must be male.
    #[serde(rename = "الجدالأعلى")]
    LineageHead,
    #[serde(rename = "أخرى")]
    Other,
}

impl FamilyRelationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            FamilyRelationship::Son => "ابن",
            FamilyRelationship::Daughter => "ابنة",
            FamilyRelationship::Wife => "زوجة",
            FamilyRelationship::Husband => "زوج",
            FamilyRelationship::Grandson => "حفيد",
            FamilyRelationship::Granddaughter => "حفيدة",
            FamilyRelationship::LineageHead => "الجدالأعلى",
            FamilyRelationship::Other => "أخرى",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ابن" => Some(FamilyRelationship::Son),
            "ابنة" => Some(FamilyRelationship::Daughter),
            "زوجة" => Some(FamilyRelationship::Wife),
            "زوج" => Some(FamilyRelationship::Husband),
            "حفيد" => Some(FamilyRelationship::Grandson),
            "حفيدة" => Some(FamilyRelationship::Granddaughter),
            "الجدالأعلى" => Some(FamilyRelationship::LineageHead),
            "أخرى" => Some(FamilyRelationship::Other),
            _ => None,
        }
    }
}

/// Parent references (at most one each).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parents {
    pub father: Option<Uuid>,
    pub mother: Option<Uuid>,
}

impl Parents {
    pub fn is_empty(&self) -> bool {
        self.father.is_none() && self.mother.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    /// Linked platform account, if this member registered.
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    /// `"{first_name} {last_name}"` — the uniqueness key.
    pub full_name: String,
    pub gender: Gender,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub birthday: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub image: String,
    pub is_user: bool,
    /// Set on female members only.
    pub husband: Option<Uuid>,
    /// Set on male members only.
    pub wives: Vec<Uuid>,
    pub parents: Parents,
    pub children: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn full_name_of(first_name: &str, last_name: &str) -> String {
        format!("{first_name} {last_name}")
    }
}

/// Creation request payload. Relationship fields are candidate ids that
/// the consistency engine validates before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMember {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub birthday: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    /// Uploaded image reference; a platform placeholder is used when absent.
    pub image: Option<String>,
    pub husband: Option<Uuid>,
    pub wives: Option<Vec<Uuid>>,
    pub parents: Option<Parents>,
    pub children: Option<Vec<Uuid>>,
}

/// Fully validated record handed to the store for insertion.
#[derive(Debug, Clone)]
pub struct NewMember {
    /// Pre-assigned id, so reciprocal link writes can reference the
    /// record before it exists.
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: Gender,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub birthday: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub image: String,
    pub husband: Option<Uuid>,
    pub wives: Vec<Uuid>,
    pub parents: Parents,
    pub children: Vec<Uuid>,
}

/// Update request payload.
///
/// Scalar identity fields are required on every update (the platform
/// always re-submits them). For the relationship fields `None` means
/// "field absent — leave unchanged" and `Some(..)` means "reconcile to
/// this value"; `husband` uses `Some(None)` for an explicit clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMember {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub birthday: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub husband: Option<Option<Uuid>>,
    pub wives: Option<Vec<Uuid>>,
    pub parents: Option<Parents>,
    pub children: Option<Vec<Uuid>>,
}

/// Field-level patch applied by the store in one update statement.
/// Identity fields are always written; relationship fields are only
/// present when the engine reconciled them.
#[derive(Debug, Clone)]
pub struct MemberPatch {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: Gender,
    pub family_branch: FamilyBranch,
    pub family_relationship: FamilyRelationship,
    pub birthday: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub husband: Option<Option<Uuid>>,
    pub wives: Option<Vec<Uuid>>,
    pub parents: Option<Parents>,
    pub children: Option<Vec<Uuid>>,
}

/// Optional filters for member listing.
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub family_branch: Option<FamilyBranch>,
    pub family_relationship: Option<FamilyRelationship>,
}

/// A member with every relationship reference resolved to its full
/// document. Dangling references resolve to absent entries.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithRelations {
    pub member: Member,
    pub user: Option<User>,
    pub husband: Option<Member>,
    pub wives: Vec<Member>,
    pub father: Option<Member>,
    pub mother: Option<Member>,
    pub children: Vec<Member>,
}
