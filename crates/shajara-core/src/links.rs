//! Reciprocal-link write vocabulary.
//!
//! Marriage and parentage are bidirectional edges stored as
//! denormalized back-references. The consistency engine plans its
//! changes as a list of [`LinkWrite`]s and the store applies the whole
//! list, together with the primary record write, in one transaction.
//!
//! Add operations carry add-to-set semantics and removals are by
//! value, so applying the same plan twice leaves the same state.

use uuid::Uuid;

use crate::models::member::Gender;

/// Which parent slot a child back-reference occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRole {
    Father,
    Mother,
}

impl ParentRole {
    /// The slot a parent of the given gender fills on its children.
    pub fn for_gender(gender: Gender) -> Self {
        match gender {
            Gender::Male => ParentRole::Father,
            Gender::Female => ParentRole::Mother,
        }
    }

    /// Field path of the slot on the member record.
    pub fn field(&self) -> &'static str {
        match self {
            ParentRole::Father => "parents.father",
            ParentRole::Mother => "parents.mother",
        }
    }
}

/// A single directed write against one member's relationship fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkWrite {
    /// Set or clear `husband` on a (female) member.
    SetHusband { member: Uuid, husband: Option<Uuid> },
    /// Add a wife to a (male) member's `wives` set.
    AddWife { member: Uuid, wife: Uuid },
    /// Remove a wife from a member's `wives` set.
    RemoveWife { member: Uuid, wife: Uuid },
    /// Set or clear one parent slot on a member.
    SetParent {
        member: Uuid,
        role: ParentRole,
        parent: Option<Uuid>,
    },
    /// Add a child to a member's `children` set.
    AddChild { member: Uuid, child: Uuid },
    /// Remove a child from a member's `children` set.
    RemoveChild { member: Uuid, child: Uuid },
}
