//! The relationship consistency engine.
//!
//! Marriage (husband↔wives) and parentage (parents↔children) are
//! stored denormalized on both sides. Every mutation here follows the
//! same discipline: validate everything first against reads only, plan
//! the full set of reciprocal [`LinkWrite`]s, then hand the record
//! write and the plan to the store as one transaction. On validation
//! failure nothing has been written.

use shajara_core::error::{ShajaraError, ShajaraResult};
use shajara_core::links::{LinkWrite, ParentRole};
use shajara_core::models::member::{
    CreateMember, FamilyRelationship, Gender, Member, MemberFilter, MemberPatch,
    MemberWithRelations, NewMember, UpdateMember,
};
use shajara_core::models::notification::{NotificationAction, NotificationPriority};
use shajara_core::models::user::{PermissionAction, User};
use shajara_core::repository::{MemberRepository, PaginatedResult, Pagination, UserRepository};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TreeConfig;
use crate::error::MemberError;
use crate::notify::{MemberEvent, Notifier, PermissionFilter};

/// Entity type string used for permissions and notifications.
pub const MEMBER_ENTITY: &str = "عضو";

/// Member CRUD with bidirectional link reconciliation and
/// notification fan-out.
pub struct MemberService<M, U, N> {
    members: M,
    users: U,
    notifier: N,
    config: TreeConfig,
}

impl<M, U, N> MemberService<M, U, N>
where
    M: MemberRepository,
    U: UserRepository,
    N: Notifier,
{
    pub fn new(members: M, users: U, notifier: N, config: TreeConfig) -> Self {
        Self {
            members,
            users,
            notifier,
            config,
        }
    }

    /// Create a member.
    ///
    /// Validation order: required fields, full-name uniqueness,
    /// lineage-head exclusivity, wives, husband, parents, children.
    /// The first failure aborts with nothing written.
    pub async fn create_member(
        &self,
        actor: Option<Uuid>,
        input: CreateMember,
    ) -> ShajaraResult<MemberWithRelations> {
        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(MemberError::MissingRequiredFields.into());
        }

        let full_name = Member::full_name_of(&input.first_name, &input.last_name);
        if self
            .members
            .find_by_full_name(&full_name, None)
            .await?
            .is_some()
        {
            return Err(MemberError::DuplicateFullName { full_name }.into());
        }

        if input.family_relationship == FamilyRelationship::LineageHead {
            self.check_branch_head(&input, None).await?;
        }

        let id = Uuid::new_v4();
        let mut links = Vec::new();

        let wives = input.wives.unwrap_or_default();
        if !wives.is_empty() {
            let wife_members = self.members.get_many(&wives).await?;
            if wife_members.len() != wives.len() {
                return Err(MemberError::WivesNotFound.into());
            }
            if wife_members.iter().any(|w| w.gender != Gender::Female) {
                return Err(MemberError::WifeNotFemale.into());
            }
            for wife in &wives {
                links.push(LinkWrite::SetHusband {
                    member: *wife,
                    husband: Some(id),
                });
            }
        }

        let mut husband = None;
        if input.family_relationship == FamilyRelationship::Wife {
            if let Some(candidate) = input.husband {
                let resolved = self
                    .resolve(candidate, MemberError::HusbandNotFound)
                    .await?;
                if resolved.gender != Gender::Male {
                    return Err(MemberError::HusbandNotMale.into());
                }
                if resolved.family_branch != input.family_branch {
                    return Err(MemberError::HusbandWrongBranch.into());
                }
                links.push(LinkWrite::AddWife {
                    member: candidate,
                    wife: id,
                });
                husband = Some(candidate);
            }
        }

        let parents = input.parents.unwrap_or_default();
        if let Some(father) = parents.father {
            let resolved = self.resolve(father, MemberError::FatherNotFound).await?;
            if resolved.gender != Gender::Male {
                return Err(MemberError::FatherNotMale.into());
            }
            links.push(LinkWrite::AddChild {
                member: father,
                child: id,
            });
        }
        if let Some(mother) = parents.mother {
            let resolved = self.resolve(mother, MemberError::MotherNotFound).await?;
            if resolved.gender != Gender::Female {
                return Err(MemberError::MotherNotFemale.into());
            }
            links.push(LinkWrite::AddChild {
                member: mother,
                child: id,
            });
        }

        let children = input.children.unwrap_or_default();
        if !children.is_empty() {
            let child_members = self.members.get_many(&children).await?;
            if child_members.len() != children.len() {
                return Err(MemberError::ChildrenNotFound.into());
            }
            let role = ParentRole::for_gender(input.gender);
            for child in &children {
                links.push(LinkWrite::SetParent {
                    member: *child,
                    role,
                    parent: Some(id),
                });
            }
        }

        let record = NewMember {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            full_name,
            gender: input.gender,
            family_branch: input.family_branch,
            family_relationship: input.family_relationship,
            birthday: input.birthday,
            death_date: input.death_date,
            summary: input.summary,
            image: input
                .image
                .unwrap_or_else(|| self.config.default_member_image.clone()),
            husband,
            wives,
            parents,
            children,
        };

        let member = self.members.create(record, &links).await?;
        info!(member_id = %member.id, full_name = %member.full_name, "Member created");

        self.notify(
            actor,
            NotificationAction::Create,
            PermissionAction::View,
            "تم إنشاء عضو جديد",
            Some(member.id),
        )
        .await;

        self.populate(member).await
    }

    /// Update a member, reconciling every supplied relationship field.
    ///
    /// For each supplied field the old reciprocal links are unset and
    /// the new ones set; absent fields are left untouched. Patch and
    /// plan commit together in one transaction.
    pub async fn update_member(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        input: UpdateMember,
    ) -> ShajaraResult<MemberWithRelations> {
        let stored = self.members.get_by_id(id).await?;

        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(MemberError::MissingRequiredFields.into());
        }

        let full_name = Member::full_name_of(&input.first_name, &input.last_name);
        if self
            .members
            .find_by_full_name(&full_name, Some(id))
            .await?
            .is_some()
        {
            return Err(MemberError::DuplicateFullName { full_name }.into());
        }

        // Exclusivity only applies when changing *into* the head role.
        if input.family_relationship == FamilyRelationship::LineageHead
            && stored.family_relationship != FamilyRelationship::LineageHead
        {
            let head = self
                .members
                .find_branch_head(input.family_branch, Some(id))
                .await?;
            if let Some(head) = head {
                return Err(MemberError::BranchHeadExists {
                    head_name: head.full_name,
                }
                .into());
            }
            if input.gender != Gender::Male {
                return Err(MemberError::BranchHeadNotMale.into());
            }
        }

        let mut links = Vec::new();
        let mut patch = MemberPatch {
            first_name: input.first_name,
            last_name: input.last_name,
            full_name,
            gender: input.gender,
            family_branch: input.family_branch,
            family_relationship: input.family_relationship,
            birthday: input.birthday,
            death_date: input.death_date,
            summary: input.summary,
            image: input.image,
            husband: None,
            wives: None,
            parents: None,
            children: None,
        };

        if let Some(new_wives) = input.wives {
            for old_wife in &stored.wives {
                links.push(LinkWrite::SetHusband {
                    member: *old_wife,
                    husband: None,
                });
            }
            if !new_wives.is_empty() {
                let wife_members = self.members.get_many(&new_wives).await?;
                if wife_members.len() != new_wives.len() {
                    return Err(MemberError::WivesNotFound.into());
                }
                if wife_members.iter().any(|w| w.gender != Gender::Female) {
                    return Err(MemberError::WifeNotFemale.into());
                }
                for wife in &new_wives {
                    links.push(LinkWrite::SetHusband {
                        member: *wife,
                        husband: Some(id),
                    });
                }
            }
            patch.wives = Some(new_wives);
        }

        if input.family_relationship == FamilyRelationship::Wife {
            if let Some(new_husband) = input.husband {
                if let Some(old_husband) = stored.husband {
                    links.push(LinkWrite::RemoveWife {
                        member: old_husband,
                        wife: id,
                    });
                }
                if let Some(candidate) = new_husband {
                    let resolved = self
                        .resolve(candidate, MemberError::HusbandNotFound)
                        .await?;
                    if resolved.gender != Gender::Male {
                        return Err(MemberError::HusbandNotMale.into());
                    }
                    if resolved.family_branch != input.family_branch {
                        return Err(MemberError::HusbandWrongBranch.into());
                    }
                    links.push(LinkWrite::AddWife {
                        member: candidate,
                        wife: id,
                    });
                }
                patch.husband = Some(new_husband);
            }
        }

        if let Some(new_parents) = input.parents {
            if let Some(old_father) = stored.parents.father {
                links.push(LinkWrite::RemoveChild {
                    member: old_father,
                    child: id,
                });
            }
            if let Some(old_mother) = stored.parents.mother {
                links.push(LinkWrite::RemoveChild {
                    member: old_mother,
                    child: id,
                });
            }
            if let Some(father) = new_parents.father {
                let resolved = self.resolve(father, MemberError::FatherNotFound).await?;
                if resolved.gender != Gender::Male {
                    return Err(MemberError::FatherNotMale.into());
                }
                links.push(LinkWrite::AddChild {
                    member: father,
                    child: id,
                });
            }
            if let Some(mother) = new_parents.mother {
                let resolved = self.resolve(mother, MemberError::MotherNotFound).await?;
                if resolved.gender != Gender::Female {
                    return Err(MemberError::MotherNotFemale.into());
                }
                links.push(LinkWrite::AddChild {
                    member: mother,
                    child: id,
                });
            }
            patch.parents = Some(new_parents);
        }

        if let Some(new_children) = input.children {
            // Slot chosen by the stored gender, so pre-update children
            // are unlinked from the slot they actually occupy.
            let role = ParentRole::for_gender(stored.gender);
            for old_child in &stored.children {
                links.push(LinkWrite::SetParent {
                    member: *old_child,
                    role,
                    parent: None,
                });
            }
            if !new_children.is_empty() {
                let child_members = self.members.get_many(&new_children).await?;
                if child_members.len() != new_children.len() {
                    return Err(MemberError::ChildrenNotFound.into());
                }
                for child in &new_children {
                    links.push(LinkWrite::SetParent {
                        member: *child,
                        role,
                        parent: Some(id),
                    });
                }
            }
            patch.children = Some(new_children);
        }

        let member = self.members.update(id, patch, &links).await?;
        info!(member_id = %member.id, "Member updated");

        self.notify(
            actor,
            NotificationAction::Update,
            PermissionAction::Update,
            "تم تعديل عضو",
            Some(member.id),
        )
        .await;

        self.populate(member).await
    }

    /// Delete a member, its linked user and every reciprocal reference
    /// other members hold to it, in one transaction.
    pub async fn delete_member(&self, actor: Option<Uuid>, id: Uuid) -> ShajaraResult<()> {
        let stored = self.members.get_by_id(id).await?;

        let mut links = Vec::new();
        if let Some(husband) = stored.husband {
            links.push(LinkWrite::RemoveWife {
                member: husband,
                wife: id,
            });
        }
        for wife in &stored.wives {
            links.push(LinkWrite::SetHusband {
                member: *wife,
                husband: None,
            });
        }
        if let Some(father) = stored.parents.father {
            links.push(LinkWrite::RemoveChild {
                member: father,
                child: id,
            });
        }
        if let Some(mother) = stored.parents.mother {
            links.push(LinkWrite::RemoveChild {
                member: mother,
                child: id,
            });
        }
        let role = ParentRole::for_gender(stored.gender);
        for child in &stored.children {
            links.push(LinkWrite::SetParent {
                member: *child,
                role,
                parent: None,
            });
        }

        self.members
            .delete_cascade(id, stored.user_id, &links)
            .await?;
        info!(member_id = %id, had_user = stored.user_id.is_some(), "Member deleted");

        self.notify(
            actor,
            NotificationAction::Delete,
            PermissionAction::Delete,
            "تم حذف عضو",
            None,
        )
        .await;

        Ok(())
    }

    /// Fetch one member with relations resolved.
    pub async fn get_member(&self, id: Uuid) -> ShajaraResult<MemberWithRelations> {
        let member = self.members.get_by_id(id).await?;
        self.populate(member).await
    }

    /// Page through members, each with relations resolved.
    pub async fn list_members(
        &self,
        filter: &MemberFilter,
        pagination: Pagination,
    ) -> ShajaraResult<PaginatedResult<MemberWithRelations>> {
        let page = self.members.list(filter, pagination).await?;
        let mut items = Vec::with_capacity(page.items.len());
        for member in page.items {
            items.push(self.populate(member).await?);
        }
        Ok(PaginatedResult {
            items,
            total: page.total,
            total_pages: page.total_pages,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn check_branch_head(
        &self,
        input: &CreateMember,
        exclude: Option<Uuid>,
    ) -> ShajaraResult<()> {
        let head = self
            .members
            .find_branch_head(input.family_branch, exclude)
            .await?;
        if let Some(head) = head {
            return Err(MemberError::BranchHeadExists {
                head_name: head.full_name,
            }
            .into());
        }
        if input.gender != Gender::Male {
            return Err(MemberError::BranchHeadNotMale.into());
        }
        Ok(())
    }

    /// Fetch a referenced member, mapping absence to the supplied
    /// business error.
    async fn resolve(&self, id: Uuid, missing: MemberError) -> ShajaraResult<Member> {
        match self.members.get_by_id(id).await {
            Ok(member) => Ok(member),
            Err(ShajaraError::NotFound { .. }) => Err(missing.into()),
            Err(err) => Err(err),
        }
    }

    async fn try_get(&self, id: Uuid) -> ShajaraResult<Option<Member>> {
        match self.members.get_by_id(id).await {
            Ok(member) => Ok(Some(member)),
            Err(ShajaraError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn try_get_user(&self, id: Uuid) -> ShajaraResult<Option<User>> {
        match self.users.get_by_id(id).await {
            Ok(user) => Ok(Some(user)),
            Err(ShajaraError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve relationship ids to full documents; dangling ids become
    /// absent entries.
    async fn populate(&self, member: Member) -> ShajaraResult<MemberWithRelations> {
        let user = match member.user_id {
            Some(user_id) => self.try_get_user(user_id).await?,
            None => None,
        };
        let husband = match member.husband {
            Some(husband_id) => self.try_get(husband_id).await?,
            None => None,
        };
        let wives = self.members.get_many(&member.wives).await?;
        let father = match member.parents.father {
            Some(father_id) => self.try_get(father_id).await?,
            None => None,
        };
        let mother = match member.parents.mother {
            Some(mother_id) => self.try_get(mother_id).await?,
            None => None,
        };
        let children = self.members.get_many(&member.children).await?;

        Ok(MemberWithRelations {
            member,
            user,
            husband,
            wives,
            father,
            mother,
            children,
        })
    }

    /// Fire-and-forget fan-out; failures never surface to the caller.
    async fn notify(
        &self,
        actor: Option<Uuid>,
        action: NotificationAction,
        permission: PermissionAction,
        message: &str,
        entity_id: Option<Uuid>,
    ) {
        let filter = PermissionFilter {
            entity: MEMBER_ENTITY.into(),
            action: permission,
        };
        let event = MemberEvent {
            sender_id: actor,
            message: message.into(),
            action,
            entity_type: MEMBER_ENTITY.into(),
            entity_id,
            priority: NotificationPriority::Medium,
        };
        if let Err(err) = self
            .notifier
            .notify_users_with_permission(&filter, &event)
            .await
        {
            warn!(error = %err, action = action.as_str(), "Notification dispatch failed");
        }
    }
}
