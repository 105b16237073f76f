//! End-to-end tests for the member service over in-memory SurrealDB:
//! validation order, reciprocal-link reconciliation, cascade deletes
//! and notification fan-out.

use shajara_core::error::ShajaraError;
use shajara_core::models::member::{
    CreateMember, FamilyBranch, FamilyRelationship, Gender, MemberFilter, Parents, UpdateMember,
};
use shajara_core::models::user::{CreateUser, PermissionGrant};
use shajara_core::repository::{
    MemberRepository, NotificationRepository, Pagination, UserRepository,
};
use shajara_db::repository::{
    SurrealMemberRepository, SurrealNotificationRepository, SurrealUserRepository,
};
use shajara_tree::{MemberService, StoreNotifier, TreeConfig};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Members = SurrealMemberRepository<Db>;
type Users = SurrealUserRepository<Db>;
type Notifications = SurrealNotificationRepository<Db>;
type Service = MemberService<Members, Users, StoreNotifier<Users, Notifications>>;

struct Ctx {
    service: Service,
    members: Members,
    users: Users,
    notifications: Notifications,
}

async fn setup() -> Ctx {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shajara_db::run_migrations(&db).await.unwrap();

    let members = SurrealMemberRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());
    let notifications = SurrealNotificationRepository::new(db.clone());
    let notifier = StoreNotifier::new(users.clone(), notifications.clone());
    let service = MemberService::new(
        members.clone(),
        users.clone(),
        notifier,
        TreeConfig::default(),
    );

    Ctx {
        service,
        members,
        users,
        notifications,
    }
}

fn input(
    first_name: &str,
    last_name: &str,
    gender: Gender,
    relationship: FamilyRelationship,
) -> CreateMember {
    CreateMember {
        first_name: first_name.into(),
        last_name: last_name.into(),
        gender,
        family_branch: FamilyBranch::First,
        family_relationship: relationship,
        birthday: None,
        death_date: None,
        summary: None,
        image: None,
        husband: None,
        wives: None,
        parents: None,
        children: None,
    }
}

fn update_input(
    first_name: &str,
    last_name: &str,
    gender: Gender,
    relationship: FamilyRelationship,
) -> UpdateMember {
    UpdateMember {
        first_name: first_name.into(),
        last_name: last_name.into(),
        gender,
        family_branch: FamilyBranch::First,
        family_relationship: relationship,
        birthday: None,
        death_date: None,
        summary: None,
        image: None,
        husband: None,
        wives: None,
        parents: None,
        children: None,
    }
}

#[tokio::test]
async fn create_defaults_image_and_populates() {
    let ctx = setup().await;

    let created = ctx
        .service
        .create_member(
            None,
            input("سالم", "العتيبي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    assert_eq!(created.member.full_name, "سالم العتيبي");
    assert_eq!(
        created.member.image,
        TreeConfig::default().default_member_image
    );
    assert!(created.user.is_none());
    assert!(created.husband.is_none());
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let ctx = setup().await;

    let err = ctx
        .service
        .create_member(
            None,
            input("  ", "العتيبي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShajaraError::Validation { .. }));
}

#[tokio::test]
async fn duplicate_full_name_is_a_conflict_with_suffix_hint() {
    let ctx = setup().await;

    ctx.service
        .create_member(
            None,
            input("محمد", "العتيبي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let err = ctx
        .service
        .create_member(
            None,
            input("محمد", "العتيبي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap_err();
    match err {
        ShajaraError::Conflict { message } => {
            assert!(message.contains("'محمد العتيبي 1'"), "{message}");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn branch_head_is_exclusive_per_branch() {
    let ctx = setup().await;

    // Worked example: the first lineage head of branch one succeeds.
    ctx.service
        .create_member(
            None,
            input(
                "عبدالله",
                "الكبير",
                Gender::Male,
                FamilyRelationship::LineageHead,
            ),
        )
        .await
        .unwrap();

    let err = ctx
        .service
        .create_member(
            None,
            input(
                "فهد",
                "الكبير",
                Gender::Male,
                FamilyRelationship::LineageHead,
            ),
        )
        .await
        .unwrap_err();
    match err {
        ShajaraError::Conflict { message } => {
            assert!(message.contains("عبدالله الكبير"), "{message}");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // A different branch can still get its own head.
    let mut other = input(
        "خالد",
        "الكبير",
        Gender::Male,
        FamilyRelationship::LineageHead,
    );
    other.family_branch = FamilyBranch::Second;
    ctx.service.create_member(None, other).await.unwrap();
}

#[tokio::test]
async fn branch_head_must_be_male() {
    let ctx = setup().await;

    let err = ctx
        .service
        .create_member(
            None,
            input(
                "نورة",
                "الكبير",
                Gender::Female,
                FamilyRelationship::LineageHead,
            ),
        )
        .await
        .unwrap_err();
    match err {
        ShajaraError::Validation { message } => {
            assert!(message.contains("must be male"), "{message}");
        }
        other => panic!("expected validation, got {other:?}"),
    }
}

#[tokio::test]
async fn update_into_head_role_checks_exclusivity() {
    let ctx = setup().await;

    ctx.service
        .create_member(
            None,
            input(
                "عبدالله",
                "الأول",
                Gender::Male,
                FamilyRelationship::LineageHead,
            ),
        )
        .await
        .unwrap();
    let candidate = ctx
        .service
        .create_member(
            None,
            input("بدر", "الأول", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let err = ctx
        .service
        .update_member(
            None,
            candidate.member.id,
            update_input("بدر", "الأول", Gender::Male, FamilyRelationship::LineageHead),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShajaraError::Conflict { .. }));

    // Re-saving the existing head keeps its role without tripping the
    // exclusivity check.
    let head = ctx
        .members
        .find_branch_head(FamilyBranch::First, None)
        .await
        .unwrap()
        .unwrap();
    ctx.service
        .update_member(
            None,
            head.id,
            update_input(
                "عبدالله",
                "الأول",
                Gender::Male,
                FamilyRelationship::LineageHead,
            ),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn non_female_wife_fails_with_nothing_persisted() {
    let ctx = setup().await;

    let male = ctx
        .service
        .create_member(
            None,
            input("صالح", "المانع", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let mut groom = input("راشد", "المانع", Gender::Male, FamilyRelationship::Son);
    groom.wives = Some(vec![male.member.id]);
    let err = ctx.service.create_member(None, groom).await.unwrap_err();
    match err {
        ShajaraError::Validation { message } => {
            assert!(message.contains("All wives must be female"), "{message}");
        }
        other => panic!("expected validation, got {other:?}"),
    }

    // Nothing was written for the failed create.
    assert!(
        ctx.members
            .find_by_full_name("راشد المانع", None)
            .await
            .unwrap()
            .is_none()
    );
    let untouched = ctx.members.get_by_id(male.member.id).await.unwrap();
    assert!(untouched.husband.is_none());
}

#[tokio::test]
async fn missing_wife_id_fails_create() {
    let ctx = setup().await;

    let mut groom = input("ماجد", "المانع", Gender::Male, FamilyRelationship::Son);
    groom.wives = Some(vec![Uuid::new_v4()]);
    let err = ctx.service.create_member(None, groom).await.unwrap_err();
    assert!(matches!(err, ShajaraError::Validation { .. }));
}

#[tokio::test]
async fn create_wife_links_both_directions() {
    let ctx = setup().await;

    let husband = ctx
        .service
        .create_member(
            None,
            input("خالد", "الأحمد", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let mut bride = input("نورة", "الأحمد", Gender::Female, FamilyRelationship::Wife);
    bride.husband = Some(husband.member.id);
    let bride = ctx.service.create_member(None, bride).await.unwrap();

    assert_eq!(bride.member.husband, Some(husband.member.id));
    assert_eq!(
        bride.husband.as_ref().map(|h| h.id),
        Some(husband.member.id)
    );

    let husband = ctx.members.get_by_id(husband.member.id).await.unwrap();
    assert_eq!(husband.wives, vec![bride.member.id]);
}

#[tokio::test]
async fn cross_branch_husband_is_rejected() {
    let ctx = setup().await;

    // Worked example: husband from branch two, wife declared in branch
    // one.
    let mut groom = input("سعود", "الثاني", Gender::Male, FamilyRelationship::Son);
    groom.family_branch = FamilyBranch::Second;
    let groom = ctx.service.create_member(None, groom).await.unwrap();

    let mut bride = input("منيرة", "الأول", Gender::Female, FamilyRelationship::Wife);
    bride.husband = Some(groom.member.id);
    let err = ctx.service.create_member(None, bride).await.unwrap_err();
    match err {
        ShajaraError::Validation { message } => {
            assert!(
                message.contains("same family branch"),
                "{message}"
            );
        }
        other => panic!("expected validation, got {other:?}"),
    }
}

#[tokio::test]
async fn update_moves_wife_between_husbands() {
    let ctx = setup().await;

    let husband_a = ctx
        .service
        .create_member(
            None,
            input("ناصر", "العلي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let husband_b = ctx
        .service
        .create_member(
            None,
            input("فيصل", "العلي", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let mut bride = input("هند", "العلي", Gender::Female, FamilyRelationship::Wife);
    bride.husband = Some(husband_a.member.id);
    let bride = ctx.service.create_member(None, bride).await.unwrap();

    let mut change = update_input("هند", "العلي", Gender::Female, FamilyRelationship::Wife);
    change.husband = Some(Some(husband_b.member.id));
    let updated = ctx
        .service
        .update_member(None, bride.member.id, change)
        .await
        .unwrap();

    assert_eq!(updated.member.husband, Some(husband_b.member.id));
    let a = ctx.members.get_by_id(husband_a.member.id).await.unwrap();
    assert!(a.wives.is_empty());
    let b = ctx.members.get_by_id(husband_b.member.id).await.unwrap();
    assert_eq!(b.wives, vec![bride.member.id]);
}

#[tokio::test]
async fn update_with_explicit_null_clears_husband() {
    let ctx = setup().await;

    let husband = ctx
        .service
        .create_member(
            None,
            input("مشعل", "السالم", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let mut bride = input("سارة", "السالم", Gender::Female, FamilyRelationship::Wife);
    bride.husband = Some(husband.member.id);
    let bride = ctx.service.create_member(None, bride).await.unwrap();

    let mut change = update_input("سارة", "السالم", Gender::Female, FamilyRelationship::Wife);
    change.husband = Some(None);
    let updated = ctx
        .service
        .update_member(None, bride.member.id, change)
        .await
        .unwrap();

    assert!(updated.member.husband.is_none());
    let former = ctx.members.get_by_id(husband.member.id).await.unwrap();
    assert!(former.wives.is_empty());
}

#[tokio::test]
async fn resetting_same_children_is_idempotent() {
    let ctx = setup().await;

    let father = ctx
        .service
        .create_member(
            None,
            input("فهد", "المحمد", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let child = ctx
        .service
        .create_member(
            None,
            input("بدر", "المحمد", Gender::Male, FamilyRelationship::Grandson),
        )
        .await
        .unwrap();

    let mut change = update_input("فهد", "المحمد", Gender::Male, FamilyRelationship::Son);
    change.children = Some(vec![child.member.id]);
    ctx.service
        .update_member(None, father.member.id, change.clone())
        .await
        .unwrap();
    ctx.service
        .update_member(None, father.member.id, change)
        .await
        .unwrap();

    let father = ctx.members.get_by_id(father.member.id).await.unwrap();
    assert_eq!(father.children, vec![child.member.id]);
    let child = ctx.members.get_by_id(child.member.id).await.unwrap();
    assert_eq!(child.parents.father, Some(father.id));
    assert!(child.parents.mother.is_none());
}

#[tokio::test]
async fn parents_reconcile_and_enforce_gender() {
    let ctx = setup().await;

    let father = ctx
        .service
        .create_member(
            None,
            input("سعد", "الدوسري", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let mother = ctx
        .service
        .create_member(
            None,
            input("موضي", "الدوسري", Gender::Female, FamilyRelationship::Wife),
        )
        .await
        .unwrap();

    let mut newborn = input("تركي", "الدوسري", Gender::Male, FamilyRelationship::Grandson);
    newborn.parents = Some(Parents {
        father: Some(father.member.id),
        mother: Some(mother.member.id),
    });
    let newborn = ctx.service.create_member(None, newborn).await.unwrap();

    let father_doc = ctx.members.get_by_id(father.member.id).await.unwrap();
    assert!(father_doc.children.contains(&newborn.member.id));
    let mother_doc = ctx.members.get_by_id(mother.member.id).await.unwrap();
    assert!(mother_doc.children.contains(&newborn.member.id));

    // A female cannot occupy the father slot.
    let mut invalid = input("نايف", "الدوسري", Gender::Male, FamilyRelationship::Grandson);
    invalid.parents = Some(Parents {
        father: Some(mother.member.id),
        mother: None,
    });
    let err = ctx.service.create_member(None, invalid).await.unwrap_err();
    match err {
        ShajaraError::Validation { message } => {
            assert!(message.contains("Father must be male"), "{message}");
        }
        other => panic!("expected validation, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_unlinks_everyone_and_cascades_user() {
    let ctx = setup().await;

    let husband = ctx
        .service
        .create_member(
            None,
            input("راشد", "الفهد", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let child = ctx
        .service
        .create_member(
            None,
            input("عمر", "الفهد", Gender::Male, FamilyRelationship::Grandson),
        )
        .await
        .unwrap();

    let mut bride = input("لطيفة", "الفهد", Gender::Female, FamilyRelationship::Wife);
    bride.husband = Some(husband.member.id);
    bride.children = Some(vec![child.member.id]);
    let bride = ctx.service.create_member(None, bride).await.unwrap();

    let account = ctx
        .users
        .create(CreateUser {
            tenant_id: Uuid::new_v4(),
            member_id: bride.member.id,
            email: "latifa@example.com".into(),
            password: "sirr-qawiy-123".into(),
            phone: "+966500000000".into(),
            roles: vec!["member".into()],
            family_branch: FamilyBranch::First,
            family_relationship: FamilyRelationship::Wife,
            address: None,
            permissions: Vec::new(),
        })
        .await
        .unwrap();

    ctx.service
        .delete_member(None, bride.member.id)
        .await
        .unwrap();

    assert!(matches!(
        ctx.members.get_by_id(bride.member.id).await.unwrap_err(),
        ShajaraError::NotFound { .. }
    ));
    assert!(matches!(
        ctx.users.get_by_id(account.id).await.unwrap_err(),
        ShajaraError::NotFound { .. }
    ));

    let husband = ctx.members.get_by_id(husband.member.id).await.unwrap();
    assert!(husband.wives.is_empty());
    let child = ctx.members.get_by_id(child.member.id).await.unwrap();
    assert!(child.parents.mother.is_none());
}

#[tokio::test]
async fn notifications_go_only_to_permitted_users() {
    let ctx = setup().await;

    let viewer_member = ctx
        .service
        .create_member(
            None,
            input("مشاهد", "الاختبار", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let viewer = ctx
        .users
        .create(CreateUser {
            tenant_id: Uuid::new_v4(),
            member_id: viewer_member.member.id,
            email: "viewer@example.com".into(),
            password: "sirr-qawiy-123".into(),
            phone: "+966500000000".into(),
            roles: vec!["member".into()],
            family_branch: FamilyBranch::First,
            family_relationship: FamilyRelationship::Son,
            address: None,
            permissions: vec![PermissionGrant {
                entity: "عضو".into(),
                view: true,
                create: false,
                update: false,
                delete: false,
            }],
        })
        .await
        .unwrap();

    let plain_member = ctx
        .service
        .create_member(
            None,
            input("عادي", "الاختبار", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();
    let plain = ctx
        .users
        .create(CreateUser {
            tenant_id: Uuid::new_v4(),
            member_id: plain_member.member.id,
            email: "plain@example.com".into(),
            password: "sirr-qawiy-123".into(),
            phone: "+966500000000".into(),
            roles: vec!["member".into()],
            family_branch: FamilyBranch::First,
            family_relationship: FamilyRelationship::Son,
            address: None,
            permissions: Vec::new(),
        })
        .await
        .unwrap();

    let created = ctx
        .service
        .create_member(
            Some(plain.id),
            input("جديد", "الاختبار", Gender::Male, FamilyRelationship::Son),
        )
        .await
        .unwrap();

    let inbox = ctx
        .notifications
        .list_for_recipient(viewer.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(inbox.total, 1);
    assert_eq!(inbox.items[0].message, "تم إنشاء عضو جديد");
    assert_eq!(inbox.items[0].entity_id, Some(created.member.id));
    assert_eq!(inbox.items[0].sender_id, Some(plain.id));

    let empty = ctx
        .notifications
        .list_for_recipient(plain.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
}

#[tokio::test]
async fn list_members_populates_and_paginates() {
    let ctx = setup().await;

    for i in 0..3 {
        ctx.service
            .create_member(
                None,
                input(
                    &format!("عضو{i}"),
                    "القائمة",
                    Gender::Male,
                    FamilyRelationship::Son,
                ),
            )
            .await
            .unwrap();
    }

    let page = ctx
        .service
        .list_members(
            &MemberFilter::default(),
            Pagination {
                page: 1,
                per_page: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);

    let filtered = ctx
        .service
        .list_members(
            &MemberFilter {
                family_branch: Some(FamilyBranch::Second),
                family_relationship: None,
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(filtered.total, 0);
}
