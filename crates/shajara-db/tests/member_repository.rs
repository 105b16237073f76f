//! Integration tests for the SurrealDB member repository against an
//! in-memory engine.

use shajara_core::error::ShajaraError;
use shajara_core::links::{LinkWrite, ParentRole};
use shajara_core::models::member::{
    FamilyBranch, FamilyRelationship, Gender, Member, MemberFilter, MemberPatch, NewMember,
    Parents,
};
use shajara_core::repository::{MemberRepository, Pagination};
use shajara_db::repository::SurrealMemberRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealMemberRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    shajara_db::run_migrations(&db).await.unwrap();
    SurrealMemberRepository::new(db)
}

fn new_member(
    first_name: &str,
    last_name: &str,
    gender: Gender,
    relationship: FamilyRelationship,
) -> NewMember {
    NewMember {
        id: Uuid::new_v4(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        full_name: Member::full_name_of(first_name, last_name),
        gender,
        family_branch: FamilyBranch::First,
        family_relationship: relationship,
        birthday: None,
        death_date: None,
        summary: None,
        image: "https://example.com/avatar.png".into(),
        husband: None,
        wives: Vec::new(),
        parents: Parents::default(),
        children: Vec::new(),
    }
}

fn identity_patch(member: &Member) -> MemberPatch {
    MemberPatch {
        first_name: member.first_name.clone(),
        last_name: member.last_name.clone(),
        full_name: member.full_name.clone(),
        gender: member.gender,
        family_branch: member.family_branch,
        family_relationship: member.family_relationship,
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
async fn create_and_get_by_id_round_trips() {
    let repo = setup().await;

    let record = new_member("عمر", "السالم", Gender::Male, FamilyRelationship::Son);
    let id = record.id;
    let created = repo.create(record, &[]).await.unwrap();

    assert_eq!(created.id, id);
    assert_eq!(created.full_name, "عمر السالم");
    assert_eq!(created.gender, Gender::Male);
    assert!(!created.is_user);
    assert!(created.user_id.is_none());
    assert!(created.wives.is_empty());
    assert!(created.parents.is_empty());

    let fetched = repo.get_by_id(id).await.unwrap();
    assert_eq!(fetched.full_name, created.full_name);
}

#[tokio::test]
async fn get_by_id_unknown_is_not_found() {
    let repo = setup().await;

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ShajaraError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_full_name_is_rejected_by_unique_index() {
    let repo = setup().await;

    let first = new_member("سالم", "العمر", Gender::Male, FamilyRelationship::Son);
    repo.create(first, &[]).await.unwrap();

    let dup = new_member("سالم", "العمر", Gender::Male, FamilyRelationship::Son);
    assert!(repo.create(dup, &[]).await.is_err());
}

#[tokio::test]
async fn create_applies_reciprocal_links_in_same_transaction() {
    let repo = setup().await;

    let husband = new_member("خالد", "الأحمد", Gender::Male, FamilyRelationship::Son);
    let husband_id = husband.id;
    repo.create(husband, &[]).await.unwrap();

    let mut wife = new_member("نورة", "الأحمد", Gender::Female, FamilyRelationship::Wife);
    let wife_id = wife.id;
    wife.husband = Some(husband_id);
    repo.create(
        wife,
        &[LinkWrite::AddWife {
            member: husband_id,
            wife: wife_id,
        }],
    )
    .await
    .unwrap();

    let husband = repo.get_by_id(husband_id).await.unwrap();
    assert_eq!(husband.wives, vec![wife_id]);

    let wife = repo.get_by_id(wife_id).await.unwrap();
    assert_eq!(wife.husband, Some(husband_id));
}

#[tokio::test]
async fn add_link_writes_are_idempotent() {
    let repo = setup().await;

    let father = new_member("فهد", "المحمد", Gender::Male, FamilyRelationship::Son);
    let father_id = father.id;
    repo.create(father, &[]).await.unwrap();

    let child = new_member("بدر", "المحمد", Gender::Male, FamilyRelationship::Grandson);
    let child_id = child.id;
    repo.create(child, &[]).await.unwrap();

    let father = repo.get_by_id(father_id).await.unwrap();
    let add_child = LinkWrite::AddChild {
        member: father_id,
        child: child_id,
    };
    repo.update(father_id, identity_patch(&father), &[add_child.clone()])
        .await
        .unwrap();
    repo.update(father_id, identity_patch(&father), &[add_child])
        .await
        .unwrap();

    let father = repo.get_by_id(father_id).await.unwrap();
    assert_eq!(father.children, vec![child_id]);
}

#[tokio::test]
async fn update_clears_husband_and_removes_wife_link() {
    let repo = setup().await;

    let husband = new_member("ناصر", "العلي", Gender::Male, FamilyRelationship::Son);
    let husband_id = husband.id;
    repo.create(husband, &[]).await.unwrap();

    let mut wife = new_member("هند", "العلي", Gender::Female, FamilyRelationship::Wife);
    let wife_id = wife.id;
    wife.husband = Some(husband_id);
    repo.create(
        wife,
        &[LinkWrite::AddWife {
            member: husband_id,
            wife: wife_id,
        }],
    )
    .await
    .unwrap();

    let stored = repo.get_by_id(wife_id).await.unwrap();
    let mut patch = identity_patch(&stored);
    patch.husband = Some(None);
    repo.update(
        wife_id,
        patch,
        &[LinkWrite::RemoveWife {
            member: husband_id,
            wife: wife_id,
        }],
    )
    .await
    .unwrap();

    let wife = repo.get_by_id(wife_id).await.unwrap();
    assert!(wife.husband.is_none());
    let husband = repo.get_by_id(husband_id).await.unwrap();
    assert!(husband.wives.is_empty());
}

#[tokio::test]
async fn update_sets_parent_slot() {
    let repo = setup().await;

    let mother = new_member("موضي", "السعد", Gender::Female, FamilyRelationship::Wife);
    let mother_id = mother.id;
    repo.create(mother, &[]).await.unwrap();

    let child = new_member("سعد", "السعد", Gender::Male, FamilyRelationship::Son);
    let child_id = child.id;
    repo.create(child, &[]).await.unwrap();

    let stored = repo.get_by_id(child_id).await.unwrap();
    let mut patch = identity_patch(&stored);
    patch.parents = Some(Parents {
        father: None,
        mother: Some(mother_id),
    });
    repo.update(
        child_id,
        patch,
        &[LinkWrite::AddChild {
            member: mother_id,
            child: child_id,
        }],
    )
    .await
    .unwrap();

    let child = repo.get_by_id(child_id).await.unwrap();
    assert_eq!(child.parents.mother, Some(mother_id));
    assert!(child.parents.father.is_none());

    // Reverse direction: a SetParent write on the child itself.
    let parent_unset = LinkWrite::SetParent {
        member: child_id,
        role: ParentRole::Mother,
        parent: None,
    };
    let stored = repo.get_by_id(mother_id).await.unwrap();
    repo.update(mother_id, identity_patch(&stored), &[parent_unset])
        .await
        .unwrap();

    let child = repo.get_by_id(child_id).await.unwrap();
    assert!(child.parents.mother.is_none());
}

#[tokio::test]
async fn find_by_full_name_honors_exclusion() {
    let repo = setup().await;

    let record = new_member("محمد", "الراشد", Gender::Male, FamilyRelationship::Son);
    let id = record.id;
    repo.create(record, &[]).await.unwrap();

    let found = repo.find_by_full_name("محمد الراشد", None).await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(id));

    let excluded = repo
        .find_by_full_name("محمد الراشد", Some(id))
        .await
        .unwrap();
    assert!(excluded.is_none());

    let missing = repo.find_by_full_name("غير موجود", None).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn find_branch_head_matches_branch_and_role() {
    let repo = setup().await;

    let head = new_member(
        "عبدالله",
        "الكبير",
        Gender::Male,
        FamilyRelationship::LineageHead,
    );
    let head_id = head.id;
    repo.create(head, &[]).await.unwrap();

    let found = repo
        .find_branch_head(FamilyBranch::First, None)
        .await
        .unwrap();
    assert_eq!(found.map(|m| m.id), Some(head_id));

    let other_branch = repo
        .find_branch_head(FamilyBranch::Second, None)
        .await
        .unwrap();
    assert!(other_branch.is_none());

    let excluded = repo
        .find_branch_head(FamilyBranch::First, Some(head_id))
        .await
        .unwrap();
    assert!(excluded.is_none());
}

#[tokio::test]
async fn get_many_returns_existing_subset() {
    let repo = setup().await;

    let a = new_member("أول", "العائلة", Gender::Male, FamilyRelationship::Son);
    let a_id = a.id;
    repo.create(a, &[]).await.unwrap();
    let b = new_member("ثاني", "العائلة", Gender::Male, FamilyRelationship::Son);
    let b_id = b.id;
    repo.create(b, &[]).await.unwrap();

    let members = repo
        .get_many(&[a_id, b_id, Uuid::new_v4()])
        .await
        .unwrap();
    let mut ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
    ids.sort();
    let mut expected = vec![a_id, b_id];
    expected.sort();
    assert_eq!(ids, expected);

    assert!(repo.get_many(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_cascade_removes_member_and_applies_unlinks() {
    let repo = setup().await;

    let husband = new_member("راشد", "الفهد", Gender::Male, FamilyRelationship::Son);
    let husband_id = husband.id;
    repo.create(husband, &[]).await.unwrap();

    let mut wife = new_member("لطيفة", "الفهد", Gender::Female, FamilyRelationship::Wife);
    let wife_id = wife.id;
    wife.husband = Some(husband_id);
    repo.create(
        wife,
        &[LinkWrite::AddWife {
            member: husband_id,
            wife: wife_id,
        }],
    )
    .await
    .unwrap();

    repo.delete_cascade(
        wife_id,
        None,
        &[LinkWrite::RemoveWife {
            member: husband_id,
            wife: wife_id,
        }],
    )
    .await
    .unwrap();

    let err = repo.get_by_id(wife_id).await.unwrap_err();
    assert!(matches!(err, ShajaraError::NotFound { .. }));

    let husband = repo.get_by_id(husband_id).await.unwrap();
    assert!(husband.wives.is_empty());
}

#[tokio::test]
async fn list_paginates_and_filters_by_branch() {
    let repo = setup().await;

    for i in 0..3 {
        let mut record = new_member(
            &format!("عضو{i}"),
            "الاختبار",
            Gender::Male,
            FamilyRelationship::Son,
        );
        record.family_branch = FamilyBranch::First;
        repo.create(record, &[]).await.unwrap();
    }
    let mut other = new_member("ضيف", "الاختبار", Gender::Male, FamilyRelationship::Son);
    other.family_branch = FamilyBranch::Second;
    repo.create(other, &[]).await.unwrap();

    let filter = MemberFilter {
        family_branch: Some(FamilyBranch::First),
        family_relationship: None,
    };
    let page = repo
        .list(
            &filter,
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

    let page2 = repo
        .list(
            &filter,
            Pagination {
                page: 2,
                per_page: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);

    let all = repo
        .list(&MemberFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 4);
}
