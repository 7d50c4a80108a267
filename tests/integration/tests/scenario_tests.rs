//! End-to-end scenarios
//!
//! Every test drives the stack through domain events, the way the host
//! application would, over the in-memory store, directory and provider.
//!
//! Run with: cargo test -p integration-tests --test scenario_tests

use integration_tests::*;
use roomsync_common::CommunicationConfig;
use roomsync_core::{GroupMode, InstanceKey, MembershipState, ProviderId, UserId};
use roomsync_provider::ProviderCall;
use roomsync_service::{CommunicationApi, ServiceError};

// ============================================================================
// Course rooms
// ============================================================================

#[tokio::test]
async fn test_enrolled_users_join_course_room() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2)]).await.unwrap();

    let key = InstanceKey::course(course.id);
    assert_eq!(system.confirmed(key.clone()).await.unwrap(), id_set(&[1, 2]));
    assert_eq!(system.room_members(key).await.unwrap(), id_set(&[1, 2]));
}

#[tokio::test]
async fn test_add_twice_is_idempotent() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();

    let processor = system.processor(InstanceKey::course(course.id)).await.unwrap();
    processor.add_members_to_room(&ids(&[1, 2, 3])).await.unwrap();
    let once = processor.get_confirmed_userids().await.unwrap();
    let calls = system.provider.call_count();

    processor.add_members_to_room(&ids(&[1, 2, 3])).await.unwrap();
    assert_eq!(processor.get_confirmed_userids().await.unwrap(), once);
    assert_eq!(system.provider.call_count(), calls);
}

#[tokio::test]
async fn test_partial_add_converges() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    let processor = system.processor(InstanceKey::course(course.id)).await.unwrap();

    system.provider.reject_user(UserId::new(2));
    let sync = processor.add_members_to_room(&ids(&[1, 2, 3])).await.unwrap();
    assert_eq!(sync.completed, ids(&[1, 3]));
    assert_eq!(
        processor.get_pending_add_userids().await.unwrap(),
        id_set(&[2])
    );

    system.provider.accept_user(UserId::new(2));
    processor.add_members_to_room(&ids(&[2])).await.unwrap();
    assert_eq!(
        processor.get_confirmed_userids().await.unwrap(),
        id_set(&[1, 2, 3])
    );
    assert!(processor.get_pending_add_userids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enrolment_survives_unreachable_provider() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();

    system.provider.set_offline(true);
    system.enrol(&course, &[user(1)]).await.unwrap();

    let key = InstanceKey::course(course.id);
    let processor = system.processor(key.clone()).await.unwrap();
    assert_eq!(processor.get_pending_add_userids().await.unwrap(), id_set(&[1]));

    system.provider.set_offline(false);
    let report = system.reconcile().await.unwrap();
    assert_eq!(report.confirmed, 1);
    assert_eq!(system.room_members(key).await.unwrap(), id_set(&[1]));
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_suspension_flags_exactly_that_user() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2), user(3)]).await.unwrap();

    // The provider does not confirm, so the removal stays visible
    system.provider.set_offline(true);
    system.update_user(&suspended(&user(2)), &user(2)).await.unwrap();

    let processor = system.processor(InstanceKey::course(course.id)).await.unwrap();
    assert_eq!(
        processor.get_all_delete_flagged_userids().await.unwrap(),
        id_set(&[2])
    );
    assert_eq!(processor.get_confirmed_userids().await.unwrap(), id_set(&[1, 3]));
    assert!(processor.get_pending_add_userids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_suspend_then_unsuspend() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2)]).await.unwrap();
    let key = InstanceKey::course(course.id);

    system.update_user(&suspended(&user(2)), &user(2)).await.unwrap();
    assert_eq!(system.room_members(key.clone()).await.unwrap(), id_set(&[1]));

    system.update_user(&user(2), &suspended(&user(2))).await.unwrap();
    assert_eq!(system.room_members(key).await.unwrap(), id_set(&[1, 2]));
}

#[tokio::test]
async fn test_user_deletion_purges_mappings() {
    let system = TestSystem::new();
    let first = course(GroupMode::NoGroups);
    let second = course(GroupMode::NoGroups);
    system.create_course(&first).await.unwrap();
    system.create_course(&second).await.unwrap();
    system.enrol(&first, &[user(1), user(2)]).await.unwrap();
    system.enrol(&second, &[user(1)]).await.unwrap();

    // The second room was deleted while its rows stayed behind
    let gone = system.processor(InstanceKey::course(second.id)).await.unwrap();
    let gone_room = gone.room_id().cloned().unwrap();
    let mut instance = gone.instance().clone();
    instance.room_id = None;
    system.store.force_write(instance);
    system.provider.clear_calls();

    system.delete_user(&user(1)).await.unwrap();

    assert!(system.mappings_of(UserId::new(1)).await.unwrap().is_empty());
    assert_eq!(
        system.room_members(InstanceKey::course(first.id)).await.unwrap(),
        id_set(&[2])
    );
    for call in system.provider.calls() {
        if let ProviderCall::RemoveMembers { room_id, .. } = call {
            assert_ne!(room_id, gone_room);
        }
    }
}

#[tokio::test]
async fn test_user_deletion_with_provider_down_keeps_flag() {
    let system = TestSystem::new();
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1)]).await.unwrap();

    system.provider.set_offline(true);
    system.delete_user(&user(1)).await.unwrap();
    assert_eq!(
        system.mappings_of(UserId::new(1)).await.unwrap(),
        vec![(InstanceKey::course(course.id), MembershipState::PendingDelete)]
    );

    system.provider.set_offline(false);
    system.reconcile().await.unwrap();
    assert!(system.mappings_of(UserId::new(1)).await.unwrap().is_empty());
}

// ============================================================================
// Groups
// ============================================================================

#[tokio::test]
async fn test_group_created_holds_only_all_groups_user() {
    let system = TestSystem::new();
    let course = course(GroupMode::Separate);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2), user(3)]).await.unwrap();
    system.directory.grant_all_groups(course.id, UserId::new(3));

    let group = group(&course, "Team A");
    system.create_group(&group).await.unwrap();

    let key = InstanceKey::group(group.id);
    let processor = system.processor(key.clone()).await.unwrap();
    assert_eq!(processor.get_provider().unwrap(), ProviderId::Memory);
    assert_eq!(system.room_members(key).await.unwrap(), id_set(&[3]));
}

#[tokio::test]
async fn test_group_members_are_isolated() {
    let system = TestSystem::new();
    let course = course(GroupMode::Separate);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2), user(9)]).await.unwrap();
    system.directory.grant_all_groups(course.id, UserId::new(9));

    let a = group(&course, "A");
    let b = group(&course, "B");
    system.create_group(&a).await.unwrap();
    system.create_group(&b).await.unwrap();

    system.add_to_group(&a, &ids(&[1])).await.unwrap();
    system.add_to_group(&b, &ids(&[2])).await.unwrap();

    assert_eq!(system.room_members(InstanceKey::group(a.id)).await.unwrap(), id_set(&[1, 9]));
    assert_eq!(system.room_members(InstanceKey::group(b.id)).await.unwrap(), id_set(&[2, 9]));

    // The course room is switched off in group mode
    let course_room = system.processor(InstanceKey::course(course.id)).await.unwrap();
    assert_eq!(course_room.get_provider().unwrap(), ProviderId::None);
    assert!(course_room.room_id().is_none());
}

#[tokio::test]
async fn test_group_mode_switch_moves_members() {
    let system = TestSystem::new();
    let mut course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2)]).await.unwrap();
    let a = group(&course, "A");
    system.create_group(&a).await.unwrap();
    system.add_to_group(&a, &ids(&[1])).await.unwrap();

    let course_key = InstanceKey::course(course.id);
    assert_eq!(system.room_members(course_key.clone()).await.unwrap(), id_set(&[1, 2]));

    course.group_mode = GroupMode::Visible;
    system.update_course(&course).await.unwrap();
    assert!(system.processor(course_key.clone()).await.unwrap().room_id().is_none());
    assert_eq!(system.room_members(InstanceKey::group(a.id)).await.unwrap(), id_set(&[1]));
    assert_eq!(system.provider.room_count(), 1);

    course.group_mode = GroupMode::NoGroups;
    system.update_course(&course).await.unwrap();
    assert_eq!(system.room_members(course_key).await.unwrap(), id_set(&[1, 2]));
    assert_eq!(system.provider.room_count(), 1);
}

// ============================================================================
// Providers
// ============================================================================

#[tokio::test]
async fn test_provider_none_round_trip() {
    let system = TestSystem::new();
    let api = CommunicationApi::new(&system.ctx);
    let key = InstanceKey::course(roomsync_core::CourseId::new(unique_id()));

    let mut processor = api.load_by_instance(key.clone()).await.unwrap();
    processor
        .update_room(ProviderId::None, Some("Quiet".to_string()), None)
        .await
        .unwrap();

    let reloaded = api.load_by_instance(key).await.unwrap();
    assert_eq!(reloaded.get_provider().unwrap(), ProviderId::None);
    assert_eq!(reloaded.room_name(), Some("Quiet"));
    assert!(!system
        .provider
        .calls()
        .iter()
        .any(|c| matches!(c, ProviderCall::CreateRoom { .. } | ProviderCall::UpdateRoom { .. })));
}

#[tokio::test]
async fn test_course_provider_migration() {
    let system = TestSystem::new();
    let mut course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1), user(2)]).await.unwrap();
    let key = InstanceKey::course(course.id);
    let old_room = system.processor(key.clone()).await.unwrap().room_id().cloned().unwrap();

    course.communication_provider = ProviderId::CustomLink;
    system.update_course(&course).await.unwrap();

    let processor = system.processor(key).await.unwrap();
    assert_eq!(processor.get_provider().unwrap(), ProviderId::CustomLink);
    assert!(processor.room_id().is_some_and(|r| r.as_str().starts_with("link:")));
    assert_eq!(processor.get_confirmed_userids().await.unwrap(), id_set(&[1, 2]));
    assert!(system.provider.room(&old_room).is_none());
}

#[tokio::test]
async fn test_disabled_subsystem_touches_nothing() {
    let system = TestSystem::with_config(CommunicationConfig {
        enabled: false,
        default_provider: ProviderId::Memory,
    });
    let course = course(GroupMode::NoGroups);
    system.create_course(&course).await.unwrap();
    system.enrol(&course, &[user(1)]).await.unwrap();

    assert_eq!(system.store.instance_count(), 0);
    assert_eq!(system.provider.call_count(), 0);

    let err = CommunicationApi::new(&system.ctx)
        .load_by_instance(InstanceKey::course(course.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Domain(_)));
    assert!(err.is_not_configured());
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_round_trip_through_json() {
    let course = course(GroupMode::NoGroups);
    let event = roomsync_core::DomainEvent::user_enrolled(course.id, ids(&[1, 2]));

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "USER_ENROLLED");

    let system = TestSystem::new();
    system.create_course(&course).await.unwrap();
    system.directory.put_user(user(1));
    system.directory.put_user(user(2));
    system.directory.enrol(course.id, UserId::new(1));
    system.directory.enrol(course.id, UserId::new(2));

    let decoded: roomsync_core::DomainEvent = serde_json::from_value(json).unwrap();
    assert_eq!(system.dispatch(decoded).await.unwrap(), 1);
    assert_eq!(
        system.confirmed(InstanceKey::course(course.id)).await.unwrap(),
        id_set(&[1, 2])
    );
}
