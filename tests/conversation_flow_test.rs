//! Conversation resolution, group membership and info lookup against a
//! live database.
//!
//! Run with: cargo test --test conversation_flow_test -- --ignored

mod common;

use chatboard_service::error::AppError;
use chatboard_service::models::conversation::ConversationInfo;
use chatboard_service::services::conversation_service::{ConversationService, SendTarget};

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn direct_conversation_is_created_once_per_pair() {
    let pool = common::setup_pool().await;
    let a = common::create_user(&pool, "Alice Example").await;
    let b = common::create_user(&pool, "Bob Example").await;

    let first = ConversationService::resolve(&pool, &a, &SendTarget::Direct(b.clone()))
        .await
        .unwrap();
    let second = ConversationService::resolve(&pool, &b, &SendTarget::Direct(a.clone()))
        .await
        .unwrap();
    assert_eq!(first.code, second.code);

    let members = ConversationService::member_codes(&pool, &first.code)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&a));
    assert!(members.contains(&b));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn stale_conversation_code_falls_back_to_recipient() {
    let pool = common::setup_pool().await;
    let a = common::create_user(&pool, "Ann").await;
    let b = common::create_user(&pool, "Ben").await;

    let target = SendTarget::Conversation {
        code: "does-not-exist".into(),
        recipient: Some(b.clone()),
    };
    let conversation = ConversationService::resolve(&pool, &a, &target).await.unwrap();
    let direct = ConversationService::find_direct(&pool, &a, &b)
        .await
        .unwrap()
        .expect("direct conversation created by fallback");
    assert_eq!(conversation.code, direct.code);

    let no_recipient = SendTarget::Conversation {
        code: "does-not-exist".into(),
        recipient: None,
    };
    let err = ConversationService::resolve(&pool, &a, &no_recipient)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTarget));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn unknown_recipient_is_an_invalid_target() {
    let pool = common::setup_pool().await;
    let a = common::create_user(&pool, "Solo").await;

    let err = ConversationService::resolve(&pool, &a, &SendTarget::Direct("nobody".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTarget));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn group_membership_includes_the_creator_once() {
    let pool = common::setup_pool().await;
    let u1 = common::create_user(&pool, "Creator").await;
    let u2 = common::create_user(&pool, "Second").await;
    let u3 = common::create_user(&pool, "Third").await;

    // Creator listed twice among the members; u2 listed twice as well.
    let members = vec![u2.clone(), u3.clone(), u1.clone(), u2.clone()];
    let group = ConversationService::create_group(&pool, &u1, "book club", &members)
        .await
        .unwrap();

    let mut codes = ConversationService::member_codes(&pool, &group.code)
        .await
        .unwrap();
    codes.sort();
    let mut expected = vec![u1, u2, u3];
    expected.sort();
    assert_eq!(codes, expected);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn membership_errors_map_to_their_cases() {
    let pool = common::setup_pool().await;
    let u1 = common::create_user(&pool, "Owner").await;
    let u2 = common::create_user(&pool, "Joiner").await;
    let u3 = common::create_user(&pool, "Stranger").await;

    let group = ConversationService::create_group(&pool, &u1, "ops", &[])
        .await
        .unwrap();

    ConversationService::add_member(&pool, &group.code, &u2)
        .await
        .unwrap();
    let dup = ConversationService::add_member(&pool, &group.code, &u2)
        .await
        .unwrap_err();
    assert!(matches!(dup, AppError::DuplicateMember));

    let missing = ConversationService::remove_member(&pool, &group.code, &u3)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::MemberNotFound));

    let gone = ConversationService::add_member(&pool, "no-such-conversation", &u2)
        .await
        .unwrap_err();
    assert!(matches!(gone, AppError::ConversationNotFound));

    let nobody = ConversationService::add_member(&pool, &group.code, "no-such-user")
        .await
        .unwrap_err();
    assert!(matches!(nobody, AppError::UserNotFound));

    ConversationService::remove_member(&pool, &group.code, &u2)
        .await
        .unwrap();
    let codes = ConversationService::member_codes(&pool, &group.code)
        .await
        .unwrap();
    assert_eq!(codes, vec![u1]);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn info_lookup_resolves_groups_peers_and_contacts() {
    let pool = common::setup_pool().await;
    let a = common::create_user(&pool, "Zoe").await;
    let b = common::create_user(&pool, "Abe").await;

    let group = ConversationService::create_group(&pool, &a, "reading", &[b.clone()])
        .await
        .unwrap();

    match ConversationService::get_info(&pool, &a, Some(group.code.as_str()), None)
        .await
        .unwrap()
    {
        Some(ConversationInfo::Group(info)) => {
            assert!(info.is_group);
            assert_eq!(info.code, group.code);
            assert_eq!(info.users.len(), 2);
            // Members come sorted by display name.
            assert_eq!(info.users[0].full_name, "Abe");
            assert_eq!(info.users[1].full_name, "Zoe");
        }
        other => panic!("expected group info, got {:?}", other),
    }

    // A direct conversation's info is the peer's profile.
    let direct = ConversationService::resolve(&pool, &a, &SendTarget::Direct(b.clone()))
        .await
        .unwrap();
    match ConversationService::get_info(&pool, &a, Some(direct.code.as_str()), None)
        .await
        .unwrap()
    {
        Some(ConversationInfo::Profile(profile)) => {
            assert!(!profile.is_group);
            assert_eq!(profile.code, b);
        }
        other => panic!("expected peer profile, got {:?}", other),
    }

    // An unknown code falls back to the contact.
    match ConversationService::get_info(&pool, &a, Some("stale-code"), Some(b.as_str()))
        .await
        .unwrap()
    {
        Some(ConversationInfo::Profile(profile)) => assert_eq!(profile.code, b),
        other => panic!("expected contact profile, got {:?}", other),
    }

    // Nothing to resolve at all.
    assert!(ConversationService::get_info(&pool, &a, None, None)
        .await
        .unwrap()
        .is_none());
}
