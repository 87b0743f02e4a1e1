//! The message ingestion pipeline against a live database: validation,
//! resolution, attachment persistence, ordering and delete.
//!
//! Run with: cargo test --test message_flow_test -- --ignored

mod common;

use chatboard_service::error::AppError;
use chatboard_service::models::message::MessageKind;
use chatboard_service::services::attachment_store::AttachmentStore;
use chatboard_service::services::conversation_service::{ConversationService, SendTarget};
use chatboard_service::services::message_service::{IncomingAttachment, MessageService};

async fn temp_store() -> (tempfile::TempDir, AttachmentStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = AttachmentStore::new(dir.path().to_path_buf())
        .await
        .expect("attachment store");
    (dir, store)
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn empty_message_without_attachment_is_rejected() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Amy").await;
    let b = common::create_user(&pool, "Bud").await;

    let err = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "   ",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::EmptyMessage));

    // A zero-byte upload counts as no attachment at all.
    let err = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "",
        MessageKind::Attachment,
        vec![IncomingAttachment {
            filename: "empty.txt".into(),
            data: Vec::new(),
        }],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::EmptyMessage));

    // Validation ran before resolution, so no conversation was created.
    assert!(ConversationService::find_direct(&pool, &a, &b)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn captionless_upload_takes_the_original_filename() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Ada").await;
    let b = common::create_user(&pool, "Bob").await;

    let message = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "",
        MessageKind::Media,
        vec![IncomingAttachment {
            filename: "holiday.png".into(),
            data: vec![1, 2, 3],
        }],
    )
    .await
    .unwrap();

    assert_eq!(message.content, "holiday.png");
    let path = message.attachment_path.expect("attachment path");
    assert!(path.starts_with("/attachments/"));
    assert!(path.ends_with(".png"));
    // The stored name is a fresh code, never the client's filename.
    assert!(!path.contains("holiday"));
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn replies_land_in_the_same_conversation_in_order() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Ana").await;
    let b = common::create_user(&pool, "Ben").await;

    let hi = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "hi",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap();

    let yo = MessageService::send(
        &pool,
        &store,
        &b,
        &SendTarget::Conversation {
            code: hi.conversation_code.clone(),
            recipient: None,
        },
        "yo",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap();

    assert_eq!(hi.conversation_code, yo.conversation_code);

    let listing = MessageService::list_by_conversation(&pool, &a, &hi.conversation_code)
        .await
        .unwrap();
    let contents: Vec<&str> = listing.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["hi", "yo"]);

    // The history entry shows the peer's name and previews the latest
    // message.
    let history = ConversationService::get_history(&pool, &a).await.unwrap();
    let entry = history
        .iter()
        .find(|c| c.code == hi.conversation_code)
        .expect("history entry");
    assert_eq!(entry.name, "Ben");
    assert_eq!(
        entry.last_message.as_ref().map(|m| m.content.as_str()),
        Some("yo")
    );
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn send_bumps_conversation_activity() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Pia").await;
    let b = common::create_user(&pool, "Quinn").await;

    let message = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "ping",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap();

    let conversation = ConversationService::get_by_code(&pool, &message.conversation_code)
        .await
        .unwrap()
        .expect("conversation row");
    assert_eq!(conversation.last_active, message.created_at);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn contact_listing_is_empty_until_messages_exist() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Uma").await;
    let b = common::create_user(&pool, "Vin").await;

    assert!(MessageService::list_by_contact(&pool, &a, &b)
        .await
        .unwrap()
        .is_empty());

    MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "hello",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap();

    let listing = MessageService::list_by_contact(&pool, &a, &b).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].content, "hello");
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn only_the_author_deletes_a_message() {
    let pool = common::setup_pool().await;
    let (_dir, store) = temp_store().await;
    let a = common::create_user(&pool, "Wes").await;
    let b = common::create_user(&pool, "Xia").await;

    let message = MessageService::send(
        &pool,
        &store,
        &a,
        &SendTarget::Direct(b.clone()),
        "mine",
        MessageKind::Text,
        Vec::new(),
    )
    .await
    .unwrap();

    let err = MessageService::delete(&pool, &b, message.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthor));

    MessageService::delete(&pool, &a, message.id).await.unwrap();
    let listing = MessageService::list_by_conversation(&pool, &a, &message.conversation_code)
        .await
        .unwrap();
    assert!(listing.iter().all(|m| m.id != message.id));

    let gone = MessageService::delete(&pool, &a, message.id).await.unwrap_err();
    assert!(matches!(gone, AppError::MessageNotFound));
}
