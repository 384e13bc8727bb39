use creatorhub_db::models::MessageAttachment;
use creatorhub_services::chat::{ChatEventKind, MessagePatch, NewMessage};
use creatorhub_services::Clock;
use creatorhub_services::dao::{DaoError, Filter, PaginationParams, Store};

use crate::fixtures::engine::{EventLog, TestEngine};

fn text(content: &str) -> NewMessage {
    NewMessage {
        content: Some(content.to_string()),
        ..Default::default()
    }
}

fn edit(content: &str) -> MessagePatch {
    MessagePatch {
        content: Some(content.to_string()),
        metadata: None,
    }
}

#[tokio::test]
async fn send_fills_delivery_and_read_lists() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    let message = engine.say(chat.id, &ana, "hello").await;

    assert_eq!(message.content.as_deref(), Some("hello"));
    assert_eq!(message.delivered_to, chat.member_ids);
    assert_eq!(message.read_by, vec![ana.id]);
    assert!(message.updated_at.is_none());
}

#[tokio::test]
async fn send_rejects_outsiders_and_empty_messages() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let eve = engine.user("Eve", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    let err = engine.core.chats.send(chat.id, eve.id, text("hi")).await.unwrap_err();
    assert!(matches!(err, DaoError::Validation(ref m) if m == "Not a chat member"));

    let err = engine.core.chats.send(chat.id, ana.id, text("   ")).await.unwrap_err();
    assert!(matches!(err, DaoError::Validation(ref m) if m == "Message content or attachment required"));

    let attachment_only = engine
        .core
        .chats
        .send(
            chat.id,
            ana.id,
            NewMessage {
                attachments: vec![MessageAttachment {
                    url: "https://cdn.example.com/a.png".to_string(),
                    name: "a.png".to_string(),
                    content_type: Some("image/png".to_string()),
                    size: Some(1024),
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(attachment_only.content.is_none());
}

#[tokio::test]
async fn edit_window_boundary() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let early = engine.say(chat.id, &ana, "first").await;
    let exact = engine.say(chat.id, &ana, "second").await;
    let late = engine.say(chat.id, &ana, "third").await;

    engine.advance_secs(14 * 60 + 59);
    let edited = engine
        .core
        .chats
        .update(chat.id, early.id, ana.id, edit("first, edited"))
        .await
        .unwrap();
    assert_eq!(edited.content.as_deref(), Some("first, edited"));
    assert_eq!(edited.updated_at, Some(engine.clock.now()));

    engine.advance_secs(1);
    engine
        .core
        .chats
        .update(chat.id, exact.id, ana.id, edit("second, edited"))
        .await
        .expect("edit at exactly fifteen minutes is allowed");

    engine.advance_secs(1);
    let err = engine
        .core
        .chats
        .update(chat.id, late.id, ana.id, edit("too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::Validation(ref m) if m == "Edit window expired"));
}

#[tokio::test]
async fn only_sender_may_edit_or_delete() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let message = engine.say(chat.id, &ana, "mine").await;

    let err = engine
        .core
        .chats
        .update(chat.id, message.id, ben.id, edit("yours now"))
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::Forbidden(_)));

    for hard in [false, true] {
        let err = engine
            .core
            .chats
            .remove(chat.id, message.id, ben.id, hard)
            .await
            .unwrap_err();
        assert!(matches!(err, DaoError::Forbidden(_)));
    }
}

#[tokio::test]
async fn soft_delete_keeps_identity_and_hard_delete_removes() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let soft = engine.say(chat.id, &ana, "oops").await;
    let hard = engine.say(chat.id, &ana, "gone").await;

    let remains = engine
        .core
        .chats
        .remove(chat.id, soft.id, ana.id, false)
        .await
        .unwrap()
        .expect("soft delete keeps the record");
    assert!(remains.content.is_none());
    assert!(remains.attachments.is_empty());
    assert!(remains.deleted_at.is_some());
    assert_eq!(remains.created_at, soft.created_at);

    assert!(
        engine
            .core
            .chats
            .remove(chat.id, hard.id, ana.id, true)
            .await
            .unwrap()
            .is_none()
    );

    let listed = engine
        .core
        .chats
        .list_messages(chat.id, ben.id, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, soft.id);
    assert!(listed.items[0].is_deleted());

    let err = engine
        .core
        .chats
        .update(chat.id, soft.id, ana.id, edit("revive"))
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::Validation(_)));
}

#[tokio::test]
async fn reactions_are_unique_per_user_and_emoji() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let cem = engine.user("Cem", &[]).await;
    let chat = engine.group(&ana, &[&ben, &cem]).await;
    let message = engine.say(chat.id, &ana, "react to this").await;
    let chats = &engine.core.chats;

    assert!(chats.add_reaction(chat.id, message.id, ben.id, "👍").await.unwrap().changed);
    assert!(chats.add_reaction(chat.id, message.id, cem.id, "👍").await.unwrap().changed);
    let repeat = chats.add_reaction(chat.id, message.id, ben.id, "👍").await.unwrap();
    assert!(!repeat.changed);

    let summary = repeat.message.reaction_summary();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].emoji, "👍");
    assert_eq!(summary[0].count, 2);

    assert!(chats.remove_reaction(chat.id, message.id, ben.id, "👍").await.unwrap().changed);
    let again = chats.remove_reaction(chat.id, message.id, ben.id, "👍").await.unwrap();
    assert!(!again.changed);
    assert_eq!(again.message.reaction_summary()[0].count, 1);
}

#[tokio::test]
async fn read_receipt_is_recorded_and_announced_once() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let message = engine.say(chat.id, &ana, "read me").await;
    let mut log = EventLog::attach(&engine.core.chats);

    assert!(engine.core.chats.mark_read(chat.id, message.id, ben.id).await.unwrap());
    assert!(!engine.core.chats.mark_read(chat.id, message.id, ben.id).await.unwrap());
    // The sender has read it by sending.
    assert!(!engine.core.chats.mark_read(chat.id, message.id, ana.id).await.unwrap());

    assert_eq!(log.names(), vec!["read"]);
    let stored = engine.core.backends.messages.get(message.id).await.unwrap().unwrap();
    assert_eq!(stored.read_by, vec![ana.id, ben.id]);
}

#[tokio::test]
async fn typing_is_broadcast_but_never_stored() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let mut log = EventLog::attach(&engine.core.chats);

    let signal = engine.core.chats.typing(chat.id, ana.id, true).await.unwrap();
    assert_eq!(
        signal.expires_at - engine.clock.now(),
        chrono::Duration::seconds(5)
    );

    let events = log.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].recipients, vec![ben.id]);
    assert!(matches!(
        events[0].kind,
        ChatEventKind::Typing { is_typing: true, .. }
    ));

    let stored = engine
        .core
        .backends
        .messages
        .find(&Filter::new().eq("chat_id", chat.id))
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn huge_typing_expiry_saturates() {
    let engine = TestEngine::with_settings(|s| s.messaging.typing_expiry_secs = u64::MAX);
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    let signal = engine.core.chats.typing(chat.id, ana.id, true).await.unwrap();
    assert_eq!(signal.expires_at, chrono::DateTime::<chrono::Utc>::MAX_UTC);
}

#[tokio::test]
async fn pin_is_open_to_any_member() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let message = engine.say(chat.id, &ana, "pin me").await;
    let mut log = EventLog::attach(&engine.core.chats);

    assert!(engine.core.chats.pin(chat.id, message.id, ben.id, true).await.unwrap().pinned);
    assert!(engine.core.chats.pin(chat.id, message.id, ana.id, true).await.unwrap().pinned);
    assert!(!engine.core.chats.pin(chat.id, message.id, ana.id, false).await.unwrap().pinned);

    assert_eq!(log.names(), vec!["message:pinned", "message:pinned"]);
}

#[tokio::test]
async fn messages_list_oldest_first_with_stable_ties() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    // Same instant on the manual clock.
    let first = engine.say(chat.id, &ana, "one").await;
    let second = engine.say(chat.id, &ben, "two").await;
    engine.advance_secs(1);
    let third = engine.say(chat.id, &ana, "three").await;

    let page = engine
        .core
        .chats
        .list_messages(chat.id, ana.id, &PaginationParams { page: 1, per_page: 2 })
        .await
        .unwrap();
    let ids: Vec<_> = page.items.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);

    let page = engine
        .core
        .chats
        .list_messages(chat.id, ana.id, &PaginationParams { page: 2, per_page: 2 })
        .await
        .unwrap();
    assert_eq!(page.items[0].id, third.id);
}

#[tokio::test]
async fn ephemeral_messages_disappear_after_expiry() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    engine
        .core
        .chats
        .send(
            chat.id,
            ana.id,
            NewMessage {
                content: Some("self-destructing".to_string()),
                expires_in_secs: Some(30),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine.say(chat.id, &ana, "permanent").await;

    engine.advance_secs(30);
    let page = engine
        .core
        .chats
        .list_messages(chat.id, ben.id, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].content.as_deref(), Some("permanent"));

    let stored = engine
        .core
        .backends
        .messages
        .find(&Filter::new().eq("chat_id", chat.id))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn unrepresentable_expiry_is_rejected() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    let err = engine
        .core
        .chats
        .send(
            chat.id,
            ana.id,
            NewMessage {
                content: Some("forever".to_string()),
                expires_in_secs: Some(u64::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DaoError::Validation(_)));

    let page = engine
        .core
        .chats
        .list_messages(chat.id, ben.id, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn lifecycle_events_reach_members_in_order() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;
    let mut log = EventLog::attach(&engine.core.chats);

    let message = engine.say(chat.id, &ana, "hi").await;
    engine
        .core
        .chats
        .update(chat.id, message.id, ana.id, edit("hi!"))
        .await
        .unwrap();
    engine
        .core
        .chats
        .add_reaction(chat.id, message.id, ben.id, "🎉")
        .await
        .unwrap();
    engine
        .core
        .chats
        .remove(chat.id, message.id, ana.id, false)
        .await
        .unwrap();

    let events = log.drain();
    let names: Vec<_> = events.iter().map(|e| e.kind.name()).collect();
    assert_eq!(
        names,
        vec!["message:created", "message:updated", "reaction:added", "message:deleted"]
    );
    assert!(events.iter().all(|e| e.chat_id == chat.id));
    assert!(events.iter().all(|e| e.recipients.len() == 2));
}

#[tokio::test]
async fn unsubscribed_handler_receives_nothing() {
    let engine = TestEngine::new();
    let ana = engine.user("Ana", &[]).await;
    let ben = engine.user("Ben", &[]).await;
    let chat = engine.direct(&ana, &ben).await;

    let before = engine.core.chats.events().subscriber_count();
    let subscription = engine.core.chats.subscribe(|_| {});
    assert_eq!(engine.core.chats.events().subscriber_count(), before + 1);
    subscription.unsubscribe();
    assert_eq!(engine.core.chats.events().subscriber_count(), before);

    engine.say(chat.id, &ana, "quiet").await;
}
