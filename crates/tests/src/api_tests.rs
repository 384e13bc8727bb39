use serde_json::{Value, json};

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_reports_ok_without_pending_writes() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pending_writes"], 0);
    assert_eq!(body["ws_connections"], 0);
}

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/api/chat")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let resp = app.get_as("/api/chat", "not-an-id").send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn create_user_validates_and_hides_contact_details_from_others() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/user"))
        .json(&json!({ "display_name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .client
        .post(app.url("/api/user"))
        .json(&json!({
            "display_name": "Ana",
            "skills": ["rust", "video"],
            "email": "ana@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let ana: Value = resp.json().await.unwrap();
    let ana_id = ana["id"].as_str().unwrap();
    assert_eq!(ana["email"], "ana@example.com");

    let ben = app.create_user("Ben", &[]).await;

    let own: Value = app
        .get_as(&format!("/api/user/{ana_id}"), ana_id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["email"], "ana@example.com");

    let seen: Value = app
        .get_as(&format!("/api/user/{ana_id}"), &ben.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(seen["display_name"], "Ana");
    assert!(seen.get("email").is_none());
}

#[tokio::test]
async fn checkin_shows_up_in_hub_occupancy() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &[]).await;

    let resp = app
        .post_as("/api/hub", &ana.id)
        .json(&json!({ "name": "Loft", "location": { "lat": 52.52, "lng": 13.405 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let hub: Value = resp.json().await.unwrap();
    let hub_id = hub["id"].as_str().unwrap();

    let resp = app
        .post_as("/api/checkin", &ana.id)
        .json(&json!({ "location": { "lat": 52.5201, "lng": 13.4051 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let checkin: Value = resp.json().await.unwrap();
    assert_eq!(checkin["hub_id"], hub_id);
    assert_eq!(checkin["status"], "online");

    let hubs: Value = app
        .get_as("/api/hub", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hubs[0]["active_count"], 1);
    assert_eq!(hubs[0]["active_users"][0], ana.id.as_str());

    let resp = app
        .post_as("/api/checkin", &ana.id)
        .json(&json!({ "location": { "lat": 123.0, "lng": 0.0 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let out: Value = app
        .delete_as("/api/checkin", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(out["checked_out"], true);
}

#[tokio::test]
async fn mutual_like_opens_a_chat_and_notifies_both() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &["rust"]).await;
    let ben = app.create_user("Ben", &["rust"]).await;

    let suggestions: Value = app
        .get_as("/api/match/suggestion", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(suggestions[0]["profile"]["id"], ben.id.as_str());
    assert_eq!(suggestions[0]["shared_skills"], json!(["rust"]));

    let first: Value = app
        .post_as("/api/match/action", &ana.id)
        .json(&json!({ "target_id": ben.id, "action": "connected" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(first["matched"].is_null());

    let second: Value = app
        .post_as("/api/match/action", &ben.id)
        .json(&json!({ "target_id": ana.id, "action": "connected" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["matched"]["chat_created"], true);
    assert_eq!(second["matched"]["profile"]["display_name"], "Ana");

    app.core.outbox.flush().await;
    let notifications: Value = app
        .get_as("/api/notification", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(notifications["unread"], 2);
    let mut kinds: Vec<&str> = notifications["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    kinds.sort();
    assert_eq!(kinds, vec!["like", "match"]);

    let marked: Value = app
        .post_as("/api/notification/read-all", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(marked["marked"], 2);

    let resp = app
        .post_as("/api/match/action", &ana.id)
        .json(&json!({ "target_id": ana.id, "action": "connected" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn message_lifecycle_over_http() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &[]).await;
    let ben = app.create_user("Ben", &[]).await;
    let chat_id = app.connect(&ana, &ben).await;
    let messages = format!("/api/chat/{chat_id}/message");

    let resp = app
        .post_as(&messages, &ana.id)
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let sent: Value = resp.json().await.unwrap();
    let message_id = sent["id"].as_str().unwrap().to_string();
    assert_eq!(sent["read_by"], json!([ana.id]));
    assert_eq!(sent["is_edited"], false);

    for user in [&ana, &ben] {
        let resp = app
            .post_as(&format!("{messages}/{message_id}/reaction"), &user.id)
            .json(&json!({ "emoji": "🔥" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let page: Value = app
        .get_as(&messages, &ben.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["reaction_summary"], json!([{ "emoji": "🔥", "count": 2 }]));

    let read: Value = app
        .post_as(&format!("{messages}/{message_id}/read"), &ben.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["first_read"], true);

    let resp = app
        .put_as(&format!("{messages}/{message_id}"), &ben.id)
        .json(&json!({ "content": "not yours" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let edited: Value = app
        .put_as(&format!("{messages}/{message_id}"), &ana.id)
        .json(&json!({ "content": "hello there" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(edited["content"], "hello there");
    assert_eq!(edited["is_edited"], true);

    app.clock.advance(chrono::Duration::seconds(901));
    let resp = app
        .put_as(&format!("{messages}/{message_id}"), &ana.id)
        .json(&json!({ "content": "too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let deleted: Value = app
        .delete_as(&format!("{messages}/{message_id}"), &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["deleted"], true);
    assert_eq!(deleted["message"]["is_deleted"], true);
    assert!(deleted["message"]["content"].is_null());
}

#[tokio::test]
async fn message_expiry_out_of_range_is_unprocessable() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &[]).await;
    let ben = app.create_user("Ben", &[]).await;
    let chat_id = app.connect(&ana, &ben).await;
    let messages = format!("/api/chat/{chat_id}/message");

    for ttl in [json!(u64::MAX), json!(0)] {
        let resp = app
            .post_as(&messages, &ana.id)
            .json(&json!({ "content": "boom", "expires_in_secs": ttl }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422);
    }

    let resp = app
        .post_as(&messages, &ana.id)
        .json(&json!({ "content": "brief", "expires_in_secs": 60 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn outsiders_cannot_read_or_post() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &[]).await;
    let ben = app.create_user("Ben", &[]).await;
    let eve = app.create_user("Eve", &[]).await;
    let chat_id = app.connect(&ana, &ben).await;

    let resp = app
        .get_as(&format!("/api/chat/{chat_id}/message"), &eve.id)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .post_as(&format!("/api/chat/{chat_id}/message"), &eve.id)
        .json(&json!({ "content": "let me in" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .get_as("/api/chat/zzz", &ana.id)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn removing_a_chat_hides_it_then_deletes_it() {
    let app = TestApp::spawn().await;
    let ana = app.create_user("Ana", &[]).await;
    let ben = app.create_user("Ben", &[]).await;
    let chat_id = app.connect(&ana, &ben).await;

    let first: Value = app
        .delete_as(&format!("/api/chat/{chat_id}"), &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["result"], "hidden");

    let ana_chats: Value = app
        .get_as("/api/chat", &ana.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ana_chats, json!([]));

    let ben_chats: Value = app
        .get_as("/api/chat", &ben.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ben_chats[0]["id"], chat_id.as_str());

    let second: Value = app
        .delete_as(&format!("/api/chat/{chat_id}"), &ben.id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["result"], "deleted");

    let resp = app
        .get_as(&format!("/api/chat/{chat_id}"), &ben.id)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
