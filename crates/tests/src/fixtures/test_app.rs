use creatorhub_api::{build_router, extractors::auth::USER_HEADER, state::AppState};
use creatorhub_config::Settings;
use creatorhub_services::notification::LogNotifier;
use creatorhub_services::{Backends, Core, ManualClock};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::engine::start_time;

/// A running HTTP server over in-memory stores.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub core: Core,
    pub clock: Arc<ManualClock>,
    pub client: reqwest::Client,
}

pub struct SeededUser {
    pub id: String,
    pub display_name: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let settings = Settings::for_tests().expect("default settings");
        let clock = Arc::new(ManualClock::new(start_time()));
        let (core, worker) = Core::build(
            &Backends::in_memory(),
            &settings,
            clock.clone(),
            Arc::new(LogNotifier),
        );
        worker.spawn();

        let app = build_router(AppState::new(core.clone(), settings));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{}", addr),
            core,
            clock,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get_as(&self, path: &str, user_id: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).header(USER_HEADER, user_id)
    }

    pub fn post_as(&self, path: &str, user_id: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).header(USER_HEADER, user_id)
    }

    pub fn put_as(&self, path: &str, user_id: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).header(USER_HEADER, user_id)
    }

    pub fn delete_as(&self, path: &str, user_id: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).header(USER_HEADER, user_id)
    }

    pub async fn create_user(&self, display_name: &str, skills: &[&str]) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/user"))
            .json(&serde_json::json!({
                "display_name": display_name,
                "skills": skills,
            }))
            .send()
            .await
            .expect("Create user request failed");
        assert_eq!(resp.status().as_u16(), 201);

        let json: Value = resp.json().await.unwrap();
        SeededUser {
            id: json["id"].as_str().unwrap().to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// Mutual like between two users; returns the chat id.
    pub async fn connect(&self, a: &SeededUser, b: &SeededUser) -> String {
        self.post_as("/api/match/action", &a.id)
            .json(&serde_json::json!({ "target_id": b.id, "action": "connected" }))
            .send()
            .await
            .unwrap();
        let resp = self
            .post_as("/api/match/action", &b.id)
            .json(&serde_json::json!({ "target_id": a.id, "action": "connected" }))
            .send()
            .await
            .unwrap();
        let json: Value = resp.json().await.unwrap();
        json["matched"]["chat_id"].as_str().unwrap().to_string()
    }
}
