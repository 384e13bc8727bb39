use bson::oid::ObjectId;
use creatorhub_db::models::{Chat, ChatMessage, GeoPoint, Hub, User};
use creatorhub_services::chat::NewMessage;
use creatorhub_services::dao::NewUser;

use super::engine::TestEngine;

impl TestEngine {
    pub async fn user(&self, name: &str, skills: &[&str]) -> User {
        self.user_at(name, skills, None).await
    }

    pub async fn user_at(&self, name: &str, skills: &[&str], location: Option<GeoPoint>) -> User {
        self.core
            .users
            .create(NewUser {
                display_name: name.to_string(),
                skills: skills.iter().map(|s| s.to_string()).collect(),
                location,
                email: Some(format!("{}@example.com", name.to_lowercase())),
                phone: None,
            })
            .await
            .expect("create user")
    }

    pub async fn hub(&self, name: &str, lat: f64, lng: f64) -> Hub {
        self.core
            .hubs
            .create(name.to_string(), GeoPoint::new(lat, lng))
            .await
            .expect("create hub")
    }

    pub async fn group(&self, creator: &User, others: &[&User]) -> Chat {
        self.core
            .chats
            .create_chat(
                creator.id,
                others.iter().map(|u| u.id).collect(),
                true,
                Some("crew".to_string()),
            )
            .await
            .expect("create group")
    }

    pub async fn direct(&self, a: &User, b: &User) -> Chat {
        self.core
            .chats
            .ensure_direct_chat(a.id, b.id)
            .await
            .expect("direct chat")
            .0
    }

    pub async fn say(&self, chat_id: ObjectId, sender: &User, text: &str) -> ChatMessage {
        self.core
            .chats
            .send(
                chat_id,
                sender.id,
                NewMessage {
                    content: Some(text.to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("send message")
    }
}
