pub mod chat;
pub mod chat_message;
pub mod checkin;
pub mod hub;
pub mod location;
pub mod match_action;
pub mod notification;
pub mod user;

pub use chat::*;
pub use chat_message::*;
pub use checkin::*;
pub use hub::*;
pub use location::*;
pub use match_action::*;
pub use notification::*;
pub use user::*;
