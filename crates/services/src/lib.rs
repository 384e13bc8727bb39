pub mod backends;
pub mod chat;
pub mod clock;
pub mod dao;
pub mod engine;
pub mod geo;
pub mod locks;
pub mod matching;
pub mod notification;
pub mod presence;

pub use backends::Backends;
pub use chat::ChatService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use dao::*;
pub use engine::Core;
pub use matching::MatchService;
pub use notification::{NotificationOutbox, NotificationService, NotificationWorker};
pub use presence::PresenceService;
