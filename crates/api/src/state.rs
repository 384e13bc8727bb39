use creatorhub_config::Settings;
use creatorhub_services::{Core, chat::Subscription};
use std::sync::Arc;

use crate::ws::{forwarder, registry::ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub core: Core,
    pub settings: Settings,
    pub sockets: Arc<ConnectionRegistry>,
    /// Keeps the WebSocket relay registered on the chat event bus.
    _forwarder: Arc<Subscription>,
}

impl AppState {
    /// Must be called inside a Tokio runtime.
    pub fn new(core: Core, settings: Settings) -> Self {
        let sockets = Arc::new(ConnectionRegistry::new());
        let forwarder = forwarder::spawn(&core.chats, sockets.clone());

        Self {
            core,
            settings,
            sockets,
            _forwarder: Arc::new(forwarder),
        }
    }
}
