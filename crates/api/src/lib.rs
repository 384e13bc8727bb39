pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(parsed))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let user_routes = Router::new()
        .route("/", post(routes::user::create))
        .route("/{user_id}", get(routes::user::get));

    let hub_routes = Router::new()
        .route("/", get(routes::hub::list))
        .route("/", post(routes::hub::create));

    let checkin_routes = Router::new()
        .route("/", get(routes::checkin::list))
        .route("/", post(routes::checkin::checkin))
        .route("/", delete(routes::checkin::checkout));

    let match_routes = Router::new()
        .route("/suggestion", get(routes::matching::suggestions))
        .route("/action", post(routes::matching::action));

    let chat_routes = Router::new()
        .route("/", get(routes::chat::list))
        .route("/", post(routes::chat::create))
        .route("/{chat_id}", get(routes::chat::get))
        .route("/{chat_id}", delete(routes::chat::remove))
        .route("/{chat_id}/archive", put(routes::chat::archive))
        .route("/{chat_id}/typing", post(routes::chat::typing));

    let message_routes = Router::new()
        .route("/", get(routes::message::list))
        .route("/", post(routes::message::create))
        .route("/{message_id}", put(routes::message::update))
        .route("/{message_id}", delete(routes::message::delete))
        .route("/{message_id}/pin", put(routes::message::pin))
        .route("/{message_id}/read", post(routes::message::mark_read))
        .route("/{message_id}/reaction", post(routes::reaction::add))
        .route(
            "/{message_id}/reaction/{emoji}",
            delete(routes::reaction::remove),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notification::list))
        .route("/read-all", post(routes::notification::mark_all_read))
        .route("/{notification_id}/read", post(routes::notification::mark_read));

    let api = Router::new()
        .nest("/user", user_routes)
        .nest("/hub", hub_routes)
        .nest("/checkin", checkin_routes)
        .nest("/match", match_routes)
        .nest("/chat", chat_routes)
        .nest("/chat/{chat_id}/message", message_routes)
        .nest("/notification", notification_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .route("/ws", get(ws::handler::ws_upgrade))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let pending = state.core.backends.pending_writes();
    axum::Json(serde_json::json!({
        "status": if pending == 0 { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "pending_writes": pending,
        "ws_connections": state.sockets.open_sockets(),
    }))
}
