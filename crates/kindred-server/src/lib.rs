pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use kindred_api::gallery::MAX_IMAGE_SIZE;
use kindred_api::middleware::{cookie_header, require_auth};
use kindred_api::{
    AppState, AppStateInner, BlobStore, auth, gallery, messages, notes, pairing, profile,
    relationship, reminders,
};
use kindred_auth::JwtKeys;
use kindred_db::Database;
use kindred_gateway::{ChatHub, connection};

use crate::config::ServerConfig;

/// Room for multipart framing around a maximum-size image.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_SIZE + 1024 * 1024;

pub fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let db = Database::open(&config.db_path)?;
    Ok(state_with_db(db, config))
}

/// Wire the shared services around an already opened database.
pub fn state_with_db(db: Database, config: &ServerConfig) -> AppState {
    let db = Arc::new(db);
    let keys = Arc::new(JwtKeys::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.token_ttl_hours),
    ));
    let hub = ChatHub::new(db.clone(), keys.clone());
    let blobs = BlobStore::new(&config.upload_dir, &config.public_url);

    Arc::new(AppStateInner {
        db,
        keys,
        hub,
        blobs,
    })
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/pair", post(pairing::pair))
        .route("/relationship/breakup", get(relationship::breakup_status))
        .route("/relationship/patchup", post(relationship::patchup))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/user", get(profile::get_user).patch(profile::update_profile))
        .route("/user/pin", post(profile::change_pin))
        .route("/relationship/status", patch(relationship::update_status))
        .route("/relationship/breakup", post(relationship::breakup))
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/{note_id}",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route("/notes/{note_id}/favorite", patch(notes::toggle_favorite))
        .route(
            "/reminders",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        .route(
            "/reminders/{reminder_id}",
            patch(reminders::update_reminder).delete(reminders::delete_reminder),
        )
        .route(
            "/reminders/{reminder_id}/complete",
            patch(reminders::toggle_complete),
        )
        .route(
            "/gallery",
            get(gallery::list_photos).post(gallery::upload_photo),
        )
        .route(
            "/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/chat/{pair_code}", get(ws_upgrade))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .route("/health", get(|| async { "ok" }))
        .nest_service("/uploads", ServeDir::new(state.blobs.dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Admission runs here, before the upgrade: a connection that fails it never
/// becomes a socket and never touches a group.
async fn ws_upgrade(
    State(state): State<AppState>,
    Path(pair_code): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let identity = match state.hub.authenticate(cookie_header(&headers).as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Chat admission to {} refused: {}", pair_code, e);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, hub, pair_code, identity))
}
