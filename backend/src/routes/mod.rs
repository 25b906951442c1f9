use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod collaborations;
pub mod contracts;
pub mod epk;
pub mod folders;
pub mod health;
pub mod notes;
pub mod projects;
pub mod users;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let folders_routes = Router::new()
        .route("/", post(folders::create_folder))
        .route("/tree", get(folders::get_folder_tree))
        .route("/path", post(folders::ensure_folder_path))
        .route(
            "/:id",
            patch(folders::update_folder).delete(folders::delete_folder),
        )
        .route("/:id/contents", get(folders::list_folder_contents));

    let projects_routes = Router::new()
        .route(
            "/",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/shared", get(projects::list_shared_projects))
        .route("/bulk/move", post(projects::bulk_move_projects))
        .route(
            "/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/:id/folder", patch(projects::move_project));

    let collaborations_routes = Router::new()
        .route(
            "/",
            get(collaborations::list_collaborations).post(collaborations::create_collaboration),
        )
        .route("/:id", delete(collaborations::delete_collaboration))
        .route("/:id/accept", post(collaborations::accept_collaboration))
        .route("/:id/reject", post(collaborations::reject_collaboration));

    let notes_routes = Router::new()
        .route("/", get(notes::list_notes).post(notes::create_note))
        .route("/reorder", post(notes::reorder_notes))
        .route(
            "/:id",
            patch(notes::update_note).delete(notes::delete_note),
        );

    let epk_routes = Router::new().route("/", get(epk::get_own_epk).put(epk::upsert_epk));

    let contracts_routes = Router::new()
        .route(
            "/",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route("/templates", get(contracts::list_templates))
        .route("/templates/:id", get(contracts::get_template))
        .route("/preview", post(contracts::preview_contract))
        .route(
            "/:id",
            get(contracts::get_contract).delete(contracts::delete_contract),
        );

    let users_routes = Router::new().route("/lookup/:box_id", get(users::lookup_by_box_id));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/folders", folders_routes)
        .nest("/api/projects", projects_routes)
        .nest("/api/collaborations", collaborations_routes)
        .nest("/api/notes", notes_routes)
        .nest("/api/epk", epk_routes)
        .nest("/api/contracts", contracts_routes)
        .nest("/api/users", users_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/public/epk/:slug", get(epk::get_public_epk))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        warn!(origin = %value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
