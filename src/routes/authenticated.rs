use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Note lifecycle endpoints. Every handler here takes an `AuthUser`, and the router as
/// a whole is additionally wrapped in the middleware stack named by
/// `AppConfig::auth_middlewares`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /notes
        // Creates a note in the section named by `section_id` or `section_tag`.
        .route("/notes", post(handlers::store_note))
        // PUT/PATCH/DELETE /notes/{id}
        // Update replaces the description only; delete cascades to comments and media.
        .route(
            "/notes/{id}",
            put(handlers::update_note)
                .patch(handlers::update_note)
                .delete(handlers::destroy_note),
        )
}
