use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::admin::{
    create_content, create_field, create_form, delete_content, delete_field, delete_form,
    export_submissions, get_content, get_form, list_contents, list_field_types, list_fields,
    list_forms, list_submissions, require_admin_token, update_field, update_form,
};
use crate::handlers::health::health_check;
use crate::handlers::pages::{show_content, submit_content};
use crate::handlers::AppState;

pub fn create_router(app_state: Arc<AppState>, is_production: bool) -> Router {
    let mut router = Router::new();

    // Health check is always available
    let health_route = Router::new().route("/health", get(health_check));
    router = router.merge(health_route);

    // Public form pages are always available
    let page_routes = Router::new().route("/content/:content_id", get(show_content).post(submit_content));
    router = router.merge(page_routes);

    // Admin API needs a token in production
    if is_production && app_state.admin_auth_token.is_none() {
        info!("Running in production mode without ADMIN_AUTH_TOKEN - admin API disabled");
    } else {
        let admin_routes = Router::new()
            .route("/admin/forms", get(list_forms).post(create_form))
            .route("/admin/forms/:id", get(get_form).put(update_form).delete(delete_form))
            .route("/admin/forms/:id/fields", get(list_fields).post(create_field))
            .route("/admin/fields/:id", put(update_field).delete(delete_field))
            .route("/admin/forms/:id/submissions", get(list_submissions))
            .route("/admin/forms/:id/submissions.csv", get(export_submissions))
            .route("/admin/contents", get(list_contents).post(create_content))
            .route("/admin/contents/:id", get(get_content).delete(delete_content))
            .route("/admin/field-types", get(list_field_types))
            .route_layer(middleware::from_fn_with_state(app_state.clone(), require_admin_token));

        router = router.merge(admin_routes);

        if app_state.admin_auth_token.is_some() {
            info!("Admin API routes enabled with bearer token authentication");
        } else {
            info!("Admin API routes enabled without authentication - development mode");
        }
    }

    router.with_state(app_state)
}
