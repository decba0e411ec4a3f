use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_project))
        .layer(handlers::upload::upload_body_limit(&config.storage));

    OpenApiRouter::new()
        .merge(upload)
        .routes(routes!(handlers::download::download_project))
        .routes(routes!(handlers::project::list_projects))
        .routes(routes!(handlers::project::get_project))
}
